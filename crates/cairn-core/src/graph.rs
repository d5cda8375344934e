//! Graph operations over the stack's parent edges.
//!
//! These are pure functions over edge data so they can be tested without
//! any port in the loop.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::store::StackBranch;

/// A node in the stack tree, built on demand and owned by the caller.
/// Nodes own their children and keep no parent back-pointers; the parent
/// relationship is recomputed from the store when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Branch name.
    pub name: String,
    /// Child nodes, sorted by name.
    pub children: Vec<TreeNode>,
}

/// Sort stack branches bottom-to-top: every branch appears after its
/// parent. Ties break lexicographically so the order is deterministic.
///
/// # Errors
/// Returns [`Error::CircularDependency`] if the edges contain a cycle.
pub fn topological_sort(branches: &[StackBranch]) -> Result<Vec<StackBranch>> {
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_name: HashMap<&str, &StackBranch> = HashMap::new();

    for branch in branches {
        by_name.insert(&branch.name, branch);
        in_degree.entry(&branch.name).or_insert(0);
        in_degree.entry(&branch.parent).or_insert(0);
        children.entry(&branch.parent).or_default().push(&branch.name);
        *in_degree.entry(&branch.name).or_insert(0) += 1;
    }

    // Roots are parents that are not themselves stack branches (their
    // in-degree never got bumped), typically the base branch.
    let mut queue: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut sorted = Vec::with_capacity(branches.len());
    while let Some(current) = queue.pop_first() {
        if let Some(branch) = by_name.get(current) {
            sorted.push((*branch).clone());
        }
        for child in children.get(current).into_iter().flatten() {
            let degree = in_degree.entry(child).or_insert(0);
            *degree -= 1;
            if *degree == 0 {
                queue.insert(child);
            }
        }
    }

    for (name, degree) in &in_degree {
        if *degree > 0 && by_name.contains_key(name) {
            return Err(Error::CircularDependency((*name).to_string()));
        }
    }

    Ok(sorted)
}

/// Build the display tree for one stack.
///
/// `chain` is the path from the base down to the branch of interest (as
/// returned by `StackStore::chain_to`); only branches on that chain make
/// it into the tree, which keeps unrelated stacks out of per-stack
/// views. Returns `None` for an empty chain.
#[must_use]
pub fn build_tree(
    base_branch: &str,
    chain: &[String],
    branches: &[StackBranch],
) -> Option<TreeNode> {
    let root = chain.first()?;
    let chain_set: HashSet<&str> = chain.iter().map(String::as_str).collect();

    let mut children_map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for branch in branches {
        if chain_set.contains(branch.name.as_str()) {
            children_map
                .entry(branch.parent.as_str())
                .or_default()
                .push(&branch.name);
        }
    }
    for children in children_map.values_mut() {
        children.sort_unstable();
    }

    let tree = build_node(root, &children_map);
    if root == base_branch {
        Some(tree)
    } else {
        // A broken chain can surface a root that is not the base; keep
        // the base visible as the actual root.
        Some(TreeNode {
            name: base_branch.to_string(),
            children: vec![tree],
        })
    }
}

fn build_node(name: &str, children_map: &BTreeMap<&str, Vec<&str>>) -> TreeNode {
    TreeNode {
        name: name.to_string(),
        children: children_map
            .get(name)
            .into_iter()
            .flatten()
            .map(|child| build_node(child, children_map))
            .collect(),
    }
}

/// Whether `candidate` is a descendant of `ancestor`: walk candidate's
/// parent chain up and test for the ancestor. Used to reject reparenting
/// that would introduce a cycle.
#[must_use]
pub fn is_descendant(
    parents: &HashMap<String, String>,
    ancestor: &str,
    candidate: &str,
) -> bool {
    let mut current = candidate;
    let mut seen = HashSet::new();

    while seen.insert(current) {
        match parents.get(current) {
            Some(parent) if parent == ancestor => return true,
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn branch(name: &str, parent: &str) -> StackBranch {
        StackBranch {
            name: name.to_string(),
            parent: parent.to_string(),
        }
    }

    fn names(branches: &[StackBranch]) -> Vec<&str> {
        branches.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_sort_parents_precede_children() {
        let branches = vec![
            branch("feature-c", "feature-b"),
            branch("feature-a", "main"),
            branch("feature-b", "feature-a"),
        ];
        let sorted = topological_sort(&branches).unwrap();
        assert_eq!(names(&sorted), vec!["feature-a", "feature-b", "feature-c"]);
    }

    #[test]
    fn test_sort_is_deterministic() {
        // Two independent stacks plus a fork; repeated runs must agree.
        let branches = vec![
            branch("zeta", "main"),
            branch("alpha", "main"),
            branch("alpha-child", "alpha"),
            branch("beta", "alpha"),
        ];
        let first = topological_sort(&branches).unwrap();
        for _ in 0..5 {
            assert_eq!(topological_sort(&branches).unwrap(), first);
        }
        // Siblings drain in name order.
        assert_eq!(
            names(&first),
            vec!["alpha", "alpha-child", "beta", "zeta"]
        );
    }

    #[test]
    fn test_sort_detects_cycle() {
        let branches = vec![
            branch("feature-a", "feature-b"),
            branch("feature-b", "feature-a"),
        ];
        assert!(matches!(
            topological_sort(&branches),
            Err(Error::CircularDependency(_))
        ));
    }

    #[test]
    fn test_tree_restricted_to_chain() {
        // Stack of interest: main <- a <- b. Unrelated stack: main <- x.
        let branches = vec![
            branch("a", "main"),
            branch("b", "a"),
            branch("x", "main"),
        ];
        let chain = vec!["main".to_string(), "a".to_string(), "b".to_string()];

        let tree = build_tree("main", &chain, &branches).unwrap();
        assert_eq!(tree.name, "main");
        assert_eq!(tree.children.len(), 1, "unrelated stack must be excluded");
        assert_eq!(tree.children[0].name, "a");
        assert_eq!(tree.children[0].children[0].name, "b");
    }

    #[test]
    fn test_tree_empty_chain() {
        assert!(build_tree("main", &[], &[]).is_none());
    }

    #[test]
    fn test_tree_inserts_base_above_orphan_root() {
        let branches = vec![branch("b", "a")];
        let chain = vec!["a".to_string(), "b".to_string()];

        let tree = build_tree("main", &chain, &branches).unwrap();
        assert_eq!(tree.name, "main");
        assert_eq!(tree.children[0].name, "a");
    }

    #[test]
    fn test_is_descendant() {
        let parents: HashMap<String, String> = [
            ("a".to_string(), "main".to_string()),
            ("b".to_string(), "a".to_string()),
            ("c".to_string(), "b".to_string()),
        ]
        .into();

        assert!(is_descendant(&parents, "a", "c"));
        assert!(is_descendant(&parents, "main", "a"));
        assert!(!is_descendant(&parents, "c", "a"));
        assert!(!is_descendant(&parents, "a", "main"));
    }

    #[test]
    fn test_is_descendant_survives_cycle() {
        let parents: HashMap<String, String> = [
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "a".to_string()),
        ]
        .into();
        assert!(!is_descendant(&parents, "c", "a"));
    }
}
