//! Stack store: parent edges persisted in the repository config.
//!
//! Each stack branch records its parent under
//! `branch.<name>.stackparent`; the optional `stack.baseBranch` key
//! overrides base-branch detection. This module is the single writer of
//! the parent key space, so readers may trust the edge set they obtain
//! between writes.

use std::collections::HashMap;

use cairn_git::GitOps;

use crate::error::{Error, Result};
use crate::graph;

/// Config key holding the parent of a stack branch.
#[must_use]
pub fn parent_key(branch: &str) -> String {
    format!("branch.{branch}.stackparent")
}

/// Config key overriding the detected base branch.
pub const BASE_BRANCH_KEY: &str = "stack.baseBranch";

/// A branch in a stack together with its recorded parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackBranch {
    /// Branch name.
    pub name: String,
    /// Parent branch name.
    pub parent: String,
}

/// Reads and writes stack structure through the VCS port.
pub struct StackStore<'a, G: GitOps> {
    git: &'a G,
}

impl<'a, G: GitOps> StackStore<'a, G> {
    /// Create a store over the given git port.
    #[must_use]
    pub const fn new(git: &'a G) -> Self {
        Self { git }
    }

    /// The base branch: the `stack.baseBranch` override if set, else the
    /// detected default branch.
    #[must_use]
    pub fn base_branch(&self) -> String {
        let configured = self.git.config(BASE_BRANCH_KEY);
        if configured.is_empty() {
            self.git.default_branch()
        } else {
            configured
        }
    }

    /// All parent edges, keyed by child branch.
    ///
    /// # Errors
    /// Returns an error if the config store cannot be read.
    pub fn parent_edges(&self) -> Result<HashMap<String, String>> {
        Ok(self.git.stack_parents()?)
    }

    /// All branches that are part of a stack, sorted by name.
    ///
    /// # Errors
    /// Returns an error if the config store cannot be read.
    pub fn all_branches(&self) -> Result<Vec<StackBranch>> {
        let mut branches: Vec<StackBranch> = self
            .parent_edges()?
            .into_iter()
            .map(|(name, parent)| StackBranch { name, parent })
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    /// The recorded parent of a branch, if it has one.
    #[must_use]
    pub fn parent_of(&self, branch: &str) -> Option<String> {
        let parent = self.git.config(&parent_key(branch));
        if parent.is_empty() { None } else { Some(parent) }
    }

    /// Record `parent` as the parent of `child`.
    ///
    /// # Errors
    /// Returns an error if the config write fails.
    pub fn set_parent(&self, child: &str, parent: &str) -> Result<()> {
        Ok(self.git.set_config(&parent_key(child), parent)?)
    }

    /// Remove a branch from stack tracking.
    ///
    /// # Errors
    /// Returns an error if the config write fails.
    pub fn unset_parent(&self, child: &str) -> Result<()> {
        Ok(self.git.unset_config(&parent_key(child))?)
    }

    /// Direct children of a branch, sorted by name.
    ///
    /// # Errors
    /// Returns an error if the config store cannot be read.
    pub fn children_of(&self, branch: &str) -> Result<Vec<StackBranch>> {
        let mut children: Vec<StackBranch> = self
            .parent_edges()?
            .into_iter()
            .filter(|(_, parent)| parent == branch)
            .map(|(name, parent)| StackBranch { name, parent })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    /// The chain from the stack root down to `branch`, inclusive. The
    /// base branch appears at the head. Empty if `branch` has no parent
    /// edge.
    ///
    /// # Errors
    /// Returns [`Error::CircularDependency`] if the parent walk loops.
    pub fn chain_to(&self, branch: &str) -> Result<Vec<String>> {
        let parents = self.parent_edges()?;
        if !parents.contains_key(branch) {
            return Ok(vec![]);
        }

        let mut chain = vec![];
        let mut seen = std::collections::HashSet::new();
        let mut current = branch.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return Err(Error::CircularDependency(current));
            }
            chain.insert(0, current.clone());
            match parents.get(&current) {
                Some(parent) if !parent.is_empty() => current = parent.clone(),
                _ => break,
            }
        }

        Ok(chain)
    }

    /// Whether `candidate` sits below `ancestor` in the stack.
    ///
    /// # Errors
    /// Returns an error if the config store cannot be read.
    pub fn is_descendant(&self, ancestor: &str, candidate: &str) -> Result<bool> {
        let parents = self.parent_edges()?;
        Ok(graph::is_descendant(&parents, ancestor, candidate))
    }
}
