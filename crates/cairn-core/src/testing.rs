//! Mock ports for engine and store tests.
//!
//! Hand-rolled mocks with builder helpers: state lives behind a `Mutex`
//! (the engine's prelude shares the ports across threads) and every
//! mutation is appended to a call log so tests can assert ordering.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use cairn_git::{Error as GitError, GitOps, Result as GitResult};
use cairn_github::{
    Error as HubError, GitHubApi, PrState, PullRequest, Result as HubResult,
};

use crate::prompt::Prompter;
use crate::{Error, Result};

#[derive(Default)]
struct GitState {
    config: HashMap<String, String>,
    refs: HashMap<String, String>,
    current_branch: String,
    dirty: bool,
    rebasing: bool,
    cherry_picking: bool,
    worktrees: HashMap<String, String>,
    current_worktree: String,
    merge_bases: HashMap<(String, String), String>,
    patch_unique: HashMap<String, Vec<String>>,
    sha_unique: HashMap<String, Vec<String>>,
    conflict_branches: HashSet<String>,
    fail_push: HashSet<String>,
    calls: Vec<String>,
}

/// In-memory [`GitOps`] implementation.
pub struct MockGit {
    state: Mutex<GitState>,
}

impl MockGit {
    pub fn new() -> Self {
        let state = GitState {
            current_branch: "main".to_string(),
            current_worktree: "/repo".to_string(),
            ..GitState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_branch(self, name: &str, sha: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .refs
            .insert(name.to_string(), sha.to_string());
        self
    }

    pub fn with_remote(self, branch: &str, sha: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .refs
            .insert(format!("origin/{branch}"), sha.to_string());
        self
    }

    pub fn with_parent(self, child: &str, parent: &str) -> Self {
        self.state.lock().unwrap().config.insert(
            crate::store::parent_key(child),
            parent.to_string(),
        );
        self
    }

    pub fn with_current(self, branch: &str) -> Self {
        self.state.lock().unwrap().current_branch = branch.to_string();
        self
    }

    pub fn with_dirty_tree(self) -> Self {
        self.state.lock().unwrap().dirty = true;
        self
    }

    pub fn with_worktree(self, branch: &str, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .worktrees
            .insert(branch.to_string(), path.to_string());
        self
    }

    pub fn with_merge_base(self, one: &str, two: &str, sha: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .merge_bases
            .insert((one.to_string(), two.to_string()), sha.to_string());
        self
    }

    pub fn with_patch_unique(self, branch: &str, commits: &[&str]) -> Self {
        self.state.lock().unwrap().patch_unique.insert(
            branch.to_string(),
            commits.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_sha_unique(self, branch: &str, commits: &[&str]) -> Self {
        self.state.lock().unwrap().sha_unique.insert(
            branch.to_string(),
            commits.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_rebase_conflict(self, branch: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .conflict_branches
            .insert(branch.to_string());
        self
    }

    /// Set a config key directly.
    pub fn set(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .config
            .insert(key.to_string(), value.to_string());
    }

    /// Read a config key directly.
    pub fn config_value(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().config.get(key).cloned()
    }

    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Index of the first call starting with `prefix`.
    pub fn call_index(&self, prefix: &str) -> Option<usize> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .position(|call| call.starts_with(prefix))
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.call_index(prefix).is_some()
    }

    pub fn current(&self) -> String {
        self.state.lock().unwrap().current_branch.clone()
    }

    pub fn rebasing(&self) -> bool {
        self.state.lock().unwrap().rebasing
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn command_error(what: &str) -> GitError {
        GitError::Command {
            command: what.to_string(),
            stderr: format!("mock failure: {what}"),
        }
    }
}

impl GitOps for MockGit {
    fn repo_root(&self) -> GitResult<String> {
        Ok("/repo".to_string())
    }

    fn current_branch(&self) -> GitResult<String> {
        Ok(self.state.lock().unwrap().current_branch.clone())
    }

    fn list_branches(&self) -> GitResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .refs
            .keys()
            .filter(|name| !name.starts_with("origin/"))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().refs.contains_key(name)
    }

    fn remote_branch_exists(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .refs
            .contains_key(&format!("origin/{name}"))
    }

    fn remote_branches(&self) -> HashSet<String> {
        self.state
            .lock()
            .unwrap()
            .refs
            .keys()
            .filter_map(|name| name.strip_prefix("origin/"))
            .map(String::from)
            .collect()
    }

    fn commit_hash(&self, reference: &str) -> GitResult<String> {
        self.state
            .lock()
            .unwrap()
            .refs
            .get(reference)
            .cloned()
            .ok_or_else(|| Self::command_error(&format!("rev-parse {reference}")))
    }

    fn merge_base(&self, one: &str, two: &str) -> GitResult<String> {
        let state = self.state.lock().unwrap();
        state
            .merge_bases
            .get(&(one.to_string(), two.to_string()))
            .or_else(|| state.merge_bases.get(&(two.to_string(), one.to_string())))
            .cloned()
            .ok_or_else(|| Self::command_error(&format!("merge-base {one} {two}")))
    }

    fn is_working_tree_clean(&self) -> GitResult<bool> {
        Ok(!self.state.lock().unwrap().dirty)
    }

    fn is_rebase_in_progress(&self) -> bool {
        self.state.lock().unwrap().rebasing
    }

    fn is_cherry_pick_in_progress(&self) -> bool {
        self.state.lock().unwrap().cherry_picking
    }

    fn worktree_branches(&self) -> GitResult<HashMap<String, String>> {
        Ok(self.state.lock().unwrap().worktrees.clone())
    }

    fn current_worktree_path(&self) -> GitResult<String> {
        Ok(self.state.lock().unwrap().current_worktree.clone())
    }

    fn list_worktrees(&self) -> GitResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .worktrees
            .values()
            .cloned()
            .collect())
    }

    fn remote_url(&self, _remote: &str) -> String {
        String::new()
    }

    fn default_branch(&self) -> String {
        "main".to_string()
    }

    fn config(&self, key: &str) -> String {
        self.state
            .lock()
            .unwrap()
            .config
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn set_config(&self, key: &str, value: &str) -> GitResult<()> {
        self.record(format!("set-config {key} {value}"));
        self.state
            .lock()
            .unwrap()
            .config
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn unset_config(&self, key: &str) -> GitResult<()> {
        self.record(format!("unset-config {key}"));
        self.state.lock().unwrap().config.remove(key);
        Ok(())
    }

    fn stack_parents(&self) -> GitResult<HashMap<String, String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .config
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("branch.")
                    .and_then(|k| k.strip_suffix(".stackparent"))
                    .map(|branch| (branch.to_string(), value.clone()))
            })
            .collect())
    }

    fn create_branch(&self, name: &str, from: &str) -> GitResult<()> {
        self.record(format!("create-branch {name} {from}"));
        let mut state = self.state.lock().unwrap();
        let sha = state.refs.get(from).cloned().unwrap_or_default();
        state.refs.insert(name.to_string(), sha);
        state.current_branch = name.to_string();
        Ok(())
    }

    fn checkout(&self, name: &str) -> GitResult<()> {
        self.record(format!("checkout {name}"));
        self.state.lock().unwrap().current_branch = name.to_string();
        Ok(())
    }

    fn rename_branch(&self, old_name: &str, new_name: &str) -> GitResult<()> {
        self.record(format!("rename {old_name} {new_name}"));
        let mut state = self.state.lock().unwrap();
        if let Some(sha) = state.refs.remove(old_name) {
            state.refs.insert(new_name.to_string(), sha);
        }
        if state.current_branch == old_name {
            state.current_branch = new_name.to_string();
        }
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        self.record(format!("delete-branch {name}"));
        self.state.lock().unwrap().refs.remove(name);
        Ok(())
    }

    fn delete_branch_force(&self, name: &str) -> GitResult<()> {
        self.record(format!("delete-branch-force {name}"));
        self.state.lock().unwrap().refs.remove(name);
        Ok(())
    }

    fn reset_hard(&self, reference: &str) -> GitResult<()> {
        self.record(format!("reset-hard {reference}"));
        Ok(())
    }

    fn reset_to_remote(&self, branch: &str) -> GitResult<()> {
        self.record(format!("reset-to-remote {branch}"));
        let mut state = self.state.lock().unwrap();
        if let Some(sha) = state.refs.get(&format!("origin/{branch}")).cloned() {
            state.refs.insert(branch.to_string(), sha);
        }
        Ok(())
    }

    fn fetch_all(&self) -> GitResult<()> {
        self.record("fetch".to_string());
        Ok(())
    }

    fn fetch_branch(&self, branch: &str) -> GitResult<()> {
        self.record(format!("fetch-branch {branch}"));
        Ok(())
    }

    fn rebase(&self, onto: &str) -> GitResult<()> {
        self.record(format!("rebase {onto}"));
        let mut state = self.state.lock().unwrap();
        let current = state.current_branch.clone();
        if state.conflict_branches.contains(&current) {
            state.rebasing = true;
            return Err(Self::command_error(&format!("rebase {onto}")));
        }
        Ok(())
    }

    fn rebase_onto(&self, new_base: &str, old_base: &str, branch: &str) -> GitResult<()> {
        self.record(format!("rebase-onto {new_base} {old_base} {branch}"));
        let mut state = self.state.lock().unwrap();
        if state.conflict_branches.contains(branch) {
            state.rebasing = true;
            return Err(Self::command_error("rebase --onto"));
        }
        Ok(())
    }

    fn abort_rebase(&self) -> GitResult<()> {
        self.record("abort-rebase".to_string());
        self.state.lock().unwrap().rebasing = false;
        Ok(())
    }

    fn abort_cherry_pick(&self) -> GitResult<()> {
        self.record("abort-cherry-pick".to_string());
        self.state.lock().unwrap().cherry_picking = false;
        Ok(())
    }

    fn cherry_pick(&self, commit: &str) -> GitResult<()> {
        self.record(format!("cherry-pick {commit}"));
        Ok(())
    }

    fn stash_push(&self, _message: &str) -> GitResult<()> {
        self.record("stash-push".to_string());
        self.state.lock().unwrap().dirty = false;
        Ok(())
    }

    fn stash_pop(&self) -> GitResult<()> {
        self.record("stash-pop".to_string());
        self.state.lock().unwrap().dirty = true;
        Ok(())
    }

    fn push(&self, branch: &str, _force_with_lease: bool) -> GitResult<()> {
        self.record(format!("push {branch}"));
        if self.state.lock().unwrap().fail_push.contains(branch) {
            return Err(Self::command_error(&format!("push {branch}")));
        }
        Ok(())
    }

    fn push_with_expected_remote(&self, branch: &str, expected_remote_sha: &str) -> GitResult<()> {
        self.record(format!("push-lease {branch} {expected_remote_sha}"));
        if self.state.lock().unwrap().fail_push.contains(branch) {
            return Err(Self::command_error(&format!("push {branch}")));
        }
        Ok(())
    }

    fn force_push(&self, branch: &str) -> GitResult<()> {
        self.record(format!("force-push {branch}"));
        Ok(())
    }

    fn add_worktree(&self, path: &str, branch: &str) -> GitResult<()> {
        self.record(format!("add-worktree {path} {branch}"));
        Ok(())
    }

    fn add_worktree_new_branch(&self, path: &str, new_branch: &str, base: &str) -> GitResult<()> {
        self.record(format!("add-worktree-new {path} {new_branch} {base}"));
        Ok(())
    }

    fn add_worktree_tracking(&self, path: &str, branch: &str) -> GitResult<()> {
        self.record(format!("add-worktree-tracking {path} {branch}"));
        Ok(())
    }

    fn remove_worktree(&self, path: &str) -> GitResult<()> {
        self.record(format!("remove-worktree {path}"));
        Ok(())
    }

    fn commits_unique_by_sha(&self, _base: &str, branch: &str) -> GitResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sha_unique
            .get(branch)
            .or_else(|| state.patch_unique.get(branch))
            .cloned()
            .unwrap_or_default())
    }

    fn commits_unique_by_patch(&self, _base: &str, branch: &str) -> GitResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .patch_unique
            .get(branch)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct HubState {
    open: HashMap<String, PullRequest>,
    by_branch: HashMap<String, PullRequest>,
    fail_bulk: bool,
    base_updates: Vec<(u64, String)>,
    lookups: Vec<String>,
}

/// In-memory [`GitHubApi`] implementation.
#[derive(Default)]
pub struct MockGitHub {
    state: Mutex<HubState>,
}

/// Build a PR record for tests.
pub fn pr(number: u64, state: PrState, base: &str) -> PullRequest {
    PullRequest {
        number,
        state,
        base: base.to_string(),
        title: format!("PR #{number}"),
        url: format!("https://github.com/acme/widgets/pull/{number}"),
        merge_state_status: String::new(),
    }
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// An open PR, visible in the bulk listing.
    pub fn with_open_pr(self, branch: &str, number: u64, base: &str) -> Self {
        let record = pr(number, PrState::Open, base);
        let mut state = self.state.lock().unwrap();
        state.open.insert(branch.to_string(), record.clone());
        state.by_branch.insert(branch.to_string(), record);
        drop(state);
        self
    }

    /// A merged PR, only visible to per-branch lookups.
    pub fn with_merged_pr(self, branch: &str, number: u64, base: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .by_branch
            .insert(branch.to_string(), pr(number, PrState::Merged, base));
        self
    }

    pub fn with_bulk_failure(self) -> Self {
        self.state.lock().unwrap().fail_bulk = true;
        self
    }

    pub fn base_updates(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().base_updates.clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().lookups.clone()
    }
}

impl GitHubApi for MockGitHub {
    fn pr_for_branch(&self, branch: &str) -> HubResult<Option<PullRequest>> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(branch.to_string());
        Ok(state.by_branch.get(branch).cloned())
    }

    fn all_open_prs(&self) -> HubResult<HashMap<String, PullRequest>> {
        let state = self.state.lock().unwrap();
        if state.fail_bulk {
            return Err(HubError::Command {
                command: "pr list".to_string(),
                stderr: "mock failure".to_string(),
            });
        }
        Ok(state.open.clone())
    }

    fn update_pr_base(&self, number: u64, new_base: &str) -> HubResult<()> {
        self.state
            .lock()
            .unwrap()
            .base_updates
            .push((number, new_base.to_string()));
        Ok(())
    }
}

/// Prompter that replays scripted answers; defaults to "yes" and the
/// first option once the script runs out.
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<Vec<bool>>,
    selections: Mutex<Vec<usize>>,
}

impl ScriptedPrompter {
    /// Answers yes to everything.
    pub fn yes() -> Self {
        Self::default()
    }

    /// Replay the given confirm answers in order.
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            confirms: Mutex::new(answers.iter().rev().copied().collect()),
            selections: Mutex::new(vec![]),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(self.confirms.lock().unwrap().pop().unwrap_or(true))
    }

    fn select(&self, _question: &str, options: &[String]) -> Result<usize> {
        let choice = self.selections.lock().unwrap().pop().unwrap_or(0);
        if choice >= options.len() {
            return Err(Error::InvalidSelection(choice.to_string()));
        }
        Ok(choice)
    }
}
