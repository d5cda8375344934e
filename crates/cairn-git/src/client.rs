//! Subprocess-backed implementation of [`GitOps`].

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};
use crate::traits::GitOps;

/// Git client that shells out to the `git` binary.
///
/// Dry-run and verbose behaviour are fields set once at construction by
/// the CLI layer; nothing below this struct consults globals.
#[derive(Debug, Clone, Default)]
pub struct GitClient {
    dry_run: bool,
    verbose: bool,
    dir: Option<PathBuf>,
}

impl GitClient {
    /// Create a client operating in the current directory.
    #[must_use]
    pub const fn new(dry_run: bool, verbose: bool) -> Self {
        Self {
            dry_run,
            verbose,
            dir: None,
        }
    }

    /// Create a client operating in the given directory (used by tests).
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dry_run: false,
            verbose: false,
            dir: Some(dir.into()),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run a git command, returning its trimmed stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        if self.verbose {
            println!("  [git] {}", args.join(" "));
        }
        let output = self.command(args).output()?;
        if !output.status.success() {
            return Err(Error::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a command that is allowed to fail; returns an empty string on
    /// any error.
    fn run_unchecked(&self, args: &[&str]) -> String {
        if self.verbose {
            println!("  [git] {}", args.join(" "));
        }
        self.command(args)
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .unwrap_or_default()
    }

    /// Run a mutating command, honouring dry-run suppression.
    fn mutate(&self, args: &[&str]) -> Result<()> {
        if self.dry_run {
            println!("  [dry-run] git {}", args.join(" "));
            return Ok(());
        }
        self.run(args).map(|_| ())
    }

    /// Resolve symlinks so worktree paths compare reliably.
    fn canonical(path: &str) -> String {
        std::fs::canonicalize(path)
            .ok()
            .and_then(|p| p.to_str().map(String::from))
            .unwrap_or_else(|| path.to_string())
    }
}

impl GitOps for GitClient {
    fn repo_root(&self) -> Result<String> {
        self.run(&["rev-parse", "--show-toplevel"])
    }

    fn current_branch(&self) -> Result<String> {
        self.run(&["branch", "--show-current"])
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let output = self.run(&["branch", "--format=%(refname:short)"])?;
        if output.is_empty() {
            return Ok(vec![]);
        }
        Ok(output.lines().map(String::from).collect())
    }

    fn branch_exists(&self, name: &str) -> bool {
        !self
            .run_unchecked(&["rev-parse", "--verify", &format!("refs/heads/{name}")])
            .is_empty()
    }

    fn remote_branch_exists(&self, name: &str) -> bool {
        !self
            .run_unchecked(&[
                "rev-parse",
                "--verify",
                &format!("refs/remotes/origin/{name}"),
            ])
            .is_empty()
    }

    fn remote_branches(&self) -> HashSet<String> {
        let output = self.run_unchecked(&[
            "for-each-ref",
            "--format=%(refname:short)",
            "refs/remotes/origin/",
        ]);
        output
            .lines()
            .filter_map(|line| line.trim().strip_prefix("origin/"))
            .map(String::from)
            .collect()
    }

    fn commit_hash(&self, reference: &str) -> Result<String> {
        self.run(&["rev-parse", reference])
    }

    fn merge_base(&self, one: &str, two: &str) -> Result<String> {
        self.run(&["merge-base", one, two])
    }

    fn is_working_tree_clean(&self) -> Result<bool> {
        Ok(self.run(&["status", "--porcelain"])?.is_empty())
    }

    fn is_rebase_in_progress(&self) -> bool {
        !self
            .run_unchecked(&["rev-parse", "--verify", "--quiet", "REBASE_HEAD"])
            .is_empty()
    }

    fn is_cherry_pick_in_progress(&self) -> bool {
        !self
            .run_unchecked(&["rev-parse", "--verify", "--quiet", "CHERRY_PICK_HEAD"])
            .is_empty()
    }

    fn worktree_branches(&self) -> Result<HashMap<String, String>> {
        let output = self.run_unchecked(&["worktree", "list", "--porcelain"]);
        let mut worktrees = HashMap::new();
        let mut current_path = String::new();
        for line in output.lines() {
            let line = line.trim();
            if let Some(path) = line.strip_prefix("worktree ") {
                current_path = path.to_string();
            } else if let Some(branch) = line.strip_prefix("branch refs/heads/") {
                if !current_path.is_empty() {
                    worktrees.insert(branch.to_string(), Self::canonical(&current_path));
                    current_path.clear();
                }
            }
        }
        Ok(worktrees)
    }

    fn current_worktree_path(&self) -> Result<String> {
        let path = self.run(&["rev-parse", "--path-format=absolute", "--show-toplevel"])?;
        Ok(Self::canonical(&path))
    }

    fn list_worktrees(&self) -> Result<Vec<String>> {
        let output = self.run_unchecked(&["worktree", "list", "--porcelain"]);
        Ok(output
            .lines()
            .filter_map(|line| line.trim().strip_prefix("worktree "))
            .map(String::from)
            .collect())
    }

    fn remote_url(&self, remote: &str) -> String {
        self.run_unchecked(&["remote", "get-url", remote])
    }

    fn default_branch(&self) -> String {
        let head = self.run_unchecked(&["symbolic-ref", "refs/remotes/origin/HEAD"]);
        if let Some(name) = head.rsplit('/').next()
            && !name.is_empty()
        {
            return name.to_string();
        }
        for candidate in ["master", "main"] {
            if self.branch_exists(candidate) {
                return candidate.to_string();
            }
        }
        "main".to_string()
    }

    fn config(&self, key: &str) -> String {
        self.run_unchecked(&["config", "--get", key])
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(&["config", key, value])
    }

    fn unset_config(&self, key: &str) -> Result<()> {
        self.mutate(&["config", "--unset", key])
    }

    fn stack_parents(&self) -> Result<HashMap<String, String>> {
        // Exits non-zero when no key matches; that just means no stack.
        let output = self.run_unchecked(&["config", "--get-regexp", r"^branch\..*\.stackparent$"]);
        let mut parents = HashMap::new();
        for line in output.lines() {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(parent)) = (fields.next(), fields.next()) else {
                continue;
            };
            if let Some(branch) = key
                .strip_prefix("branch.")
                .and_then(|k| k.strip_suffix(".stackparent"))
            {
                parents.insert(branch.to_string(), parent.to_string());
            }
        }
        Ok(parents)
    }

    fn create_branch(&self, name: &str, from: &str) -> Result<()> {
        self.mutate(&["checkout", "-b", name, from])
    }

    fn checkout(&self, name: &str) -> Result<()> {
        self.mutate(&["checkout", name])
    }

    fn rename_branch(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.mutate(&["branch", "-m", old_name, new_name])
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        self.mutate(&["branch", "-d", name])
    }

    fn delete_branch_force(&self, name: &str) -> Result<()> {
        self.mutate(&["branch", "-D", name])
    }

    fn reset_hard(&self, reference: &str) -> Result<()> {
        self.mutate(&["reset", "--hard", reference])
    }

    fn reset_to_remote(&self, branch: &str) -> Result<()> {
        self.reset_hard(&format!("origin/{branch}"))
    }

    fn fetch_all(&self) -> Result<()> {
        self.mutate(&["fetch", "origin"])
    }

    fn fetch_branch(&self, branch: &str) -> Result<()> {
        // Plain `git fetch origin <branch>` only updates FETCH_HEAD; the
        // explicit refspec creates the remote-tracking ref as well.
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        self.mutate(&["fetch", "origin", &refspec])
    }

    fn rebase(&self, onto: &str) -> Result<()> {
        self.mutate(&["rebase", "--autostash", onto])
    }

    fn rebase_onto(&self, new_base: &str, old_base: &str, branch: &str) -> Result<()> {
        self.mutate(&["rebase", "--autostash", "--onto", new_base, old_base, branch])
    }

    fn abort_rebase(&self) -> Result<()> {
        self.mutate(&["rebase", "--abort"])
    }

    fn abort_cherry_pick(&self) -> Result<()> {
        self.mutate(&["cherry-pick", "--abort"])
    }

    fn cherry_pick(&self, commit: &str) -> Result<()> {
        self.mutate(&["cherry-pick", commit])
    }

    fn stash_push(&self, message: &str) -> Result<()> {
        self.mutate(&["stash", "push", "-m", message])
    }

    fn stash_pop(&self) -> Result<()> {
        self.mutate(&["stash", "pop"])
    }

    fn push(&self, branch: &str, force_with_lease: bool) -> Result<()> {
        if force_with_lease {
            self.mutate(&["push", "--force-with-lease", "origin", branch])
        } else {
            self.mutate(&["push", "origin", branch])
        }
    }

    fn push_with_expected_remote(&self, branch: &str, expected_remote_sha: &str) -> Result<()> {
        // Naming the expected commit avoids the "stale info" rejections a
        // plain --force-with-lease can produce after concurrent fetches.
        let lease = format!("--force-with-lease=refs/heads/{branch}:{expected_remote_sha}");
        self.mutate(&["push", &lease, "origin", branch])
    }

    fn force_push(&self, branch: &str) -> Result<()> {
        self.mutate(&["push", "--force", "origin", branch])
    }

    fn add_worktree(&self, path: &str, branch: &str) -> Result<()> {
        self.mutate(&["worktree", "add", path, branch])
    }

    fn add_worktree_new_branch(&self, path: &str, new_branch: &str, base: &str) -> Result<()> {
        self.mutate(&["worktree", "add", "-b", new_branch, path, base])
    }

    fn add_worktree_tracking(&self, path: &str, branch: &str) -> Result<()> {
        let remote = format!("origin/{branch}");
        self.mutate(&["worktree", "add", "--track", "-b", branch, path, &remote])
    }

    fn remove_worktree(&self, path: &str) -> Result<()> {
        self.mutate(&["worktree", "remove", path])
    }

    fn commits_unique_by_sha(&self, base: &str, branch: &str) -> Result<Vec<String>> {
        let output = self.run(&["rev-list", &format!("{base}..{branch}")])?;
        if output.is_empty() {
            return Ok(vec![]);
        }
        Ok(output.lines().map(String::from).collect())
    }

    fn commits_unique_by_patch(&self, base: &str, branch: &str) -> Result<Vec<String>> {
        // `git cherry` marks commits whose patch-id is absent from `base`
        // with '+'; '-' entries already exist there under another SHA.
        let output = self.run(&["cherry", base, branch])?;
        Ok(output
            .lines()
            .filter_map(|line| line.strip_prefix("+ "))
            .map(|sha| sha.trim().to_string())
            .collect())
    }
}
