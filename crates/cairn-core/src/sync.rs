//! The stack synchronisation engine.
//!
//! A sync brings every branch in the user's current stack into a
//! consistent state with its parent's tip, the remote's copy of the
//! branch, and the pull request recorded for it. The engine handles
//! merged ancestors, squash-merge rewriting, interrupted rebases,
//! divergent histories, and concurrent checkouts in other worktrees,
//! and persists a resume record so an interrupted run can be picked up
//! or abandoned by a later invocation.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::thread;

use cairn_git::GitOps;
use cairn_github::{GitHubApi, PrState, PullRequest};

use crate::error::{Error, Result};
use crate::graph::{self, TreeNode};
use crate::policy::{self, PollutedHistory, PushLease, RebaseMode};
use crate::prompt::Prompter;
use crate::resume::ResumeRecord;
use crate::store::{StackBranch, StackStore};

/// Message used when the engine stashes a dirty working tree.
pub const STASH_MESSAGE: &str = "cairn-sync-autostash";

/// Entry mode of a sync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Start a new sync.
    Fresh,
    /// Continue a sync interrupted by a rebase conflict.
    Resume,
    /// Abort an interrupted sync and restore the user's state.
    Abort,
}

/// Pull request cache for one sync run.
///
/// The bulk query returns only open PRs, so a branch missing from the
/// map may still have a merged or closed PR; those are fetched one by
/// one on demand and memoised for the rest of the run.
pub struct PrCache<'a, H: GitHubApi> {
    github: &'a H,
    open: HashMap<String, PullRequest>,
    fallback: RefCell<HashMap<String, Option<PullRequest>>>,
}

impl<'a, H: GitHubApi> PrCache<'a, H> {
    /// Wrap a bulk open-PR map.
    #[must_use]
    pub fn new(github: &'a H, open: HashMap<String, PullRequest>) -> Self {
        Self {
            github,
            open,
            fallback: RefCell::new(HashMap::new()),
        }
    }

    /// The effective PR for a branch, if any. Lookup failures count as
    /// "no PR".
    pub fn lookup(&self, branch: &str) -> Option<PullRequest> {
        if let Some(pr) = self.open.get(branch) {
            return Some(pr.clone());
        }
        if let Some(cached) = self.fallback.borrow().get(branch) {
            return cached.clone();
        }
        let fetched = self.github.pr_for_branch(branch).unwrap_or(None);
        self.fallback
            .borrow_mut()
            .insert(branch.to_string(), fetched.clone());
        fetched
    }
}

/// Everything the prelude computes locally while the network jobs run.
struct StackPlan {
    /// Branches of the current stack in bottom-to-top order.
    sorted: Vec<StackBranch>,
    /// Names of the branches in the current stack.
    stack_names: HashSet<String>,
}

/// The orchestrator for `cairn sync`.
pub struct SyncEngine<'a, G: GitOps, H: GitHubApi> {
    git: &'a G,
    github: &'a H,
    force: bool,
    verbose: bool,
}

impl<'a, G: GitOps + Sync, H: GitHubApi + Sync> SyncEngine<'a, G, H> {
    /// Create an engine over the two ports.
    #[must_use]
    pub const fn new(git: &'a G, github: &'a H, force: bool, verbose: bool) -> Self {
        Self {
            git,
            github,
            force,
            verbose,
        }
    }

    /// Run a sync in the given mode.
    ///
    /// # Errors
    /// Returns [`Error::RebaseConflict`] after printing the resume and
    /// abort recipes when a rebase stops on conflicts; in that case the
    /// resume record and any stash are deliberately left in place. All
    /// other errors restore the stash and clear the record.
    pub fn run(&self, mode: SyncMode, prompter: &dyn Prompter) -> Result<()> {
        match mode {
            SyncMode::Abort => self.abort(),
            SyncMode::Resume => self.sync(true, prompter),
            SyncMode::Fresh => self.sync(false, prompter),
        }
    }

    /// Abort an interrupted sync: stop any in-progress rebase or
    /// cherry-pick, restore the stash, return to the original branch,
    /// and clear the record. Sub-steps that fail are reported as
    /// warnings but do not abort the abort.
    fn abort(&self) -> Result<()> {
        let record = ResumeRecord::read(self.git);
        let rebasing = self.git.is_rebase_in_progress();
        let cherry_picking = self.git.is_cherry_pick_in_progress();

        if !record.exists() && !rebasing && !cherry_picking {
            return Err(Error::NothingToAbort);
        }

        println!("Aborting sync and cleaning up...");
        println!();

        if cherry_picking {
            match self.git.abort_cherry_pick() {
                Ok(()) => println!("✓ Aborted cherry-pick"),
                Err(e) => eprintln!("Warning: failed to abort cherry-pick: {e}"),
            }
        }
        if rebasing {
            match self.git.abort_rebase() {
                Ok(()) => println!("✓ Aborted rebase"),
                Err(e) => eprintln!("Warning: failed to abort rebase: {e}"),
            }
        }

        if record.stashed {
            println!("Restoring stashed changes...");
            match self.git.stash_pop() {
                Ok(()) => println!("✓ Restored stashed changes"),
                Err(e) => {
                    eprintln!("Warning: failed to restore stashed changes: {e}");
                    eprintln!("Run 'git stash pop' manually to restore your changes");
                }
            }
        }

        if let Some(original) = &record.original_branch
            && self.git.current_branch().ok().as_deref() != Some(original)
        {
            println!("Returning to {original}...");
            match self.git.checkout(original) {
                Ok(()) => println!("✓ Returned to {original}"),
                Err(e) => eprintln!("Warning: failed to return to original branch: {e}"),
            }
        }

        ResumeRecord::clear(self.git);

        println!();
        println!("✓ Sync aborted and state cleaned up");
        Ok(())
    }

    /// Fresh and resume entry points share everything past the setup.
    fn sync(&self, resume: bool, prompter: &dyn Prompter) -> Result<()> {
        let record = ResumeRecord::read(self.git);
        let original_branch: String;
        let mut stashed = false;

        if resume {
            if !record.exists() {
                return Err(Error::NothingToResume);
            }
            stashed = record.stashed;
            original_branch = match record.original_branch {
                Some(branch) => branch,
                None => self.git.current_branch()?,
            };
            println!("Resuming sync...");
            println!();
        } else {
            if record.exists() {
                let discard = prompter.confirm(
                    "Found state from a previous interrupted sync. Discard it and start fresh?",
                )?;
                if !discard {
                    println!("Keeping saved state. Run 'cairn sync --resume' to continue it.");
                    return Ok(());
                }
                ResumeRecord::clear(self.git);
            }

            original_branch = self.git.current_branch()?;
            if let Err(e) = ResumeRecord::begin(self.git, &original_branch, false) {
                eprintln!("Warning: failed to save sync state: {e}");
            }

            if !self.git.is_working_tree_clean()? {
                println!("Stashing uncommitted changes...");
                self.git.stash_push(STASH_MESSAGE)?;
                stashed = true;
                if let Err(e) = ResumeRecord::mark_stashed(self.git) {
                    eprintln!("Warning: failed to save sync state: {e}");
                }
                println!();
            }
        }

        let store = StackStore::new(self.git);
        let base_branch = store.base_branch();

        // Offer to adopt an untracked branch before any network work.
        if store.parent_of(&original_branch).is_none() && original_branch != base_branch {
            let adopt = prompter.confirm(&format!(
                "Branch '{original_branch}' is not in a stack. Add it with parent '{base_branch}'?"
            ))?;
            if !adopt {
                println!("Aborted.");
                self.restore_stash_and_clear(stashed);
                return Ok(());
            }
            store.set_parent(&original_branch, &base_branch)?;
            println!("✓ Added '{original_branch}' to stack with parent '{base_branch}'");
        }

        let result = self.sync_stack(&store, &base_branch, &original_branch, stashed);
        match result {
            // A conflict means the user is mid-resolution: the stash and
            // the resume record must survive for --resume or --abort.
            Err(Error::RebaseConflict) => Err(Error::RebaseConflict),
            Err(e) => {
                self.restore_stash_and_clear(stashed);
                Err(e)
            }
            Ok(()) => Ok(()),
        }
    }

    /// Prelude, per-branch loop, and success cleanup.
    fn sync_stack(
        &self,
        store: &StackStore<'a, G>,
        base_branch: &str,
        original_branch: &str,
        stashed: bool,
    ) -> Result<()> {
        // The fetch and the PR load are the slow network calls and have
        // no dependency on each other or on the local graph work, so
        // they run on their own threads while the plan is built.
        let mut fetch_result: cairn_git::Result<()> = Ok(());
        let mut prs_result: cairn_github::Result<HashMap<String, PullRequest>> =
            Ok(HashMap::new());
        let plan = thread::scope(|scope| {
            scope.spawn(|| fetch_result = self.git.fetch_all());
            scope.spawn(|| prs_result = self.github.all_open_prs());
            self.plan_stack(store, original_branch)
        });
        let plan = plan?;

        if plan.sorted.is_empty() {
            println!("No stack branches found.");
            self.restore_stash_and_clear(stashed);
            return Ok(());
        }

        fetch_result?;
        // PR information is an enhancement; sync the branches even when
        // the review service is unavailable.
        let prs = PrCache::new(self.github, prs_result.unwrap_or_default());

        self.check_worktrees(&plan)?;

        let remote_branches = self.git.remote_branches();

        println!("Processing {} branch(es)...", plan.sorted.len());
        println!();

        for (index, branch) in plan.sorted.iter().enumerate() {
            let mut branch = branch.clone();
            let progress = format!("({}/{})", index + 1, plan.sorted.len());

            // A branch whose own PR merged leaves the stack entirely.
            if let Some(pr) = prs.lookup(&branch.name)
                && pr.state == PrState::Merged
            {
                println!(
                    "{progress} Skipping {} (PR #{} is merged)...",
                    branch.name, pr.number
                );
                println!("  Removing from stack tracking...");
                match store.unset_parent(&branch.name) {
                    Ok(()) => println!(
                        "  ✓ Removed. You can delete this branch with: git branch -d {}",
                        branch.name
                    ),
                    Err(e) => eprintln!("  Warning: failed to remove stack config: {e}"),
                }
                println!();
                continue;
            }

            println!("{progress} Processing {}...", branch.name);
            self.sync_branch(
                store,
                &prs,
                &remote_branches,
                &plan.stack_names,
                base_branch,
                &mut branch,
                stashed,
            )?;
            println!();
        }

        println!("Returning to {original_branch}...");
        if let Err(e) = self.git.checkout(original_branch) {
            eprintln!("Warning: failed to return to original branch: {e}");
        }
        println!();

        self.print_stack(store, base_branch, original_branch, &prs);

        if stashed {
            println!();
            println!("Restoring stashed changes...");
            if let Err(e) = self.git.stash_pop() {
                eprintln!("Warning: failed to restore stashed changes: {e}");
                eprintln!("Run 'git stash pop' manually to restore your changes");
            }
        }
        ResumeRecord::clear(self.git);

        println!();
        println!("✓ Sync complete!");
        Ok(())
    }

    /// Local work done while the network jobs run: the chain from the
    /// base to the original branch, the branches of that stack, and
    /// their bottom-to-top order.
    fn plan_stack(&self, store: &StackStore<'a, G>, branch: &str) -> Result<StackPlan> {
        let chain = store.chain_to(branch)?;
        if chain.is_empty() {
            return Ok(StackPlan {
                sorted: vec![],
                stack_names: HashSet::new(),
            });
        }

        let chain_set: HashSet<&str> = chain.iter().map(String::as_str).collect();
        let in_stack: Vec<StackBranch> = store
            .all_branches()?
            .into_iter()
            .filter(|b| chain_set.contains(b.name.as_str()))
            .collect();
        let stack_names = in_stack.iter().map(|b| b.name.clone()).collect();
        let sorted = graph::topological_sort(&in_stack)?;

        Ok(StackPlan {
            sorted,
            stack_names,
        })
    }

    /// Refuse to run if any branch of this stack is checked out in a
    /// different worktree; mutating it from here would fight the other
    /// checkout.
    fn check_worktrees(&self, plan: &StackPlan) -> Result<()> {
        let worktrees = self.git.worktree_branches().unwrap_or_default();
        if worktrees.is_empty() {
            return Ok(());
        }
        let current_path = self.git.current_worktree_path().unwrap_or_default();

        for branch in &plan.sorted {
            if let Some(path) = worktrees.get(&branch.name)
                && *path != current_path
            {
                return Err(Error::WorktreeConflict {
                    branch: branch.name.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Steps 2-8 of the per-branch loop.
    #[allow(clippy::too_many_arguments)]
    fn sync_branch(
        &self,
        store: &StackStore<'a, G>,
        prs: &PrCache<'a, H>,
        remote_branches: &HashSet<String>,
        stack_names: &HashSet<String>,
        base_branch: &str,
        branch: &mut StackBranch,
        stashed: bool,
    ) -> Result<()> {
        // Collapse a merged ancestor: reparent onto the grandparent and
        // remember the old parent so its squashed commits are excluded
        // from the rebase.
        let mut old_parent: Option<String> = None;
        if let Some(parent_pr) = prs.lookup(&branch.parent)
            && parent_pr.state == PrState::Merged
        {
            println!("  Parent PR #{} has been merged", parent_pr.number);
            old_parent = Some(branch.parent.clone());

            let grandparent = store
                .parent_of(&branch.parent)
                .unwrap_or_else(|| base_branch.to_string());
            println!("  Updating parent from {} to {grandparent}", branch.parent);
            match store.set_parent(&branch.name, &grandparent) {
                Ok(()) => branch.parent = grandparent,
                Err(e) => eprintln!("  Warning: failed to update parent config: {e}"),
            }
        }

        self.git.checkout(&branch.name)?;

        let on_remote = self.reconcile_with_remote(prs, remote_branches, &branch.name)?;

        // Stack parents are rebased onto their local ref; a base parent
        // is rebased onto its remote copy so base updates flow in.
        let target = if stack_names.contains(&branch.parent) {
            branch.parent.clone()
        } else {
            format!("origin/{}", branch.parent)
        };

        self.rebase_branch(&branch.name, &branch.parent, &target, old_parent.as_deref(), stashed)?;

        if on_remote {
            println!("  Pushing to origin...");
            if let Err(source) = self.push_branch(&branch.name) {
                if !self.force {
                    eprintln!();
                    eprintln!("Possible cause:");
                    eprintln!(
                        "  Remote branch was updated after fetch - try running 'cairn sync' again"
                    );
                }
                return Err(Error::PushFailed {
                    branch: branch.name.clone(),
                    source,
                });
            }
            println!("  ✓ Pushed to origin");
        } else {
            println!("  Skipping push (branch not yet on origin)");
        }

        // PR-base edits come after the push so the review service never
        // sees a base that does not yet exist on origin. Failures here
        // are warnings; the rest of the stack still syncs.
        if let Some(pr) = prs.lookup(&branch.name) {
            if pr.base == branch.parent {
                println!("  ✓ PR #{} base is already correct ({})", pr.number, pr.base);
            } else {
                println!(
                    "  Updating PR #{} base from {} to {}...",
                    pr.number, pr.base, branch.parent
                );
                match self.github.update_pr_base(pr.number, &branch.parent) {
                    Ok(()) => println!("  ✓ PR #{} updated", pr.number),
                    Err(e) => eprintln!("  Warning: failed to update PR base: {e}"),
                }
            }
        } else {
            println!("  No PR found (create one with 'gh pr create')");
        }

        Ok(())
    }

    /// Step 4: bring the local branch into a known relation with its
    /// remote copy. Returns whether the branch exists on origin.
    fn reconcile_with_remote(
        &self,
        prs: &PrCache<'a, H>,
        remote_branches: &HashSet<String>,
        branch: &str,
    ) -> Result<bool> {
        let has_tracking_ref = remote_branches.contains(branch);
        // A PR proves the branch is on origin even when the tracking ref
        // was never fetched.
        let mut on_remote = has_tracking_ref || prs.lookup(branch).is_some();

        if on_remote && !has_tracking_ref {
            if self.verbose {
                println!("  Fetching remote branch (local tracking ref missing)...");
            }
            if self.git.fetch_branch(branch).is_err() {
                if self.verbose {
                    println!("  Could not fetch remote branch, treating as new branch");
                }
                on_remote = false;
            }
        }

        if !on_remote || self.force {
            if self.verbose {
                if self.force && on_remote {
                    println!("  Skipping divergence check (--force enabled)");
                } else if !on_remote {
                    println!("  Remote branch origin/{branch} doesn't exist yet (new branch)");
                }
            }
            return Ok(on_remote);
        }

        let remote_ref = format!("origin/{branch}");
        let local_sha = self.git.commit_hash(branch)?;
        let remote_sha = self.git.commit_hash(&remote_ref)?;

        if local_sha == remote_sha {
            if self.verbose {
                println!("  Local branch is up-to-date with origin/{branch}");
            }
            return Ok(true);
        }

        let merge_base = self.git.merge_base(branch, &remote_ref)?;
        if merge_base == remote_sha {
            if self.verbose {
                println!("  Local branch is ahead of origin (has new commits)");
            }
        } else if merge_base == local_sha {
            println!("  Fast-forwarding to origin/{branch}...");
            self.git.reset_to_remote(branch)?;
        } else if self.verbose {
            // Diverged: expected after rebasing onto an updated parent.
            // The lease push will either succeed or reject safely.
            println!("  Local and remote have diverged (normal after rebase)");
        }

        Ok(true)
    }

    /// Steps 5-6: pick a rebase mode and run it.
    fn rebase_branch(
        &self,
        branch: &str,
        parent: &str,
        target: &str,
        old_parent: Option<&str>,
        stashed: bool,
    ) -> Result<()> {
        let mode = self.choose_rebase_mode(branch, target, old_parent)?;

        let outcome = match &mode {
            RebaseMode::Skip => {
                if self.verbose {
                    println!("  Branch is up-to-date with {target} (no unique patches)");
                }
                return Ok(());
            }
            RebaseMode::Rejected(pollution) => {
                self.print_pollution_recipe(branch, parent, pollution);
                return Err(Error::PollutedHistory {
                    total_commits: pollution.total_commits,
                    unique_patches: pollution.unique_commits.len(),
                });
            }
            RebaseMode::Plain => {
                println!("  Rebasing onto {target}...");
                self.git.rebase(target)
            }
            RebaseMode::Onto { excluded_base } => {
                if old_parent.is_some() {
                    println!(
                        "  Using --onto to handle squash merge (excluding commits from {excluded_base})"
                    );
                } else if self.verbose {
                    println!(
                        "  Using --onto with merge-base {} to handle rebased parent",
                        short_sha(excluded_base)
                    );
                }
                println!("  Rebasing onto {target}...");
                self.git.rebase_onto(target, excluded_base, branch)
            }
        };

        match outcome {
            Ok(()) => {
                println!("  ✓ Rebased onto {target}");
                Ok(())
            }
            Err(_) => {
                self.print_conflict_recipe(stashed);
                Err(Error::RebaseConflict)
            }
        }
    }

    /// Gather the inputs the rebase policy needs. Metric failures fall
    /// back to a plain rebase, which git resolves one way or the other.
    fn choose_rebase_mode(
        &self,
        branch: &str,
        target: &str,
        old_parent: Option<&str>,
    ) -> Result<RebaseMode> {
        if old_parent.is_some() {
            return Ok(policy::select_rebase_mode(old_parent, &[], None, None, None));
        }

        let patch_unique = match self.git.commits_unique_by_patch(target, branch) {
            Ok(commits) => commits,
            Err(e) => {
                if self.verbose {
                    println!("  Could not get unique commits by patch, using regular rebase: {e}");
                }
                return Ok(RebaseMode::Plain);
            }
        };
        if patch_unique.is_empty() {
            return Ok(RebaseMode::Skip);
        }
        if self.verbose {
            println!(
                "  Found {} unique commit(s) by patch comparison",
                patch_unique.len()
            );
        }

        let merge_base = match self.git.merge_base(branch, target) {
            Ok(merge_base) => merge_base,
            Err(e) => {
                if self.verbose {
                    println!("  Could not find merge-base, using regular rebase: {e}");
                }
                return Ok(RebaseMode::Plain);
            }
        };

        let target_sha = self.git.commit_hash(target).ok();
        let total_commits = self
            .git
            .commits_unique_by_sha(&merge_base, branch)
            .ok()
            .map(|commits| commits.len());

        Ok(policy::select_rebase_mode(
            None,
            &patch_unique,
            Some(&merge_base),
            target_sha.as_deref(),
            total_commits,
        ))
    }

    /// Step 7: push with the safest usable lease.
    fn push_branch(&self, branch: &str) -> cairn_git::Result<()> {
        let refreshed = if self.force {
            None
        } else {
            // Refresh the tracking ref right before the push so the
            // lease names the SHA origin actually holds.
            if self.verbose {
                println!("  Refreshing remote tracking ref before push...");
            }
            match self.git.fetch_branch(branch) {
                Ok(()) => self.git.commit_hash(&format!("origin/{branch}")).ok(),
                Err(e) => {
                    if self.verbose {
                        println!("  Note: could not refresh tracking ref: {e}");
                    }
                    None
                }
            }
        };

        match policy::choose_push_lease(self.force, refreshed.as_deref()) {
            PushLease::Unconditional => {
                if self.verbose {
                    println!("  Using --force (bypassing safety checks)");
                }
                self.git.force_push(branch)
            }
            PushLease::Explicit(sha) => self.git.push_with_expected_remote(branch, &sha),
            PushLease::Plain => self.git.push(branch, true),
        }
    }

    /// Restore the stash (when one was pushed) and drop the record. Used
    /// on every exit path except success and rebase conflicts.
    fn restore_stash_and_clear(&self, stashed: bool) {
        if stashed {
            println!();
            println!("Restoring stashed changes...");
            if let Err(e) = self.git.stash_pop() {
                eprintln!("Warning: failed to restore stashed changes: {e}");
                eprintln!("Run 'git stash pop' manually to restore your changes");
            }
        }
        ResumeRecord::clear(self.git);
    }

    fn print_pollution_recipe(&self, branch: &str, parent: &str, pollution: &PollutedHistory) {
        let unique = &pollution.unique_commits;
        eprintln!();
        eprintln!("⚠ Detected polluted branch history:");
        eprintln!("  - {} commits in branch history", pollution.total_commits);
        eprintln!("  - Only {} unique patch(es)", unique.len());
        eprintln!();
        eprintln!("This usually means your branch diverged from the parent's history.");
        eprintln!("Rebasing may result in many conflicts.");
        eprintln!();
        eprintln!("Recommended: Rebuild branch manually with cherry-pick:");
        eprintln!("  1. git checkout {parent}");
        eprintln!("  2. git checkout -b {branch}-clean");
        for commit in unique.iter().take(5) {
            eprintln!("  3. git cherry-pick {}", short_sha(commit));
        }
        if unique.len() > 5 {
            eprintln!("     ... ({} more commits)", unique.len() - 5);
        }
        eprintln!("  4. git branch -D {branch}");
        eprintln!("  5. git branch -m {branch}");
        eprintln!("  6. git push --force-with-lease");
        eprintln!();
    }

    fn print_conflict_recipe(&self, stashed: bool) {
        eprintln!();
        eprintln!("  Rebase conflict detected. To continue:");
        eprintln!("    1. Resolve the conflicts");
        eprintln!("    2. Run 'git add <resolved files>'");
        eprintln!("    3. Run 'git rebase --continue'");
        eprintln!("    4. Run 'cairn sync --resume'");
        eprintln!();
        eprintln!("  Or to abort the sync:");
        eprintln!("    Run 'cairn sync --abort'");
        if stashed {
            eprintln!();
            eprintln!(
                "  Note: Your uncommitted changes have been stashed and will be restored when you run --resume or --abort"
            );
        }
    }

    /// Show the synced stack, hiding branches whose PRs merged unless
    /// they still carry children.
    fn print_stack(
        &self,
        store: &StackStore<'a, G>,
        base_branch: &str,
        current: &str,
        prs: &PrCache<'a, H>,
    ) {
        let tree = store
            .chain_to(current)
            .and_then(|chain| Ok((chain, store.all_branches()?)))
            .map(|(chain, branches)| graph::build_tree(base_branch, &chain, &branches));
        match tree {
            Ok(Some(mut tree)) => {
                filter_merged_children(&mut tree, prs);
                print_tree(&tree, current, base_branch, prs, false);
            }
            Ok(None) => {}
            Err(e) => eprintln!("Warning: failed to display stack status: {e}"),
        }
    }
}

/// Drop merged leaf branches from the display tree; a merged branch with
/// surviving children stays so the structure remains readable.
fn filter_merged_children<H: GitHubApi>(node: &mut TreeNode, prs: &PrCache<'_, H>) {
    let children = std::mem::take(&mut node.children);
    for mut child in children {
        filter_merged_children(&mut child, prs);
        let merged = prs
            .lookup(&child.name)
            .is_some_and(|pr| pr.state == PrState::Merged);
        if merged && child.children.is_empty() {
            continue;
        }
        node.children.push(child);
    }
}

/// Vertical tree print: one branch per line, `|` between levels, `*`
/// marking the current branch, PR annotation where one exists.
fn print_tree<H: GitHubApi>(
    node: &TreeNode,
    current: &str,
    base_branch: &str,
    prs: &PrCache<'_, H>,
    piped: bool,
) {
    if piped {
        println!("  |");
    }
    let marker = if node.name == current { " *" } else { "" };
    let pr_info = if node.name == base_branch {
        String::new()
    } else {
        prs.lookup(&node.name)
            .map(|pr| format!(" [{} :{}]", pr.url, pr.state))
            .unwrap_or_default()
    };
    println!(" {}{pr_info}{marker}", node.name);

    for child in &node.children {
        print_tree(child, current, base_branch, prs, true);
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resume::{ORIGINAL_BRANCH_KEY, STASHED_KEY};
    use crate::store::parent_key;
    use crate::testing::{MockGit, MockGitHub, ScriptedPrompter};

    /// main <- feature-a <- feature-b, everything pushed, tips matching
    /// origin, user sitting on feature-b.
    fn linear_stack() -> MockGit {
        MockGit::new()
            .with_branch("main", "m2")
            .with_remote("main", "m2")
            .with_branch("feature-a", "a1")
            .with_remote("feature-a", "a1")
            .with_branch("feature-b", "b1")
            .with_remote("feature-b", "b1")
            .with_parent("feature-a", "main")
            .with_parent("feature-b", "feature-a")
            .with_current("feature-b")
    }

    fn run_fresh(git: &MockGit, github: &MockGitHub) -> Result<()> {
        SyncEngine::new(git, github, false, false).run(SyncMode::Fresh, &ScriptedPrompter::yes())
    }

    #[test]
    fn test_linear_sync_rebases_and_pushes_bottom_up() {
        // main moved on origin since feature-a forked; feature-b still
        // sits on feature-a's tip.
        let git = linear_stack()
            .with_patch_unique("feature-a", &["pa1"])
            .with_patch_unique("feature-b", &["pb1"])
            .with_merge_base("feature-a", "origin/main", "m1")
            .with_merge_base("feature-b", "feature-a", "a1");
        let github = MockGitHub::new();

        run_fresh(&git, &github).unwrap();

        // feature-a: parent moved, so only its unique commits replay.
        let rebase_a = git.call_index("rebase-onto origin/main m1 feature-a").unwrap();
        let push_a = git.call_index("push-lease feature-a a1").unwrap();
        // feature-b: parent unmoved (merge-base == feature-a tip).
        let rebase_b = git.call_index("rebase feature-a").unwrap();
        let push_b = git.call_index("push-lease feature-b b1").unwrap();

        // A parent is fully processed before its child begins.
        assert!(rebase_a < push_a && push_a < rebase_b && rebase_b < push_b);

        // Ends back on the original branch with the record cleared.
        assert_eq!(git.current(), "feature-b");
        assert_eq!(git.config_value(STASHED_KEY), None);
        assert_eq!(git.config_value(ORIGINAL_BRANCH_KEY), None);
    }

    #[test]
    fn test_up_to_date_stack_skips_rebases() {
        // No patch-unique commits anywhere: nothing to replay.
        let git = linear_stack()
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_merge_base("feature-b", "feature-a", "a1");
        let github = MockGitHub::new();

        run_fresh(&git, &github).unwrap();

        assert!(!git.called("rebase"));
        assert!(git.called("push-lease feature-a"));
        assert!(git.called("push-lease feature-b"));
    }

    #[test]
    fn test_merged_branch_is_untracked_and_skipped() {
        let git = linear_stack().with_merge_base("feature-a", "origin/main", "m2");
        let github = MockGitHub::new().with_merged_pr("feature-b", 7, "feature-a");

        run_fresh(&git, &github).unwrap();

        assert_eq!(git.config_value(&parent_key("feature-b")), None);
        assert!(!git.called("checkout feature-b") || git.current() == "feature-b");
        assert!(!git.called("rebase feature-a"));
    }

    #[test]
    fn test_merged_parent_collapses_with_onto() {
        let git = linear_stack();
        let github = MockGitHub::new().with_merged_pr("feature-a", 1, "main");

        run_fresh(&git, &github).unwrap();

        // feature-a left the stack (no merged PR keeps an edge).
        assert_eq!(git.config_value(&parent_key("feature-a")), None);
        // feature-b was reparented onto the base and rebased with the old
        // parent excluded, the squash-merge path.
        assert_eq!(
            git.config_value(&parent_key("feature-b")).as_deref(),
            Some("main")
        );
        assert!(git.called("rebase-onto origin/main feature-a feature-b"));
    }

    #[test]
    fn test_pr_base_drift_is_corrected_after_push() {
        let git = linear_stack()
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_merge_base("feature-b", "feature-a", "a1");
        // feature-b's PR wrongly points at main instead of feature-a.
        let github = MockGitHub::new()
            .with_open_pr("feature-a", 1, "main")
            .with_open_pr("feature-b", 2, "main");

        run_fresh(&git, &github).unwrap();

        assert_eq!(github.base_updates(), vec![(2, "feature-a".to_string())]);
        assert!(git.called("push-lease feature-b"));
    }

    #[test]
    fn test_conflict_preserves_stash_and_record() {
        let git = linear_stack()
            .with_dirty_tree()
            .with_patch_unique("feature-a", &["pa1"])
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_rebase_conflict("feature-a");
        let github = MockGitHub::new();

        let err = run_fresh(&git, &github).unwrap_err();
        assert!(matches!(err, Error::RebaseConflict));

        // The stash and the record must survive for --resume / --abort.
        assert!(git.called("stash-push"));
        assert!(!git.called("stash-pop"));
        assert_eq!(git.config_value(STASHED_KEY).as_deref(), Some("true"));
        assert_eq!(
            git.config_value(ORIGINAL_BRANCH_KEY).as_deref(),
            Some("feature-b")
        );
        assert!(git.rebasing());
    }

    #[test]
    fn test_abort_restores_everything() {
        let git = linear_stack()
            .with_dirty_tree()
            .with_patch_unique("feature-a", &["pa1"])
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_rebase_conflict("feature-a");
        let github = MockGitHub::new();
        run_fresh(&git, &github).unwrap_err();

        SyncEngine::new(&git, &github, false, false)
            .run(SyncMode::Abort, &ScriptedPrompter::yes())
            .unwrap();

        assert!(git.called("abort-rebase"));
        assert!(git.called("stash-pop"));
        assert_eq!(git.current(), "feature-b");
        assert_eq!(git.config_value(STASHED_KEY), None);
        assert_eq!(git.config_value(ORIGINAL_BRANCH_KEY), None);
    }

    #[test]
    fn test_abort_without_state_fails() {
        let git = MockGit::new();
        let github = MockGitHub::new();
        let err = SyncEngine::new(&git, &github, false, false)
            .run(SyncMode::Abort, &ScriptedPrompter::yes())
            .unwrap_err();
        assert!(matches!(err, Error::NothingToAbort));
    }

    #[test]
    fn test_resume_without_state_fails() {
        let git = MockGit::new();
        let github = MockGitHub::new();
        let err = SyncEngine::new(&git, &github, false, false)
            .run(SyncMode::Resume, &ScriptedPrompter::yes())
            .unwrap_err();
        assert!(matches!(err, Error::NothingToResume));
    }

    #[test]
    fn test_resume_adopts_record_and_pops_stash_on_success() {
        let git = linear_stack()
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_merge_base("feature-b", "feature-a", "a1");
        git.set(STASHED_KEY, "true");
        git.set(ORIGINAL_BRANCH_KEY, "feature-b");
        let github = MockGitHub::new();

        SyncEngine::new(&git, &github, false, false)
            .run(SyncMode::Resume, &ScriptedPrompter::yes())
            .unwrap();

        assert!(git.called("stash-pop"));
        assert_eq!(git.config_value(STASHED_KEY), None);
        assert_eq!(git.config_value(ORIGINAL_BRANCH_KEY), None);
    }

    #[test]
    fn test_divergence_keeps_local_and_uses_explicit_lease() {
        // Local feature-a was rewritten; origin still has the old tip.
        let git = MockGit::new()
            .with_branch("main", "m1")
            .with_remote("main", "m1")
            .with_branch("feature-a", "a2")
            .with_remote("feature-a", "a9")
            .with_parent("feature-a", "main")
            .with_current("feature-a")
            .with_merge_base("feature-a", "origin/feature-a", "z0")
            .with_merge_base("feature-a", "origin/main", "m1");
        let github = MockGitHub::new();

        run_fresh(&git, &github).unwrap();

        // Neither fast-forward nor hard reset on divergence.
        assert!(!git.called("reset-to-remote"));
        // The push names the freshly read remote SHA.
        assert!(git.called("push-lease feature-a a9"));
    }

    #[test]
    fn test_behind_branch_fast_forwards() {
        let git = MockGit::new()
            .with_branch("main", "m1")
            .with_remote("main", "m1")
            .with_branch("feature-a", "a1")
            .with_remote("feature-a", "a2")
            .with_parent("feature-a", "main")
            .with_current("feature-a")
            // merge-base == local tip: strictly behind.
            .with_merge_base("feature-a", "origin/feature-a", "a1")
            .with_merge_base("feature-a", "origin/main", "m1");
        let github = MockGitHub::new();

        run_fresh(&git, &github).unwrap();

        assert!(git.called("reset-to-remote feature-a"));
    }

    #[test]
    fn test_polluted_history_is_rejected_before_rebasing() {
        let shas: Vec<String> = (0..20).map(|i| format!("c{i}")).collect();
        let sha_refs: Vec<&str> = shas.iter().map(String::as_str).collect();
        let git = linear_stack()
            .with_patch_unique("feature-a", &["p1", "p2", "p3"])
            .with_sha_unique("feature-a", &sha_refs)
            .with_merge_base("feature-a", "origin/main", "m1");
        let github = MockGitHub::new();

        let err = run_fresh(&git, &github).unwrap_err();
        assert!(matches!(
            err,
            Error::PollutedHistory {
                total_commits: 20,
                unique_patches: 3
            }
        ));
        assert!(!git.called("rebase"));
        // Not a conflict: state is cleaned up.
        assert_eq!(git.config_value(STASHED_KEY), None);
        assert_eq!(git.config_value(ORIGINAL_BRANCH_KEY), None);
    }

    #[test]
    fn test_worktree_conflict_refuses_to_run() {
        let git = linear_stack().with_worktree("feature-a", "/elsewhere");
        let github = MockGitHub::new();

        let err = run_fresh(&git, &github).unwrap_err();
        match err {
            Error::WorktreeConflict { branch, path } => {
                assert_eq!(branch, "feature-a");
                assert_eq!(path, "/elsewhere");
            }
            other => panic!("expected worktree conflict, got {other:?}"),
        }
        assert!(!git.called("checkout"));
    }

    #[test]
    fn test_untracked_branch_is_adopted_on_yes() {
        let git = MockGit::new()
            .with_branch("main", "m1")
            .with_remote("main", "m1")
            .with_branch("lonely", "l1")
            .with_current("lonely");
        let github = MockGitHub::new();

        run_fresh(&git, &github).unwrap();

        assert_eq!(
            git.config_value(&parent_key("lonely")).as_deref(),
            Some("main")
        );
        // New branch, not on origin: no push.
        assert!(!git.called("push"));
    }

    #[test]
    fn test_untracked_branch_decline_exits_cleanly() {
        let git = MockGit::new()
            .with_branch("main", "m1")
            .with_branch("lonely", "l1")
            .with_current("lonely");
        let github = MockGitHub::new();

        SyncEngine::new(&git, &github, false, false)
            .run(SyncMode::Fresh, &ScriptedPrompter::answering(&[false]))
            .unwrap();

        assert_eq!(git.config_value(&parent_key("lonely")), None);
        assert!(!git.called("fetch"));
        assert_eq!(git.config_value(ORIGINAL_BRANCH_KEY), None);
    }

    #[test]
    fn test_stale_record_kept_when_user_declines_fresh_start() {
        let git = linear_stack();
        git.set(ORIGINAL_BRANCH_KEY, "feature-b");
        let github = MockGitHub::new();

        SyncEngine::new(&git, &github, false, false)
            .run(SyncMode::Fresh, &ScriptedPrompter::answering(&[false]))
            .unwrap();

        // Nothing ran; the record survives for --resume.
        assert_eq!(
            git.config_value(ORIGINAL_BRANCH_KEY).as_deref(),
            Some("feature-b")
        );
        assert!(!git.called("fetch"));
    }

    #[test]
    fn test_force_mode_skips_reconcile_and_force_pushes() {
        let git = linear_stack()
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_merge_base("feature-b", "feature-a", "a1");
        let github = MockGitHub::new();

        SyncEngine::new(&git, &github, true, false)
            .run(SyncMode::Fresh, &ScriptedPrompter::yes())
            .unwrap();

        assert!(git.called("force-push feature-a"));
        assert!(git.called("force-push feature-b"));
        assert!(!git.called("push-lease"));
    }

    #[test]
    fn test_bulk_pr_failure_degrades_to_no_prs() {
        let git = linear_stack()
            .with_merge_base("feature-a", "origin/main", "m2")
            .with_merge_base("feature-b", "feature-a", "a1");
        let github = MockGitHub::new().with_bulk_failure();

        run_fresh(&git, &github).unwrap();

        assert!(git.called("push-lease feature-a"));
        assert!(github.base_updates().is_empty());
    }

    #[test]
    fn test_merged_parents_found_despite_open_only_bulk() {
        // The bulk map is empty (open PRs only); the merged parent is
        // discovered through the per-branch fallback lookup.
        let git = linear_stack();
        let github = MockGitHub::new().with_merged_pr("feature-a", 1, "main");

        run_fresh(&git, &github).unwrap();

        assert!(github.lookups().iter().any(|b| b == "feature-a"));
        assert_eq!(git.config_value(&parent_key("feature-a")), None);
    }
}
