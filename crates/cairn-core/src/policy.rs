//! Rebase and push policy, separated from subprocess plumbing so the
//! decision trees are unit-testable on plain refs and SHAs.

/// A branch whose commit count exceeds this multiple of its patch-unique
/// commit count is considered polluted: its history carries many
/// duplicate or rewritten commits and a rebase would surface a conflict
/// per duplicate. Heuristic, kept as a named constant so it reads as the
/// tunable it is.
pub const POLLUTION_FACTOR: usize = 2;

/// Evidence backing a polluted-history rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollutedHistory {
    /// All commits on the branch since the merge-base.
    pub total_commits: usize,
    /// The patch-unique commits, oldest first, for the cherry-pick
    /// recipe shown to the user.
    pub unique_commits: Vec<String>,
}

/// How a branch should be rebased onto its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseMode {
    /// Every patch already exists on the target; nothing to do.
    Skip,
    /// The parent has not moved since the branch forked; plain rebase.
    Plain,
    /// Replay only the commits after `excluded_base` onto the target
    /// (`git rebase --onto <target> <excluded_base> <branch>`).
    Onto {
        /// Ref whose commits are excluded from the replay: the old,
        /// now-merged parent, or the merge-base of a rewritten parent.
        excluded_base: String,
    },
    /// History is polluted; refuse to rebase and hand the user a manual
    /// cleanup recipe instead.
    Rejected(PollutedHistory),
}

/// Pick the rebase mode for one branch.
///
/// * `old_parent` is set when a merged ancestor was collapsed away this
///   run; its commits were squashed into the target and must not be
///   replayed.
/// * `patch_unique` are the branch's commits whose patch-id is absent
///   from the target.
/// * `merge_base` / `target_sha` decide whether the target moved since
///   the branch forked. Either being unknown falls back to a plain
///   rebase, which git will resolve one way or the other.
/// * `total_commits` (commits since merge-base, by SHA) feeds the
///   pollution guard; unknown skips the guard.
#[must_use]
pub fn select_rebase_mode(
    old_parent: Option<&str>,
    patch_unique: &[String],
    merge_base: Option<&str>,
    target_sha: Option<&str>,
    total_commits: Option<usize>,
) -> RebaseMode {
    if let Some(old_parent) = old_parent {
        return RebaseMode::Onto {
            excluded_base: old_parent.to_string(),
        };
    }

    if patch_unique.is_empty() {
        return RebaseMode::Skip;
    }

    let Some(merge_base) = merge_base else {
        return RebaseMode::Plain;
    };
    if target_sha == Some(merge_base) {
        return RebaseMode::Plain;
    }

    if let Some(total) = total_commits
        && is_polluted(total, patch_unique.len())
    {
        return RebaseMode::Rejected(PollutedHistory {
            total_commits: total,
            unique_commits: patch_unique.to_vec(),
        });
    }

    RebaseMode::Onto {
        excluded_base: merge_base.to_string(),
    }
}

/// Substantially more SHAs than distinct patches means the history is
/// polluted by duplicate or rewritten commits.
#[must_use]
pub const fn is_polluted(total_commits: usize, patch_unique: usize) -> bool {
    total_commits > patch_unique * POLLUTION_FACTOR
}

/// Which precondition a push should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushLease {
    /// `--force-with-lease` relying on the current tracking ref.
    Plain,
    /// `--force-with-lease=refs/heads/<branch>:<sha>` with a SHA read
    /// after a fresh targeted fetch. Preferred: immune to the "stale
    /// info" rejections the plain form produces under concurrent
    /// fetches.
    Explicit(String),
    /// Unconditional `--force`.
    Unconditional,
}

/// Pick the push form: unconditional when the user forced it, an
/// explicit lease when the refreshed remote SHA is known, a plain lease
/// otherwise.
#[must_use]
pub fn choose_push_lease(force: bool, refreshed_remote_sha: Option<&str>) -> PushLease {
    if force {
        PushLease::Unconditional
    } else {
        match refreshed_remote_sha {
            Some(sha) => PushLease::Explicit(sha.to_string()),
            None => PushLease::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shas(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("sha{i}")).collect()
    }

    #[test]
    fn test_merged_parent_forces_onto_old_parent() {
        let mode = select_rebase_mode(Some("feature-a"), &shas(1), None, None, None);
        assert_eq!(
            mode,
            RebaseMode::Onto {
                excluded_base: "feature-a".to_string()
            }
        );
    }

    #[test]
    fn test_no_unique_patches_skips() {
        let mode = select_rebase_mode(None, &[], Some("mb"), Some("mb"), Some(0));
        assert_eq!(mode, RebaseMode::Skip);
    }

    #[test]
    fn test_unmoved_parent_rebases_plain() {
        let mode = select_rebase_mode(None, &shas(2), Some("mb"), Some("mb"), Some(2));
        assert_eq!(mode, RebaseMode::Plain);
    }

    #[test]
    fn test_unknown_merge_base_rebases_plain() {
        let mode = select_rebase_mode(None, &shas(2), None, Some("t"), Some(2));
        assert_eq!(mode, RebaseMode::Plain);
    }

    #[test]
    fn test_moved_parent_rebases_onto_merge_base() {
        let mode = select_rebase_mode(None, &shas(2), Some("mb"), Some("tip"), Some(3));
        assert_eq!(
            mode,
            RebaseMode::Onto {
                excluded_base: "mb".to_string()
            }
        );
    }

    #[test]
    fn test_polluted_history_is_rejected() {
        let mode = select_rebase_mode(None, &shas(3), Some("mb"), Some("tip"), Some(20));
        match mode {
            RebaseMode::Rejected(pollution) => {
                assert_eq!(pollution.total_commits, 20);
                assert_eq!(pollution.unique_commits.len(), 3);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_pollution_threshold_boundary() {
        // Exactly 2x is still acceptable; one more commit is not.
        assert!(!is_polluted(6, 3));
        assert!(is_polluted(7, 3));
        assert!(!is_polluted(0, 0));
        assert!(is_polluted(1, 0));
    }

    #[test]
    fn test_threshold_boundary_in_mode_selection() {
        let mode = select_rebase_mode(None, &shas(3), Some("mb"), Some("tip"), Some(6));
        assert_eq!(
            mode,
            RebaseMode::Onto {
                excluded_base: "mb".to_string()
            }
        );
    }

    #[test]
    fn test_push_lease_selection() {
        assert_eq!(
            choose_push_lease(true, Some("abc")),
            PushLease::Unconditional
        );
        assert_eq!(
            choose_push_lease(false, Some("abc")),
            PushLease::Explicit("abc".to_string())
        );
        assert_eq!(choose_push_lease(false, None), PushLease::Plain);
    }
}
