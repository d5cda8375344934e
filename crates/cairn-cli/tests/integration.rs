//! Integration tests for the cairn CLI.
//!
//! These run against real temporary repositories. The sync test wires up
//! a bare local `origin`, so the full fetch/rebase/push path is
//! exercised without any review service (PR queries fail closed and the
//! engine degrades to an empty PR cache).

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    fs::write(dir.join(name), content).expect("failed to write file");
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", message]);
}

/// A repository with one commit on `main`.
fn setup_repo() -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");
    git(temp.path(), &["init"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["config", "user.name", "Test User"]);
    commit_file(temp.path(), "README.md", "# test\n", "initial commit");
    git(temp.path(), &["branch", "-M", "main"]);
    temp
}

fn cairn(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cairn"));
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_version_flag() {
    Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cairn"));
}

#[test]
fn test_fails_outside_repository() {
    let temp = TempDir::new().unwrap();
    cairn(temp.path())
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in a git repository"));
}

#[test]
fn test_create_records_parent_edge() {
    let repo = setup_repo();

    cairn(repo.path())
        .args(["create", "feature-a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created branch feature-a"));

    assert_eq!(
        git(repo.path(), &["config", "branch.feature-a.stackparent"]),
        "main"
    );
    assert_eq!(git(repo.path(), &["branch", "--show-current"]), "feature-a");
}

#[test]
fn test_create_refuses_dirty_tree() {
    let repo = setup_repo();
    fs::write(repo.path().join("dirty.txt"), "x").unwrap();

    cairn(repo.path())
        .args(["create", "feature-a"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("uncommitted changes"));
}

#[test]
fn test_create_refuses_existing_name() {
    let repo = setup_repo();
    cairn(repo.path()).args(["create", "feature-a"]).assert().success();

    cairn(repo.path())
        .args(["create", "feature-a"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_create_surfaces_invalid_name_from_git() {
    // Name validity is git's call; its rejection comes back verbatim.
    let repo = setup_repo();
    cairn(repo.path())
        .args(["create", "bad..name"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not a valid branch name"));
}

#[test]
fn test_show_marks_current_branch() {
    let repo = setup_repo();
    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    cairn(repo.path()).args(["create", "feature-b"]).assert().success();

    cairn(repo.path())
        .arg("show")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("main")
                .and(predicate::str::contains("feature-a"))
                .and(predicate::str::contains("feature-b *")),
        );
}

#[test]
fn test_parent_and_navigation() {
    let repo = setup_repo();
    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    cairn(repo.path()).args(["create", "feature-b"]).assert().success();

    cairn(repo.path())
        .arg("parent")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("feature-a"));

    cairn(repo.path()).arg("up").assert().success();
    assert_eq!(git(repo.path(), &["branch", "--show-current"]), "feature-a");

    // Single child: no prompt needed.
    cairn(repo.path()).arg("down").assert().success();
    assert_eq!(git(repo.path(), &["branch", "--show-current"]), "feature-b");

    cairn(repo.path())
        .arg("down")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no children"));
}

#[test]
fn test_rename_repoints_children() {
    let repo = setup_repo();
    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    cairn(repo.path()).args(["create", "feature-b"]).assert().success();

    git(repo.path(), &["checkout", "feature-a"]);
    cairn(repo.path())
        .args(["rename", "feature-a2"])
        .assert()
        .success();

    assert_eq!(git(repo.path(), &["branch", "--show-current"]), "feature-a2");
    assert_eq!(
        git(repo.path(), &["config", "branch.feature-a2.stackparent"]),
        "main"
    );
    assert_eq!(
        git(repo.path(), &["config", "branch.feature-b.stackparent"]),
        "feature-a2"
    );
}

#[test]
fn test_reparent_rejects_cycle() {
    let repo = setup_repo();
    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    cairn(repo.path()).args(["create", "feature-b"]).assert().success();

    git(repo.path(), &["checkout", "feature-a"]);
    cairn(repo.path())
        .args(["reparent", "feature-b"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("would create a cycle"));
}

#[test]
fn test_reparent_records_edge() {
    let repo = setup_repo();
    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    git(repo.path(), &["checkout", "main"]);
    git(repo.path(), &["checkout", "-b", "loose"]);

    cairn(repo.path())
        .args(["reparent", "feature-a"])
        .assert()
        .success();

    assert_eq!(
        git(repo.path(), &["config", "branch.loose.stackparent"]),
        "feature-a"
    );
}

#[test]
fn test_sync_abort_without_state_fails() {
    let repo = setup_repo();
    cairn(repo.path())
        .args(["sync", "--abort"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no interrupted sync to abort"));
}

/// Scenario: main <- feature-a, both on origin, main then advances on
/// origin. A sync from feature-a must fetch, rebase feature-a onto
/// origin/main, and push the rewritten branch.
#[test]
fn test_sync_rebases_stack_onto_moved_base() {
    let repo = setup_repo();

    // A bare origin with main and feature-a pushed.
    let origin = TempDir::new().unwrap();
    git(origin.path(), &["init", "--bare"]);
    git(
        repo.path(),
        &[
            "remote",
            "add",
            "origin",
            origin.path().to_str().unwrap(),
        ],
    );
    git(repo.path(), &["push", "origin", "main"]);

    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    commit_file(repo.path(), "a.txt", "a\n", "add a");
    git(repo.path(), &["push", "origin", "feature-a"]);

    // Advance main on origin.
    git(repo.path(), &["checkout", "main"]);
    commit_file(repo.path(), "base.txt", "base\n", "advance main");
    git(repo.path(), &["push", "origin", "main"]);
    let new_main = git(repo.path(), &["rev-parse", "main"]);

    git(repo.path(), &["checkout", "feature-a"]);
    cairn(repo.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete!"));

    // feature-a now sits on the advanced main.
    assert_eq!(
        git(repo.path(), &["merge-base", "feature-a", "main"]),
        new_main
    );
    // The rewritten branch was pushed.
    assert_eq!(
        git(repo.path(), &["rev-parse", "feature-a"]),
        git(repo.path(), &["rev-parse", "origin/feature-a"])
    );
    // Back on the original branch with no resume state left behind.
    assert_eq!(git(repo.path(), &["branch", "--show-current"]), "feature-a");
    let state = StdCommand::new("git")
        .args(["config", "stack.sync.originalBranch"])
        .current_dir(repo.path())
        .output()
        .unwrap();
    assert!(!state.status.success(), "resume record should be cleared");
}

/// Running sync twice back-to-back: the second run finds nothing to do
/// and leaves the refs untouched.
#[test]
fn test_sync_twice_is_idempotent() {
    let repo = setup_repo();

    let origin = TempDir::new().unwrap();
    git(origin.path(), &["init", "--bare"]);
    git(
        repo.path(),
        &[
            "remote",
            "add",
            "origin",
            origin.path().to_str().unwrap(),
        ],
    );
    git(repo.path(), &["push", "origin", "main"]);

    cairn(repo.path()).args(["create", "feature-a"]).assert().success();
    commit_file(repo.path(), "a.txt", "a\n", "add a");
    git(repo.path(), &["push", "origin", "feature-a"]);

    cairn(repo.path()).arg("sync").assert().success();
    let tip_after_first = git(repo.path(), &["rev-parse", "feature-a"]);

    cairn(repo.path()).arg("sync").assert().success();
    assert_eq!(git(repo.path(), &["rev-parse", "feature-a"]), tip_after_first);
}
