//! Subprocess-backed implementation of [`GitHubApi`] using the gh CLI.

use std::collections::HashMap;
use std::process::Command;

use crate::error::{Error, Result};
use crate::traits::GitHubApi;
use crate::types::{ApiPullRequest, PullRequest};

/// JSON fields requested from gh for every PR query.
const PR_FIELDS: &str = "number,state,headRefName,baseRefName,title,url,mergeStateStatus";

/// Limit for the bulk open-PR listing.
const PR_LIST_LIMIT: &str = "1000";

/// Extract a repository identifier from a git remote URL.
///
/// For github.com the identifier is `owner/repo` (gh's default host);
/// for self-hosted instances it is `host/owner/repo` so gh knows which
/// host to talk to. Returns `None` for URLs in neither SSH nor HTTP(S)
/// form.
///
/// ```
/// use cairn_github::parse_repo_from_url;
///
/// assert_eq!(
///     parse_repo_from_url("git@github.com:acme/widgets.git").as_deref(),
///     Some("acme/widgets")
/// );
/// assert_eq!(
///     parse_repo_from_url("https://ghe.example.net/acme/widgets").as_deref(),
///     Some("ghe.example.net/acme/widgets")
/// );
/// ```
#[must_use]
pub fn parse_repo_from_url(remote_url: &str) -> Option<String> {
    let url = remote_url.trim().trim_end_matches(".git");
    if url.is_empty() {
        return None;
    }

    let (host, path) = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?
    } else if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        rest.split_once('/')?
    } else {
        return None;
    };

    if path.is_empty() {
        return None;
    }

    if host == "github.com" {
        Some(path.to_string())
    } else {
        Some(format!("{host}/{path}"))
    }
}

/// Review-service client that shells out to the `gh` binary.
///
/// Like the git port, dry-run and verbose behaviour are fields set once
/// at construction.
#[derive(Debug, Clone, Default)]
pub struct GhClient {
    /// `owner/repo` (or `host/owner/repo`) passed via `--repo` so the
    /// right repository is addressed when several remotes exist.
    repo: Option<String>,
    dry_run: bool,
    verbose: bool,
}

impl GhClient {
    /// Create a client for the given repository identifier.
    #[must_use]
    pub const fn new(repo: Option<String>, dry_run: bool, verbose: bool) -> Self {
        Self {
            repo,
            dry_run,
            verbose,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if let Some(repo) = &self.repo {
            full.push("--repo");
            full.push(repo);
        }
        full.extend_from_slice(args);

        if self.verbose {
            println!("  [gh] {}", full.join(" "));
        }
        let output = Command::new("gh").args(&full).output()?;
        if !output.status.success() {
            return Err(Error::Command {
                command: full.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl GitHubApi for GhClient {
    fn pr_for_branch(&self, branch: &str) -> Result<Option<PullRequest>> {
        // gh exits non-zero when no PR exists for the branch; that is an
        // answer, not a failure.
        let Ok(output) = self.run(&["pr", "view", branch, "--json", PR_FIELDS]) else {
            return Ok(None);
        };
        let api: ApiPullRequest = serde_json::from_str(&output)?;
        Ok(Some(api.into_pull_request()))
    }

    fn all_open_prs(&self) -> Result<HashMap<String, PullRequest>> {
        let output = self.run(&[
            "pr",
            "list",
            "--state",
            "open",
            "--json",
            PR_FIELDS,
            "--limit",
            PR_LIST_LIMIT,
        ])?;
        let records: Vec<ApiPullRequest> = serde_json::from_str(&output)?;

        let mut prs = HashMap::new();
        for api in records {
            // The listing is open-only, so duplicate heads carry equally
            // valid records; the first one wins.
            let head = api.head_ref_name.clone();
            prs.entry(head).or_insert_with(|| api.into_pull_request());
        }
        Ok(prs)
    }

    fn update_pr_base(&self, number: u64, new_base: &str) -> Result<()> {
        if self.dry_run {
            println!("  [dry-run] gh pr edit {number} --base {new_base}");
            return Ok(());
        }
        self.run(&["pr", "edit", &number.to_string(), "--base", new_base])
            .map(|_| ())
    }
}
