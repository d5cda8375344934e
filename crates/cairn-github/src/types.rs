//! Pull request types decoded from gh's JSON output.

use serde::Deserialize;

/// A pull request record as the sync engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number.
    pub number: u64,

    /// PR state.
    pub state: PrState,

    /// Base branch the review service currently records.
    pub base: String,

    /// PR title.
    pub title: String,

    /// PR URL.
    pub url: String,

    /// GitHub's merge-state classification, e.g. "CLEAN", "BEHIND",
    /// "BLOCKED", "DIRTY". Empty when the service has not computed it.
    pub merge_state_status: String,
}

/// State of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    /// PR is open.
    Open,
    /// PR was closed without merging.
    Closed,
    /// PR was merged.
    Merged,
}

impl PrState {
    /// Lowercase name, as shown in tree annotations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of a PR in `gh ... --json` output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiPullRequest {
    pub number: u64,
    pub state: PrState,
    #[serde(default)]
    pub head_ref_name: String,
    pub base_ref_name: String,
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub merge_state_status: String,
}

impl ApiPullRequest {
    pub(crate) fn into_pull_request(self) -> PullRequest {
        PullRequest {
            number: self.number,
            state: self.state,
            base: self.base_ref_name,
            title: self.title,
            url: self.url,
            merge_state_status: self.merge_state_status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parses_gh_spelling() {
        let state: PrState = serde_json::from_str("\"MERGED\"").unwrap();
        assert_eq!(state, PrState::Merged);
        assert_eq!(state.as_str(), "merged");
    }

    #[test]
    fn test_api_record_decodes() {
        let json = r#"{
            "number": 42,
            "state": "OPEN",
            "headRefName": "feature-a",
            "baseRefName": "main",
            "title": "Add feature A",
            "url": "https://github.com/acme/widgets/pull/42",
            "mergeStateStatus": "CLEAN"
        }"#;
        let api: ApiPullRequest = serde_json::from_str(json).unwrap();
        assert_eq!(api.head_ref_name, "feature-a");

        let pr = api.into_pull_request();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.state, PrState::Open);
        assert_eq!(pr.base, "main");
        assert_eq!(pr.merge_state_status, "CLEAN");
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "number": 7,
            "state": "MERGED",
            "baseRefName": "main",
            "url": "https://github.com/acme/widgets/pull/7"
        }"#;
        let api: ApiPullRequest = serde_json::from_str(json).unwrap();
        assert!(api.head_ref_name.is_empty());
        assert!(api.merge_state_status.is_empty());
    }
}
