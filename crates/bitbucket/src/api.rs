//! The Bitbucket Cloud REST surface the provider depends on.
//!
//! [`BitbucketApi`] is the seam between provider logic and transport:
//! [`crate::BitbucketHttpClient`] implements it over HTTP and
//! [`crate::fakes::FakeBitbucketApi`] implements it in memory.

use async_trait::async_trait;
use pipeline::{Owner, PullRequestId, RepositorySlug};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the Bitbucket API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// The request URL.
        url: String,
        /// The transport failure.
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The response body, or a placeholder when it could not be read.
        body: String,
    },

    /// The response body did not match the expected contract.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// The request URL.
        url: String,
        /// The decoder's complaint.
        message: String,
    },

    /// The configured base URL cannot carry path segments.
    #[error("invalid API base URL {url}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
    },
}

// ---------------------------------------------------------------------------
// Request and response contracts
// ---------------------------------------------------------------------------

/// Coordinates of one repository.
#[derive(Debug, Clone, Copy)]
pub struct RepoRef<'a> {
    /// Account or workspace.
    pub owner: &'a Owner,
    /// Repository slug.
    pub slug: &'a RepositorySlug,
}

impl std::fmt::Display for RepoRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// Body of a build status posted on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    /// Stable key; a later status with the same key replaces the earlier one.
    pub key: String,
    /// Link shown next to the status.
    pub url: String,
    /// `SUCCESSFUL`, `FAILED`, `INPROGRESS` or `STOPPED`.
    pub state: String,
    /// Short human-readable summary.
    pub description: String,
}

/// One entry of a source directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryFile {
    /// Path relative to the repository root.
    pub path: String,
    /// `commit_file` or `commit_directory`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

const DIRECTORY_KIND: &str = "commit_directory";

impl RepositoryFile {
    /// A regular file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: "commit_file".to_string(),
        }
    }

    /// A subdirectory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: DIRECTORY_KIND.to_string(),
        }
    }

    /// Returns `true` if the entry is a subdirectory rather than a file.
    pub fn is_directory(&self) -> bool {
        self.kind == DIRECTORY_KIND
    }
}

/// One page of a source directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FilePage {
    /// Entries on this page.
    pub values: Vec<RepositoryFile>,
}

/// A hypermedia link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Link {
    /// Target URL.
    #[serde(default)]
    pub href: String,
}

/// Links attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CommitLinks {
    /// The commit's web page.
    #[serde(default)]
    pub html: Link,
}

/// A commit as returned by the commits endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitEntry {
    /// Full commit hash.
    pub hash: String,
    /// Full commit message.
    #[serde(default)]
    pub message: String,
    /// Hypermedia links.
    #[serde(default)]
    pub links: CommitLinks,
}

/// Response of the commits endpoint. `values` is required: a body without it
/// is a contract violation, not an empty history.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitPage {
    /// Commits, newest first.
    pub values: Vec<CommitEntry>,
}

/// A branch named in repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    /// Branch name.
    pub name: String,
}

/// Repository metadata; only the fields the provider reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    /// The main branch, if the repository has one.
    #[serde(default)]
    pub mainbranch: Option<BranchRef>,
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Bitbucket Cloud operations used by [`crate::BitbucketProvider`].
#[async_trait]
pub trait BitbucketApi: Send + Sync {
    /// `POST repositories/{owner}/{slug}/commit/{revision}/statuses/build`
    async fn create_commit_status(
        &self,
        repo: RepoRef<'_>,
        revision: &str,
        status: &CommitStatus,
    ) -> Result<(), ApiError>;

    /// `POST repositories/{owner}/{slug}/pullrequests/{id}/comments`
    async fn add_pull_request_comment(
        &self,
        repo: RepoRef<'_>,
        pull_request: PullRequestId,
        body: &str,
    ) -> Result<(), ApiError>;

    /// `GET repositories/{owner}/{slug}/src/{reference}/{path}/`
    async fn list_files(
        &self,
        repo: RepoRef<'_>,
        reference: &str,
        path: &str,
    ) -> Result<Vec<RepositoryFile>, ApiError>;

    /// `GET repositories/{owner}/{slug}/src/{reference}/{path}`, raw content.
    async fn get_file_blob(
        &self,
        repo: RepoRef<'_>,
        reference: &str,
        path: &str,
    ) -> Result<String, ApiError>;

    /// `GET repositories/{owner}/{slug}/commits/{reference}`
    async fn get_commits(&self, repo: RepoRef<'_>, reference: &str) -> Result<CommitPage, ApiError>;

    /// `GET repositories/{owner}/{slug}`
    async fn get_repository(&self, repo: RepoRef<'_>) -> Result<Repository, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_page_requires_values() {
        let err = serde_json::from_str::<CommitPage>(r#"{"pagelen": 30}"#).unwrap_err();
        assert!(err.to_string().contains("values"));
    }

    #[test]
    fn commit_entry_reads_html_link() {
        let page: CommitPage = serde_json::from_str(
            r#"{"values": [{
                "hash": "0123456789abcdef0123456789abcdef01234567",
                "message": "Fix the build\n",
                "links": {"html": {"href": "https://bitbucket.org/acme/tools/commits/0123456"}}
            }]}"#,
        )
        .unwrap();
        let entry = &page.values[0];
        assert_eq!(entry.message, "Fix the build\n");
        assert_eq!(
            entry.links.html.href,
            "https://bitbucket.org/acme/tools/commits/0123456"
        );
    }

    #[test]
    fn listing_entries_distinguish_directories() {
        let page: FilePage = serde_json::from_str(
            r#"{"values": [
                {"path": ".tekton/pr.yaml", "type": "commit_file"},
                {"path": ".tekton/tasks", "type": "commit_directory"}
            ]}"#,
        )
        .unwrap();
        assert!(!page.values[0].is_directory());
        assert!(page.values[1].is_directory());
    }

    #[test]
    fn repository_without_main_branch_decodes() {
        let repo: Repository = serde_json::from_str(r#"{"full_name": "acme/tools"}"#).unwrap();
        assert!(repo.mainbranch.is_none());
    }
}
