//! [`BitbucketApi`] over HTTPS with basic authentication.

use async_trait::async_trait;
use pipeline::PullRequestId;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{
    ApiError, BitbucketApi, CommitPage, CommitStatus, FilePage, RepoRef, Repository,
    RepositoryFile,
};

/// Base URL of the public Bitbucket Cloud API.
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";

const UNREADABLE_BODY: &str = "<unreadable body>";

/// Authenticated Bitbucket Cloud client.
///
/// Requests are sent once; retries, rate limiting and timeouts are left to
/// the caller and to `reqwest`'s defaults.
#[derive(Clone)]
pub struct BitbucketHttpClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    token: String,
}

impl std::fmt::Debug for BitbucketHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketHttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl BitbucketHttpClient {
    /// Creates a client for `base_url` authenticating as `username`.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("bitbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: parsed,
            username: username.into(),
            token: token.into(),
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    pub(crate) fn endpoint<'s>(
        &self,
        segments: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint<'s>(
        &self,
        repo: RepoRef<'s>,
        rest: impl IntoIterator<Item = &'s str>,
    ) -> Result<Url, ApiError> {
        let base = ["repositories", repo.owner.as_str(), repo.slug.as_str()];
        self.endpoint(base.into_iter().chain(rest))
    }

    async fn execute(&self, request: RequestBuilder, url: &Url) -> Result<Response, ApiError> {
        let response = request
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = error_body(response.text().await, url);
        Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_text(&self, url: Url) -> Result<String, ApiError> {
        debug!(%url, "GET");
        let response = self.execute(self.http.get(url.clone()), &url).await?;
        response.text().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let body = self.get_text(url.clone()).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(), ApiError> {
        debug!(%url, "POST");
        self.execute(self.http.post(url.clone()).json(body), &url)
            .await
            .map(|_| ())
    }
}

/// The body of an error response, or a placeholder if it could not be read.
fn error_body<E: std::fmt::Display>(read: Result<String, E>, url: &Url) -> String {
    read.unwrap_or_else(|err| {
        debug!(%url, error = %err, "error response body could not be read");
        UNREADABLE_BODY.to_string()
    })
}

/// Splits a repository path into URL segments, ignoring empty components.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[async_trait]
impl BitbucketApi for BitbucketHttpClient {
    async fn create_commit_status(
        &self,
        repo: RepoRef<'_>,
        revision: &str,
        status: &CommitStatus,
    ) -> Result<(), ApiError> {
        let url = self.repo_endpoint(repo, ["commit", revision, "statuses", "build"])?;
        self.post_json(url, status).await
    }

    async fn add_pull_request_comment(
        &self,
        repo: RepoRef<'_>,
        pull_request: PullRequestId,
        body: &str,
    ) -> Result<(), ApiError> {
        let id = pull_request.to_string();
        let url = self.repo_endpoint(repo, ["pullrequests", id.as_str(), "comments"])?;
        let payload = serde_json::json!({ "content": { "raw": body } });
        self.post_json(url, &payload).await
    }

    async fn list_files(
        &self,
        repo: RepoRef<'_>,
        reference: &str,
        path: &str,
    ) -> Result<Vec<RepositoryFile>, ApiError> {
        // The trailing empty segment asks for the directory listing rather
        // than the raw file.
        let rest = ["src", reference]
            .into_iter()
            .chain(path_segments(path))
            .chain([""]);
        let url = self.repo_endpoint(repo, rest)?;
        let page: FilePage = self.get_json(url).await?;
        Ok(page.values)
    }

    async fn get_file_blob(
        &self,
        repo: RepoRef<'_>,
        reference: &str,
        path: &str,
    ) -> Result<String, ApiError> {
        let rest = ["src", reference].into_iter().chain(path_segments(path));
        let url = self.repo_endpoint(repo, rest)?;
        self.get_text(url).await
    }

    async fn get_commits(&self, repo: RepoRef<'_>, reference: &str) -> Result<CommitPage, ApiError> {
        let url = self.repo_endpoint(repo, ["commits", reference])?;
        self.get_json(url).await
    }

    async fn get_repository(&self, repo: RepoRef<'_>) -> Result<Repository, ApiError> {
        let url = self.repo_endpoint(repo, [])?;
        self.get_json(url).await
    }
}
