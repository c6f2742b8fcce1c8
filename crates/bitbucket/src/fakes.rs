//! In-memory [`BitbucketApi`] for tests.
//!
//! `FakeBitbucketApi` serves listings, blobs, commits and repository metadata
//! from maps, records every status and comment it receives, and can be told
//! to fail individual operations or answer them with an undecodable body.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pipeline::PullRequestId;

use crate::api::{
    ApiError, BitbucketApi, BranchRef, CommitEntry, CommitLinks, CommitPage, CommitStatus, Link,
    RepoRef, Repository, RepositoryFile,
};

/// An operation the fake can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOperation {
    /// [`BitbucketApi::create_commit_status`].
    CreateCommitStatus,
    /// [`BitbucketApi::add_pull_request_comment`].
    AddComment,
    /// [`BitbucketApi::list_files`].
    ListFiles,
    /// [`BitbucketApi::get_commits`].
    GetCommits,
    /// [`BitbucketApi::get_repository`].
    GetRepository,
}

#[derive(Debug, Clone)]
enum Failure {
    Status(String),
    Decode(String),
}

/// A status recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStatus {
    /// `owner/slug` of the target repository.
    pub repository: String,
    /// The commit the status was posted on.
    pub revision: String,
    /// The posted body.
    pub status: CommitStatus,
}

/// A comment recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedComment {
    /// `owner/slug` of the target repository.
    pub repository: String,
    /// The pull request commented on.
    pub pull_request: PullRequestId,
    /// Raw comment text.
    pub body: String,
}

#[derive(Debug, Default)]
struct State {
    listings: HashMap<(String, String), Vec<RepositoryFile>>,
    blobs: HashMap<(String, String), String>,
    commits: HashMap<String, Vec<CommitEntry>>,
    main_branch: Option<String>,
    failures: HashMap<FakeOperation, Failure>,
    statuses: Vec<RecordedStatus>,
    comments: Vec<RecordedComment>,
    blob_requests: Vec<(String, String)>,
}

/// In-memory Bitbucket API.
#[derive(Debug, Default)]
pub struct FakeBitbucketApi {
    state: Mutex<State>,
}

fn not_found(what: String) -> ApiError {
    ApiError::Status {
        url: what,
        status: 404,
        body: "Not Found".to_string(),
    }
}

impl FakeBitbucketApi {
    /// Creates a fake that serves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `paths` when `directory` is listed at `reference`.
    pub fn with_listing(self, reference: &str, directory: &str, paths: &[&str]) -> Self {
        let files = paths.iter().map(|p| RepositoryFile::file(*p)).collect();
        self.state
            .lock()
            .unwrap()
            .listings
            .insert((reference.to_string(), directory.to_string()), files);
        self
    }

    /// Serves `content` for `path` at `reference`.
    pub fn with_blob(self, reference: &str, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert((reference.to_string(), path.to_string()), content.to_string());
        self
    }

    /// Adds a subdirectory entry to the listing of `directory` at `reference`.
    pub fn with_subdirectory(self, reference: &str, directory: &str, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .listings
            .entry((reference.to_string(), directory.to_string()))
            .or_default()
            .push(RepositoryFile::directory(path));
        self
    }

    /// Serves one commit for `reference`.
    pub fn with_commit(self, reference: &str, hash: &str, message: &str, html_url: &str) -> Self {
        let entry = CommitEntry {
            hash: hash.to_string(),
            message: message.to_string(),
            links: CommitLinks {
                html: Link {
                    href: html_url.to_string(),
                },
            },
        };
        self.state
            .lock()
            .unwrap()
            .commits
            .entry(reference.to_string())
            .or_default()
            .push(entry);
        self
    }

    /// Serves an empty commit list for `reference`.
    pub fn with_no_commits(self, reference: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .commits
            .insert(reference.to_string(), Vec::new());
        self
    }

    /// Reports `name` as the repository's main branch.
    pub fn with_main_branch(self, name: &str) -> Self {
        self.state.lock().unwrap().main_branch = Some(name.to_string());
        self
    }

    /// Makes `operation` fail with an HTTP 500 whose body is `message`.
    pub fn failing(self, operation: FakeOperation, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, Failure::Status(message.to_string()));
        self
    }

    /// Makes `operation` answer with a body that does not decode; `message`
    /// is the decoder's complaint.
    pub fn malformed(self, operation: FakeOperation, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, Failure::Decode(message.to_string()));
        self
    }

    /// Statuses posted so far, in order.
    pub fn statuses(&self) -> Vec<RecordedStatus> {
        self.state.lock().unwrap().statuses.clone()
    }

    /// Comments posted so far, in order.
    pub fn comments(&self) -> Vec<RecordedComment> {
        self.state.lock().unwrap().comments.clone()
    }

    /// `(reference, path)` of every blob request, in order.
    pub fn blob_requests(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().blob_requests.clone()
    }

    fn check(&self, operation: FakeOperation) -> Result<(), ApiError> {
        let url = format!("fake://{operation:?}");
        match self.state.lock().unwrap().failures.get(&operation) {
            Some(Failure::Status(message)) => Err(ApiError::Status {
                url,
                status: 500,
                body: message.clone(),
            }),
            Some(Failure::Decode(message)) => Err(ApiError::Decode {
                url,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BitbucketApi for FakeBitbucketApi {
    async fn create_commit_status(
        &self,
        repo: RepoRef<'_>,
        revision: &str,
        status: &CommitStatus,
    ) -> Result<(), ApiError> {
        self.check(FakeOperation::CreateCommitStatus)?;
        self.state.lock().unwrap().statuses.push(RecordedStatus {
            repository: repo.to_string(),
            revision: revision.to_string(),
            status: status.clone(),
        });
        Ok(())
    }

    async fn add_pull_request_comment(
        &self,
        repo: RepoRef<'_>,
        pull_request: PullRequestId,
        body: &str,
    ) -> Result<(), ApiError> {
        self.check(FakeOperation::AddComment)?;
        self.state.lock().unwrap().comments.push(RecordedComment {
            repository: repo.to_string(),
            pull_request,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn list_files(
        &self,
        repo: RepoRef<'_>,
        reference: &str,
        path: &str,
    ) -> Result<Vec<RepositoryFile>, ApiError> {
        self.check(FakeOperation::ListFiles)?;
        self.state
            .lock()
            .unwrap()
            .listings
            .get(&(reference.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("fake://{repo}/src/{reference}/{path}/")))
    }

    async fn get_file_blob(
        &self,
        repo: RepoRef<'_>,
        reference: &str,
        path: &str,
    ) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .blob_requests
            .push((reference.to_string(), path.to_string()));
        state
            .blobs
            .get(&(reference.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("fake://{repo}/src/{reference}/{path}")))
    }

    async fn get_commits(&self, repo: RepoRef<'_>, reference: &str) -> Result<CommitPage, ApiError> {
        self.check(FakeOperation::GetCommits)?;
        self.state
            .lock()
            .unwrap()
            .commits
            .get(reference)
            .cloned()
            .map(|values| CommitPage { values })
            .ok_or_else(|| not_found(format!("fake://{repo}/commits/{reference}")))
    }

    async fn get_repository(&self, _repo: RepoRef<'_>) -> Result<Repository, ApiError> {
        self.check(FakeOperation::GetRepository)?;
        let state = self.state.lock().unwrap();
        Ok(Repository {
            mainbranch: state
                .main_branch
                .clone()
                .map(|name| BranchRef { name }),
        })
    }
}
