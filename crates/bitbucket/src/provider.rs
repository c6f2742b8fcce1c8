//! [`VersionControl`] for Bitbucket Cloud.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    AdapterOptions, BranchName, ChangeEvent, CommitInfo, GitReference, NotificationOutcome,
    ProviderMetadata, StatusDelivery, StatusReport, StatusTableTemplate, VcsError,
    VersionControl,
};
use tracing::{debug, instrument};

use crate::api::{ApiError, BitbucketApi, CommitEntry, CommitStatus, RepoRef};
use crate::bundle::{is_config_candidate, ConfigBundle};
use crate::client::{BitbucketHttpClient, DEFAULT_API_URL};
use crate::status::{self, Gate};

/// Columns of the task status table posted in pull request comments.
pub const TASK_STATUS_TEMPLATE: StatusTableTemplate = StatusTableTemplate {
    columns: &["Status", "Duration", "Name"],
};

/// Maps an API failure onto the orchestrator's error vocabulary.
fn remote(operation: &'static str, err: ApiError) -> VcsError {
    match err {
        ApiError::Decode { message, .. } => VcsError::Decode { operation, message },
        other => VcsError::Remote {
            operation,
            message: other.to_string(),
        },
    }
}

/// Bitbucket Cloud backend.
///
/// Holds no client until [`VersionControl::set_client`] succeeds or one is
/// injected with [`BitbucketProvider::with_client`]. The client is shared
/// read-only by every operation.
#[derive(Default, Clone)]
pub struct BitbucketProvider {
    client: Option<Arc<dyn BitbucketApi>>,
}

impl std::fmt::Debug for BitbucketProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketProvider")
            .field("configured", &self.client.is_some())
            .finish()
    }
}

impl BitbucketProvider {
    /// Creates a provider with no client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: Arc<dyn BitbucketApi>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Returns `true` once a client is available.
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self, operation: &'static str) -> Result<&dyn BitbucketApi, VcsError> {
        self.client
            .as_deref()
            .ok_or(VcsError::ClientNotConfigured { operation })
    }

    /// Fetches one file, hiding the transport error behind the file's
    /// coordinates.
    async fn blob(
        &self,
        client: &dyn BitbucketApi,
        event: &ChangeEvent,
        reference: &str,
        path: &str,
    ) -> Result<String, VcsError> {
        client
            .get_file_blob(repo(event), reference, path)
            .await
            .map_err(|err| {
                debug!(path, reference, error = %err, "file fetch failed");
                VcsError::FileNotFound {
                    path: path.to_string(),
                    reference: reference.to_string(),
                    owner: event.owner.to_string(),
                    repository: event.repository.to_string(),
                }
            })
    }
}

fn repo(event: &ChangeEvent) -> RepoRef<'_> {
    RepoRef {
        owner: &event.owner,
        slug: &event.repository,
    }
}

/// Checks the first commit entry and converts it.
fn validate_commit(entry: CommitEntry) -> Result<CommitInfo, VcsError> {
    if entry.hash.is_empty() {
        return Err(VcsError::Decode {
            operation: "get commits",
            message: "commit entry has an empty hash".to_string(),
        });
    }
    Ok(CommitInfo {
        hash: entry.hash,
        message: entry.message,
        html_url: entry.links.html.href,
    })
}

#[async_trait]
impl VersionControl for BitbucketProvider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            api_url: DEFAULT_API_URL,
            task_status_template: TASK_STATUS_TEMPLATE,
        }
    }

    fn set_client(&mut self, options: &AdapterOptions) -> Result<(), VcsError> {
        if options.username.is_empty() {
            return Err(VcsError::MissingUsername);
        }
        if options.token.is_empty() {
            return Err(VcsError::MissingToken);
        }
        let base_url = if options.api_url.is_empty() {
            DEFAULT_API_URL
        } else {
            options.api_url.as_str()
        };
        let client = BitbucketHttpClient::new(base_url, &options.username, &options.token)
            .map_err(|err| remote("configure client", err))?;
        self.client = Some(Arc::new(client));
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(
            owner = %event.owner,
            repository = %event.repository,
            reference = %event.reference,
            conclusion = %report.conclusion,
        )
    )]
    async fn report_status(
        &self,
        event: &ChangeEvent,
        options: &AdapterOptions,
        report: &StatusReport,
    ) -> Result<StatusDelivery, VcsError> {
        let translated = status::translate(report);
        let client = self.client("set status")?;

        let commit_status = CommitStatus {
            key: options.application_name.clone(),
            url: status::details_url(report, &options.api_url).to_string(),
            state: translated.state.to_string(),
            description: translated.title.clone(),
        };
        client
            .create_commit_status(repo(event), event.reference.as_str(), &commit_status)
            .await
            .map_err(|err| remote("create commit status", err))?;
        debug!(state = %translated.state, "commit status posted");

        let notification = match status::notification_gate(&translated, report, event) {
            Gate::Skip(reason) => NotificationOutcome::Skipped { reason },
            Gate::Comment => {
                let pull_request = event
                    .payload
                    .pull_request_id()
                    .map_err(VcsError::into_notification_failure)?;
                let body = status::comment_body(
                    &options.application_name,
                    &translated.title,
                    &report.text,
                );
                client
                    .add_pull_request_comment(repo(event), pull_request, &body)
                    .await
                    .map_err(|err| remote("add pull request comment", err).into_notification_failure())?;
                debug!(%pull_request, "pull request comment posted");
                NotificationOutcome::Posted { pull_request }
            }
        };

        Ok(StatusDelivery {
            state: translated.state.to_string(),
            title: translated.title,
            notification,
        })
    }

    #[instrument(
        skip_all,
        fields(owner = %event.owner, repository = %event.repository, path = %path)
    )]
    async fn resolve_config_directory(
        &self,
        event: &ChangeEvent,
        path: &str,
    ) -> Result<String, VcsError> {
        let client = self.client("list files")?;
        let entries = client
            .list_files(repo(event), event.reference.as_str(), path)
            .await
            .map_err(|err| remote("list files", err))?;

        let mut bundle = ConfigBundle::new();
        let candidates = entries
            .iter()
            .filter(|e| !e.is_directory() && is_config_candidate(&e.path));
        for entry in candidates {
            // Listing is pinned to the commit; contents come from the branch tip.
            let head = event
                .head_branch
                .as_ref()
                .ok_or_else(|| VcsError::MissingReference {
                    path: entry.path.clone(),
                })?;
            let document = self.blob(client, event, head.as_str(), &entry.path).await?;
            bundle.push(&document);
        }
        debug!(
            listed = entries.len(),
            documents = bundle.len(),
            "configuration directory resolved"
        );
        Ok(bundle.into_string())
    }

    #[instrument(
        skip_all,
        fields(owner = %event.owner, repository = %event.repository, path = %path)
    )]
    async fn resolve_file(
        &self,
        event: &ChangeEvent,
        path: &str,
        target_reference: Option<&str>,
    ) -> Result<String, VcsError> {
        let client = self.client("get file")?;
        let reference = match target_reference.filter(|r| !r.is_empty()) {
            Some(explicit) => explicit,
            None => event
                .head_branch
                .as_ref()
                .map(BranchName::as_str)
                .ok_or_else(|| VcsError::MissingReference {
                    path: path.to_string(),
                })?,
        };
        self.blob(client, event, reference, path).await
    }

    #[instrument(
        skip_all,
        fields(owner = %event.owner, repository = %event.repository, reference = %event.reference)
    )]
    async fn resolve_commit(&self, event: &mut ChangeEvent) -> Result<CommitInfo, VcsError> {
        let client = self.client("get commits")?;
        let page = client
            .get_commits(repo(event), event.reference.as_str())
            .await
            .map_err(|err| remote("get commits", err))?;

        let first = page
            .values
            .into_iter()
            .next()
            .ok_or_else(|| VcsError::NoCommitInformation {
                reference: event.reference.to_string(),
            })?;
        let info = validate_commit(first)?;

        event.title = info.message.clone();
        event.canonical_url = info.html_url.clone();
        // validate_commit guarantees a non-empty hash.
        if let Some(canonical) = GitReference::new(info.hash.clone()) {
            event.reference = canonical;
        }

        let repository = client
            .get_repository(repo(event))
            .await
            .map_err(|err| remote("get repository", err))?;
        event.default_branch = repository
            .mainbranch
            .and_then(|branch| BranchName::new(branch.name));
        debug!(hash = %info.hash, "commit resolved");
        Ok(info)
    }
}
