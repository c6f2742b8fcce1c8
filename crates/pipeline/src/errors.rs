//! Error type shared by every version-control backend.
//!
//! [`VcsError`] is what the orchestrator sees. Backends keep their own
//! transport-level error types and map them onto these variants at the
//! [`crate::VersionControl`] boundary, so the orchestrator never depends on an
//! HTTP client crate.
//!
//! Errors fall into five groups:
//!
//! - **Preconditions**: credentials missing or the client never configured.
//!   Raised before any network call.
//! - **Remote**: a listing, fetch or post failed. The remote message is kept
//!   verbatim; nothing is retried.
//! - **Decode**: a response did not have the expected shape.
//! - **Not found**: a file fetch failed; reported with its coordinates rather
//!   than the transport detail.
//! - **Domain invariants**: no commit for a reference, a missing pull request
//!   id, an unusable webhook payload.
//!
//! [`VcsError::NotificationFailed`] is the one partial-success case: the commit
//! status was posted but the follow-up pull request comment was not.

use thiserror::Error;

/// Errors returned by [`crate::VersionControl`] operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// No API user was supplied when configuring the client.
    #[error("no API user has been set for the repository")]
    MissingUsername,

    /// No API token was supplied when configuring the client.
    #[error("no API token has been set for the repository")]
    MissingToken,

    /// An operation that needs the remote API ran before `set_client`.
    #[error("no client has been configured, cannot {operation}")]
    ClientNotConfigured {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The remote platform rejected or failed a request.
    #[error("{operation} failed: {message}")]
    Remote {
        /// The operation that was attempted (e.g. `"create commit status"`).
        operation: &'static str,
        /// The underlying error message, unmodified.
        message: String,
    },

    /// A response could not be decoded into the expected contract.
    #[error("cannot decode {operation} response: {message}")]
    Decode {
        /// The operation whose response was malformed.
        operation: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A file could not be fetched from the repository.
    #[error("cannot find {path} on branch {reference} in repo {owner}/{repository}")]
    FileNotFound {
        /// Repository-relative path of the file.
        path: String,
        /// The branch or commit the file was requested at.
        reference: String,
        /// Repository owner.
        owner: String,
        /// Repository slug.
        repository: String,
    },

    /// The commit listing for a reference came back empty.
    #[error("no commit information for reference {reference}")]
    NoCommitInformation {
        /// The reference that was looked up.
        reference: String,
    },

    /// A file fetch had neither an explicit reference nor a head branch.
    #[error("no reference to fetch {path} at: event has no head branch")]
    MissingReference {
        /// The path that was requested.
        path: String,
    },

    /// A pull request id was needed but the event payload is not a pull request.
    #[error("cannot convert event to a pull request event")]
    NotAPullRequest,

    /// The pull request payload carries no usable id.
    #[error("could not detect pull request ID")]
    MissingPullRequestId,

    /// A webhook arrived with an event key this backend does not handle.
    #[error("unsupported webhook event: {event_key}")]
    UnsupportedEvent {
        /// The event key as sent by the platform.
        event_key: String,
    },

    /// A webhook body could not be interpreted.
    #[error("malformed {event_key} payload: {message}")]
    MalformedPayload {
        /// The event key the body was parsed as.
        event_key: String,
        /// What was wrong with it.
        message: String,
    },

    /// The commit status was posted, but the pull request comment was not.
    ///
    /// The status is not rolled back.
    #[error("commit status posted, but the pull request comment failed: {source}")]
    NotificationFailed {
        /// Why the comment could not be posted.
        #[source]
        source: Box<VcsError>,
    },
}

impl VcsError {
    /// Wraps `self` as the cause of a failed notification.
    pub fn into_notification_failure(self) -> Self {
        VcsError::NotificationFailed {
            source: Box::new(self),
        }
    }

    /// Returns `true` if the commit status reached the platform before this
    /// error occurred.
    pub fn status_posted(&self) -> bool {
        matches!(self, VcsError::NotificationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_names_every_coordinate() {
        let err = VcsError::FileNotFound {
            path: ".tekton/pr.yaml".into(),
            reference: "main".into(),
            owner: "acme".into(),
            repository: "tools".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot find .tekton/pr.yaml on branch main in repo acme/tools"
        );
    }

    #[test]
    fn notification_failure_reports_status_as_posted() {
        let err = VcsError::MissingPullRequestId.into_notification_failure();
        assert!(err.status_posted());
        assert!(err.to_string().contains("could not detect pull request ID"));
        assert!(!VcsError::MissingToken.status_posted());
    }
}
