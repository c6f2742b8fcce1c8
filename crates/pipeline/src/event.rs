//! The change event a pipeline run is planned from.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{BranchName, GitReference, Owner, PullRequestId, RepositorySlug, VcsError};

/// What kind of repository activity triggered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Commits pushed to a branch.
    Push,
    /// A pull request was opened or updated.
    PullRequest,
    /// Anything else (comments, manual triggers).
    Other,
}

impl EventKind {
    /// Returns the wire name used by the orchestrator.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::Other => "other",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-neutral view of the payload an event was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A pull request event.
    PullRequest {
        /// The pull request id; `0` when the platform did not send one.
        id: PullRequestId,
        /// The pull request title.
        #[serde(default)]
        title: String,
    },
    /// A push event.
    Push,
    /// No payload was attached (e.g. an event synthesised by a CLI).
    #[default]
    None,
}

impl EventPayload {
    /// Returns the pull request id carried by this payload.
    ///
    /// # Errors
    ///
    /// - [`VcsError::NotAPullRequest`] if the payload is not a pull request.
    /// - [`VcsError::MissingPullRequestId`] if the id is zero.
    pub fn pull_request_id(&self) -> Result<PullRequestId, VcsError> {
        match self {
            EventPayload::PullRequest { id, .. } if id.is_unassigned() => {
                Err(VcsError::MissingPullRequestId)
            }
            EventPayload::PullRequest { id, .. } => Ok(*id),
            _ => Err(VcsError::NotAPullRequest),
        }
    }
}

/// Reads an optional branch, treating `""` the same as an absent field.
fn blank_branch_as_none<'de, D>(deserializer: D) -> Result<Option<BranchName>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(BranchName::new))
}

/// A repository event owned by the orchestrator.
///
/// Backends only enrich fields in place; they never replace the event.
/// `reference` starts as whatever the trigger supplied (branch name, short
/// hash) and is overwritten with the canonical hash by
/// [`crate::VersionControl::resolve_commit`]. Callers must not treat it as a
/// full hash before that call has succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Repository owner (account or workspace).
    pub owner: Owner,

    /// Repository slug.
    pub repository: RepositorySlug,

    /// Commit hash or branch the event refers to.
    pub reference: GitReference,

    /// Branch whose tip configuration files are read from.
    #[serde(default, deserialize_with = "blank_branch_as_none")]
    pub head_branch: Option<BranchName>,

    /// Target branch of a pull request.
    #[serde(default, deserialize_with = "blank_branch_as_none")]
    pub base_branch: Option<BranchName>,

    /// What triggered the event.
    pub event_kind: EventKind,

    /// Commit message of `reference`, filled by commit resolution.
    #[serde(default)]
    pub title: String,

    /// Web URL of `reference`, filled by commit resolution.
    #[serde(default)]
    pub canonical_url: String,

    /// The repository's main branch, filled by commit resolution.
    #[serde(default, deserialize_with = "blank_branch_as_none")]
    pub default_branch: Option<BranchName>,

    /// Account that triggered the event, when known.
    #[serde(default)]
    pub sender: Option<String>,

    /// The payload the event was built from.
    #[serde(default)]
    pub payload: EventPayload,
}

impl ChangeEvent {
    /// Creates an event with only its repository coordinates set.
    pub fn new(
        owner: Owner,
        repository: RepositorySlug,
        reference: GitReference,
        event_kind: EventKind,
    ) -> Self {
        Self {
            owner,
            repository,
            reference,
            head_branch: None,
            base_branch: None,
            event_kind,
            title: String::new(),
            canonical_url: String::new(),
            default_branch: None,
            sender: None,
            payload: EventPayload::None,
        }
    }

    /// Sets the head branch.
    pub fn with_head_branch(mut self, branch: BranchName) -> Self {
        self.head_branch = Some(branch);
        self
    }

    /// Attaches the payload the event was built from.
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ChangeEvent {
        ChangeEvent::new(
            Owner::new("acme").unwrap(),
            RepositorySlug::new("tools").unwrap(),
            GitReference::new("main").unwrap(),
            EventKind::PullRequest,
        )
    }

    #[test]
    fn pull_request_id_requires_pull_request_payload() {
        let err = event().payload.pull_request_id().unwrap_err();
        assert!(matches!(err, VcsError::NotAPullRequest));

        let push = event().with_payload(EventPayload::Push);
        assert!(matches!(
            push.payload.pull_request_id(),
            Err(VcsError::NotAPullRequest)
        ));
    }

    #[test]
    fn pull_request_id_rejects_zero() {
        let ev = event().with_payload(EventPayload::PullRequest {
            id: PullRequestId::new(0),
            title: String::new(),
        });
        assert!(matches!(
            ev.payload.pull_request_id(),
            Err(VcsError::MissingPullRequestId)
        ));
    }

    #[test]
    fn event_json_defaults_optional_fields() {
        let json = r#"{
            "owner": "acme",
            "repository": "tools",
            "reference": "abc123",
            "event_kind": "pull_request",
            "payload": { "type": "pull_request", "id": 12 }
        }"#;
        let ev: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.event_kind, EventKind::PullRequest);
        assert!(ev.head_branch.is_none());
        assert_eq!(ev.payload.pull_request_id().unwrap().as_u64(), 12);
    }

    #[test]
    fn blank_branches_read_as_absent() {
        let json = r#"{
            "owner": "acme",
            "repository": "tools",
            "reference": "abc123",
            "head_branch": "",
            "base_branch": "main",
            "default_branch": "",
            "event_kind": "push"
        }"#;
        let ev: ChangeEvent = serde_json::from_str(json).unwrap();
        assert!(ev.head_branch.is_none());
        assert!(ev.default_branch.is_none());
        assert_eq!(ev.base_branch.unwrap().as_str(), "main");
    }

    #[test]
    fn blank_reference_is_rejected() {
        let json = r#"{
            "owner": "acme",
            "repository": "tools",
            "reference": "",
            "event_kind": "push"
        }"#;
        let err = serde_json::from_str::<ChangeEvent>(json).unwrap_err();
        assert!(err.to_string().contains("GitReference must not be empty"));
    }
}
