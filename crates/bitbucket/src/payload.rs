//! Bitbucket Cloud webhook payloads turned into [`ChangeEvent`]s.
//!
//! Only the fields the orchestrator needs are decoded. The reference of a
//! parsed event is the (usually abbreviated) hash Bitbucket sends; it becomes
//! canonical once [`pipeline::VersionControl::resolve_commit`] has run.
//! Signatures are not verified here.

use pipeline::{
    BranchName, ChangeEvent, EventKind, EventPayload, GitReference, Owner, PullRequestId,
    RepositorySlug, VcsError,
};
use serde::Deserialize;

use crate::api::{BranchRef, CommitLinks};

/// `X-Event-Key` of a branch or tag push.
pub const EVENT_PUSH: &str = "repo:push";
/// `X-Event-Key` of a newly opened pull request.
pub const EVENT_PULL_REQUEST_CREATED: &str = "pullrequest:created";
/// `X-Event-Key` of a pull request that received new commits.
pub const EVENT_PULL_REQUEST_UPDATED: &str = "pullrequest:updated";
/// `X-Event-Key` of a comment on a pull request.
pub const EVENT_PULL_REQUEST_COMMENT: &str = "pullrequest:comment_created";

#[derive(Debug, Deserialize)]
struct WebhookRepository {
    full_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Actor {
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl Actor {
    fn name(self) -> Option<String> {
        self.nickname.or(self.display_name)
    }
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    branch: BranchRef,
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    title: String,
    source: Endpoint,
    destination: Endpoint,
}

#[derive(Debug, Deserialize)]
struct PullRequestEvent {
    pullrequest: PullRequest,
    repository: WebhookRepository,
    #[serde(default)]
    actor: Option<Actor>,
}

#[derive(Debug, Deserialize)]
struct PushedCommit {
    hash: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    links: CommitLinks,
}

#[derive(Debug, Deserialize)]
struct PushedRef {
    name: String,
    target: PushedCommit,
}

#[derive(Debug, Deserialize)]
struct Change {
    // `null` when the change deletes a branch.
    #[serde(default)]
    new: Option<PushedRef>,
}

#[derive(Debug, Deserialize)]
struct Push {
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct PushEvent {
    push: Push,
    repository: WebhookRepository,
    #[serde(default)]
    actor: Option<Actor>,
}

/// Parses a webhook body delivered with `event_key`.
///
/// # Errors
///
/// - [`VcsError::UnsupportedEvent`] for event keys other than push and pull
///   request events.
/// - [`VcsError::MalformedPayload`] when the body does not decode, names no
///   repository, or a push carries no new commit.
pub fn parse_webhook(event_key: &str, body: &str) -> Result<ChangeEvent, VcsError> {
    match event_key {
        EVENT_PUSH => parse_push(event_key, body),
        EVENT_PULL_REQUEST_CREATED | EVENT_PULL_REQUEST_UPDATED => {
            parse_pull_request(event_key, body, EventKind::PullRequest)
        }
        EVENT_PULL_REQUEST_COMMENT => parse_pull_request(event_key, body, EventKind::Other),
        other => Err(VcsError::UnsupportedEvent {
            event_key: other.to_string(),
        }),
    }
}

fn malformed(event_key: &str, message: impl Into<String>) -> VcsError {
    VcsError::MalformedPayload {
        event_key: event_key.to_string(),
        message: message.into(),
    }
}

fn decode<'a, T: Deserialize<'a>>(event_key: &str, body: &'a str) -> Result<T, VcsError> {
    serde_json::from_str(body).map_err(|e| malformed(event_key, e.to_string()))
}

fn coordinates(
    event_key: &str,
    repository: &WebhookRepository,
) -> Result<(Owner, RepositorySlug), VcsError> {
    repository
        .full_name
        .split_once('/')
        .and_then(|(owner, slug)| Some((Owner::new(owner)?, RepositorySlug::new(slug)?)))
        .ok_or_else(|| {
            malformed(
                event_key,
                format!("repository full name {:?} is not owner/slug", repository.full_name),
            )
        })
}

fn reference(event_key: &str, hash: String) -> Result<GitReference, VcsError> {
    GitReference::new(hash).ok_or_else(|| malformed(event_key, "commit hash is empty"))
}

fn parse_pull_request(
    event_key: &str,
    body: &str,
    kind: EventKind,
) -> Result<ChangeEvent, VcsError> {
    let payload: PullRequestEvent = decode(event_key, body)?;
    let (owner, slug) = coordinates(event_key, &payload.repository)?;
    let pr = payload.pullrequest;

    let mut event = ChangeEvent::new(owner, slug, reference(event_key, pr.source.commit.hash)?, kind);
    event.head_branch = BranchName::new(pr.source.branch.name);
    event.base_branch = BranchName::new(pr.destination.branch.name);
    event.sender = payload.actor.and_then(Actor::name);
    event.payload = EventPayload::PullRequest {
        id: PullRequestId::new(pr.id),
        title: pr.title,
    };
    Ok(event)
}

fn parse_push(event_key: &str, body: &str) -> Result<ChangeEvent, VcsError> {
    let payload: PushEvent = decode(event_key, body)?;
    let (owner, slug) = coordinates(event_key, &payload.repository)?;
    let pushed = payload
        .push
        .changes
        .into_iter()
        .find_map(|change| change.new)
        .ok_or_else(|| malformed(event_key, "push carries no new commits"))?;

    let mut event = ChangeEvent::new(
        owner,
        slug,
        reference(event_key, pushed.target.hash)?,
        EventKind::Push,
    );
    let branch = BranchName::new(pushed.name);
    event.head_branch = branch.clone();
    event.base_branch = branch;
    event.title = pushed.target.message;
    event.canonical_url = pushed.target.links.html.href;
    event.sender = payload.actor.and_then(Actor::name);
    event.payload = EventPayload::Push;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PULL_REQUEST: &str = r#"{
        "actor": {"display_name": "Ada Lovelace", "nickname": "ada"},
        "repository": {"full_name": "acme/tools"},
        "pullrequest": {
            "id": 42,
            "title": "Add lint task",
            "source": {"branch": {"name": "feature/lint"}, "commit": {"hash": "1a2b3c4d5e6f"}},
            "destination": {"branch": {"name": "main"}, "commit": {"hash": "ffeeddccbbaa"}}
        }
    }"#;

    const PUSH: &str = r#"{
        "actor": {"display_name": "Ada Lovelace"},
        "repository": {"full_name": "acme/tools"},
        "push": {"changes": [
            {"new": null},
            {"new": {
                "name": "main",
                "type": "branch",
                "target": {
                    "hash": "0123456789abcdef0123456789abcdef01234567",
                    "message": "Bump version\n",
                    "links": {"html": {"href": "https://bitbucket.org/acme/tools/commits/0123456789ab"}}
                }
            }}
        ]}
    }"#;

    #[test]
    fn pull_request_event_fills_branches_and_id() {
        let event = parse_webhook(EVENT_PULL_REQUEST_CREATED, PULL_REQUEST).unwrap();
        assert_eq!(event.owner.as_str(), "acme");
        assert_eq!(event.repository.as_str(), "tools");
        assert_eq!(event.reference.as_str(), "1a2b3c4d5e6f");
        assert_eq!(event.event_kind, EventKind::PullRequest);
        assert_eq!(event.head_branch.unwrap().as_str(), "feature/lint");
        assert_eq!(event.base_branch.unwrap().as_str(), "main");
        assert_eq!(event.sender.as_deref(), Some("ada"));
        assert_eq!(event.payload.pull_request_id().unwrap().as_u64(), 42);
    }

    #[test]
    fn pull_request_comment_is_not_a_pull_request_run() {
        let event = parse_webhook(EVENT_PULL_REQUEST_COMMENT, PULL_REQUEST).unwrap();
        assert_eq!(event.event_kind, EventKind::Other);
        assert!(event.payload.pull_request_id().is_ok());
    }

    #[test]
    fn push_event_uses_first_new_ref() {
        let event = parse_webhook(EVENT_PUSH, PUSH).unwrap();
        assert_eq!(event.event_kind, EventKind::Push);
        assert_eq!(event.head_branch.as_ref().unwrap().as_str(), "main");
        assert_eq!(event.title, "Bump version\n");
        assert_eq!(
            event.canonical_url,
            "https://bitbucket.org/acme/tools/commits/0123456789ab"
        );
        assert_eq!(event.sender.as_deref(), Some("Ada Lovelace"));
        assert_eq!(event.payload, EventPayload::Push);
    }

    #[test]
    fn push_deleting_branches_only_is_malformed() {
        let body = r#"{"repository": {"full_name": "acme/tools"}, "push": {"changes": [{"new": null}]}}"#;
        let err = parse_webhook(EVENT_PUSH, body).unwrap_err();
        assert!(matches!(err, VcsError::MalformedPayload { .. }));
    }

    #[test]
    fn repository_name_must_have_owner() {
        let body = PULL_REQUEST.replace("acme/tools", "tools");
        let err = parse_webhook(EVENT_PULL_REQUEST_UPDATED, &body).unwrap_err();
        assert!(err.to_string().contains("not owner/slug"));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_webhook(EVENT_PUSH, "{").unwrap_err();
        assert!(matches!(err, VcsError::MalformedPayload { .. }));
    }

    #[test]
    fn unknown_event_key_is_unsupported() {
        let err = parse_webhook("repo:fork", "{}").unwrap_err();
        assert!(matches!(err, VcsError::UnsupportedEvent { event_key } if event_key == "repo:fork"));
    }
}
