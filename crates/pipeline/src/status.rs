//! Provider-neutral CI status vocabulary.
//!
//! The orchestrator describes a run with a [`Conclusion`] and a
//! [`LifecyclePhase`]; each backend translates these into its own status
//! codes. The result of posting a status is a [`StatusDelivery`], which records
//! what was sent and whether a pull request comment followed.

use serde::{Deserialize, Serialize};

use crate::PullRequestId;

// ---------------------------------------------------------------------------
// Conclusion
// ---------------------------------------------------------------------------

/// The outcome of a CI run as reported by the orchestrator.
///
/// Unknown strings are kept in [`Conclusion::Other`] so backends can pass them
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Conclusion {
    Skipped,
    Neutral,
    Failure,
    Pending,
    Success,
    Completed,
    Other(String),
}

impl Conclusion {
    /// Returns the orchestrator's name for this conclusion.
    pub fn as_str(&self) -> &str {
        match self {
            Conclusion::Skipped => "skipped",
            Conclusion::Neutral => "neutral",
            Conclusion::Failure => "failure",
            Conclusion::Pending => "pending",
            Conclusion::Success => "success",
            Conclusion::Completed => "completed",
            Conclusion::Other(raw) => raw,
        }
    }
}

impl From<&str> for Conclusion {
    fn from(value: &str) -> Self {
        match value {
            "skipped" => Conclusion::Skipped,
            "neutral" => Conclusion::Neutral,
            "failure" => Conclusion::Failure,
            "pending" => Conclusion::Pending,
            "success" => Conclusion::Success,
            "completed" => Conclusion::Completed,
            other => Conclusion::Other(other.to_string()),
        }
    }
}

impl From<String> for Conclusion {
    fn from(value: String) -> Self {
        Conclusion::from(value.as_str())
    }
}

impl From<Conclusion> for String {
    fn from(value: Conclusion) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lifecycle phase
// ---------------------------------------------------------------------------

/// Where the run is in its lifecycle when the status is reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecyclePhase {
    Queued,
    InProgress,
    Completed,
    Other(String),
}

impl LifecyclePhase {
    /// Returns the orchestrator's name for this phase.
    pub fn as_str(&self) -> &str {
        match self {
            LifecyclePhase::Queued => "queued",
            LifecyclePhase::InProgress => "in_progress",
            LifecyclePhase::Completed => "completed",
            LifecyclePhase::Other(raw) => raw,
        }
    }
}

impl From<&str> for LifecyclePhase {
    fn from(value: &str) -> Self {
        match value {
            "queued" => LifecyclePhase::Queued,
            "in_progress" => LifecyclePhase::InProgress,
            "completed" => LifecyclePhase::Completed,
            other => LifecyclePhase::Other(other.to_string()),
        }
    }
}

impl From<String> for LifecyclePhase {
    fn from(value: String) -> Self {
        LifecyclePhase::from(value.as_str())
    }
}

impl From<LifecyclePhase> for String {
    fn from(value: LifecyclePhase) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Report and delivery
// ---------------------------------------------------------------------------

/// A status the orchestrator wants shown on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Outcome of the run.
    pub conclusion: Conclusion,

    /// Link to the run's details. Empty means "use the configured API URL".
    #[serde(default)]
    pub details_url: String,

    /// Short summary. Replaced by the backend's title for known conclusions.
    #[serde(default)]
    pub title: String,

    /// Long-form body (e.g. a rendered task table). Empty suppresses comments.
    #[serde(default)]
    pub text: String,

    /// Lifecycle phase of the run.
    pub phase: LifecyclePhase,
}

impl StatusReport {
    /// Creates a report with empty link, title and text.
    pub fn new(conclusion: Conclusion, phase: LifecyclePhase) -> Self {
        Self {
            conclusion,
            details_url: String::new(),
            title: String::new(),
            text: String::new(),
            phase,
        }
    }
}

/// Why no pull request comment accompanied a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The status maps to the backend's "stopped" state.
    Stopped,
    /// The run has not reached the completed phase.
    NotCompleted,
    /// There is no long-form text to post.
    EmptyText,
    /// The event is not a pull request.
    NotPullRequest,
}

/// Whether a pull request comment was posted alongside the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// A comment was added to the pull request.
    Posted {
        /// The pull request that received the comment.
        pull_request: PullRequestId,
    },
    /// No comment was attempted.
    Skipped {
        /// The first gating condition that failed.
        reason: SkipReason,
    },
}

/// What a backend sent when reporting a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDelivery {
    /// The backend status code that was posted (e.g. `"SUCCESSFUL"`).
    pub state: String,
    /// The human-readable title that was posted.
    pub title: String,
    /// The outcome of the notification step.
    pub notification: NotificationOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_conclusion_is_kept_verbatim() {
        let c = Conclusion::from("cancelled");
        assert_eq!(c, Conclusion::Other("cancelled".into()));
        assert_eq!(c.as_str(), "cancelled");
    }

    #[test]
    fn report_deserializes_from_orchestrator_strings() {
        let json = r#"{ "conclusion": "success", "phase": "completed", "text": "all good" }"#;
        let report: StatusReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.conclusion, Conclusion::Success);
        assert_eq!(report.phase, LifecyclePhase::Completed);
        assert!(report.details_url.is_empty());
    }

    #[test]
    fn delivery_serializes_tagged_notification() {
        let delivery = StatusDelivery {
            state: "STOPPED".into(),
            title: "CI has stopped".into(),
            notification: NotificationOutcome::Skipped {
                reason: SkipReason::Stopped,
            },
        };
        let value = serde_json::to_value(&delivery).unwrap();
        assert_eq!(value["notification"]["outcome"], "skipped");
        assert_eq!(value["notification"]["reason"], "stopped");
    }
}
