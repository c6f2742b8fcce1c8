//! Translation of orchestrator conclusions into Bitbucket build states.
//!
//! Reporting a status is a short pipeline: [`translate`] the conclusion,
//! post the commit status, then ask [`notification_gate`] whether the run
//! also deserves a pull request comment. Everything here is pure; the
//! provider owns the network calls.

use pipeline::{
    ChangeEvent, Conclusion, EventKind, LifecyclePhase, SkipReason, StatusReport,
};

/// A Bitbucket commit status state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildState {
    /// The run was skipped or stopped.
    Stopped,
    /// The run failed.
    Failed,
    /// The run is queued or running.
    InProgress,
    /// The run passed.
    Successful,
    /// A conclusion Bitbucket has no state for, sent as-is.
    Unmapped(String),
}

impl BuildState {
    /// Returns the state as Bitbucket spells it.
    pub fn as_str(&self) -> &str {
        match self {
            BuildState::Stopped => "STOPPED",
            BuildState::Failed => "FAILED",
            BuildState::InProgress => "INPROGRESS",
            BuildState::Successful => "SUCCESSFUL",
            BuildState::Unmapped(raw) => raw,
        }
    }

    /// Returns `true` for `STOPPED`, including a passed-through conclusion
    /// that already spells it.
    pub fn is_stopped(&self) -> bool {
        self.as_str() == "STOPPED"
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conclusion expressed in Bitbucket's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedStatus {
    /// State posted on the commit.
    pub state: BuildState,
    /// Status description, reused as the comment heading.
    pub title: String,
}

/// Maps a report onto a Bitbucket state and title.
///
/// Unrecognised conclusions keep their own name as the state and the
/// report's title unchanged.
pub fn translate(report: &StatusReport) -> TranslatedStatus {
    let (state, title) = match &report.conclusion {
        Conclusion::Skipped => (BuildState::Stopped, "Skipping this commit"),
        Conclusion::Neutral => (BuildState::Stopped, "CI has stopped"),
        Conclusion::Failure => (BuildState::Failed, "Failed"),
        Conclusion::Pending => (BuildState::InProgress, "CI has started"),
        Conclusion::Success => (BuildState::Successful, "Commit has been validated"),
        Conclusion::Completed => (BuildState::Successful, "Completed"),
        Conclusion::Other(raw) => {
            return TranslatedStatus {
                state: BuildState::Unmapped(raw.clone()),
                title: report.title.clone(),
            }
        }
    };
    TranslatedStatus {
        state,
        title: title.to_string(),
    }
}

/// Picks the link shown next to the status.
pub fn details_url<'a>(report: &'a StatusReport, api_url: &'a str) -> &'a str {
    if report.details_url.is_empty() {
        api_url
    } else {
        &report.details_url
    }
}

/// Outcome of the notification gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Post the comment.
    Comment,
    /// Post nothing, for the given reason.
    Skip(SkipReason),
}

/// Decides whether a pull request comment follows the status.
///
/// A comment is posted only for a non-stopped state, in the completed phase,
/// with non-empty text, on a pull request event. The first failing condition,
/// in that order, is reported.
pub fn notification_gate(
    translated: &TranslatedStatus,
    report: &StatusReport,
    event: &ChangeEvent,
) -> Gate {
    if translated.state.is_stopped() {
        Gate::Skip(SkipReason::Stopped)
    } else if report.phase != LifecyclePhase::Completed {
        Gate::Skip(SkipReason::NotCompleted)
    } else if report.text.is_empty() {
        Gate::Skip(SkipReason::EmptyText)
    } else if event.event_kind != EventKind::PullRequest {
        Gate::Skip(SkipReason::NotPullRequest)
    } else {
        Gate::Comment
    }
}

/// Formats the pull request comment body.
pub fn comment_body(application_name: &str, title: &str, text: &str) -> String {
    format!("**{application_name}** - {title}\n\n{text}")
}
