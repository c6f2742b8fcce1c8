//! The port every version-control backend implements.
//!
//! The orchestrator holds one [`VersionControl`] value per repository. It
//! calls [`VersionControl::set_client`] once, then drives the other operations
//! from the events it receives. Every operation is a sequence of awaited
//! remote calls; none of them retries, caches or runs requests concurrently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AdapterOptions, ChangeEvent, StatusDelivery, StatusReport, VcsError};

/// Markdown table layout used to summarise task runs in status text.
///
/// Backends publish the layout; the orchestrator renders the cells (status
/// icon, formatted duration, log link) with its own templating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTableTemplate {
    /// Column headings, left to right.
    pub columns: &'static [&'static str],
}

impl StatusTableTemplate {
    /// Renders the heading row and the separator row.
    pub fn header(&self) -> String {
        let headings: Vec<String> = self.columns.iter().map(|c| format!("**{c}**")).collect();
        let rule = vec!["---"; self.columns.len()];
        format!("| {} |\n| {} |\n", headings.join(" | "), rule.join(" | "))
    }

    /// Renders one body row. Missing cells are left empty; extra cells are
    /// dropped.
    pub fn row(&self, cells: &[&str]) -> String {
        let mut line = String::from("|");
        for i in 0..self.columns.len() {
            line.push_str(cells.get(i).copied().unwrap_or(""));
            line.push('|');
        }
        line.push('\n');
        line
    }

    /// Renders a complete table.
    pub fn render<'a>(&self, rows: impl IntoIterator<Item = &'a [&'a str]>) -> String {
        let mut table = self.header();
        for cells in rows {
            table.push_str(&self.row(cells));
        }
        table
    }
}

/// Static description of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    /// The platform's default API base URL.
    pub api_url: &'static str,
    /// Layout of the task status table.
    pub task_status_template: StatusTableTemplate,
}

/// Canonical metadata of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit hash.
    pub hash: String,
    /// Commit message.
    pub message: String,
    /// Web URL of the commit.
    pub html_url: String,
}

/// A source-hosting platform seen as a uniform CI backend.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Returns the backend's static metadata.
    fn metadata(&self) -> ProviderMetadata;

    /// Establishes the authenticated client from `options`.
    ///
    /// # Errors
    ///
    /// [`VcsError::MissingUsername`] or [`VcsError::MissingToken`] when a
    /// credential is empty. No client is installed in that case.
    fn set_client(&mut self, options: &AdapterOptions) -> Result<(), VcsError>;

    /// Posts `report` as a commit status on `event.reference` and, for
    /// completed pull request runs with text, comments on the pull request.
    ///
    /// # Errors
    ///
    /// A [`VcsError::NotificationFailed`] means the status was posted and only
    /// the comment failed. Every other error means nothing was posted.
    async fn report_status(
        &self,
        event: &ChangeEvent,
        options: &AdapterOptions,
        report: &StatusReport,
    ) -> Result<StatusDelivery, VcsError>;

    /// Concatenates every YAML file directly under `path` into one
    /// multi-document string.
    async fn resolve_config_directory(
        &self,
        event: &ChangeEvent,
        path: &str,
    ) -> Result<String, VcsError>;

    /// Fetches a single file at `target_reference`, or at the event's head
    /// branch when `target_reference` is `None` or empty.
    async fn resolve_file(
        &self,
        event: &ChangeEvent,
        path: &str,
        target_reference: Option<&str>,
    ) -> Result<String, VcsError>;

    /// Resolves `event.reference` to its canonical commit and fills the
    /// event's title, URL, reference and default branch.
    async fn resolve_commit(&self, event: &mut ChangeEvent) -> Result<CommitInfo, VcsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: StatusTableTemplate = StatusTableTemplate {
        columns: &["Status", "Duration", "Name"],
    };

    #[test]
    fn header_bolds_each_column() {
        assert_eq!(
            TABLE.header(),
            "| **Status** | **Duration** | **Name** |\n| --- | --- | --- |\n"
        );
    }

    #[test]
    fn row_pads_missing_cells() {
        assert_eq!(TABLE.row(&["ok", "3s"]), "|ok|3s||\n");
    }

    #[test]
    fn render_appends_rows_in_order() {
        let rows: Vec<&[&str]> = vec![&["ok", "1s", "lint"], &["failed", "9s", "test"]];
        let table = TABLE.render(rows);
        assert!(table.ends_with("|ok|1s|lint|\n|failed|9s|test|\n"));
    }
}
