//! Orchestration domain for Bitbridge.
//!
//! This crate defines what a CI orchestrator needs from a source-hosting
//! platform: the change event a run is planned from, the status vocabulary a
//! run reports in, and the [`VersionControl`] port that backends implement.
//! Infrastructure crates (such as `bitbucket`) implement the port; they never
//! add orchestration rules here.
//!
//! ## Architectural Layer
//!
//! **Domain types + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`Owner`, `RepositorySlug`, `GitReference`, etc.) |
//! | [`event`] | [`ChangeEvent`] and its payload |
//! | [`status`] | Conclusions, lifecycle phases, status reports and deliveries |
//! | [`options`] | [`AdapterOptions`] |
//! | [`vcs`] | The [`VersionControl`] port and backend metadata |
//! | [`errors`] | [`VcsError`] |

pub mod errors;
pub mod event;
pub mod identifiers;
pub mod options;
pub mod status;
pub mod vcs;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::VcsError;
pub use event::{ChangeEvent, EventKind, EventPayload};
pub use identifiers::{
    BranchName, EmptyIdentifier, GitReference, Owner, PullRequestId, RepositorySlug,
};
pub use options::AdapterOptions;
pub use status::{
    Conclusion, LifecyclePhase, NotificationOutcome, SkipReason, StatusDelivery, StatusReport,
};
pub use vcs::{CommitInfo, ProviderMetadata, StatusTableTemplate, VersionControl};
