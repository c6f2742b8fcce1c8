//! Bitbridge Bitbucket Cloud infrastructure adapter.
//!
//! Implements the [`pipeline::VersionControl`] port for Bitbucket Cloud:
//! posting build statuses (and, for finished pull request runs, a summary
//! comment), assembling a repository's CI configuration directory into one
//! YAML stream, fetching single files, and resolving commits.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All Bitbucket REST details (endpoints, authentication,
//! response shapes, state names) live here; the [`pipeline`] crate never sees
//! them. Provider logic talks to the platform only through the [`BitbucketApi`]
//! trait, so tests swap in [`fakes::FakeBitbucketApi`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`api`] | [`BitbucketApi`] port, request/response contracts, [`ApiError`] |
//! | [`client`] | [`BitbucketHttpClient`], the `reqwest` implementation |
//! | [`status`] | Conclusion → build state translation and the comment gate |
//! | [`bundle`] | Multi-document YAML assembly |
//! | [`payload`] | Webhook payload parsing |
//! | [`provider`] | [`BitbucketProvider`] |
//! | [`fakes`] | In-memory API for tests |

pub mod api;
pub mod bundle;
pub mod client;
pub mod fakes;
pub mod payload;
pub mod provider;
pub mod status;

pub use api::{ApiError, BitbucketApi, CommitStatus, RepoRef, RepositoryFile};
pub use bundle::ConfigBundle;
pub use client::{BitbucketHttpClient, DEFAULT_API_URL};
pub use payload::parse_webhook;
pub use provider::{BitbucketProvider, TASK_STATUS_TEMPLATE};
pub use status::{BuildState, TranslatedStatus};
