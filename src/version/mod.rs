//! Version resolution layer
//!
//! Fetches the versions an artifact's registry publishes and compares them
//! against what is deployed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │────▶│ Fetch cache │     │  Analyzer   │
//! │  (fetch)    │     │ (TTL + cap) │     │  (compare)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │  Fetchers   │                         │   Semver    │
//! │ (helm, oci) │                         │ (normalize) │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`fetcher`]: Fetcher trait and first-match dispatch
//! - [`fetchers`]: Helm HTTP, Docker Hub OCI and GitHub OCI implementations
//! - [`cache`]: Bounded in-memory cache of fetched version lists
//! - [`analyzer`]: Latest/next version and delta computation
//! - [`semver`]: Version normalization and ordering
//! - [`error`]: Error types for fetch and store operations

pub mod analyzer;
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod fetchers;
pub mod semver;
