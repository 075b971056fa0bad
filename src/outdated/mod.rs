//! Outdated-artifact detection layer
//!
//! # Modules
//!
//! - [`service`]: Orchestrator running refresh passes and the scheduled refresh
//! - [`store`]: TTL-aware result store (in-memory and SQLite)
//! - [`model`]: `OutdatedArtifactInfo` result record
//! - [`current_version`]: Deployed version of an artifact by type
//! - [`clock`]: Injectable source of "now"

pub mod clock;
pub mod current_version;
pub mod model;
pub mod service;
pub mod store;
