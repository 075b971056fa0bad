//! Deployed application inventory
//!
//! The cluster collector that discovers apps lives outside this crate; this
//! layer defines the records it hands over and the provider boundary.
//!
//! # Modules
//!
//! - [`model`]: `App` / `AppVersion` / `AppArtifact` records
//! - [`provider`]: Pull-based source of the current app set

pub mod model;
pub mod provider;
