//! Shared integration test utilities

pub mod apps;
pub mod fetcher;

pub use apps::{helm_app, image_app, write_apps_file};
pub use fetcher::StubFetcher;
