pub mod apps;
pub mod config;
pub mod logging;
pub mod outdated;
pub mod version;
