//! Source of deployed apps

use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::debug;

use crate::apps::model::App;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to read app inventory {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse app inventory {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Pull-based provider of every currently deployed app
#[cfg_attr(test, automock)]
pub trait AppProvider: Send + Sync {
    fn get_all_apps(&self) -> Result<Vec<App>, ProviderError>;
}

/// Fixed in-memory app set
#[derive(Debug, Clone, Default)]
pub struct StaticAppProvider {
    apps: Vec<App>,
}

impl StaticAppProvider {
    pub fn new(apps: Vec<App>) -> Self {
        Self { apps }
    }
}

impl AppProvider for StaticAppProvider {
    fn get_all_apps(&self) -> Result<Vec<App>, ProviderError> {
        Ok(self.apps.clone())
    }
}

/// Reads the collector's JSON export (an array of apps) on every call
#[derive(Debug, Clone)]
pub struct JsonFileAppProvider {
    path: PathBuf,
}

impl JsonFileAppProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AppProvider for JsonFileAppProvider {
    fn get_all_apps(&self) -> Result<Vec<App>, ProviderError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: self.path.clone(),
            source,
        })?;

        let apps: Vec<App> =
            serde_json::from_str(&content).map_err(|source| ProviderError::Parse {
                path: self.path.clone(),
                source,
            })?;

        debug!("Loaded {} apps from {:?}", apps.len(), self.path);
        Ok(apps)
    }
}
