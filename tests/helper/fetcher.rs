//! Fetcher test utilities

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use kube_app_version::apps::model::{AppArtifact, ArtifactType};
use kube_app_version::version::error::FetchError;
use kube_app_version::version::fetcher::VersionFetcher;

/// Fetcher answering from a fixed table, keyed by chart name or source
pub struct StubFetcher {
    artifact_type: ArtifactType,
    versions: HashMap<String, Vec<String>>,
    default_versions: Vec<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new(artifact_type: ArtifactType) -> Self {
        Self {
            artifact_type,
            versions: HashMap::new(),
            default_versions: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_versions(mut self, key: &str, versions: Vec<&str>) -> Self {
        self.versions.insert(
            key.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Versions returned for any artifact without an explicit entry
    pub fn with_default_versions(mut self, versions: Vec<&str>) -> Self {
        self.default_versions = versions.into_iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionFetcher for StubFetcher {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, artifact: &AppArtifact) -> bool {
        artifact.artifact_type == self.artifact_type
    }

    async fn fetch_all_versions(&self, artifact: &AppArtifact) -> Result<Vec<String>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let versions = self
            .versions
            .get(artifact.chart_name())
            .or_else(|| self.versions.get(&artifact.source))
            .unwrap_or(&self.default_versions);
        Ok(versions.clone())
    }
}
