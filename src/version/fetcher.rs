//! Version fetcher trait for resolving published versions of an artifact

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::apps::model::AppArtifact;
use crate::version::error::FetchError;

/// Trait for fetching the published versions of one kind of artifact
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionFetcher: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether this fetcher can resolve versions for the artifact
    fn supports(&self, artifact: &AppArtifact) -> bool;

    /// Fetches all versions published for the artifact
    ///
    /// # Returns
    /// * `Ok(versions)` - Canonical versions, newest first. Empty when the
    ///   registry was reachable but had nothing for this artifact.
    /// * `Err(FetchError)` - Transport, protocol or payload failure
    async fn fetch_all_versions(&self, artifact: &AppArtifact) -> Result<Vec<String>, FetchError>;
}

/// Ordered set of fetchers; the first one that supports an artifact wins.
#[derive(Clone, Default)]
pub struct FetcherSet {
    fetchers: Vec<Arc<dyn VersionFetcher>>,
}

impl FetcherSet {
    pub fn new(fetchers: Vec<Arc<dyn VersionFetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn select(&self, artifact: &AppArtifact) -> Option<Arc<dyn VersionFetcher>> {
        self.fetchers
            .iter()
            .find(|fetcher| fetcher.supports(artifact))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::model::ArtifactType;

    fn mock_fetcher(name: &'static str, supports: bool) -> MockVersionFetcher {
        let mut fetcher = MockVersionFetcher::new();
        fetcher.expect_name().return_const(name);
        fetcher.expect_supports().return_const(supports);
        fetcher
    }

    #[test]
    fn select_returns_first_supporting_fetcher() {
        let set = FetcherSet::new(vec![
            Arc::new(mock_fetcher("first", false)),
            Arc::new(mock_fetcher("second", true)),
            Arc::new(mock_fetcher("third", true)),
        ]);
        let artifact = AppArtifact::new("oci://ghcr.io/owner/charts", ArtifactType::Helm, "demo");

        let selected = set.select(&artifact).unwrap();
        assert_eq!(selected.name(), "second");
    }

    #[test]
    fn select_returns_none_when_nothing_supports() {
        let set = FetcherSet::new(vec![Arc::new(mock_fetcher("only", false))]);
        let artifact = AppArtifact::new("https://github.com/org/repo", ArtifactType::Git, "");

        assert!(set.select(&artifact).is_none());
    }
}
