//! Version fetcher implementations for Helm chart sources

pub mod docker_hub;
pub mod github_oci;
pub mod helm;

use std::sync::Arc;
use std::time::Duration;

pub use docker_hub::DockerHubOciFetcher;
pub use github_oci::GitHubOciFetcher;
pub use helm::HelmHttpFetcher;

use crate::config::{FetchCacheConfig, HttpConfig};
use crate::version::cache::FetchCache;
use crate::version::error::FetchError;
use crate::version::fetcher::{FetcherSet, VersionFetcher};

const USER_AGENT: &str = "kube-app-version";

/// Build the HTTP client shared by every fetcher
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()?;
    Ok(client)
}

/// The production fetcher chain.
///
/// OCI fetchers come first so an `oci://` source never reaches the generic
/// Helm index fetcher.
pub fn default_fetchers(
    client: reqwest::Client,
    cache_config: &FetchCacheConfig,
    github_token: Option<String>,
) -> FetcherSet {
    let cache = || FetchCache::new(cache_config.capacity, Duration::from_millis(cache_config.ttl_ms));

    let fetchers: Vec<Arc<dyn VersionFetcher>> = vec![
        Arc::new(DockerHubOciFetcher::new(client.clone(), cache())),
        Arc::new(GitHubOciFetcher::new(client.clone(), cache(), github_token)),
        Arc::new(HelmHttpFetcher::new(client, cache())),
    ];

    FetcherSet::new(fetchers)
}
