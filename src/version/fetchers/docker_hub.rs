//! Docker Hub OCI Helm chart implementation
//!
//! Two requests per fetch: an anonymous pull token from the Docker Hub auth
//! service, then the registry's tag list.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::apps::model::{AppArtifact, ArtifactType};
use crate::version::cache::FetchCache;
use crate::version::error::FetchError;
use crate::version::fetcher::VersionFetcher;
use crate::version::semver::sort_descending;

/// Default Docker Hub token endpoint
const DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";

const AUTH_SERVICE: &str = "registry.docker.io";

/// `oci://<subdomain>.docker.io/<path>`
static DOCKER_HUB_OCI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^oci://([^/]+\.docker\.io)/(.+)$").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagListResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Fetcher for Helm charts stored as OCI artifacts on Docker Hub
pub struct DockerHubOciFetcher {
    client: reqwest::Client,
    cache: FetchCache,
    auth_url: String,
    /// Overrides `https://<domain>` for the tag list request
    registry_base_url: Option<String>,
}

impl DockerHubOciFetcher {
    pub fn new(client: reqwest::Client, cache: FetchCache) -> Self {
        Self {
            client,
            cache,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            registry_base_url: None,
        }
    }

    /// Point both the token and the tag list requests at custom endpoints
    pub fn with_endpoints(mut self, auth_url: &str, registry_base_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.registry_base_url = Some(registry_base_url.trim_end_matches('/').to_string());
        self
    }

    /// Split `oci://registry-1.docker.io/bitnamicharts/nginx` into
    /// (`registry-1.docker.io`, `bitnamicharts/nginx`)
    fn parse_source(source: &str) -> Option<(String, String)> {
        let caps = DOCKER_HUB_OCI_RE.captures(source)?;
        Some((
            caps[1].to_string(),
            caps[2].trim_end_matches('/').to_string(),
        ))
    }

    async fn fetch_token(&self, repository: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}?service={}&scope=repository:{}:pull",
            self.auth_url, AUTH_SERVICE, repository
        );
        debug!("Getting Docker Hub auth token from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Docker Hub auth returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| FetchError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;

        token
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| FetchError::Malformed {
                url,
                message: "Empty token received from Docker Hub auth".to_string(),
            })
    }

    async fn fetch_tags(
        &self,
        domain: &str,
        repository: &str,
        token: &str,
    ) -> Result<Vec<String>, FetchError> {
        let base = self
            .registry_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", domain));
        let url = format!("{}/v2/{}/tags/list", base, repository);
        debug!("Fetching Docker Hub OCI tags from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Docker Hub registry returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let tags: TagListResponse = response.json().await.map_err(|e| FetchError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;

        Ok(tags
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter(|tag| !tag.is_empty())
            .collect())
    }
}

#[async_trait::async_trait]
impl VersionFetcher for DockerHubOciFetcher {
    fn name(&self) -> &'static str {
        "docker-hub-oci"
    }

    fn supports(&self, artifact: &AppArtifact) -> bool {
        artifact.artifact_type == ArtifactType::Helm && DOCKER_HUB_OCI_RE.is_match(&artifact.source)
    }

    async fn fetch_all_versions(&self, artifact: &AppArtifact) -> Result<Vec<String>, FetchError> {
        let source = &artifact.source;
        if let Some(versions) = self.cache.get(source) {
            return Ok(versions);
        }

        let (domain, repository) = Self::parse_source(source)
            .ok_or_else(|| FetchError::InvalidSource(source.clone()))?;

        let token = self.fetch_token(&repository).await?;
        let tags = self.fetch_tags(&domain, &repository, &token).await?;

        if tags.is_empty() {
            warn!("No versions found for {}", source);
        }

        let versions = sort_descending(&tags);
        info!(
            "Found {} versions for Docker Hub OCI chart: {}",
            versions.len(),
            source
        );
        self.cache.insert(source, versions.clone());

        Ok(versions)
    }
}
