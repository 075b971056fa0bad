//! GitHub Container Registry (ghcr.io) OCI Helm chart implementation

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

/// Default base URL for GitHub API
const DEFAULT_BASE_URL: &str = "https://api.github.com";

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Environment variable holding the GitHub access token
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Page size requested from the packages API (its maximum)
const PER_PAGE: usize = 100;

/// Upper bound on pages followed for a single package
const MAX_PAGES: usize = 10;

/// `oci://ghcr.io/<owner>/<path...>`
static GITHUB_OCI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^oci://ghcr\.io/([^/]+)(?:/(.*))?$").expect("valid regex"));

/// Response item from the packages-by-container versions API
#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(default)]
    metadata: Option<PackageMetadata>,
}

#[derive(Debug, Deserialize)]
struct PackageMetadata {
    #[serde(default)]
    container: Option<ContainerMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

/// Fetcher for Helm charts published to ghcr.io
pub struct GitHubOciFetcher {
    client: reqwest::Client,
    cache: FetchCache,
    base_url: String,
    token: Option<String>,
}

impl GitHubOciFetcher {
    pub fn new(client: reqwest::Client, cache: FetchCache, token: Option<String>) -> Self {
        Self {
            client,
            cache,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Owner and URL-encoded package path for the packages API.
    ///
    /// `oci://ghcr.io/gabe565/charts` + chart `gotify` -> (`gabe565`, `charts%2Fgotify`)
    fn package_coordinates(source: &str, chart: &str) -> Option<(String, String)> {
        let caps = GITHUB_OCI_RE.captures(source)?;
        let owner = caps[1].to_string();
        let path = caps
            .get(2)
            .map(|m| m.as_str().trim_matches('/'))
            .unwrap_or_default();

        let package = if path.is_empty() {
            chart.to_string()
        } else if chart.is_empty() || path.rsplit('/').next() == Some(chart) {
            path.to_string()
        } else {
            format!("{}/{}", path, chart)
        };

        if package.is_empty() {
            return None;
        }

        Some((owner, urlencoding::encode(&package).into_owned()))
    }

    async fn fetch_page(
        &self,
        owner: &str,
        package: &str,
        token: &str,
        page: usize,
    ) -> Result<Vec<PackageVersion>, FetchError> {
        let url = format!(
            "{}/users/{}/packages/container/{}/versions?per_page={}&page={}",
            self.base_url, owner, package, PER_PAGE, page
        );
        debug!("Fetching GitHub OCI versions from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| FetchError::Malformed {
            url,
            message: e.to_string(),
        })
    }
}

/// Reads a non-empty `$GITHUB_TOKEN`
pub fn token_from_env() -> Option<String> {
    std::env::var(GITHUB_TOKEN_ENV)
        .ok()
        .filter(|token| !token.is_empty())
}

#[async_trait::async_trait]
impl VersionFetcher for GitHubOciFetcher {
    fn name(&self) -> &'static str {
        "github-oci"
    }

    fn supports(&self, artifact: &AppArtifact) -> bool {
        artifact.artifact_type == ArtifactType::Helm && artifact.source.starts_with("oci://ghcr.io/")
    }

    async fn fetch_all_versions(&self, artifact: &AppArtifact) -> Result<Vec<String>, FetchError> {
        let cache_key = &artifact.identity;
        if let Some(versions) = self.cache.get(cache_key) {
            return Ok(versions);
        }

        let Some(token) = self.token.as_deref() else {
            warn!(
                "{} is not set, skipping GitHub OCI lookup for {}",
                GITHUB_TOKEN_ENV, artifact.source
            );
            return Ok(Vec::new());
        };

        let (owner, package) = Self::package_coordinates(&artifact.source, artifact.chart_name())
            .ok_or_else(|| FetchError::InvalidSource(artifact.source.clone()))?;

        let mut tags = Vec::new();
        for page in 1..=MAX_PAGES {
            let versions = self.fetch_page(&owner, &package, token, page).await?;
            let page_len = versions.len();

            tags.extend(
                versions
                    .into_iter()
                    .filter_map(|v| v.metadata?.container)
                    .flat_map(|container| container.tags),
            );

            if page_len < PER_PAGE {
                break;
            }
        }

        if tags.is_empty() {
            warn!("No versions found for {}", artifact.source);
        }

        let versions = sort_descending(&tags);
        info!(
            "Found {} versions for GitHub OCI chart: {}",
            versions.len(),
            artifact.source
        );
        self.cache.insert(cache_key, versions.clone());

        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use rstest::rstest;
    use std::time::Duration;

    const VERSIONS_PATH: &str = "/users/gabe565/packages/container/charts%2Fgotify/versions";

    fn fetcher(server: &ServerGuard, token: Option<&str>) -> GitHubOciFetcher {
        GitHubOciFetcher::new(
            reqwest::Client::new(),
            FetchCache::new(16, Duration::from_secs(60)),
            token.map(str::to_string),
        )
        .with_base_url(&server.url())
    }

    fn chart() -> AppArtifact {
        AppArtifact::new("oci://ghcr.io/gabe565/charts", ArtifactType::Helm, "gotify")
    }

    fn page_query(page: usize) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("per_page".into(), "100".into()),
            Matcher::UrlEncoded("page".into(), page.to_string()),
        ])
    }

    #[rstest]
    #[case("oci://ghcr.io/gabe565/charts", "gotify", Some(("gabe565", "charts%2Fgotify")))]
    #[case("oci://ghcr.io/gabe565/charts/", "gotify", Some(("gabe565", "charts%2Fgotify")))]
    #[case("oci://ghcr.io/gabe565/charts/gotify", "gotify", Some(("gabe565", "charts%2Fgotify")))]
    #[case("oci://ghcr.io/owner", "app", Some(("owner", "app")))]
    #[case("oci://ghcr.io/owner/helm charts", "app", Some(("owner", "helm%20charts%2Fapp")))]
    #[case("oci://ghcr.io/owner", "", None)]
    #[case("oci://docker.io/owner/charts", "app", None)]
    fn package_coordinates_builds_encoded_path(
        #[case] source: &str,
        #[case] chart: &str,
        #[case] expected: Option<(&str, &str)>,
    ) {
        assert_eq!(
            GitHubOciFetcher::package_coordinates(source, chart),
            expected.map(|(o, p)| (o.to_string(), p.to_string()))
        );
    }

    #[tokio::test]
    async fn fetch_all_versions_collects_every_tag() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", VERSIONS_PATH)
            .match_query(page_query(1))
            .match_header("authorization", "Bearer secret")
            .match_header("accept", "application/vnd.github+json")
            .match_header("x-github-api-version", "2022-11-28")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"id": 3, "metadata": {"package_type": "container", "container": {"tags": ["0.5.0", "latest"]}}},
                    {"id": 2, "metadata": {"package_type": "container", "container": {"tags": ["0.4.1", "0.4"]}}},
                    {"id": 1, "metadata": {"package_type": "container", "container": {"tags": []}}},
                    {"id": 0}
                ]"#,
            )
            .expect(1)
            .create_async()
            .await;

        let fetcher = fetcher(&server, Some("secret"));

        let first = fetcher.fetch_all_versions(&chart()).await.unwrap();
        let second = fetcher.fetch_all_versions(&chart()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, vec!["0.5.0", "0.4.1", "0.4.0"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fetch_all_versions_follows_full_pages() {
        let mut server = Server::new_async().await;

        let full_page: Vec<String> = (0..PER_PAGE)
            .map(|i| format!(r#"{{"metadata": {{"container": {{"tags": ["1.0.{}"]}}}}}}"#, i))
            .collect();

        let first_page = server
            .mock("GET", VERSIONS_PATH)
            .match_query(page_query(1))
            .with_status(200)
            .with_body(format!("[{}]", full_page.join(",")))
            .expect(1)
            .create_async()
            .await;

        let second_page = server
            .mock("GET", VERSIONS_PATH)
            .match_query(page_query(2))
            .with_status(200)
            .with_body(r#"[{"metadata": {"container": {"tags": ["2.0.0"]}}}]"#)
            .expect(1)
            .create_async()
            .await;

        let result = fetcher(&server, Some("secret"))
            .fetch_all_versions(&chart())
            .await
            .unwrap();

        first_page.assert_async().await;
        second_page.assert_async().await;
        assert_eq!(result.len(), PER_PAGE + 1);
        assert_eq!(result[0], "2.0.0");
    }

    #[tokio::test]
    async fn fetch_all_versions_returns_empty_without_token() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = fetcher(&server, None).fetch_all_versions(&chart()).await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn fetch_all_versions_treats_empty_token_as_missing() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = fetcher(&server, Some("")).fetch_all_versions(&chart()).await;

        mock.assert_async().await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_all_versions_returns_status_error_for_non_200() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", VERSIONS_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"message": "Forbidden"}"#)
            .create_async()
            .await;

        let result = fetcher(&server, Some("secret"))
            .fetch_all_versions(&chart())
            .await;

        assert!(matches!(result, Err(FetchError::Status { status: 403, .. })));
    }

    #[tokio::test]
    async fn fetch_all_versions_returns_malformed_error_for_invalid_json() {
        let mut server = Server::new_async().await;

        let _mock = server
            .mock("GET", VERSIONS_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let result = fetcher(&server, Some("secret"))
            .fetch_all_versions(&chart())
            .await;

        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }
}
