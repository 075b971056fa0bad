//! Helm HTTP repository (`index.yaml`) implementation

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::apps::model::{AppArtifact, ArtifactType};
use crate::version::cache::FetchCache;
use crate::version::error::FetchError;
use crate::version::fetcher::VersionFetcher;
use crate::version::semver::sort_descending;

/// Fetcher for classic Helm repositories serving `{repo}/index.yaml`
pub struct HelmHttpFetcher {
    client: reqwest::Client,
    cache: FetchCache,
}

impl HelmHttpFetcher {
    pub fn new(client: reqwest::Client, cache: FetchCache) -> Self {
        Self { client, cache }
    }

    fn index_url(source: &str) -> String {
        format!("{}/index.yaml", source.trim_end_matches('/'))
    }
}

/// Collect `entries[chart][*].version` from a parsed index.
///
/// Missing or mistyped structure yields an empty list rather than an error.
fn extract_chart_versions(index: &Value, chart: &str, url: &str) -> Vec<String> {
    let Some(entries) = index.get("entries") else {
        warn!("Index {} does not contain 'entries'", url);
        return Vec::new();
    };

    if !entries.is_mapping() {
        warn!("'entries' in index {} is not a map", url);
        return Vec::new();
    }

    let Some(chart_entries) = entries.get(chart) else {
        warn!("Chart '{}' not found in {}", chart, url);
        return Vec::new();
    };

    let Some(chart_entries) = chart_entries.as_sequence() else {
        warn!("Chart entry for '{}' in {} is not a list", chart, url);
        return Vec::new();
    };

    chart_entries
        .iter()
        .filter_map(|entry| match entry.get("version")? {
            Value::String(version) => Some(version.clone()),
            Value::Number(version) => Some(version.to_string()),
            _ => None,
        })
        .collect()
}

#[async_trait::async_trait]
impl VersionFetcher for HelmHttpFetcher {
    fn name(&self) -> &'static str {
        "helm-http"
    }

    fn supports(&self, artifact: &AppArtifact) -> bool {
        artifact.artifact_type == ArtifactType::Helm && !artifact.source.starts_with("oci://")
    }

    async fn fetch_all_versions(&self, artifact: &AppArtifact) -> Result<Vec<String>, FetchError> {
        let cache_key = &artifact.identity;
        if let Some(versions) = self.cache.get(cache_key) {
            return Ok(versions);
        }

        let url = Self::index_url(&artifact.source);
        debug!("Fetching Helm index file from: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/yaml, text/yaml, */*")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Helm repository returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let index: Value = serde_yaml::from_str(&body).map_err(|e| FetchError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let chart = artifact.chart_name();
        let raw_versions = extract_chart_versions(&index, chart, &url);
        let versions = sort_descending(&raw_versions);

        info!(
            "Found {} versions for chart '{}' in {}",
            versions.len(),
            chart,
            artifact.source
        );
        self.cache.insert(cache_key, versions.clone());

        Ok(versions)
    }
}
