//! Deployed application graph as produced by the cluster collector

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of deployed artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactType {
    /// Helm chart (HTTP index or OCI)
    Helm,
    /// Plain Git source
    Git,
    /// Container image reference
    ContainerImage,
}

impl ArtifactType {
    /// Returns the string representation of the artifact type
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Helm => "helm",
            ArtifactType::Git => "git",
            ArtifactType::ContainerImage => "containerImage",
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata key naming the chart inside a repository when it differs from
/// the artifact name
pub const CHART_METADATA_KEY: &str = "chart";

/// One deployed artifact (chart, repository or image)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppArtifact {
    pub identity: String,
    pub source: String,
    pub artifact_type: ArtifactType,
    pub artifact_name: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl AppArtifact {
    pub fn new(source: &str, artifact_type: ArtifactType, artifact_name: &str) -> Self {
        Self {
            identity: Self::identity_for(source, artifact_type, artifact_name),
            source: source.to_string(),
            artifact_type,
            artifact_name: artifact_name.to_string(),
            discovered_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// `source::type`, or `source::type::name` when a name is present so that
    /// two charts from the same repository stay distinct.
    pub fn identity_for(source: &str, artifact_type: ArtifactType, artifact_name: &str) -> String {
        if artifact_name.is_empty() {
            format!("{}::{}", source, artifact_type)
        } else {
            format!("{}::{}::{}", source, artifact_type, artifact_name)
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.add_metadata(key, value);
        self
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Name to look up in the registry: the `chart` hint, else the artifact name
    pub fn chart_name(&self) -> &str {
        self.metadata
            .get(CHART_METADATA_KEY)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.artifact_name)
    }
}

/// One observed deployment revision of an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppVersion {
    pub version: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub artifacts: Vec<AppArtifact>,
}

impl AppVersion {
    pub fn new(version: &str, artifacts: Vec<AppArtifact>) -> Self {
        Self {
            version: version.to_string(),
            discovered_at: Utc::now(),
            labels: HashMap::new(),
            artifacts,
        }
    }
}

/// A deployed application with its revision history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub current_version: AppVersion,
    #[serde(default)]
    pub versions: Vec<AppVersion>,
    /// Artifact type (`helm`, ...) -> chart name, for artifacts without a
    /// `chart` metadata hint
    #[serde(default)]
    pub artifact_name_mappings: HashMap<String, String>,
}

impl App {
    pub fn new(id: &str, name: &str, current_version: AppVersion) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            labels: HashMap::new(),
            first_seen: None,
            last_seen: None,
            versions: vec![current_version.clone()],
            current_version,
            artifact_name_mappings: HashMap::new(),
        }
    }

    /// `artifact` with this app's chart name mapping applied as the `chart`
    /// hint when it carries none of its own
    pub fn resolve_artifact(&self, artifact: &AppArtifact) -> AppArtifact {
        let mut resolved = artifact.clone();
        let has_hint = artifact
            .metadata
            .get(CHART_METADATA_KEY)
            .is_some_and(|name| !name.is_empty());
        if !has_hint
            && let Some(chart) = self
                .artifact_name_mappings
                .get(artifact.artifact_type.as_str())
                .filter(|chart| !chart.is_empty())
        {
            resolved.add_metadata(CHART_METADATA_KEY, chart);
        }
        resolved
    }

    /// Every distinct artifact across all known revisions, ordered by identity
    pub fn all_artifacts(&self) -> Vec<&AppArtifact> {
        let mut seen = BTreeSet::new();
        let mut artifacts: Vec<&AppArtifact> = std::iter::once(&self.current_version)
            .chain(self.versions.iter())
            .flat_map(|version| version.artifacts.iter())
            .filter(|artifact| seen.insert(artifact.identity.as_str()))
            .collect();
        artifacts.sort_by(|a, b| a.identity.cmp(&b.identity));
        artifacts
    }
}
