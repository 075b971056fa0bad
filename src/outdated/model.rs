//! Outdated-artifact result record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::apps::model::{App, AppArtifact, AppVersion, ArtifactType};
use crate::version::analyzer::VersionAnalysis;

/// One deployed artifact that is behind its upstream registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutdatedArtifactInfo {
    /// `appId::artifactIdentity`
    pub id: String,
    pub app_name: String,
    pub app_id: String,
    pub deployed_app_version: String,
    pub artifact_source: String,
    pub artifact_type: ArtifactType,
    pub current_artifact_version: String,
    pub latest_overall_version: Option<String>,
    #[serde(rename = "latestGARelease")]
    pub latest_ga_release: Option<String>,
    pub latest_pre_release: Option<String>,
    pub next_minor_version: Option<String>,
    pub next_major_version: Option<String>,
    pub major_version_delta: Option<u64>,
    pub minor_version_delta: Option<u64>,
    pub available_versions: Vec<String>,
    pub last_updated: DateTime<Utc>,
    /// Seconds after `last_updated` during which the record is served
    pub time_to_live: u64,
}

impl OutdatedArtifactInfo {
    pub fn record_id(app_id: &str, artifact_identity: &str) -> String {
        format!("{}::{}", app_id, artifact_identity)
    }

    pub fn new(
        app: &App,
        app_version: &AppVersion,
        artifact: &AppArtifact,
        analysis: VersionAnalysis,
        available_versions: Vec<String>,
        last_updated: DateTime<Utc>,
        time_to_live: u64,
    ) -> Self {
        Self {
            id: Self::record_id(&app.id, &artifact.identity),
            app_name: app.name.clone(),
            app_id: app.id.clone(),
            deployed_app_version: app_version.version.clone(),
            artifact_source: artifact.source.clone(),
            artifact_type: artifact.artifact_type,
            current_artifact_version: analysis.current_version,
            latest_overall_version: analysis.latest_overall,
            latest_ga_release: analysis.latest_ga,
            latest_pre_release: analysis.latest_pre_release,
            next_minor_version: analysis.next_minor,
            next_major_version: analysis.next_major,
            major_version_delta: analysis.major_version_delta,
            minor_version_delta: analysis.minor_version_delta,
            available_versions,
            last_updated,
            time_to_live,
        }
    }

    /// Instant after which the record is no longer served
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.time_to_live).unwrap_or(i64::MAX);
        self.last_updated
            .checked_add_signed(chrono::Duration::seconds(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}
