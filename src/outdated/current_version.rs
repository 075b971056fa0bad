//! Determines which version of an artifact is currently deployed

use tracing::{debug, warn};

use crate::apps::model::{AppArtifact, AppVersion, ArtifactType};
use crate::version::semver::normalize_version;

/// Placeholder some collectors report when the revision is not known
const UNKNOWN_VERSION: &str = "unknown";

/// Current version of `artifact` as deployed in `app_version`.
///
/// - `helm`/`git`: the revision's own version
/// - `containerImage`: the tag after the last `:`; digest-only references
///   have no version
///
/// Versions are normalized when they parse and passed through otherwise.
///
/// Returns `None` when no comparable version can be determined.
pub fn determine_current_version(artifact: &AppArtifact, app_version: &AppVersion) -> Option<String> {
    let version = match artifact.artifact_type {
        ArtifactType::Helm | ArtifactType::Git => Some(normalize_version(app_version.version.trim())),
        ArtifactType::ContainerImage => image_tag(&artifact.source).map(normalize_version),
    };

    version.filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(UNKNOWN_VERSION))
}

/// Tag portion of an image reference, `None` for digest-only references
fn image_tag(source: &str) -> Option<&str> {
    let (reference, digest) = match source.split_once('@') {
        Some((reference, digest)) => (reference, Some(digest)),
        None => (source, None),
    };

    // `registry:5000/app` has a port, not a tag
    let tag = reference
        .rfind(':')
        .filter(|colon| *colon > 0)
        .map(|colon| &reference[colon + 1..])
        .filter(|tag| !tag.is_empty() && !tag.contains('/'));

    match (tag, digest) {
        (Some(tag), _) => Some(tag),
        (None, Some(digest)) => {
            debug!(
                "Image {} is pinned to digest {}, skipping version comparison",
                source, digest
            );
            None
        }
        (None, None) => {
            warn!("Could not parse version tag from image source: {}", source);
            None
        }
    }
}
