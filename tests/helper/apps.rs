//! App inventory fixtures

use std::io::Write;

use tempfile::NamedTempFile;

use kube_app_version::apps::model::{App, AppArtifact, AppVersion, ArtifactType};

/// App whose current revision deploys one Helm chart
pub fn helm_app(id: &str, version: &str, source: &str, chart: &str) -> App {
    let artifact = AppArtifact::new(source, ArtifactType::Helm, chart);
    App::new(id, id, AppVersion::new(version, vec![artifact]))
}

/// App whose current revision runs one container image
pub fn image_app(id: &str, image: &str) -> App {
    let artifact = AppArtifact::new(image, ArtifactType::ContainerImage, "");
    App::new(id, id, AppVersion::new("unknown", vec![artifact]))
}

/// Write `apps` as the collector's JSON export
pub fn write_apps_file(apps: &[App]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(apps).unwrap().as_bytes())
        .unwrap();
    file
}
