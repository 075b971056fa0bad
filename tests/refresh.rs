//! Refresh pass E2E tests

mod helper;

use std::sync::Arc;

use chrono::Utc;
use mockito::Server;
use tempfile::TempDir;

use helper::{StubFetcher, helm_app, image_app, write_apps_file};
use kube_app_version::apps::model::ArtifactType;
use kube_app_version::apps::provider::{JsonFileAppProvider, StaticAppProvider};
use kube_app_version::config::{FetchCacheConfig, HttpConfig, OutdatedArtifactsConfig};
use kube_app_version::outdated::clock::SystemClock;
use kube_app_version::outdated::service::OutdatedArtifactsService;
use kube_app_version::outdated::store::{MemoryStore, OutdatedArtifactStore, SqliteStore};
use kube_app_version::version::fetcher::{FetcherSet, VersionFetcher};
use kube_app_version::version::fetchers::{build_http_client, default_fetchers};

const HELM_INDEX: &str = r#"
apiVersion: v1
entries:
  demo:
    - version: "1.2.3"
    - version: "1.10.0"
    - version: "1.3.0-alpha"
  stable:
    - version: "2.0"
    - version: "1.9.0"
"#;

#[tokio::test(flavor = "multi_thread")]
async fn refresh_detects_outdated_helm_chart_from_index() {
    let mut server = Server::new_async().await;
    let index_mock = server
        .mock("GET", "/index.yaml")
        .with_status(200)
        .with_header("content-type", "application/yaml")
        .with_body(HELM_INDEX)
        .expect(2)
        .create_async()
        .await;

    let apps = vec![
        helm_app("shop", "1.2.3", &server.url(), "demo"),
        helm_app("blog", "2.0.0", &server.url(), "stable"),
    ];
    let apps_file = write_apps_file(&apps);

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&temp_dir.path().join("outdated.db")).unwrap());
    let client = build_http_client(&HttpConfig::default()).unwrap();

    let service = OutdatedArtifactsService::new(
        Arc::new(JsonFileAppProvider::new(apps_file.path())),
        default_fetchers(client, &FetchCacheConfig::default(), None),
        store.clone(),
        Arc::new(SystemClock),
        OutdatedArtifactsConfig::default(),
    );

    let outdated = service.get_outdated_artifacts().await.unwrap();

    index_mock.assert_async().await;
    assert_eq!(outdated.len(), 1);
    let info = &outdated[0];
    assert_eq!(info.app_name, "shop");
    assert_eq!(info.artifact_type, ArtifactType::Helm);
    assert_eq!(info.current_artifact_version, "1.2.3");
    assert_eq!(info.latest_overall_version.as_deref(), Some("1.10.0"));
    assert_eq!(info.latest_ga_release.as_deref(), Some("1.10.0"));
    assert_eq!(info.latest_pre_release.as_deref(), Some("1.3.0-alpha"));
    assert_eq!(info.next_minor_version, None);
    assert_eq!(info.next_major_version.as_deref(), Some("1.10.0"));
    assert_eq!(info.major_version_delta, Some(0));
    assert_eq!(info.minor_version_delta, Some(8));
    assert_eq!(info.available_versions, vec!["1.10.0", "1.3.0-alpha", "1.2.3"]);
    assert_eq!(info.time_to_live, 3600);

    // A second read within the validity window is served from the store
    let cached = service.get_outdated_artifacts().await.unwrap();
    assert_eq!(cached, outdated);
    assert_eq!(store.find_all(Utc::now()).unwrap(), outdated);

    let tracked = service.get_all_artifacts();
    assert_eq!(tracked.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_survives_failing_registry() {
    let mut server = Server::new_async().await;
    let _broken = server
        .mock("GET", "/broken/index.yaml")
        .with_status(503)
        .create_async()
        .await;
    let _healthy = server
        .mock("GET", "/healthy/index.yaml")
        .with_status(200)
        .with_body(HELM_INDEX)
        .create_async()
        .await;

    let apps = vec![
        helm_app("a", "1.0.0", &format!("{}/broken", server.url()), "demo"),
        helm_app("b", "1.0.0", &format!("{}/healthy/", server.url()), "demo"),
    ];
    let client = build_http_client(&HttpConfig::default()).unwrap();

    let service = OutdatedArtifactsService::new(
        Arc::new(StaticAppProvider::new(apps)),
        default_fetchers(client, &FetchCacheConfig::default(), None),
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        OutdatedArtifactsConfig::default(),
    );

    let outdated = service.refresh_all().await.unwrap();
    assert_eq!(outdated.len(), 1);
    assert_eq!(outdated[0].app_id, "b");

    let available = service.get_available_versions_for_all_artifacts().await.unwrap();
    let broken_key = format!("a::helm::{}/broken::ERROR", server.url());
    assert!(available[&broken_key][0].contains("HTTP status: 503"));
    assert_eq!(
        available[&format!("b::helm::{}/healthy/", server.url())],
        vec!["1.10.0", "1.3.0-alpha", "1.2.3"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_skips_ghcr_chart_without_token() {
    let apps = vec![helm_app("a", "1.0.0", "oci://ghcr.io/owner/charts", "demo")];
    let client = build_http_client(&HttpConfig::default()).unwrap();

    let service = OutdatedArtifactsService::new(
        Arc::new(StaticAppProvider::new(apps)),
        default_fetchers(client, &FetchCacheConfig::default(), None),
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        OutdatedArtifactsConfig::default(),
    );

    assert!(service.refresh_all().await.unwrap().is_empty());

    let available = service.get_available_versions_for_all_artifacts().await.unwrap();
    assert_eq!(
        available["a::helm::oci://ghcr.io/owner/charts"],
        Vec::<String>::new()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_compares_container_images_by_normalized_tag() {
    let images = Arc::new(
        StubFetcher::new(ArtifactType::ContainerImage)
            .with_versions("registry.example.com/app:2.1", vec!["2.1.0", "2.3.0", "3.0.0-rc.1"])
            .with_default_versions(vec!["9.9.9"]),
    );

    let service = OutdatedArtifactsService::new(
        Arc::new(StaticAppProvider::new(vec![
            image_app("api", "registry.example.com/app:2.1"),
            image_app("pinned", "registry.example.com/app@sha256:0123abcd"),
        ])),
        FetcherSet::new(vec![images.clone() as Arc<dyn VersionFetcher>]),
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        OutdatedArtifactsConfig::default(),
    );

    let outdated = service.refresh_all().await.unwrap();

    assert_eq!(images.calls(), 1);
    assert_eq!(outdated.len(), 1);
    let info = &outdated[0];
    assert_eq!(info.app_id, "api");
    assert_eq!(info.current_artifact_version, "2.1.0");
    assert_eq!(info.latest_ga_release.as_deref(), Some("2.3.0"));
    assert_eq!(info.next_major_version.as_deref(), Some("2.3.0"));
    assert_eq!(info.minor_version_delta, Some(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_looks_up_mapped_chart_name() {
    let charts = Arc::new(
        StubFetcher::new(ArtifactType::Helm)
            .with_versions("nginx", vec!["15.0.0", "14.2.0"])
            .with_default_versions(vec!["1.0.0"]),
    );
    let mut app = helm_app("web", "v14.2", "https://charts.example.com", "my-release");
    app.artifact_name_mappings
        .insert("helm".to_string(), "nginx".to_string());

    let service = OutdatedArtifactsService::new(
        Arc::new(StaticAppProvider::new(vec![app])),
        FetcherSet::new(vec![charts.clone() as Arc<dyn VersionFetcher>]),
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        OutdatedArtifactsConfig::default(),
    );

    let outdated = service.refresh_all().await.unwrap();

    assert_eq!(outdated.len(), 1);
    let info = &outdated[0];
    assert_eq!(info.current_artifact_version, "14.2.0");
    assert_eq!(info.latest_ga_release.as_deref(), Some("15.0.0"));
    assert_eq!(info.next_major_version, None);
    assert_eq!(info.major_version_delta, Some(1));
    assert_eq!(info.minor_version_delta, Some(0));

    let available = service.get_available_versions_for_all_artifacts().await.unwrap();
    assert_eq!(
        available["web::helm::https://charts.example.com"],
        vec!["15.0.0", "14.2.0"]
    );
}
