//! Outdated-artifact orchestration
//!
//! A refresh pass fans out one fetch-compare task per deployed artifact onto a
//! bounded pool, joins them all, and writes the outdated ones to the store in
//! one bulk upsert.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::apps::model::{App, AppArtifact};
use crate::apps::provider::{AppProvider, ProviderError};
use crate::config::OutdatedArtifactsConfig;
use crate::outdated::clock::Clock;
use crate::outdated::current_version::determine_current_version;
use crate::outdated::model::OutdatedArtifactInfo;
use crate::outdated::store::OutdatedArtifactStore;
use crate::version::analyzer::analyze;
use crate::version::error::{FetchError, StoreError};
use crate::version::fetcher::FetcherSet;

/// Suffix of the available-versions key under which a fetch failure is reported
pub const ERROR_KEY_SUFFIX: &str = "::ERROR";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to load apps: {0}")]
    Provider(#[from] ProviderError),

    #[error("Result store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct OutdatedArtifactsService {
    provider: Arc<dyn AppProvider>,
    fetchers: FetcherSet,
    store: Arc<dyn OutdatedArtifactStore>,
    clock: Arc<dyn Clock>,
    config: OutdatedArtifactsConfig,
}

impl OutdatedArtifactsService {
    pub fn new(
        provider: Arc<dyn AppProvider>,
        fetchers: FetcherSet,
        store: Arc<dyn OutdatedArtifactStore>,
        clock: Arc<dyn Clock>,
        config: OutdatedArtifactsConfig,
    ) -> Self {
        info!(
            "OutdatedArtifactsService initialized with {} version fetchers",
            fetchers.len()
        );
        Self {
            provider,
            fetchers,
            store,
            clock,
            config,
        }
    }

    /// Seconds each saved record stays valid
    fn time_to_live(&self) -> u64 {
        self.config.cache_validity_minutes.saturating_mul(60)
    }

    fn validity_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::try_from(self.config.cache_validity_minutes).unwrap_or(i64::MAX))
    }

    /// Startup hooks: optionally record every artifact's available versions,
    /// then optionally run a first refresh pass. Failures are logged.
    pub async fn on_startup(&self) {
        info!("OutdatedArtifactsService startup initiated");

        if self.config.collect_on_startup {
            info!("Collecting available versions for all app artifacts on startup");
            let _ = self
                .get_available_versions_for_all_artifacts()
                .await
                .inspect_err(|e| error!("Failed to collect available versions: {}", e));
        } else {
            info!("Skipping collection of available versions on startup");
        }

        if self.config.refresh_on_startup {
            info!("Refreshing outdated artifacts on startup");
            let _ = self
                .refresh_all()
                .await
                .inspect_err(|e| error!("Failed to refresh outdated artifacts: {}", e));
        } else {
            info!("Skipping refresh of outdated artifacts on startup");
        }
    }

    /// Recompute the outdated set and upsert it into the store.
    ///
    /// Per-artifact failures are logged and skipped; only a failing app
    /// provider or store aborts the pass.
    pub async fn refresh_all(&self) -> Result<Vec<OutdatedArtifactInfo>, ServiceError> {
        let outdated = self.compute_outdated().await?;

        self.store.save_all(&outdated)?;
        let _ = self
            .store
            .purge_expired(self.clock.now())
            .inspect(|removed| {
                if *removed > 0 {
                    debug!("Purged {} expired outdated artifact records", removed);
                }
            })
            .inspect_err(|e| warn!("Failed to purge expired records: {}", e));

        Ok(outdated)
    }

    /// Cached outdated artifacts, refreshed synchronously when the cache is
    /// empty or its newest record is older than the validity window.
    pub async fn get_outdated_artifacts(&self) -> Result<Vec<OutdatedArtifactInfo>, ServiceError> {
        let now = self.clock.now();
        let cached = self.store.find_all(now)?;

        let latest = cached.iter().map(|info| info.last_updated).max();
        let needs_refresh = latest.is_none_or(|latest| now - latest > self.validity_window());

        if needs_refresh {
            debug!("Outdated artifact cache is empty or stale, refreshing");
            return self.refresh_all().await;
        }

        Ok(cached)
    }

    /// Available versions of every artifact of every app revision, keyed by
    /// `appName::artifactType::source`.
    ///
    /// A failing fetch is reported under `<key>::ERROR` with the error message
    /// as the sole entry. Artifacts no fetcher supports are left out.
    pub async fn get_available_versions_for_all_artifacts(
        &self,
    ) -> Result<IndexMap<String, Vec<String>>, ProviderError> {
        let started = Instant::now();
        let apps = self.provider.get_all_apps()?;
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));

        let mut handles = Vec::new();
        for app in &apps {
            for artifact in app.all_artifacts() {
                let Some(fetcher) = self.fetchers.select(artifact) else {
                    debug!("No fetcher supports {}, skipping", artifact.identity);
                    continue;
                };

                let key = format!("{}::{}::{}", app.name, artifact.artifact_type, artifact.source);
                let artifact = app.resolve_artifact(artifact);
                let semaphore = semaphore.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let result = fetcher.fetch_all_versions(&artifact).await;
                    (key, artifact.source, result)
                }));
            }
        }

        let mut available = IndexMap::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((key, _, Ok(versions))) => {
                    available.insert(key, versions);
                }
                Ok((key, source, Err(e))) => {
                    error!("Error fetching versions for artifact {}: {}", source, e);
                    available.insert(format!("{}{}", key, ERROR_KEY_SUFFIX), vec![e.to_string()]);
                }
                Err(e) => error!("Available versions task panicked: {}", e),
            }
        }
        available.sort_keys();

        info!(
            "Collected available versions in {} ms, {} entries",
            started.elapsed().as_millis(),
            available.len()
        );
        Ok(available)
    }

    /// Every artifact recorded during refresh passes; empty when the store fails
    pub fn get_all_artifacts(&self) -> Vec<AppArtifact> {
        self.store
            .find_artifacts()
            .inspect_err(|e| warn!("Failed to fetch artifacts: {}", e))
            .unwrap_or_default()
    }

    /// Best-effort record of a tracked artifact
    pub fn save_artifact(&self, artifact: &AppArtifact) {
        let _ = self
            .store
            .save_artifact(artifact)
            .inspect_err(|e| warn!("Failed to save artifact {}: {}", artifact.source, e));
    }

    /// One pass over every current app revision, without touching the result store
    async fn compute_outdated(&self) -> Result<Vec<OutdatedArtifactInfo>, ProviderError> {
        let started = Instant::now();
        let apps = self.provider.get_all_apps()?;
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));

        let mut handles = Vec::new();
        for app in apps.into_iter().map(Arc::new) {
            let artifacts: Vec<AppArtifact> = app
                .current_version
                .artifacts
                .iter()
                .map(|artifact| app.resolve_artifact(artifact))
                .collect();
            for artifact in artifacts {
                let service = self.clone();
                let app = app.clone();
                let semaphore = semaphore.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let result = service.process_artifact(&app, &artifact).await;
                    (artifact.source, result)
                }));
            }
        }

        let outdated: Vec<OutdatedArtifactInfo> = join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok((_, Ok(info))) => info,
                Ok((source, Err(e))) => {
                    error!("Error processing artifact {}: {}", source, e);
                    None
                }
                Err(e) => {
                    error!("Artifact task panicked: {}", e);
                    None
                }
            })
            .collect();

        info!(
            "Outdated artifact pass completed in {} ms, found {} outdated artifacts",
            started.elapsed().as_millis(),
            outdated.len()
        );
        Ok(outdated)
    }

    /// Fetch and compare one artifact; `Ok(None)` when it is up to date or
    /// cannot be compared.
    async fn process_artifact(
        &self,
        app: &App,
        artifact: &AppArtifact,
    ) -> Result<Option<OutdatedArtifactInfo>, FetchError> {
        self.save_artifact(artifact);

        let app_version = &app.current_version;
        let Some(current_version) = determine_current_version(artifact, app_version) else {
            debug!(
                "Could not determine current version for {} ({}) in app {}, skipping",
                artifact.source, artifact.artifact_type, app.name
            );
            return Ok(None);
        };

        let Some(fetcher) = self.fetchers.select(artifact) else {
            debug!("No fetcher supports {}, skipping", artifact.identity);
            return Ok(None);
        };

        debug!("Fetching versions for {} with {}", artifact.source, fetcher.name());
        let available_versions = fetcher.fetch_all_versions(artifact).await?;
        let analysis = analyze(&current_version, &available_versions);

        if !analysis.is_outdated {
            return Ok(None);
        }

        Ok(Some(OutdatedArtifactInfo::new(
            app,
            app_version,
            artifact,
            analysis,
            available_versions,
            self.clock.now(),
            self.time_to_live(),
        )))
    }

    /// Run `refresh_all` every `interval_ms` until the handle is stopped
    pub fn spawn_scheduled_refresh(&self) -> RefreshTaskHandle {
        let service = self.clone();
        let interval = Duration::from_millis(self.config.interval_ms);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                interval_ms = interval.as_millis() as u64,
                "Scheduled refresh started"
            );

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = service.refresh_all().await {
                            error!(error = %e, "Scheduled refresh failed");
                        }
                    }
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            info!("Scheduled refresh stopped");
                            break;
                        }
                    }
                }
            }
        });

        RefreshTaskHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

/// Handle to the fixed-delay refresh task
pub struct RefreshTaskHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshTaskHandle {
    /// Signal the task to stop after any pass in flight
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    /// Stop and wait for the task to exit
    pub async fn shutdown(self) {
        self.stop();
        let _ = self
            .task
            .await
            .inspect_err(|e| error!("Scheduled refresh task failed: {}", e));
    }
}
