use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use kube_app_version::apps::provider::{AppProvider, JsonFileAppProvider, StaticAppProvider};
use kube_app_version::config::{self, Config, StoreKind};
use kube_app_version::logging::init_logging;
use kube_app_version::outdated::clock::SystemClock;
use kube_app_version::outdated::service::OutdatedArtifactsService;
use kube_app_version::outdated::store::{MemoryStore, OutdatedArtifactStore, SqliteStore};
use kube_app_version::version::fetchers::github_oci::token_from_env;
use kube_app_version::version::fetchers::{build_http_client, default_fetchers};

#[derive(Parser)]
#[command(name = "kube-app-version")]
#[command(version, about = "Detects deployed artifacts that lag behind their registries")]
struct Cli {
    /// JSON export of deployed apps
    #[arg(long, global = true)]
    apps: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List outdated artifacts, refreshing when the cached set is stale
    Outdated,
    /// List the available versions of every tracked artifact
    Available,
    /// List artifacts recorded by earlier refresh passes
    Artifacts,
    /// Run the startup hooks and the scheduled refresh until Ctrl-C
    Watch,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?;
    let _guard = init_logging(&config::log_path())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, config))
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    if cli.apps.is_none() && !matches!(cli.command, Command::Artifacts) {
        anyhow::bail!("--apps <FILE> is required");
    }
    let service = build_service(cli.apps.as_deref(), &config)?;

    match cli.command {
        Command::Outdated => print_json(&service.get_outdated_artifacts().await?),
        Command::Available => print_json(&service.get_available_versions_for_all_artifacts().await?),
        Command::Artifacts => print_json(&service.get_all_artifacts()),
        Command::Watch => {
            service.on_startup().await;
            let handle = service.spawn_scheduled_refresh();

            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested");
            handle.shutdown().await;
            Ok(())
        }
    }
}

fn build_service(apps: Option<&Path>, config: &Config) -> anyhow::Result<OutdatedArtifactsService> {
    let provider: Arc<dyn AppProvider> = match apps {
        Some(path) => Arc::new(JsonFileAppProvider::new(path)),
        None => Arc::new(StaticAppProvider::default()),
    };

    let client = build_http_client(&config.http)?;
    let fetchers = default_fetchers(client, &config.fetch_cache, token_from_env());

    let store: Arc<dyn OutdatedArtifactStore> = match config.store.kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Sqlite => {
            let path = config.store.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteStore::open(&path)?)
        }
    };

    Ok(OutdatedArtifactsService::new(
        provider,
        fetchers,
        store,
        Arc::new(SystemClock),
        config.outdated_artifacts.clone(),
    ))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
