use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use httpbackup_api::{ApiServer, ApiState, parse_listen_addr};
use httpbackup_config::{Config, ConfigStore, default_config_path, default_log_path};
use httpbackup_events::{EventBus, control_channel};
use httpbackup_runner::{BackupRunner, RunnerSettings};
use httpbackup_telemetry::{GlobalContextGuard, LoggingConfig, Metrics, init_logging};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::orchestrator::Orchestrator;

/// Environment variable overriding the configuration document path.
pub const CONFIG_PATH_ENV: &str = "HTTPBACKUP_CONFIG";

/// Dependencies required to run the scheduler and the control API.
pub(crate) struct BootstrapDependencies {
    store: ConfigStore,
    config: Config,
    events: EventBus,
    metrics: Metrics,
    runner: BackupRunner,
}

impl BootstrapDependencies {
    /// Load (or create) the document at `path` and build the shared services.
    pub(crate) async fn load(path: PathBuf, settings: RunnerSettings) -> AppResult<Self> {
        let store =
            ConfigStore::new(path).map_err(|err| AppError::config("config_store.new", err))?;
        let config = store
            .load_or_create()
            .await
            .map_err(|err| AppError::config("config_store.load_or_create", err))?;
        info!(path = %store.path().display(), sites = config.sites.len(), "config loaded");

        let events = EventBus::new();
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let runner = BackupRunner::new(settings, events.clone(), metrics.clone())
            .map_err(|err| AppError::runner("runner.new", err))?;
        info!(max_parallel = settings.max_parallel, "download runner ready");

        Ok(Self {
            store,
            config,
            events,
            metrics,
            runner,
        })
    }
}

/// Entry point for the httpbackup boot sequence.
///
/// # Errors
///
/// Returns an error if logging, configuration or the control API cannot start.
pub async fn run_app() -> AppResult<()> {
    let logging = LoggingConfig {
        log_file: Some(default_log_path()),
        ..LoggingConfig::default()
    }
    .with_env_overrides();
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("httpbackup");
    info!(log_path = ?logging.log_file, "logging initialized");

    let path = config_path_from(std::env::var(CONFIG_PATH_ENV).ok().as_deref());
    let dependencies = BootstrapDependencies::load(path, RunnerSettings::from_env()).await?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Run the control API and the scheduler until `signal` resolves or the API fails.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    signal: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send,
{
    let BootstrapDependencies {
        store,
        config,
        events,
        metrics,
        runner,
    } = dependencies;

    let addr = parse_listen_addr(&config.web_listen_addr)
        .map_err(|err| AppError::api_server("api_server.listen_addr", err))?;
    let shutdown = CancellationToken::new();
    let (control, receiver) = control_channel();

    let api = ApiServer::new(ApiState::new(
        store.clone(),
        control,
        events.clone(),
        metrics.clone(),
    ));
    let mut api_task = tokio::spawn(api.serve(addr, shutdown.clone().cancelled_owned()));

    let orchestrator = Orchestrator::new(store, config, Arc::new(runner), events, metrics);
    let scheduler_task = tokio::spawn(orchestrator.run(receiver, shutdown.clone()));

    let early_exit = tokio::select! {
        () = signal => {
            info!("shutdown signal received");
            None
        }
        joined = &mut api_task => {
            error!("control api stopped; shutting down");
            Some(joined)
        }
    };

    shutdown.cancel();
    scheduler_task
        .await
        .map_err(|err| AppError::join("scheduler", err))?;

    let served = match early_exit {
        Some(joined) => joined,
        None => api_task.await,
    };
    served
        .map_err(|err| AppError::join("api_server", err))?
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("shutdown complete");
    Ok(())
}

/// `HTTPBACKUP_CONFIG` when set and non-blank, otherwise the platform default.
fn config_path_from(value: Option<&str>) -> PathBuf {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map_or_else(default_config_path, PathBuf::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use httpbackup_api::ApiServerError;
    use httpbackup_test_support::fixtures::ScratchRoot;

    async fn seeded(root: &ScratchRoot, listen: &str) -> anyhow::Result<BootstrapDependencies> {
        let path = root.path().join("config.json");
        let config = Config {
            web_listen_addr: listen.to_string(),
            interval_minutes: 0,
            backup_folder: root.path().join("backups"),
            sites: Vec::new(),
            ..Config::initial()
        };
        let _ = httpbackup_config::save(path.clone(), &config).await?;
        Ok(BootstrapDependencies::load(path, RunnerSettings::default()).await?)
    }

    #[test]
    fn config_path_prefers_non_blank_override() {
        assert_eq!(
            config_path_from(Some(" /etc/httpbackup.json ")),
            PathBuf::from("/etc/httpbackup.json")
        );
        assert_eq!(config_path_from(Some("  ")), default_config_path());
        assert_eq!(config_path_from(None), default_config_path());
    }

    #[tokio::test]
    async fn load_creates_missing_document() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let path = root.path().join("nested").join("config.json");
        let dependencies =
            BootstrapDependencies::load(path.clone(), RunnerSettings::default()).await?;
        assert!(path.exists());
        assert_eq!(dependencies.config, Config::initial().normalized());
        Ok(())
    }

    #[tokio::test]
    async fn app_stops_cleanly_on_signal() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let dependencies = seeded(&root, "127.0.0.1:0").await?;
        let signal = tokio::time::sleep(Duration::from_millis(50));
        tokio::time::timeout(Duration::from_secs(5), run_app_with(dependencies, signal))
            .await??;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_listen_address_fails_startup() -> anyhow::Result<()> {
        let root = ScratchRoot::new()?;
        let dependencies = seeded(&root, "not-an-address").await?;
        let result = run_app_with(dependencies, std::future::pending()).await;
        assert!(matches!(
            result,
            Err(AppError::ApiServer {
                source: ApiServerError::InvalidListenAddr { .. },
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn occupied_port_stops_the_app() -> anyhow::Result<()> {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = taken.local_addr()?;
        let root = ScratchRoot::new()?;
        let dependencies = seeded(&root, &addr.to_string()).await?;
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_app_with(dependencies, std::future::pending()),
        )
        .await?;
        assert!(matches!(
            result,
            Err(AppError::ApiServer {
                source: ApiServerError::Bind { .. },
                ..
            })
        ));
        Ok(())
    }
}
