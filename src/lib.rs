pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use services::Scheduler;
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Entry point after `main` has loaded the config and built the runtime.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.command == Some(Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("Wrote default config.toml");
        } else {
            println!("config.toml already exists");
        }
        return Ok(());
    }

    config.validate()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    init_tracing(&config)?;

    match Config::find_config_file() {
        Some(path) => info!("Config loaded from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    if prometheus_handle.is_some() {
        info!("Prometheus metrics recorder initialized");
    }

    execute(cli.command.unwrap_or(Commands::Serve), config, prometheus_handle).await
}

/// Runs one CLI command against an already validated config.
pub async fn execute(
    command: Commands,
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve => run_server(config, prometheus_handle).await,
        Commands::ForceReset => cmd_force_reset(config).await,
        Commands::Scrape => cmd_scrape(config).await,
        Commands::SyncIndex => cmd_sync_index(config).await,
        Commands::Init => Ok(()),
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "gosearch")?
            .extra_field("pid", std::process::id().to_string())?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("gosearch v{} starting...", env!("CARGO_PKG_VERSION"));

    let port = config.server.port;
    let scheduler_config = config.scheduler.clone();

    let shared = Arc::new(SharedState::new(config).await?);

    match shared.search_service.sync_index(&shared.store).await {
        Ok(indexed) => info!(indexed, "Startup index sync finished"),
        Err(e) => warn!(error = %e, "Startup index sync failed"),
    }

    let scheduler = Arc::new(Scheduler::new(Arc::clone(&shared), scheduler_config));
    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    let api_state = api::create_app_state(shared, prometheus_handle).await?;
    let app = api::router(api_state).await;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Web server error")?;

    scheduler.stop().await;
    if tokio::time::timeout(std::time::Duration::from_secs(5), scheduler_handle)
        .await
        .is_err()
    {
        warn!("Scheduler did not stop in time");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}

async fn cmd_force_reset(config: Config) -> anyhow::Result<()> {
    let store = db::Store::connect(&config.database).await?;
    let gate = services::ResetGate::new(store);
    gate.verify_schema().await?;

    let affected = gate.force_reset_all().await?;
    println!("{affected} user(s) must now reset their password");
    Ok(())
}

async fn cmd_scrape(config: Config) -> anyhow::Result<()> {
    let shared = SharedState::new(config).await?;
    let report = shared.scraper.run().await?;

    println!(
        "Terms: {}  skipped: {}  scraped: {}  failed: {}  new pages: {}",
        report.terms, report.skipped, report.scraped, report.failed, report.pages_added
    );
    Ok(())
}

async fn cmd_sync_index(config: Config) -> anyhow::Result<()> {
    let shared = SharedState::new(config).await?;
    let indexed = shared.search_service.sync_index(&shared.store).await?;

    println!(
        "Indexed {indexed} page(s) into the {} backend",
        shared.search_service.backend_name()
    );
    Ok(())
}
