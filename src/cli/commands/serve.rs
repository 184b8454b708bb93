//! Implementation of the `ideaflow serve` command.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::http::{AppState, PortalHttpConfig, PortalHttpServer};
use crate::adapters::sqlite::{
    initialize_database, SqliteCatalogRepository, SqliteExperimentRepository,
    SqliteIdentityProvider, SqliteParticipationRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::RngSampler;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{ExperimentService, ParticipationService};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind port
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, _json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    init_tracing(&config);

    let database_url = format!("sqlite:{}", config.database.path);
    let pool = initialize_database(&database_url, config.database.max_connections)
        .await
        .context("Failed to initialize database. Run 'ideaflow init' first.")?;

    let experiments = Arc::new(SqliteExperimentRepository::new(pool.clone()));
    let participations = Arc::new(SqliteParticipationRepository::new(pool.clone()));
    let catalog = Arc::new(SqliteCatalogRepository::new(pool.clone()));
    let identity = Arc::new(SqliteIdentityProvider::new(pool));

    let state = AppState {
        participation: ParticipationService::new(
            experiments.clone(),
            participations.clone(),
            catalog.clone(),
            Box::new(RngSampler::from_entropy()),
        ),
        experiments: ExperimentService::new(experiments, participations, catalog),
        identity,
    };

    let server_config = PortalHttpConfig {
        host: config.server.host.clone(),
        port: args.port.unwrap_or(config.server.port),
        enable_cors: config.server.enable_cors,
    };

    let server = PortalHttpServer::new(state, server_config);
    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("Portal server failed: {e}"))?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
