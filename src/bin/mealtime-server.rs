// ABOUTME: Mealtime server binary
// ABOUTME: Loads config from the environment, migrates the store, and serves HTTP until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use mealtime_server::config::ServerConfig;
use mealtime_server::database_plugins::factory::Database;
use mealtime_server::database_plugins::DatabaseProvider;
use mealtime_server::events::ChannelPublisher;
use mealtime_server::logging::init_logging;
use mealtime_server::resources::ServerResources;
use mealtime_server::routes::build_router;

#[derive(Parser)]
#[command(
    name = "mealtime-server",
    about = "Mealtime meal-planning backend: users, OAuth2 clients, and request authentication"
)]
struct Args {
    /// Override the HTTP port from the environment
    #[arg(long)]
    port: Option<u16>,

    /// Override the credential store URL from the environment
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env().context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    init_logging(config.log_format)?;

    let database = Database::new(&config.database_url)
        .await
        .context("failed to open the credential store")?;
    database
        .migrate()
        .await
        .context("failed to run migrations")?;
    tracing::info!(backend = database.backend_name(), "credential store ready");

    let events = Arc::new(ChannelPublisher::new(256));
    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(database, events, config));
    let router = build_router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(port, "mealtime server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("mealtime server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
