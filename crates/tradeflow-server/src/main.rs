// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tradeflow server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradeflow_server::{create_app_state, create_router, version};
use tradeflow_server_config::LogFormat;

/// Tradeflow server - role-based access control and audit logging.
#[derive(Parser, Debug)]
#[command(name = "tradeflow-server", about = "Tradeflow authorization server", version)]
struct Args {
	/// Config file to load instead of /etc/tradeflow/server.toml
	#[arg(long, env = "TRADEFLOW_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => tradeflow_server_config::load_config_with_file(path)?,
		None => tradeflow_server_config::load_config()?,
	};

	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	match config.logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting tradeflow-server"
	);

	let pool = tradeflow_server_db::create_pool(&config.database.url, config.database.max_connections)
		.await
		.context("failed to open database")?;
	tradeflow_server_db::run_migrations(&pool)
		.await
		.context("failed to run migrations")?;

	let state = create_app_state(pool, &config)?;
	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	tracing::info!("listening on {}", addr);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.with_graceful_shutdown(async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for shutdown signal");
		}
		tracing::info!("Received shutdown signal");
	})
	.await?;

	tracing::info!("Server shutdown complete");
	Ok(())
}
