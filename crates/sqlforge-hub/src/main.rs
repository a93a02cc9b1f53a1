/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Hub binary - HTTP query service for sqlforge

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlforge_core::SqlxExecutor;
use sqlforge_hub::{DEFAULT_MAX_UPLOAD_BYTES, HubConfig, HubContext, server};

#[derive(Parser, Debug)]
#[command(name = "sqlforge-hub")]
#[command(about = "Render, run and stream sqlforge queries over HTTP")]
struct Args {
    /// Database URL (sqlite:, postgres:// or mysql://)
    #[arg(long, env = "SQLFORGE_DATABASE_URL")]
    database_url: String,

    /// Port to listen on
    #[arg(short = 'P', long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Directory of static files to serve
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Request body limit in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlforge_hub=info,sqlforge_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let executor = SqlxExecutor::connect(&args.database_url)
        .await
        .context("Failed to connect to the database")?;
    info!("Connected to database");

    let config = HubConfig {
        port: args.port,
        host: args.host,
        static_dir: args.static_dir,
        max_upload_bytes: args.max_upload_bytes,
    };

    let ctx = Arc::new(HubContext::new(Arc::new(executor.clone())));
    server::run_server(ctx, config).await?;

    executor.close().await;
    Ok(())
}
