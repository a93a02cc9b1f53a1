/*
 * commands/serve.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Serve command - run the HTTP query service

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlforge_core::SqlxExecutor;
use sqlforge_hub::{HubConfig, HubContext, server};
use tracing::info;

/// Arguments for the serve command.
#[derive(Debug)]
pub struct ServeArgs {
    pub port: u16,
    pub host: String,
    pub static_dir: Option<PathBuf>,
    pub database_url: String,
}

/// Execute the serve command.
///
/// Blocks until Ctrl+C.
pub fn execute(args: ServeArgs) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_serve(args))
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let executor = SqlxExecutor::connect(&args.database_url)
        .await
        .context("Failed to connect to the database")?;
    info!("Connected to database");

    let config = HubConfig {
        port: args.port,
        host: args.host,
        static_dir: args.static_dir,
        ..Default::default()
    };
    let ctx = Arc::new(HubContext::new(Arc::new(executor.clone())));
    server::run_server(ctx, config).await?;

    executor.close().await;
    Ok(())
}
