/*
 * server.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! HTTP server setup and routing

use std::future::IntoFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::Serialize;
use sqlforge_core::{Error as CoreError, LoadedInput, RunOptions, spawn_generation};
use sqlforge_tabular::Generator;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::context::{HubConfig, SharedContext};
use crate::error::{Error, Result};

/// How long open connections get to finish after a shutdown signal.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Parts of a `POST /api/query` request.
#[derive(Debug, Default)]
struct QueryForm {
    template: Option<String>,
    values: Option<(String, Vec<u8>)>,
    config: Option<String>,
}

impl QueryForm {
    async fn read(multipart: &mut Multipart) -> Result<Self> {
        let mut form = QueryForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("sql_file") => {
                    let bytes = field.bytes().await?;
                    let text =
                        String::from_utf8(bytes.to_vec()).map_err(|_| Error::TemplateEncoding)?;
                    form.template = Some(text);
                }
                Some("values_file") => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.values = Some((filename, bytes.to_vec()));
                }
                Some("config") => {
                    let bytes = field.bytes().await?;
                    let text =
                        String::from_utf8(bytes.to_vec()).map_err(|_| Error::ConfigEncoding)?;
                    form.config = Some(text);
                }
                other => {
                    warn!(field = ?other, "Ignoring unknown multipart field");
                }
            }
        }
        Ok(form)
    }
}

/// Render, execute and stream the result of one query.
async fn run_query(State(ctx): State<SharedContext>, mut multipart: Multipart) -> Result<Response> {
    let form = QueryForm::read(&mut multipart).await?;
    let template = form.template.ok_or(Error::MissingTemplate)?;
    let options = match form.config.as_deref() {
        Some(text) => RunOptions::parse(text)?,
        None => RunOptions::default(),
    };

    let pipeline = ctx.pipeline();
    let input = match &form.values {
        Some((filename, bytes)) => pipeline.load_upload(filename, bytes, &options)?,
        None => LoadedInput::default(),
    };
    // Only the extension of `output` matters here; nothing is written to disk.
    let generator: Arc<dyn Generator> = Arc::from(
        pipeline
            .generators()
            .for_destination(options.output_path(), &options.generate_options())?,
    );
    let query = pipeline.render(&template, &input)?;
    let rows = pipeline.execute(ctx.executor(), &query).await?;

    if rows.is_empty() && !generator.allows_empty() {
        return Err(CoreError::EmptyInput.into());
    }

    info!(generator = generator.name(), rows = rows.len(), "Streaming result");
    let content_type = generator.content_type().to_string();
    let token = CancellationToken::new();
    let (reader, task) = spawn_generation(generator, rows, token.clone());

    // Generation failures end the body with an error instead of a clean EOF.
    let completion = futures::stream::once(async move {
        let outcome: Option<io::Result<Bytes>> = match task.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                error!(error = %err, "Generation failed");
                Some(Err(io::Error::other(err)))
            }
            Err(err) => Some(Err(io::Error::other(err))),
        };
        outcome
    })
    .filter_map(futures::future::ready);

    // Dropping the body (client gone) cancels generation.
    let guard = token.drop_guard();
    let stream = ReaderStream::new(reader).chain(completion).map(move |chunk| {
        let _guard = &guard;
        chunk
    });

    Ok(([(header::CONTENT_TYPE, content_type)], Body::from_stream(stream)).into_response())
}

pub fn build_router(ctx: SharedContext, config: &HubConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/query", post(run_query))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let router = match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    router.layer(TraceLayer::new_for_http()).with_state(ctx)
}

pub async fn run_server(ctx: SharedContext, config: HubConfig) -> Result<()> {
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        wait_for_ctrl_c().await;
        signal.cancel();
    });
    run_server_until(ctx, config, shutdown).await
}

/// Serve until `shutdown` is cancelled, then allow [`SHUTDOWN_TIMEOUT`] for
/// open connections.
pub async fn run_server_until(
    ctx: SharedContext,
    config: HubConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = build_router(ctx, &config);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Hub server listening");

    let serve = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();

    tokio::select! {
        result = serve => result.map_err(|e| Error::Server(e.to_string()))?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
        } => {
            warn!("Graceful shutdown timed out; closing open connections");
        }
    }

    info!("Hub server stopped");
    Ok(())
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => {
            error!(error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
