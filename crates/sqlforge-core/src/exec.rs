/*
 * exec.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Query execution.
//!
//! The pipeline only sees the [`QueryExecutor`] trait. [`SqlxExecutor`]
//! implements it over an `sqlx` Any pool, so the same binary can talk to
//! SQLite, PostgreSQL or MySQL depending on the connection URL.

use async_trait::async_trait;
use sqlforge_tabular::Row;
use sqlx::any::{AnyPoolOptions, AnyRow, install_default_drivers};
use sqlx::{AnyPool, Column as _, Row as _, ValueRef as _};

use crate::error::Result;

/// Runs rendered SQL and returns every result row as column name to cell text.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>>;
}

impl std::fmt::Debug for dyn QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QueryExecutor")
    }
}

/// [`QueryExecutor`] backed by an `sqlx::AnyPool`.
#[derive(Debug, Clone)]
pub struct SqlxExecutor {
    pool: AnyPool,
}

impl SqlxExecutor {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// Connect to `url` (`sqlite:`, `postgres://` or `mysql://`).
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, Self::DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn connect_with(url: &str, max_connections: u32) -> Result<Self> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QueryExecutor for SqlxExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        let records = sqlx::query(sql).fetch_all(&self.pool).await?;
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            rows.push(to_row(record)?);
        }
        Ok(rows)
    }
}

fn to_row(record: &AnyRow) -> std::result::Result<Row, sqlx::Error> {
    let mut row = Row::new();
    for column in record.columns() {
        let index = column.ordinal();
        row.insert(column.name(), cell_text(record, index)?);
    }
    Ok(row)
}

/// NULL is the empty string; blobs are read as lossy UTF-8.
fn cell_text(record: &AnyRow, index: usize) -> std::result::Result<String, sqlx::Error> {
    if record.try_get_raw(index)?.is_null() {
        return Ok(String::new());
    }
    if let Ok(text) = record.try_get::<String, _>(index) {
        return Ok(text);
    }
    if let Ok(n) = record.try_get::<i64, _>(index) {
        return Ok(n.to_string());
    }
    if let Ok(n) = record.try_get::<i32, _>(index) {
        return Ok(n.to_string());
    }
    if let Ok(n) = record.try_get::<i16, _>(index) {
        return Ok(n.to_string());
    }
    if let Ok(x) = record.try_get::<f64, _>(index) {
        return Ok(x.to_string());
    }
    if let Ok(x) = record.try_get::<f32, _>(index) {
        return Ok(x.to_string());
    }
    if let Ok(b) = record.try_get::<bool, _>(index) {
        return Ok(b.to_string());
    }
    let bytes: Vec<u8> = record.try_get(index)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
