/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! One-shot query runs: load input, render, execute, generate.
//!
//! This is the only place in the library that logs. Everything it calls
//! returns errors and leaves reporting to the caller.

use std::path::Path;

use sqlforge_tabular::{GeneratorRegistry, HeaderCase, LoaderRegistry, Row};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::exec::QueryExecutor;
use crate::options::RunOptions;
use crate::query_data::QueryData;
use crate::render::QueryRenderer;

/// Input rows plus how their headers were normalized.
#[derive(Debug, Clone, Default)]
pub struct LoadedInput {
    pub data: QueryData,
    pub camel_cased: bool,
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub query: String,
    pub rows: usize,
    pub generator: String,
}

/// Loader and generator registries plus the steps that use them.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    loaders: LoaderRegistry,
    generators: GeneratorRegistry,
}

impl Pipeline {
    /// Pipeline with the built-in CSV and XLSX formats.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registries(loaders: LoaderRegistry, generators: GeneratorRegistry) -> Self {
        Self {
            loaders,
            generators,
        }
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Load an input file from disk. No input means no rows.
    pub fn load_input(&self, input: Option<&Path>, options: &RunOptions) -> Result<LoadedInput> {
        let Some(path) = input else {
            return Ok(LoadedInput::default());
        };
        let loader = self.loaders.for_path(path)?;
        let bytes = std::fs::read(path)?;
        let dataset = loader.load_bytes(&bytes, &options.load_options())?;
        let case = options
            .header_case
            .unwrap_or_else(|| loader.default_header_case());
        info!(input = %path.display(), rows = dataset.len(), "Loaded input");
        Ok(finish_load(dataset, case))
    }

    /// Load uploaded bytes; `filename` selects the format.
    pub fn load_upload(&self, filename: &str, bytes: &[u8], options: &RunOptions) -> Result<LoadedInput> {
        let loader = self.loaders.for_path(Path::new(filename))?;
        let dataset = loader.load_bytes(bytes, &options.load_options())?;
        let case = options
            .header_case
            .unwrap_or_else(|| loader.default_header_case());
        info!(input = filename, rows = dataset.len(), "Loaded upload");
        Ok(finish_load(dataset, case))
    }

    /// Render a template against loaded input.
    pub fn render(&self, template_text: &str, input: &LoadedInput) -> Result<String> {
        let query = QueryRenderer::new()
            .with_camel_cased_headers(input.camel_cased)
            .render(template_text, &input.data)?;
        debug!(%query, "Rendered query");
        Ok(query)
    }

    /// Execute a rendered query.
    pub async fn execute(&self, executor: &dyn QueryExecutor, query: &str) -> Result<Vec<Row>> {
        let rows = executor.execute(query).await?;
        info!(rows = rows.len(), "Query returned");
        Ok(rows)
    }

    /// Load, render, execute and write results where `options.output` says.
    pub async fn run(
        &self,
        executor: &dyn QueryExecutor,
        template_text: &str,
        input: Option<&Path>,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let loaded = self.load_input(input, options)?;
        // The destination is checked before anything reaches the database.
        let generator = self
            .generators
            .for_destination(options.output_path(), &options.generate_options())?;
        let query = self.render(template_text, &loaded)?;
        let rows = self.execute(executor, &query).await?;

        let name = generator.name().to_string();
        let count = rows.len();

        tokio::task::spawn_blocking(move || generator.generate(&rows))
            .await
            .map_err(|err| Error::Io(std::io::Error::other(err)))??;

        info!(generator = %name, rows = count, "Wrote results");
        Ok(RunSummary {
            query,
            rows: count,
            generator: name,
        })
    }
}

fn finish_load(dataset: sqlforge_tabular::Dataset, case: HeaderCase) -> LoadedInput {
    if let Some(note) = dataset.truncation() {
        warn!(%note, "Input truncated");
    }
    LoadedInput {
        data: QueryData::from(dataset),
        camel_cased: case == HeaderCase::LowerCamel,
    }
}
