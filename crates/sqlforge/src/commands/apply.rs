/*
 * commands/apply.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Apply command - render a template, run it, write the results

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use sqlforge_core::{Pipeline, RunOptions, SqlxExecutor};
use sqlforge_tabular::{HeaderCase, WriteMode};
use tracing::info;

/// Arguments for the apply command.
#[derive(Debug, Default)]
pub struct ApplyArgs {
    pub template: PathBuf,
    pub input: Option<PathBuf>,
    pub output: Option<String>,
    pub sheet_index_in: Option<usize>,
    pub sheet_name_in: Option<String>,
    pub sheet: Option<String>,
    pub append: bool,
    pub header_case: Option<HeaderCase>,
    pub dry_run: bool,
    pub database_url: Option<String>,
    pub config: Option<PathBuf>,
}

impl ApplyArgs {
    /// Config file values with explicit flags layered on top.
    fn run_options(&self) -> Result<RunOptions> {
        let mut options = match &self.config {
            Some(path) => RunOptions::from_path(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => RunOptions::default(),
        };
        if let Some(index) = self.sheet_index_in {
            options.sheet_index_in = index;
        }
        if self.sheet_name_in.is_some() {
            options.sheet_name_in = self.sheet_name_in.clone();
        }
        if self.header_case.is_some() {
            options.header_case = self.header_case;
        }
        if self.output.is_some() {
            options.output = self.output.clone();
        }
        if self.sheet.is_some() {
            options.sheet = self.sheet.clone();
        }
        if self.append {
            options.mode = WriteMode::Append;
        }
        Ok(options)
    }
}

/// Execute the apply command.
pub fn execute(args: ApplyArgs) -> Result<()> {
    let template = std::fs::read_to_string(&args.template)
        .with_context(|| format!("Failed to read SQL template {}", args.template.display()))?;
    let options = args.run_options()?;
    let pipeline = Pipeline::new();

    if args.dry_run {
        let input = pipeline
            .load_input(args.input.as_deref(), &options)
            .context("Failed to load input data")?;
        let query = pipeline
            .render(&template, &input)
            .context("Failed to render SQL query with input data")?;
        println!("{query}");
        return Ok(());
    }

    let Some(database_url) = args.database_url.as_deref() else {
        bail!("No database URL; pass --database-url or set SQLFORGE_DATABASE_URL");
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let executor = SqlxExecutor::connect(database_url)
            .await
            .context("Failed to connect to the database")?;
        let result = pipeline
            .run(&executor, &template, args.input.as_deref(), &options)
            .await;
        executor.close().await;

        let summary = result?;
        info!(rows = summary.rows, generator = %summary.generator, "Done!");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("run.yaml");
        std::fs::write(
            &config,
            "sheet-name-in: FromConfig\nsheet-index-in: 3\noutput: config.csv\nsheet: Keep\n",
        )
        .unwrap();

        let args = ApplyArgs {
            output: Some("flag.xlsx".to_string()),
            sheet_index_in: Some(1),
            append: true,
            config: Some(config),
            ..Default::default()
        };
        let options = args.run_options().unwrap();

        assert_eq!(options.output.as_deref(), Some("flag.xlsx"));
        assert_eq!(options.sheet_index_in, 1);
        assert_eq!(options.sheet_name_in.as_deref(), Some("FromConfig"));
        assert_eq!(options.sheet.as_deref(), Some("Keep"));
        assert_eq!(options.mode, WriteMode::Append);
    }

    #[test]
    fn test_no_config() {
        let options = ApplyArgs::default().run_options().unwrap();
        assert_eq!(options, RunOptions::default());
    }

    #[test]
    fn test_dry_run_needs_no_database() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("q.sql");
        std::fs::write(&template, "SELECT {{ len .Rows }}").unwrap();

        let args = ApplyArgs {
            template,
            dry_run: true,
            ..Default::default()
        };
        execute(args).unwrap();
    }

    #[test]
    fn test_missing_database_url() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("q.sql");
        std::fs::write(&template, "SELECT 1").unwrap();

        let args = ApplyArgs {
            template,
            ..Default::default()
        };
        let err = execute(args).unwrap_err();
        assert!(err.to_string().contains("SQLFORGE_DATABASE_URL"));
    }

    #[test]
    fn test_apply_against_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("q.sql");
        let output = dir.path().join("out.csv");
        std::fs::write(&template, "SELECT 1 AS one").unwrap();

        let db = dir.path().join("test.db");
        let args = ApplyArgs {
            template,
            output: Some(output.display().to_string()),
            database_url: Some(format!("sqlite://{}?mode=rwc", db.display())),
            ..Default::default()
        };
        execute(args).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "one\n1\n");
    }
}
