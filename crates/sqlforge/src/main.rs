/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! sqlforge CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlforge_tabular::HeaderCase;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sqlforge")]
#[command(version)]
#[command(about = "Render SQL templates against tabular data, run them and export the results", long_about = None)]
struct Cli {
    /// Log level or filter directive (e.g. debug, sqlforge_core=trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a query template, run it and write the results
    Apply {
        /// Query template file
        template: PathBuf,

        /// CSV or XLSX file to take row values from
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Result file (.csv or .xlsx); prints a table when omitted
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Input sheet index, zero based (xlsx input only)
        #[arg(short = 's', long)]
        sheet_index_in: Option<usize>,

        /// Input sheet name, wins over --sheet-index-in (xlsx input only)
        #[arg(short = 'S', long)]
        sheet_name_in: Option<String>,

        /// Output sheet name (xlsx output only)
        #[arg(long)]
        sheet: Option<String>,

        /// Append below existing rows instead of replacing the sheet
        #[arg(long)]
        append: bool,

        /// Input header normalization: verbatim or lower-camel
        #[arg(long)]
        header_case: Option<HeaderCase>,

        /// Print the rendered query without running it
        #[arg(long)]
        dry_run: bool,

        /// Database URL (sqlite:, postgres:// or mysql://)
        #[arg(long, env = "SQLFORGE_DATABASE_URL")]
        database_url: Option<String>,

        /// YAML or JSON file with run options; flags take precedence
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },

    /// List the fields and variables a template references
    Extract {
        /// Query template file
        template: PathBuf,

        /// Print JSON instead of one reference per line
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP query service
    Serve {
        /// Port to listen on
        #[arg(short = 'P', long, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Directory of static files to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Database URL (sqlite:, postgres:// or mysql://)
        #[arg(long, env = "SQLFORGE_DATABASE_URL")]
        database_url: String,
    },

    /// Print the version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "sqlforge=info,sqlforge_core=info,sqlforge_hub=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Apply {
            template,
            input,
            output,
            sheet_index_in,
            sheet_name_in,
            sheet,
            append,
            header_case,
            dry_run,
            database_url,
            config,
        } => commands::apply::execute(commands::apply::ApplyArgs {
            template,
            input,
            output,
            sheet_index_in,
            sheet_name_in,
            sheet,
            append,
            header_case,
            dry_run,
            database_url,
            config,
        }),
        Commands::Extract { template, json } => {
            commands::extract::execute(commands::extract::ExtractArgs { template, json })
        }
        Commands::Serve {
            port,
            host,
            static_dir,
            database_url,
        } => commands::serve::execute(commands::serve::ServeArgs {
            port,
            host,
            static_dir,
            database_url,
        }),
        Commands::Version => commands::version::execute(),
    }
}
