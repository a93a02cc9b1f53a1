/*
 * commands/extract.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Extract command - list what a template reads

use std::path::PathBuf;

use anyhow::{Context, Result};
use sqlforge_template::{FieldRef, FieldSet, extract_fields};

/// Arguments for the extract command.
#[derive(Debug)]
pub struct ExtractArgs {
    pub template: PathBuf,
    pub json: bool,
}

pub fn execute(args: ExtractArgs) -> Result<()> {
    let source = std::fs::read_to_string(&args.template)
        .with_context(|| format!("Failed to read SQL template {}", args.template.display()))?;
    let fields = extract_fields(&source)
        .with_context(|| format!("Failed to parse {}", args.template.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else {
        print!("{}", listing(&fields));
    }
    Ok(())
}

/// One reference per line: fields first, then variables.
fn listing(fields: &FieldSet) -> String {
    let mut out = String::new();
    for reference in fields {
        if let FieldRef::Field(path) = reference {
            out.push_str(path);
            out.push('\n');
        }
    }
    for reference in fields {
        if let FieldRef::Variable(name) = reference {
            out.push_str(name);
            out.push_str(" (variable)\n");
        }
    }
    out
}
