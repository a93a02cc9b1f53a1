/*
 * commands/version.rs
 * Copyright (c) 2025 Posit, PBC
 */

use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("sqlforge {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
