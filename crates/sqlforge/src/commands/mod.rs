/*
 * commands/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Command implementations for the sqlforge CLI
//!
//! Each command module handles the CLI interface and delegates to
//! sqlforge-core (or sqlforge-hub) for the actual work.

pub mod apply;
pub mod extract;
pub mod serve;
pub mod version;
