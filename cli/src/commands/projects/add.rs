//! # Add Project (`projects add`)
//!
//! File: cli/src/commands/projects/add.rs
//! Author: Christi Mahu
//!
//! Registers a project from the command line. The path is made absolute
//! against the current directory; everything else goes through
//! `projects::add_project`, exactly like the web form.
//!
use super::RegistryArgs;
use crate::core::error::Result;
use crate::projects::{self, NewProject};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Project name (letters, digits, `_`, `-`, `.`).
    pub name: String,

    /// Project root; must contain the QFIL package directory.
    pub path: PathBuf,

    /// Free-form description shown on the download page.
    #[arg(long, short)]
    pub description: Option<String>,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// # Handle Add (`handle_add`)
///
/// ## Errors
///
/// Same rejections as `POST /add_project` (missing fields, bad name, no
/// package directory, duplicate), plus configuration and registry errors.
pub fn handle_add(args: AddArgs) -> Result<()> {
    debug!("Add args: {:?}", args);
    let (cfg, registry) = args.registry.open()?;

    // The server may run from another directory; store absolute paths only.
    let path = if args.path.is_absolute() {
        args.path
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(args.path)
    };

    let record = projects::add_project(
        &registry,
        &cfg,
        NewProject {
            name: args.name,
            path: path.display().to_string(),
            description: args.description,
        },
    )?;
    println!(
        "✅ Project '{}' added ({}).",
        record.name,
        cfg.package_dir(record.root()).display()
    );
    Ok(())
}
