//! # List Projects (`projects list`)
//!
//! File: cli/src/commands/projects/list.rs
//! Author: Christi Mahu
//!
//! Prints the projects the web interface would offer for download, with
//! their package size. `--all` prints every registry record instead,
//! including projects whose package directory is missing or empty.
//!
use super::RegistryArgs;
use crate::core::error::Result;
use crate::projects::discovery;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show every registered project, not only downloadable ones.
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// # Handle List (`handle_list`)
///
/// ## Errors
///
/// Returns an `Err` only if the configuration cannot be loaded; an unreadable
/// registry lists as empty.
pub fn handle_list(args: ListArgs) -> Result<()> {
    info!("Handling projects list (all: {})", args.all);
    let (cfg, registry) = args.registry.open()?;

    // Raw registry view, package present or not.
    if args.all {
        let records = registry.load();
        if records.is_empty() {
            println!("No projects registered in {}.", registry.path().display());
            return Ok(());
        }
        println!("{:<30} {:<12} PATH", "NAME", "PACKAGE");
        for record in records {
            let state = if cfg.package_dir(record.root()).is_dir() {
                "present"
            } else {
                "missing"
            };
            println!("{:<30} {:<12} {}", record.name, state, record.path);
        }
        return Ok(());
    }

    // Same selection as the download page.
    let projects = discovery::available_projects(&registry, &cfg);
    if projects.is_empty() {
        println!(
            "No downloadable projects. Register one with `qfil-downloader projects add <NAME> <PATH>`."
        );
        return Ok(());
    }
    println!("{:<30} {:>7} {:>10}  DESCRIPTION", "NAME", "FILES", "SIZE");
    for p in projects {
        println!(
            "{:<30} {:>7} {:>10}  {}",
            p.name, p.file_count, p.size_formatted, p.description
        );
    }
    Ok(())
}
