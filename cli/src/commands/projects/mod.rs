//! # Project Registry Commands (`projects`)
//!
//! File: cli/src/commands/projects/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Command-line access to the same registry the web management page edits:
//!
//! - `projects list`: downloadable projects (or every record with `--all`)
//! - `projects add <NAME> <PATH>`: register a project, with the same
//!   validation as `POST /add_project`
//! - `projects remove <NAME>`: unregister a project
//!
//! Every subcommand accepts `--projects-file` (or `QFIL_PROJECTS_FILE`) to
//! point at a registry other than the configured one.
//!
use crate::core::config::{self, Config};
use crate::core::error::Result;
use crate::projects::registry::ProjectRegistry;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

mod add;
mod list;
mod remove;

#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    command: ProjectsCommand,
}

#[derive(Subcommand, Debug)]
enum ProjectsCommand {
    /// List projects whose QFIL package is available for download.
    List(list::ListArgs),
    /// Register a project directory.
    Add(add::AddArgs),
    /// Unregister a project. Files on disk are not touched.
    Remove(remove::RemoveArgs),
}

/// Registry location shared by every `projects` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryArgs {
    /// JSON file holding the registered projects. Overrides the configuration files.
    #[arg(long, env = "QFIL_PROJECTS_FILE")]
    pub projects_file: Option<PathBuf>,
}

impl RegistryArgs {
    /// Loads the application configuration and opens the selected registry.
    fn open(&self) -> Result<(Config, ProjectRegistry)> {
        let mut cfg = config::load_config().context("Failed to load configuration")?;
        // Flag / environment beats both configuration files.
        if let Some(path) = &self.projects_file {
            cfg.projects_file = path.display().to_string();
        }
        debug!("Using projects file {}", cfg.projects_file);
        let registry = ProjectRegistry::new(&cfg.projects_file);
        Ok((cfg, registry))
    }
}

/// Dispatches `qfil-downloader projects <subcommand>`.
pub async fn handle_projects(args: ProjectsArgs) -> Result<()> {
    // The registry is small and local; plain blocking calls are fine here.
    match args.command {
        ProjectsCommand::List(args) => list::handle_list(args)?,
        ProjectsCommand::Add(args) => add::handle_add(args)?,
        ProjectsCommand::Remove(args) => remove::handle_remove(args)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommand_parsing() {
        let args = ProjectsArgs::try_parse_from([
            "projects",
            "add",
            "demo",
            "/srv/aosp/demo",
            "--description",
            "SM8550",
            "--projects-file",
            "/tmp/p.json",
        ])
        .expect("add should parse");
        match args.command {
            ProjectsCommand::Add(add) => {
                assert_eq!(add.name, "demo");
                assert_eq!(add.path, PathBuf::from("/srv/aosp/demo"));
                assert_eq!(add.description.as_deref(), Some("SM8550"));
                assert_eq!(add.registry.projects_file, Some(PathBuf::from("/tmp/p.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let args = ProjectsArgs::try_parse_from(["projects", "list", "--all"]).unwrap();
        assert!(matches!(args.command, ProjectsCommand::List(ref l) if l.all));

        assert!(ProjectsArgs::try_parse_from(["projects", "remove"]).is_err());
    }
}
