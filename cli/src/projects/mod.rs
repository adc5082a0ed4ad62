//! # Project Management (`projects`)
//!
//! File: cli/src/projects/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Everything about registered projects, shared by the HTTP handlers and the
//! `projects` CLI commands:
//!
//! - `registry`: the JSON file of `ProjectRecord`s.
//! - `validation`: project name rules.
//! - `discovery`: which projects have a downloadable package, and their files.
//! - `browse`: folder picker backing `/browse_folders`.
//!
//! This module also owns the two mutating operations, `add_project` and
//! `remove_project`, so the web form and the CLI enforce identical rules.
//!
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use std::path::Path;
use tracing::info;

pub mod browse;
pub mod discovery;
pub mod registry;
pub mod validation;

use registry::{ProjectRecord, ProjectRegistry};

/// Fields supplied when registering a project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub path: String,
    pub description: Option<String>,
}

/// # Register a Project (`add_project`)
///
/// Checks, in order: required fields, the name rules, that the package
/// directory exists under `path`, and that the name is not taken. On success
/// the record is appended to the registry and returned.
///
/// ## Errors
///
/// `MissingFields`, `InvalidProjectName`, `PackageDirMissing`,
/// `DuplicateProject` (all 400-class), or `Registry` if saving fails.
pub fn add_project(
    registry: &ProjectRegistry,
    config: &Config,
    new: NewProject,
) -> Result<ProjectRecord> {
    // Form fields arrive with stray whitespace more often than not.
    let name = new.name.trim();
    let path = new.path.trim();
    if name.is_empty() || path.is_empty() {
        return Err(AppError::MissingFields.into());
    }
    validation::validate_project_name(name)?;

    // Only roots that already contain the package layout can be registered.
    let package_dir = config.package_dir(Path::new(path));
    if !package_dir.is_dir() {
        return Err(AppError::PackageDirMissing {
            path: package_dir.display().to_string(),
        }
        .into());
    }

    let record = ProjectRecord {
        name: name.to_string(),
        path: path.to_string(),
        description: new.description.unwrap_or_default().trim().to_string(),
        added_date: Some(chrono::Local::now().naive_local()),
    };
    // The duplicate check runs under the registry lock, against fresh data.
    let added = registry.update(|projects| {
        if projects.iter().any(|p| p.name == record.name) {
            return Err(AppError::DuplicateProject {
                name: record.name.clone(),
            }
            .into());
        }
        projects.push(record.clone());
        Ok(record)
    })?;
    info!("Registered project '{}' at {}", added.name, added.path);
    Ok(added)
}

/// Removes every record named `name`. Returns whether anything was removed;
/// unknown names are not an error.
pub fn remove_project(registry: &ProjectRegistry, name: &str) -> Result<bool> {
    let removed = registry.update(|projects| {
        let before = projects.len();
        projects.retain(|p| p.name != name); // Drops duplicates from hand-edited files too.
        Ok(projects.len() != before)
    })?;
    if removed {
        info!("Removed project '{}'", name);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, ProjectRegistry, Config) {
        let work = tempdir().unwrap();
        let registry = ProjectRegistry::new(work.path().join("projects.json"));
        (work, registry, Config::default())
    }

    fn new_project(name: &str, path: &Path) -> NewProject {
        NewProject {
            name: name.to_string(),
            path: path.display().to_string(),
            description: Some("  eMMC build ".to_string()),
        }
    }

    fn app_error(err: &anyhow::Error) -> &AppError {
        err.downcast_ref::<AppError>().expect("expected an AppError")
    }

    #[test]
    fn test_add_project_success() -> Result<()> {
        let (work, registry, config) = setup();
        let root = work.path().join("demo");
        fs::create_dir_all(config.package_dir(&root))?;

        let added = add_project(&registry, &config, new_project("demo", &root))?;
        assert_eq!(added.name, "demo");
        assert_eq!(added.description, "eMMC build");
        assert!(added.added_date.is_some());
        assert_eq!(registry.load(), vec![added]);
        Ok(())
    }

    #[test]
    fn test_add_project_requires_fields() {
        let (_work, registry, config) = setup();
        let err = add_project(&registry, &config, NewProject::default()).unwrap_err();
        assert!(matches!(app_error(&err), AppError::MissingFields));
    }

    #[test]
    fn test_add_project_rejects_missing_package_dir() {
        let (work, registry, config) = setup();
        let err = add_project(&registry, &config, new_project("demo", work.path())).unwrap_err();
        assert!(matches!(app_error(&err), AppError::PackageDirMissing { .. }));
        assert!(registry.load().is_empty());
    }

    #[test]
    fn test_add_project_rejects_bad_name_and_duplicates() -> Result<()> {
        let (work, registry, config) = setup();
        let root = work.path().join("demo");
        fs::create_dir_all(config.package_dir(&root))?;

        let err = add_project(&registry, &config, new_project("../etc/passwd", &root)).unwrap_err();
        assert!(matches!(app_error(&err), AppError::InvalidProjectName(_)));

        add_project(&registry, &config, new_project("demo", &root))?;
        let err = add_project(&registry, &config, new_project("demo", &root)).unwrap_err();
        assert!(matches!(app_error(&err), AppError::DuplicateProject { .. }));
        assert_eq!(registry.load().len(), 1);
        Ok(())
    }

    #[test]
    fn test_remove_project_is_idempotent() -> Result<()> {
        let (work, registry, config) = setup();
        let root = work.path().join("demo");
        fs::create_dir_all(config.package_dir(&root))?;
        add_project(&registry, &config, new_project("demo", &root))?;

        assert!(remove_project(&registry, "demo")?);
        assert!(!remove_project(&registry, "demo")?);
        assert!(registry.load().is_empty());
        Ok(())
    }
}
