//! # Project Discovery
//!
//! File: cli/src/projects/discovery.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Turns registry records into what the pages and the API show:
//! - `available_projects`: registered projects whose package directory exists
//!   and is non-empty, with entry counts and sizes, sorted by name.
//! - `resolve_package`: name validation + registry lookup + package directory
//!   check, shared by the download and details endpoints.
//! - `project_details`: recursive file listing for one project.
//!
use super::registry::{ProjectRecord, ProjectRegistry};
use super::validation::validate_project_name;
use crate::common::fs::io::{self, FileEntry};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// A project whose QFIL package can be downloaded.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub name: String,
    pub path: String,
    pub package_path: String,
    /// Non-hidden entries directly inside the package directory.
    pub file_count: usize,
    /// Recursive size in bytes.
    pub size: u64,
    pub size_formatted: String,
    pub description: String,
}

/// File listing shown on the project details page.
#[derive(Serialize, Debug, Clone)]
pub struct ProjectDetails {
    pub name: String,
    pub path: String,
    pub description: String,
    pub files: Vec<FileEntry>,
    pub total_files: usize,
    pub total_size: u64,
    pub total_size_formatted: String,
}

/// Registered projects with a present, non-empty package directory, sorted by name.
pub fn available_projects(registry: &ProjectRegistry, config: &Config) -> Vec<ProjectSummary> {
    let mut projects: Vec<ProjectSummary> = registry
        .load()
        .into_iter()
        .filter_map(|record| summarize(&record, config)) // Missing / empty packages drop out.
        .collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    projects
}

/// Listing entry for `record`, or `None` if there is nothing to download.
fn summarize(record: &ProjectRecord, config: &Config) -> Option<ProjectSummary> {
    let package_dir = config.package_dir(record.root());
    if !package_dir.is_dir() {
        debug!(
            "Skipping '{}': no package directory at {}",
            record.name,
            package_dir.display()
        );
        return None;
    }
    let file_count = io::count_visible_entries(&package_dir);
    if file_count == 0 {
        debug!("Skipping '{}': package directory is empty", record.name);
        return None;
    }
    // Recursive, unlike `file_count`.
    let size = io::directory_size(&package_dir);
    Some(ProjectSummary {
        name: record.name.clone(),
        path: record.path.clone(),
        package_path: package_dir.display().to_string(),
        file_count,
        size,
        size_formatted: io::human_readable_size(size),
        description: record.description.clone(),
    })
}

/// Validates `name`, finds its record and checks that the package directory exists.
///
/// # Errors
///
/// - `AppError::InvalidProjectName` for malformed names
/// - `AppError::ProjectNotFound` if no record has this name
/// - `AppError::PackageNotFound` if the package directory is missing
pub fn resolve_package(
    registry: &ProjectRegistry,
    config: &Config,
    name: &str,
) -> Result<(ProjectRecord, PathBuf)> {
    // Reject odd names before they reach the filesystem.
    validate_project_name(name)?;
    let record = registry
        .find(name)
        .ok_or_else(|| AppError::ProjectNotFound {
            name: name.to_string(),
        })?;
    let package_dir = config.package_dir(record.root());
    if !package_dir.is_dir() {
        return Err(AppError::PackageNotFound {
            name: name.to_string(),
        }
        .into());
    }
    Ok((record, package_dir))
}

/// File listing for one project. Unreadable files are left out.
pub fn project_details(
    registry: &ProjectRegistry,
    config: &Config,
    name: &str,
) -> Result<ProjectDetails> {
    let (record, package_dir) = resolve_package(registry, config, name)?;
    let files = io::list_files(&package_dir);
    let total_size = files.iter().map(|f| f.size).sum();
    Ok(ProjectDetails {
        name: record.name,
        path: record.path,
        description: record.description,
        total_files: files.len(),
        total_size,
        total_size_formatted: io::human_readable_size(total_size),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn register(registry: &ProjectRegistry, name: &str, root: &Path) {
        registry
            .update(|projects| {
                projects.push(ProjectRecord {
                    name: name.to_string(),
                    path: root.display().to_string(),
                    description: format!("{name} build"),
                    added_date: None,
                });
                Ok(())
            })
            .unwrap();
    }

    fn package(config: &Config, root: &Path, files: &[(&str, usize)]) {
        let dir = config.package_dir(root);
        fs::create_dir_all(&dir).unwrap();
        for (name, len) in files {
            fs::write(dir.join(name), vec![0u8; *len]).unwrap();
        }
    }

    #[test]
    fn test_listing_excludes_missing_and_empty_packages() {
        let work = tempdir().unwrap();
        let config = Config::default();
        let registry = ProjectRegistry::new(work.path().join("projects.json"));

        let demo = work.path().join("demo");
        package(&config, &demo, &[("a.bin", 10_000), ("b.bin", 2_000), ("c.xml", 345)]);
        register(&registry, "demo", &demo);

        let empty = work.path().join("empty");
        package(&config, &empty, &[]);
        register(&registry, "empty", &empty);

        let missing = work.path().join("missing");
        fs::create_dir_all(&missing).unwrap();
        register(&registry, "missing", &missing);

        let projects = available_projects(&registry, &config);
        assert_eq!(projects.len(), 1);
        let demo = &projects[0];
        assert_eq!(demo.name, "demo");
        assert_eq!(demo.file_count, 3);
        assert_eq!(demo.size, 12_345);
        assert_eq!(demo.size_formatted, "12.1 KB");
        assert_eq!(demo.description, "demo build");
    }

    #[test]
    fn test_listing_is_sorted_by_name() {
        let work = tempdir().unwrap();
        let config = Config::default();
        let registry = ProjectRegistry::new(work.path().join("projects.json"));
        for name in ["zulu", "alpha", "mike"] {
            let root = work.path().join(name);
            package(&config, &root, &[("f", 1)]);
            register(&registry, name, &root);
        }
        let names: Vec<String> = available_projects(&registry, &config)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mike", "zulu"]);
    }

    #[test]
    fn test_resolve_package_errors() {
        let work = tempdir().unwrap();
        let config = Config::default();
        let registry = ProjectRegistry::new(work.path().join("projects.json"));
        let root = work.path().join("nopkg");
        fs::create_dir_all(&root).unwrap();
        register(&registry, "nopkg", &root);

        let err = resolve_package(&registry, &config, "../etc").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::InvalidProjectName(_))
        ));
        let err = resolve_package(&registry, &config, "ghost").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::ProjectNotFound { .. })
        ));
        let err = resolve_package(&registry, &config, "nopkg").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_project_details_lists_nested_files() -> Result<()> {
        let work = tempdir()?;
        let config = Config::default();
        let registry = ProjectRegistry::new(work.path().join("projects.json"));
        let root = work.path().join("demo");
        package(&config, &root, &[("b.bin", 20)]);
        let nested = config.package_dir(&root).join("images");
        fs::create_dir_all(&nested)?;
        fs::write(nested.join("a.img"), vec![1u8; 30])?;
        register(&registry, "demo", &root);

        let details = project_details(&registry, &config, "demo")?;
        assert_eq!(details.total_files, 2);
        assert_eq!(details.total_size, 50);
        assert_eq!(details.files[0].path, "images/a.img");
        assert_eq!(details.files[1].name, "b.bin");
        Ok(())
    }
}
