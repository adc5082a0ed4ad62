//! # Project Registry
//!
//! File: cli/src/projects/registry.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The registry is a JSON file holding an ordered array of `ProjectRecord`s.
//! It is read on every request and rewritten wholesale on every change; there
//! is no append log.
//!
//! ## Behaviour
//!
//! - A missing file reads as an empty registry.
//! - An unreadable or unparsable file also reads as empty (logged at `warn`),
//!   so a corrupt registry never takes the site down.
//! - `update` serializes load-modify-save cycles within this process, so two
//!   concurrent adds cannot drop each other's record.
//! - `update` refuses to touch a file it cannot parse: the records in it are
//!   never replaced by an empty list.
//!
//! ```json
//! [
//!   {
//!     "name": "demo",
//!     "path": "/srv/aosp/demo",
//!     "description": "SM8550 bring-up",
//!     "added_date": "2024-05-01T10:22:13.123456"
//!   }
//! ]
//! ```
//!
use crate::common::fs::io;
use crate::core::error::{AppError, Result};
use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// One registered project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub name: String,
    pub path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<NaiveDateTime>,
}

impl ProjectRecord {
    pub fn root(&self) -> &Path {
        Path::new(&self.path)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Handle on the JSON registry file.
#[derive(Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProjectRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All registered projects, in file order. Never fails.
    pub fn load(&self) -> Vec<ProjectRecord> {
        match self.load_strict() {
            Ok(projects) => projects,
            Err(e) => {
                // Listings keep working; `update` will refuse to overwrite the file.
                warn!("Ignoring unusable registry: {:#}", e);
                Vec::new()
            }
        }
    }

    /// # Load Strictly (`load_strict`)
    ///
    /// Like `load`, but only a missing file counts as empty.
    ///
    /// ## Errors
    ///
    /// Returns `AppError::Registry` if the file exists but cannot be read or
    /// is not a valid JSON array of records.
    fn load_strict(&self) -> Result<Vec<ProjectRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Registry {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(anyhow!(AppError::Registry(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                ))))
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            anyhow!(AppError::Registry(format!(
                "cannot parse {}: {}",
                self.path.display(),
                e
            )))
        })
    }

    /// Looks up a project by exact name.
    pub fn find(&self, name: &str) -> Option<ProjectRecord> {
        self.load().into_iter().find(|p| p.name == name)
    }

    /// Replaces the registry file with `projects`.
    pub fn save(&self, projects: &[ProjectRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(projects)
            .map_err(|e| anyhow!(AppError::Registry(e.to_string())))?;
        io::write_string_atomically(&self.path, &json)
            .map_err(|e| anyhow!(AppError::Registry(format!("{:#}", e))))
    }

    /// # Update Registry (`update`)
    ///
    /// Loads the registry, lets `change` edit it, and saves the result.
    ///
    /// ## Errors
    ///
    /// Nothing is written if the existing file cannot be parsed
    /// (`AppError::Registry`), if `change` returns an error, or if saving fails.
    pub fn update<T>(
        &self,
        change: impl FnOnce(&mut Vec<ProjectRecord>) -> Result<T>,
    ) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut projects = self.load_strict()?;
        let outcome = change(&mut projects)?;
        self.save(&projects)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(name: &str) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            path: format!("/srv/aosp/{name}"),
            description: String::new(),
            added_date: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let registry = ProjectRegistry::new(dir.path().join("projects.json"));
        assert!(registry.load().is_empty());
        assert!(registry.find("demo").is_none());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ProjectRegistry::new(&path).load().is_empty());
    }

    #[test]
    fn test_update_refuses_to_overwrite_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let damaged = r#"[{"name": "demo", "path": "/p/demo"},"#;
        fs::write(&path, damaged).unwrap();
        let registry = ProjectRegistry::new(&path);

        let err = registry
            .update(|projects| {
                projects.push(record("other"));
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Registry(_))
        ));
        // The damaged content is left for a human to repair.
        assert_eq!(fs::read_to_string(&path).unwrap(), damaged);
    }

    #[test]
    fn test_save_and_load_preserve_order() -> Result<()> {
        let dir = tempdir()?;
        let registry = ProjectRegistry::new(dir.path().join("projects.json"));
        registry.save(&[record("zeta"), record("alpha")])?;

        let names: Vec<String> = registry.load().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(registry.find("alpha").unwrap().path, "/srv/aosp/alpha");
        Ok(())
    }

    #[test]
    fn test_reads_legacy_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(
            &path,
            r#"[
              {"name": "a", "path": "/p/a", "description": null, "added_date": "2024-05-01T10:22:13.123456"},
              {"name": "b", "path": "/p/b"}
            ]"#,
        )
        .unwrap();
        let projects = ProjectRegistry::new(&path).load();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].description, "");
        assert!(projects[0].added_date.is_some());
        assert!(projects[1].added_date.is_none());
    }

    #[test]
    fn test_update_writes_only_on_success() -> Result<()> {
        let dir = tempdir()?;
        let registry = ProjectRegistry::new(dir.path().join("projects.json"));
        registry.update(|projects| {
            projects.push(record("demo"));
            Ok(())
        })?;
        assert_eq!(registry.load().len(), 1);

        let failed: Result<()> = registry.update(|projects| {
            projects.clear();
            Err(anyhow!("abort"))
        });
        assert!(failed.is_err());
        assert_eq!(registry.load().len(), 1);
        Ok(())
    }

    #[test]
    fn test_file_is_pretty_json_array() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("projects.json");
        ProjectRegistry::new(&path).save(&[record("demo")])?;
        let raw = fs::read_to_string(&path)?;
        assert!(raw.starts_with("[\n  {"));
        Ok(())
    }
}
