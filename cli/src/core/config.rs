//! # QFIL Downloader Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module loads the application-wide settings that are not tied to a
//! single command invocation: where the project registry lives, which
//! subdirectory of a project holds the QFIL package, how long finished
//! downloads stay on disk, and the prefix used for temporary directories.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Project-specific `.qfil-downloader.toml` in the current directory or ancestors
//!    (the search stops at a directory containing `.git`)
//! 2. User-specific `config.toml` in the platform config directory
//! 3. Default values defined in the code
//!
//! Command-line flags and environment variables are layered on top of this by
//! the `serve` and `projects` commands.
//!
//! ## Examples
//!
//! ```toml
//! projects_file = "~/qfil/projects.json"
//! package_subdir = "Unpacking_Tool/qfil_download_emmc"
//! cleanup_delay_secs = 300
//! temp_dir_prefix = "qfil_download_"
//! ```
//!
//! ```rust
//! let cfg = config::load_config()?;
//! let registry = ProjectRegistry::new(&cfg.projects_file);
//! ```
//!
use crate::core::error::{AppError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::{fs, time::Duration};
use tracing::{debug, info};

/// Name of the project-local configuration file.
const PROJECT_CONFIG_FILENAME: &str = ".qfil-downloader.toml";

/// Application settings loaded from TOML files.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JSON file holding the registered projects (can use ~). Will be expanded.
    #[serde(default = "default_projects_file")]
    pub projects_file: String,
    /// Path of the QFIL package directory, relative to a project root.
    #[serde(default = "default_package_subdir")]
    pub package_subdir: String,
    /// Seconds a finished download (archive + progress record) is kept.
    #[serde(default = "default_cleanup_delay_secs")]
    pub cleanup_delay_secs: u64,
    /// Prefix of the per-download temporary directories.
    #[serde(default = "default_temp_dir_prefix")]
    pub temp_dir_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_file: default_projects_file(),
            package_subdir: default_package_subdir(),
            cleanup_delay_secs: default_cleanup_delay_secs(),
            temp_dir_prefix: default_temp_dir_prefix(),
        }
    }
}

impl Config {
    /// Delay before a finished download is cleaned up.
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }

    /// Location of the QFIL package directory for a project rooted at `project_root`.
    pub fn package_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.package_subdir)
    }
}

fn default_projects_file() -> String {
    "projects.json".to_string()
}
fn default_package_subdir() -> String {
    "Unpacking_Tool/qfil_download_emmc".to_string()
}
fn default_cleanup_delay_secs() -> u64 {
    300
}
fn default_temp_dir_prefix() -> String {
    "qfil_download_".to_string()
}

/// Loads, merges, expands and validates configuration starting from the current directory.
pub fn load_config() -> Result<Config> {
    // Project configuration is searched from the working directory upwards.
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    let user_config = load_user_config()?;
    load_config_in(&current_dir, user_config)
}

/// Same as [`load_config`], with the project search rooted at `start_dir` and the
/// user-level configuration supplied by the caller.
pub fn load_config_in(start_dir: &Path, user_config: Option<Config>) -> Result<Config> {
    // 1. Find and load the project configuration file, if any.
    let project_config = match find_project_config_path(start_dir) {
        Some(path) => {
            info!("Loading project configuration from: {}", path.display());
            Some(load_config_from_path(&path)?)
        }
        None => {
            debug!("No project configuration file ({PROJECT_CONFIG_FILENAME}) found.");
            None
        }
    };
    // 2. Merge with the user configuration (or defaults), project values winning.
    let mut merged = merge_configs(user_config.unwrap_or_default(), project_config);
    // 3. Expand `~` and check the result before anyone uses it.
    expand_config_paths(&mut merged);
    validate_config(&merged).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged);
    Ok(merged)
}

/// User-level `config.toml` from the platform config directory, if present.
fn load_user_config() -> Result<Option<Config>> {
    let Some(proj_dirs) = ProjectDirs::from("com", "QfilDownloader", "qfil-downloader") else {
        // No home directory (e.g. a bare service account): defaults only.
        debug!("Could not determine user config directory.");
        return Ok(None);
    };
    let config_path = proj_dirs.config_dir().join("config.toml");
    if config_path.is_file() {
        info!("Loading user configuration from: {}", config_path.display());
        load_config_from_path(&config_path).map(Some)
    } else {
        debug!(
            "User configuration file not found at {}",
            config_path.display()
        );
        Ok(None)
    }
}

/// Walks up from `start_dir` looking for `.qfil-downloader.toml`.
fn find_project_config_path(start_dir: &Path) -> Option<PathBuf> {
    let mut path = start_dir;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        // Never look above the repository root.
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?; // `None` at the filesystem root ends the search.
    }
}

/// Reads and parses one TOML file. Unknown keys are an error.
fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Project values win whenever they differ from the built-in defaults.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let Some(project) = project else {
        return user;
    };
    let defaults = Config::default();
    Config {
        projects_file: if project.projects_file != defaults.projects_file {
            project.projects_file
        } else {
            user.projects_file
        },
        package_subdir: if project.package_subdir != defaults.package_subdir {
            project.package_subdir
        } else {
            user.package_subdir
        },
        cleanup_delay_secs: if project.cleanup_delay_secs != defaults.cleanup_delay_secs {
            project.cleanup_delay_secs
        } else {
            user.cleanup_delay_secs
        },
        temp_dir_prefix: if project.temp_dir_prefix != defaults.temp_dir_prefix {
            project.temp_dir_prefix
        } else {
            user.temp_dir_prefix
        },
    }
}

/// Expands `~` in path-valued settings.
fn expand_config_paths(config: &mut Config) {
    config.projects_file = shellexpand::tilde(&config.projects_file).into_owned();
    debug!("Expanded projects file: {}", config.projects_file);
}

/// # Validate Configuration (`validate_config`)
///
/// ## Errors
///
/// Returns `AppError::Config` if the registry path or temp prefix is empty, or
/// the package subdirectory is not a plain relative path.
fn validate_config(config: &Config) -> Result<()> {
    if config.projects_file.trim().is_empty() {
        return Err(anyhow!(AppError::Config(
            "projects_file cannot be empty".to_string()
        )));
    }
    // Only normal components: no `/` prefix, no `..`, no `.`.
    let subdir = Path::new(&config.package_subdir);
    if config.package_subdir.is_empty()
        || subdir
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(anyhow!(AppError::Config(format!(
            "package_subdir '{}' must be a relative path without '..'",
            config.package_subdir
        ))));
    }
    if config.temp_dir_prefix.is_empty() {
        return Err(anyhow!(AppError::Config(
            "temp_dir_prefix cannot be empty".to_string()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            projects_file = "/var/lib/qfil/projects.json"
            cleanup_delay_secs = 60
            "#,
        )
        .expect("Failed to parse TOML");

        assert_eq!(config.projects_file, "/var/lib/qfil/projects.json");
        assert_eq!(config.cleanup_delay(), Duration::from_secs(60));
        assert_eq!(config.package_subdir, "Unpacking_Tool/qfil_download_emmc");
        assert_eq!(config.temp_dir_prefix, "qfil_download_");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("secret_key = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_project_overrides_user() {
        let user = Config {
            projects_file: "/home/me/projects.json".into(),
            cleanup_delay_secs: 30,
            ..Config::default()
        };
        let project = Config {
            cleanup_delay_secs: 600,
            ..Config::default()
        };
        let merged = merge_configs(user, Some(project));
        assert_eq!(merged.projects_file, "/home/me/projects.json");
        assert_eq!(merged.cleanup_delay_secs, 600);
    }

    #[test]
    fn test_load_config_in_finds_project_file() -> Result<()> {
        let root = tempdir()?;
        fs::create_dir(root.path().join(".git"))?;
        fs::write(
            root.path().join(PROJECT_CONFIG_FILENAME),
            "package_subdir = \"pkg/emmc\"\n",
        )?;
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested)?;

        let config = load_config_in(&nested, None)?;
        assert_eq!(config.package_subdir, "pkg/emmc");
        assert_eq!(
            config.package_dir(Path::new("/aosp")),
            PathBuf::from("/aosp/pkg/emmc")
        );
        Ok(())
    }

    #[test]
    fn test_tilde_expansion() {
        let mut config = Config {
            projects_file: "~/qfil/projects.json".into(),
            ..Config::default()
        };
        expand_config_paths(&mut config);
        let home_dir = dirs::home_dir().unwrap();
        assert_eq!(
            config.projects_file,
            home_dir.join("qfil/projects.json").to_string_lossy()
        );
    }

    #[test]
    fn test_validate_rejects_traversing_subdir() {
        let config = Config {
            package_subdir: "../outside".into(),
            ..Config::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("must be a relative path"));

        let absolute = Config {
            package_subdir: "/etc".into(),
            ..Config::default()
        };
        assert!(validate_config(&absolute).is_err());
        assert!(validate_config(&Config::default()).is_ok());
    }
}
