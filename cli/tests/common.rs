//! # Shared Integration Test Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//!
//! Helpers shared by the integration tests in `cli/tests/`. Commands are run
//! inside a scratch directory with `HOME`/`XDG_CONFIG_HOME` pointing into it,
//! so no user or project configuration on the machine leaks into a test.
//!
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PACKAGE_SUBDIR: &str = "Unpacking_Tool/qfil_download_emmc";

pub fn qfil_cmd() -> Command {
    Command::cargo_bin("qfil-downloader").expect("Failed to find qfil-downloader binary for testing")
}

/// Scratch workspace with its own registry file.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp workspace"),
        }
    }

    pub fn registry(&self) -> PathBuf {
        self.dir.path().join("projects.json")
    }

    /// `qfil-downloader` isolated in this workspace and pointed at its registry.
    pub fn cmd(&self) -> Command {
        let mut cmd = qfil_cmd();
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join(".config"))
            .env("QFIL_PROJECTS_FILE", self.registry())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Creates `<dir>/<name>/<PACKAGE_SUBDIR>` with the given files; returns the project root.
    pub fn project(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = self.dir.path().join(name);
        let package = root.join(PACKAGE_SUBDIR);
        fs::create_dir_all(&package).expect("Failed to create package dir");
        for (file, content) in files {
            write_file(&package.join(file), content);
        }
        root
    }

    pub fn registry_json(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.registry()).expect("registry should exist");
        serde_json::from_str(&raw).expect("registry should be valid JSON")
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}
