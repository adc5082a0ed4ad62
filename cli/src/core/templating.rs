//! # HTML Template Rendering
//!
//! File: cli/src/core/templating.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The web pages are Tera templates compiled into the binary with
//! `include_str!`, so the server has no runtime dependency on its working
//! directory. `build_templates` registers them once at startup; handlers call
//! `render` with a serializable context.
//!
//! ## Templates
//!
//! - `base.html`: layout and shared styles
//! - `index.html`: available projects, download buttons and progress bar
//! - `manage.html`: add/remove projects, folder browser
//! - `project_details.html`: file listing of one project
//! - `error.html`: error page for HTML routes
//!
//! A `filesize` filter formats byte counts (`{{ file.size | filesize }}`).
//!
use crate::common::fs::io::human_readable_size;
use crate::core::error::{AppError, Result};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::collections::HashMap;
use tera::{Tera, Value};

/// (name, source) pairs; paths are relative to this file.
const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("manage.html", include_str!("../../templates/manage.html")),
    (
        "project_details.html",
        include_str!("../../templates/project_details.html"),
    ),
    ("error.html", include_str!("../../templates/error.html")),
];

/// Compiles the embedded templates and registers custom filters.
pub fn build_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    // Added together so `{% extends "base.html" %}` resolves.
    tera.add_raw_templates(TEMPLATES)
        .map_err(|e| anyhow!(AppError::Template { source: e }))
        .context("Failed to compile embedded HTML templates")?;
    tera.register_filter("filesize", filesize_filter);
    Ok(tera)
}

/// Renders `template` with `context` serialized into a Tera context.
pub fn render<C: Serialize>(tera: &Tera, template: &str, context: &C) -> Result<String> {
    let ctx = tera::Context::from_serialize(context)
        .map_err(|e| anyhow!(AppError::Template { source: e }))
        .with_context(|| format!("Failed to build context for '{template}'"))?;
    tera.render(template, &ctx)
        .map_err(|e| anyhow!(AppError::Template { source: e }))
        .with_context(|| format!("Failed to render '{template}'"))
}

/// `{{ bytes | filesize }}` → "12.1 KB".
fn filesize_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let bytes = value
        .as_u64()
        .ok_or_else(|| tera::Error::msg("filesize expects a non-negative integer"))?;
    Ok(Value::String(human_readable_size(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_templates_compile() {
        let tera = build_templates().expect("templates should compile");
        let names: Vec<&str> = tera.get_template_names().collect();
        for (name, _) in TEMPLATES {
            assert!(names.contains(&name), "{name} missing");
        }
    }

    #[test]
    fn test_render_error_page() -> Result<()> {
        let tera = build_templates()?;
        let html = render(
            &tera,
            "error.html",
            &json!({"status": 404, "error": "Page not found", "message": "Project not found: ghost", "details": null}),
        )?;
        assert!(html.contains("Page not found"));
        assert!(html.contains("Project not found: ghost"));
        Ok(())
    }

    #[test]
    fn test_render_index_with_projects() -> Result<()> {
        let tera = build_templates()?;
        let html = render(
            &tera,
            "index.html",
            &json!({
                "projects": [{
                    "name": "demo",
                    "path": "/srv/demo",
                    "package_path": "/srv/demo/Unpacking_Tool/qfil_download_emmc",
                    "file_count": 3,
                    "size": 12345,
                    "size_formatted": "12.1 KB",
                    "description": "SM8550"
                }],
                "package_subdir": "Unpacking_Tool/qfil_download_emmc"
            }),
        )?;
        assert!(html.contains("/download/demo"));
        assert!(html.contains("12.1 KB"));
        Ok(())
    }

    #[test]
    fn test_filesize_filter() {
        let out = filesize_filter(&json!(12345), &HashMap::new()).unwrap();
        assert_eq!(out, json!("12.1 KB"));
        assert!(filesize_filter(&json!("x"), &HashMap::new()).is_err());
    }
}
