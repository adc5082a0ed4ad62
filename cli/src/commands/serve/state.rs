//! # Shared Server State
//!
//! File: cli/src/commands/serve/state.rs
//! Author: Christi Mahu
//!
//! `AppState` is what every handler receives through axum's `State`
//! extractor. It is an `Arc` around the pieces that live for the whole
//! server run: settings, the project registry, the progress store, the
//! cleanup scheduler and the compiled templates.
//!
use super::cleanup::CleanupScheduler;
use crate::common::progress::{ProgressStore, ProgressTracker};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::templating;
use crate::projects::registry::ProjectRegistry;
use std::sync::Arc;
use tera::Tera;

/// What handlers extract with `State<SharedState>`.
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub registry: ProjectRegistry,
    pub progress: Arc<dyn ProgressTracker>,
    pub cleanup: CleanupScheduler,
    pub templates: Tera,
    /// Show error chains on HTML error pages.
    pub debug: bool,
}

impl AppState {
    /// Builds the state for `config` with an in-memory progress store.
    pub fn new(config: Config, debug: bool) -> Result<SharedState> {
        // The scheduler drops records from the same store the handlers write to.
        let progress: Arc<dyn ProgressTracker> = Arc::new(ProgressStore::new());
        let cleanup = CleanupScheduler::new(config.cleanup_delay(), Arc::clone(&progress));
        Ok(Arc::new(Self {
            registry: ProjectRegistry::new(&config.projects_file),
            templates: templating::build_templates()?,
            progress,
            cleanup,
            config,
            debug,
        }))
    }
}
