//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use effects::read_source;
pub use model::{InputTab, Model, ToastLevel};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::vtl::Velocity;

/// Main application struct that owns the startup settings and runs the event loop.
pub struct App {
    data_path: Option<PathBuf>,
    template_path: Option<PathBuf>,
    watch_enabled: bool,
    dark_mode: bool,
    engine: Velocity,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create an application showing the built-in samples.
    pub fn new() -> Self {
        Self {
            data_path: None,
            template_path: None,
            watch_enabled: false,
            dark_mode: false,
            engine: Velocity::default(),
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Seed the data buffer from a file instead of the sample.
    pub fn with_data_path(mut self, path: Option<PathBuf>) -> Self {
        self.data_path = path;
        self
    }

    /// Seed the template buffer from a file instead of the sample.
    pub fn with_template_path(mut self, path: Option<PathBuf>) -> Self {
        self.template_path = path;
        self
    }

    /// Reload seeded files when they change on disk.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Start in dark mode.
    pub const fn with_dark_mode(mut self, dark: bool) -> Self {
        self.dark_mode = dark;
        self
    }

    /// Render with this engine configuration.
    pub fn with_engine(mut self, engine: Velocity) -> Self {
        self.engine = engine;
        self
    }

    /// Set config paths to show in help.
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
