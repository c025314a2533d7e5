use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::app::{App, Message, Model, ToastLevel};
use crate::watcher::FileWatcher;

/// Debounce window for file change bursts.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Text for one input: the file at `path`, or `fallback` when no file was given.
///
/// # Errors
///
/// Returns an error if `path` is given but cannot be read as UTF-8 text.
pub fn read_source(path: Option<&Path>, fallback: &str) -> Result<String> {
    path.map_or_else(
        || Ok(fallback.to_string()),
        |path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))
        },
    )
}

impl App {
    pub(super) fn make_file_watcher(model: &Model) -> Option<notify::Result<FileWatcher>> {
        let paths: Vec<&PathBuf> = model
            .data_path
            .iter()
            .chain(model.template_path.iter())
            .collect();
        if paths.is_empty() {
            return None;
        }
        Some(FileWatcher::new(&paths, WATCH_DEBOUNCE))
    }

    pub(super) fn handle_message_side_effects(model: &mut Model, msg: &Message) {
        if matches!(msg, Message::ReloadBuffers) {
            Self::reload_sources(model);
        }
    }

    /// Re-read the seeded files into their buffers.
    ///
    /// A buffer without a seeded file keeps its text. On a read failure
    /// neither buffer changes and an error toast is shown.
    fn reload_sources(model: &mut Model) {
        if model.data_path.is_none() && model.template_path.is_none() {
            model.show_toast(ToastLevel::Info, "Nothing to reload: no --data or --template file");
            return;
        }

        let data = model
            .data_path
            .as_deref()
            .map(|path| read_source(Some(path), ""))
            .transpose();
        let template = model
            .template_path
            .as_deref()
            .map(|path| read_source(Some(path), ""))
            .transpose();

        match (data, template) {
            (Ok(data), Ok(template)) => {
                let data = data.unwrap_or_else(|| model.data.text());
                let template = template.unwrap_or_else(|| model.template.text());
                model.replace_sources(&data, &template);
                tracing::debug!(title = %model.output.title(), "reloaded seeded files");
                model.show_toast(ToastLevel::Info, "Reloaded");
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!("reload failed: {err:#}");
                model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
            }
        }
    }
}
