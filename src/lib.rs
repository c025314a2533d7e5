// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. vtl::TemplateError)
    clippy::module_name_repetitions
)]

//! # Live VTL Simulator
//!
//! A terminal playground for Velocity templates.
//!
//! The left pane edits two buffers, `data.json` and `template.vtl`. The right
//! pane shows the template rendered against the data, refreshed on every
//! edit:
//! - A JSON parse error, with the parser's message
//! - A template compile error, with the engine's message
//! - Or the rendered text
//!
//! ## Architecture
//!
//! The terminal side uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`pipeline`]: Data and template text in, [`pipeline::RenderResult`] out
//! - [`engine`]: The template engine seam
//! - [`vtl`]: The Velocity engine
//! - [`diagnostic`]: Error message extraction
//! - [`app`]: Main application loop and state
//! - [`editor`]: Text buffers
//! - [`ui`]: Terminal UI components
//! - [`config`]: Saved flag defaults
//! - [`watcher`]: File watching
//! - [`samples`]: Built-in starting content

pub mod app;
pub mod config;
pub mod diagnostic;
pub mod editor;
pub mod engine;
pub mod pipeline;
pub mod samples;
pub mod ui;
pub mod vtl;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::engine::TemplateEngine;
    pub use crate::pipeline::{OutputTitle, RenderResult, render};
    pub use crate::vtl::{EngineOptions, Velocity};
}
