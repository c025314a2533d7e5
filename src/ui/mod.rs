//! Terminal UI.
//!
//! - [`render`]: draws the whole frame from a [`Model`](crate::app::Model)
//! - [`split_panes`]: the layout shared by drawing and mouse hit-testing
//! - [`style`]: light and dark palettes

pub mod style;

mod overlays;
mod render;
mod status;

pub use render::{Panes, input_tab_at, line_number_width, render, split_panes};

/// Application name shown in the top bar.
pub const APP_TITLE: &str = "Live VTL Simulator";

#[cfg(test)]
mod tests;
