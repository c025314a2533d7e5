//! Rope-backed text buffers for the `data.json` and `template.vtl` panes.
//!
//! Each buffer owns its cursor and scroll offset; the TEA model holds one
//! buffer per input tab and forwards editing messages to the active one.

mod buffer;

pub(crate) use buffer::expand_tabs;
pub use buffer::{Cursor, Direction, EditorBuffer};
