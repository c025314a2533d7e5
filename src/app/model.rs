use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ratatui::layout::Rect;

use crate::editor::EditorBuffer;
use crate::pipeline::{self, RenderResult};
use crate::ui::Panes;
use crate::vtl::Velocity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// The two editable inputs, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputTab {
    Data,
    Template,
}

impl InputTab {
    pub const ALL: [Self; 2] = [Self::Data, Self::Template];

    /// Position in the tab strip.
    pub const fn index(self) -> usize {
        match self {
            Self::Data => 0,
            Self::Template => 1,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Data),
            1 => Some(Self::Template),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Data => "data.json",
            Self::Template => "template.vtl",
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::Data => Self::Template,
            Self::Template => Self::Data,
        }
    }
}

/// The complete application state.
///
/// The output is derived: it is recomputed from the two buffers whenever
/// their text changes, and never edited directly.
#[derive(Debug, Clone)]
pub struct Model {
    pub active_tab: InputTab,
    pub dark_mode: bool,
    pub data: EditorBuffer,
    pub template: EditorBuffer,
    pub output: RenderResult,
    /// First visible line of the output pane.
    pub output_scroll: usize,
    pub engine: Velocity,
    /// File the data buffer was seeded from, if any.
    pub data_path: Option<PathBuf>,
    /// File the template buffer was seeded from, if any.
    pub template_path: Option<PathBuf>,
    pub watch_enabled: bool,
    /// Global config path shown in help
    pub config_global_path: Option<PathBuf>,
    /// Local override path shown in help
    pub config_local_path: Option<PathBuf>,
    pub help_visible: bool,
    pub should_quit: bool,
    pub terminal_size: (u16, u16),
    toast: Option<Toast>,
}

impl Model {
    /// Create a model holding `data` and `template`, with the output already rendered.
    pub fn new(data: &str, template: &str, terminal_size: (u16, u16)) -> Self {
        let mut model = Self {
            active_tab: InputTab::Template,
            dark_mode: false,
            data: EditorBuffer::from_text(data),
            template: EditorBuffer::from_text(template),
            output: RenderResult::default(),
            output_scroll: 0,
            engine: Velocity::default(),
            data_path: None,
            template_path: None,
            watch_enabled: false,
            config_global_path: None,
            config_local_path: None,
            help_visible: false,
            should_quit: false,
            terminal_size,
            toast: None,
        };
        model.rerender();
        model
    }

    /// Swap the engine and re-render with it.
    #[must_use]
    pub fn with_engine(mut self, engine: Velocity) -> Self {
        self.engine = engine;
        self.rerender();
        self
    }

    pub const fn buffer(&self, tab: InputTab) -> &EditorBuffer {
        match tab {
            InputTab::Data => &self.data,
            InputTab::Template => &self.template,
        }
    }

    pub const fn buffer_mut(&mut self, tab: InputTab) -> &mut EditorBuffer {
        match tab {
            InputTab::Data => &mut self.data,
            InputTab::Template => &mut self.template,
        }
    }

    /// The buffer behind the selected tab.
    pub const fn current_buffer(&self) -> &EditorBuffer {
        self.buffer(self.active_tab)
    }

    pub const fn current_buffer_mut(&mut self) -> &mut EditorBuffer {
        self.buffer_mut(self.active_tab)
    }

    pub fn source_path(&self, tab: InputTab) -> Option<&Path> {
        match tab {
            InputTab::Data => self.data_path.as_deref(),
            InputTab::Template => self.template_path.as_deref(),
        }
    }

    /// Title for the editor block: the seeded file, or a note that the text is built in.
    pub fn source_label(&self, tab: InputTab) -> String {
        self.source_path(tab).map_or_else(
            || "built-in sample".to_string(),
            |path| path.display().to_string(),
        )
    }

    /// Recompute the output from the current buffer text.
    pub fn rerender(&mut self) {
        self.output = pipeline::render_with(&self.engine, &self.data.text(), &self.template.text());
        self.clamp_output_scroll();
    }

    /// Put fresh text in both buffers, as after a reload from disk, and re-render.
    pub fn replace_sources(&mut self, data: &str, template: &str) {
        self.data.replace_text(data);
        self.template.replace_text(template);
        self.rerender();
    }

    /// Screen layout for the current terminal size.
    pub fn panes(&self) -> Panes {
        let (width, height) = self.terminal_size;
        crate::ui::split_panes(Rect::new(0, 0, width, height), self.toast.is_some())
    }

    pub fn output_line_count(&self) -> usize {
        self.output.text().lines().count()
    }

    pub fn max_output_scroll(&self) -> usize {
        self.output_line_count()
            .saturating_sub(self.panes().output_rows())
    }

    pub(super) fn clamp_output_scroll(&mut self) {
        self.output_scroll = self.output_scroll.min(self.max_output_scroll());
    }

    pub(super) fn ensure_cursor_visible(&mut self) {
        let rows = self.panes().editor_rows();
        self.current_buffer_mut().ensure_cursor_visible(rows);
    }

    pub fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("", "", (80, 24))
    }
}
