use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, ToastLevel, read_source, update};
use crate::samples;
use crate::watcher::FileWatcher;

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Build the initial model: seeded or sample text, rendered once.
    ///
    /// # Errors
    ///
    /// Returns an error if a `--data` or `--template` file cannot be read.
    pub fn initial_model(&self, terminal_size: (u16, u16)) -> Result<Model> {
        let data = read_source(self.data_path.as_deref(), samples::DEFAULT_DATA)?;
        let template = read_source(self.template_path.as_deref(), samples::DEFAULT_TEMPLATE)?;

        let mut model = Model::new(&data, &template, terminal_size).with_engine(self.engine.clone());
        model.dark_mode = self.dark_mode;
        model.data_path.clone_from(&self.data_path);
        model.template_path.clone_from(&self.template_path);
        model.watch_enabled = self.watch_enabled;
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);
        Ok(model)
    }

    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if a seeded file cannot be read, or if terminal
    /// initialization or the event loop hits an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        // Read the seeded files before touching the terminal so failures print cleanly.
        let mut model = self.initial_model((80, 24))?;

        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: livevtl requires an interactive terminal")?;
        let size = terminal.size()?;
        model = update(model, Message::Resize(size.width, size.height));
        tracing::debug!(
            width = size.width,
            height = size.height,
            title = %model.output.title(),
            "terminal ready"
        );

        let result = execute!(stdout(), EnableMouseCapture, EnableBracketedPaste)
            .context("Failed to enable mouse capture")
            .and_then(|()| Self::event_loop(&mut terminal, &mut model));

        let _ = execute!(stdout(), DisableBracketedPaste, DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut file_watcher = if model.watch_enabled {
            match Self::make_file_watcher(model) {
                Some(Ok(watcher)) => Some(watcher),
                Some(Err(err)) => {
                    model.watch_enabled = false;
                    model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                    tracing::warn!(%err, "could not start file watcher");
                    None
                }
                None => {
                    model.watch_enabled = false;
                    model.show_toast(
                        ToastLevel::Warning,
                        "--watch needs a --data or --template file",
                    );
                    None
                }
            }
        } else {
            None
        };
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            if file_watcher
                .as_mut()
                .is_some_and(FileWatcher::take_change_ready)
            {
                tracing::debug!("seeded file changed on disk");
                Self::dispatch(model, Message::ReloadBuffers);
                needs_render = true;
            }

            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() {
                10
            } else {
                250
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so the debouncer uses accurate times.
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                if let Some(msg) =
                    Self::handle_event(&event::read()?, model, event_ms, &mut resize_debouncer)
                {
                    Self::dispatch(model, msg);
                    needs_render = true;
                }

                // Coalesce key repeat bursts and pastes into a single render.
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    if let Some(msg) =
                        Self::handle_event(&event::read()?, model, drain_ms, &mut resize_debouncer)
                    {
                        Self::dispatch(model, msg);
                        needs_render = true;
                    }
                }
            }

            if needs_render {
                terminal.draw(|frame| Self::view(model, frame))?;
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Run `msg` through [`update`] and then its side effects.
    pub(super) fn dispatch(model: &mut Model, msg: Message) {
        tracing::trace!(?msg, "message");
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, &side_msg);
    }
}
