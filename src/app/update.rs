use crate::app::{InputTab, Model};
use crate::editor::Direction;

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Tabs and display
    /// Show the given input tab
    SelectTab(InputTab),
    /// Show the other input tab
    SwitchTab,
    /// Flip between light and dark mode
    ToggleTheme,

    // Editor (applies to the active input tab)
    /// Insert a character at the cursor
    EditorInsertChar(char),
    /// Insert pasted text at the cursor
    EditorInsertStr(String),
    /// Delete character before cursor (Backspace)
    EditorDeleteBack,
    /// Delete character at cursor (Delete)
    EditorDeleteForward,
    /// Split line at cursor (Enter)
    EditorSplitLine,
    /// Move cursor in a direction
    EditorMoveCursor(Direction),
    /// Move cursor to beginning of line (Home)
    EditorMoveHome,
    /// Move cursor to end of line (End)
    EditorMoveEnd,
    /// Move cursor one word left (Ctrl+Left)
    EditorMoveWordLeft,
    /// Move cursor one word right (Ctrl+Right)
    EditorMoveWordRight,
    /// Move cursor to start of buffer (Ctrl+Home)
    EditorMoveToStart,
    /// Move cursor to end of buffer (Ctrl+End)
    EditorMoveToEnd,
    /// Move cursor to absolute position (line, col), e.g. from a mouse click
    EditorMoveTo(usize, usize),
    /// Scroll editor viewport up by n lines
    EditorScrollUp(usize),
    /// Scroll editor viewport down by n lines
    EditorScrollDown(usize),

    // Output
    /// Scroll output up by n lines
    OutputScrollUp(usize),
    /// Scroll output down by n lines
    OutputScrollDown(usize),
    /// Scroll output up one page
    OutputPageUp,
    /// Scroll output down one page
    OutputPageDown,

    // Other
    /// Toggle help overlay
    ToggleHelp,
    /// Hide help overlay
    HideHelp,
    /// Re-read the seeded files (handled as a side effect)
    ReloadBuffers,
    /// Terminal resized
    Resize(u16, u16),
    /// Quit the application
    Quit,
}

/// Pure function that updates the model based on a message.
///
/// The output is re-rendered whenever a buffer's text changed. Reading files
/// for [`Message::ReloadBuffers`] happens outside, in the event loop.
pub fn update(mut model: Model, msg: Message) -> Model {
    let revisions = (model.data.revision(), model.template.revision());

    match msg {
        Message::SelectTab(tab) => {
            model.active_tab = tab;
            model.ensure_cursor_visible();
        }
        Message::SwitchTab => {
            model.active_tab = model.active_tab.other();
            model.ensure_cursor_visible();
        }
        Message::ToggleTheme => model.dark_mode = !model.dark_mode,

        Message::EditorInsertChar(ch) => {
            model.current_buffer_mut().insert_char(ch);
            model.ensure_cursor_visible();
        }
        Message::EditorInsertStr(text) => {
            model.current_buffer_mut().insert_str(&text);
            model.ensure_cursor_visible();
        }
        Message::EditorDeleteBack => {
            model.current_buffer_mut().delete_back();
            model.ensure_cursor_visible();
        }
        Message::EditorDeleteForward => {
            model.current_buffer_mut().delete_forward();
        }
        Message::EditorSplitLine => {
            model.current_buffer_mut().split_line();
            model.ensure_cursor_visible();
        }
        Message::EditorMoveCursor(dir) => {
            model.current_buffer_mut().move_cursor(dir);
            model.ensure_cursor_visible();
        }
        Message::EditorMoveHome => model.current_buffer_mut().move_home(),
        Message::EditorMoveEnd => model.current_buffer_mut().move_end(),
        Message::EditorMoveWordLeft => {
            model.current_buffer_mut().move_word_left();
            model.ensure_cursor_visible();
        }
        Message::EditorMoveWordRight => {
            model.current_buffer_mut().move_word_right();
            model.ensure_cursor_visible();
        }
        Message::EditorMoveToStart => {
            model.current_buffer_mut().move_to_start();
            model.ensure_cursor_visible();
        }
        Message::EditorMoveToEnd => {
            model.current_buffer_mut().move_to_end();
            model.ensure_cursor_visible();
        }
        Message::EditorMoveTo(line, col) => {
            model.current_buffer_mut().move_to(line, col);
            model.ensure_cursor_visible();
        }
        Message::EditorScrollUp(n) => {
            model.current_buffer_mut().scroll_by(-isize::try_from(n).unwrap_or(isize::MAX));
        }
        Message::EditorScrollDown(n) => {
            model.current_buffer_mut().scroll_by(isize::try_from(n).unwrap_or(isize::MAX));
        }

        Message::OutputScrollUp(n) => {
            model.output_scroll = model.output_scroll.saturating_sub(n);
        }
        Message::OutputScrollDown(n) => {
            model.output_scroll = model.output_scroll.saturating_add(n);
            model.clamp_output_scroll();
        }
        Message::OutputPageUp => {
            let page = model.panes().output_rows().max(1);
            model.output_scroll = model.output_scroll.saturating_sub(page);
        }
        Message::OutputPageDown => {
            let page = model.panes().output_rows().max(1);
            model.output_scroll = model.output_scroll.saturating_add(page);
            model.clamp_output_scroll();
        }

        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::HideHelp => model.help_visible = false,
        Message::ReloadBuffers => {}
        Message::Resize(width, height) => {
            model.terminal_size = (width, height);
            model.clamp_output_scroll();
            model.ensure_cursor_visible();
        }
        Message::Quit => model.should_quit = true,
    }

    if (model.data.revision(), model.template.revision()) != revisions {
        model.rerender();
    }
    model
}
