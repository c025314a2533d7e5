use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::{App, InputTab, Message, Model};
use crate::editor::Direction;

use super::event_loop::ResizeDebouncer;

/// Lines moved per mouse wheel notch.
const WHEEL_STEP: usize = 3;

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse, model),
            Event::Paste(text) if !model.help_visible => {
                Some(Message::EditorInsertStr(text.clone()))
            }
            Event::Resize(w, h) => {
                tracing::trace!(width = w, height = h, "resize queued");
                resize_debouncer.queue(*w, *h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Quit works everywhere, including over the help overlay.
        if ctrl && matches!(key.code, KeyCode::Char('q' | 'c')) {
            return Some(Message::Quit);
        }
        if model.help_visible {
            return Some(Message::HideHelp);
        }

        match key.code {
            KeyCode::Char('t') if ctrl => Some(Message::ToggleTheme),
            KeyCode::Char('r') if ctrl => Some(Message::ReloadBuffers),
            KeyCode::F(1) => Some(Message::ToggleHelp),
            KeyCode::F(2) => Some(Message::SelectTab(InputTab::Data)),
            KeyCode::F(3) => Some(Message::SelectTab(InputTab::Template)),
            KeyCode::Tab | KeyCode::BackTab => Some(Message::SwitchTab),
            KeyCode::PageUp => Some(Message::OutputPageUp),
            KeyCode::PageDown => Some(Message::OutputPageDown),

            KeyCode::Home if ctrl => Some(Message::EditorMoveToStart),
            KeyCode::End if ctrl => Some(Message::EditorMoveToEnd),
            KeyCode::Left if ctrl => Some(Message::EditorMoveWordLeft),
            KeyCode::Right if ctrl => Some(Message::EditorMoveWordRight),
            KeyCode::Home => Some(Message::EditorMoveHome),
            KeyCode::End => Some(Message::EditorMoveEnd),
            KeyCode::Left => Some(Message::EditorMoveCursor(Direction::Left)),
            KeyCode::Right => Some(Message::EditorMoveCursor(Direction::Right)),
            KeyCode::Up => Some(Message::EditorMoveCursor(Direction::Up)),
            KeyCode::Down => Some(Message::EditorMoveCursor(Direction::Down)),
            KeyCode::Backspace => Some(Message::EditorDeleteBack),
            KeyCode::Delete => Some(Message::EditorDeleteForward),
            KeyCode::Enter => Some(Message::EditorSplitLine),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Message::EditorInsertChar(c))
            }
            _ => None,
        }
    }

    pub(super) fn handle_mouse(mouse: MouseEvent, model: &Model) -> Option<Message> {
        if model.help_visible {
            return None;
        }

        let panes = model.panes();
        let (col, row) = (mouse.column, mouse.row);
        let in_editor = point_in_rect(col, row, panes.editor);
        let in_output = point_in_rect(col, row, panes.output);

        match mouse.kind {
            MouseEventKind::ScrollDown if in_editor => Some(Message::EditorScrollDown(WHEEL_STEP)),
            MouseEventKind::ScrollUp if in_editor => Some(Message::EditorScrollUp(WHEEL_STEP)),
            MouseEventKind::ScrollDown if in_output => Some(Message::OutputScrollDown(WHEEL_STEP)),
            MouseEventKind::ScrollUp if in_output => Some(Message::OutputScrollUp(WHEEL_STEP)),
            MouseEventKind::Down(MouseButton::Left) => {
                if point_in_rect(col, row, panes.input_tabs) {
                    return crate::ui::input_tab_at(panes.input_tabs, col).map(Message::SelectTab);
                }
                if in_editor {
                    return editor_position_for_click(model, panes.editor, col, row)
                        .map(|(line, byte_col)| Message::EditorMoveTo(line, byte_col));
                }
                None
            }
            _ => None,
        }
    }

    pub(super) fn view(model: &Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}

/// Buffer line and byte column under a click inside the bordered editor block.
fn editor_position_for_click(
    model: &Model,
    editor: Rect,
    col: u16,
    row: u16,
) -> Option<(usize, usize)> {
    let inner_top = editor.y + 1;
    let inner_bottom = editor.y + editor.height.saturating_sub(1);
    if row < inner_top || row >= inner_bottom {
        return None;
    }
    let buf = model.current_buffer();
    let line = buf.scroll() + usize::from(row - inner_top);
    if line >= buf.line_count() {
        return Some((buf.line_count().saturating_sub(1), usize::MAX));
    }
    let text_left = editor.x + 1 + crate::ui::line_number_width(buf.line_count()) + 1;
    let cell = usize::from(col.saturating_sub(text_left));
    Some((line, buf.col_at_cell(line, cell)))
}

fn point_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}
