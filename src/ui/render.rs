use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::app::{InputTab, Model};
use crate::editor::expand_tabs;

use super::style::Palette;
use super::{overlays, status};

/// Blank columns between two tab labels.
const TAB_GAP: u16 = 1;

/// Screen regions, top to bottom and left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panes {
    pub top_bar: Rect,
    pub input_tabs: Rect,
    /// Bordered editor block (borders included).
    pub editor: Rect,
    pub output_tabs: Rect,
    /// Bordered output block (borders included).
    pub output: Rect,
    pub toast: Option<Rect>,
    pub status: Rect,
}

impl Panes {
    /// Rows of text visible inside the editor block.
    pub const fn editor_rows(&self) -> usize {
        self.editor.height.saturating_sub(2) as usize
    }

    /// Rows of text visible inside the output block.
    pub const fn output_rows(&self) -> usize {
        self.output.height.saturating_sub(2) as usize
    }
}

pub fn split_panes(area: Rect, toast_active: bool) -> Panes {
    let footer_rows = 1 + u16::from(toast_active);
    let [top_bar, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(footer_rows),
    ])
    .areas(area);
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
    let [input_tabs, editor] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(left);
    let [output_tabs, output] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(right);

    let status = Rect {
        y: footer.y + footer.height.saturating_sub(1),
        height: footer.height.min(1),
        ..footer
    };
    let toast = toast_active.then_some(Rect {
        height: footer.height.saturating_sub(1),
        ..footer
    });

    Panes {
        top_bar,
        input_tabs,
        editor,
        output_tabs,
        output,
        toast,
        status,
    }
}

/// The input tab drawn under `column` in the tab strip at `area`.
pub fn input_tab_at(area: Rect, column: u16) -> Option<InputTab> {
    let mut x = area.x;
    for tab in InputTab::ALL {
        let width = tab_width(tab.label());
        if column >= x && column < x.saturating_add(width) {
            return Some(tab);
        }
        x = x.saturating_add(width + TAB_GAP);
    }
    None
}

fn tab_width(label: &str) -> u16 {
    u16::try_from(label.width() + 2).unwrap_or(u16::MAX)
}

/// Render the complete UI.
pub fn render(model: &Model, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_mode(model.dark_mode);
    frame.render_widget(Block::default().style(palette.base()), area);

    let panes = split_panes(area, model.active_toast().is_some());
    status::render_top_bar(model, &palette, frame, panes.top_bar);
    render_input_tabs(model, &palette, frame, panes.input_tabs);
    render_editor(model, &palette, frame, panes.editor);
    render_output_tab(model, &palette, frame, panes.output_tabs);
    render_output(model, &palette, frame, panes.output);
    if let Some(toast_area) = panes.toast {
        status::render_toast_bar(model, &palette, frame, toast_area);
    }
    status::render_status_bar(model, &palette, frame, panes.status);

    if model.help_visible {
        overlays::render_help_overlay(model, &palette, frame, area);
    }
}

fn render_input_tabs(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mut spans = Vec::new();
    for tab in InputTab::ALL {
        if !spans.is_empty() {
            spans.push(Span::styled(" ".repeat(TAB_GAP as usize), palette.base()));
        }
        spans.push(Span::styled(
            format!(" {} ", tab.label()),
            palette.tab(tab == model.active_tab, false),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(palette.base()), area);
}

fn render_editor(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let buf = model.current_buffer();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(false))
        .title(Span::styled(
            format!(" {} ", model.source_label(model.active_tab)),
            palette.gutter(),
        ))
        .style(palette.base());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let total_lines = buf.line_count();
    let gutter_width = line_number_width(total_lines) as usize;
    let start = buf.scroll();
    let end = (start + inner.height as usize).min(total_lines);
    let cursor = buf.cursor();

    let content: Vec<Line> = (start..end)
        .map(|line_idx| {
            let text = buf.line_at(line_idx).unwrap_or_default();
            let mut spans = vec![Span::styled(
                format!("{:>gutter_width$} ", line_idx + 1),
                palette.gutter(),
            )];
            if line_idx == cursor.line {
                spans.extend(cursor_spans(&text, cursor.col, palette));
            } else {
                spans.push(Span::raw(expand_tabs(&text).into_owned()));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(content).style(palette.base()), inner);
}

/// Split the cursor line so the character under the cursor is highlighted.
fn cursor_spans(text: &str, col: usize, palette: &Palette) -> Vec<Span<'static>> {
    let col = col.min(text.len());
    let (before, rest) = text.split_at(col);
    let mut chars = rest.chars();
    let (under, tail_pad) = match chars.next() {
        Some('\t') => (" ".to_string(), "   "),
        Some(ch) => (ch.to_string(), ""),
        None => (" ".to_string(), ""),
    };
    let after = format!("{tail_pad}{}", expand_tabs(chars.as_str()));

    let mut spans = Vec::with_capacity(3);
    if !before.is_empty() {
        spans.push(Span::raw(expand_tabs(before).into_owned()));
    }
    spans.push(Span::styled(under, palette.cursor()));
    if !after.is_empty() {
        spans.push(Span::raw(after));
    }
    spans
}

fn render_output_tab(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let label = Span::styled(
        format!(" {} ", model.output.title()),
        palette.tab(true, model.output.is_error()),
    );
    frame.render_widget(Paragraph::new(Line::from(label)).style(palette.base()), area);
}

fn render_output(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let is_error = model.output.is_error();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(is_error))
        .style(palette.base());
    let text_style = if is_error {
        palette.base().fg(palette.danger)
    } else {
        palette.base()
    };
    let scroll = u16::try_from(model.output_scroll).unwrap_or(u16::MAX);
    let output = Paragraph::new(expand_tabs(model.output.text()).into_owned())
        .style(text_style)
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(output, area);
}

/// Calculate the width needed for line numbers.
pub const fn line_number_width(total_lines: usize) -> u16 {
    let mut width = 1;
    let mut rest = total_lines / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    if width < 2 { 2 } else { width }
}
