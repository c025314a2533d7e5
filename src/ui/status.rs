use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::app::{Model, ToastLevel};

use super::APP_TITLE;
use super::style::Palette;

pub fn render_top_bar(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let indicator = if model.dark_mode {
        " \u{263e} Dark  Ctrl+T "
    } else {
        " \u{2600} Light  Ctrl+T "
    };
    let indicator_width = u16::try_from(indicator.width()).unwrap_or(u16::MAX);
    let [title_area, theme_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(indicator_width)]).areas(area);

    let title = Paragraph::new(Span::styled(
        format!(" {APP_TITLE}"),
        palette.bar().add_modifier(Modifier::BOLD),
    ))
    .style(palette.bar());
    frame.render_widget(title, title_area);
    frame.render_widget(Paragraph::new(indicator).style(palette.bar()), theme_area);
}

pub fn render_status_bar(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let buf = model.current_buffer();
    let cursor = buf.cursor();
    let watch_indicator = if model.watch_enabled {
        " [watching]"
    } else {
        ""
    };
    let strict_indicator = if model.engine.options().strict {
        " [strict]"
    } else {
        ""
    };

    let status = format!(
        " {}  Ln {}, Col {}{}{}  Tab:switch  F1:help  Ctrl+Q:quit",
        model.active_tab.label(),
        cursor.line + 1,
        buf.cursor_display_col() + 1,
        watch_indicator,
        strict_indicator,
    );
    frame.render_widget(Paragraph::new(status).style(palette.bar()), area);
}

pub fn render_toast_bar(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let prefix = match level {
        ToastLevel::Info => "[info]",
        ToastLevel::Warning => "[warn]",
        ToastLevel::Error => "[error]",
    };
    let toast = Paragraph::new(format!(" {prefix} {message}")).style(palette.toast(level));
    frame.render_widget(toast, area);
}
