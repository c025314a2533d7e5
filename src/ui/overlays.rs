use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;

use super::style::Palette;

pub fn render_help_overlay(model: &Model, palette: &Palette, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(2).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = palette.base().fg(palette.accent).add_modifier(Modifier::BOLD);
    let dim_style = palette.base().fg(palette.muted);

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::styled("Panes", section_style));
    lines.push(Line::raw("  Tab                 Switch data.json / template.vtl"));
    lines.push(Line::raw("  F2 / F3             Edit data.json / template.vtl"));
    lines.push(Line::raw("  PageUp/PageDown     Scroll output"));
    lines.push(Line::raw("  Mouse wheel         Scroll the pane under the pointer"));
    lines.push(Line::raw("  Click               Select tab, place cursor"));

    lines.push(Line::styled("Editor", section_style));
    lines.push(Line::raw("  Arrows, Home/End    Navigate"));
    lines.push(Line::raw("  Ctrl+Left/Right     Word movement"));
    lines.push(Line::raw("  Ctrl+Home/End       Buffer start / end"));
    lines.push(Line::raw("  Paste               Insert clipboard text"));

    lines.push(Line::styled("Other", section_style));
    lines.push(Line::raw("  Ctrl+T              Toggle light / dark"));
    lines.push(Line::raw("  Ctrl+R              Reload --data / --template files"));
    lines.push(Line::raw("  Ctrl+Q / Ctrl+C     Quit"));
    lines.push(Line::raw("  F1                  Toggle help"));

    lines.push(Line::styled("Config", section_style));
    lines.push(Line::raw(format!("  Global: {global_cfg}")));
    lines.push(Line::raw(format!("  Local override: {local_cfg}")));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(palette.border(false))
        .padding(Padding::horizontal(1))
        .style(palette.base());
    let inner = block.inner(popup);

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    let [content_area, footer_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);
    frame.render_widget(Paragraph::new(lines).style(palette.base()), content_area);
    frame.render_widget(
        Paragraph::new(Line::styled("any key closes", dim_style)),
        footer_area,
    );
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
