use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use super::style::Palette;
use super::*;
use crate::app::{InputTab, Message, Model, ToastLevel, update};

fn create_test_terminal() -> Terminal<TestBackend> {
    let backend = TestBackend::new(80, 24);
    Terminal::new(backend).unwrap()
}

fn draw(model: &Model) -> Buffer {
    let mut terminal = create_test_terminal();
    terminal.draw(|frame| render(model, frame)).unwrap();
    terminal.backend().buffer().clone()
}

fn row_text(buffer: &Buffer, y: u16) -> String {
    (0..buffer.area.width)
        .map(|x| buffer[(x, y)].symbol())
        .collect()
}

fn screen_text(buffer: &Buffer) -> String {
    (0..buffer.area.height)
        .map(|y| row_text(buffer, y))
        .collect::<Vec<_>>()
        .join("\n")
}

fn create_test_model() -> Model {
    Model::new(r#"{"name":"World"}"#, "Hello, $name!", (80, 24))
}

#[test]
fn test_split_panes_layout() {
    let panes = split_panes(Rect::new(0, 0, 80, 24), false);
    assert_eq!(panes.top_bar, Rect::new(0, 0, 80, 1));
    assert_eq!(panes.input_tabs, Rect::new(0, 1, 40, 1));
    assert_eq!(panes.editor, Rect::new(0, 2, 40, 21));
    assert_eq!(panes.output_tabs, Rect::new(40, 1, 40, 1));
    assert_eq!(panes.output, Rect::new(40, 2, 40, 21));
    assert_eq!(panes.status, Rect::new(0, 23, 80, 1));
    assert_eq!(panes.toast, None);
    assert_eq!(panes.editor_rows(), 19);
}

#[test]
fn test_split_panes_reserves_toast_row() {
    let panes = split_panes(Rect::new(0, 0, 80, 24), true);
    assert_eq!(panes.toast, Some(Rect::new(0, 22, 80, 1)));
    assert_eq!(panes.status, Rect::new(0, 23, 80, 1));
    assert_eq!(panes.editor.height, 20);
}

#[test]
fn test_input_tab_hit_testing() {
    let area = Rect::new(0, 1, 40, 1);
    assert_eq!(input_tab_at(area, 0), Some(InputTab::Data));
    assert_eq!(input_tab_at(area, 10), Some(InputTab::Data));
    assert_eq!(input_tab_at(area, 11), None);
    assert_eq!(input_tab_at(area, 12), Some(InputTab::Template));
    assert_eq!(input_tab_at(area, 25), Some(InputTab::Template));
    assert_eq!(input_tab_at(area, 26), None);
}

#[test]
fn test_line_number_width() {
    assert_eq!(line_number_width(1), 2);
    assert_eq!(line_number_width(99), 2);
    assert_eq!(line_number_width(100), 3);
    assert_eq!(line_number_width(12_345), 5);
}

#[test]
fn test_render_shows_title_tabs_and_result() {
    let buffer = draw(&create_test_model());
    assert!(row_text(&buffer, 0).contains(APP_TITLE));
    let tabs = row_text(&buffer, 1);
    assert!(tabs.contains("data.json"));
    assert!(tabs.contains("template.vtl"));
    assert!(tabs.contains("Result"));
    let screen = screen_text(&buffer);
    assert!(screen.contains("Hello, World!"));
    assert!(screen.contains("Hello, $name!"));
}

#[test]
fn test_render_shows_line_numbers_and_source_label() {
    let buffer = draw(&create_test_model());
    assert!(row_text(&buffer, 2).contains("built-in sample"));
    assert!(row_text(&buffer, 3).starts_with("│ 1 Hello"));
}

#[test]
fn test_render_data_tab_shows_data_buffer() {
    let model = update(create_test_model(), Message::SelectTab(InputTab::Data));
    let buffer = draw(&model);
    assert!(row_text(&buffer, 3).contains(r#"{"name":"World"}"#));
    assert!(row_text(&buffer, 23).contains("data.json"));
}

#[test]
fn test_error_output_uses_danger_border_and_title() {
    let model = Model::new("{invalid", "$x", (80, 24));
    let buffer = draw(&model);
    let palette = Palette::light();

    assert!(row_text(&buffer, 1).contains("JSON Parse Error"));
    // Top-left corner of the output block.
    assert_eq!(buffer[(40, 2)].fg, palette.danger);
    // Editor block keeps the normal border.
    assert_eq!(buffer[(0, 2)].fg, palette.border);
}

#[test]
fn test_result_output_uses_normal_border() {
    let buffer = draw(&create_test_model());
    assert_eq!(buffer[(40, 2)].fg, Palette::light().border);
}

#[test]
fn test_dark_mode_switches_palette() {
    let model = update(create_test_model(), Message::ToggleTheme);
    let buffer = draw(&model);
    assert_eq!(buffer[(10, 10)].bg, Palette::dark().background);
    assert!(row_text(&buffer, 0).contains("Dark"));

    let buffer = draw(&create_test_model());
    assert_eq!(buffer[(10, 10)].bg, Palette::light().background);
    assert!(row_text(&buffer, 0).contains("Light"));
}

#[test]
fn test_cursor_cell_is_highlighted() {
    let model = update(create_test_model(), Message::EditorMoveTo(0, 7));
    let buffer = draw(&model);
    // border + "1" padded to two columns + space = text starts at x=4
    let cell = &buffer[(4 + 7, 3)];
    assert_eq!(cell.symbol(), "$");
    assert_eq!(cell.bg, Palette::light().cursor_background);
}

#[test]
fn test_cursor_on_multibyte_line_does_not_panic() {
    let model = update(
        Model::new("{}", "caf\u{e9} \u{65e5}\u{672c}", (80, 24)),
        Message::EditorMoveToEnd,
    );
    let buffer = draw(&model);
    assert!(row_text(&buffer, 3).contains("caf\u{e9}"));
}

#[test]
fn test_status_bar_shows_cursor_position() {
    let model = update(create_test_model(), Message::EditorMoveTo(0, 7));
    let buffer = draw(&model);
    let status = row_text(&buffer, 23);
    assert!(status.contains("template.vtl"));
    assert!(status.contains("Ln 1, Col 8"));
}

#[test]
fn test_toast_renders_above_status() {
    let mut model = create_test_model();
    model.show_toast(ToastLevel::Error, "Reload failed: boom");
    let buffer = draw(&model);
    assert!(row_text(&buffer, 22).contains("[error] Reload failed: boom"));
    assert!(row_text(&buffer, 23).contains("Ln 1"));
}

#[test]
fn test_help_overlay_lists_keys() {
    let model = update(create_test_model(), Message::ToggleHelp);
    let screen = screen_text(&draw(&model));
    assert!(screen.contains("Help"));
    assert!(screen.contains("Toggle light / dark"));
    assert!(screen.contains("Local override"));
}

#[test]
fn test_output_scroll_hides_first_lines() {
    let model = Model::new("{}", "#foreach($i in [1..50])\nrow $i\n#end\n", (80, 24));
    let model = update(model, Message::OutputScrollDown(10));
    let screen = screen_text(&draw(&model));
    assert!(!screen.contains("row 1 "));
    assert!(screen.contains("row 11"));
}

#[test]
fn test_render_survives_tiny_terminal() {
    let model = update(create_test_model(), Message::Resize(10, 3));
    let mut terminal = Terminal::new(TestBackend::new(10, 3)).unwrap();
    terminal.draw(|frame| render(&model, frame)).unwrap();
}
