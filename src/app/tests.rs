use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use tempfile::tempdir;

use crate::editor::Direction;
use crate::pipeline::OutputTitle;

use super::event_loop::ResizeDebouncer;
use super::{App, InputTab, Message, Model, ToastLevel, read_source, update};

fn create_test_model() -> Model {
    Model::new(r#"{"name":"World"}"#, "Hello, $name!", (80, 24))
}

fn create_long_output_model() -> Model {
    Model::new("{}", "#foreach($i in [1..100])\n$i\n#end\n", (80, 24))
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
    MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    }
}

fn apply(model: Model, messages: impl IntoIterator<Item = Message>) -> Model {
    messages.into_iter().fold(model, update)
}

// --- Initial state ---

#[test]
fn test_new_model_starts_on_template_tab_with_rendered_output() {
    let model = create_test_model();
    assert_eq!(model.active_tab, InputTab::Template);
    assert_eq!(model.output.title(), OutputTitle::Result);
    assert_eq!(model.output.text(), "Hello, World!");
}

#[test]
fn test_default_model_shows_empty_data_error() {
    let model = Model::default();
    assert_eq!(model.output.title(), OutputTitle::JsonParseError);
    assert!(model.output.is_error());
}

#[test]
fn test_input_tab_indexes() {
    assert_eq!(InputTab::Data.index(), 0);
    assert_eq!(InputTab::Template.index(), 1);
    assert_eq!(InputTab::from_index(1), Some(InputTab::Template));
    assert_eq!(InputTab::from_index(2), None);
    assert_eq!(InputTab::Data.other(), InputTab::Template);
}

// --- Tabs and theme ---

#[test]
fn test_switch_tab_alternates() {
    let model = update(create_test_model(), Message::SwitchTab);
    assert_eq!(model.active_tab, InputTab::Data);
    let model = update(model, Message::SwitchTab);
    assert_eq!(model.active_tab, InputTab::Template);
}

#[test]
fn test_select_tab_is_idempotent() {
    let model = apply(
        create_test_model(),
        [
            Message::SelectTab(InputTab::Data),
            Message::SelectTab(InputTab::Data),
        ],
    );
    assert_eq!(model.active_tab, InputTab::Data);
}

#[test]
fn test_toggle_theme_flips_and_keeps_output() {
    let model = create_test_model();
    let before = model.output.clone();
    let model = update(model, Message::ToggleTheme);
    assert!(model.dark_mode);
    assert_eq!(model.output, before);
    let model = update(model, Message::ToggleTheme);
    assert!(!model.dark_mode);
}

// --- Editing re-renders ---

#[test]
fn test_editing_data_rerenders_output() {
    let model = apply(
        Model::new("{}", "x", (80, 24)),
        [
            Message::SelectTab(InputTab::Data),
            Message::EditorMoveToEnd,
            Message::EditorDeleteBack,
        ],
    );
    assert_eq!(model.data.text(), "{");
    assert_eq!(model.output.title(), OutputTitle::JsonParseError);

    let model = update(model, Message::EditorInsertChar('}'));
    assert_eq!(model.output.title(), OutputTitle::Result);
    assert_eq!(model.output.text(), "x");
}

#[test]
fn test_editing_template_only_touches_template_buffer() {
    let model = apply(
        create_test_model(),
        [Message::EditorMoveToEnd, Message::EditorInsertChar('!')],
    );
    assert_eq!(model.template.text(), "Hello, $name!!");
    assert_eq!(model.data.text(), r#"{"name":"World"}"#);
    assert_eq!(model.output.text(), "Hello, World!!");
}

#[test]
fn test_template_syntax_error_shows_compile_error() {
    let model = apply(
        Model::new("{}", "", (80, 24)),
        "#set($x = )".chars().map(Message::EditorInsertChar),
    );
    assert_eq!(model.output.title(), OutputTitle::TemplateCompileError);
    assert!(!model.output.text().is_empty());
}

#[test]
fn test_paste_inserts_text_and_rerenders() {
    let model = update(
        Model::new(r#"{"name":"World"}"#, "", (80, 24)),
        Message::EditorInsertStr("Hi $name\r\nbye".to_string()),
    );
    assert_eq!(model.template.text(), "Hi $name\nbye");
    assert_eq!(model.output.text(), "Hi World\nbye");
}

#[test]
fn test_split_line_and_delete_forward() {
    let model = apply(
        create_test_model(),
        [
            Message::EditorMoveTo(0, 6),
            Message::EditorSplitLine,
            Message::EditorMoveCursor(Direction::Up),
            Message::EditorMoveEnd,
            Message::EditorDeleteForward,
        ],
    );
    assert_eq!(model.template.text(), "Hello, $name!");
    assert_eq!(model.output.text(), "Hello, World!");
}

#[test]
fn test_cursor_moves_do_not_change_text() {
    let model = create_test_model();
    let revision = model.template.revision();
    let model = apply(
        model,
        [
            Message::EditorMoveWordRight,
            Message::EditorMoveWordLeft,
            Message::EditorMoveHome,
            Message::EditorMoveToStart,
            Message::EditorMoveCursor(Direction::Right),
        ],
    );
    assert_eq!(model.template.revision(), revision);
    assert_eq!(model.template.cursor().col, 1);
}

#[test]
fn test_cursor_stays_visible_after_move_to_end() {
    let template = "line\n".repeat(100);
    let model = update(
        Model::new("{}", &template, (80, 24)),
        Message::EditorMoveToEnd,
    );
    let rows = model.panes().editor_rows();
    let cursor = model.template.cursor();
    let scroll = model.template.scroll();
    assert_eq!(cursor.line, 100);
    assert!(cursor.line >= scroll && cursor.line < scroll + rows);
}

#[test]
fn test_each_tab_keeps_its_own_cursor() {
    let model = apply(
        create_test_model(),
        [
            Message::EditorMoveToEnd,
            Message::SwitchTab,
            Message::EditorMoveTo(0, 3),
            Message::SwitchTab,
        ],
    );
    assert_eq!(model.template.cursor().col, 13);
    assert_eq!(model.data.cursor().col, 3);
}

// --- Output scrolling ---

#[test]
fn test_output_scroll_is_clamped() {
    let model = create_long_output_model();
    assert_eq!(model.output_line_count(), 100);
    let max = model.max_output_scroll();
    assert_eq!(max, 100 - model.panes().output_rows());

    let model = update(model, Message::OutputScrollDown(500));
    assert_eq!(model.output_scroll, max);
    let model = update(model, Message::OutputScrollUp(1_000));
    assert_eq!(model.output_scroll, 0);
}

#[test]
fn test_output_page_moves_by_pane_height() {
    let model = create_long_output_model();
    let rows = model.panes().output_rows();
    let model = update(model, Message::OutputPageDown);
    assert_eq!(model.output_scroll, rows);
    let model = update(model, Message::OutputPageUp);
    assert_eq!(model.output_scroll, 0);
}

#[test]
fn test_resize_reclamps_output_scroll() {
    let model = update(create_long_output_model(), Message::OutputScrollDown(500));
    let model = update(model, Message::Resize(80, 60));
    assert_eq!(model.terminal_size, (80, 60));
    assert_eq!(model.output_scroll, model.max_output_scroll());
    assert!(model.output_scroll < 81);
}

#[test]
fn test_shorter_output_reclamps_scroll() {
    let model = apply(
        create_long_output_model(),
        [
            Message::OutputScrollDown(50),
            Message::SelectTab(InputTab::Data),
            Message::EditorMoveToEnd,
            Message::EditorDeleteBack,
        ],
    );
    assert_eq!(model.output.title(), OutputTitle::JsonParseError);
    assert!(model.output_line_count() < 100);
    assert!(model.output_scroll <= model.max_output_scroll());
}

// --- Help and quit ---

#[test]
fn test_help_toggle_and_hide() {
    let model = update(create_test_model(), Message::ToggleHelp);
    assert!(model.help_visible);
    let model = update(model, Message::HideHelp);
    assert!(!model.help_visible);
}

#[test]
fn test_quit_sets_flag() {
    let model = update(create_test_model(), Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_reload_message_alone_is_pure_noop() {
    let model = create_test_model();
    let output = model.output.clone();
    let model = update(model, Message::ReloadBuffers);
    assert_eq!(model.output, output);
    assert!(model.active_toast().is_none());
}

// --- Keyboard mapping ---

#[test]
fn test_key_bindings() {
    let model = create_test_model();
    let cases = [
        (ctrl('q'), Some(Message::Quit)),
        (ctrl('c'), Some(Message::Quit)),
        (ctrl('t'), Some(Message::ToggleTheme)),
        (ctrl('r'), Some(Message::ReloadBuffers)),
        (key(KeyCode::F(1)), Some(Message::ToggleHelp)),
        (key(KeyCode::F(2)), Some(Message::SelectTab(InputTab::Data))),
        (key(KeyCode::F(3)), Some(Message::SelectTab(InputTab::Template))),
        (key(KeyCode::Tab), Some(Message::SwitchTab)),
        (key(KeyCode::PageDown), Some(Message::OutputPageDown)),
        (key(KeyCode::Enter), Some(Message::EditorSplitLine)),
        (key(KeyCode::Char('$')), Some(Message::EditorInsertChar('$'))),
        (
            key(KeyCode::Left),
            Some(Message::EditorMoveCursor(Direction::Left)),
        ),
        (
            KeyEvent::new(KeyCode::Right, KeyModifiers::CONTROL),
            Some(Message::EditorMoveWordRight),
        ),
        (
            KeyEvent::new(KeyCode::Home, KeyModifiers::CONTROL),
            Some(Message::EditorMoveToStart),
        ),
        (ctrl('x'), None),
    ];
    for (event, expected) in cases {
        assert_eq!(App::handle_key(event, &model), expected, "{event:?}");
    }
}

#[test]
fn test_any_key_closes_help_but_ctrl_q_still_quits() {
    let model = update(create_test_model(), Message::ToggleHelp);
    assert_eq!(
        App::handle_key(key(KeyCode::Char('a')), &model),
        Some(Message::HideHelp)
    );
    assert_eq!(App::handle_key(ctrl('q'), &model), Some(Message::Quit));
}

#[test]
fn test_paste_event_maps_to_insert_str() {
    let model = create_test_model();
    let mut debouncer = ResizeDebouncer::new(100);
    let msg = App::handle_event(&Event::Paste("$a".to_string()), &model, 0, &mut debouncer);
    assert_eq!(msg, Some(Message::EditorInsertStr("$a".to_string())));
}

#[test]
fn test_resize_event_is_debounced() {
    let model = create_test_model();
    let mut debouncer = ResizeDebouncer::new(100);
    let msg = App::handle_event(&Event::Resize(100, 40), &model, 0, &mut debouncer);
    assert_eq!(msg, None);
    assert!(debouncer.is_pending());
    assert_eq!(debouncer.take_ready(50), None);
    assert_eq!(debouncer.take_ready(100), Some((100, 40)));
    assert!(!debouncer.is_pending());
}

// --- Mouse mapping (80x24: tab strips on row 1, panes from row 2) ---

#[test]
fn test_click_on_tab_selects_it() {
    let model = create_test_model();
    let down = MouseEventKind::Down(MouseButton::Left);
    assert_eq!(
        App::handle_mouse(mouse(down, 3, 1), &model),
        Some(Message::SelectTab(InputTab::Data))
    );
    assert_eq!(
        App::handle_mouse(mouse(down, 15, 1), &model),
        Some(Message::SelectTab(InputTab::Template))
    );
    assert_eq!(App::handle_mouse(mouse(down, 38, 1), &model), None);
}

#[test]
fn test_wheel_scrolls_pane_under_pointer() {
    let model = create_test_model();
    assert_eq!(
        App::handle_mouse(mouse(MouseEventKind::ScrollDown, 60, 10), &model),
        Some(Message::OutputScrollDown(3))
    );
    assert_eq!(
        App::handle_mouse(mouse(MouseEventKind::ScrollUp, 10, 10), &model),
        Some(Message::EditorScrollUp(3))
    );
    assert_eq!(
        App::handle_mouse(mouse(MouseEventKind::ScrollUp, 10, 0), &model),
        None
    );
}

#[test]
fn test_click_in_editor_moves_cursor() {
    let model = Model::new("{}", "hello\nworld", (80, 24));
    // border (1) + gutter (2) + space (1) puts text at column 4; row 2 is the top border.
    let msg = App::handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 7, 4), &model);
    assert_eq!(msg, Some(Message::EditorMoveTo(1, 3)));
}

#[test]
fn test_click_below_text_goes_to_last_line() {
    let model = Model::new("{}", "hello\nworld", (80, 24));
    let msg = App::handle_mouse(
        mouse(MouseEventKind::Down(MouseButton::Left), 7, 12),
        &model,
    );
    assert_eq!(msg, Some(Message::EditorMoveTo(1, usize::MAX)));
    let model = update(model, msg.unwrap());
    assert_eq!(model.template.cursor().col, 5);
}

#[test]
fn test_mouse_ignored_while_help_visible() {
    let model = update(create_test_model(), Message::ToggleHelp);
    assert_eq!(
        App::handle_mouse(mouse(MouseEventKind::ScrollDown, 60, 10), &model),
        None
    );
}

// --- Seeded files and reload ---

#[test]
fn test_read_source_falls_back_without_path() {
    assert_eq!(read_source(None, "sample").unwrap(), "sample");
}

#[test]
fn test_read_source_reports_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    let err = read_source(Some(path.as_path()), "x").unwrap_err();
    assert!(format!("{err:#}").contains("missing.json"));
}

#[test]
fn test_initial_model_uses_samples_without_paths() {
    let model = App::new().with_dark_mode(true).initial_model((80, 24)).unwrap();
    assert!(model.dark_mode);
    assert_eq!(model.data.text(), crate::samples::DEFAULT_DATA);
    assert!(!model.output.is_error());
    assert_eq!(model.source_label(InputTab::Data), "built-in sample");
}

#[test]
fn test_reload_rereads_seeded_files() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.json");
    let template_path = dir.path().join("template.vtl");
    std::fs::write(&data_path, r#"{"n": 1}"#).unwrap();
    std::fs::write(&template_path, "n=$n").unwrap();

    let mut model = App::new()
        .with_data_path(Some(data_path.clone()))
        .with_template_path(Some(template_path))
        .initial_model((80, 24))
        .unwrap();
    assert_eq!(model.output.text(), "n=1");

    std::fs::write(&data_path, r#"{"n": 2}"#).unwrap();
    App::dispatch(&mut model, Message::ReloadBuffers);
    assert_eq!(model.output.text(), "n=2");
    assert_eq!(model.active_toast(), Some(("Reloaded", ToastLevel::Info)));
}

#[test]
fn test_reload_keeps_unseeded_buffer() {
    let dir = tempdir().unwrap();
    let template_path = dir.path().join("template.vtl");
    std::fs::write(&template_path, "one").unwrap();

    let mut model = App::new()
        .with_template_path(Some(template_path.clone()))
        .initial_model((80, 24))
        .unwrap();
    std::fs::write(&template_path, "two").unwrap();
    App::dispatch(&mut model, Message::ReloadBuffers);
    assert_eq!(model.data.text(), crate::samples::DEFAULT_DATA);
    assert_eq!(model.output.text(), "two");
}

#[test]
fn test_reload_failure_shows_error_and_keeps_text() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("data.json");
    std::fs::write(&data_path, "{}").unwrap();

    let mut model = App::new()
        .with_data_path(Some(data_path.clone()))
        .initial_model((80, 24))
        .unwrap();
    std::fs::remove_file(&data_path).unwrap();
    App::dispatch(&mut model, Message::ReloadBuffers);

    assert_eq!(model.data.text(), "{}");
    let (message, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Error);
    assert!(message.starts_with("Reload failed"));
}

#[test]
fn test_reload_without_seeded_files_is_info_only() {
    let mut model = create_test_model();
    App::dispatch(&mut model, Message::ReloadBuffers);
    let (_, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Info);
    assert_eq!(model.output.text(), "Hello, World!");
}

#[test]
fn test_watcher_needs_a_seeded_file() {
    let model = create_test_model();
    assert!(App::make_file_watcher(&model).is_none());
}

#[test]
fn test_toast_expires() {
    let mut model = create_test_model();
    model.show_toast(ToastLevel::Warning, "careful");
    assert!(!model.expire_toast(std::time::Instant::now()));
    let later = std::time::Instant::now() + std::time::Duration::from_secs(5);
    assert!(model.expire_toast(later));
    assert!(model.active_toast().is_none());
}
