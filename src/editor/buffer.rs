use ropey::Rope;
use unicode_width::UnicodeWidthStr;

/// Cursor position in an editor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column (byte offset within the line).
    pub col: usize,
    /// Column to return to when moving vertically through shorter lines.
    col_memory: usize,
}

impl Cursor {
    pub const fn new() -> Self {
        Self::at(0, 0)
    }

    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            col_memory: col,
        }
    }

    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.col_memory = col;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// One editable pane: a rope, a cursor and the first visible line.
///
/// Line endings are normalized to `\n` on the way in, so the rope never holds
/// a `\r` that the cursor arithmetic would have to step around.
#[derive(Clone)]
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    scroll: usize,
    revision: u64,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(&normalize_newlines(text)),
            cursor: Cursor::new(),
            scroll: 0,
            revision: 0,
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Index of the first line shown in the pane.
    pub const fn scroll(&self) -> usize {
        self.scroll
    }

    /// Bumped by every edit that changes the text.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of a line without its trailing newline.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let mut line = self.rope.line(line_idx).to_string();
        if line.ends_with('\n') {
            line.pop();
        }
        Some(line)
    }

    /// Byte length of a line without its trailing newline.
    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole text, keeping the cursor as close as the new text allows.
    pub fn replace_text(&mut self, text: &str) {
        let Cursor { line, col, .. } = self.cursor;
        self.rope = Rope::from_str(&normalize_newlines(text));
        self.cursor = Cursor::new();
        self.move_to(line, col);
        self.scroll = self.scroll.min(self.line_count().saturating_sub(1));
        self.revision += 1;
    }

    /// Terminal cell column of the cursor, for placing the caret.
    pub fn cursor_display_col(&self) -> usize {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let col = floor_char_boundary(&line, self.cursor.col);
        expand_tabs(&line[..col]).width()
    }

    /// Byte column on `line_idx` drawn at terminal cell `cell`, for mouse clicks.
    pub fn col_at_cell(&self, line_idx: usize, cell: usize) -> usize {
        let line = self.line_at(line_idx).unwrap_or_default();
        let mut used = 0;
        for (idx, ch) in line.char_indices() {
            let width = if ch == '\t' {
                4
            } else {
                unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0)
            };
            if used + width > cell {
                return idx;
            }
            used += width;
        }
        line.len()
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.split_line();
            return;
        }
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, ch);
        self.cursor.set_col(self.cursor.col + ch.len_utf8());
        self.revision += 1;
    }

    /// Insert pasted text at the cursor and leave the cursor after it.
    pub fn insert_str(&mut self, s: &str) {
        let s = normalize_newlines(s);
        if s.is_empty() {
            return;
        }
        let char_idx = self.cursor_char_idx();
        self.rope.insert(char_idx, &s);

        match s.rsplit_once('\n') {
            Some((_, last)) => {
                self.cursor.line += s.matches('\n').count();
                self.cursor.set_col(last.len());
            }
            None => self.cursor.set_col(self.cursor.col + s.len()),
        }
        self.revision += 1;
    }

    /// Break the line at the cursor (Enter).
    pub fn split_line(&mut self) {
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, '\n');
        self.cursor.line += 1;
        self.cursor.set_col(0);
        self.revision += 1;
    }

    /// Delete the character before the cursor (Backspace).
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.col == 0 && self.cursor.line == 0 {
            return false;
        }

        let char_idx = self.cursor_char_idx();
        if self.cursor.col == 0 {
            let prev_line_len = self.line_len(self.cursor.line - 1);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.line -= 1;
            self.cursor.set_col(prev_line_len);
        } else {
            let prev_len = self.prev_char_len();
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.set_col(self.cursor.col - prev_len);
        }
        self.revision += 1;
        true
    }

    /// Delete the character under the cursor (Delete).
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_forward(&mut self) -> bool {
        let at_line_end = self.cursor.col >= self.line_len(self.cursor.line);
        if at_line_end && self.cursor.line + 1 >= self.line_count() {
            return false;
        }

        let char_idx = self.cursor_char_idx();
        self.rope.remove(char_idx..=char_idx);
        self.revision += 1;
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Up => self.move_vertical(-1),
            Direction::Down => self.move_vertical(1),
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    pub fn move_end(&mut self) {
        self.cursor.set_col(self.line_len(self.cursor.line));
    }

    /// Jump to the start of the previous word, wrapping to the previous line.
    pub fn move_word_left(&mut self) {
        if self.cursor.col == 0 {
            if self.cursor.line > 0 {
                self.cursor.line -= 1;
                self.move_end();
            }
            return;
        }

        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let before = line[..self.cursor.col].trim_end();
        let start = before
            .rfind(|c: char| !is_word_char(c))
            .map_or(0, |i| i + before[i..].chars().next().map_or(1, char::len_utf8));
        self.cursor.set_col(start);
    }

    /// Jump to the start of the next word, wrapping to the next line.
    pub fn move_word_right(&mut self) {
        let line_len = self.line_len(self.cursor.line);
        if self.cursor.col >= line_len {
            if self.cursor.line + 1 < self.line_count() {
                self.cursor.line += 1;
                self.cursor.set_col(0);
            }
            return;
        }

        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let after = &line[self.cursor.col..];
        let word_end = after.find(|c: char| !is_word_char(c)).unwrap_or(after.len());
        let rest = &after[word_end..];
        let gap = rest.find(is_word_char).unwrap_or(rest.len());
        self.cursor.set_col(self.cursor.col + word_end + gap);
    }

    /// Move to `line`/`col`, clamped to the text.
    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor.line = line.min(self.line_count().saturating_sub(1));
        let text = self.line_at(self.cursor.line).unwrap_or_default();
        self.cursor.set_col(floor_char_boundary(&text, col));
    }

    pub const fn move_to_start(&mut self) {
        self.cursor.line = 0;
        self.cursor.set_col(0);
    }

    pub fn move_to_end(&mut self) {
        self.cursor.line = self.line_count().saturating_sub(1);
        self.move_end();
    }

    /// Scroll by `delta` lines without moving the cursor.
    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.line_count().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    /// Adjust the scroll offset so the cursor line is inside a pane of `height` rows.
    pub const fn ensure_cursor_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor.line < self.scroll {
            self.scroll = self.cursor.line;
        } else if self.cursor.line >= self.scroll + height {
            self.scroll = self.cursor.line + 1 - height;
        }
    }

    fn cursor_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let col = floor_char_boundary(&line, self.cursor.col);
        line_start + line[..col].chars().count()
    }

    fn prev_char_len(&self) -> usize {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line[..floor_char_boundary(&line, self.cursor.col)]
            .chars()
            .next_back()
            .map_or(1, char::len_utf8)
    }

    fn move_left(&mut self) {
        if self.cursor.col > 0 {
            let len = self.prev_char_len();
            self.cursor.set_col(self.cursor.col - len);
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.move_end();
        }
    }

    fn move_right(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        if let Some(next) = line[self.cursor.col.min(line.len())..].chars().next() {
            self.cursor.set_col(self.cursor.col + next.len_utf8());
        } else if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let Some(target) = self.cursor.line.checked_add_signed(delta) else {
            return;
        };
        if target >= self.line_count() {
            return;
        }
        self.cursor.line = target;
        let text = self.line_at(target).unwrap_or_default();
        self.cursor.col = floor_char_boundary(&text, self.cursor.col_memory);
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field("rope", &format_args!("Rope({} lines)", self.rope.len_lines()))
            .field("cursor", &self.cursor)
            .field("scroll", &self.scroll)
            .field("revision", &self.revision)
            .finish()
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Largest char boundary in `s` that is `<= idx`.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Tabs render as four spaces in the editor pane.
pub(crate) fn expand_tabs(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains('\t') {
        std::borrow::Cow::Owned(s.replace('\t', "    "))
    } else {
        std::borrow::Cow::Borrowed(s)
    }
}
