//! Editable message input with auto-resizing height
//!
//! The cursor is tracked as a character index so editing stays UTF-8 safe.
//! Height is recomputed after every edit from the current wrap width: it
//! collapses to one row and grows to the number of visual rows the content
//! and cursor need, up to `max_rows`. Rows are measured in display columns,
//! so wide characters take two.

use unicode_width::UnicodeWidthChar;

pub const DEFAULT_MAX_ROWS: u16 = 6;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Display columns of one character; tabs are drawn as a single space
fn char_columns(c: char) -> usize {
    if c == '\t' {
        1
    } else {
        c.width().unwrap_or(0)
    }
}

/// Visual rows one logical line fills at `width` columns, and the column
/// just past its last character
///
/// A character that does not fit moves to the next row whole.
fn layout_line(line: &str, width: usize) -> (usize, usize) {
    let mut rows = 1;
    let mut col = 0;
    for c in line.chars() {
        let w = char_columns(c);
        if width > 0 && col > 0 && col + w > width {
            rows += 1;
            col = 0;
        }
        col += w;
    }
    (rows, col)
}

#[derive(Debug, Clone)]
pub struct InputField {
    text: String,
    cursor: usize,
    wrap_width: u16,
    max_rows: u16,
    height: u16,
    focused: bool,
}

impl InputField {
    pub fn new(max_rows: u16) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            wrap_width: 0,
            max_rows: max_rows.max(1),
            height: 1,
            focused: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Set the column count the text wraps at; called by the front end on layout
    pub fn set_wrap_width(&mut self, width: u16) {
        if self.wrap_width != width {
            self.wrap_width = width;
            self.on_input();
        }
    }

    /// Recompute the height to fit the content and the cursor
    pub fn on_input(&mut self) {
        let width = self.wrap_width as usize;
        let content_rows: usize = self
            .text
            .split('\n')
            .map(|line| layout_line(line, width).0)
            .sum();
        let cursor_rows = self.cursor_position().0 as usize + 1;
        let rows = content_rows.max(cursor_rows);
        self.height = (rows.min(u16::MAX as usize) as u16).clamp(1, self.max_rows);
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
        self.on_input();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
            self.on_input();
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
            self.on_input();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
        self.on_input();
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
        self.on_input();
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
        self.on_input();
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
        self.on_input();
    }

    /// Empty the field and shrink it back to one row
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.on_input();
    }

    /// Replace the content, placing the cursor at the end
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
        self.on_input();
    }

    /// Visual (row, column) of the cursor at the current wrap width
    ///
    /// A cursor just past a row filled to the edge sits at the start of the
    /// next row, where the following character would be drawn.
    pub fn cursor_position(&self) -> (u16, u16) {
        let width = self.wrap_width as usize;
        let before: String = self.text.chars().take(self.cursor).collect();
        let mut lines = before.split('\n').peekable();
        let mut row = 0usize;
        let mut col = 0usize;

        while let Some(line) = lines.next() {
            let (rows, end) = layout_line(line, width);
            if lines.peek().is_some() {
                row += rows;
            } else {
                row += rows - 1;
                col = end;
                if width > 0 && col >= width {
                    row += 1;
                    col = 0;
                }
            }
        }

        (row.min(u16::MAX as usize) as u16, col.min(u16::MAX as usize) as u16)
    }
}

impl Default for InputField {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROWS)
    }
}
