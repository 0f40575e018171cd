//! Terminal screen state
//!
//! Fixed-size grid of styled cells plus cursor position. Mutated only by the
//! escape-sequence parser and by explicit resize/clear requests; the cursor
//! is clamped to bounds after every operation.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

/// Screen state holding the cell grid and cursor.
pub struct ScreenState {
    pub rows: usize,
    pub cols: usize,
    pub lines: Vec<Row>,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub current_attrs: CellAttrs,
}

impl ScreenState {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            lines: (0..rows).map(|_| Row::new(cols)).collect(),
            cursor_row: 0,
            cursor_col: 0,
            current_attrs: CellAttrs::default(),
        }
    }

    /// Put a character at the cursor, wrapping and scrolling as needed.
    pub fn put_char(&mut self, ch: char) {
        let width = ch.width().unwrap_or(0);
        if width == 0 {
            // Combining/zero-width - no cell of its own
            return;
        }

        // Deferred wrap: the cursor may rest one past the last column after
        // a full line; wrap only when the next glyph actually arrives.
        if self.cursor_col + width > self.cols {
            self.cursor_col = 0;
            self.advance_row();
        }

        let (row, col) = (self.cursor_row, self.cursor_col);
        self.lines[row].cells[col] = Cell {
            ch,
            width: width as u8,
            attrs: self.current_attrs,
        };
        if width == 2 && col + 1 < self.cols {
            self.lines[row].cells[col + 1] = Cell::continuation(self.current_attrs);
        }

        self.cursor_col += width;
    }

    /// Move cursor to column 0.
    pub fn carriage_return(&mut self) {
        self.cursor_col = 0;
    }

    /// Move cursor down one row, scrolling at the bottom. The column is left
    /// untouched; shells send `\r\n` when they want a fresh line.
    pub fn linefeed(&mut self) {
        self.advance_row();
    }

    fn advance_row(&mut self) {
        if self.cursor_row + 1 >= self.rows {
            self.scroll_up();
        } else {
            self.cursor_row += 1;
        }
    }

    /// Discard the top row and append a blank one at the bottom.
    pub fn scroll_up(&mut self) {
        self.lines.remove(0);
        self.lines.push(Row::new(self.cols));
    }

    /// Move cursor left one column. No erase.
    pub fn backspace(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        }
    }

    /// Move to the next tab stop (every 8 columns).
    pub fn horizontal_tab(&mut self) {
        self.cursor_col = ((self.cursor_col / 8) + 1) * 8;
        if self.cursor_col >= self.cols {
            self.cursor_col = self.cols - 1;
        }
    }

    pub fn cursor_up(&mut self, n: usize) {
        self.cursor_row = self.cursor_row.saturating_sub(n);
    }

    pub fn cursor_down(&mut self, n: usize) {
        self.cursor_row = (self.cursor_row + n).min(self.rows - 1);
    }

    pub fn cursor_forward(&mut self, n: usize) {
        self.cursor_col = (self.cursor_col + n).min(self.cols - 1);
    }

    pub fn cursor_backward(&mut self, n: usize) {
        self.cursor_col = self.cursor_col.saturating_sub(n);
    }

    /// Set cursor position from 1-indexed CSI parameters, clamped.
    pub fn cursor_position(&mut self, row: usize, col: usize) {
        self.cursor_row = row.saturating_sub(1).min(self.rows - 1);
        self.cursor_col = col.saturating_sub(1).min(self.cols - 1);
    }

    /// Erase in display. Mode 2 (and 3) clears everything and homes the
    /// cursor.
    pub fn erase_in_display(&mut self, mode: usize) {
        let attrs = self.current_attrs;
        match mode {
            0 => {
                self.erase_in_line(0);
                for r in (self.cursor_row + 1)..self.rows {
                    self.lines[r].clear(attrs);
                }
            }
            1 => {
                for r in 0..self.cursor_row {
                    self.lines[r].clear(attrs);
                }
                self.erase_in_line(1);
            }
            2 | 3 => {
                for line in &mut self.lines {
                    line.clear(attrs);
                }
                self.cursor_row = 0;
                self.cursor_col = 0;
            }
            _ => {}
        }
    }

    /// Erase in line: 0 = cursor to end, 1 = start to cursor, 2 = whole line.
    pub fn erase_in_line(&mut self, mode: usize) {
        let attrs = self.current_attrs;
        let row = self.cursor_row;
        let col = self.cursor_col.min(self.cols - 1);
        let line = &mut self.lines[row];
        match mode {
            0 => {
                for cell in &mut line.cells[col..] {
                    cell.clear(attrs);
                }
            }
            1 => {
                for cell in &mut line.cells[..=col] {
                    cell.clear(attrs);
                }
            }
            2 => line.clear(attrs),
            _ => {}
        }
    }

    /// Resize the grid, keeping content top-left aligned and the cursor in
    /// bounds. Returns false when the dimensions are unchanged.
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if rows == self.rows && cols == self.cols {
            return false;
        }

        self.lines.truncate(rows);
        while self.lines.len() < rows {
            self.lines.push(Row::new(cols));
        }
        for line in &mut self.lines {
            line.resize(cols);
        }

        self.rows = rows;
        self.cols = cols;
        self.cursor_row = self.cursor_row.min(rows - 1);
        self.cursor_col = self.cursor_col.min(cols - 1);
        true
    }

    /// Blank every cell and home the cursor. Attributes reset too.
    pub fn clear(&mut self) {
        self.current_attrs = CellAttrs::default();
        for line in &mut self.lines {
            line.clear(CellAttrs::default());
        }
        self.cursor_row = 0;
        self.cursor_col = 0;
    }
}

/// A single screen row.
#[derive(Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
        }
    }

    pub fn resize(&mut self, cols: usize) {
        self.cells.resize(cols, Cell::default());
    }

    pub fn clear(&mut self, attrs: CellAttrs) {
        for cell in &mut self.cells {
            cell.clear(attrs);
        }
    }

    /// Plain text of the row with trailing blanks trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for cell in &self.cells {
            if !cell.is_continuation() {
                out.push(cell.ch);
            }
        }
        while out.ends_with(' ') {
            out.pop();
        }
        out
    }
}

/// A single styled cell.
#[derive(Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub width: u8,
    pub attrs: CellAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            width: 1,
            attrs: CellAttrs::default(),
        }
    }
}

impl Cell {
    pub fn clear(&mut self, attrs: CellAttrs) {
        self.ch = ' ';
        self.width = 1;
        self.attrs = attrs;
    }

    /// Right half of a wide character.
    pub fn continuation(attrs: CellAttrs) -> Self {
        Self {
            ch: ' ',
            width: 0,
            attrs,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }
}

/// Cell attributes: foreground color plus style flags.
#[derive(Clone, Copy, Default, PartialEq)]
pub struct CellAttrs {
    pub fg: Color,
    pub flags: AttrFlags,
}

impl CellAttrs {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Foreground color.
#[derive(Clone, Copy, PartialEq, Default, Debug)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
}

bitflags! {
    #[derive(Clone, Copy, Default, PartialEq, Debug)]
    pub struct AttrFlags: u8 {
        const BOLD      = 0b0001;
        const UNDERLINE = 0b0010;
        const INVERSE   = 0b0100;
    }
}
