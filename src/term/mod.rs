//! Terminal emulation
//!
//! A byte-stream-driven emulator maintaining a scrollable character grid:
//!
//! - **state**: screen buffer, cursor, cell attributes
//! - **parser**: ANSI/VT escape sequence interpreter
//!
//! [`TerminalEmulator`] ties the two together and adds the revision counter
//! hosts use to detect changes without diffing the grid.

pub mod parser;
pub mod state;

pub use parser::VtParser;
pub use state::{AttrFlags, Cell, CellAttrs, Color, Row, ScreenState};

/// Stateful terminal emulator.
///
/// Consumes raw shell output via [`append`](Self::append) and exposes the
/// resulting grid for rendering. Not synchronized: the owner serializes
/// `append`/`resize`/`clear` (the session wraps it in a mutex).
pub struct TerminalEmulator {
    state: ScreenState,
    parser: VtParser,
    revision: u64,
    /// Incomplete UTF-8 tail carried over from the previous append.
    pending: Vec<u8>,
}

impl TerminalEmulator {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            state: ScreenState::new(rows, cols),
            parser: VtParser::new(),
            revision: 0,
            pending: Vec::new(),
        }
    }

    /// Feed raw shell output into the emulator.
    ///
    /// Byte-at-a-time through the parser for control and ASCII input;
    /// multi-byte UTF-8 sequences are decoded and printed directly. A
    /// sequence split across chunks is buffered, so appending is
    /// chunk-boundary independent.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let buf: Vec<u8>;
        let input = if self.pending.is_empty() {
            bytes
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            buf = joined;
            &buf
        };

        let mut i = 0;
        while i < input.len() {
            let b = input[i];

            // Control bytes and ASCII go through the parser
            if b < 0x80 {
                self.parser.feed(b, &mut self.state);
                i += 1;
                continue;
            }

            // UTF-8 multi-byte sequence
            let seq_len = if b & 0xE0 == 0xC0 {
                2
            } else if b & 0xF0 == 0xE0 {
                3
            } else if b & 0xF8 == 0xF0 {
                4
            } else {
                // Stray continuation byte; drop it
                i += 1;
                continue;
            };

            if i + seq_len > input.len() {
                // Incomplete tail; finish it on the next append
                self.pending = input[i..].to_vec();
                break;
            }

            match std::str::from_utf8(&input[i..i + seq_len]) {
                Ok(s) => {
                    for ch in s.chars() {
                        self.state.put_char(ch);
                    }
                    i += seq_len;
                }
                Err(_) => {
                    // Malformed sequence; skip the lead byte and resync
                    i += 1;
                }
            }
        }

        self.revision += 1;
    }

    /// Resize the grid. A call with the current dimensions is a no-op and
    /// does not bump the revision, since hosts call this on every layout
    /// pass.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if self.state.resize(rows, cols) {
            self.revision += 1;
        }
    }

    /// Blank the screen, home the cursor, reset the parser and revision.
    pub fn clear(&mut self) {
        self.state.clear();
        self.parser.reset();
        self.pending.clear();
        self.revision = 0;
    }

    pub fn rows(&self) -> usize {
        self.state.rows
    }

    pub fn cols(&self) -> usize {
        self.state.cols
    }

    /// Renderable lines, top to bottom.
    pub fn lines(&self) -> &[Row] {
        &self.state.lines
    }

    /// Plain text of one line, trailing blanks trimmed.
    pub fn line_text(&self, row: usize) -> String {
        self.state.lines.get(row).map(Row::text).unwrap_or_default()
    }

    /// Cursor position as (row, col).
    pub fn cursor(&self) -> (usize, usize) {
        // The screen keeps a deferred-wrap column one past the edge; clamp
        // for observers so the invariant holds at the boundary.
        (
            self.state.cursor_row,
            self.state.cursor_col.min(self.state.cols - 1),
        )
    }

    /// Monotonic change counter. Reset only by [`clear`](Self::clear).
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
