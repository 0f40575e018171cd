//! VT sequence parser
//!
//! Interprets the control bytes and CSI sequences common shells emit and
//! updates the screen state. Anything unrecognized is dropped on the floor:
//! the parser always falls back to ground rather than wedging.

use super::state::{AttrFlags, Color, ScreenState};

/// Parser state machine.
pub struct VtParser {
    state: ParserState,
    params: Vec<usize>,
    current_param: Option<usize>,
    private: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Debug)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    Csi,
}

impl Default for VtParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VtParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            params: Vec::with_capacity(8),
            current_param: None,
            private: false,
        }
    }

    /// Reset to ground, discarding any half-collected sequence.
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.params.clear();
        self.current_param = None;
        self.private = false;
    }

    /// Feed a single control or ASCII byte to the parser.
    ///
    /// Printable non-ASCII text goes through [`ScreenState::put_char`]
    /// directly; the emulator routes only byte-at-a-time input here.
    pub fn feed(&mut self, byte: u8, state: &mut ScreenState) {
        match self.state {
            ParserState::Ground => self.ground(byte, state),
            ParserState::Escape => self.escape(byte),
            ParserState::Csi => self.csi(byte, state),
        }
    }

    fn ground(&mut self, byte: u8, state: &mut ScreenState) {
        match byte {
            0x1B => {
                self.state = ParserState::Escape;
                self.params.clear();
                self.current_param = None;
                self.private = false;
            }
            0x0A => state.linefeed(),
            0x0D => state.carriage_return(),
            0x08 => state.backspace(),
            0x09 => state.horizontal_tab(),
            0x20..=0x7E => state.put_char(byte as char),
            // Remaining C0 controls (BEL and friends) are ignored.
            _ => {}
        }
    }

    fn escape(&mut self, byte: u8) {
        if byte == b'[' {
            self.state = ParserState::Csi;
        } else {
            // Unsupported escape; drop it and recover.
            tracing::debug!("ignoring ESC {:?}", byte as char);
            self.state = ParserState::Ground;
        }
    }

    fn csi(&mut self, byte: u8, state: &mut ScreenState) {
        match byte {
            b'0'..=b'9' => {
                let digit = (byte - b'0') as usize;
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            b';' => {
                self.params.push(self.current_param.take().unwrap_or(0));
            }
            b'?' | b'>' => {
                // DEC private / secondary marker; the whole sequence is
                // collected and then skipped so it never prints as text.
                self.private = true;
            }
            0x40..=0x7E => {
                if let Some(p) = self.current_param.take() {
                    self.params.push(p);
                }
                if self.private {
                    tracing::debug!(
                        "ignoring private CSI: params={:?}, final={:?}",
                        self.params,
                        byte as char
                    );
                } else {
                    self.dispatch_csi(byte, state);
                }
                self.state = ParserState::Ground;
                self.params.clear();
            }
            _ => {
                // Byte outside the parameter/final class: abort the sequence.
                tracing::debug!("aborting CSI on byte 0x{:02x}", byte);
                self.state = ParserState::Ground;
            }
        }
    }

    fn dispatch_csi(&mut self, final_byte: u8, state: &mut ScreenState) {
        let params = &self.params;
        let count = params.first().copied().unwrap_or(1).max(1);

        match final_byte {
            b'A' => state.cursor_up(count),
            b'B' => state.cursor_down(count),
            b'C' => state.cursor_forward(count),
            b'D' => state.cursor_backward(count),
            b'H' | b'f' => {
                let row = params.first().copied().unwrap_or(1);
                let col = params.get(1).copied().unwrap_or(1);
                state.cursor_position(row, col);
            }
            b'J' => state.erase_in_display(params.first().copied().unwrap_or(0)),
            b'K' => state.erase_in_line(params.first().copied().unwrap_or(0)),
            b'm' => Self::execute_sgr(params, state),
            _ => {
                tracing::debug!(
                    "unknown CSI: params={:?}, final={:?}",
                    params,
                    final_byte as char
                );
            }
        }
    }

    fn execute_sgr(params: &[usize], state: &mut ScreenState) {
        if params.is_empty() {
            state.current_attrs.reset();
            return;
        }

        let mut iter = params.iter();
        while let Some(&param) = iter.next() {
            match param {
                0 => state.current_attrs.reset(),
                1 => state.current_attrs.flags |= AttrFlags::BOLD,
                4 => state.current_attrs.flags |= AttrFlags::UNDERLINE,
                7 => state.current_attrs.flags |= AttrFlags::INVERSE,
                22 => state.current_attrs.flags &= !AttrFlags::BOLD,
                24 => state.current_attrs.flags &= !AttrFlags::UNDERLINE,
                27 => state.current_attrs.flags &= !AttrFlags::INVERSE,
                30..=37 => state.current_attrs.fg = Color::Indexed((param - 30) as u8),
                38 => {
                    // Extended color: consume its arguments but keep only
                    // the 256-color form, which shells actually use.
                    match iter.next() {
                        Some(&5) => {
                            if let Some(&n) = iter.next() {
                                state.current_attrs.fg = Color::Indexed(n as u8);
                            }
                        }
                        Some(&2) => {
                            // RGB: skip r, g, b
                            for _ in 0..3 {
                                iter.next();
                            }
                        }
                        _ => {}
                    }
                }
                39 => state.current_attrs.fg = Color::Default,
                90..=97 => state.current_attrs.fg = Color::Indexed((param - 90 + 8) as u8),
                _ => {}
            }
        }
    }
}
