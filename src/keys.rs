//! Key encoding for shell input
//!
//! Converts logical key intents to the byte sequences a shell expects.
//! Ctrl and Alt are one-shot "armed" flags supplied by the caller; encoding
//! reports which of them it consumed so the caller can clear them.

/// A logical key event from the host layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyIntent {
    /// Literal text input.
    Text(String),
    Enter,
    Backspace,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// Arm/disarm Ctrl for the next keystroke. Produces no bytes.
    CtrlToggle,
    /// Arm/disarm Alt for the next keystroke. Produces no bytes.
    AltToggle,
}

/// Result of encoding one intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBytes {
    pub bytes: Vec<u8>,
    pub consumed_ctrl: bool,
    pub consumed_alt: bool,
}

impl KeyBytes {
    fn none() -> Self {
        Self {
            bytes: Vec::new(),
            consumed_ctrl: false,
            consumed_alt: false,
        }
    }
}

/// Key encoder for converting intents to bytes.
pub struct KeyEncoder;

impl KeyEncoder {
    /// Encode an intent under the given modifier flags.
    ///
    /// Toggles return empty bytes and consume nothing; the caller flips the
    /// flag itself. Every other intent consumes whichever modifiers were
    /// armed, even when no transformation applies (a Ctrl that cannot be
    /// mapped is deliberately a pass-through rather than a stuck flag).
    pub fn encode(intent: &KeyIntent, ctrl_armed: bool, alt_armed: bool) -> KeyBytes {
        if matches!(intent, KeyIntent::CtrlToggle | KeyIntent::AltToggle) {
            return KeyBytes::none();
        }

        let mut bytes = match intent {
            KeyIntent::Text(text) => Self::encode_text(text, ctrl_armed),
            KeyIntent::Enter => vec![0x0A],
            KeyIntent::Backspace => vec![0x7F],
            KeyIntent::Tab => vec![0x09],
            KeyIntent::ArrowUp => b"\x1b[A".to_vec(),
            KeyIntent::ArrowDown => b"\x1b[B".to_vec(),
            KeyIntent::ArrowLeft => b"\x1b[D".to_vec(),
            KeyIntent::ArrowRight => b"\x1b[C".to_vec(),
            KeyIntent::CtrlToggle | KeyIntent::AltToggle => Vec::new(),
        };

        if alt_armed {
            bytes.insert(0, 0x1B);
        }

        KeyBytes {
            bytes,
            consumed_ctrl: ctrl_armed,
            consumed_alt: alt_armed,
        }
    }

    /// Ctrl + single ASCII letter becomes the control byte (Ctrl-C -> 0x03).
    /// Anything else passes through unchanged.
    fn encode_text(text: &str, ctrl_armed: bool) -> Vec<u8> {
        if ctrl_armed {
            let mut chars = text.chars();
            if let (Some(ch), None) = (chars.next(), chars.next()) {
                if ch.is_ascii_alphabetic() {
                    return vec![ch.to_ascii_uppercase() as u8 - b'A' + 1];
                }
            }
        }
        text.as_bytes().to_vec()
    }
}
