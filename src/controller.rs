//! Session controller
//!
//! The host-facing mediator: owns one session and one emulator, pumps the
//! session's output stream into the emulator, and routes input through the
//! key encoder. Modifier keys are one-shot flags held here so a host can
//! back them with on-screen Ctrl/Alt toggle buttons.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::ConnectionState;
use crate::keys::{KeyEncoder, KeyIntent};
use crate::session::TerminalSession;
use crate::term::TerminalEmulator;

/// Poll interval for the output-forwarding thread when idle.
const FORWARD_IDLE_WAIT: Duration = Duration::from_millis(50);

/// Mediates between a host layer and one terminal session.
pub struct SessionController {
    session: TerminalSession,
    emulator: Arc<Mutex<TerminalEmulator>>,
    ctrl_armed: bool,
    alt_armed: bool,
    running: Arc<AtomicBool>,
    forwarder: Option<JoinHandle<()>>,
}

impl SessionController {
    /// Wrap a session, start forwarding its output into a fresh emulator of
    /// the given size, and initiate the connection.
    pub fn new(session: TerminalSession, rows: usize, cols: usize) -> Self {
        let emulator = Arc::new(Mutex::new(TerminalEmulator::new(rows, cols)));
        let running = Arc::new(AtomicBool::new(true));

        let output = session.output();
        let forward_emulator = Arc::clone(&emulator);
        let forward_running = Arc::clone(&running);
        let forwarder = thread::spawn(move || {
            while forward_running.load(Ordering::SeqCst) {
                if let Some(chunk) = output.pop_timeout(FORWARD_IDLE_WAIT) {
                    let mut emu = match forward_emulator.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    emu.append(&chunk);
                }
            }
        });

        session.connect();

        Self {
            session,
            emulator,
            ctrl_armed: false,
            alt_armed: false,
            running,
            forwarder: Some(forwarder),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Re-initiate the connection after a failure or disconnect.
    pub fn reconnect(&self) {
        self.session.connect();
    }

    pub fn send_input(&self, text: &str) {
        self.session.send_input(text);
    }

    pub fn send_raw(&self, data: &[u8]) {
        self.session.send_raw(data);
    }

    /// Encode and send a special key under the currently armed modifiers.
    ///
    /// Toggles only flip the one-shot flags. Whatever the encoder consumed
    /// is cleared; nothing here ever propagates an error to the caller — a
    /// malformed key event must not take the session down.
    pub fn send_special_key(&mut self, intent: KeyIntent) {
        match intent {
            KeyIntent::CtrlToggle => {
                self.ctrl_armed = !self.ctrl_armed;
                debug!("ctrl armed: {}", self.ctrl_armed);
                return;
            }
            KeyIntent::AltToggle => {
                self.alt_armed = !self.alt_armed;
                debug!("alt armed: {}", self.alt_armed);
                return;
            }
            _ => {}
        }

        let encoded = KeyEncoder::encode(&intent, self.ctrl_armed, self.alt_armed);
        if encoded.consumed_ctrl {
            self.ctrl_armed = false;
        }
        if encoded.consumed_alt {
            self.alt_armed = false;
        }
        if encoded.bytes.is_empty() {
            warn!("key intent {:?} produced no bytes", intent);
            return;
        }
        self.session.send_raw(&encoded.bytes);
    }

    pub fn ctrl_armed(&self) -> bool {
        self.ctrl_armed
    }

    pub fn alt_armed(&self) -> bool {
        self.alt_armed
    }

    /// Run `f` against the emulator. Rendering reads go through here so the
    /// lock is held only for the projection.
    pub fn with_emulator<R>(&self, f: impl FnOnce(&TerminalEmulator) -> R) -> R {
        let emu = match self.emulator.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&emu)
    }

    /// Change counter of the screen; cheap to poll every frame.
    pub fn revision(&self) -> u64 {
        self.with_emulator(TerminalEmulator::revision)
    }

    /// Resize the emulator grid to the host's layout.
    pub fn resize(&self, rows: usize, cols: usize) {
        let mut emu = match self.emulator.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        emu.resize(rows, cols);
    }

    /// Blank the screen without touching the connection.
    pub fn clear(&self) {
        let mut emu = match self.emulator.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        emu.clear();
    }

    pub fn disconnect(&self) {
        self.session.disconnect();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.forwarder.take() {
            let _ = handle.join();
        }
        self.session.disconnect();
    }
}
