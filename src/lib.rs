//! axshell - terminal session engine for a device debugging shell
//!
//! axshell connects to the interactive shell a device debugging daemon
//! exposes (ADB-style, over TCP) and turns its byte stream into a live,
//! renderable terminal. Rendering and screen layout are left to the host;
//! this crate is the engine underneath.
//!
//! # Architecture
//!
//! ```text
//! SessionController
//! ├── TerminalSession (connect/authenticate/stream via ShellClient)
//! │   └── OutputQueue (bounded, drop-oldest shell output)
//! ├── TerminalEmulator
//! │   ├── ScreenState (cell grid + cursor + attributes)
//! │   └── VtParser (ANSI escape sequences)
//! └── KeyEncoder (key intents -> shell bytes)
//! ```
//!
//! The transport and its cryptography live behind the [`client`] traits:
//! hosts supply a [`client::ShellConnector`] and a
//! [`client::CredentialProvider`], the engine drives the lifecycle.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use axshell::config::Config;
//! use axshell::controller::SessionController;
//! use axshell::keys::KeyIntent;
//! use axshell::session::TerminalSession;
//!
//! # fn demo(connector: Arc<dyn axshell::client::ShellConnector>,
//! #         credentials: Arc<dyn axshell::client::CredentialProvider>) {
//! let config = Config::load();
//! let session = TerminalSession::new(
//!     connector,
//!     credentials,
//!     config.key_pair.clone(),
//!     config.terminal.output_buffer_chunks,
//! );
//! let mut controller =
//!     SessionController::new(session, config.terminal.rows, config.terminal.cols);
//!
//! controller.send_input("ls\n");
//! controller.send_special_key(KeyIntent::CtrlToggle);
//! controller.send_special_key(KeyIntent::Text("c".into())); // Ctrl-C
//!
//! let lines: Vec<String> = controller.with_emulator(|emu| {
//!     (0..emu.rows()).map(|r| emu.line_text(r)).collect()
//! });
//! # let _ = lines;
//! # }
//! ```

pub mod client;
pub mod config;
pub mod controller;
pub mod keys;
pub mod session;
pub mod term;

pub use client::{ClientError, ConnectionState, ShellClient};
pub use controller::SessionController;
pub use keys::{KeyEncoder, KeyIntent};
pub use session::TerminalSession;
pub use term::TerminalEmulator;
