//! Device-shell client contract
//!
//! The session engine does not speak the debugging protocol itself; it is
//! handed an already-abstracted bidirectional byte channel by an external
//! client library. This module defines that boundary: the [`ShellClient`]
//! trait, the connector/credential traits used to build one, and the
//! connection state vocabulary shared with the session layer.

use std::fmt;
use std::io;
use std::sync::mpsc::Receiver;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("endpoint unavailable: {0}")]
    Endpoint(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("shell channel failed: {0}")]
    Shell(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Connection lifecycle state.
///
/// Owned by the session; the client's status stream carries the same values
/// verbatim once the transport layer starts reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

/// Transport endpoint of the device-shell daemon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opaque key material handed to the transport for authentication.
#[derive(Clone)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Key bytes must never reach logs.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial").field(&"[REDACTED]").finish()
    }
}

/// Supplies key material for a stored key-pair identifier.
pub trait CredentialProvider: Send + Sync {
    fn key_material(&self, pair_id: &str) -> Result<KeyMaterial>;
}

/// An authenticated shell channel to the device.
///
/// The two `take_*` methods hand out the status and output receivers exactly
/// once. The session takes both *before* calling [`connect`](Self::connect)
/// so early events cannot be missed. Both channels close naturally when the
/// client is closed or dropped, which is how listener threads bound to a
/// stale client terminate.
pub trait ShellClient: Send {
    /// Establish and authenticate the transport connection.
    fn connect(&mut self) -> Result<()>;

    /// Open the interactive shell stream on the connected transport.
    fn start_shell(&mut self) -> Result<()>;

    /// Write raw bytes to the shell's stdin.
    fn send(&self, data: &[u8]) -> Result<()>;

    /// Close the channel. Must be safe to call more than once.
    fn close(&mut self);

    /// Take the connection-status stream. `None` after the first call.
    fn take_status_events(&mut self) -> Option<Receiver<ConnectionState>>;

    /// Take the shell-output stream. `None` after the first call.
    fn take_output_chunks(&mut self) -> Option<Receiver<Vec<u8>>>;
}

/// Builds [`ShellClient`] instances for a resolved endpoint.
pub trait ShellConnector: Send + Sync {
    /// Resolve the device-shell transport endpoint.
    fn resolve(&self) -> Result<Endpoint>;

    /// Construct a client for the endpoint. The client is built but not yet
    /// connected; the session drives `connect`/`start_shell` itself.
    fn open(&self, endpoint: &Endpoint, key: KeyMaterial) -> Result<Box<dyn ShellClient>>;
}
