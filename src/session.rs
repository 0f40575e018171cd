//! Session management
//!
//! Orchestrates the shell client lifecycle: connect/authenticate off the
//! caller's thread, forward the client's status and output streams, route
//! outbound bytes to the shell. The session is the single owner of the
//! [`ConnectionState`] and of the client handle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::{
    ClientError, ConnectionState, CredentialProvider, ShellClient, ShellConnector,
};

/// Default capacity of the output buffer, in chunks.
pub const DEFAULT_OUTPUT_CHUNKS: usize = 64;

/// Bounded queue of shell-output chunks with drop-oldest overflow.
///
/// The producer side never blocks: when the consumer falls behind, the
/// oldest chunk is discarded so an output flood can garble the display but
/// never stall the session.
#[derive(Clone)]
pub struct OutputQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    buf: Mutex<VecDeque<Vec<u8>>>,
    cond: Condvar,
    capacity: usize,
}

impl OutputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                buf: Mutex::new(VecDeque::new()),
                cond: Condvar::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Append a chunk, discarding the oldest when full. Never blocks.
    pub fn push(&self, chunk: Vec<u8>) {
        let mut buf = match self.inner.buf.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buf.len() == self.inner.capacity {
            buf.pop_front();
            debug!("output buffer full, dropped oldest chunk");
        }
        buf.push_back(chunk);
        self.inner.cond.notify_one();
    }

    /// Take the oldest chunk without waiting.
    pub fn try_pop(&self) -> Option<Vec<u8>> {
        let mut buf = match self.inner.buf.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buf.pop_front()
    }

    /// Take the oldest chunk, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        let mut buf = match self.inner.buf.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(chunk) = buf.pop_front() {
            return Some(chunk);
        }
        let (mut buf, _timed_out) = match self.inner.cond.wait_timeout(buf, timeout) {
            Ok(pair) => pair,
            Err(poisoned) => poisoned.into_inner(),
        };
        buf.pop_front()
    }

    pub fn len(&self) -> usize {
        match self.inner.buf.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A terminal session over the device-shell protocol.
pub struct TerminalSession {
    shared: Arc<SessionShared>,
}

struct SessionShared {
    state: Mutex<ConnectionState>,
    client: Mutex<Option<Box<dyn ShellClient>>>,
    /// Bumped by every disconnect; a connect worker or status listener from
    /// an earlier epoch must not touch session state.
    epoch: AtomicU64,
    connector: Arc<dyn ShellConnector>,
    credentials: Arc<dyn CredentialProvider>,
    key_pair_id: String,
    output: OutputQueue,
}

impl TerminalSession {
    pub fn new(
        connector: Arc<dyn ShellConnector>,
        credentials: Arc<dyn CredentialProvider>,
        key_pair_id: impl Into<String>,
        output_capacity: usize,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                state: Mutex::new(ConnectionState::Disconnected),
                client: Mutex::new(None),
                epoch: AtomicU64::new(0),
                connector,
                credentials,
                key_pair_id: key_pair_id.into(),
                output: OutputQueue::new(output_capacity),
            }),
        }
    }

    /// Current connection state. New observers see the last value
    /// immediately; poll this together with the emulator revision.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock_state().clone()
    }

    /// Ordered shell-output stream. Chunks arrive exactly as the client
    /// produced them; no coalescing or reordering.
    pub fn output(&self) -> OutputQueue {
        self.shared.output.clone()
    }

    /// Begin connecting. Runs endpoint resolution, authentication and shell
    /// startup on a worker thread; the caller is never blocked. On any
    /// failure the state becomes `Failed(reason)` and a fresh `connect()`
    /// is required.
    pub fn connect(&self) {
        {
            let mut state = self.shared.lock_state();
            match *state {
                ConnectionState::Disconnected | ConnectionState::Failed(_) => {
                    *state = ConnectionState::Connecting;
                }
                _ => {
                    warn!("connect() ignored in state {}", *state);
                    return;
                }
            }
        }
        info!("starting shell connection");

        let shared = Arc::clone(&self.shared);
        let epoch = shared.epoch.load(Ordering::SeqCst);
        thread::spawn(move || {
            SessionShared::run_connect(&shared, epoch);
        });
    }

    /// Write raw bytes to the shell. Silently a no-op when no client is
    /// attached; input events may legitimately race a disconnect.
    pub fn send_raw(&self, data: &[u8]) {
        let client = match self.shared.client.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(client) = client.as_ref() {
            if let Err(e) = client.send(data) {
                warn!("shell send failed: {}", e);
            }
        }
    }

    /// Send literal text to the shell.
    pub fn send_input(&self, text: &str) {
        self.send_raw(text.as_bytes());
    }

    /// Send a command line, terminated with a newline.
    pub fn send_command(&self, command: &str) {
        let mut data = command.as_bytes().to_vec();
        data.push(b'\n');
        self.send_raw(&data);
    }

    /// Tear the session down. Idempotent; safe mid-connect. Listener
    /// threads bound to the closed client terminate when its streams end.
    pub fn disconnect(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);

        let taken = {
            let mut client = match self.shared.client.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            client.take()
        };
        if let Some(mut client) = taken {
            client.close();
        }

        *self.shared.lock_state() = ConnectionState::Disconnected;
        info!("session disconnected");
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl SessionShared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConnectionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn epoch_is(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Connect worker body: build, wire and start the client, then commit
    /// the handle unless a disconnect raced us.
    fn run_connect(shared: &Arc<Self>, epoch: u64) {
        match Self::establish(shared, epoch) {
            Ok(client) => {
                let mut slot = match shared.client.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if shared.epoch_is(epoch) {
                    *slot = Some(client);
                    info!("shell channel established");
                } else {
                    // Disconnected while we were connecting
                    drop(slot);
                    let mut client = client;
                    client.close();
                    debug!("discarding client from stale connect");
                }
            }
            Err(e) => {
                if shared.epoch_is(epoch) {
                    warn!("connect failed: {}", e);
                    *shared.lock_state() = ConnectionState::Failed(e.to_string());
                }
            }
        }
    }

    fn establish(
        shared: &Arc<Self>,
        epoch: u64,
    ) -> Result<Box<dyn ShellClient>, ClientError> {
        let endpoint = shared.connector.resolve()?;
        debug!("resolved device endpoint {}", endpoint);

        let key = shared.credentials.key_material(&shared.key_pair_id)?;
        let mut client = shared.connector.open(&endpoint, key)?;

        // Subscribe before connecting so no early event is missed.
        let status_rx = client.take_status_events();
        let output_rx = client.take_output_chunks();
        if let Some(rx) = status_rx {
            Self::spawn_status_listener(Arc::clone(shared), rx, epoch);
        }
        if let Some(rx) = output_rx {
            Self::spawn_output_listener(shared.output.clone(), rx);
        }

        client.connect()?;
        client.start_shell()?;
        Ok(client)
    }

    /// Forwards client status values verbatim into the session state until
    /// the client's stream closes or the epoch moves on.
    fn spawn_status_listener(
        shared: Arc<Self>,
        rx: Receiver<ConnectionState>,
        epoch: u64,
    ) {
        thread::spawn(move || {
            for status in rx {
                if !shared.epoch_is(epoch) {
                    break;
                }
                debug!("client status: {}", status);
                *shared.lock_state() = status;
            }
        });
    }

    /// Forwards output chunks, in arrival order, into the bounded queue
    /// until the client's stream closes.
    fn spawn_output_listener(output: OutputQueue, rx: Receiver<Vec<u8>>) {
        thread::spawn(move || {
            for chunk in rx {
                output.push(chunk);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_preserves_order() {
        let queue = OutputQueue::new(8);
        queue.push(b"one".to_vec());
        queue.push(b"two".to_vec());
        assert_eq!(queue.try_pop(), Some(b"one".to_vec()));
        assert_eq!(queue.try_pop(), Some(b"two".to_vec()));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_queue_drops_oldest_when_full() {
        let queue = OutputQueue::new(2);
        queue.push(vec![1]);
        queue.push(vec![2]);
        queue.push(vec![3]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(vec![2]));
        assert_eq!(queue.try_pop(), Some(vec![3]));
    }

    #[test]
    fn test_queue_pop_timeout_sees_concurrent_push() {
        let queue = OutputQueue::new(4);
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(b"late".to_vec());
        });
        let got = queue.pop_timeout(Duration::from_secs(2));
        handle.join().unwrap();
        assert_eq!(got, Some(b"late".to_vec()));
    }

    #[test]
    fn test_queue_pop_timeout_empty() {
        let queue = OutputQueue::new(4);
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), None);
    }
}
