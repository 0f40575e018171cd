//! End-to-end session tests against a scripted shell client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use axshell::client::{
    ClientError, ConnectionState, CredentialProvider, Endpoint, KeyMaterial, ShellClient,
    ShellConnector,
};
use axshell::controller::SessionController;
use axshell::keys::KeyIntent;
use axshell::session::TerminalSession;

/// What the mock connector should do when the session drives it.
#[derive(Clone, Default)]
struct Script {
    fail_resolve: Option<String>,
    fail_connect: Option<String>,
    connect_delay: Duration,
    /// Chunks emitted on the output stream once the shell starts.
    banner: Vec<Vec<u8>>,
}

struct MockClient {
    script: Script,
    status_tx: Option<Sender<ConnectionState>>,
    status_rx: Option<Receiver<ConnectionState>>,
    output_tx: Option<Sender<Vec<u8>>>,
    output_rx: Option<Receiver<Vec<u8>>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl ShellClient for MockClient {
    fn connect(&mut self) -> Result<(), ClientError> {
        if !self.script.connect_delay.is_zero() {
            thread::sleep(self.script.connect_delay);
        }
        if let Some(reason) = &self.script.fail_connect {
            return Err(ClientError::Auth(reason.clone()));
        }
        if let Some(tx) = &self.status_tx {
            let _ = tx.send(ConnectionState::Connected);
        }
        Ok(())
    }

    fn start_shell(&mut self) -> Result<(), ClientError> {
        if let Some(tx) = &self.output_tx {
            for chunk in &self.script.banner {
                let _ = tx.send(chunk.clone());
            }
        }
        Ok(())
    }

    fn send(&self, data: &[u8]) -> Result<(), ClientError> {
        self.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.status_tx = None;
        self.output_tx = None;
    }

    fn take_status_events(&mut self) -> Option<Receiver<ConnectionState>> {
        self.status_rx.take()
    }

    fn take_output_chunks(&mut self) -> Option<Receiver<Vec<u8>>> {
        self.output_rx.take()
    }
}

struct MockConnector {
    script: Script,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl MockConnector {
    fn new(script: Script) -> Self {
        Self {
            script,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ShellConnector for MockConnector {
    fn resolve(&self) -> Result<Endpoint, ClientError> {
        if let Some(reason) = &self.script.fail_resolve {
            return Err(ClientError::Endpoint(reason.clone()));
        }
        Ok(Endpoint {
            host: "127.0.0.1".into(),
            port: 5555,
        })
    }

    fn open(
        &self,
        _endpoint: &Endpoint,
        _key: KeyMaterial,
    ) -> Result<Box<dyn ShellClient>, ClientError> {
        let (status_tx, status_rx) = mpsc::channel();
        let (output_tx, output_rx) = mpsc::channel();
        Ok(Box::new(MockClient {
            script: self.script.clone(),
            status_tx: Some(status_tx),
            status_rx: Some(status_rx),
            output_tx: Some(output_tx),
            output_rx: Some(output_rx),
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct StaticCredentials;

impl CredentialProvider for StaticCredentials {
    fn key_material(&self, _pair_id: &str) -> Result<KeyMaterial, ClientError> {
        Ok(KeyMaterial::new(b"test-key".to_vec()))
    }
}

struct FailingCredentials;

impl CredentialProvider for FailingCredentials {
    fn key_material(&self, pair_id: &str) -> Result<KeyMaterial, ClientError> {
        Err(ClientError::Auth(format!("no key pair named {}", pair_id)))
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn session_with(
    connector: Arc<MockConnector>,
    credentials: Arc<dyn CredentialProvider>,
) -> TerminalSession {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    TerminalSession::new(connector, credentials, "default", 64)
}

#[test]
fn connect_reaches_connected_and_streams_output() {
    let connector = Arc::new(MockConnector::new(Script {
        banner: vec![b"axeron ".to_vec(), b"shell\r\n".to_vec()],
        ..Script::default()
    }));
    let session = session_with(Arc::clone(&connector), Arc::new(StaticCredentials));
    let output = session.output();

    session.connect();
    assert!(wait_until(|| session.state() == ConnectionState::Connected));

    // chunks arrive unchanged and in order
    assert_eq!(
        output.pop_timeout(Duration::from_secs(2)),
        Some(b"axeron ".to_vec())
    );
    assert_eq!(
        output.pop_timeout(Duration::from_secs(2)),
        Some(b"shell\r\n".to_vec())
    );
}

#[test]
fn sends_forward_to_client_once_attached() {
    let connector = Arc::new(MockConnector::new(Script::default()));
    let session = session_with(Arc::clone(&connector), Arc::new(StaticCredentials));
    session.connect();
    assert!(wait_until(|| session.state() == ConnectionState::Connected));

    // the client commits just after start_shell; retry until attached
    assert!(wait_until(|| {
        session.send_raw(b"x");
        !connector.sent.lock().unwrap().is_empty()
    }));
    assert_eq!(connector.sent.lock().unwrap()[0], b"x".to_vec());

    connector.sent.lock().unwrap().clear();
    session.send_command("ls");
    assert_eq!(connector.sent.lock().unwrap()[0], b"ls\n".to_vec());
}

#[test]
fn endpoint_failure_reports_failed_state() {
    let connector = Arc::new(MockConnector::new(Script {
        fail_resolve: Some("daemon port not found".into()),
        ..Script::default()
    }));
    let session = session_with(connector, Arc::new(StaticCredentials));
    session.connect();
    assert!(wait_until(|| matches!(session.state(), ConnectionState::Failed(_))));
    match session.state() {
        ConnectionState::Failed(reason) => {
            assert!(reason.contains("daemon port not found"), "got: {reason}");
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[test]
fn credential_failure_reports_failed_state() {
    let connector = Arc::new(MockConnector::new(Script::default()));
    let session = session_with(connector, Arc::new(FailingCredentials));
    session.connect();
    assert!(wait_until(|| matches!(session.state(), ConnectionState::Failed(_))));
}

#[test]
fn auth_failure_during_connect_reports_failed_state() {
    let connector = Arc::new(MockConnector::new(Script {
        fail_connect: Some("device rejected key".into()),
        ..Script::default()
    }));
    let session = session_with(connector, Arc::new(StaticCredentials));
    session.connect();
    assert!(wait_until(|| matches!(session.state(), ConnectionState::Failed(_))));
}

#[test]
fn disconnect_without_connect_is_harmless() {
    let connector = Arc::new(MockConnector::new(Script::default()));
    let session = session_with(connector, Arc::new(StaticCredentials));
    session.disconnect();
    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn send_while_disconnected_is_a_noop() {
    let connector = Arc::new(MockConnector::new(Script::default()));
    let session = session_with(Arc::clone(&connector), Arc::new(StaticCredentials));
    session.send_input("echo hi\n");
    session.send_raw(&[0x03]);
    assert!(connector.sent.lock().unwrap().is_empty());
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn disconnect_during_connect_wins() {
    let connector = Arc::new(MockConnector::new(Script {
        connect_delay: Duration::from_millis(150),
        ..Script::default()
    }));
    let session = session_with(Arc::clone(&connector), Arc::new(StaticCredentials));
    session.connect();
    thread::sleep(Duration::from_millis(20));
    session.disconnect();

    // the worker finishes later; its client must be discarded, not committed
    assert!(wait_until(|| connector.closed.load(Ordering::SeqCst)));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn controller_feeds_emulator_and_encodes_keys() {
    let connector = Arc::new(MockConnector::new(Script {
        banner: vec![b"hello".to_vec()],
        ..Script::default()
    }));
    let session = session_with(Arc::clone(&connector), Arc::new(StaticCredentials));
    let mut controller = SessionController::new(session, 5, 20);

    assert!(wait_until(|| {
        controller.connection_state() == ConnectionState::Connected
    }));
    assert!(wait_until(|| controller.revision() > 0));
    assert_eq!(controller.with_emulator(|emu| emu.line_text(0)), "hello");

    // wait for the client handle to be attached
    assert!(wait_until(|| {
        controller.send_raw(b"?");
        !connector.sent.lock().unwrap().is_empty()
    }));
    connector.sent.lock().unwrap().clear();

    // Ctrl toggle arms once: first 'c' is 0x03, second is plain text
    controller.send_special_key(KeyIntent::CtrlToggle);
    assert!(controller.ctrl_armed());
    controller.send_special_key(KeyIntent::Text("c".into()));
    assert!(!controller.ctrl_armed());
    controller.send_special_key(KeyIntent::Text("c".into()));

    // Alt toggle then Enter: ESC LF
    controller.send_special_key(KeyIntent::AltToggle);
    controller.send_special_key(KeyIntent::Enter);

    let sent = connector.sent.lock().unwrap().clone();
    assert_eq!(sent[0], vec![0x03]);
    assert_eq!(sent[1], b"c".to_vec());
    assert_eq!(sent[2], vec![0x1B, 0x0A]);

    drop(controller);
    assert!(connector.closed.load(Ordering::SeqCst));
}
