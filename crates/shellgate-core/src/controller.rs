//! Session lifecycle controller.
//!
//! Orchestrates connect/input/close across the resolver, the transport
//! connector, the relays, and the registry. All registry mutation funnels
//! through here, and every stream termination (explicit close, remote
//! EOF, transport error, or the browser silently going away) ends with
//! the transport shut down and the registry entry removed exactly once.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::credential::CredentialResolver;
use crate::error::BridgeError;
use crate::registry::ConnectionRegistry;
use crate::relay::{self, OUTPUT_CHANNEL_CAPACITY, OutputStream, StreamEnd};
use crate::session::TransportSession;
use crate::transport::TransportConnector;

/// Orchestrates the bridge's connect/input/close operations.
pub struct LifecycleController {
    resolver: Arc<dyn CredentialResolver>,
    connector: Arc<dyn TransportConnector>,
    registry: Arc<ConnectionRegistry>,
}

impl LifecycleController {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn CredentialResolver>,
        connector: Arc<dyn TransportConnector>,
    ) -> Self {
        Self {
            resolver,
            connector,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// The registry backing this controller (read-only uses: health).
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Establish a session for a connection id and return its output
    /// stream.
    ///
    /// Resolution happens before any transport work; a failed open leaves
    /// no registry entry behind. If a session is already live for this id
    /// it is superseded: the new session registers and the displaced one
    /// is closed, never leaked.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Credential`] before any transport attempt, or
    /// [`BridgeError::Session`] from the connector's typed failures.
    pub async fn connect(&self, connection_id: &str) -> Result<OutputStream, BridgeError> {
        let params = self.resolver.resolve(connection_id).await?;
        let shell = self.connector.open_shell(&params).await?;

        let (out_tx, out_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let session = Arc::new(TransportSession::new(in_tx, shell.control));
        let session_id = session.session_id();

        // Register before the relays start so the supervisor's cleanup can
        // never run ahead of the entry it is supposed to remove.
        if let Some(displaced) = self.registry.register(connection_id, Arc::clone(&session)) {
            debug!(connection_id, "superseding live session");
            displaced.close().await;
        }

        tokio::spawn(relay::pump_input(shell.writer, in_rx));

        // Supervise the output relay: whatever ends the stream, shut the
        // transport down and drop the registry entry for this generation.
        // Cleanup never waits for a client close that may never arrive.
        let registry = Arc::clone(&self.registry);
        let supervised = Arc::clone(&session);
        let id = connection_id.to_owned();
        tokio::spawn(async move {
            let end = relay::pump_output(shell.reader, out_tx).await;
            match end {
                StreamEnd::TransportError => {
                    warn!(connection_id = %id, %session_id, "session stream failed");
                    supervised.fail().await;
                }
                StreamEnd::RemoteClosed | StreamEnd::ConsumerGone => {
                    debug!(connection_id = %id, %session_id, ?end, "session stream ended");
                    supervised.close().await;
                }
            }
            registry.remove_if(&id, session_id);
        });

        info!(connection_id, %session_id, "session established");
        Ok(out_rx)
    }

    /// Forward input bytes to the live session for a connection id.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotConnected`] if no session is live for the id, or
    /// if the session closed between lookup and write.
    pub fn input(&self, connection_id: &str, bytes: Vec<u8>) -> Result<(), BridgeError> {
        let session = self
            .registry
            .lookup(connection_id)
            .ok_or_else(|| BridgeError::NotConnected {
                id: connection_id.to_owned(),
            })?;
        session
            .write(bytes)
            .map_err(|_| BridgeError::NotConnected {
                id: connection_id.to_owned(),
            })
    }

    /// Tear down the session for a connection id.
    ///
    /// Idempotent: closing an unknown, never-connected, or already-closed
    /// id is a no-op.
    pub async fn close(&self, connection_id: &str) {
        if let Some(session) = self.registry.remove(connection_id) {
            info!(connection_id, session_id = %session.session_id(), "session closed");
            session.close().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use crate::credential::{AuthMethod, ConnectionParams, CredentialResolver};
    use crate::error::{CredentialError, SessionError};
    use crate::transport::{ShellControl, ShellStream, TransportConnector};

    use super::*;

    struct MapResolver {
        params: HashMap<String, ConnectionParams>,
    }

    #[async_trait]
    impl CredentialResolver for MapResolver {
        async fn resolve(&self, id: &str) -> Result<ConnectionParams, CredentialError> {
            self.params
                .get(id)
                .cloned()
                .ok_or_else(|| CredentialError::NotFound { id: id.to_owned() })
        }
    }

    struct MockControl {
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ShellControl for MockControl {
        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Spy connector: every `open_shell` hands back one half of an
    /// in-memory duplex and parks the other half for the test to drive as
    /// "the remote host".
    #[derive(Default)]
    struct MockConnector {
        opened: AtomicUsize,
        remotes: Mutex<Vec<Option<DuplexStream>>>,
        shutdowns: Mutex<Vec<Arc<AtomicUsize>>>,
    }

    impl MockConnector {
        fn remote(&self, index: usize) -> DuplexStream {
            self.remotes.lock().unwrap()[index].take().unwrap()
        }

        fn shutdowns(&self, index: usize) -> Arc<AtomicUsize> {
            Arc::clone(&self.shutdowns.lock().unwrap()[index])
        }
    }

    #[async_trait]
    impl TransportConnector for MockConnector {
        async fn open_shell(&self, _params: &ConnectionParams) -> Result<ShellStream, SessionError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let (local, remote) = tokio::io::duplex(4096);
            let (reader, writer) = tokio::io::split(local);
            let shutdowns = Arc::new(AtomicUsize::new(0));
            self.remotes.lock().unwrap().push(Some(remote));
            self.shutdowns.lock().unwrap().push(Arc::clone(&shutdowns));
            Ok(ShellStream {
                reader: Box::new(reader),
                writer: Box::new(writer),
                control: Box::new(MockControl { shutdowns }),
            })
        }
    }

    fn params() -> ConnectionParams {
        ConnectionParams {
            host: "lab-1.example.net".to_owned(),
            port: 22,
            username: "student".to_owned(),
            auth: AuthMethod::Password("changeme".to_owned()),
        }
    }

    fn make_controller() -> (LifecycleController, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::default());
        let resolver = MapResolver {
            params: HashMap::from([("cred-1".to_owned(), params())]),
        };
        let controller = LifecycleController::new(
            Arc::new(resolver),
            Arc::clone(&connector) as Arc<dyn TransportConnector>,
        );
        (controller, connector)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(condition(), "condition not reached in time");
    }

    #[tokio::test]
    async fn unknown_credential_makes_no_transport_attempt() {
        let (controller, connector) = make_controller();

        let err = controller.connect("cred-404").await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Credential(CredentialError::NotFound { .. })
        ));
        assert_eq!(connector.opened.load(Ordering::SeqCst), 0);
        assert!(controller.registry().lookup("cred-404").is_none());
    }

    #[tokio::test]
    async fn connect_streams_greeting_and_echoes_input() {
        let (controller, connector) = make_controller();

        let mut output = controller.connect("cred-1").await.unwrap();
        let remote = connector.remote(0);
        let (mut remote_reader, mut remote_writer) = tokio::io::split(remote);

        remote_writer.write_all(b"Welcome to lab-1\r\n").await.unwrap();
        let greeting = output.recv().await.unwrap().unwrap();
        assert_eq!(&greeting[..], b"Welcome to lab-1\r\n");

        controller.input("cred-1", b"ls\n".to_vec()).unwrap();
        controller.input("cred-1", b"pwd\n".to_vec()).unwrap();
        let mut typed = [0u8; 7];
        remote_reader.read_exact(&mut typed).await.unwrap();
        assert_eq!(&typed, b"ls\npwd\n");

        remote_writer.write_all(b"README.md\r\n").await.unwrap();
        let listing = output.recv().await.unwrap().unwrap();
        assert_eq!(&listing[..], b"README.md\r\n");

        controller.close("cred-1").await;
        assert!(controller.registry().lookup("cred-1").is_none());
    }

    #[tokio::test]
    async fn input_after_close_reports_not_connected() {
        let (controller, connector) = make_controller();

        let _output = controller.connect("cred-1").await.unwrap();
        let _remote = connector.remote(0);

        controller.close("cred-1").await;
        let err = controller.input("cred-1", b"ls\n".to_vec()).unwrap_err();
        assert!(matches!(err, BridgeError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn input_without_connect_reports_not_connected() {
        let (controller, _connector) = make_controller();
        let err = controller.input("cred-1", b"ls\n".to_vec()).unwrap_err();
        assert!(matches!(err, BridgeError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn close_twice_is_safe() {
        let (controller, connector) = make_controller();

        let _output = controller.connect("cred-1").await.unwrap();
        let _remote = connector.remote(0);

        controller.close("cred-1").await;
        controller.close("cred-1").await;
        assert_eq!(connector.shutdowns(0).load(Ordering::SeqCst), 1);

        // Closing an id that never connected is also a no-op.
        controller.close("cred-other").await;
    }

    #[tokio::test]
    async fn reconnect_supersedes_prior_session() {
        let (controller, connector) = make_controller();

        let _first_output = controller.connect("cred-1").await.unwrap();
        let first_session = controller.registry().lookup("cred-1").unwrap();
        let _first_remote = connector.remote(0);

        let _second_output = controller.connect("cred-1").await.unwrap();
        let _second_remote = connector.remote(1);

        // The displaced session was closed, not leaked, and exactly one
        // live entry remains, the new generation.
        assert_eq!(connector.shutdowns(0).load(Ordering::SeqCst), 1);
        assert_eq!(controller.registry().active_count(), 1);
        let live = controller.registry().lookup("cred-1").unwrap();
        assert_ne!(live.session_id(), first_session.session_id());
    }

    #[tokio::test]
    async fn remote_close_removes_entry_without_client_close() {
        let (controller, connector) = make_controller();

        let mut output = controller.connect("cred-1").await.unwrap();
        let remote = connector.remote(0);

        // The remote host unilaterally drops the connection.
        drop(remote);

        // Output stream ends...
        assert!(output.recv().await.is_none());

        // ...and the registry entry goes away with no explicit close call.
        wait_until(|| controller.registry().lookup("cred-1").is_none()).await;
        assert_eq!(connector.shutdowns(0).load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_consumer_tears_session_down() {
        let (controller, connector) = make_controller();

        let output = controller.connect("cred-1").await.unwrap();
        let remote = connector.remote(0);
        let (_remote_reader, mut remote_writer) = tokio::io::split(remote);

        // Browser tab closed: the response body stream is dropped without
        // any close request. The next remote byte hits a gone consumer.
        drop(output);
        remote_writer.write_all(b"$ ").await.unwrap();

        wait_until(|| controller.registry().lookup("cred-1").is_none()).await;
        assert_eq!(connector.shutdowns(0).load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_consumer_over_idle_shell_tears_session_down() {
        let (controller, connector) = make_controller();

        let output = controller.connect("cred-1").await.unwrap();
        let _remote = connector.remote(0);

        // Browser tab closed while the shell sits at a quiet prompt: no
        // further remote output will ever arrive to fail a send, so the
        // teardown must come from the consumer side alone.
        drop(output);

        wait_until(|| controller.registry().lookup("cred-1").is_none()).await;
        assert_eq!(connector.shutdowns(0).load(Ordering::SeqCst), 1);
    }
}
