//! Live transport session handle.
//!
//! One [`TransportSession`] exists per authenticated remote shell. The
//! handle owns the input sender and the transport control; the relay pumps
//! run in their own tasks and hold the reader/writer halves. Sessions move
//! through `Idle → Connecting → Authenticated → ShellOpen` inside the
//! connector; a constructed handle starts at `ShellOpen` and ends in
//! `Closed` or `Failed`, after which no resources remain held.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SessionError;
use crate::transport::ShellControl;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Shell allocated, relays running.
    ShellOpen,
    /// Torn down cleanly (explicit close, remote EOF, or consumer gone).
    Closed,
    /// Torn down after a mid-stream transport error.
    Failed,
}

/// Handle to one live remote-shell session.
pub struct TransportSession {
    session_id: Uuid,
    input_tx: mpsc::UnboundedSender<Vec<u8>>,
    control: Box<dyn ShellControl>,
    closed: AtomicBool,
    state: Mutex<SessionState>,
}

impl TransportSession {
    /// Wrap a freshly-opened shell. The caller spawns the relay pumps and
    /// keeps the receiver ends.
    #[must_use]
    pub fn new(input_tx: mpsc::UnboundedSender<Vec<u8>>, control: Box<dyn ShellControl>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            input_tx,
            control,
            closed: AtomicBool::new(false),
            state: Mutex::new(SessionState::ShellOpen),
        }
    }

    /// Server-generated id for this session instance. Distinct from the
    /// connection id: it tags one *generation* of a connection so a stale
    /// teardown cannot evict a session that superseded this one.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Enqueue input bytes for the remote shell.
    ///
    /// Enqueue order is write order: a single writer task drains the
    /// channel, so sequential submissions for this session reach the
    /// transport in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has been closed or
    /// its input relay has already stopped.
    pub fn write(&self, bytes: Vec<u8>) -> Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        self.input_tx
            .send(bytes)
            .map_err(|_| SessionError::Closed)
    }

    /// Tear down the transport. Idempotent: the first call shuts the
    /// transport down, every later call is a no-op.
    pub async fn close(&self) {
        self.finish(SessionState::Closed).await;
    }

    /// Tear down after a transport error, leaving the session in `Failed`.
    pub async fn fail(&self) {
        self.finish(SessionState::Failed).await;
    }

    async fn finish(&self, terminal: SessionState) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *state = terminal;
        }
        self.control.shutdown().await;
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
