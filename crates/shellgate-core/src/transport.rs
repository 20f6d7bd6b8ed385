//! Transport abstraction between the lifecycle controller and the SSH
//! protocol implementation.
//!
//! The controller only sees [`TransportConnector`] and the split duplex
//! halves of a [`ShellStream`]; tests substitute in-memory transports and
//! the production path plugs in [`crate::ssh::SshConnector`].

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::credential::ConnectionParams;
use crate::error::SessionError;

/// Read half of an open shell.
pub type ShellReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of an open shell.
pub type ShellWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Out-of-band teardown control for an open shell.
///
/// Lets the session close the underlying transport independently of the
/// reader/writer halves (which may be parked inside relay tasks at the
/// time). Implementations must tolerate repeated calls.
#[async_trait]
pub trait ShellControl: Send + Sync {
    /// Tear down the transport. Idempotent.
    async fn shutdown(&self);
}

/// An interactive shell attached to an authenticated transport.
pub struct ShellStream {
    /// Remote shell output.
    pub reader: ShellReader,
    /// Remote shell input.
    pub writer: ShellWriter,
    /// Teardown control.
    pub control: Box<dyn ShellControl>,
}

/// Opens authenticated remote shells.
///
/// `open_shell` drives the full `Connecting → Authenticated → ShellOpen`
/// progression and must release everything it acquired before returning an
/// error from any intermediate step: a failed open leaves no socket or
/// channel behind.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Connect, authenticate, and allocate an interactive shell.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Connect`] / [`SessionError::ConnectTimeout`] if the
    ///   host is unreachable or the handshake stalls.
    /// - [`SessionError::AuthFailed`] / [`SessionError::InvalidKey`] if the
    ///   host rejects the secret or the key cannot be parsed.
    /// - [`SessionError::ShellFailed`] if auth succeeded but the channel,
    ///   PTY, or shell request failed.
    async fn open_shell(&self, params: &ConnectionParams) -> Result<ShellStream, SessionError>;
}
