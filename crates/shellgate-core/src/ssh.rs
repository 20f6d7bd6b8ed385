//! russh-backed transport connector.
//!
//! Drives the real SSH protocol: TCP + handshake (with a connect timeout),
//! password or publickey authentication, then a session channel with a PTY
//! and an interactive shell. The returned [`ShellStream`] exposes the
//! channel as split read/write halves; the control half keeps the russh
//! handle alive and disconnects it on shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, AuthResult};
use russh::keys::{self, HashAlg, PrivateKeyWithHashAlg};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use crate::credential::{AuthMethod, ConnectionParams};
use crate::error::SessionError;
use crate::transport::{ShellControl, ShellStream, TransportConnector};

/// Terminal type requested for the remote PTY.
const TERM: &str = "xterm-256color";

/// Initial PTY dimensions. The browser terminal has no resize channel in
/// the bridge API, so sessions run at a fixed size.
const PTY_COLS: u32 = 80;
const PTY_ROWS: u32 = 24;

/// Client handler that accepts all host keys.
///
/// Credential records carry no pinned host key, matching the original
/// deployment model where hosts are lab machines provisioned alongside the
/// guide. Host-key pinning would slot in here.
struct AcceptingHostKeys;

impl client::Handler for AcceptingHostKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Keeps the russh handle alive for the lifetime of the shell and
/// disconnects it on shutdown.
struct SshControl {
    handle: Mutex<client::Handle<AcceptingHostKeys>>,
}

#[async_trait]
impl ShellControl for SshControl {
    async fn shutdown(&self) {
        let handle = self.handle.lock().await;
        // A second disconnect on an already-dead transport is a no-op error.
        let _ = handle
            .disconnect(russh::Disconnect::ByApplication, "session closed", "")
            .await;
    }
}

/// [`TransportConnector`] implementation over russh.
pub struct SshConnector {
    config: Arc<client::Config>,
    connect_timeout: Duration,
}

impl SshConnector {
    /// Create a connector with the given connect timeout.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        let config = client::Config {
            nodelay: true,
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..client::Config::default()
        };
        Self {
            config: Arc::new(config),
            connect_timeout,
        }
    }
}

#[async_trait]
impl TransportConnector for SshConnector {
    async fn open_shell(&self, params: &ConnectionParams) -> Result<ShellStream, SessionError> {
        debug!(host = %params.host, port = params.port, "ssh connecting");

        let addr = (params.host.as_str(), params.port);
        let mut handle = match timeout(
            self.connect_timeout,
            client::connect(Arc::clone(&self.config), addr, AcceptingHostKeys),
        )
        .await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                return Err(SessionError::Connect {
                    host: params.host.clone(),
                    port: params.port,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    host: params.host.clone(),
                    port: params.port,
                    timeout_secs: self.connect_timeout.as_secs(),
                });
            }
        };

        let auth = match &params.auth {
            AuthMethod::Password(password) => {
                handle
                    .authenticate_password(params.username.clone(), password.clone())
                    .await
            }
            AuthMethod::PrivateKey(pem) => {
                let key = match parse_private_key(pem) {
                    Ok(key) => key,
                    Err(err) => {
                        abort(&mut handle).await;
                        return Err(err);
                    }
                };
                let key = PrivateKeyWithHashAlg::new(Arc::new(key), None::<HashAlg>);
                handle
                    .authenticate_publickey(params.username.clone(), key)
                    .await
            }
        };

        match auth {
            Ok(AuthResult::Success) => {}
            Ok(AuthResult::Failure { .. }) => {
                abort(&mut handle).await;
                return Err(SessionError::AuthFailed {
                    username: params.username.clone(),
                });
            }
            Err(e) => {
                abort(&mut handle).await;
                return Err(SessionError::Connect {
                    host: params.host.clone(),
                    port: params.port,
                    reason: e.to_string(),
                });
            }
        }

        debug!(host = %params.host, user = %params.username, "ssh authenticated");

        let channel = match handle.channel_open_session().await {
            Ok(channel) => channel,
            Err(e) => {
                abort(&mut handle).await;
                return Err(SessionError::ShellFailed {
                    reason: format!("session channel: {e}"),
                });
            }
        };

        if let Err(e) = channel
            .request_pty(true, TERM, PTY_COLS, PTY_ROWS, 0, 0, &[])
            .await
        {
            abort(&mut handle).await;
            return Err(SessionError::ShellFailed {
                reason: format!("pty request: {e}"),
            });
        }

        if let Err(e) = channel.request_shell(true).await {
            abort(&mut handle).await;
            return Err(SessionError::ShellFailed {
                reason: format!("shell request: {e}"),
            });
        }

        debug!(host = %params.host, "ssh shell open");

        let (reader, writer) = tokio::io::split(channel.into_stream());
        Ok(ShellStream {
            reader: Box::new(reader),
            writer: Box::new(writer),
            control: Box::new(SshControl {
                handle: Mutex::new(handle),
            }),
        })
    }
}

/// Disconnect a partially-established transport on an error path so a
/// failed open never leaves a socket behind.
async fn abort(handle: &mut client::Handle<AcceptingHostKeys>) {
    let _ = handle
        .disconnect(russh::Disconnect::ByApplication, "connection aborted", "")
        .await;
}

/// Parse an OpenSSH- or PEM-encoded private key.
fn parse_private_key(pem: &str) -> Result<keys::PrivateKey, SessionError> {
    match keys::PrivateKey::from_openssh(pem) {
        Ok(key) => Ok(key),
        Err(openssh_err) => match keys::decode_secret_key(pem, None) {
            Ok(key) => Ok(key),
            Err(keys::Error::KeyIsEncrypted) => Err(SessionError::InvalidKey {
                reason: "passphrase-protected private keys are not supported".to_owned(),
            }),
            Err(_) => Err(SessionError::InvalidKey {
                reason: format!("not a valid OpenSSH or PEM private key ({openssh_err})"),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_private_key_is_rejected() {
        let result = parse_private_key("not a key at all");
        assert!(matches!(result, Err(SessionError::InvalidKey { .. })));
    }

    #[test]
    fn empty_private_key_is_rejected() {
        let result = parse_private_key("");
        assert!(matches!(result, Err(SessionError::InvalidKey { .. })));
    }
}
