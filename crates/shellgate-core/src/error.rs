//! Error types for `shellgate-core`.
//!
//! Each variant carries enough context to diagnose the problem without a
//! debugger. Messages never include secret material, only hosts, ports,
//! usernames, and operation descriptions.

/// Errors from cryptographic operations on credential secrets.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },
}

/// Errors from credential resolution.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No credential record exists for the given id.
    #[error("credential '{id}' not found")]
    NotFound { id: String },

    /// The record exists but is malformed (e.g. both or neither secret set).
    #[error("credential '{id}' is invalid: {reason}")]
    Invalid { id: String, reason: String },

    /// Decrypting the stored secret failed.
    #[error("credential secret error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Errors from establishing or driving a transport session.
///
/// Authentication, connection, and shell-allocation failures are distinct
/// variants: the terminal UI suggests "check credentials" for one and
/// "check host/connectivity" for the other.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// TCP/SSH handshake with the remote host failed.
    #[error("connection to {host}:{port} failed: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// The handshake did not complete within the connect timeout.
    #[error("connection to {host}:{port} timed out after {timeout_secs}s")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout_secs: u64,
    },

    /// The host rejected the password or private key.
    #[error("authentication failed for user '{username}'")]
    AuthFailed { username: String },

    /// The stored private key could not be parsed (or is passphrase-protected).
    #[error("private key rejected: {reason}")]
    InvalidKey { reason: String },

    /// Auth succeeded but the host refused or failed to allocate an
    /// interactive shell.
    #[error("shell allocation failed: {reason}")]
    ShellFailed { reason: String },

    /// The transport failed mid-stream.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The session has already been closed.
    #[error("session is closed")]
    Closed,
}

/// Top-level bridge error returned by the lifecycle controller.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Credential lookup or decryption failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Opening or driving the transport session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// No live session exists for the given connection id.
    #[error("no live session for connection '{id}'")]
    NotConnected { id: String },
}
