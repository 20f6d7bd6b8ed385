//! Credential model and resolver interface.
//!
//! The bridge never owns credential persistence. It consumes a
//! [`CredentialResolver`] that turns a connection id into decrypted
//! connection parameters; the decrypted copy lives only as long as one
//! transport session and is zeroized on drop.

use std::fmt;

use async_trait::async_trait;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CredentialError;

/// How the bridge authenticates against the remote host.
///
/// A credential record carries exactly one method: records with both or
/// neither secret are rejected when the store loads, so no precedence rule
/// exists.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub enum AuthMethod {
    /// Password authentication.
    Password(String),
    /// Publickey authentication with an OpenSSH- or PEM-encoded private key.
    PrivateKey(String),
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("AuthMethod::Password([REDACTED])"),
            Self::PrivateKey(_) => f.write_str("AuthMethod::PrivateKey([REDACTED])"),
        }
    }
}

/// Decrypted connection parameters for one transport session.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Remote host name or address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Remote username.
    pub username: String,
    /// Authentication secret.
    pub auth: AuthMethod,
}

/// Read-only, side-effect-free credential lookup.
///
/// Called once per connect, before any transport work starts. A failed
/// resolution must therefore never leave a registry entry or an open
/// socket behind.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolve a connection id to decrypted connection parameters.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::NotFound`] if no record exists for the id.
    /// - [`CredentialError::Invalid`] if the record is malformed.
    /// - [`CredentialError::Crypto`] if the stored secret fails to decrypt.
    async fn resolve(&self, connection_id: &str) -> Result<ConnectionParams, CredentialError>;
}
