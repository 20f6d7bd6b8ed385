//! File-backed credential store.
//!
//! Loads a JSON array of credential records whose secrets are sealed with
//! AES-256-GCM under the server's master key, and implements the core
//! [`CredentialResolver`] over it. Secrets stay sealed in memory; they are
//! opened per resolve, so plaintext material lives exactly as long as the
//! transport session being established.
//!
//! Record shape:
//!
//! ```json
//! [
//!   {
//!     "id": "cred-1",
//!     "name": "Lab box 1",
//!     "host": "lab-1.example.net",
//!     "port": 22,
//!     "username": "student",
//!     "password": "<base64 sealed blob>"
//!   }
//! ]
//! ```
//!
//! Exactly one of `password` / `private_key` must be set per record; the
//! whole file is rejected at load otherwise, so no precedence rule between
//! the two can ever apply.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::info;

use shellgate_core::credential::{AuthMethod, ConnectionParams, CredentialResolver};
use shellgate_core::crypto::{self, MasterKey};
use shellgate_core::error::CredentialError;

const DEFAULT_SSH_PORT: u16 = 22;

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// One credential record as stored on disk. Secret fields hold
/// base64-encoded sealed blobs, never plaintext.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

/// In-memory credential store loaded from a JSON file.
pub struct FileCredentialStore {
    records: HashMap<String, CredentialRecord>,
    key: MasterKey,
}

impl FileCredentialStore {
    /// Load and validate a credentials file.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed JSON, duplicate ids, or any record
    /// violating the exactly-one-secret rule.
    pub fn load(path: impl AsRef<Path>, key: MasterKey) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials file {}", path.display()))?;
        let records: Vec<CredentialRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse credentials file {}", path.display()))?;
        let store = Self::from_records(records, key)?;
        info!(path = %path.display(), count = store.records.len(), "credentials loaded");
        Ok(store)
    }

    /// Build a store from already-parsed records.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Invalid`] for a record with both secrets,
    /// neither secret, or a duplicated id.
    pub fn from_records(
        records: Vec<CredentialRecord>,
        key: MasterKey,
    ) -> Result<Self, CredentialError> {
        let mut map = HashMap::with_capacity(records.len());
        for record in records {
            match (&record.password, &record.private_key) {
                (Some(_), Some(_)) => {
                    return Err(CredentialError::Invalid {
                        id: record.id,
                        reason: "both password and private_key are set; exactly one is required"
                            .to_owned(),
                    });
                }
                (None, None) => {
                    return Err(CredentialError::Invalid {
                        id: record.id,
                        reason: "neither password nor private_key is set; exactly one is required"
                            .to_owned(),
                    });
                }
                _ => {}
            }
            let id = record.id.clone();
            if map.insert(id.clone(), record).is_some() {
                return Err(CredentialError::Invalid {
                    id,
                    reason: "duplicate credential id".to_owned(),
                });
            }
        }
        Ok(Self { records: map, key })
    }

    /// Open a sealed base64 blob into a UTF-8 secret.
    fn unseal(&self, id: &str, blob: &str) -> Result<String, CredentialError> {
        let sealed = BASE64
            .decode(blob.trim())
            .map_err(|e| CredentialError::Invalid {
                id: id.to_owned(),
                reason: format!("sealed secret is not valid base64: {e}"),
            })?;
        let plaintext = crypto::open(&self.key, &sealed)?;
        String::from_utf8(plaintext).map_err(|_| CredentialError::Invalid {
            id: id.to_owned(),
            reason: "decrypted secret is not valid UTF-8".to_owned(),
        })
    }
}

#[async_trait]
impl CredentialResolver for FileCredentialStore {
    async fn resolve(&self, connection_id: &str) -> Result<ConnectionParams, CredentialError> {
        let record = self
            .records
            .get(connection_id)
            .ok_or_else(|| CredentialError::NotFound {
                id: connection_id.to_owned(),
            })?;

        // Validation at load guarantees exactly one branch is taken.
        let auth = if let Some(blob) = &record.password {
            AuthMethod::Password(self.unseal(&record.id, blob)?)
        } else if let Some(blob) = &record.private_key {
            AuthMethod::PrivateKey(self.unseal(&record.id, blob)?)
        } else {
            return Err(CredentialError::Invalid {
                id: record.id.clone(),
                reason: "record has no secret".to_owned(),
            });
        };

        Ok(ConnectionParams {
            host: record.host.clone(),
            port: record.port,
            username: record.username.clone(),
            auth,
        })
    }
}

/// Seal a plaintext secret into the base64 form the credentials file
/// stores. Used by operator tooling and tests.
///
/// # Errors
///
/// Returns [`CredentialError::Crypto`] if encryption fails.
pub fn seal_secret(key: &MasterKey, plaintext: &str) -> Result<String, CredentialError> {
    let sealed = crypto::seal(key, plaintext.as_bytes())?;
    Ok(BASE64.encode(sealed))
}
