//! HTTP error types for the Shellgate server.
//!
//! Maps bridge errors from `shellgate-core` into typed HTTP responses.
//! Every variant produces a JSON body with a machine-readable `error`
//! field and a human-readable `message`; the terminal UI branches on the
//! code to suggest "check credentials" vs "check host/connectivity".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use shellgate_core::error::{BridgeError, CredentialError, SessionError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid bearer token.
    Unauthorized(String),
    /// No credential record for the requested id.
    CredentialNotFound(String),
    /// The remote host rejected the credential.
    AuthFailed(String),
    /// The remote host was unreachable or refused the handshake.
    ConnectFailed(String),
    /// The handshake did not finish within the connect timeout.
    ConnectTimeout(String),
    /// Auth succeeded but no interactive shell could be allocated.
    ShellFailed(String),
    /// No live session for the given connection id.
    NotConnected(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::CredentialNotFound(msg) => {
                (StatusCode::NOT_FOUND, "credential-not-found", msg)
            }
            Self::AuthFailed(msg) => (StatusCode::BAD_GATEWAY, "auth-failed", msg),
            Self::ConnectFailed(msg) => (StatusCode::BAD_GATEWAY, "connect-failed", msg),
            Self::ConnectTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "connect-timeout", msg),
            Self::ShellFailed(msg) => (StatusCode::BAD_GATEWAY, "shell-failed", msg),
            Self::NotConnected(msg) => (StatusCode::CONFLICT, "not-connected", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal-error", msg),
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Credential(inner) => match inner {
                CredentialError::NotFound { .. } => Self::CredentialNotFound(inner.to_string()),
                // Malformed records and decryption failures are server-side
                // configuration problems, not client errors.
                CredentialError::Invalid { .. } | CredentialError::Crypto(_) => {
                    Self::Internal(inner.to_string())
                }
            },
            BridgeError::Session(inner) => match inner {
                SessionError::Connect { .. } => Self::ConnectFailed(inner.to_string()),
                SessionError::ConnectTimeout { .. } => Self::ConnectTimeout(inner.to_string()),
                SessionError::AuthFailed { .. } | SessionError::InvalidKey { .. } => {
                    Self::AuthFailed(inner.to_string())
                }
                SessionError::ShellFailed { .. } => Self::ShellFailed(inner.to_string()),
                SessionError::Transport { .. } | SessionError::Closed => {
                    Self::Internal(inner.to_string())
                }
            },
            BridgeError::NotConnected { .. } => Self::NotConnected(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn bridge_errors_map_to_distinct_statuses() {
        let not_found = BridgeError::Credential(CredentialError::NotFound {
            id: "cred-404".to_owned(),
        });
        assert_eq!(status_of(not_found.into()), StatusCode::NOT_FOUND);

        let auth = BridgeError::Session(SessionError::AuthFailed {
            username: "student".to_owned(),
        });
        assert_eq!(status_of(auth.into()), StatusCode::BAD_GATEWAY);

        let timeout = BridgeError::Session(SessionError::ConnectTimeout {
            host: "lab-1".to_owned(),
            port: 22,
            timeout_secs: 20,
        });
        assert_eq!(status_of(timeout.into()), StatusCode::GATEWAY_TIMEOUT);

        let not_connected = BridgeError::NotConnected {
            id: "cred-1".to_owned(),
        };
        assert_eq!(status_of(not_connected.into()), StatusCode::CONFLICT);
    }
}
