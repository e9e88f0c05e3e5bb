//! Shared primitives for all Rust crates in Dolimirror.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across Dolimirror crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// The variants separate failures that block an operation outright
/// (configuration, validation) from failures the offline-first layer
/// recovers from by falling back to the local mirror (transport, remote
/// status, decode). Callers that absorb an error record its message as
/// observable state instead of propagating it.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Required configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote credential is missing, invalid, or expired.
    #[error("credential error: {0}")]
    Credential(String),

    /// The remote endpoint could not be reached at the transport level.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote endpoint answered with a non-success status.
    #[error("remote returned status {status}: {message}")]
    RemoteStatus {
        /// HTTP status code returned by the remote endpoint.
        status: u16,
        /// Response body or status text accompanying the failure.
        message: String,
    },

    /// The remote payload could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The local store failed to read or persist data.
    #[error("storage error: {0}")]
    Storage(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation conflicts with in-flight or existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true when the failure is recoverable by serving the local
    /// mirror instead of the remote collection.
    #[must_use]
    pub fn is_recoverable_offline(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RemoteStatus { .. } | Self::Decode(_) | Self::Credential(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn transport_errors_are_recoverable_offline() {
        let error = AppError::Transport("connection refused".to_owned());
        assert!(error.is_recoverable_offline());
    }

    #[test]
    fn configuration_errors_are_not_recoverable_offline() {
        let error = AppError::Configuration("base URL is not configured".to_owned());
        assert!(!error.is_recoverable_offline());
    }

    #[test]
    fn remote_status_formats_code_and_message() {
        let error = AppError::RemoteStatus {
            status: 503,
            message: "maintenance".to_owned(),
        };
        assert_eq!(error.to_string(), "remote returned status 503: maintenance");
    }
}
