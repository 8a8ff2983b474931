//! Error types for the core controller

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a host callback implementation.
///
/// The controller never hands these back to the caller of `start`/`stop`;
/// they are logged and dropped.
#[derive(Debug, Clone, Error)]
#[error("callback failed: {0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur during controller operations
#[derive(Debug, Error)]
pub enum Error {
    /// The core configuration passed to `start` is unusable
    #[error("invalid core config: {0}")]
    InvalidConfig(String),

    /// Already running
    #[error("core is already running")]
    AlreadyRunning,

    /// Not running
    #[error("core is not running")]
    NotRunning,

    /// Delay probe could not reach the target
    #[error("target unreachable: {0}")]
    Unreachable(String),

    /// A callback failed or panicked
    #[error(transparent)]
    Callback(#[from] CallbackError),

    /// The core engine rejected a start or stop request
    #[error("engine error: {0}")]
    Engine(String),

    /// The controller-owned I/O buffer could not be allocated
    #[error("buffer allocation failed: {0}")]
    BufferAlloc(String),

    /// Controller configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to parse controller configuration
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to serialize a status snapshot
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error reflects the controller being in the wrong state
    pub fn is_state_error(&self) -> bool {
        matches!(self, Error::AlreadyRunning | Error::NotRunning)
    }

    /// Check if retrying the same call later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Unreachable(_) | Error::Engine(_) | Error::Io(_)
        )
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_) | Error::Config(_) | Error::ConfigParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::AlreadyRunning.is_state_error());
        assert!(!Error::NotRunning.is_recoverable());
        assert!(!Error::AlreadyRunning.is_recoverable());
        assert!(Error::Unreachable("proxy:443".into()).is_recoverable());
        assert!(Error::InvalidConfig("empty".into()).is_config_error());
        assert!(!Error::InvalidConfig("empty".into()).is_recoverable());
    }

    #[test]
    fn test_callback_error_display() {
        let err: Error = CallbackError::new("boom").into();
        assert_eq!(err.to_string(), "callback failed: boom");
    }
}
