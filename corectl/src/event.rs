//! Core lifecycle state and host callbacks

use crate::error::CallbackError;

/// Lifecycle state of the managed core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreState {
    /// Core is not running
    #[default]
    Stopped,
    /// Engine is being brought up
    Starting,
    /// Engine is up and serving traffic
    Running,
    /// Engine is being torn down
    Stopping,
}

impl CoreState {
    /// Check if the core is fully running
    pub fn is_running(&self) -> bool {
        matches!(self, CoreState::Running)
    }

    /// Check if the state is a transient marker held only inside a transition
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreState::Starting | CoreState::Stopping)
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            CoreState::Stopped => "Stopped",
            CoreState::Starting => "Starting...",
            CoreState::Running => "Running",
            CoreState::Stopping => "Stopping...",
        }
    }
}

impl std::fmt::Display for CoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Outcome of a single callback delivery
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Host-side receiver for core lifecycle events.
///
/// Deliveries from one controller are serialized under its lock, so an
/// implementation never sees two events from the same controller at once.
/// Implementations must not call back into the controller that is
/// delivering the event; doing so deadlocks.
pub trait Callback: Send + Sync {
    /// Free-form status text from the controller or engine
    fn on_status(&self, message: &str) -> CallbackResult;

    /// The core reached `Running`
    fn on_startup(&self) -> CallbackResult;

    /// The core reached `Stopped`
    fn on_shutdown(&self) -> CallbackResult;
}

/// Simple callback that logs events
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCallback;

impl Callback for LoggingCallback {
    fn on_status(&self, message: &str) -> CallbackResult {
        log::info!("Core status: {}", message);
        Ok(())
    }

    fn on_startup(&self) -> CallbackResult {
        log::info!("Core started");
        Ok(())
    }

    fn on_shutdown(&self) -> CallbackResult {
        log::info!("Core shut down");
        Ok(())
    }
}
