//! Core engine collaborator
//!
//! The controller never runs traffic itself. It hands the opaque core
//! configuration to a [`CoreEngine`] and tracks whether that engine is up.

use crate::buffer::PageBuffer;
use crate::error::Result;

/// Options handed to the engine on every start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Size of the controller-owned I/O buffer allocated for this run
    pub buffer_size: usize,
}

/// The external core process or library driven by the controller.
///
/// Both methods are called with the controller lock held and must not call
/// back into the controller.
pub trait CoreEngine: Send + Sync {
    /// Bring the core up with the given configuration text.
    ///
    /// `page` is the controller-owned I/O buffer for this run, sized to
    /// `options.buffer_size`. It is freed when the core stops.
    fn start(&self, config: &str, options: &EngineOptions, page: &mut PageBuffer) -> Result<()>;

    /// Tear the core down
    fn stop(&self) -> Result<()>;
}

/// Engine used when the host does not supply one; accepts every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEngine;

impl CoreEngine for NullEngine {
    fn start(&self, config: &str, options: &EngineOptions, page: &mut PageBuffer) -> Result<()> {
        log::debug!(
            "Null engine start: {} bytes of config, buffer {} of {} bytes",
            config.len(),
            page.len(),
            options.buffer_size
        );
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        log::debug!("Null engine stop");
        Ok(())
    }
}
