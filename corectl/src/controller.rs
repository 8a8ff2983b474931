//! Core lifecycle controller
//!
//! [`CoreController`] owns the lifecycle of one external core instance. All
//! state lives behind a single mutex, and callbacks are delivered while that
//! mutex is held:
//!
//! - a reader never observes `Running` before `on_startup` has been dispatched
//! - two events from the same controller are never delivered concurrently
//!
//! The price is that a callback must not call back into the controller that
//! is delivering to it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use corectl::{Callback, CoreController, LoggingCallback};
//!
//! let callback: Arc<dyn Callback> = Arc::new(LoggingCallback);
//! let controller = CoreController::new(Some(&callback));
//!
//! controller.start("{\"inbounds\": []}").unwrap();
//! assert!(controller.is_running());
//! controller.stop().unwrap();
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::{normalize_buffer_size, PageBuffer};
use crate::config::ControllerConfig;
use crate::engine::{CoreEngine, EngineOptions, NullEngine};
use crate::error::{CallbackError, Error, Result};
use crate::event::{Callback, CoreState};
use crate::probe::{DelayProber, TcpProber};
use crate::protect::{NoOpProtector, Protector};
use crate::stats::{StatsSource, EMPTY_STATS};

/// Mutable controller state, guarded by the controller mutex
struct Inner {
    state: CoreState,
    /// Host owns the callback; we only hold a weak handle
    callback: Option<Weak<dyn Callback>>,
    /// Size used for the next page allocation
    buffer_size: usize,
    /// Allocated on start, released on stop
    page: Option<PageBuffer>,
}

impl Inner {
    fn callback_registered(&self) -> bool {
        self.callback
            .as_ref()
            .is_some_and(|cb| cb.strong_count() > 0)
    }

    fn set_state(&mut self, new_state: CoreState) {
        let old_state = self.state;
        self.state = new_state;
        if !new_state.is_transient() {
            log::info!("Core state: {} -> {}", old_state, new_state);
        }
    }
}

/// Point-in-time view of a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Current core state
    pub state: String,
    /// Whether the core is running
    pub running: bool,
    /// Whether a live callback is registered
    pub callback_registered: bool,
    /// Buffer size that the next start will allocate
    pub buffer_size: usize,
    /// Size of the buffer held by the current run, if any
    pub allocated_buffer: Option<usize>,
}

/// Thread-safe lifecycle controller for one external core instance.
pub struct CoreController {
    inner: Mutex<Inner>,
    engine: Arc<dyn CoreEngine>,
    protector: Arc<dyn Protector>,
    stats: Option<Arc<dyn StatsSource>>,
    prober: Arc<dyn DelayProber>,
}

impl CoreController {
    /// Create a controller with default collaborators and an optional callback
    pub fn new(callback: Option<&Arc<dyn Callback>>) -> Self {
        let config = ControllerConfig::default();
        Self {
            inner: Mutex::new(Inner {
                state: CoreState::Stopped,
                callback: callback.map(Arc::downgrade),
                buffer_size: config.effective_buffer_size(),
                page: None,
            }),
            engine: Arc::new(NullEngine),
            protector: Arc::new(NoOpProtector),
            stats: None,
            prober: Arc::new(TcpProber::new(config.probe_timeout())),
        }
    }

    /// Create a builder for wiring in collaborators
    pub fn builder() -> CoreControllerBuilder {
        CoreControllerBuilder::new()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the core with the given configuration text.
    ///
    /// On success the core is `Running` and `on_startup` has been delivered
    /// before this returns.
    pub fn start(&self, config: &str) -> Result<()> {
        if config.trim().is_empty() {
            return Err(Error::InvalidConfig("config is empty".into()));
        }

        let mut inner = self.lock();
        if inner.state != CoreState::Stopped {
            return Err(Error::AlreadyRunning);
        }

        inner.set_state(CoreState::Starting);
        let options = EngineOptions {
            buffer_size: inner.buffer_size,
        };
        log::info!("Starting core with {} byte buffer", options.buffer_size);

        let started = PageBuffer::new(options.buffer_size).and_then(|mut page| {
            guard_engine("start", || self.engine.start(config, &options, &mut page))?;
            Ok(page)
        });

        let page = match started {
            Ok(page) => page,
            Err(e) => {
                inner.set_state(CoreState::Stopped);
                log::warn!("Core failed to start: {}", e);
                let message = format!("start failed: {}", e);
                deliver(inner.callback.as_ref(), Event::Status(&message));
                return Err(e);
            }
        };

        inner.page = Some(page);
        inner.set_state(CoreState::Running);
        deliver(inner.callback.as_ref(), Event::Startup);
        Ok(())
    }

    /// Stop the running core.
    ///
    /// Calling this on a stopped core is an error, not a no-op. If the
    /// engine reports a failure the controller still ends up `Stopped` and
    /// `on_shutdown` still fires; the failure is returned afterwards.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != CoreState::Running {
            return Err(Error::NotRunning);
        }

        inner.set_state(CoreState::Stopping);
        let result = guard_engine("stop", || self.engine.stop());
        inner.page = None;
        inner.set_state(CoreState::Stopped);

        if let Err(ref e) = result {
            log::warn!("Core engine reported an error while stopping: {}", e);
            let message = format!("stop failed: {}", e);
            deliver(inner.callback.as_ref(), Event::Status(&message));
        }
        deliver(inner.callback.as_ref(), Event::Shutdown);
        result
    }

    /// Check whether the core is running
    pub fn is_running(&self) -> bool {
        self.lock().state.is_running()
    }

    /// Get the current state; only ever `Stopped` or `Running` from outside
    pub fn state(&self) -> CoreState {
        self.lock().state
    }

    /// Replace the registered callback for all later events
    pub fn set_callback(&self, callback: &Arc<dyn Callback>) {
        self.lock().callback = Some(Arc::downgrade(callback));
    }

    /// Remove the registered callback
    pub fn clear_callback(&self) {
        self.lock().callback = None;
    }

    /// Check whether a live callback is registered
    pub fn callback_registered(&self) -> bool {
        self.lock().callback_registered()
    }

    /// Deliver a status message to the registered callback.
    ///
    /// Must not be called from inside a callback of this controller.
    pub fn notify_status(&self, message: &str) {
        let inner = self.lock();
        deliver(inner.callback.as_ref(), Event::Status(message));
    }

    /// Look up a statistic.
    ///
    /// Returns [`EMPTY_STATS`] when the core is not running, no stats
    /// source is configured, or the key is unknown.
    pub fn query_stats(&self, key: &str) -> String {
        let inner = self.lock();
        if !inner.state.is_running() {
            return EMPTY_STATS.to_string();
        }

        self.stats
            .as_ref()
            .and_then(|stats| stats.query(key))
            .unwrap_or_else(|| EMPTY_STATS.to_string())
    }

    /// Measure the delay to `target` through the configured prober.
    ///
    /// The lock is released before probing, so a slow probe does not stall
    /// other operations. The call is bounded by the prober's timeout.
    pub fn measure_delay(&self, target: &str) -> Result<Duration> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }

        match self.prober.probe(target) {
            Ok(delay) => {
                log::debug!("Delay to {}: {} ms", target, delay.as_millis());
                Ok(delay)
            }
            Err(e @ Error::Unreachable(_)) => Err(e),
            Err(e) => Err(Error::Unreachable(format!("{}: {}", target, e))),
        }
    }

    /// Exclude `identifier` from VPN routing.
    ///
    /// Returns `false` without asking the platform when the core is not
    /// running.
    pub fn protect(&self, identifier: &str) -> bool {
        let inner = self.lock();
        if !inner.state.is_running() {
            return false;
        }

        let protected = self.protector.protect(identifier);
        log::debug!("Protect {}: {}", identifier, protected);
        protected
    }

    /// Set the buffer size for the next start; non-positive sizes fall back
    /// to the default and oversized ones are clamped to
    /// [`MAX_BUFFER_SIZE`](crate::buffer::MAX_BUFFER_SIZE). A buffer already
    /// in use keeps its size.
    pub fn set_buffer_size(&self, size: i64) {
        let size = normalize_buffer_size(size);
        self.lock().buffer_size = size;
        log::debug!("Buffer size set to {} bytes", size);
    }

    /// Alias of [`set_buffer_size`](Self::set_buffer_size) under the mobile binding's name
    pub fn set_page_file_size(&self, size: i64) {
        self.set_buffer_size(size);
    }

    /// Buffer size the next start will allocate
    pub fn buffer_size(&self) -> usize {
        self.lock().buffer_size
    }

    /// Get a status snapshot
    pub fn status(&self) -> StatusInfo {
        let inner = self.lock();
        StatusInfo {
            state: inner.state.description().to_string(),
            running: inner.state.is_running(),
            callback_registered: inner.callback_registered(),
            buffer_size: inner.buffer_size,
            allocated_buffer: inner.page.as_ref().map(PageBuffer::len),
        }
    }

    /// Get a status snapshot as JSON
    pub fn status_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.status())?)
    }

    /// One-line state dump for debugging
    pub fn debug_status(&self) -> String {
        let inner = self.lock();
        format!(
            "[CoreController] IsRunning={}, CallbackHandler={}",
            inner.state.is_running(),
            if inner.callback_registered() { "registered" } else { "none" }
        )
    }
}

impl Drop for CoreController {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.state.is_running() {
            log::warn!("Core controller dropped while running, stopping engine");
            if let Err(e) = guard_engine("stop", || self.engine.stop()) {
                log::warn!("Core engine reported an error while stopping: {}", e);
            }
            inner.page = None;
            inner.state = CoreState::Stopped;
        }
    }
}

/// Builder for [`CoreController`]
#[derive(Default)]
pub struct CoreControllerBuilder {
    callback: Option<Weak<dyn Callback>>,
    engine: Option<Arc<dyn CoreEngine>>,
    protector: Option<Arc<dyn Protector>>,
    stats: Option<Arc<dyn StatsSource>>,
    prober: Option<Arc<dyn DelayProber>>,
    config: ControllerConfig,
}

impl CoreControllerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the host callback
    pub fn callback(mut self, callback: &Arc<dyn Callback>) -> Self {
        self.callback = Some(Arc::downgrade(callback));
        self
    }

    /// Set the core engine
    pub fn engine(mut self, engine: Arc<dyn CoreEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the traffic protector
    pub fn protector(mut self, protector: Arc<dyn Protector>) -> Self {
        self.protector = Some(protector);
        self
    }

    /// Set the statistics source
    pub fn stats(mut self, stats: Arc<dyn StatsSource>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Set the delay prober; overrides the configured probe timeout
    pub fn prober(mut self, prober: Arc<dyn DelayProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Apply controller settings
    pub fn config(mut self, config: &ControllerConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Build and validate the controller
    pub fn build(self) -> Result<CoreController> {
        self.config.validate()?;

        let prober = self
            .prober
            .unwrap_or_else(|| Arc::new(TcpProber::new(self.config.probe_timeout())));

        Ok(CoreController {
            inner: Mutex::new(Inner {
                state: CoreState::Stopped,
                callback: self.callback,
                buffer_size: self.config.effective_buffer_size(),
                page: None,
            }),
            engine: self.engine.unwrap_or_else(|| Arc::new(NullEngine)),
            protector: self.protector.unwrap_or_else(|| Arc::new(NoOpProtector)),
            stats: self.stats,
            prober,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Event<'a> {
    Status(&'a str),
    Startup,
    Shutdown,
}

impl Event<'_> {
    fn name(&self) -> &'static str {
        match self {
            Event::Status(_) => "on_status",
            Event::Startup => "on_startup",
            Event::Shutdown => "on_shutdown",
        }
    }
}

/// Deliver one event; failures and panics in the callback are logged and
/// swallowed.
fn deliver(callback: Option<&Weak<dyn Callback>>, event: Event<'_>) {
    let Some(callback) = callback.and_then(Weak::upgrade) else {
        log::debug!("No live callback for {}", event.name());
        return;
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
        Event::Status(message) => callback.on_status(message),
        Event::Startup => callback.on_startup(),
        Event::Shutdown => callback.on_shutdown(),
    }));

    let err = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => Error::Callback(e),
        Err(payload) => Error::Callback(CallbackError::new(format!(
            "panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };
    log::warn!("{} {}", event.name(), err);
}

/// Run an engine call, folding panics and foreign errors into `Error::Engine`
/// so a misbehaving engine cannot wedge the state machine.
fn guard_engine(op: &str, f: impl FnOnce() -> Result<()>) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e @ Error::Engine(_))) => Err(e),
        Ok(Err(e)) => Err(Error::Engine(format!("{}: {}", op, e))),
        Err(payload) => Err(Error::Engine(format!(
            "{} panicked: {}",
            op,
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
