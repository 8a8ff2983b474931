//! Mock collaborators for testing
//!
//! These stand in for the host callback, the core engine and the delay
//! prober so controller behaviour can be checked without a real core:
//!
//! - [`RecordingCallback`] keeps an ordered log of delivered events
//! - [`MockEngine`] counts calls and can be told to fail or stall
//! - [`StaticProber`] answers from a fixed table of delays
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use corectl::mock::RecordingCallback;
//! use corectl::{Callback, CoreController};
//!
//! let recorder = Arc::new(RecordingCallback::new());
//! let callback: Arc<dyn Callback> = recorder.clone();
//! let controller = CoreController::new(Some(&callback));
//!
//! controller.start("cfg1").unwrap();
//! controller.stop().unwrap();
//! assert_eq!(recorder.events(), vec!["OnStartup", "OnShutdown"]);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::buffer::PageBuffer;
use crate::engine::{CoreEngine, EngineOptions};
use crate::error::{Error, Result};
use crate::event::{Callback, CallbackResult};
use crate::probe::DelayProber;

/// Callback that records every event it receives, in order
#[derive(Debug, Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far; status events are recorded as `OnStatus: <message>`
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of times `name` was recorded
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == name).count()
    }

    /// Status messages seen so far
    pub fn status_messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_prefix("OnStatus: ").map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Callback for RecordingCallback {
    fn on_status(&self, message: &str) -> CallbackResult {
        self.push(format!("OnStatus: {}", message));
        Ok(())
    }

    fn on_startup(&self) -> CallbackResult {
        self.push("OnStartup".to_string());
        Ok(())
    }

    fn on_shutdown(&self) -> CallbackResult {
        self.push("OnShutdown".to_string());
        Ok(())
    }
}

/// Scriptable engine that counts calls
#[derive(Debug, Default)]
pub struct MockEngine {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
    start_delay: Mutex<Duration>,
    last_config: Mutex<Option<String>>,
    last_options: Mutex<Option<EngineOptions>>,
    last_page_len: Mutex<Option<usize>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent starts fail
    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent stops fail
    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every start
    pub fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = delay;
    }

    /// Number of start calls, successful or not
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of stop calls, successful or not
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Config text from the last start
    pub fn last_config(&self) -> Option<String> {
        self.last_config.lock().unwrap().clone()
    }

    /// Options from the last start
    pub fn last_options(&self) -> Option<EngineOptions> {
        *self.last_options.lock().unwrap()
    }

    /// Length of the page buffer lent to the last start
    pub fn last_page_len(&self) -> Option<usize> {
        *self.last_page_len.lock().unwrap()
    }
}

impl CoreEngine for MockEngine {
    fn start(&self, config: &str, options: &EngineOptions, page: &mut PageBuffer) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.to_string());
        *self.last_options.lock().unwrap() = Some(*options);
        *self.last_page_len.lock().unwrap() = Some(page.len());

        if page.iter().any(|&b| b != 0) {
            return Err(Error::Engine("page buffer not zeroed".into()));
        }
        // mark the page so a reused buffer would be caught on the next start
        page.fill(0xA5);

        let delay = *self.start_delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Engine("mock start failure".into()));
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(Error::Engine("mock stop failure".into()));
        }
        Ok(())
    }
}

/// Prober that answers from a fixed table; unknown targets are unreachable
#[derive(Debug, Default)]
pub struct StaticProber {
    delays: HashMap<String, Duration>,
}

impl StaticProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `delay` for `target`
    pub fn with_delay(mut self, target: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(target.into(), delay);
        self
    }
}

impl DelayProber for StaticProber {
    fn probe(&self, target: &str) -> Result<Duration> {
        self.delays
            .get(target)
            .copied()
            .ok_or_else(|| Error::Unreachable(target.to_string()))
    }
}
