//! Core Controller
//!
//! This crate provides a thread-safe lifecycle controller for an external
//! VPN core, meant to sit behind a mobile host application's bindings.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Host Application                         │
//! │        (mobile bindings, implements Callback)               │
//! └───────────────┬───────────────────────────▲─────────────────┘
//!                 │ start / stop / query      │ on_startup
//!                 ▼                           │ on_shutdown
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    corectl                                  │
//! │  - CoreController (state machine behind one mutex)          │
//! │  - Callback (host event interface)                          │
//! │  - ControllerConfig (TOML settings)                         │
//! └───────────────┬─────────────────────────────────────────────┘
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Collaborators                            │
//! │  ┌──────────────┐ ┌───────────┐ ┌─────────────┐ ┌─────────┐ │
//! │  │  CoreEngine  │ │ Protector │ │ StatsSource │ │ Prober  │ │
//! │  └──────────────┘ └───────────┘ └─────────────┘ └─────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod buffer;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event;
pub mod mock;
pub mod probe;
pub mod protect;
pub mod stats;

pub use buffer::{PageBuffer, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
pub use config::ControllerConfig;
pub use controller::{CoreController, CoreControllerBuilder, StatusInfo};
pub use engine::{CoreEngine, EngineOptions, NullEngine};
pub use error::{CallbackError, Error, Result};
pub use event::{Callback, CallbackResult, CoreState, LoggingCallback};
pub use probe::{DelayProber, TcpProber};
pub use protect::{FnProtector, NoOpProtector, Protector};
pub use stats::{SharedStats, StatsSnapshot, StatsSource, EMPTY_STATS};
