//! Model dispatch: lazy model construction, per-model bounded queues and
//! the worker loops that drive blocking engine calls.
//!
//! # Architecture
//!
//! ```text
//! dispatch(model, params)
//!        │
//!        ▼
//! ┌────────────────┐   first use: load under one lock
//! │  ModelManager  │ ─────────────────────────────────► EngineLoader
//! └───────┬────────┘
//!         │ bounded mode                direct mode
//!         ▼                                  │
//! ┌────────────────┐  try_send / QueueFull   │
//! │  ModelWorker   │                         │
//! │ (mpsc + slots) │                         │
//! └───────┬────────┘                         │
//!         │ N worker loops                   │
//!         ▼                                  ▼
//!    spawn_blocking(engine.synthesize) ◄─────┘
//! ```

mod config;
mod error;
mod manager;
mod metrics;
mod worker;

pub use config::{DispatchConfig, DispatchMode};
pub use error::DispatchError;
pub use manager::{ModelEntry, ModelManager, ModelStatus};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use worker::ModelWorker;
