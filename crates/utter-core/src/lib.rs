//! Utter Core - job scheduling and resource management for speech synthesis.
//!
//! This crate multiplexes concurrent synthesis requests across a fixed pool
//! of non-thread-safe engine instances, with single-flight deduplication,
//! backpressure, and lifecycle management of generated audio artifacts.
//!
//! # Architecture
//!
//! ```text
//! submit ──► Scheduler ──► ArtifactStore (cache hit? return handle)
//!                │ miss
//!                ▼
//!           Job table (single-flight, FIFO queue)
//!                │ dispatch
//!                ▼
//!           EnginePool slot ──► blocking synthesis ──► ArtifactStore.put
//! ```
//!
//! # Example
//!
//! ```ignore
//! use utter_core::{ServiceConfig, SynthesisRequest, SynthesisService};
//!
//! let service = SynthesisService::new(ServiceConfig::default())?;
//! let handle = service
//!     .synthesize(SynthesisRequest::new("Hello, world!", "en-us"))
//!     .await?;
//! let audio = service.read_artifact(&handle).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod request;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod voice;

pub use config::ServiceConfig;
pub use engine::{EngineFactory, EnginePool, EngineSlot, SynthesisEngine, ToneEngine, ToneEngineFactory};
pub use error::{Error, Result};
pub use request::{Fingerprint, SynthesisRequest};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats, Ticket, WaiterHandle};
pub use service::{ServiceStats, SynthesisService};
pub use store::{ArtifactHandle, ArtifactStore};
pub use voice::{VoiceCatalog, VoiceStyle};
