//! Synthesis engine abstraction and the exclusive-slot pool.
//!
//! The underlying engines are opaque and not safe for concurrent use, so
//! they are only ever reachable through an [`EngineSlot`] handed out by the
//! [`EnginePool`]. The `&mut self` receiver on [`SynthesisEngine`] makes the
//! mutual-exclusion invariant a type-level fact rather than a convention.

mod pool;
mod tone;

pub use pool::{EnginePool, EngineSlot};
pub use tone::{ToneEngine, ToneEngineFactory};

use crate::error::Result;
use crate::voice::VoiceStyle;

/// One instance of an external speech-synthesis engine.
///
/// `synthesize` is blocking and potentially slow; callers run it under
/// `spawn_blocking`. Implementations report internal engine errors as
/// [`crate::Error::SynthesisFailure`].
pub trait SynthesisEngine: Send {
    /// Render `text` to encoded audio bytes (WAV).
    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceStyle,
        rate: f32,
        volume: f32,
    ) -> Result<Vec<u8>>;
}

/// Builds engine instances for the pool.
///
/// Construction is fallible (platform voice drivers may be missing); the
/// pool initializes with whatever subset of slots comes up, and uses the
/// factory again to replace instances discarded by an abort.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn SynthesisEngine>>;
}
