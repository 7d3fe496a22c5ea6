//! Error types for the synthesis core.
//!
//! Every variant carries owned data so results stay `Clone`: a single job
//! outcome is fanned out verbatim to every waiter attached to it.

use thiserror::Error;

/// Core error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Request was rejected before a job was created.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested voice id is not in the catalog.
    #[error("unknown voice '{0}'")]
    UnknownVoice(String),

    /// The engine pool has no usable slots at all.
    #[error("no usable synthesis engines available")]
    EngineUnavailable,

    /// A waiter gave up before its job was dispatched. Other waiters on the
    /// same job are unaffected.
    #[error("timed out waiting for a free engine slot")]
    QueueTimeout,

    /// Synthesis exceeded the configured run timeout. The engine slot is
    /// forcibly reclaimed.
    #[error("synthesis exceeded the run timeout")]
    SynthesisTimeout,

    /// The engine reported an internal failure.
    #[error("synthesis failed: {0}")]
    SynthesisFailure(String),

    /// Writing the artifact to disk failed. No partial file is left visible.
    #[error("artifact storage failed: {0}")]
    StorageFailure(String),

    /// The waiter was detached via `cancel` before the job completed.
    #[error("request was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
