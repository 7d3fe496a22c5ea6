//! Job records and waiter-facing handles.

use std::fmt;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::request::{Fingerprint, SynthesisRequest};
use crate::store::ArtifactHandle;
use crate::voice::VoiceStyle;

/// Shared outcome delivered to every waiter of a job.
pub(crate) type JobResult = Result<ArtifactHandle>;

/// Lifecycle of a job. `Queued → Running → {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

pub(crate) struct Waiter {
    pub(crate) id: u64,
    pub(crate) tx: oneshot::Sender<JobResult>,
}

/// One in-flight synthesis, owned exclusively by the scheduler.
///
/// Waiters hold only a [`WaiterHandle`] plus the receiving half of their
/// oneshot channel; all of them are resolved together with clones of the
/// same result.
pub(crate) struct Job {
    pub(crate) request: SynthesisRequest,
    pub(crate) voice: VoiceStyle,
    pub(crate) state: JobState,
    pub(crate) waiters: Vec<Waiter>,
    pub(crate) result: Option<JobResult>,
    pub(crate) created_at: Instant,
    pub(crate) started_at: Option<Instant>,
    pub(crate) completed_at: Option<Instant>,
}

impl Job {
    pub(crate) fn new(request: SynthesisRequest, voice: VoiceStyle) -> Self {
        Self {
            request,
            voice,
            state: JobState::Queued,
            waiters: Vec::new(),
            result: None,
            created_at: Instant::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub(crate) fn attach_waiter(&mut self, id: u64) -> oneshot::Receiver<JobResult> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(Waiter { id, tx });
        rx
    }

    /// Detach one waiter. Returns its sender so the caller decides whether
    /// to resolve it (queue timeout) or drop it (explicit cancel).
    pub(crate) fn detach_waiter(&mut self, id: u64) -> Option<oneshot::Sender<JobResult>> {
        let pos = self.waiters.iter().position(|w| w.id == id)?;
        Some(self.waiters.swap_remove(pos).tx)
    }
}

/// Identifies one waiter attached to a job; passed to `cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterHandle {
    pub(crate) fingerprint: Fingerprint,
    pub(crate) waiter_id: u64,
}

impl WaiterHandle {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

pub(crate) enum TicketOutcome {
    /// Resolved at submit time: artifact cache hit, or a terminal job still
    /// inside its grace window.
    Ready(JobResult),
    /// Waiting on a queued or running job.
    Pending(oneshot::Receiver<JobResult>),
}

/// A submitted request's claim on a future result.
pub struct Ticket {
    pub(crate) handle: WaiterHandle,
    pub(crate) outcome: TicketOutcome,
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("handle", &self.handle)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Ticket {
    /// Handle for cancelling this waiter.
    pub fn handle(&self) -> WaiterHandle {
        self.handle
    }

    /// Whether the result was available without queueing (cache hit or a
    /// just-completed job).
    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, TicketOutcome::Ready(_))
    }

    /// Wait for the job to complete.
    ///
    /// A closed channel means this waiter was detached via `cancel`.
    pub async fn wait(self) -> Result<ArtifactHandle> {
        match self.outcome {
            TicketOutcome::Ready(result) => result,
            TicketOutcome::Pending(rx) => rx.await.unwrap_or(Err(Error::Cancelled)),
        }
    }
}
