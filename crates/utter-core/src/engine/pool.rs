//! Fixed-size pool of exclusive engine slots.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use super::{EngineFactory, SynthesisEngine};
use crate::error::{Error, Result};

/// Pool of synthesis engine instances, each usable by one task at a time.
///
/// A semaphore permit corresponds to exactly one idle engine on the free
/// list: permits are acquired before popping and released only after the
/// engine is pushed back, so `acquire` never observes an empty list.
pub struct EnginePool {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    factory: Arc<dyn EngineFactory>,
    free: Mutex<Vec<Box<dyn SynthesisEngine>>>,
    permits: Arc<Semaphore>,
    /// Slots that are currently backed by a working engine (idle or busy).
    usable: AtomicUsize,
    configured: usize,
}

impl EnginePool {
    /// Build a pool of `size` slots.
    ///
    /// Engine construction is fallible; broken slots are logged and skipped
    /// rather than failing the whole pool. A pool with zero usable slots is
    /// still returned; `acquire` reports `EngineUnavailable` for it.
    pub fn new(factory: Arc<dyn EngineFactory>, size: usize) -> Self {
        let mut free: Vec<Box<dyn SynthesisEngine>> = Vec::with_capacity(size);
        for slot in 0..size {
            match factory.create() {
                Ok(engine) => free.push(engine),
                Err(err) => warn!("engine slot {} unusable at startup: {}", slot, err),
            }
        }

        let usable = free.len();
        if usable < size {
            warn!(
                "engine pool started with {}/{} usable slots",
                usable, size
            );
        } else {
            info!("engine pool started with {} slots", usable);
        }

        Self {
            shared: Arc::new(PoolShared {
                factory,
                permits: Arc::new(Semaphore::new(usable)),
                free: Mutex::new(free),
                usable: AtomicUsize::new(usable),
                configured: size,
            }),
        }
    }

    /// Number of slots currently backed by a working engine.
    pub fn usable_slots(&self) -> usize {
        self.shared.usable.load(Ordering::Relaxed)
    }

    /// Number of slots free right now.
    pub fn idle_slots(&self) -> usize {
        self.shared.permits.available_permits()
    }

    /// Configured pool size, including slots that failed to come up.
    pub fn configured_slots(&self) -> usize {
        self.shared.configured
    }

    /// Acquire an exclusive slot, suspending until one is free.
    ///
    /// Returns `EngineUnavailable` immediately when no slot is backed by a
    /// working engine at all.
    pub async fn acquire(&self) -> Result<EngineSlot> {
        if self.usable_slots() == 0 {
            return Err(Error::EngineUnavailable);
        }

        let permit = self
            .shared
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::EngineUnavailable)?;

        let engine = self
            .shared
            .free
            .lock()
            .expect("engine free list poisoned")
            .pop()
            .expect("free list out of sync with permits");

        Ok(EngineSlot {
            engine: Some(engine),
            permit: Some(permit),
            shared: self.shared.clone(),
        })
    }

    /// Discard a slot whose engine is wedged mid-synthesis.
    ///
    /// The engine cannot be safely interrupted, so the instance (wherever
    /// the runaway call is still holding it) is abandoned and dropped when
    /// that call finally returns. Capacity is restored by constructing a
    /// fresh instance off-thread; if construction fails the pool shrinks.
    pub fn abort(&self, mut slot: EngineSlot) {
        // Drop any engine still attached; a timed-out synthesis has usually
        // already moved it into the blocking task.
        slot.engine = None;
        if let Some(permit) = slot.permit.take() {
            permit.forget();
        }
        debug!("engine slot aborted, rebuilding instance");
        PoolShared::spawn_rebuild(self.shared.clone());
    }
}

impl PoolShared {
    fn spawn_rebuild(shared: Arc<PoolShared>) {
        tokio::spawn(async move {
            let factory = shared.factory.clone();
            let built = tokio::task::spawn_blocking(move || factory.create()).await;
            match built {
                Ok(Ok(engine)) => {
                    shared
                        .free
                        .lock()
                        .expect("engine free list poisoned")
                        .push(engine);
                    shared.permits.add_permits(1);
                    debug!("replacement engine instance ready");
                }
                Ok(Err(err)) => {
                    let left = shared.usable.fetch_sub(1, Ordering::Relaxed) - 1;
                    warn!("engine rebuild failed ({}), {} usable slots left", err, left);
                }
                Err(err) => {
                    let left = shared.usable.fetch_sub(1, Ordering::Relaxed) - 1;
                    warn!(
                        "engine rebuild task panicked ({}), {} usable slots left",
                        err, left
                    );
                }
            }
        });
    }
}

/// Exclusive-use handle to one engine instance.
///
/// Dropping the slot returns the engine to the free set; release happens on
/// every exit path, including errors and timeouts.
pub struct EngineSlot {
    engine: Option<Box<dyn SynthesisEngine>>,
    permit: Option<OwnedSemaphorePermit>,
    shared: Arc<PoolShared>,
}

impl EngineSlot {
    /// Move the engine out so it can be driven from a blocking task.
    ///
    /// The caller must either `restore` the engine before dropping the slot
    /// or hand the slot to [`EnginePool::abort`].
    pub fn take_engine(&mut self) -> Option<Box<dyn SynthesisEngine>> {
        self.engine.take()
    }

    /// Put the engine back after a completed synthesis.
    pub fn restore(&mut self, engine: Box<dyn SynthesisEngine>) {
        self.engine = Some(engine);
    }
}

impl fmt::Debug for EngineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSlot")
            .field("engine_attached", &self.engine.is_some())
            .finish()
    }
}

impl Drop for EngineSlot {
    fn drop(&mut self) {
        match (self.engine.take(), self.permit.take()) {
            (Some(engine), permit) => {
                // Push before the permit drops so a woken acquirer finds it.
                self.shared
                    .free
                    .lock()
                    .expect("engine free list poisoned")
                    .push(engine);
                drop(permit);
            }
            (None, Some(permit)) => {
                // Engine was taken and never restored or aborted. Keep the
                // permit count honest and rebuild if a runtime is around.
                permit.forget();
                if tokio::runtime::Handle::try_current().is_ok() {
                    PoolShared::spawn_rebuild(self.shared.clone());
                } else {
                    self.shared.usable.fetch_sub(1, Ordering::Relaxed);
                }
            }
            (None, None) => {}
        }
    }
}
