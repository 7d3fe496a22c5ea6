//! Single-flight job scheduler.
//!
//! The scheduler owns the job table and decides what runs when. It:
//! - deduplicates identical in-flight requests (waiter fan-out),
//! - dispatches queued jobs FIFO to free engine slots,
//! - enforces run and queue-wait timeouts,
//! - caches successful results in the artifact store.
//!
//! The job table sits behind one mutex that is never held across an await;
//! synthesis itself runs on the blocking pool with an exclusive engine slot.

mod job;

pub use job::{Ticket, WaiterHandle};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::engine::{EnginePool, EngineSlot};
use crate::error::{Error, Result};
use crate::request::{Fingerprint, SynthesisRequest};
use crate::store::ArtifactStore;
use crate::voice::VoiceCatalog;

use job::{Job, JobResult, JobState, TicketOutcome};

/// Timing knobs the scheduler needs from the service config.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub job_run_timeout: Duration,
    pub queue_wait_timeout: Duration,
    pub completion_grace: Duration,
}

impl From<&ServiceConfig> for SchedulerConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            job_run_timeout: config.job_run_timeout(),
            queue_wait_timeout: config.queue_wait_timeout(),
            completion_grace: config.completion_grace(),
        }
    }
}

/// Counts of jobs currently tracked by the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    pub queued: usize,
    pub running: usize,
}

struct JobTable {
    jobs: HashMap<Fingerprint, Job>,
    /// FIFO dispatch order. Entries may be stale (cancelled jobs); the
    /// dispatch loop skips anything no longer `Queued`.
    queue: VecDeque<Fingerprint>,
}

struct Inner {
    config: SchedulerConfig,
    pool: Arc<EnginePool>,
    store: Arc<ArtifactStore>,
    catalog: Arc<VoiceCatalog>,
    table: Mutex<JobTable>,
    /// Wakes the dispatch loop when a job is enqueued.
    wake: Notify,
    next_waiter_id: AtomicU64,
}

/// Accepts synthesis requests and multiplexes them over the engine pool.
pub struct Scheduler {
    inner: Arc<Inner>,
    /// Dropped with the scheduler; the dispatch loop observes the closed
    /// channel and exits.
    _shutdown: watch::Sender<()>,
}

impl Scheduler {
    /// Create a scheduler and spawn its dispatch loop.
    pub fn new(
        config: SchedulerConfig,
        pool: Arc<EnginePool>,
        store: Arc<ArtifactStore>,
        catalog: Arc<VoiceCatalog>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let inner = Arc::new(Inner {
            config,
            pool,
            store,
            catalog,
            table: Mutex::new(JobTable {
                jobs: HashMap::new(),
                queue: VecDeque::new(),
            }),
            wake: Notify::new(),
            next_waiter_id: AtomicU64::new(1),
        });

        tokio::spawn(run_dispatch(inner.clone(), shutdown_rx));

        Self {
            inner,
            _shutdown: shutdown_tx,
        }
    }

    /// Submit a request.
    ///
    /// Resolution order: artifact cache hit, then attachment to an existing
    /// job for the same fingerprint, then a fresh `Queued` job. Returns
    /// `EngineUnavailable` without queueing when the pool has no usable
    /// slots at all.
    pub fn submit(&self, request: SynthesisRequest) -> Result<Ticket> {
        request.validate()?;
        let request = request.normalized();
        let voice = self.inner.catalog.resolve(&request.voice_id)?.clone();
        let fingerprint = request.fingerprint();

        if let Some(handle) = self.inner.store.get(&fingerprint) {
            debug!("cache hit for {}", fingerprint);
            return Ok(Ticket {
                handle: WaiterHandle {
                    fingerprint,
                    waiter_id: 0,
                },
                outcome: TicketOutcome::Ready(Ok(handle)),
            });
        }

        if self.inner.pool.usable_slots() == 0 {
            return Err(Error::EngineUnavailable);
        }

        let waiter_id = self.inner.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let handle = WaiterHandle {
            fingerprint,
            waiter_id,
        };

        let (outcome, arm_queue_timeout) = {
            let mut table = self.inner.table.lock().expect("job table poisoned");
            match table.jobs.get_mut(&fingerprint) {
                Some(job) if job.state.is_terminal() => {
                    // Still in its grace window; share the stored result.
                    let result = job
                        .result
                        .clone()
                        .unwrap_or(Err(Error::Internal("terminal job without result".into())));
                    (TicketOutcome::Ready(result), false)
                }
                Some(job) => {
                    debug!(
                        "attaching waiter {} to in-flight job {}",
                        waiter_id, fingerprint
                    );
                    let rx = job.attach_waiter(waiter_id);
                    (TicketOutcome::Pending(rx), job.state == JobState::Queued)
                }
                None => {
                    let mut job = Job::new(request, voice);
                    let rx = job.attach_waiter(waiter_id);
                    table.jobs.insert(fingerprint, job);
                    table.queue.push_back(fingerprint);
                    debug!("enqueued job {}", fingerprint);
                    (TicketOutcome::Pending(rx), true)
                }
            }
        };

        if arm_queue_timeout {
            self.inner.wake.notify_one();
            spawn_queue_watchdog(self.inner.clone(), handle);
        }

        Ok(Ticket { handle, outcome })
    }

    /// Detach one waiter from its job.
    ///
    /// If it was the last waiter of a still-`Queued` job, the job itself is
    /// cancelled and dequeued. A `Running` job always completes and its
    /// result is cached for future identical requests. Returns whether a
    /// waiter was actually removed.
    pub fn cancel(&self, handle: &WaiterHandle) -> bool {
        let mut table = self.inner.table.lock().expect("job table poisoned");
        let Some(job) = table.jobs.get_mut(&handle.fingerprint) else {
            return false;
        };

        let Some(tx) = job.detach_waiter(handle.waiter_id) else {
            return false;
        };
        // Dropping the sender resolves the waiter's receiver as cancelled.
        drop(tx);

        if job.waiters.is_empty() && job.state == JobState::Queued {
            table.jobs.remove(&handle.fingerprint);
            debug!("cancelled queued job {} (last waiter left)", handle.fingerprint);
        }
        true
    }

    /// Current queue/running counts.
    pub fn stats(&self) -> SchedulerStats {
        let table = self.inner.table.lock().expect("job table poisoned");
        let mut stats = SchedulerStats::default();
        for job in table.jobs.values() {
            match job.state {
                JobState::Queued => stats.queued += 1,
                JobState::Running => stats.running += 1,
                _ => {}
            }
        }
        stats
    }
}

impl Inner {
    /// True when some queue entry still points at a `Queued` job. Stale
    /// heads are pruned along the way.
    fn has_queued_work(&self) -> bool {
        let mut table = self.table.lock().expect("job table poisoned");
        while let Some(fp) = table.queue.front().copied() {
            let queued = table
                .jobs
                .get(&fp)
                .map(|j| j.state == JobState::Queued)
                .unwrap_or(false);
            if queued {
                return true;
            }
            table.queue.pop_front();
        }
        false
    }

    /// Pop the oldest queued job and mark it `Running`.
    fn pop_next_queued(&self) -> Option<(Fingerprint, SynthesisRequest, crate::voice::VoiceStyle)> {
        let mut table = self.table.lock().expect("job table poisoned");
        while let Some(fp) = table.queue.pop_front() {
            if let Some(job) = table.jobs.get_mut(&fp) {
                if job.state == JobState::Queued {
                    job.state = JobState::Running;
                    job.started_at = Some(Instant::now());
                    return Some((fp, job.request.clone(), job.voice.clone()));
                }
            }
        }
        None
    }

    /// Expire one waiter whose queue-wait deadline passed while its job was
    /// still `Queued`. The job is unaffected while other waiters remain.
    fn expire_waiter(&self, handle: WaiterHandle) {
        let mut table = self.table.lock().expect("job table poisoned");
        let Some(job) = table.jobs.get_mut(&handle.fingerprint) else {
            return;
        };
        if job.state != JobState::Queued {
            return;
        }
        let Some(tx) = job.detach_waiter(handle.waiter_id) else {
            return;
        };
        let _ = tx.send(Err(Error::QueueTimeout));
        debug!("waiter {} queue-timed out on {}", handle.waiter_id, handle.fingerprint);

        if job.waiters.is_empty() {
            table.jobs.remove(&handle.fingerprint);
            debug!("dropped queued job {} (all waiters timed out)", handle.fingerprint);
        }
    }

    /// Move a job to its terminal state and fan the result out to every
    /// waiter. The job lingers for the grace period so late duplicates
    /// coalesce before a new job with the same fingerprint is permitted.
    fn complete_job(self: &Arc<Self>, fingerprint: Fingerprint, result: JobResult) {
        let (waiters, queued_for, ran_for) = {
            let mut table = self.table.lock().expect("job table poisoned");
            let Some(job) = table.jobs.get_mut(&fingerprint) else {
                warn!("completed job {} missing from table", fingerprint);
                return;
            };
            job.state = if result.is_ok() {
                JobState::Succeeded
            } else {
                JobState::Failed
            };
            let completed = Instant::now();
            job.completed_at = Some(completed);
            job.result = Some(result.clone());
            let queued_for = job
                .started_at
                .map(|s| s - job.created_at)
                .unwrap_or_default();
            let ran_for = job.started_at.map(|s| completed - s).unwrap_or_default();
            (std::mem::take(&mut job.waiters), queued_for, ran_for)
        };

        match &result {
            Ok(handle) => info!(
                "job {} succeeded, artifact {} ({} waiters, queued {:?}, ran {:?})",
                fingerprint,
                handle.artifact_id(),
                waiters.len(),
                queued_for,
                ran_for
            ),
            Err(err) => warn!(
                "job {} failed: {} ({} waiters, queued {:?}, ran {:?})",
                fingerprint,
                err,
                waiters.len(),
                queued_for,
                ran_for
            ),
        }

        for waiter in waiters {
            let _ = waiter.tx.send(result.clone());
        }

        let inner = self.clone();
        let grace = self.config.completion_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut table = inner.table.lock().expect("job table poisoned");
            if let Some(job) = table.jobs.get(&fingerprint) {
                if job.state.is_terminal() {
                    table.jobs.remove(&fingerprint);
                }
            }
        });
    }
}

fn spawn_queue_watchdog(inner: Arc<Inner>, handle: WaiterHandle) {
    let wait = inner.config.queue_wait_timeout;
    tokio::spawn(async move {
        tokio::time::sleep(wait).await;
        inner.expire_waiter(handle);
    });
}

/// Dispatch loop: pairs queued jobs with free engine slots, FIFO.
async fn run_dispatch(inner: Arc<Inner>, mut shutdown: watch::Receiver<()>) {
    loop {
        // Wait for queued work.
        while !inner.has_queued_work() {
            tokio::select! {
                _ = inner.wake.notified() => {}
                res = shutdown.changed() => {
                    if res.is_err() {
                        debug!("scheduler dropped, dispatch loop exiting");
                        return;
                    }
                }
            }
        }

        // Commit to a slot before popping, so FIFO order is preserved even
        // when all engines are busy.
        let slot = tokio::select! {
            res = inner.pool.acquire() => match res {
                Ok(slot) => slot,
                Err(_) => {
                    warn!("engine pool has no usable slots, dispatch idling");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            },
            res = shutdown.changed() => {
                if res.is_err() {
                    debug!("scheduler dropped, dispatch loop exiting");
                    return;
                }
                continue;
            }
        };

        match inner.pop_next_queued() {
            Some((fingerprint, request, voice)) => {
                debug!("dispatching job {}", fingerprint);
                tokio::spawn(run_job(inner.clone(), fingerprint, request, voice, slot));
            }
            // Everything queued was cancelled while we waited for the slot.
            None => drop(slot),
        }
    }
}

/// Run one job on an acquired slot, store the artifact, resolve waiters.
async fn run_job(
    inner: Arc<Inner>,
    fingerprint: Fingerprint,
    request: SynthesisRequest,
    voice: crate::voice::VoiceStyle,
    mut slot: EngineSlot,
) {
    let Some(mut engine) = slot.take_engine() else {
        inner.pool.abort(slot);
        inner.complete_job(
            fingerprint,
            Err(Error::Internal("engine slot had no instance".into())),
        );
        return;
    };

    let started = Instant::now();
    let work = tokio::task::spawn_blocking(move || {
        let output = engine.synthesize(&request.text, &voice, request.rate, request.volume);
        (engine, output)
    });

    let synthesized = match tokio::time::timeout(inner.config.job_run_timeout, work).await {
        Ok(Ok((engine, output))) => {
            slot.restore(engine);
            drop(slot);
            output
        }
        Ok(Err(join_err)) => {
            // The blocking task panicked and took the engine with it.
            inner.pool.abort(slot);
            Err(Error::Internal(format!("synthesis task failed: {}", join_err)))
        }
        Err(_) => {
            // The engine cannot be interrupted; discard the slot and let the
            // runaway call drop the instance whenever it returns.
            warn!(
                "job {} exceeded run timeout after {:?}, reclaiming slot",
                fingerprint,
                started.elapsed()
            );
            inner.pool.abort(slot);
            Err(Error::SynthesisTimeout)
        }
    };

    let result = match synthesized {
        Ok(bytes) => inner.store.put(fingerprint, &bytes).await,
        Err(err) => Err(err),
    };

    inner.complete_job(fingerprint, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFactory, SynthesisEngine};
    use crate::voice::VoiceStyle;
    use std::sync::atomic::AtomicUsize;

    /// Engine that counts invocations and sleeps for a configurable time.
    struct MockEngine {
        invocations: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    impl SynthesisEngine for MockEngine {
        fn synthesize(
            &mut self,
            text: &str,
            _voice: &VoiceStyle,
            _rate: f32,
            _volume: f32,
        ) -> Result<Vec<u8>> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            if self.fail {
                return Err(Error::SynthesisFailure("mock engine error".into()));
            }
            Ok(format!("audio:{}", text).into_bytes())
        }
    }

    struct MockFactory {
        invocations: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    impl MockFactory {
        fn new(delay: Duration) -> Self {
            Self {
                invocations: Arc::new(AtomicUsize::new(0)),
                delay,
                fail: false,
            }
        }

        fn failing(delay: Duration) -> Self {
            Self {
                fail: true,
                ..Self::new(delay)
            }
        }
    }

    impl EngineFactory for MockFactory {
        fn create(&self) -> Result<Box<dyn SynthesisEngine>> {
            Ok(Box::new(MockEngine {
                invocations: self.invocations.clone(),
                delay: self.delay,
                fail: self.fail,
            }))
        }
    }

    struct Fixture {
        scheduler: Scheduler,
        pool: Arc<EnginePool>,
        invocations: Arc<AtomicUsize>,
        _dir: tempfile::TempDir,
    }

    fn fixture(factory: MockFactory, pool_size: usize, config: SchedulerConfig) -> Fixture {
        let invocations = factory.invocations.clone();
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(EnginePool::new(Arc::new(factory), pool_size));
        let store = Arc::new(ArtifactStore::open(dir.path(), 64 * 1024 * 1024, None).unwrap());
        let scheduler = Scheduler::new(
            config,
            pool.clone(),
            store,
            Arc::new(VoiceCatalog::default()),
        );
        Fixture {
            scheduler,
            pool,
            invocations,
            _dir: dir,
        }
    }

    fn quick_config() -> SchedulerConfig {
        SchedulerConfig {
            job_run_timeout: Duration::from_secs(5),
            queue_wait_timeout: Duration::from_secs(5),
            completion_grace: Duration::from_millis(50),
        }
    }

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, "en-us")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn identical_concurrent_submissions_run_once() {
        let fx = fixture(MockFactory::new(Duration::from_millis(30)), 2, quick_config());

        let mut tickets = Vec::new();
        for _ in 0..50 {
            tickets.push(fx.scheduler.submit(request("hello")).unwrap());
        }

        let mut artifact_ids = Vec::new();
        for ticket in tickets {
            let handle = ticket.wait().await.unwrap();
            artifact_ids.push(handle.artifact_id().to_string());
        }

        assert_eq!(fx.invocations.load(Ordering::SeqCst), 1);
        assert!(artifact_ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scenario_two_submissions_pool_of_one() {
        let fx = fixture(MockFactory::new(Duration::from_millis(30)), 1, quick_config());

        let req = SynthesisRequest::new("hello", "en-us")
            .with_rate(1.0)
            .with_volume(1.0);
        let a = fx.scheduler.submit(req.clone()).unwrap();
        let b = fx.scheduler.submit(req).unwrap();

        let (ha, hb) = tokio::join!(a.wait(), b.wait());
        let (ha, hb) = (ha.unwrap(), hb.unwrap());

        assert_eq!(fx.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(ha.artifact_id(), hb.artifact_id());
        assert_eq!(ha.path(), hb.path());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completed_results_are_served_from_cache() {
        let fx = fixture(MockFactory::new(Duration::ZERO), 1, quick_config());

        let first = fx.scheduler.submit(request("cached")).unwrap();
        first.wait().await.unwrap();

        // Wait out the grace window so the job table is empty again.
        tokio::time::sleep(Duration::from_millis(120)).await;

        let second = fx.scheduler.submit(request("cached")).unwrap();
        assert!(second.is_ready());
        assert!(format!("{:?}", second).contains("ready: true"));
        second.wait().await.unwrap();

        assert_eq!(fx.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_results_are_shared_during_the_grace_window() {
        let config = SchedulerConfig {
            completion_grace: Duration::from_millis(500),
            ..quick_config()
        };
        let fx = fixture(MockFactory::failing(Duration::ZERO), 1, config);

        let first = fx.scheduler.submit(request("doomed")).unwrap();
        assert_eq!(
            first.wait().await.unwrap_err(),
            Error::SynthesisFailure("mock engine error".into())
        );

        // Nothing was cached, so a duplicate inside the grace window must
        // resolve from the lingering terminal job, not start a new run.
        let dup = fx.scheduler.submit(request("doomed")).unwrap();
        assert!(dup.is_ready());
        assert_eq!(
            dup.wait().await.unwrap_err(),
            Error::SynthesisFailure("mock engine error".into())
        );
        assert_eq!(fx.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn run_timeout_fails_waiters_and_reclaims_slot() {
        let config = SchedulerConfig {
            job_run_timeout: Duration::from_millis(50),
            ..quick_config()
        };
        let fx = fixture(MockFactory::new(Duration::from_millis(400)), 1, config);

        let a = fx.scheduler.submit(request("slow")).unwrap();
        let b = fx.scheduler.submit(request("slow")).unwrap();

        let (ra, rb) = tokio::join!(a.wait(), b.wait());
        assert_eq!(ra.unwrap_err(), Error::SynthesisTimeout);
        assert_eq!(rb.unwrap_err(), Error::SynthesisTimeout);

        // The slot was aborted, not leaked: a fresh acquire succeeds once
        // the replacement instance is built.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if fx.pool.idle_slots() == 1 {
                break;
            }
            assert!(Instant::now() < deadline, "slot never reclaimed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(fx.pool.acquire().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn queue_timeout_fails_only_the_late_waiter() {
        let config = SchedulerConfig {
            queue_wait_timeout: Duration::from_millis(50),
            ..quick_config()
        };
        let fx = fixture(MockFactory::new(Duration::from_millis(300)), 1, config);

        // Occupies the only engine slot for ~300ms.
        let busy = fx.scheduler.submit(request("busy")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Queued behind it; its 50ms queue budget expires first.
        let starved = fx.scheduler.submit(request("starved")).unwrap();
        assert_eq!(starved.wait().await.unwrap_err(), Error::QueueTimeout);

        assert!(busy.wait().await.is_ok());
        assert_eq!(fx.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancelling_sole_waiter_dequeues_job() {
        let fx = fixture(MockFactory::new(Duration::from_millis(300)), 1, quick_config());

        let busy = fx.scheduler.submit(request("busy")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let doomed = fx.scheduler.submit(request("doomed")).unwrap();
        assert!(fx.scheduler.cancel(&doomed.handle()));
        assert_eq!(fx.scheduler.stats().queued, 0);

        assert_eq!(doomed.wait().await.unwrap_err(), Error::Cancelled);
        assert!(busy.wait().await.is_ok());
        // The cancelled job never reached an engine.
        assert_eq!(fx.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn job_with_remaining_waiters_survives_one_cancellation() {
        let fx = fixture(MockFactory::new(Duration::from_millis(300)), 1, quick_config());

        let busy = fx.scheduler.submit(request("busy")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let first = fx.scheduler.submit(request("shared")).unwrap();
        let second = fx.scheduler.submit(request("shared")).unwrap();

        assert!(fx.scheduler.cancel(&first.handle()));
        assert_eq!(first.wait().await.unwrap_err(), Error::Cancelled);

        assert!(second.wait().await.is_ok());
        assert!(busy.wait().await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn engine_failure_propagates_and_slot_returns_normally() {
        let fx = fixture(MockFactory::failing(Duration::ZERO), 1, quick_config());

        let ticket = fx.scheduler.submit(request("broken")).unwrap();
        assert_eq!(
            ticket.wait().await.unwrap_err(),
            Error::SynthesisFailure("mock engine error".into())
        );

        // Failure path releases the slot without an abort.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fx.pool.idle_slots(), 1);
        assert_eq!(fx.pool.usable_slots(), 1);
    }

    #[tokio::test]
    async fn invalid_requests_never_create_jobs() {
        let fx = fixture(MockFactory::new(Duration::ZERO), 1, quick_config());

        assert!(matches!(
            fx.scheduler.submit(request("")).unwrap_err(),
            Error::InvalidRequest(_)
        ));
        assert_eq!(
            fx.scheduler
                .submit(SynthesisRequest::new("hi", "xx-zz"))
                .unwrap_err(),
            Error::UnknownVoice("xx-zz".into())
        );
        assert_eq!(fx.scheduler.stats().queued, 0);
        assert_eq!(fx.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dead_pool_surfaces_engine_unavailable() {
        struct BrokenFactory;
        impl EngineFactory for BrokenFactory {
            fn create(&self) -> Result<Box<dyn SynthesisEngine>> {
                Err(Error::SynthesisFailure("no drivers installed".into()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(EnginePool::new(Arc::new(BrokenFactory), 2));
        let store = Arc::new(ArtifactStore::open(dir.path(), 1024, None).unwrap());
        let scheduler = Scheduler::new(
            quick_config(),
            pool,
            store,
            Arc::new(VoiceCatalog::default()),
        );

        assert_eq!(
            scheduler.submit(request("hello")).unwrap_err(),
            Error::EngineUnavailable
        );
    }
}
