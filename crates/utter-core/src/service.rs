//! Service facade wiring the catalog, pool, store and scheduler together.

use std::sync::Arc;

use tracing::info;

use crate::config::ServiceConfig;
use crate::engine::{EngineFactory, EnginePool, ToneEngineFactory};
use crate::error::Result;
use crate::request::SynthesisRequest;
use crate::scheduler::{Scheduler, SchedulerStats, Ticket, WaiterHandle};
use crate::store::{ArtifactHandle, ArtifactStore};
use crate::voice::{VoiceCatalog, VoiceStyle};

/// Snapshot of service health for monitoring endpoints.
#[derive(Debug, Clone, Copy)]
pub struct ServiceStats {
    pub usable_slots: usize,
    pub idle_slots: usize,
    pub queued_jobs: usize,
    pub running_jobs: usize,
    pub artifact_count: usize,
    pub artifact_bytes: u64,
}

/// The synthesis service: everything the gateway talks to.
pub struct SynthesisService {
    config: ServiceConfig,
    catalog: Arc<VoiceCatalog>,
    pool: Arc<EnginePool>,
    store: Arc<ArtifactStore>,
    scheduler: Scheduler,
}

impl SynthesisService {
    /// Create a service backed by the built-in tone engine.
    ///
    /// Must be called from within a Tokio runtime; the scheduler spawns its
    /// dispatch loop on creation.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Self::with_factory(config, Arc::new(ToneEngineFactory))
    }

    /// Create a service backed by a custom engine factory.
    pub fn with_factory(config: ServiceConfig, factory: Arc<dyn EngineFactory>) -> Result<Self> {
        let catalog = Arc::new(config.voice_catalog());
        let pool = Arc::new(EnginePool::new(factory, config.max_concurrent_engines));
        let store = Arc::new(ArtifactStore::open(
            &config.artifacts_dir,
            config.artifact_capacity_bytes,
            config.artifact_ttl(),
        )?);
        let scheduler = Scheduler::new(
            (&config).into(),
            pool.clone(),
            store.clone(),
            catalog.clone(),
        );

        info!(
            "synthesis service ready: {} engine slots, {} voices, artifacts in {}",
            pool.usable_slots(),
            catalog.len(),
            config.artifacts_dir.display()
        );

        Ok(Self {
            config,
            catalog,
            pool,
            store,
            scheduler,
        })
    }

    /// Submit a request and wait for its artifact.
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<ArtifactHandle> {
        self.scheduler.submit(request)?.wait().await
    }

    /// Submit a request, returning a ticket that can be awaited or cancelled.
    pub fn submit(&self, request: SynthesisRequest) -> Result<Ticket> {
        self.scheduler.submit(request)
    }

    /// Detach one waiter from its job. See [`Scheduler::cancel`].
    pub fn cancel(&self, handle: &WaiterHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    /// Look up a stored artifact by its opaque download id.
    pub fn fetch(&self, artifact_id: &str) -> Option<ArtifactHandle> {
        self.store.get_by_id(artifact_id)
    }

    /// Read an artifact's audio bytes.
    pub async fn read_artifact(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        self.store.read(handle).await
    }

    /// Catalog voices, sorted by id.
    pub fn voices(&self) -> Vec<VoiceStyle> {
        self.catalog.list().into_iter().cloned().collect()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn stats(&self) -> ServiceStats {
        let SchedulerStats { queued, running } = self.scheduler.stats();
        ServiceStats {
            usable_slots: self.pool.usable_slots(),
            idle_slots: self.pool.idle_slots(),
            queued_jobs: queued,
            running_jobs: running,
            artifact_count: self.store.len(),
            artifact_bytes: self.store.total_bytes(),
        }
    }
}
