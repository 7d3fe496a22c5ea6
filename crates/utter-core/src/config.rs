//! Configuration for the Utter synthesis service.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::voice::{VoiceCatalog, VoiceStyle};

/// Service configuration.
///
/// All fields have defaults so an empty config deserializes to a working
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Number of synthesis engine instances to run in parallel.
    #[serde(default = "default_max_concurrent_engines")]
    pub max_concurrent_engines: usize,

    /// Maximum wall-clock time a running job may take before it is failed
    /// with `SynthesisTimeout` and its engine slot is reclaimed.
    #[serde(default = "default_job_run_timeout_secs")]
    pub job_run_timeout_secs: u64,

    /// Maximum time a waiter will sit behind a queued job before it gives up
    /// with `QueueTimeout`.
    #[serde(default = "default_queue_wait_timeout_secs")]
    pub queue_wait_timeout_secs: u64,

    /// How long a finished job stays in the active table so late duplicate
    /// submissions still coalesce onto its result.
    #[serde(default = "default_completion_grace_ms")]
    pub completion_grace_ms: u64,

    /// Artifact store capacity. Eviction starts once total stored bytes
    /// exceed this.
    #[serde(default = "default_artifact_capacity_bytes")]
    pub artifact_capacity_bytes: u64,

    /// Artifact time-to-live in seconds. `None` disables expiry.
    #[serde(default = "default_artifact_ttl_secs")]
    pub artifact_ttl_secs: Option<u64>,

    /// Directory for synthesized audio files.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Voice catalog entries. Empty means the built-in catalog.
    #[serde(default)]
    pub voices: Vec<VoiceStyle>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_engines: default_max_concurrent_engines(),
            job_run_timeout_secs: default_job_run_timeout_secs(),
            queue_wait_timeout_secs: default_queue_wait_timeout_secs(),
            completion_grace_ms: default_completion_grace_ms(),
            artifact_capacity_bytes: default_artifact_capacity_bytes(),
            artifact_ttl_secs: default_artifact_ttl_secs(),
            artifacts_dir: default_artifacts_dir(),
            voices: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn job_run_timeout(&self) -> Duration {
        Duration::from_secs(self.job_run_timeout_secs)
    }

    pub fn queue_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_wait_timeout_secs)
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }

    pub fn artifact_ttl(&self) -> Option<Duration> {
        self.artifact_ttl_secs.map(Duration::from_secs)
    }

    /// Build the voice catalog: configured entries, or the built-in set.
    pub fn voice_catalog(&self) -> VoiceCatalog {
        if self.voices.is_empty() {
            VoiceCatalog::default()
        } else {
            VoiceCatalog::new(self.voices.clone())
        }
    }
}

fn default_max_concurrent_engines() -> usize {
    2
}

fn default_job_run_timeout_secs() -> u64 {
    30
}

fn default_queue_wait_timeout_secs() -> u64 {
    10
}

fn default_completion_grace_ms() -> u64 {
    250
}

fn default_artifact_capacity_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_artifact_ttl_secs() -> Option<u64> {
    Some(24 * 60 * 60)
}

fn default_artifacts_dir() -> PathBuf {
    if let Ok(from_env) = std::env::var("UTTER_ARTIFACTS_DIR") {
        let trimmed = from_env.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("utter")
        .join("artifacts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_deserializes_with_defaults() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_concurrent_engines, 2);
        assert_eq!(config.job_run_timeout(), Duration::from_secs(30));
        assert!(config.artifact_ttl().is_some());
        assert!(!config.voice_catalog().is_empty());
    }

    #[test]
    fn configured_voices_replace_builtins() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"voices": [{"id": "nb-no", "language": "nb-NO", "engine_voice": "norwegian"}]}"#,
        )
        .unwrap();
        let catalog = config.voice_catalog();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.resolve("nb-no").is_ok());
        assert!(catalog.resolve("en-us").is_err());
    }
}
