//! Persistence sinks and the query interface over stored runs.
//!
//! The tracker writes through an [`ActivitySink`]; consumers read back with
//! [`RunQuery`]. Both writes are idempotent upserts keyed by run id (and
//! sequence for activity records), so replaying a write is harmless.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::aggregate::summarize;
use async_trait::async_trait;
use cf_protocol::activity_models::ActivityRecord;
use cf_protocol::config_models::{TrackingBackend, TrackingConfig};
use cf_protocol::run_models::{PipelineRun, RunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Write side used by the activity tracker.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn upsert_run(&self, run: &PipelineRun) -> SinkResult<()>;

    async fn upsert_activity(&self, record: &ActivityRecord) -> SinkResult<()>;
}

/// Read side used by reports, the CLI and other consumers.
#[async_trait]
pub trait RunQuery: Send + Sync {
    async fn get_run(&self, id: Uuid) -> SinkResult<Option<PipelineRun>>;

    /// Activity records of a run, ordered by sequence.
    async fn get_activities(&self, id: Uuid) -> SinkResult<Vec<ActivityRecord>>;

    /// Summary recomputed from the stored records.
    async fn get_summary(&self, id: Uuid) -> SinkResult<Option<RunSummary>> {
        if self.get_run(id).await?.is_none() {
            return Ok(None);
        }
        let activities = self.get_activities(id).await?;
        Ok(Some(summarize(&activities)))
    }

    /// All stored runs, newest first.
    async fn list_runs(&self) -> SinkResult<Vec<PipelineRun>>;

    /// Delete a run together with its activity records.
    ///
    /// Returns whether the run existed.
    async fn delete_run(&self, id: Uuid) -> SinkResult<bool>;
}

/// Sink that discards every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ActivitySink for NullSink {
    async fn upsert_run(&self, _run: &PipelineRun) -> SinkResult<()> {
        Ok(())
    }

    async fn upsert_activity(&self, _record: &ActivityRecord) -> SinkResult<()> {
        Ok(())
    }
}

/// The store selected by `[tracking]` in config.toml.
#[derive(Clone)]
pub enum TrackingStore {
    Null,
    Memory(Arc<MemoryStore>),
    Json(Arc<JsonFileStore>),
}

impl TrackingStore {
    /// Build the configured store. Relative JSON directories are resolved
    /// against `root`.
    pub fn from_config(config: &TrackingConfig, root: &Path) -> Self {
        match config.backend {
            TrackingBackend::None => Self::Null,
            TrackingBackend::Memory => Self::Memory(Arc::new(MemoryStore::new())),
            TrackingBackend::Json => {
                let directory = Path::new(&config.directory);
                let directory = if directory.is_absolute() {
                    directory.to_path_buf()
                } else {
                    root.join(directory)
                };
                Self::Json(Arc::new(JsonFileStore::new(directory)))
            }
        }
    }

    pub fn sink(&self) -> Arc<dyn ActivitySink> {
        match self {
            Self::Null => Arc::new(NullSink),
            Self::Memory(store) => store.clone(),
            Self::Json(store) => store.clone(),
        }
    }

    /// Query interface, if the backend keeps anything to query.
    pub fn query(&self) -> Option<Arc<dyn RunQuery>> {
        match self {
            Self::Null => None,
            Self::Memory(store) => Some(store.clone()),
            Self::Json(store) => Some(store.clone()),
        }
    }
}
