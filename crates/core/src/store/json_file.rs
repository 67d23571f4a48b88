use super::{ActivitySink, RunQuery, SinkError, SinkResult};
use async_trait::async_trait;
use cf_protocol::activity_models::ActivityRecord;
use cf_protocol::run_models::PipelineRun;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

const RUN_FILE: &str = "run.json";
const ACTIVITIES_DIR: &str = "activities";

/// Durable store with one directory per run:
///
/// ```text
/// <directory>/<run-id>/run.json
/// <directory>/<run-id>/activities/0000.json
/// ```
///
/// Each file is written to a temporary sibling and renamed into place.
pub struct JsonFileStore {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn run_dir(&self, id: Uuid) -> PathBuf {
        self.directory.join(id.to_string())
    }

    fn activity_path(&self, id: Uuid, sequence: usize) -> PathBuf {
        self.run_dir(id)
            .join(ACTIVITIES_DIR)
            .join(format!("{sequence:04}.json"))
    }

    async fn write_json<T: Serialize + Sync>(&self, path: &Path, value: &T) -> SinkResult<()> {
        let contents = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| io_error(parent, source))?;
        }

        let tmp = path.with_extension("json.tmp");
        let _guard = self.write_lock.lock().await;
        fs::write(&tmp, contents)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|source| io_error(path, source))
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> SinkResult<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(path, source)),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl ActivitySink for JsonFileStore {
    async fn upsert_run(&self, run: &PipelineRun) -> SinkResult<()> {
        let path = self.run_dir(run.id).join(RUN_FILE);
        self.write_json(&path, run).await
    }

    async fn upsert_activity(&self, record: &ActivityRecord) -> SinkResult<()> {
        let path = self.activity_path(record.run_id, record.sequence);
        self.write_json(&path, record).await
    }
}

#[async_trait]
impl RunQuery for JsonFileStore {
    async fn get_run(&self, id: Uuid) -> SinkResult<Option<PipelineRun>> {
        Self::read_json(&self.run_dir(id).join(RUN_FILE)).await
    }

    async fn get_activities(&self, id: Uuid) -> SinkResult<Vec<ActivityRecord>> {
        let dir = self.run_dir(id).join(ACTIVITIES_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&dir, source)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| io_error(&dir, source))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = Self::read_json::<ActivityRecord>(&path).await? {
                records.push(record);
            }
        }
        records.sort_by_key(|record| record.sequence);
        Ok(records)
    }

    async fn list_runs(&self) -> SinkResult<Vec<PipelineRun>> {
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&self.directory, source)),
        };

        let mut runs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| io_error(&self.directory, source))?
        {
            let run_file = entry.path().join(RUN_FILE);
            match Self::read_json::<PipelineRun>(&run_file).await {
                Ok(Some(run)) => runs.push(run),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(path = %run_file.display(), error = %error, "Skipping unreadable run");
                }
            }
        }
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    async fn delete_run(&self, id: Uuid) -> SinkResult<bool> {
        let dir = self.run_dir(id);
        let _guard = self.write_lock.lock().await;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(io_error(&dir, source)),
        }
    }
}
