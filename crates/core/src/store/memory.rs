use super::{ActivitySink, RunQuery, SinkResult};
use async_trait::async_trait;
use cf_protocol::activity_models::ActivityRecord;
use cf_protocol::run_models::PipelineRun;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct StoredRun {
    run: Option<PipelineRun>,
    activities: BTreeMap<usize, ActivityRecord>,
}

/// In-process store shared by concurrent runs.
///
/// Writes are serialized by a single lock. Records are keyed by sequence, so
/// reads come back ordered.
#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<Uuid, StoredRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run_count(&self) -> usize {
        self.runs
            .read()
            .await
            .values()
            .filter(|stored| stored.run.is_some())
            .count()
    }
}

#[async_trait]
impl ActivitySink for MemoryStore {
    async fn upsert_run(&self, run: &PipelineRun) -> SinkResult<()> {
        let mut runs = self.runs.write().await;
        runs.entry(run.id).or_default().run = Some(run.clone());
        Ok(())
    }

    async fn upsert_activity(&self, record: &ActivityRecord) -> SinkResult<()> {
        let mut runs = self.runs.write().await;
        runs.entry(record.run_id)
            .or_default()
            .activities
            .insert(record.sequence, record.clone());
        Ok(())
    }
}

#[async_trait]
impl RunQuery for MemoryStore {
    async fn get_run(&self, id: Uuid) -> SinkResult<Option<PipelineRun>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&id).and_then(|stored| stored.run.clone()))
    }

    async fn get_activities(&self, id: Uuid) -> SinkResult<Vec<ActivityRecord>> {
        let runs = self.runs.read().await;
        Ok(runs
            .get(&id)
            .map(|stored| stored.activities.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_runs(&self) -> SinkResult<Vec<PipelineRun>> {
        let runs = self.runs.read().await;
        let mut list: Vec<PipelineRun> = runs
            .values()
            .filter_map(|stored| stored.run.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn delete_run(&self, id: Uuid) -> SinkResult<bool> {
        let mut runs = self.runs.write().await;
        Ok(runs
            .remove(&id)
            .map(|stored| stored.run.is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::run::create_run;
    use cf_protocol::brief_models::ContentBrief;

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = MemoryStore::new();
        let run = create_run(ContentBrief::new("blog-post", "x"));
        let mut record = ActivityRecord::open(run.id, "draft", "writing", 0, serde_json::Value::Null);

        store.upsert_activity(&record).await.expect("first write");
        record.warnings.push("late".to_string());
        store.upsert_activity(&record).await.expect("second write");

        let stored = store.get_activities(run.id).await.expect("query");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].warnings, vec!["late"]);
    }

    #[tokio::test]
    async fn test_activities_ordered_by_sequence() {
        let store = MemoryStore::new();
        let run = create_run(ContentBrief::new("blog-post", "x"));
        for sequence in [2, 0, 1] {
            let record = ActivityRecord::open(
                run.id,
                format!("stage-{sequence}"),
                "t",
                sequence,
                serde_json::Value::Null,
            );
            store.upsert_activity(&record).await.expect("write");
        }

        let names: Vec<_> = store
            .get_activities(run.id)
            .await
            .expect("query")
            .into_iter()
            .map(|record| record.stage_name)
            .collect();
        assert_eq!(names, vec!["stage-0", "stage-1", "stage-2"]);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = MemoryStore::new();
        let run = create_run(ContentBrief::new("blog-post", "x"));
        let record = ActivityRecord::open(run.id, "draft", "writing", 0, serde_json::Value::Null);
        store.upsert_run(&run).await.expect("write run");
        store.upsert_activity(&record).await.expect("write activity");
        assert_eq!(store.run_count().await, 1);

        assert!(store.delete_run(run.id).await.expect("delete"));
        assert!(store.get_run(run.id).await.expect("query").is_none());
        assert!(store.get_activities(run.id).await.expect("query").is_empty());
        assert!(!store.delete_run(run.id).await.expect("second delete"));
    }
}
