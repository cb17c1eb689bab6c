//! Batched CRDT merge: applies a batch of remote LWW records to a single
//! map, returning each key's merge outcome. Useful for bulk anti-entropy
//! replies (`SyncRespLeaf`) that carry many records for one map at once.

use std::sync::Arc;

use async_trait::async_trait;
use topgun_core::{ApplyOutcome, CrdtMap, LWWRecord, Value};

use crate::service::offload::{should_use_worker, ExecutionTarget, OffloadInput};
use crate::service::worker::{BackgroundRunnable, TaskPriority, WorkerError, WorkerPool};

/// Applies `records` to `map`, in order, returning each key's outcome.
///
/// Sequential, not parallel: `CrdtMap`'s internal mutex would serialize
/// concurrent merges anyway, and LWW merge order doesn't change the final
/// state, only which intermediate `ApplyOutcome` a given key reports.
#[must_use]
pub fn merge_lww_batch(
    map: &CrdtMap,
    records: Vec<(String, LWWRecord<Value>)>,
) -> Vec<(String, ApplyOutcome)> {
    records
        .into_iter()
        .map(|(key, record)| {
            let outcome = map.apply_remote_lww(&key, record);
            (key, outcome)
        })
        .collect()
}

/// Runs [`merge_lww_batch`] on a [`WorkerPool`] worker.
#[derive(Clone, Default)]
pub struct CrdtMergeWorker;

#[async_trait]
impl BackgroundRunnable for CrdtMergeWorker {
    type Task = (Arc<CrdtMap>, Vec<(String, LWWRecord<Value>)>);
    type Output = Vec<(String, ApplyOutcome)>;

    async fn run(&mut self, task: Self::Task) -> Self::Output {
        merge_lww_batch(&task.0, task.1)
    }
}

/// Picks the inline or pool path for a merge batch by record count.
pub async fn merge_lww_batch_dispatch(
    pool: &WorkerPool<CrdtMergeWorker>,
    map: Arc<CrdtMap>,
    records: Vec<(String, LWWRecord<Value>)>,
    batch_threshold: usize,
) -> Result<Vec<(String, ApplyOutcome)>, WorkerError> {
    let input = OffloadInput {
        batch_size: records.len(),
        estimated_bytes: None,
    };
    match should_use_worker(
        input,
        batch_threshold,
        crate::service::offload::DEFAULT_SIZE_THRESHOLD_BYTES,
    ) {
        ExecutionTarget::Inline => Ok(merge_lww_batch(&map, records)),
        ExecutionTarget::Pool => pool.submit((map, records), TaskPriority::Normal, None).await,
    }
}

#[cfg(test)]
mod tests {
    use topgun_core::{SystemClock, Timestamp, HLC};

    use super::*;

    fn test_map() -> Arc<CrdtMap> {
        let hlc = HLC::new("test-node".to_string(), Box::new(SystemClock));
        Arc::new(CrdtMap::new_lww("widgets", hlc))
    }

    fn record(millis: u64, value: &str) -> LWWRecord<Value> {
        LWWRecord {
            value: Some(Value::String(value.to_string())),
            timestamp: Timestamp { millis, counter: 0, node_id: "remote".to_string() },
            ttl_ms: None,
        }
    }

    #[test]
    fn applies_every_record_in_batch() {
        let map = test_map();
        let records = vec![
            ("alice".to_string(), record(1, "a")),
            ("bob".to_string(), record(1, "b")),
        ];
        let results = merge_lww_batch(&map, records);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, outcome)| *outcome == ApplyOutcome::Applied));
    }

    #[test]
    fn stale_record_reports_no_change() {
        let map = test_map();
        merge_lww_batch(&map, vec![("alice".to_string(), record(10, "newer"))]);
        let results = merge_lww_batch(&map, vec![("alice".to_string(), record(1, "older"))]);
        assert_eq!(results, vec![("alice".to_string(), ApplyOutcome::NoChange)]);
    }

    #[tokio::test]
    async fn inline_and_pool_paths_agree() {
        let pool = WorkerPool::new(
            crate::service::worker::WorkerPoolConfig {
                min_workers: 1,
                max_workers: 1,
                ..crate::service::worker::WorkerPoolConfig::default()
            },
            CrdtMergeWorker::default,
        );
        let map = test_map();
        let records = vec![("alice".to_string(), record(1, "a"))];

        let inline = merge_lww_batch_dispatch(&pool, map.clone(), records.clone(), usize::MAX)
            .await
            .unwrap();
        let map2 = test_map();
        let pooled = merge_lww_batch_dispatch(&pool, map2, records, 0).await.unwrap();
        assert_eq!(inline, pooled);
    }
}
