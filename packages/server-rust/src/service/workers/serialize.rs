//! Batch serialization: encodes a batch of key snapshots into the bytes
//! persisted by a `ServerStorage` backend, continuing past any individual
//! encode failure so one bad snapshot doesn't drop the rest of the batch.

use async_trait::async_trait;
use topgun_core::KeySnapshot;

use crate::coordinator::encode_snapshot;
use crate::service::offload::{should_use_worker, ExecutionTarget, OffloadInput};
use crate::service::worker::{BackgroundRunnable, TaskPriority, WorkerError, WorkerPool};

/// Encodes each snapshot in order, pairing the key with either its encoded
/// bytes or the encode error.
#[must_use]
pub fn serialize_batch(items: Vec<(String, KeySnapshot)>) -> Vec<(String, anyhow::Result<Vec<u8>>)> {
    items
        .into_iter()
        .map(|(key, snapshot)| {
            let encoded = encode_snapshot(&snapshot);
            (key, encoded)
        })
        .collect()
}

/// Runs [`serialize_batch`] on a [`WorkerPool`] worker.
#[derive(Clone, Default)]
pub struct SerializeWorker;

#[async_trait]
impl BackgroundRunnable for SerializeWorker {
    type Task = Vec<(String, KeySnapshot)>;
    type Output = Vec<(String, anyhow::Result<Vec<u8>>)>;

    async fn run(&mut self, task: Self::Task) -> Self::Output {
        serialize_batch(task)
    }
}

/// Picks the inline or pool path for a serialize batch, by item count and
/// the caller's own estimate of the batch's encoded size.
pub async fn serialize_batch_dispatch(
    pool: &WorkerPool<SerializeWorker>,
    items: Vec<(String, KeySnapshot)>,
    batch_threshold: usize,
    size_threshold_bytes: usize,
    estimated_bytes: usize,
) -> Result<Vec<(String, anyhow::Result<Vec<u8>>)>, WorkerError> {
    let input = OffloadInput {
        batch_size: items.len(),
        estimated_bytes: Some(estimated_bytes),
    };
    match should_use_worker(input, batch_threshold, size_threshold_bytes) {
        ExecutionTarget::Inline => Ok(serialize_batch(items)),
        ExecutionTarget::Pool => pool.submit(items, TaskPriority::Normal, None).await,
    }
}
