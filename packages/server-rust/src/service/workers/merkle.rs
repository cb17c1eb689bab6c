//! Merkle bucket diffing: given the bucket digests two replicas reported
//! for the same map, find which buckets disagree (or are missing on one
//! side) so anti-entropy only needs to walk down those subtrees.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::service::offload::{should_use_worker, ExecutionTarget, OffloadInput};
use crate::service::worker::{BackgroundRunnable, TaskPriority, WorkerError, WorkerPool};

/// One bucket's aggregate hash at a given trie path, as reported during
/// anti-entropy (mirrors `MerkleTree::bucket_hash`'s path/hash pairing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDigest {
    pub path: Vec<char>,
    pub hash: u32,
}

/// Returns the bucket paths whose hash disagrees between `local` and
/// `remote`, or that are present on only one side. Sorted for a
/// deterministic, diffable result.
#[must_use]
pub fn diff_buckets(local: &[BucketDigest], remote: &[BucketDigest]) -> Vec<Vec<char>> {
    let local_by_path: HashMap<&[char], u32> =
        local.iter().map(|d| (d.path.as_slice(), d.hash)).collect();
    let remote_by_path: HashMap<&[char], u32> =
        remote.iter().map(|d| (d.path.as_slice(), d.hash)).collect();

    let mut differing: Vec<Vec<char>> = local_by_path
        .iter()
        .filter_map(|(path, hash)| match remote_by_path.get(path) {
            Some(remote_hash) if remote_hash == hash => None,
            _ => Some((*path).to_vec()),
        })
        .collect();

    for path in remote_by_path.keys() {
        if !local_by_path.contains_key(path) {
            differing.push((*path).to_vec());
        }
    }

    differing.sort();
    differing
}

/// Runs [`diff_buckets`] on a [`WorkerPool`] worker.
#[derive(Clone, Default)]
pub struct MerkleDiffWorker;

#[async_trait]
impl BackgroundRunnable for MerkleDiffWorker {
    type Task = (Vec<BucketDigest>, Vec<BucketDigest>);
    type Output = Vec<Vec<char>>;

    async fn run(&mut self, task: Self::Task) -> Self::Output {
        diff_buckets(&task.0, &task.1)
    }
}

/// Picks the inline or pool path for a bucket diff by total digest count.
pub async fn diff_buckets_dispatch(
    pool: &WorkerPool<MerkleDiffWorker>,
    local: Vec<BucketDigest>,
    remote: Vec<BucketDigest>,
    batch_threshold: usize,
) -> Result<Vec<Vec<char>>, WorkerError> {
    let input = OffloadInput {
        batch_size: local.len() + remote.len(),
        estimated_bytes: None,
    };
    match should_use_worker(
        input,
        batch_threshold,
        crate::service::offload::DEFAULT_SIZE_THRESHOLD_BYTES,
    ) {
        ExecutionTarget::Inline => Ok(diff_buckets(&local, &remote)),
        ExecutionTarget::Pool => pool.submit((local, remote), TaskPriority::Normal, None).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(path: &str, hash: u32) -> BucketDigest {
        BucketDigest { path: path.chars().collect(), hash }
    }

    #[test]
    fn identical_digests_produce_no_diff() {
        let local = vec![digest("a1", 10), digest("b2", 20)];
        let remote = vec![digest("a1", 10), digest("b2", 20)];
        assert!(diff_buckets(&local, &remote).is_empty());
    }

    #[test]
    fn mismatched_hash_is_reported() {
        let local = vec![digest("a1", 10)];
        let remote = vec![digest("a1", 99)];
        assert_eq!(diff_buckets(&local, &remote), vec![vec!['a', '1']]);
    }

    #[test]
    fn bucket_missing_on_one_side_is_reported() {
        let local = vec![digest("a1", 10), digest("b2", 20)];
        let remote = vec![digest("a1", 10)];
        assert_eq!(diff_buckets(&local, &remote), vec![vec!['b', '2']]);
    }

    #[tokio::test]
    async fn inline_and_pool_paths_agree() {
        let pool = WorkerPool::new(
            crate::service::worker::WorkerPoolConfig {
                min_workers: 1,
                max_workers: 1,
                ..crate::service::worker::WorkerPoolConfig::default()
            },
            MerkleDiffWorker::default,
        );
        let local = vec![digest("a1", 10), digest("b2", 20)];
        let remote = vec![digest("a1", 99)];

        let inline = diff_buckets_dispatch(&pool, local.clone(), remote.clone(), usize::MAX)
            .await
            .unwrap();
        let pooled = diff_buckets_dispatch(&pool, local, remote, 0).await.unwrap();
        assert_eq!(inline, pooled);
    }
}
