//! Inline-vs-offload heuristic shared by the specialized workers (Merkle
//! diff/rebuild, CRDT merge, batch serialization) that sit in front of
//! [`WorkerPool`](super::worker::WorkerPool).
//!
//! Small batches run inline on the calling task -- no channel hop, no
//! `oneshot` round trip. Larger batches, or payloads heavy enough that
//! serializing them would block the calling task for too long, go through
//! the pool instead. Both paths must produce byte-identical results; this
//! module only decides which path runs, never how either one computes its
//! answer.

/// Inputs to the offload decision. `batch_size` is the number of logical
/// items in a request (op batch length, Merkle bucket count, …);
/// `estimated_bytes` is only meaningful for serialization callers and is
/// `None` for CRDT-merge/Merkle callers that don't produce a byte payload.
#[derive(Debug, Clone, Copy)]
pub struct OffloadInput {
    pub batch_size: usize,
    pub estimated_bytes: Option<usize>,
}

/// Where a unit of work should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionTarget {
    Inline,
    Pool,
}

/// Default batch-size threshold below which work always runs inline.
pub const DEFAULT_BATCH_THRESHOLD: usize = 10;

/// Default payload-size threshold, in bytes, above which work is always
/// offloaded even for a single small batch.
pub const DEFAULT_SIZE_THRESHOLD_BYTES: usize = 50 * 1024;

/// Decides whether `input` should run inline or be submitted to the pool.
///
/// `batch_threshold` and `size_threshold_bytes` are normally read from
/// [`ServerConfig`](super::config::ServerConfig)'s `batch_threshold` and
/// `size_threshold_bytes` fields, so a deployment can tune the split
/// without a code change.
#[must_use]
pub fn should_use_worker(
    input: OffloadInput,
    batch_threshold: usize,
    size_threshold_bytes: usize,
) -> ExecutionTarget {
    if let Some(bytes) = input.estimated_bytes {
        if bytes >= size_threshold_bytes {
            return ExecutionTarget::Pool;
        }
    }
    if input.batch_size >= batch_threshold {
        ExecutionTarget::Pool
    } else {
        ExecutionTarget::Inline
    }
}
