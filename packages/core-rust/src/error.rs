//! Cross-cutting engine errors: the failure modes that originate below the
//! operation-service layer (clock, CRDT merge, partition ownership, worker
//! lifecycle) and need a stable shape regardless of which service surfaces
//! them. `server-rust`'s `OperationError::Internal(#[from] anyhow::Error)`
//! accepts any of these without further plumbing.

use crate::Timestamp;

/// A failure from a lower layer than the operation pipeline: clock
/// misbehavior, a rejected CRDT merge, an ownership or routing mismatch, or
/// a worker that didn't come back. Variant names deliberately drop the
/// redundant `Error` suffix, matching `WorkerError`'s convention.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("clock read produced a timestamp older than the last observed one: {observed:?} < {last:?}")]
    Clock { observed: Timestamp, last: Timestamp },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("worker crashed while processing the task")]
    Crash,

    #[error("shutting down, rejecting new work")]
    Shutdown,

    #[error("merge rejected for key {key}: {reason}")]
    MergeRejection { key: String, reason: String },

    #[error("validation failed for field {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("node {node_id} does not own partition {partition_id}")]
    NotOwner { partition_id: u32, node_id: String },

    #[error("stale map version: local {local} behind merged {merged}")]
    StaleMap { local: u64, merged: u64 },

    #[error("no route to node {node_id}")]
    Routing { node_id: String },
}
