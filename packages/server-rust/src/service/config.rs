use topgun_core::PARTITION_COUNT;

/// Server-level configuration for the operation routing framework.
///
/// Controls operation timeouts, concurrency limits, and background task intervals.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unique identifier for this server node.
    pub node_id: String,
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Interval between garbage collection runs in milliseconds.
    pub gc_interval_ms: u64,
    /// Number of partitions. Configurable for testing; defaults to
    /// `topgun_core::PARTITION_COUNT` (271) in production.
    pub partition_count: u32,
    /// Minimum tombstone/record age before the GC worker prunes it, in
    /// milliseconds. Must exceed the slowest expected anti-entropy round trip
    /// or a lagging replica can resurrect a deleted key.
    pub gc_age_ms: u64,
    /// How long a node's heartbeat-derived staleness report stays valid
    /// before the failure detector discounts it, in milliseconds.
    pub stale_report_ttl_ms: u64,
    /// Depth of the hex-routing `MerkleTree` bucket trie for every CRDT map.
    /// Wider trees shrink anti-entropy diffs for large maps at the cost of
    /// more buckets to compare; this never needs to change the wire format,
    /// since a bucket path is a hex-digit prefix of the key hash and a
    /// reader can always shorten a path to re-derive a shallower bucket.
    pub merkle_bucket_depth: usize,
    /// Number of buffered ops after which `OpBatch` delivery switches from
    /// per-op acks to a single batch ack.
    pub batch_threshold: usize,
    /// Payload size, in bytes, above which an outbound message is wrapped in
    /// the `Batch` transport envelope rather than sent as a single frame.
    pub size_threshold_bytes: usize,
    /// Maximum number of conflict resolvers a single map may register.
    pub max_resolvers_per_map: usize,
    /// Timeout for a single entry-processor or conflict-resolver script
    /// invocation, in milliseconds.
    pub resolver_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            gc_interval_ms: 60_000,
            partition_count: PARTITION_COUNT,
            gc_age_ms: 24 * 60 * 60 * 1000,
            stale_report_ttl_ms: 30_000,
            merkle_bucket_depth: 3,
            batch_threshold: 50,
            size_threshold_bytes: 64 * 1024,
            max_resolvers_per_map: 16,
            resolver_timeout_ms: 5_000,
        }
    }
}
