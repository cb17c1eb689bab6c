//! Typed operations dispatched through the service pipeline.
//!
//! [`Operation`] is produced from a [`topgun_core::messages::Message`] by
//! `OperationService::classify` (see `classify.rs`): one variant per
//! client-to-server message, each carrying an [`OperationContext`] plus the
//! original payload. Server-to-client responses, the `Batch` transport
//! envelope, and auth handshake messages never become an `Operation` --
//! classification rejects them with a [`ClassifyError`] instead.

use topgun_core::messages::{
    ClientOpMessage, CounterRequestPayload, CounterStatePayload, EntryProcessBatchData,
    EntryProcessData, JournalReadData, JournalSubscribeData, JournalUnsubscribeData,
    ListResolversData, LockReleasePayload, LockRequestPayload, MerkleReqBucketMessage,
    OpBatchMessage, ORMapDiffRequest, ORMapMerkleReqBucket, ORMapPushDiff, ORMapSyncInit,
    PartitionMapRequestPayload, PingData, QuerySubMessage, QueryUnsubMessage,
    RegisterResolverData, SearchPayload, SearchSubPayload, SearchUnsubPayload, SyncInitMessage,
    TopicPubPayload, TopicSubPayload, TopicUnsubPayload, UnregisterResolverData,
};

/// Canonical names of the services an [`Operation`] can be routed to.
///
/// [`OperationRouter`](super::router::OperationRouter) keys its registrations
/// on these constants so a typo in a service name fails at the call site that
/// registers the service, not silently at dispatch time.
pub mod service_names {
    pub const CRDT: &str = "crdt";
    pub const SYNC: &str = "sync";
    pub const QUERY: &str = "query";
    pub const MESSAGING: &str = "messaging";
    pub const COORDINATION: &str = "coordination";
    pub const SEARCH: &str = "search";
    pub const PERSISTENCE: &str = "persistence";
}

/// Origin of the operation caller.
///
/// Distinguishes a direct client request from operations that arrive via
/// cluster forwarding, backup replication, WAN replication, or the server's
/// own internal schedulers (GC, resync), since each origin gets different
/// write-concern and audit handling downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerOrigin {
    Client,
    Forwarded,
    Backup,
    Wan,
    System,
}

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub partition_id: Option<u32>,
    pub service_name: &'static str,
    pub caller_origin: CallerOrigin,
    pub client_id: Option<String>,
    pub caller_node_id: Option<String>,
    pub timestamp: topgun_core::Timestamp,
    pub call_timeout_ms: u64,
}

impl OperationContext {
    /// Builds a context with the given identity and timing; `caller_origin`
    /// defaults to `Client` and `partition_id`/`client_id`/`caller_node_id`
    /// default to `None`. Callers that need a different origin or a
    /// partition key set the fields after construction (see
    /// `OperationService::make_ctx` in `classify.rs`).
    #[must_use]
    pub fn new(
        call_id: u64,
        service_name: &'static str,
        timestamp: topgun_core::Timestamp,
        call_timeout_ms: u64,
    ) -> Self {
        Self {
            call_id,
            partition_id: None,
            service_name,
            caller_origin: CallerOrigin::Client,
            client_id: None,
            caller_node_id: None,
            timestamp,
            call_timeout_ms,
        }
    }
}

/// Typed operation variants dispatched through the pipeline.
///
/// One variant per classifiable `Message` variant, named after the action
/// rather than the wire message (e.g. `QuerySub` becomes `QuerySubscribe`),
/// plus `GarbageCollect`, which the distributed GC scheduler constructs
/// directly -- it has no client-facing wire message at all.
#[derive(Debug)]
pub enum Operation {
    // ----- CRDT domain -----
    ClientOp { ctx: OperationContext, payload: ClientOpMessage },
    OpBatch { ctx: OperationContext, payload: OpBatchMessage },

    // ----- Sync domain -----
    SyncInit { ctx: OperationContext, payload: SyncInitMessage },
    MerkleReqBucket { ctx: OperationContext, payload: MerkleReqBucketMessage },
    ORMapSyncInit { ctx: OperationContext, payload: ORMapSyncInit },
    ORMapMerkleReqBucket { ctx: OperationContext, payload: ORMapMerkleReqBucket },
    ORMapDiffRequest { ctx: OperationContext, payload: ORMapDiffRequest },
    ORMapPushDiff { ctx: OperationContext, payload: ORMapPushDiff },

    // ----- Query domain -----
    QuerySubscribe { ctx: OperationContext, payload: QuerySubMessage },
    QueryUnsubscribe { ctx: OperationContext, payload: QueryUnsubMessage },

    // ----- Messaging domain -----
    TopicSubscribe { ctx: OperationContext, payload: TopicSubPayload },
    TopicUnsubscribe { ctx: OperationContext, payload: TopicUnsubPayload },
    TopicPublish { ctx: OperationContext, payload: TopicPubPayload },

    // ----- Coordination domain -----
    LockRequest { ctx: OperationContext, payload: LockRequestPayload },
    LockRelease { ctx: OperationContext, payload: LockReleasePayload },
    PartitionMapRequest { ctx: OperationContext, payload: Option<PartitionMapRequestPayload> },
    Ping { ctx: OperationContext, payload: PingData },

    // ----- Search domain -----
    Search { ctx: OperationContext, payload: SearchPayload },
    SearchSubscribe { ctx: OperationContext, payload: SearchSubPayload },
    SearchUnsubscribe { ctx: OperationContext, payload: SearchUnsubPayload },

    // ----- Persistence domain -----
    CounterRequest { ctx: OperationContext, payload: CounterRequestPayload },
    CounterSync { ctx: OperationContext, payload: CounterStatePayload },
    EntryProcess { ctx: OperationContext, payload: EntryProcessData },
    EntryProcessBatch { ctx: OperationContext, payload: EntryProcessBatchData },
    RegisterResolver { ctx: OperationContext, payload: RegisterResolverData },
    UnregisterResolver { ctx: OperationContext, payload: UnregisterResolverData },
    ListResolvers { ctx: OperationContext, payload: ListResolversData },
    JournalSubscribe { ctx: OperationContext, payload: JournalSubscribeData },
    JournalUnsubscribe { ctx: OperationContext, payload: JournalUnsubscribeData },
    JournalRead { ctx: OperationContext, payload: JournalReadData },

    /// Server-internal: scan for tombstones/records older than the GC
    /// watermark and prune them. Scheduled by the coordinator, never
    /// classified from a wire message.
    GarbageCollect { ctx: OperationContext },
}

impl Operation {
    /// Returns the context carried by this operation, regardless of variant.
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Operation::ClientOp { ctx, .. }
            | Operation::OpBatch { ctx, .. }
            | Operation::SyncInit { ctx, .. }
            | Operation::MerkleReqBucket { ctx, .. }
            | Operation::ORMapSyncInit { ctx, .. }
            | Operation::ORMapMerkleReqBucket { ctx, .. }
            | Operation::ORMapDiffRequest { ctx, .. }
            | Operation::ORMapPushDiff { ctx, .. }
            | Operation::QuerySubscribe { ctx, .. }
            | Operation::QueryUnsubscribe { ctx, .. }
            | Operation::TopicSubscribe { ctx, .. }
            | Operation::TopicUnsubscribe { ctx, .. }
            | Operation::TopicPublish { ctx, .. }
            | Operation::LockRequest { ctx, .. }
            | Operation::LockRelease { ctx, .. }
            | Operation::PartitionMapRequest { ctx, .. }
            | Operation::Ping { ctx, .. }
            | Operation::Search { ctx, .. }
            | Operation::SearchSubscribe { ctx, .. }
            | Operation::SearchUnsubscribe { ctx, .. }
            | Operation::CounterRequest { ctx, .. }
            | Operation::CounterSync { ctx, .. }
            | Operation::EntryProcess { ctx, .. }
            | Operation::EntryProcessBatch { ctx, .. }
            | Operation::RegisterResolver { ctx, .. }
            | Operation::UnregisterResolver { ctx, .. }
            | Operation::ListResolvers { ctx, .. }
            | Operation::JournalSubscribe { ctx, .. }
            | Operation::JournalUnsubscribe { ctx, .. }
            | Operation::JournalRead { ctx, .. }
            | Operation::GarbageCollect { ctx } => ctx,
        }
    }
}

/// Successful response from an operation handler.
#[derive(Debug)]
pub enum OperationResponse {
    Ack { call_id: u64 },
    Message(Box<topgun_core::messages::Message>),
    Messages(Vec<topgun_core::messages::Message>),
    NotImplemented { service_name: &'static str, call_id: u64 },
    Empty,
}

/// Errors returned by operation handlers.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown service: {name}")]
    UnknownService { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("wrong service for operation")]
    WrongService,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors from classifying a `Message` into an `Operation`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("server-to-client response cannot be classified as operation: {variant}")]
    ServerToClient { variant: &'static str },
    #[error("transport envelope must be unpacked before classification: {variant}")]
    TransportEnvelope { variant: &'static str },
    #[error("authentication message handled at transport layer: {variant}")]
    AuthMessage { variant: &'static str },
}
