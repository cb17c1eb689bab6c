//! Wire-compatible message schemas for the TopGun protocol.
//!
//! Each submodule corresponds to a domain of messages defined in the TypeScript
//! Zod schemas (`packages/core/src/schemas/`). All types use named MsgPack
//! serialization (`rmp_serde::to_vec_named()`) with camelCase field names to
//! match the TypeScript wire format.
//!
//! [`Message`] unifies every domain into one dispatch enum. It does not derive
//! `Serialize`/`Deserialize` itself: each payload already carries its own wire
//! shape (some flat, some wrapped in a `{type, payload}` envelope), so decoding
//! raw bytes into a `Message` is a type-sniffing step the network layer
//! performs by reading the `type` discriminant first and then deserializing
//! into the matching payload -- not a job for a single derived enum.

pub mod base;
pub mod client_events;
pub mod cluster;
pub mod http_sync;
pub mod messaging;
pub mod query;
pub mod search;
pub mod sync;

pub use base::{
    AuthMessage, AuthRequiredMessage, ChangeEventType, ClientOp, PredicateNode, PredicateOp,
    Query, SortDirection, WriteConcern,
};

pub use sync::{
    BatchMessage, ClientOpMessage, MerkleReqBucketMessage, MerkleReqBucketPayload, OpAckMessage,
    OpAckPayload, OpBatchMessage, OpBatchPayload, OpRejectedMessage, OpRejectedPayload, OpResult,
    ORMapDiffRequest, ORMapDiffRequestPayload, ORMapDiffResponse, ORMapDiffResponsePayload,
    ORMapEntry, ORMapMerkleReqBucket, ORMapMerkleReqBucketPayload, ORMapPushDiff,
    ORMapPushDiffPayload, ORMapSyncInit, ORMapSyncRespBuckets, ORMapSyncRespBucketsPayload,
    ORMapSyncRespLeaf, ORMapSyncRespLeafPayload, ORMapSyncRespRoot, ORMapSyncRespRootPayload,
    SyncInitMessage, SyncLeafRecord, SyncRespBucketsMessage, SyncRespBucketsPayload,
    SyncRespLeafMessage, SyncRespLeafPayload, SyncRespRootMessage, SyncRespRootPayload,
};

pub use query::{
    CursorStatus, QueryRespMessage, QueryRespPayload, QueryResultEntry, QuerySubMessage,
    QuerySubPayload, QueryUnsubMessage, QueryUnsubPayload,
};

pub use search::{
    SearchOptions, SearchPayload, SearchRespPayload, SearchResultEntry, SearchSubPayload,
    SearchUnsubPayload, SearchUpdatePayload,
};

pub use messaging::{
    ConflictResolver, CounterRequestPayload, CounterStatePayload, EntryProcessBatchData,
    EntryProcessBatchResponseData, EntryProcessData, EntryProcessKeyResult, EntryProcessor,
    EntryProcessResponseData, JournalEventData, JournalEventMessageData, JournalEventType,
    JournalReadData, JournalReadResponseData, JournalSubscribeData, JournalUnsubscribeData,
    ListResolversData, ListResolversResponseData, LockReleasePayload, LockRequestPayload,
    MergeRejectedData, PingData, PNCounterState, PongData, RegisterResolverData,
    RegisterResolverResponseData, ResolverInfo, TopicMessageEventPayload, TopicPubPayload,
    TopicSubPayload, TopicUnsubPayload, UnregisterResolverData, UnregisterResolverResponseData,
};

pub use client_events::{
    AuthAckData, AuthFailData, ErrorPayload, GcPrunePayload, LockGrantedPayload,
    LockReleasedPayload, QueryUpdatePayload, ServerBatchEventPayload, ServerEventPayload,
    ServerEventType, SyncResetRequiredPayload,
};

pub use cluster::{
    ClusterSearchReqPayload, ClusterSearchRespPayload, ClusterSearchSubscribePayload,
    ClusterSearchUnsubscribePayload, ClusterSearchUpdatePayload, ClusterSubAckPayload,
    ClusterSubRegisterPayload, ClusterSubUnregisterPayload, ClusterSubUpdatePayload,
    NodeEndpoints, NodeInfo, NodeStatus, PartitionInfo, PartitionMapPayload,
    PartitionMapRequestPayload,
};

/// Every message the protocol can carry, classified by direction and domain.
///
/// Client-to-server variants are routed to an [`crate::traits`]-level service by
/// `OperationService::classify` in `server-rust`; everything else (server-to-client
/// responses, the `Batch` transport envelope, auth handshake messages, and
/// cluster-internal federation messages) is rejected by that classifier with a
/// `ClassifyError` naming the variant, since those never originate from a client.
#[derive(Debug)]
pub enum Message {
    // ----- CRDT domain -----
    ClientOp(ClientOpMessage),
    OpBatch(OpBatchMessage),

    // ----- Sync domain -----
    SyncInit(SyncInitMessage),
    MerkleReqBucket(MerkleReqBucketMessage),
    ORMapSyncInit(ORMapSyncInit),
    ORMapMerkleReqBucket(ORMapMerkleReqBucket),
    ORMapDiffRequest(ORMapDiffRequest),
    ORMapPushDiff(ORMapPushDiff),

    // ----- Query domain -----
    QuerySub(QuerySubMessage),
    QueryUnsub(QueryUnsubMessage),

    // ----- Messaging domain -----
    TopicSub { payload: TopicSubPayload },
    TopicUnsub { payload: TopicUnsubPayload },
    TopicPub { payload: TopicPubPayload },

    // ----- Coordination domain -----
    LockRequest { payload: LockRequestPayload },
    LockRelease { payload: LockReleasePayload },
    PartitionMapRequest { payload: Option<PartitionMapRequestPayload> },
    Ping(PingData),

    // ----- Search domain -----
    Search { payload: SearchPayload },
    SearchSub { payload: SearchSubPayload },
    SearchUnsub { payload: SearchUnsubPayload },

    // ----- Persistence domain -----
    CounterRequest { payload: CounterRequestPayload },
    CounterSync { payload: CounterStatePayload },
    EntryProcess(EntryProcessData),
    EntryProcessBatch(EntryProcessBatchData),
    RegisterResolver(RegisterResolverData),
    UnregisterResolver(UnregisterResolverData),
    ListResolvers(ListResolversData),
    JournalSubscribe(JournalSubscribeData),
    JournalUnsubscribe(JournalUnsubscribeData),
    JournalRead(JournalReadData),

    // ----- Server-to-client responses -----
    OpAck(OpAckMessage),
    OpRejected(OpRejectedMessage),
    SyncRespRoot(SyncRespRootMessage),
    SyncRespBuckets(SyncRespBucketsMessage),
    SyncRespLeaf(SyncRespLeafMessage),
    ORMapSyncRespRoot(ORMapSyncRespRoot),
    ORMapSyncRespBuckets(ORMapSyncRespBuckets),
    ORMapSyncRespLeaf(ORMapSyncRespLeaf),
    ORMapDiffResponse(ORMapDiffResponse),
    QueryResp(QueryRespMessage),
    QueryUpdate { payload: QueryUpdatePayload },
    SearchResp { payload: SearchRespPayload },
    SearchUpdate { payload: SearchUpdatePayload },
    CounterResponse { payload: CounterStatePayload },
    CounterUpdate { payload: CounterStatePayload },
    EntryProcessResponse(EntryProcessResponseData),
    EntryProcessBatchResponse(EntryProcessBatchResponseData),
    JournalEvent { event: JournalEventData },
    JournalReadResponse(JournalReadResponseData),
    RegisterResolverResponse(RegisterResolverResponseData),
    UnregisterResolverResponse(UnregisterResolverResponseData),
    ListResolversResponse(ListResolversResponseData),
    MergeRejected(MergeRejectedData),
    ServerEvent { payload: ServerEventPayload },
    ServerBatchEvent { payload: ServerBatchEventPayload },
    GcPrune { payload: GcPrunePayload },
    AuthAck(AuthAckData),
    AuthFail(AuthFailData),
    Error { payload: ErrorPayload },
    LockGranted { payload: LockGrantedPayload },
    LockReleased { payload: LockReleasedPayload },
    SyncResetRequired { payload: SyncResetRequiredPayload },
    Pong(PongData),
    PartitionMap { payload: PartitionMapPayload },
    TopicMessage { payload: TopicMessageEventPayload },

    // ----- Cluster-internal federation (node-to-node only) -----
    ClusterSubRegister { payload: ClusterSubRegisterPayload },
    ClusterSubAck { payload: ClusterSubAckPayload },
    ClusterSubUpdate { payload: ClusterSubUpdatePayload },
    ClusterSubUnregister { payload: ClusterSubUnregisterPayload },
    ClusterSearchReq { payload: ClusterSearchReqPayload },
    ClusterSearchResp { payload: ClusterSearchRespPayload },
    ClusterSearchSubscribe { payload: ClusterSearchSubscribePayload },
    ClusterSearchUnsubscribe { payload: ClusterSearchUnsubscribePayload },
    ClusterSearchUpdate { payload: ClusterSearchUpdatePayload },

    // ----- Transport envelope -----
    Batch(BatchMessage),

    // ----- Auth handshake -----
    Auth(AuthMessage),
    AuthRequired(AuthRequiredMessage),
}
