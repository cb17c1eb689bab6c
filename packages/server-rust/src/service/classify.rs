//! Message classification: converts `Message` into typed `Operation` variants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use topgun_core::messages::Message;
use topgun_core::{hash_to_partition, HLC};

use super::config::ServerConfig;
use super::operation::{
    service_names, CallerOrigin, ClassifyError, Operation, OperationContext,
};

// ---------------------------------------------------------------------------
// OperationService
// ---------------------------------------------------------------------------

/// Classifies incoming `Message` values into typed `Operation` variants.
///
/// Each call generates a fresh HLC timestamp and a unique call ID. The
/// `partition_id` is computed from relevant key fields when available.
pub struct OperationService {
    hlc: Arc<parking_lot::Mutex<HLC>>,
    config: Arc<ServerConfig>,
    call_id_counter: AtomicU64,
}

impl OperationService {
    /// Create a new `OperationService`.
    #[must_use]
    pub fn new(hlc: Arc<parking_lot::Mutex<HLC>>, config: Arc<ServerConfig>) -> Self {
        Self {
            hlc,
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    /// Generate a unique call ID for each operation.
    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Generate a fresh HLC timestamp.
    fn now(&self) -> topgun_core::Timestamp {
        self.hlc.lock().now()
    }

    /// Build an `OperationContext` for the given service and optional partition key.
    fn make_ctx(
        &self,
        service_name: &'static str,
        client_id: Option<String>,
        caller_origin: CallerOrigin,
        partition_key: Option<&str>,
    ) -> OperationContext {
        let mut ctx = OperationContext::new(
            self.next_call_id(),
            service_name,
            self.now(),
            self.config.default_operation_timeout_ms,
        );
        ctx.caller_origin = caller_origin;
        ctx.client_id = client_id;
        ctx.partition_id = partition_key.map(hash_to_partition);
        ctx
    }

    /// Classify a `Message` into an `Operation`.
    ///
    /// Client-to-server messages produce `Ok(Operation)`.
    /// Server-to-client responses, transport envelopes, auth messages, and
    /// cluster-internal messages produce `Err(ClassifyError)`.
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError` for messages that are not classifiable as operations:
    /// - `ClassifyError::ServerToClient` for response messages and cluster-internal messages
    /// - `ClassifyError::TransportEnvelope` for `Batch` messages
    /// - `ClassifyError::AuthMessage` for `Auth` and `AuthRequired` messages
    #[allow(clippy::too_many_lines)]
    pub fn classify(
        &self,
        msg: Message,
        client_id: Option<String>,
        caller_origin: CallerOrigin,
    ) -> Result<Operation, ClassifyError> {
        match msg {
            // ----- CRDT domain (service_name = "crdt") -----

            Message::ClientOp(payload) => {
                let partition_key = Some(payload.payload.key.as_str());
                let ctx = self.make_ctx(
                    service_names::CRDT,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::ClientOp { ctx, payload })
            }
            Message::OpBatch(payload) => {
                let ctx =
                    self.make_ctx(service_names::CRDT, client_id, caller_origin, None);
                Ok(Operation::OpBatch { ctx, payload })
            }

            // ----- Sync domain (service_name = "sync") -----

            Message::SyncInit(payload) => {
                let partition_key = Some(payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::SYNC,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::SyncInit { ctx, payload })
            }
            Message::MerkleReqBucket(payload) => {
                let partition_key = Some(payload.payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::SYNC,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::MerkleReqBucket { ctx, payload })
            }
            Message::ORMapSyncInit(payload) => {
                let partition_key = Some(payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::SYNC,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::ORMapSyncInit { ctx, payload })
            }
            Message::ORMapMerkleReqBucket(payload) => {
                let partition_key = Some(payload.payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::SYNC,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::ORMapMerkleReqBucket { ctx, payload })
            }
            Message::ORMapDiffRequest(payload) => {
                let partition_key = Some(payload.payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::SYNC,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::ORMapDiffRequest { ctx, payload })
            }
            Message::ORMapPushDiff(payload) => {
                let partition_key = Some(payload.payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::SYNC,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::ORMapPushDiff { ctx, payload })
            }

            // ----- Query domain (service_name = "query") -----

            Message::QuerySub(payload) => {
                let ctx = self.make_ctx(
                    service_names::QUERY,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::QuerySubscribe { ctx, payload })
            }
            Message::QueryUnsub(payload) => {
                let ctx = self.make_ctx(
                    service_names::QUERY,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::QueryUnsubscribe { ctx, payload })
            }

            // ----- Messaging domain (service_name = "messaging") -----

            Message::TopicSub { payload } => {
                let partition_key = Some(payload.topic.as_str());
                let ctx = self.make_ctx(
                    service_names::MESSAGING,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::TopicSubscribe { ctx, payload })
            }
            Message::TopicUnsub { payload } => {
                let partition_key = Some(payload.topic.as_str());
                let ctx = self.make_ctx(
                    service_names::MESSAGING,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::TopicUnsubscribe { ctx, payload })
            }
            Message::TopicPub { payload } => {
                let partition_key = Some(payload.topic.as_str());
                let ctx = self.make_ctx(
                    service_names::MESSAGING,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::TopicPublish { ctx, payload })
            }

            // ----- Coordination domain (service_name = "coordination") -----

            Message::LockRequest { payload } => {
                let partition_key = Some(payload.name.as_str());
                let ctx = self.make_ctx(
                    service_names::COORDINATION,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::LockRequest { ctx, payload })
            }
            Message::LockRelease { payload } => {
                let partition_key = Some(payload.name.as_str());
                let ctx = self.make_ctx(
                    service_names::COORDINATION,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::LockRelease { ctx, payload })
            }
            Message::PartitionMapRequest { payload } => {
                let ctx = self.make_ctx(
                    service_names::COORDINATION,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::PartitionMapRequest { ctx, payload })
            }
            Message::Ping(payload) => {
                let ctx = self.make_ctx(
                    service_names::COORDINATION,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::Ping { ctx, payload })
            }

            // ----- Search domain (service_name = "search") -----

            Message::Search { payload } => {
                let ctx = self.make_ctx(
                    service_names::SEARCH,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::Search { ctx, payload })
            }
            Message::SearchSub { payload } => {
                let ctx = self.make_ctx(
                    service_names::SEARCH,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::SearchSubscribe { ctx, payload })
            }
            Message::SearchUnsub { payload } => {
                let ctx = self.make_ctx(
                    service_names::SEARCH,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::SearchUnsubscribe { ctx, payload })
            }

            // ----- Persistence domain (service_name = "persistence") -----

            Message::CounterRequest { payload } => {
                let partition_key = Some(payload.name.as_str());
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::CounterRequest { ctx, payload })
            }
            Message::CounterSync { payload } => {
                let partition_key = Some(payload.name.as_str());
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::CounterSync { ctx, payload })
            }
            Message::EntryProcess(payload) => {
                let partition_key = Some(payload.key.as_str());
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::EntryProcess { ctx, payload })
            }
            Message::EntryProcessBatch(payload) => {
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    None,
                );
                Ok(Operation::EntryProcessBatch { ctx, payload })
            }
            Message::RegisterResolver(payload) => {
                let partition_key = Some(payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::RegisterResolver { ctx, payload })
            }
            Message::UnregisterResolver(payload) => {
                let partition_key = Some(payload.map_name.as_str());
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::UnregisterResolver { ctx, payload })
            }
            Message::ListResolvers(payload) => {
                let partition_key = payload.map_name.as_deref();
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::ListResolvers { ctx, payload })
            }
            Message::JournalSubscribe(payload) => {
                let partition_key = payload.map_name.as_deref();
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::JournalSubscribe { ctx, payload })
            }
            Message::JournalUnsubscribe(payload) => {
                let partition_key: Option<&str> = None;
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::JournalUnsubscribe { ctx, payload })
            }
            Message::JournalRead(payload) => {
                let partition_key = payload.map_name.as_deref();
                let ctx = self.make_ctx(
                    service_names::PERSISTENCE,
                    client_id,
                    caller_origin,
                    partition_key,
                );
                Ok(Operation::JournalRead { ctx, payload })
            }

            // ----- Server-to-client responses -> ClassifyError::ServerToClient -----

            Message::OpAck(_) => Err(ClassifyError::ServerToClient { variant: "OpAck" }),
            Message::OpRejected(_) => {
                Err(ClassifyError::ServerToClient { variant: "OpRejected" })
            }
            Message::SyncRespRoot(_) => {
                Err(ClassifyError::ServerToClient { variant: "SyncRespRoot" })
            }
            Message::SyncRespBuckets(_) => {
                Err(ClassifyError::ServerToClient { variant: "SyncRespBuckets" })
            }
            Message::SyncRespLeaf(_) => {
                Err(ClassifyError::ServerToClient { variant: "SyncRespLeaf" })
            }
            Message::ORMapSyncRespRoot(_) => {
                Err(ClassifyError::ServerToClient { variant: "ORMapSyncRespRoot" })
            }
            Message::ORMapSyncRespBuckets(_) => Err(ClassifyError::ServerToClient {
                variant: "ORMapSyncRespBuckets",
            }),
            Message::ORMapSyncRespLeaf(_) => {
                Err(ClassifyError::ServerToClient { variant: "ORMapSyncRespLeaf" })
            }
            Message::ORMapDiffResponse(_) => {
                Err(ClassifyError::ServerToClient { variant: "ORMapDiffResponse" })
            }
            Message::QueryResp(_) => {
                Err(ClassifyError::ServerToClient { variant: "QueryResp" })
            }
            Message::QueryUpdate { .. } => {
                Err(ClassifyError::ServerToClient { variant: "QueryUpdate" })
            }
            Message::SearchResp { .. } => {
                Err(ClassifyError::ServerToClient { variant: "SearchResp" })
            }
            Message::SearchUpdate { .. } => {
                Err(ClassifyError::ServerToClient { variant: "SearchUpdate" })
            }
            Message::CounterResponse { .. } => {
                Err(ClassifyError::ServerToClient { variant: "CounterResponse" })
            }
            Message::CounterUpdate { .. } => {
                Err(ClassifyError::ServerToClient { variant: "CounterUpdate" })
            }
            Message::EntryProcessResponse(_) => Err(ClassifyError::ServerToClient {
                variant: "EntryProcessResponse",
            }),
            Message::EntryProcessBatchResponse(_) => Err(ClassifyError::ServerToClient {
                variant: "EntryProcessBatchResponse",
            }),
            Message::JournalEvent { .. } => {
                Err(ClassifyError::ServerToClient { variant: "JournalEvent" })
            }
            Message::JournalReadResponse(_) => {
                Err(ClassifyError::ServerToClient { variant: "JournalReadResponse" })
            }
            Message::RegisterResolverResponse(_) => Err(ClassifyError::ServerToClient {
                variant: "RegisterResolverResponse",
            }),
            Message::UnregisterResolverResponse(_) => Err(ClassifyError::ServerToClient {
                variant: "UnregisterResolverResponse",
            }),
            Message::ListResolversResponse(_) => Err(ClassifyError::ServerToClient {
                variant: "ListResolversResponse",
            }),
            Message::MergeRejected(_) => {
                Err(ClassifyError::ServerToClient { variant: "MergeRejected" })
            }
            Message::ServerEvent { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ServerEvent" })
            }
            Message::ServerBatchEvent { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ServerBatchEvent" })
            }
            Message::GcPrune { .. } => {
                Err(ClassifyError::ServerToClient { variant: "GcPrune" })
            }
            Message::AuthAck(_) => {
                Err(ClassifyError::ServerToClient { variant: "AuthAck" })
            }
            Message::AuthFail(_) => {
                Err(ClassifyError::ServerToClient { variant: "AuthFail" })
            }
            Message::Error { .. } => {
                Err(ClassifyError::ServerToClient { variant: "Error" })
            }
            Message::LockGranted { .. } => {
                Err(ClassifyError::ServerToClient { variant: "LockGranted" })
            }
            Message::LockReleased { .. } => {
                Err(ClassifyError::ServerToClient { variant: "LockReleased" })
            }
            Message::SyncResetRequired { .. } => {
                Err(ClassifyError::ServerToClient { variant: "SyncResetRequired" })
            }
            Message::Pong(_) => {
                Err(ClassifyError::ServerToClient { variant: "Pong" })
            }
            Message::PartitionMap { .. } => {
                Err(ClassifyError::ServerToClient { variant: "PartitionMap" })
            }
            Message::TopicMessage { .. } => {
                Err(ClassifyError::ServerToClient { variant: "TopicMessage" })
            }

            // ----- Cluster-internal messages -> ClassifyError::ServerToClient -----
            // These are node-to-node, not client-to-server. They will be handled
            // by a separate cluster message path in Phase 3+.

            Message::ClusterSubRegister { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSubRegister" })
            }
            Message::ClusterSubAck { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSubAck" })
            }
            Message::ClusterSubUpdate { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSubUpdate" })
            }
            Message::ClusterSubUnregister { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSubUnregister" })
            }
            Message::ClusterSearchReq { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSearchReq" })
            }
            Message::ClusterSearchResp { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSearchResp" })
            }
            Message::ClusterSearchSubscribe { .. } => Err(ClassifyError::ServerToClient {
                variant: "ClusterSearchSubscribe",
            }),
            Message::ClusterSearchUnsubscribe { .. } => Err(ClassifyError::ServerToClient {
                variant: "ClusterSearchUnsubscribe",
            }),
            Message::ClusterSearchUpdate { .. } => {
                Err(ClassifyError::ServerToClient { variant: "ClusterSearchUpdate" })
            }

            // ----- Transport envelope -> ClassifyError::TransportEnvelope -----

            Message::Batch(_) => {
                Err(ClassifyError::TransportEnvelope { variant: "Batch" })
            }

            // ----- Auth messages -> ClassifyError::AuthMessage -----

            Message::Auth(_) => Err(ClassifyError::AuthMessage { variant: "Auth" }),
            Message::AuthRequired(_) => {
                Err(ClassifyError::AuthMessage { variant: "AuthRequired" })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
