//! Cluster domain payload structs for partition map distribution, inter-node
//! subscription forwarding, and distributed search coordination.
//!
//! These types correspond to the TypeScript Zod schemas in
//! `packages/core/src/schemas/cluster-schemas.ts`. All structs use
//! `#[serde(rename_all = "camelCase")]` to produce wire-compatible
//! `MsgPack` output via `rmp_serde::to_vec_named()`.

use serde::{Deserialize, Serialize};

use super::base::ChangeEventType;
use super::query::QueryResultEntry;
use super::{base::Query, search::SearchOptions, search::SearchResultEntry};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Status of a node within the cluster.
///
/// Maps to the inline `z.enum(...)` in `NodeInfoSchema.status` in
/// `cluster-schemas.ts`. Variant names use `SCREAMING_CASE` to match
/// TS wire values directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum NodeStatus {
    ACTIVE,
    JOINING,
    LEAVING,
    SUSPECTED,
    FAILED,
}

// ---------------------------------------------------------------------------
// Partition Map types
// ---------------------------------------------------------------------------

/// Network endpoints for a cluster node.
///
/// Maps to the inline `endpoints` object in `NodeInfoSchema` in
/// `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEndpoints {
    /// WebSocket endpoint URL.
    pub websocket: String,

    /// Optional HTTP endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub http: Option<String>,
}

/// Information about a single node in the cluster.
///
/// Maps to `NodeInfoSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Unique identifier for this node.
    pub node_id: String,

    /// Network endpoints for reaching this node.
    pub endpoints: NodeEndpoints,

    /// Current membership status.
    pub status: NodeStatus,
}

/// Ownership information for a single partition.
///
/// Maps to `PartitionInfoSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    /// Partition identifier (0-based).
    pub partition_id: u32,

    /// Node ID of the partition owner.
    pub owner_node_id: String,

    /// Node IDs holding backup replicas.
    pub backup_node_ids: Vec<String>,
}

/// Full partition map describing cluster topology.
///
/// Maps to `PartitionMapPayloadSchema` in `cluster-schemas.ts`.
/// Distributed to clients so they can route operations directly to
/// the owning node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionMapPayload {
    /// Monotonically increasing version for optimistic staleness detection.
    pub version: u32,

    /// Total number of partitions in the cluster (typically 271).
    pub partition_count: u32,

    /// All known cluster nodes and their endpoints.
    pub nodes: Vec<NodeInfo>,

    /// Assignment of partitions to nodes.
    pub partitions: Vec<PartitionInfo>,

    /// Timestamp (ms since epoch) when this map was generated.
    pub generated_at: i64,
}

/// Payload for requesting the current partition map.
///
/// Maps to the `payload` of `PartitionMapRequestSchema` in `cluster-schemas.ts`.
/// Includes the client's current version for delta comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionMapRequestPayload {
    /// Client's current partition map version, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_version: Option<u32>,
}

// ---------------------------------------------------------------------------
// Live query federation
// ---------------------------------------------------------------------------
//
// A client's QUERY_SUBSCRIBE against a map is federated to every partition
// owner so results from the whole cluster, not just the receiving node,
// populate the subscription. These are node-to-node only; a client never
// sends or receives them directly.

/// Registers a federated query subscription on a remote partition owner.
///
/// Maps to `ClusterSubRegisterSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSubRegisterPayload {
    /// Subscription identifier, shared across all federated nodes.
    pub subscription_id: String,
    /// Map being queried.
    pub map_name: String,
    /// The query predicate to evaluate against this node's partition shard.
    pub query: Query,
    /// Node that owns the client connection and aggregates results.
    pub origin_node_id: String,
}

/// Acknowledges a federated subscription registration, with initial matches.
///
/// Maps to `ClusterSubAckSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSubAckPayload {
    /// Subscription identifier this acknowledges.
    pub subscription_id: String,
    /// Node that registered the subscription.
    pub node_id: String,
    /// Whether registration succeeded on this node.
    pub success: bool,
    /// Error description if registration failed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    /// Matches already present on this node's shard at registration time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initial_results: Option<Vec<QueryResultEntry>>,
    /// Total number of matches on this node's shard, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_hits: Option<u32>,
}

/// Propagates a live change on a federated subscription back to the origin node.
///
/// Maps to `ClusterSubUpdateSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSubUpdatePayload {
    /// Subscription this update belongs to.
    pub subscription_id: String,
    /// Key that changed on this node's shard.
    pub key: String,
    /// Current value.
    pub value: rmpv::Value,
    /// Whether the record entered, updated within, or left the result set.
    pub change_type: ChangeEventType,
}

/// Cancels a federated query subscription on a remote partition owner.
///
/// Maps to `ClusterSubUnregisterSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSubUnregisterPayload {
    /// Subscription to cancel.
    pub subscription_id: String,
}

// ---------------------------------------------------------------------------
// Distributed search federation
// ---------------------------------------------------------------------------
//
// One-shot and live full-text search requests are fanned out to every
// partition owner the same way live queries are; each node searches only
// its own shard and the origin node merges results by score.

/// Federates a one-shot search request to a remote partition owner.
///
/// Maps to `ClusterSearchReqSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSearchReqPayload {
    /// Identifier correlating this request with its responses across nodes.
    pub request_id: String,
    /// Map being searched.
    pub map_name: String,
    /// Full-text search query string.
    pub query: String,
    /// Optional search configuration.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<SearchOptions>,
    /// Node that owns the client connection and merges results.
    pub origin_node_id: String,
}

/// A remote partition owner's matches for a federated search request.
///
/// Maps to `ClusterSearchRespSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSearchRespPayload {
    /// Matches the originating `ClusterSearchReqPayload::request_id`.
    pub request_id: String,
    /// Node that produced these results.
    pub node_id: String,
    /// Matches from this node's shard.
    pub results: Vec<SearchResultEntry>,
    /// Total number of matches on this node's shard.
    pub total_count: u32,
    /// Error message if the search failed on this node.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Registers a federated live search subscription on a remote partition owner.
///
/// Maps to `ClusterSearchSubscribeSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSearchSubscribePayload {
    /// Subscription identifier, shared across all federated nodes.
    pub subscription_id: String,
    /// Map being searched.
    pub map_name: String,
    /// Full-text search query string.
    pub query: String,
    /// Optional search configuration.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<SearchOptions>,
    /// Node that owns the client connection and merges results.
    pub origin_node_id: String,
}

/// Cancels a federated live search subscription on a remote partition owner.
///
/// Maps to `ClusterSearchUnsubscribeSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSearchUnsubscribePayload {
    /// Subscription to cancel.
    pub subscription_id: String,
}

/// Propagates a live search result change on a federated subscription back to
/// the origin node.
///
/// Maps to `ClusterSearchUpdateSchema` in `cluster-schemas.ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSearchUpdatePayload {
    /// Subscription this update belongs to.
    pub subscription_id: String,
    /// Key that changed on this node's shard.
    pub key: String,
    /// Current value.
    pub value: rmpv::Value,
    /// Updated relevance score.
    pub score: f64,
    /// Terms from the query that match the updated record.
    pub matched_terms: Vec<String>,
    /// Whether the record entered, updated within, or left the result set.
    pub change_type: ChangeEventType,
}
