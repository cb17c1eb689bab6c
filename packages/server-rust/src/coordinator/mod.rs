//! `ServerCoordinator`: the primary write path for CRDT operations.
//!
//! Owns the server's [`HLC`] and a [`MapProvider`] handle, applies
//! `ClientOp`/`OpBatch` operations against the right CRDT map, and reports
//! back the write concern actually achieved. This is the logic `CrdtService`
//! (`service/domain/mod.rs`) delegates to instead of returning
//! `NotImplemented`.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use topgun_core::messages::{
    Message, OpAckMessage, OpAckPayload, OpRejectedMessage, OpRejectedPayload, OpResult,
};
use topgun_core::{ApplyOutcome, ClientOp, CrdtMap, KeySnapshot, MapType, Value, WriteConcern, HLC};

use crate::service::{OperationContext, OperationError, OperationResponse};
use crate::traits::{MapProvider, ServerStorage};

/// Reasons a local write could not be applied.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("map '{0}' could not be loaded: {1}")]
    MapLoad(String, anyhow::Error),
    #[error("operation has no usable value for map '{0}', key '{1}'")]
    MissingValue(String, String),
    #[error("unrecognized op_type '{0}' for map '{1}'")]
    UnknownOpType(String, String),
    #[error("counter delta value is not an integer")]
    NonIntegerDelta,
}

/// Infers which CRDT structure a `ClientOp` targets.
///
/// An explicit OR-Map record or tag always wins; next, an `op_type` of
/// `increment`/`decrement`/`delta` selects the PN-Counter; anything else
/// (including `set`/`delete`/absent `op_type`) defaults to LWW, which is the
/// common case for plain key/value writes.
fn infer_map_type(op: &ClientOp) -> MapType {
    let has_or_shape = matches!(op.or_record, Some(Some(_))) || matches!(op.or_tag, Some(Some(_)));
    if has_or_shape {
        return MapType::Or;
    }
    match op.op_type.as_deref() {
        Some("increment") | Some("decrement") | Some("delta") => MapType::Counter,
        _ => MapType::Lww,
    }
}

/// Serializes a key snapshot for the storage backend. `KeySnapshot` itself
/// carries no `Serialize` impl (it is a read view, not a wire type), so this
/// mirrors its shape into a JSON-encodable form.
pub(crate) fn encode_snapshot(snapshot: &KeySnapshot) -> anyhow::Result<Vec<u8>> {
    #[derive(serde::Serialize)]
    #[serde(tag = "kind")]
    enum Shadow<'a> {
        Single { value: &'a Option<Value> },
        Multi { values: &'a Vec<Value> },
        Counter { value: i64 },
    }

    let shadow = match snapshot {
        KeySnapshot::Single(value) => Shadow::Single { value },
        KeySnapshot::Multi(values) => Shadow::Multi { values },
        KeySnapshot::Counter(value) => Shadow::Counter { value: *value },
    };
    Ok(serde_json::to_vec(&shadow)?)
}

/// Coordinates local application of CRDT writes against loaded maps.
///
/// `storage` is optional: without a backing store, a successful write can
/// only be acknowledged at `WriteConcern::APPLIED` (in-memory, this node
/// only) -- `PERSISTED` requires a `ServerStorage` that actually durable-writes
/// the record, and `REPLICATED` requires real cluster fan-out, which this
/// coordinator does not perform itself (see `DESIGN.md`).
pub struct ServerCoordinator {
    node_id: String,
    hlc: Arc<Mutex<HLC>>,
    maps: Arc<dyn MapProvider>,
    storage: Option<Arc<dyn ServerStorage>>,
}

impl ServerCoordinator {
    #[must_use]
    pub fn new(node_id: String, hlc: Arc<Mutex<HLC>>, maps: Arc<dyn MapProvider>) -> Self {
        Self {
            node_id,
            hlc,
            maps,
            storage: None,
        }
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn ServerStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Applies a single local `ClientOp`, producing the `Message` (`OP_ACK`
    /// or `OP_REJECTED`) to send back to the originating client.
    pub async fn process_local_op(
        &self,
        _ctx: &OperationContext,
        op: ClientOp,
    ) -> Result<OperationResponse, OperationError> {
        let op_id = op.id.clone().unwrap_or_default();
        let message = match self.apply_one(&op).await {
            Ok(achieved) => Message::OpAck(OpAckMessage {
                r#type: "OP_ACK".to_string(),
                payload: OpAckPayload {
                    last_id: op_id,
                    achieved_level: Some(achieved),
                    results: None,
                },
            }),
            Err(err) => Message::OpRejected(OpRejectedMessage {
                r#type: "OP_REJECTED".to_string(),
                payload: OpRejectedPayload {
                    op_id,
                    reason: err.to_string(),
                    code: None,
                },
            }),
        };
        Ok(OperationResponse::Message(Box::new(message)))
    }

    /// Applies every op in a batch independently, acknowledging the batch as
    /// a whole with one `OpResult` per op rather than rejecting the entire
    /// batch for one bad op.
    pub async fn process_batch(
        &self,
        _ctx: &OperationContext,
        ops: Vec<ClientOp>,
    ) -> Result<OperationResponse, OperationError> {
        let last_id = ops
            .last()
            .and_then(|op| op.id.clone())
            .unwrap_or_default();

        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let op_id = op.id.clone().unwrap_or_default();
            match self.apply_one(&op).await {
                Ok(achieved) => results.push(OpResult {
                    op_id,
                    success: true,
                    achieved_level: achieved,
                    error: None,
                }),
                Err(err) => results.push(OpResult {
                    op_id,
                    success: false,
                    achieved_level: WriteConcern::FIRE_AND_FORGET,
                    error: Some(err.to_string()),
                }),
            }
        }

        let message = Message::OpAck(OpAckMessage {
            r#type: "OP_ACK".to_string(),
            payload: OpAckPayload {
                last_id,
                achieved_level: None,
                results: Some(results),
            },
        });
        Ok(OperationResponse::Message(Box::new(message)))
    }

    /// Applies one op against the map it targets, returning the write
    /// concern actually achieved.
    async fn apply_one(&self, op: &ClientOp) -> Result<WriteConcern, CoordinatorError> {
        let map_type = infer_map_type(op);
        let map = self
            .maps
            .get_or_load_map(&op.map_name, map_type)
            .await
            .map_err(|e| CoordinatorError::MapLoad(op.map_name.clone(), e))?;

        match map_type {
            MapType::Lww => self.apply_lww(&map, op)?,
            MapType::Or => self.apply_or(&map, op)?,
            MapType::Counter => self.apply_counter(&map, op)?,
        }

        if let Some(storage) = &self.storage {
            let snapshot = map.snapshot_key(&op.key);
            if let Ok(data) = encode_snapshot(&snapshot) {
                let value = topgun_core::StorageValue { data };
                if storage.store(&op.map_name, &op.key, &value).await.is_ok() {
                    return Ok(WriteConcern::PERSISTED);
                }
            }
        }

        Ok(WriteConcern::APPLIED)
    }

    fn apply_lww(&self, map: &Arc<CrdtMap>, op: &ClientOp) -> Result<(), CoordinatorError> {
        let is_delete = matches!(op.op_type.as_deref(), Some("delete") | Some("remove"))
            || matches!(op.record, Some(None));
        if is_delete {
            map.apply_local_remove(&op.key, None);
            return Ok(());
        }

        let Some(Some(record)) = &op.record else {
            return Err(CoordinatorError::MissingValue(
                op.map_name.clone(),
                op.key.clone(),
            ));
        };
        let value = record
            .value
            .clone()
            .map(Value::from_rmpv)
            .unwrap_or(Value::Null);
        map.apply_local_set(&op.key, value, record.ttl_ms);
        Ok(())
    }

    fn apply_or(&self, map: &Arc<CrdtMap>, op: &ClientOp) -> Result<(), CoordinatorError> {
        let is_remove = matches!(op.op_type.as_deref(), Some("remove") | Some("delete"));
        if is_remove {
            if let Some(Some(record)) = &op.or_record {
                let value = Value::from_rmpv(record.value.clone());
                map.apply_local_remove(&op.key, Some(&value));
                return Ok(());
            }
            return Err(CoordinatorError::MissingValue(
                op.map_name.clone(),
                op.key.clone(),
            ));
        }

        let Some(Some(record)) = &op.or_record else {
            return Err(CoordinatorError::MissingValue(
                op.map_name.clone(),
                op.key.clone(),
            ));
        };
        let value = Value::from_rmpv(record.value.clone());
        map.apply_local_set(&op.key, value, record.ttl_ms);
        Ok(())
    }

    fn apply_counter(&self, map: &Arc<CrdtMap>, op: &ClientOp) -> Result<(), CoordinatorError> {
        let Some(Some(record)) = &op.record else {
            return Err(CoordinatorError::MissingValue(
                op.map_name.clone(),
                op.key.clone(),
            ));
        };
        let magnitude = match record.value.clone().map(Value::from_rmpv) {
            Some(Value::Int(n)) => n,
            Some(Value::Float(f)) => f as i64,
            _ => return Err(CoordinatorError::NonIntegerDelta),
        };
        let delta = match op.op_type.as_deref() {
            Some("decrement") => -magnitude.abs(),
            Some("increment") | Some("delta") => magnitude,
            Some(other) => {
                return Err(CoordinatorError::UnknownOpType(
                    other.to_string(),
                    op.map_name.clone(),
                ))
            }
            None => magnitude,
        };
        map.apply_local_delta(delta);
        Ok(())
    }

    /// Merges an already-timestamped remote LWW record, e.g. received during
    /// anti-entropy or cluster forwarding. Returns whether it changed state.
    pub async fn process_remote_lww(
        &self,
        map_name: &str,
        key: &str,
        record: topgun_core::LWWRecord<Value>,
    ) -> anyhow::Result<ApplyOutcome> {
        self.hlc.lock().update(&record.timestamp).ok();
        let map = self.maps.get_or_load_map(map_name, MapType::Lww).await?;
        Ok(map.apply_remote_lww(key, record))
    }
}

/// In-memory [`MapProvider`] used by tests in this crate that need a real
/// `ServerCoordinator` without a storage backend.
#[cfg(test)]
pub(crate) struct InMemoryMaps {
    maps: Mutex<std::collections::HashMap<String, Arc<CrdtMap>>>,
}

#[cfg(test)]
impl InMemoryMaps {
    pub(crate) fn new() -> Self {
        Self {
            maps: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl MapProvider for InMemoryMaps {
    async fn get_map(&self, name: &str) -> Option<Arc<CrdtMap>> {
        self.maps.lock().get(name).cloned()
    }

    async fn get_or_load_map(
        &self,
        name: &str,
        type_hint: MapType,
    ) -> anyhow::Result<Arc<CrdtMap>> {
        if let Some(existing) = self.get_map(name).await {
            return Ok(existing);
        }
        let hlc = HLC::new(format!("test-{name}"), Box::new(topgun_core::SystemClock));
        let map = Arc::new(match type_hint {
            MapType::Lww => CrdtMap::new_lww(name, hlc),
            MapType::Or => CrdtMap::new_or(name, hlc),
            MapType::Counter => CrdtMap::new_counter(name, hlc),
        });
        self.maps.lock().insert(name.to_string(), map.clone());
        Ok(map)
    }

    fn has_map(&self, name: &str) -> bool {
        self.maps.lock().contains_key(name)
    }

    fn loaded_map_names(&self) -> Vec<String> {
        self.maps.lock().keys().cloned().collect()
    }
}

/// Builds a `ServerCoordinator` backed by an empty `InMemoryMaps`, for use in
/// this crate's own tests (see `service::domain::tests`).
#[cfg(test)]
pub(crate) fn test_coordinator() -> ServerCoordinator {
    let hlc = Arc::new(Mutex::new(HLC::new(
        "node-1".to_string(),
        Box::new(topgun_core::SystemClock),
    )));
    ServerCoordinator::new("node-1".to_string(), hlc, Arc::new(InMemoryMaps::new()))
}

#[cfg(test)]
mod tests {
    use topgun_core::{LWWRecord, Timestamp};

    use super::*;

    fn make_coordinator() -> ServerCoordinator {
        test_coordinator()
    }

    fn ctx() -> OperationContext {
        OperationContext::new(
            1,
            crate::service::service_names::CRDT,
            Timestamp {
                millis: 1_700_000_000_000,
                counter: 0,
                node_id: "test".to_string(),
            },
            5_000,
        )
    }

    fn set_op(map_name: &str, key: &str, value: rmpv::Value) -> ClientOp {
        ClientOp {
            id: Some("op-1".to_string()),
            map_name: map_name.to_string(),
            key: key.to_string(),
            op_type: Some("set".to_string()),
            record: Some(Some(LWWRecord {
                value: Some(value),
                timestamp: Timestamp {
                    millis: 0,
                    counter: 0,
                    node_id: "client".to_string(),
                },
                ttl_ms: None,
            })),
            or_record: None,
            or_tag: None,
            write_concern: None,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn lww_set_acks_with_applied_level() {
        let coordinator = make_coordinator();
        let op = set_op("widgets", "alice", rmpv::Value::String("hi".into()));
        let ctx = ctx();

        let resp = coordinator.process_local_op(&ctx, op).await.unwrap();
        match resp {
            OperationResponse::Message(msg) => match *msg {
                Message::OpAck(ack) => {
                    assert_eq!(ack.payload.last_id, "op-1");
                    assert_eq!(ack.payload.achieved_level, Some(WriteConcern::APPLIED));
                }
                other => panic!("expected OpAck, got {other:?}"),
            },
            other => panic!("expected Message response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lww_delete_without_record_rejects_missing_value_is_not_triggered() {
        let coordinator = make_coordinator();
        let mut op = set_op("widgets", "alice", rmpv::Value::String("hi".into()));
        op.op_type = Some("delete".to_string());
        op.record = None;
        let ctx = ctx();

        let resp = coordinator.process_local_op(&ctx, op).await.unwrap();
        match resp {
            OperationResponse::Message(msg) => assert!(matches!(*msg, Message::OpAck(_))),
            other => panic!("expected Message response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lww_set_missing_record_rejects() {
        let coordinator = make_coordinator();
        let mut op = set_op("widgets", "alice", rmpv::Value::String("hi".into()));
        op.record = None;
        let ctx = ctx();

        let resp = coordinator.process_local_op(&ctx, op).await.unwrap();
        match resp {
            OperationResponse::Message(msg) => match *msg {
                Message::OpRejected(rej) => assert_eq!(rej.payload.op_id, "op-1"),
                other => panic!("expected OpRejected, got {other:?}"),
            },
            other => panic!("expected Message response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn counter_increment_applies() {
        let coordinator = make_coordinator();
        let mut op = set_op("counters", "views", rmpv::Value::Integer(5.into()));
        op.op_type = Some("increment".to_string());
        let ctx = ctx();

        let resp = coordinator.process_local_op(&ctx, op).await.unwrap();
        match resp {
            OperationResponse::Message(msg) => assert!(matches!(*msg, Message::OpAck(_))),
            other => panic!("expected Message response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_mixes_success_and_failure_results() {
        let coordinator = make_coordinator();
        let good = set_op("widgets", "alice", rmpv::Value::String("hi".into()));
        let mut bad = set_op("widgets", "bob", rmpv::Value::String("x".into()));
        bad.id = Some("op-2".to_string());
        bad.record = None;
        let ctx = ctx();

        let resp = coordinator
            .process_batch(&ctx, vec![good, bad])
            .await
            .unwrap();
        match resp {
            OperationResponse::Message(msg) => match *msg {
                Message::OpAck(ack) => {
                    let results = ack.payload.results.unwrap();
                    assert_eq!(results.len(), 2);
                    assert!(results[0].success);
                    assert!(!results[1].success);
                    assert_eq!(ack.payload.last_id, "op-2");
                }
                other => panic!("expected OpAck, got {other:?}"),
            },
            other => panic!("expected Message response, got {other:?}"),
        }
    }

    #[test]
    fn infer_map_type_prefers_or_shape() {
        let mut op = set_op("widgets", "alice", rmpv::Value::Nil);
        op.or_tag = Some(Some("1:0:node".to_string()));
        assert_eq!(infer_map_type(&op), MapType::Or);
    }

    #[test]
    fn infer_map_type_counter_op_types() {
        let mut op = set_op("counters", "views", rmpv::Value::Nil);
        op.op_type = Some("increment".to_string());
        assert_eq!(infer_map_type(&op), MapType::Counter);
    }

    #[test]
    fn infer_map_type_defaults_to_lww() {
        let op = set_op("widgets", "alice", rmpv::Value::Nil);
        assert_eq!(infer_map_type(&op), MapType::Lww);
    }
}
