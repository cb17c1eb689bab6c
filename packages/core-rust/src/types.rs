use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::hlc::{LWWRecord, ORMapRecord, Timestamp, HLC};
use crate::lww_map::LWWMap;
use crate::or_map::ORMap;
use crate::pn_counter::PNCounter;

/// Opaque serialized CRDT record stored in persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageValue {
    /// Raw bytes of the serialized CRDT record.
    pub data: Vec<u8>,
}

/// Generic runtime value type for CRDT map entries.
///
/// Deliberately untyped (no schema migrations, per design): a record's shape
/// is whatever the writer sent. Mirrors the variants `rmpv::Value`/MessagePack
/// can carry, collapsed to the subset this engine actually stores and compares
/// (`Map` uses `BTreeMap` rather than an ordered association list, since CRDT
/// merges never need to preserve client-supplied key order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Converts a decoded `rmpv::Value` into this crate's `Value`.
    ///
    /// `rmpv::Value::Map` is an association list (preserves wire order and
    /// permits duplicate/non-string keys); non-string keys are dropped since
    /// every wire schema in this codebase uses string-keyed maps.
    #[must_use]
    pub fn from_rmpv(v: rmpv::Value) -> Self {
        match v {
            rmpv::Value::Nil => Value::Null,
            rmpv::Value::Boolean(b) => Value::Bool(b),
            rmpv::Value::Integer(i) => i.as_i64().map_or(Value::Null, Value::Int),
            rmpv::Value::F32(f) => Value::Float(f64::from(f)),
            rmpv::Value::F64(f) => Value::Float(f),
            rmpv::Value::String(s) => Value::String(s.into_str().unwrap_or_default()),
            rmpv::Value::Binary(b) => Value::Bytes(b),
            rmpv::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from_rmpv).collect()),
            rmpv::Value::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .filter_map(|(k, v)| k.as_str().map(|s| (s.to_string(), Value::from_rmpv(v))))
                    .collect(),
            ),
            rmpv::Value::Ext(_, _) => Value::Null,
        }
    }

    /// Converts this `Value` into an `rmpv::Value` for wire transport.
    #[must_use]
    pub fn to_rmpv(&self) -> rmpv::Value {
        match self {
            Value::Null => rmpv::Value::Nil,
            Value::Bool(b) => rmpv::Value::Boolean(*b),
            Value::Int(i) => rmpv::Value::Integer((*i).into()),
            Value::Float(f) => rmpv::Value::F64(*f),
            Value::String(s) => rmpv::Value::String(s.clone().into()),
            Value::Bytes(b) => rmpv::Value::Binary(b.clone()),
            Value::Array(arr) => rmpv::Value::Array(arr.iter().map(Value::to_rmpv).collect()),
            Value::Map(m) => rmpv::Value::Map(
                m.iter()
                    .map(|(k, v)| (rmpv::Value::String(k.clone().into()), v.to_rmpv()))
                    .collect(),
            ),
        }
    }
}

/// Discriminant for CRDT map types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapType {
    /// Last-Write-Wins Map: conflict resolution by highest timestamp.
    Lww,
    /// Observed-Remove Map: supports concurrent additions with unique tags.
    Or,
    /// PN-Counter: grow/shrink-only counter with per-node P/N vectors.
    Counter,
}

/// The concrete CRDT backing a [`CrdtMap`].
///
/// Kept as a private enum so callers only ever see the uniform [`CrdtMap`]
/// surface; the capability-polymorphism lives entirely inside this module.
enum CrdtMapKind {
    Lww(LWWMap<Value>),
    Or(ORMap<Value>),
    Counter(PNCounter),
}

/// A single key's merge outcome, as seen from outside the CRDT.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The write was applied and changed local state.
    Applied,
    /// The write was accepted but did not change local state (e.g. a stale
    /// remote record, or an idempotent re-application).
    NoChange,
    /// The write was rejected (e.g. a value failed a registered resolver).
    Rejected,
}

/// Opaque snapshot of one key's current value, for the client-facing wire
/// format: an LWW key has at most one value, an OR key zero-or-many, and a
/// counter's "value" is its running total.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySnapshot {
    Single(Option<Value>),
    Multi(Vec<Value>),
    Counter(i64),
}

/// Unified CRDT map abstraction addressing the capability-polymorphism design
/// note: callers (the coordinator, sync protocol, workers) interact with any
/// of LWW-Map, OR-Map, or PN-Counter through one type, dispatching internally
/// on which concrete CRDT backs a given map name. This avoids a generic
/// `CrdtMap<T>` per map type leaking into every call site that just wants to
/// apply a local write, merge a remote event, or read a digest.
///
/// Mutating methods take `&self` (not `&mut self`) via an internal mutex:
/// `CrdtMap` is shared as `Arc<CrdtMap>` across the coordinator's per-
/// partition tasks and the worker pool, which need concurrent access to the
/// same map.
pub struct CrdtMap {
    name: String,
    kind: Mutex<CrdtMapKind>,
}

impl CrdtMap {
    /// Creates a new LWW-backed map.
    #[must_use]
    pub fn new_lww(name: impl Into<String>, hlc: HLC) -> Self {
        Self {
            name: name.into(),
            kind: Mutex::new(CrdtMapKind::Lww(LWWMap::new(hlc))),
        }
    }

    /// Creates a new OR-backed map.
    #[must_use]
    pub fn new_or(name: impl Into<String>, hlc: HLC) -> Self {
        Self {
            name: name.into(),
            kind: Mutex::new(CrdtMapKind::Or(ORMap::new(hlc))),
        }
    }

    /// Creates a new PN-Counter-backed map.
    #[must_use]
    pub fn new_counter(name: impl Into<String>, hlc: HLC) -> Self {
        Self {
            name: name.into(),
            kind: Mutex::new(CrdtMapKind::Counter(PNCounter::new(hlc))),
        }
    }

    /// Name this map is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which CRDT strategy backs this map.
    #[must_use]
    pub fn map_type(&self) -> MapType {
        match &*self.kind.lock() {
            CrdtMapKind::Lww(_) => MapType::Lww,
            CrdtMapKind::Or(_) => MapType::Or,
            CrdtMapKind::Counter(_) => MapType::Counter,
        }
    }

    /// Applies a local write. `or_tag`, when `Some`, removes that specific
    /// OR-Map tag instead of adding a value (mirrors `ClientOp.orTag`).
    ///
    /// # Panics
    ///
    /// Panics if called against a map whose `map_type()` doesn't support the
    /// given write shape (a `Counter` map with a non-`Int` delta, or an LWW
    /// write against an OR-backed map) -- these are programmer errors at the
    /// coordinator layer, which is expected to route by `map_type()` first.
    pub fn apply_local_set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> KeySnapshot {
        match &mut *self.kind.lock() {
            CrdtMapKind::Lww(map) => {
                let record = map.set(key, value, ttl_ms);
                KeySnapshot::Single(record.value)
            }
            CrdtMapKind::Or(map) => {
                map.add(key, value, ttl_ms);
                KeySnapshot::Multi(map.get(key).into_iter().cloned().collect())
            }
            CrdtMapKind::Counter(_) => {
                panic!("apply_local_set called on a Counter-backed CrdtMap");
            }
        }
    }

    /// Removes a key (LWW tombstone) or a specific value (OR-Map, by deep
    /// equality -- see the Open Question decision in `DESIGN.md`).
    pub fn apply_local_remove(&self, key: &str, or_value: Option<&Value>) -> KeySnapshot {
        match &mut *self.kind.lock() {
            CrdtMapKind::Lww(map) => KeySnapshot::Single(map.remove(key).value),
            CrdtMapKind::Or(map) => {
                if let Some(value) = or_value {
                    map.remove(key, value);
                }
                KeySnapshot::Multi(map.get(key).into_iter().cloned().collect())
            }
            CrdtMapKind::Counter(_) => {
                panic!("apply_local_remove called on a Counter-backed CrdtMap");
            }
        }
    }

    /// Applies a counter delta (positive for increment, negative for
    /// decrement) and returns the new total.
    pub fn apply_local_delta(&self, delta: i64) -> i64 {
        match &mut *self.kind.lock() {
            CrdtMapKind::Counter(counter) => counter.add_and_get(delta),
            _ => panic!("apply_local_delta called on a non-Counter CrdtMap"),
        }
    }

    /// Merges a remote LWW record for `key`.
    pub fn apply_remote_lww(&self, key: &str, record: LWWRecord<Value>) -> ApplyOutcome {
        match &mut *self.kind.lock() {
            CrdtMapKind::Lww(map) => {
                if map.merge(key, record) {
                    ApplyOutcome::Applied
                } else {
                    ApplyOutcome::NoChange
                }
            }
            _ => ApplyOutcome::Rejected,
        }
    }

    /// Applies a remote OR-Map record for `key`.
    pub fn apply_remote_or(&self, key: &str, record: ORMapRecord<Value>) -> ApplyOutcome {
        match &mut *self.kind.lock() {
            CrdtMapKind::Or(map) => {
                if map.apply(key, record) {
                    ApplyOutcome::Applied
                } else {
                    ApplyOutcome::NoChange
                }
            }
            _ => ApplyOutcome::Rejected,
        }
    }

    /// Applies a remote OR-Map tombstone.
    pub fn apply_remote_tombstone(&self, tag: &str) {
        if let CrdtMapKind::Or(map) = &mut *self.kind.lock() {
            map.apply_tombstone(tag);
        }
    }

    /// Merges a remote counter snapshot (per-node P/N vectors).
    pub fn apply_remote_counter(&self, other: &PNCounter) -> ApplyOutcome {
        match &mut *self.kind.lock() {
            CrdtMapKind::Counter(counter) => {
                let before = counter.value();
                counter.merge(other);
                if counter.value() == before {
                    ApplyOutcome::NoChange
                } else {
                    ApplyOutcome::Applied
                }
            }
            _ => ApplyOutcome::Rejected,
        }
    }

    /// Reads the current value(s) for a key without mutating state.
    #[must_use]
    pub fn snapshot_key(&self, key: &str) -> KeySnapshot {
        match &*self.kind.lock() {
            CrdtMapKind::Lww(map) => KeySnapshot::Single(map.get(key).cloned()),
            CrdtMapKind::Or(map) => KeySnapshot::Multi(map.get(key).into_iter().cloned().collect()),
            CrdtMapKind::Counter(counter) => KeySnapshot::Counter(counter.value()),
        }
    }

    /// Returns the map's current Merkle root hash, for anti-entropy
    /// comparison between replicas.
    #[must_use]
    pub fn digest_root_hash(&self) -> u32 {
        match &*self.kind.lock() {
            CrdtMapKind::Lww(map) => map.merkle_tree().get_root_hash(),
            CrdtMapKind::Or(map) => map.merkle_tree().get_root_hash(),
            CrdtMapKind::Counter(counter) => counter.merkle_tree().get_root_hash(),
        }
    }

    /// Prunes LWW tombstones older than `threshold` (no-op for OR-Map and
    /// Counter, whose tombstone/merge lifecycles are handled elsewhere).
    pub fn prune_tombstones(&self, threshold: &Timestamp) -> Vec<String> {
        match &mut *self.kind.lock() {
            CrdtMapKind::Lww(map) => map.prune(threshold),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Debug for CrdtMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrdtMap")
            .field("name", &self.name)
            .field("map_type", &self.map_type())
            .finish()
    }
}

/// A named, shared handle to a [`CrdtMap`], as held by a `MapProvider`.
pub type SharedCrdtMap = Arc<CrdtMap>;

/// Authentication principal for multi-tenancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier for the authenticated entity.
    pub id: String,
    /// Roles assigned to this principal for authorization checks.
    pub roles: Vec<String>,
}
