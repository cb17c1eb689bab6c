//! `TopGun` Core -- CRDTs, Hybrid Logical Clock, `MerkleTree`, and message schemas.
//!
//! This crate provides the foundation layer for the `TopGun` data grid:
//!
//! - **HLC** ([`hlc`]): Hybrid Logical Clock for distributed causality tracking
//! - **Hash** ([`hash`]): FNV-1a hash utilities for `MerkleTree` bucket routing
//! - **`MerkleTree`** ([`merkle`]): Prefix trie for efficient delta synchronization
//! - **`LWWMap`** ([`lww_map`]): Last-Write-Wins Map CRDT
//! - **`ORMap`** ([`or_map`]): Observed-Remove Map CRDT
//! - **`PNCounter`** ([`pn_counter`]): grow/shrink distributed counter CRDT
//! - **Types** ([`types`]): `Value` enum, `StorageValue`, `MapType`, `CrdtMap`, `Principal`
//! - **Traits** ([`traits`]): `Processor`, `QueryNotifier` for DAG execution and live queries
//! - **Schema** ([`schema`]): `MapSchema`, `SyncShape`, `Predicate` for validation and shapes
//! - **Context** ([`context`]): `RequestContext` for per-request identity and tracing
//! - **Error** ([`error`]): `EngineError`, the shared failure taxonomy below the operation layer
//! - **Messages** ([`messages`]): wire-compatible message schemas, unified under `Message`
//! - **Partition** ([`partition`]): 271-way key hashing and partition-to-owner lookup

pub mod context;
pub mod error;
pub mod hash;
pub mod hlc;
pub mod lww_map;
pub mod merkle;
pub mod messages;
pub mod or_map;
pub mod partition;
pub mod pn_counter;
pub mod schema;
pub mod traits;
pub mod types;

// Context
pub use context::RequestContext;

// Schema
pub use schema::{FieldDef, MapSchema, Predicate, SyncShape, ValidationResult};

// Traits
pub use traits::{Inbox, Processor, ProcessorContext, QueryNotifier};

// Types
pub use types::{ApplyOutcome, CrdtMap, KeySnapshot, MapType, Principal, SharedCrdtMap, StorageValue, Value};

// Commonly-referenced message payload, re-exported at the crate root since callers
// construct it as often as the CRDT types themselves.
pub use messages::ClientOp;

// CRDTs
pub use lww_map::LWWMap;
pub use or_map::ORMap;
pub use pn_counter::{PNCounter, PNCounterSnapshot};

// Partition
pub use partition::{get_relevant_partitions, hash_to_partition, PartitionLookup, PartitionTable, PARTITION_COUNT};

// HLC
pub use hlc::{ClockSource, SystemClock, Timestamp, HLC, LWWRecord, MergeKeyResult, ORMapRecord};

// Hash
pub use hash::{combine_hashes, fnv1a_hash};

// Errors
pub use error::EngineError;

// Merkle
pub use merkle::{MerkleNode, MerkleTree, ORMapMerkleTree};
