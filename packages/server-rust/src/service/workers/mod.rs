//! Specialized offload workers: Merkle bucket diffing, batched CRDT merge,
//! and key-snapshot serialization.
//!
//! Each module exposes a pure function that does the actual computation,
//! plus a [`super::worker::BackgroundRunnable`] wrapper and a dispatch
//! helper that picks inline vs. pool execution via
//! [`super::offload::should_use_worker`]. Both paths call the same pure
//! function, so a caller gets byte-identical results whichever one ran --
//! the threshold only controls where the CPU work happens, never what it
//! computes.

pub mod crdt_merge;
pub mod merkle;
pub mod serialize;
