//! Deterministic simulation harness: a virtual clock, a seeded RNG, a
//! virtual network, and a scenario runner with named invariants.
//!
//! Gated behind the `simulation` Cargo feature, same as the `madsim`
//! dependency it sits alongside -- everything in this module is plain
//! synchronous Rust (the scenario runner drives one tick at a time, with no
//! concurrency to make deterministic), so it doesn't lean on `madsim`'s
//! deterministic async runtime; it exists to let a scenario replace the
//! three real sources of nondeterminism (wall-clock time, RNG draws, and
//! network timing) with ones a test can pin down.

pub mod clock;
pub mod network;
pub mod rng;
pub mod scenario;

pub use clock::VirtualClock;
pub use network::{DeliveredMessage, NetworkConfig, SendOutcome, VirtualNetwork};
pub use rng::SeededRng;
pub use scenario::{InvariantChecker, InvariantError, InvariantReport, ScenarioConfig, ScenarioResult, ScenarioRunner};
