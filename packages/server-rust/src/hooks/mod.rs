//! Sandboxed user scripts: entry processors and conflict resolvers.
//!
//! Both run untrusted `rhai` code against a single key's value. Neither gets
//! any host function beyond pure computation -- no file, network, or clock
//! access is registered on the engine -- and every invocation is bounded by
//! an operation-count budget so a script cannot hang a worker with `loop {}`.

pub mod engine;
pub mod entry_processor;
pub mod resolver;
pub mod value_bridge;

pub use engine::build_sandboxed_engine;
pub use entry_processor::{run_entry_processor, EntryProcessorError, EntryProcessorOutcome};
pub use resolver::{ResolverRegistry, ResolverRegistryError};
