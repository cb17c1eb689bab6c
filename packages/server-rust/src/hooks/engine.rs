//! Builds the sandboxed `rhai::Engine` shared by entry processors and
//! conflict resolvers.
//!
//! No I/O, no `eval`, no modules: the default `rhai::Engine` already omits
//! file/network access unless a caller registers it, so sandboxing here is
//! mostly about bounding CPU. `set_max_operations` caps the number of
//! bytecode-level operations a single script may execute; `on_progress`
//! gives a second, cooperative cutoff so a script that's merely slow (not
//! yet over budget) can still be aborted from outside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rhai::{Engine, EvalAltResult};

/// Default operation budget for a single script invocation. Chosen to be
/// generous for real entry-processor/resolver logic (loops over small
/// arrays, string formatting) while still bounding runaway scripts to
/// single-digit milliseconds of host CPU.
pub const DEFAULT_MAX_OPERATIONS: u64 = 200_000;

/// Builds an engine with no ambient I/O and a fixed operation budget.
///
/// `cancel` is checked on every progress tick so a caller can abort a
/// long-running script from another task (used to implement resolver
/// timeouts without killing the whole worker thread).
pub fn build_sandboxed_engine(max_operations: u64, cancel: Arc<AtomicBool>) -> Engine {
    // `Engine::new()` registers only the standard computational package --
    // no file, network, or process functions are ever registered on it, so
    // nothing here needs to be removed, only bounded.
    let mut engine = Engine::new();
    engine.set_max_operations(max_operations);
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(64 * 1024);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);
    engine.on_progress(move |_ops| {
        if cancel.load(Ordering::Relaxed) {
            Some(rhai::Dynamic::from("cancelled"))
        } else {
            None
        }
    });
    engine
}

/// True if evaluation stopped because of the operation budget or an
/// external cancellation (the `on_progress` hook), rather than a script
/// error.
pub fn is_budget_or_cancel(err: &EvalAltResult) -> bool {
    matches!(
        err,
        EvalAltResult::ErrorTooManyOperations(_)
            | EvalAltResult::ErrorTerminated(_, _)
    )
}
