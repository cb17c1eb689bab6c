//! Executes user-supplied entry processors: a `rhai` script that reads a
//! key's current value and optional arguments, and returns the new value to
//! store plus an optional return value for the caller.
//!
//! A processor script must define a `process(key, value, args)` function.
//! `value` is the key's current value (`()` if absent), `args` is whatever
//! the client attached to the request (`()` if none). The function's return
//! value becomes the new stored value; a script that wants to return a
//! value to the caller distinct from what it stores can instead return a
//! map with `new_value`/`result` entries, e.g. `#{new_value: v, result: r}`.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Dynamic, Scope, AST};
use thiserror::Error;
use topgun_core::messages::EntryProcessor;
use topgun_core::Value;

use super::engine::{build_sandboxed_engine, is_budget_or_cancel, DEFAULT_MAX_OPERATIONS};
use super::value_bridge::{dynamic_to_value, value_to_dynamic};

#[derive(Debug, Error)]
pub enum EntryProcessorError {
    #[error("failed to compile entry processor '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: Box<rhai::ParseError>,
    },
    #[error("entry processor '{name}' has no 'process' function")]
    MissingEntryPoint { name: String },
    #[error("entry processor '{name}' exceeded its operation budget")]
    BudgetExceeded { name: String },
    #[error("entry processor '{name}' failed: {message}")]
    Runtime { name: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryProcessorOutcome {
    pub new_value: Option<Value>,
    pub result: Option<Value>,
}

/// Caches compiled `AST`s by processor source so repeated calls (e.g. a
/// batch of keys run through the same processor) don't re-parse the script
/// each time.
#[derive(Default)]
pub struct EntryProcessorCache {
    compiled: Mutex<HashMap<String, Arc<AST>>>,
}

impl EntryProcessorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, processor: &EntryProcessor) -> Result<Arc<AST>, EntryProcessorError> {
        if let Some(ast) = self.compiled.lock().get(&processor.code).cloned() {
            return Ok(ast);
        }
        let cancel = Arc::new(AtomicBool::new(false));
        let engine = build_sandboxed_engine(DEFAULT_MAX_OPERATIONS, cancel);
        let ast = engine
            .compile(&processor.code)
            .map_err(|source| EntryProcessorError::Compile {
                name: processor.name.clone(),
                source: Box::new(source),
            })?;
        let ast = Arc::new(ast);
        self.compiled
            .lock()
            .insert(processor.code.clone(), ast.clone());
        Ok(ast)
    }
}

/// Runs `processor.process(key, value, args)` against the current value of
/// one key, returning the new value to store and the value to return to the
/// caller.
pub fn run_entry_processor(
    cache: &EntryProcessorCache,
    key: &str,
    current: Option<&Value>,
    processor: &EntryProcessor,
) -> Result<EntryProcessorOutcome, EntryProcessorError> {
    let ast = cache.compile(processor)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let engine = build_sandboxed_engine(DEFAULT_MAX_OPERATIONS, cancel);

    let value_dynamic = current.map_or(Dynamic::UNIT, value_to_dynamic);
    let args_dynamic = processor
        .args
        .clone()
        .map(Value::from_rmpv)
        .map(|v| value_to_dynamic(&v))
        .unwrap_or(Dynamic::UNIT);

    let mut scope = Scope::new();
    let outcome: Result<Dynamic, _> = engine.call_fn(
        &mut scope,
        &ast,
        "process",
        (key.to_string(), value_dynamic, args_dynamic),
    );

    match outcome {
        Ok(returned) => Ok(split_outcome(&returned)),
        Err(err) if is_budget_or_cancel(&err) => Err(EntryProcessorError::BudgetExceeded {
            name: processor.name.clone(),
        }),
        Err(err) if matches!(*err, rhai::EvalAltResult::ErrorFunctionNotFound(..)) => {
            Err(EntryProcessorError::MissingEntryPoint {
                name: processor.name.clone(),
            })
        }
        Err(err) => Err(EntryProcessorError::Runtime {
            name: processor.name.clone(),
            message: err.to_string(),
        }),
    }
}

fn split_outcome(returned: &Dynamic) -> EntryProcessorOutcome {
    if let Some(map) = returned.clone().try_cast::<rhai::Map>() {
        if map.contains_key("new_value") || map.contains_key("result") {
            let new_value = map.get("new_value").map(dynamic_to_value);
            let result = map.get("result").map(dynamic_to_value);
            return EntryProcessorOutcome { new_value, result };
        }
    }
    let value = dynamic_to_value(returned);
    EntryProcessorOutcome {
        new_value: Some(value.clone()),
        result: Some(value),
    }
}
