//! User-registered conflict resolvers: scripts that decide which of two
//! concurrent writes to a key wins, instead of the default last-write-wins
//! tie-break on `(millis, counter, node_id)`.
//!
//! Resolvers are per-map, sorted by descending `priority` with ties broken
//! by registration order (first registered runs first). A resolver whose
//! `key_pattern` doesn't match the key in question is skipped. If every
//! matching resolver errors or times out, or none are registered, the
//! built-in LWW rule decides.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use rhai::{Dynamic, Scope, AST};
use thiserror::Error;
use topgun_core::{Timestamp, Value};

use super::engine::{build_sandboxed_engine, is_budget_or_cancel, DEFAULT_MAX_OPERATIONS};
use super::value_bridge::{dynamic_to_value, value_to_dynamic};
use topgun_core::messages::ConflictResolver;

#[derive(Debug, Error)]
pub enum ResolverRegistryError {
    #[error("failed to compile resolver '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: Box<rhai::ParseError>,
    },
    #[error("resolver '{name}' has an invalid key_pattern '{pattern}'")]
    InvalidKeyPattern { name: String, pattern: String },
}

struct Registered {
    resolver: ConflictResolver,
    pattern: Option<Regex>,
    ast: Arc<AST>,
    seq: u64,
}

/// Which side a conflict resolution picked, or that nothing special
/// happened and the built-in rule applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Resolver(&'static str),
    BuiltinLww,
}

pub struct ResolverRegistry {
    by_map: Mutex<HashMap<String, Vec<Registered>>>,
    next_seq: AtomicU64,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_map: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Compiles and registers a resolver for `map_name`, replacing any
    /// existing resolver of the same name on that map.
    pub fn register(
        &self,
        map_name: &str,
        resolver: ConflictResolver,
    ) -> Result<(), ResolverRegistryError> {
        let pattern = match &resolver.key_pattern {
            Some(glob) => Some(glob_to_regex(glob).map_err(|_| {
                ResolverRegistryError::InvalidKeyPattern {
                    name: resolver.name.clone(),
                    pattern: glob.clone(),
                }
            })?),
            None => None,
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let engine = build_sandboxed_engine(DEFAULT_MAX_OPERATIONS, cancel);
        let ast = engine
            .compile(&resolver.code)
            .map_err(|source| ResolverRegistryError::Compile {
                name: resolver.name.clone(),
                source: Box::new(source),
            })?;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut by_map = self.by_map.lock();
        let entries = by_map.entry(map_name.to_string()).or_default();
        entries.retain(|r| r.resolver.name != resolver.name);
        entries.push(Registered {
            resolver,
            pattern,
            ast: Arc::new(ast),
            seq,
        });
        entries.sort_by(|a, b| {
            let pa = a.resolver.priority.unwrap_or(0);
            let pb = b.resolver.priority.unwrap_or(0);
            pb.cmp(&pa).then(a.seq.cmp(&b.seq))
        });
        Ok(())
    }

    /// Removes a resolver by name from a map. Returns whether one was found.
    pub fn unregister(&self, map_name: &str, name: &str) -> bool {
        let mut by_map = self.by_map.lock();
        let Some(entries) = by_map.get_mut(map_name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|r| r.resolver.name != name);
        before != entries.len()
    }

    /// Lists registered resolvers, optionally filtered to one map.
    pub fn list(&self, map_name: Option<&str>) -> Vec<(String, ConflictResolver)> {
        let by_map = self.by_map.lock();
        match map_name {
            Some(name) => by_map
                .get(name)
                .into_iter()
                .flatten()
                .map(|r| (name.to_string(), r.resolver.clone()))
                .collect(),
            None => by_map
                .iter()
                .flat_map(|(map, entries)| {
                    entries
                        .iter()
                        .map(move |r| (map.clone(), r.resolver.clone()))
                })
                .collect(),
        }
    }

    /// Resolves a conflict between a local and remote record for `key`,
    /// trying every matching resolver in priority order before falling back
    /// to last-write-wins. A resolver that errors or times out is treated as
    /// though it picked the local value, and resolution moves to the next
    /// matching resolver.
    pub fn resolve(
        &self,
        map_name: &str,
        key: &str,
        local: (&Value, &Timestamp),
        remote: (&Value, &Timestamp),
    ) -> (Value, ResolutionSource) {
        let candidates: Vec<Arc<AST>> = {
            let by_map = self.by_map.lock();
            by_map
                .get(map_name)
                .into_iter()
                .flatten()
                .filter(|r| r.pattern.as_ref().is_none_or(|p| p.is_match(key)))
                .map(|r| r.ast.clone())
                .collect()
        };

        for ast in candidates {
            let cancel = Arc::new(AtomicBool::new(false));
            let engine = build_sandboxed_engine(DEFAULT_MAX_OPERATIONS, cancel);
            let mut scope = Scope::new();
            let args = (
                key.to_string(),
                value_to_dynamic(local.0),
                value_to_dynamic(remote.0),
            );
            let outcome: Result<Dynamic, _> = engine.call_fn(&mut scope, &ast, "resolve", args);
            match outcome {
                Ok(returned) => {
                    return (dynamic_to_value(&returned), ResolutionSource::Resolver("matched"));
                }
                Err(err) if is_budget_or_cancel(&err) => continue,
                Err(_) => continue,
            }
        }

        let winner = if remote.1 > local.1 { remote.0 } else { local.0 };
        (winner.clone(), ResolutionSource::BuiltinLww)
    }
}

/// Translates a simple glob (`*` = any run of characters, `?` = any single
/// character, everything else literal) into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c if "\\.+^$()[]{}|".contains(c) => {
                pattern.push('\\');
                pattern.push(c);
            }
            c => pattern.push(c),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(millis: u64, node: &str) -> Timestamp {
        Timestamp {
            millis,
            counter: 0,
            node_id: node.to_string(),
        }
    }

    #[test]
    fn glob_matches_prefix_pattern() {
        let re = glob_to_regex("user:*").unwrap();
        assert!(re.is_match("user:alice"));
        assert!(!re.is_match("order:alice"));
    }

    #[test]
    fn falls_back_to_lww_with_no_resolvers() {
        let registry = ResolverRegistry::new();
        let local = Value::String("local".to_string());
        let remote = Value::String("remote".to_string());
        let (value, source) = registry.resolve(
            "widgets",
            "alice",
            (&local, &ts(1, "a")),
            (&remote, &ts(2, "b")),
        );
        assert_eq!(value, remote);
        assert_eq!(source, ResolutionSource::BuiltinLww);
    }

    #[test]
    fn registered_resolver_overrides_lww() {
        let registry = ResolverRegistry::new();
        registry
            .register(
                "widgets",
                ConflictResolver {
                    name: "prefer-local".to_string(),
                    code: "fn resolve(key, local, remote) { local }".to_string(),
                    priority: Some(10),
                    key_pattern: None,
                },
            )
            .unwrap();

        let local = Value::String("local".to_string());
        let remote = Value::String("remote".to_string());
        let (value, source) = registry.resolve(
            "widgets",
            "alice",
            (&local, &ts(1, "a")),
            (&remote, &ts(2, "b")),
        );
        assert_eq!(value, local);
        assert!(matches!(source, ResolutionSource::Resolver(_)));
    }

    #[test]
    fn key_pattern_restricts_applicability() {
        let registry = ResolverRegistry::new();
        registry
            .register(
                "widgets",
                ConflictResolver {
                    name: "prefer-local".to_string(),
                    code: "fn resolve(key, local, remote) { local }".to_string(),
                    priority: Some(10),
                    key_pattern: Some("user:*".to_string()),
                },
            )
            .unwrap();

        let local = Value::String("local".to_string());
        let remote = Value::String("remote".to_string());
        let (value, source) = registry.resolve(
            "widgets",
            "order:1",
            (&local, &ts(1, "a")),
            (&remote, &ts(2, "b")),
        );
        assert_eq!(value, remote);
        assert_eq!(source, ResolutionSource::BuiltinLww);
    }

    #[test]
    fn timed_out_resolver_falls_through() {
        let registry = ResolverRegistry::new();
        registry
            .register(
                "widgets",
                ConflictResolver {
                    name: "loops-forever".to_string(),
                    code: "fn resolve(key, local, remote) { let x = 0; loop { x += 1; } }"
                        .to_string(),
                    priority: Some(20),
                    key_pattern: None,
                },
            )
            .unwrap();

        let local = Value::String("local".to_string());
        let remote = Value::String("remote".to_string());
        let (value, source) = registry.resolve(
            "widgets",
            "alice",
            (&local, &ts(1, "a")),
            (&remote, &ts(2, "b")),
        );
        assert_eq!(value, remote);
        assert_eq!(source, ResolutionSource::BuiltinLww);
    }

    #[test]
    fn priority_order_with_tiebreak_on_registration_order() {
        let registry = ResolverRegistry::new();
        registry
            .register(
                "widgets",
                ConflictResolver {
                    name: "first".to_string(),
                    code: "fn resolve(key, local, remote) { \"first\" }".to_string(),
                    priority: Some(5),
                    key_pattern: None,
                },
            )
            .unwrap();
        registry
            .register(
                "widgets",
                ConflictResolver {
                    name: "second".to_string(),
                    code: "fn resolve(key, local, remote) { \"second\" }".to_string(),
                    priority: Some(5),
                    key_pattern: None,
                },
            )
            .unwrap();

        let local = Value::String("local".to_string());
        let remote = Value::String("remote".to_string());
        let (value, _) = registry.resolve(
            "widgets",
            "alice",
            (&local, &ts(1, "a")),
            (&remote, &ts(2, "b")),
        );
        assert_eq!(value, Value::String("first".to_string()));
    }

    #[test]
    fn unregister_removes_resolver() {
        let registry = ResolverRegistry::new();
        registry
            .register(
                "widgets",
                ConflictResolver {
                    name: "prefer-local".to_string(),
                    code: "fn resolve(key, local, remote) { local }".to_string(),
                    priority: Some(10),
                    key_pattern: None,
                },
            )
            .unwrap();
        assert!(registry.unregister("widgets", "prefer-local"));
        assert!(!registry.unregister("widgets", "prefer-local"));
        assert_eq!(registry.list(Some("widgets")).len(), 0);
    }
}
