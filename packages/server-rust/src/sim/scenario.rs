//! Named invariants checked against scenario state, and a runner that drives
//! `setup -> (step * N) -> final` against a [`super::clock::VirtualClock`].

use std::collections::HashSet;

use thiserror::Error;

use super::clock::VirtualClock;

#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("an invariant named '{0}' is already registered")]
    DuplicateName(String),
}

/// The outcome of running every registered invariant against one state
/// snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvariantReport {
    pub passed: bool,
    pub failures: Vec<String>,
}

/// A named set of predicates over scenario state `S`. Two predicates cannot
/// share a name.
pub struct InvariantChecker<S> {
    predicates: Vec<(String, Box<dyn Fn(&S) -> bool + Send + Sync>)>,
}

impl<S> InvariantChecker<S> {
    #[must_use]
    pub fn new() -> Self {
        Self { predicates: Vec::new() }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> Result<(), InvariantError> {
        let name = name.into();
        if self.predicates.iter().any(|(existing, _)| existing == &name) {
            return Err(InvariantError::DuplicateName(name));
        }
        self.predicates.push((name, Box::new(predicate)));
        Ok(())
    }

    /// Runs every registered predicate against `state`, collecting the
    /// names of those that returned `false`.
    #[must_use]
    pub fn verify(&self, state: &S) -> InvariantReport {
        let failures: Vec<String> = self
            .predicates
            .iter()
            .filter(|(_, predicate)| !predicate(state))
            .map(|(name, _)| name.clone())
            .collect();
        InvariantReport { passed: failures.is_empty(), failures }
    }
}

impl<S> Default for InvariantChecker<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for one scenario run. Same config plus same seed must
/// produce an identical [`ScenarioResult`].
#[derive(Debug, Clone, Copy)]
pub struct ScenarioConfig {
    pub seed: u32,
    pub ticks: u32,
    pub tick_interval_ms: u64,
}

/// Result of a full scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub seed: u32,
    pub ticks: u32,
    pub passed: bool,
    pub invariant_failures: Vec<String>,
}

/// Drives a scenario: `setup` builds the initial state, `step` is called
/// once per tick before the clock advances, and invariants are checked
/// after every tick plus once more at the end.
pub struct ScenarioRunner;

impl ScenarioRunner {
    pub fn run<S>(
        config: ScenarioConfig,
        clock: &VirtualClock,
        checker: &InvariantChecker<S>,
        mut setup: impl FnMut(&VirtualClock) -> S,
        mut step: impl FnMut(&mut S, &VirtualClock, u32),
    ) -> ScenarioResult {
        clock.reset();
        let mut state = setup(clock);

        let mut seen = HashSet::new();
        let mut ordered_failures = Vec::new();
        let mut record = |report: InvariantReport, ordered_failures: &mut Vec<String>| {
            for failure in report.failures {
                if seen.insert(failure.clone()) {
                    ordered_failures.push(failure);
                }
            }
        };

        for tick in 0..config.ticks {
            step(&mut state, clock, tick);
            clock.advance(config.tick_interval_ms);
            record(checker.verify(&state), &mut ordered_failures);
        }
        record(checker.verify(&state), &mut ordered_failures);

        ScenarioResult {
            seed: config.seed,
            ticks: config.ticks,
            passed: ordered_failures.is_empty(),
            invariant_failures: ordered_failures,
        }
    }
}
