//! Per-provider circuit breakers.
//!
//! Each provider gets one breaker, shared process-wide and guarded by a
//! mutex: `can_attempt` is a read-then-transition and must not interleave
//! with a concurrent `record_*`. State is memory-only and resets on
//! restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::providers::ProviderKind;

/// Breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Normal operation
    Closed,
    /// Failing; reject attempts until the cooldown elapses
    Open,
    /// Cooldown elapsed; probing whether the provider recovered
    HalfOpen,
}

/// Failure-tracking gate for one provider.
///
/// Invariants: `Open` implies `last_failure_at` is set and `failure_count`
/// reached the threshold; `Closed` implies `failure_count == 0`.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    timeout: Duration,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    state: BreakerState,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_threshold,
            timeout,
            failure_count: 0,
            last_failure_at: None,
            state: BreakerState::Closed,
        }
    }

    /// Record a successful call: reset the count and close the breaker.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.state = BreakerState::Closed;
    }

    /// Record a failed call. Reaching the threshold opens the breaker.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure_at = Some(Instant::now());

        if self.failure_count >= self.failure_threshold {
            self.state = BreakerState::Open;
            warn!(
                failures = self.failure_count,
                "circuit breaker opened"
            );
        }
    }

    /// Whether a call may be attempted right now.
    ///
    /// An open breaker whose cooldown has elapsed transitions to half-open
    /// as a side effect and admits one optimistic probe. (Two racing
    /// callers may both probe; that race is benign.)
    pub fn can_attempt(&mut self) -> bool {
        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let elapsed = self
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);

                if elapsed >= self.timeout {
                    self.state = BreakerState::HalfOpen;
                    info!("circuit breaker entering half-open state");
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => true,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }
}

/// Process-wide breaker table, one entry per configured provider. Built at
/// startup and passed into the orchestrator's constructor.
pub struct BreakerMap {
    breakers: HashMap<ProviderKind, Mutex<CircuitBreaker>>,
}

impl BreakerMap {
    /// One breaker per provider kind, all with the same settings.
    pub fn new(
        kinds: impl IntoIterator<Item = ProviderKind>,
        failure_threshold: u32,
        timeout: Duration,
    ) -> Self {
        let breakers = kinds
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    Mutex::new(CircuitBreaker::new(failure_threshold, timeout)),
                )
            })
            .collect();

        Self { breakers }
    }

    /// Run a closure against one provider's breaker inside its critical
    /// section. Returns `None` when the provider has no breaker entry.
    pub fn with<T>(
        &self,
        kind: ProviderKind,
        f: impl FnOnce(&mut CircuitBreaker) -> T,
    ) -> Option<T> {
        self.breakers.get(&kind).map(|cell| {
            let mut breaker = cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut breaker)
        })
    }

    /// Current state of one provider's breaker.
    pub fn state(&self, kind: ProviderKind) -> Option<BreakerState> {
        self.with(kind, |b| b.state())
    }
}
