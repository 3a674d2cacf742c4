//! Circuit breaker for processor protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: processor assumed down, requests fail fast
//! - Half-Open: a single probe tests whether the processor recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: next call after reset_timeout (evaluated lazily)
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (opened_at = now)
//! ```
//!
//! # Design Decisions
//! - One breaker per endpoint group, not global
//! - Single probe in Half-Open; the probe slot is a token held by a
//!   `BreakerPermit`, released on drop if the probe never reports back

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

/// Logical operation groups, each with its own breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointGroup {
    Transactions,
    PaymentMethods,
    /// Optional PSE bank list; kept apart so its outages never trip discovery.
    PseBanks,
}

impl EndpointGroup {
    pub const ALL: [EndpointGroup; 3] = [
        EndpointGroup::Transactions,
        EndpointGroup::PaymentMethods,
        EndpointGroup::PseBanks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointGroup::Transactions => "transactions",
            EndpointGroup::PaymentMethods => "payment_methods",
            EndpointGroup::PseBanks => "pse_banks",
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Present only while Open.
    pub opened_at: Option<Instant>,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Rejected,
    Admitted,
    Probe,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name,
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Admission {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Admission::Admitted,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(self.reset_timeout);
                if elapsed < self.reset_timeout {
                    return Admission::Rejected;
                }
                inner.state = CircuitState::HalfOpen;
                inner.opened_at = None;
                inner.probe_in_flight = true;
                drop(inner);
                self.on_transition(CircuitState::Open, CircuitState::HalfOpen);
                Admission::Probe
            }
            CircuitState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                Admission::Probe
            }
            CircuitState::HalfOpen => Admission::Rejected,
        }
    }

    /// Whether a call may proceed. In Half-Open, `true` hands the caller the
    /// single probe slot; it must report `record_success` or `record_failure`.
    pub fn allow(&self) -> bool {
        self.admit() != Admission::Rejected
    }

    /// Like `allow`, but the probe slot is released automatically if the
    /// permit is dropped without reporting an outcome.
    pub fn try_acquire(self: &Arc<Self>) -> Option<BreakerPermit> {
        match self.admit() {
            Admission::Rejected => None,
            admission => Some(BreakerPermit {
                breaker: self.clone(),
                probe: admission == Admission::Probe,
                resolved: AtomicBool::new(false),
            }),
        }
    }

    /// Report a success. Outside a permit the caller is taken to hold the
    /// probe slot, as handed out by `allow`.
    pub fn record_success(&self) {
        self.resolve_success(true);
    }

    pub fn record_failure(&self) {
        self.resolve_failure(true);
    }

    fn resolve_success(&self, probe: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen if probe => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.probe_in_flight = false;
                drop(inner);
                self.on_transition(CircuitState::HalfOpen, CircuitState::Closed);
            }
            // Late result from a call admitted before the breaker opened;
            // only the probe decides Half-Open.
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    fn resolve_failure(&self, probe: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    let failures = inner.consecutive_failures;
                    drop(inner);
                    tracing::warn!(breaker = self.name, failures, "Failure threshold reached");
                    self.on_transition(CircuitState::Closed, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen if probe => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
                drop(inner);
                self.on_transition(CircuitState::HalfOpen, CircuitState::Open);
            }
            CircuitState::HalfOpen => {}
            CircuitState::Open => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
            }
        }
    }

    /// Give back an unresolved probe slot.
    fn release_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen && inner.probe_in_flight {
            inner.probe_in_flight = false;
            tracing::debug!(breaker = self.name, "Half-open probe abandoned, slot released");
        }
    }

    /// True while Open; a retrying call should stop rather than pile on.
    pub fn is_open(&self) -> bool {
        self.lock().state == CircuitState::Open
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitBreakerState {
        let inner = self.lock();
        CircuitBreakerState {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
        }
    }

    fn on_transition(&self, from: CircuitState, to: CircuitState) {
        tracing::info!(
            breaker = self.name,
            from = from.as_str(),
            to = to.as_str(),
            "Circuit breaker state change"
        );
        metrics::record_circuit_state(self.name, to);
    }
}

/// Admission ticket for one logical call.
#[derive(Debug)]
pub struct BreakerPermit {
    breaker: Arc<CircuitBreaker>,
    probe: bool,
    resolved: AtomicBool,
}

impl BreakerPermit {
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Whether the breaker would still admit this permit's next attempt:
    /// Closed for an ordinary permit, Half-Open for the probe.
    pub fn is_current(&self) -> bool {
        match self.breaker.state() {
            CircuitState::Closed => !self.probe,
            CircuitState::HalfOpen => self.probe,
            CircuitState::Open => false,
        }
    }

    pub fn record_success(&self) {
        self.resolved.store(true, Ordering::Release);
        self.breaker.resolve_success(self.probe);
    }

    pub fn record_failure(&self) {
        self.resolved.store(true, Ordering::Release);
        self.breaker.resolve_failure(self.probe);
    }
}

impl Drop for BreakerPermit {
    fn drop(&mut self) {
        if self.probe && !self.resolved.load(Ordering::Acquire) {
            self.breaker.release_probe();
        }
    }
}

/// Breakers keyed by endpoint group.
#[derive(Debug)]
pub struct CircuitBreakers {
    config: CircuitBreakerConfig,
    breakers: DashMap<EndpointGroup, Arc<CircuitBreaker>>,
}

impl CircuitBreakers {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let breakers = DashMap::new();
        for group in EndpointGroup::ALL {
            breakers.insert(group, Arc::new(Self::build(&config, group)));
            metrics::record_circuit_state(group.as_str(), CircuitState::Closed);
        }
        Self { config, breakers }
    }

    fn build(config: &CircuitBreakerConfig, group: EndpointGroup) -> CircuitBreaker {
        CircuitBreaker::new(
            group.as_str(),
            config.failure_threshold,
            Duration::from_millis(config.reset_timeout_ms),
        )
    }

    pub fn get(&self, group: EndpointGroup) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(group)
            .or_insert_with(|| Arc::new(Self::build(&self.config, group)))
            .value()
            .clone()
    }

    /// Snapshots of every breaker, ordered by group.
    pub fn snapshots(&self) -> Vec<(EndpointGroup, CircuitBreakerState)> {
        let mut all: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (*entry.key(), entry.value().snapshot()))
            .collect();
        all.sort_by_key(|(group, _)| *group);
        all
    }
}
