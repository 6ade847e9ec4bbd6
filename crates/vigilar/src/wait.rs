//! Wait mechanisms for UI synchronization.
//!
//! Every suspension point in the suite is bounded. Ordinary timeouts are
//! converted into a negative [`WaitOutcome`] here so call sites branch on
//! `satisfied` instead of catching faults; only the orchestration layer
//! decides whether an unsatisfied wait is a scenario failure.
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: automatic detection of ready state
//! - **Poka-Yoke**: typed target states prevent invalid waits
//! - **Muda**: one retry combinator replaces per-call-site sleep loops

use crate::page::{ElementSnapshot, PageModel};
use crate::result::VigilarResult;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// TARGET STATE
// =============================================================================

/// Element states a bounded wait can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetState {
    /// Element is rendered
    Visible,
    /// Element is absent or not rendered
    Hidden,
    /// Element exists in the document, rendered or not
    Attached,
    /// Element is rendered and accepts interaction
    Enabled,
}

impl TargetState {
    /// Evaluate the predicate against an observation.
    ///
    /// `None` means the element does not exist yet, which satisfies only
    /// `Hidden`.
    #[must_use]
    pub fn is_met(&self, observed: Option<&ElementSnapshot>) -> bool {
        match self {
            Self::Visible => observed.is_some_and(|s| s.visible),
            Self::Hidden => observed.map_or(true, |s| !s.visible),
            Self::Attached => observed.is_some(),
            Self::Enabled => observed.is_some_and(|s| s.visible && s.enabled),
        }
    }

    /// State name used in traces
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Attached => "attached",
            Self::Enabled => "enabled",
        }
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT OUTCOME
// =============================================================================

/// The uniform result of every bounded wait
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaitOutcome {
    /// Whether the target state was reached within the bound
    pub satisfied: bool,
    /// Time spent waiting
    pub elapsed: Duration,
}

impl WaitOutcome {
    /// Create a satisfied outcome
    #[must_use]
    pub const fn satisfied(elapsed: Duration) -> Self {
        Self {
            satisfied: true,
            elapsed,
        }
    }

    /// Create a timed-out outcome
    #[must_use]
    pub const fn timed_out(elapsed: Duration) -> Self {
        Self {
            satisfied: false,
            elapsed,
        }
    }
}

// =============================================================================
// ELEMENT-STATE WAITER
// =============================================================================

/// Wait for an element to reach a target state within a bound.
///
/// Polls the query root at the configured interval. Never fails on timeout;
/// the element not existing yet simply leaves the predicate unmet. The
/// predicate is evaluated at least once even with a zero timeout.
#[must_use]
pub fn await_state(
    root: &PageModel,
    selector: &Selector,
    state: TargetState,
    options: &WaitOptions,
) -> WaitOutcome {
    let start = Instant::now();
    loop {
        let observed = root.query(selector);
        if state.is_met(observed.as_ref()) {
            return WaitOutcome::satisfied(start.elapsed());
        }
        if start.elapsed() >= options.timeout() {
            debug!(
                selector = %selector,
                state = %state,
                timeout_ms = options.timeout_ms,
                "wait timed out"
            );
            return WaitOutcome::timed_out(start.elapsed());
        }
        std::thread::sleep(options.poll_interval());
    }
}

/// Wait for a locator's element under the locator's own bounds
#[must_use]
pub fn await_locator(
    root: &PageModel,
    locator: &crate::selector::Locator,
    state: TargetState,
) -> WaitOutcome {
    await_state(root, locator.selector(), state, &locator.wait_options())
}

/// Wait for an arbitrary predicate within a bound
#[must_use]
pub fn wait_until<F>(mut predicate: F, options: &WaitOptions) -> WaitOutcome
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if predicate() {
            return WaitOutcome::satisfied(start.elapsed());
        }
        if start.elapsed() >= options.timeout() {
            return WaitOutcome::timed_out(start.elapsed());
        }
        std::thread::sleep(options.poll_interval());
    }
}

// =============================================================================
// BOUNDED RETRY
// =============================================================================

/// Policy for a bounded detect-act retry loop
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Set the attempt budget
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the inter-attempt delay
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// Run a fallible operation up to the policy's attempt budget.
///
/// The operation reports `Ok(Some(value))` when done, `Ok(None)` to retry
/// after the fixed delay, or `Err(_)` to abort immediately, so protocol
/// violations cut through the loop while ordinary "not yet" keeps polling.
/// An exhausted budget yields `Ok(None)`.
pub fn retry<T, F>(policy: &RetryPolicy, mut op: F) -> VigilarResult<Option<T>>
where
    F: FnMut(u32) -> VigilarResult<Option<T>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = op(attempt)? {
            return Ok(Some(value));
        }
        if attempt < policy.max_attempts {
            std::thread::sleep(policy.interval);
        }
    }
    Ok(None)
}
