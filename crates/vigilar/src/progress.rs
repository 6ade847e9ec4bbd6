//! Progress monitoring for the library refresh operation.
//!
//! The console reports refresh progress through a progress-bar element whose
//! `aria-valuenow` attribute climbs to 100. This module owns the DOM polling
//! strategy and the monotonicity invariant shared with the network strategy
//! in [`crate::network`]: within one monitoring run percentages never move
//! backwards, and a regression is a protocol violation that aborts the run
//! rather than a condition to retry.
//!
//! A progress bar that never appears is NOT an error: the refresh may have
//! finished before the first observation, so absence is reported as
//! [`ProgressOutcome::Absent`] and treated as completion by the caller.

use crate::page::PageModel;
use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use crate::wait::{await_state, retry, RetryPolicy, TargetState, WaitOptions};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Attribute carrying the completion percentage
pub const PROGRESS_ATTRIBUTE: &str = "aria-valuenow";

/// Default bound for the progress bar to appear (7 seconds)
pub const DEFAULT_APPEAR_TIMEOUT_MS: u64 = 7_000;

/// Default per-poll interval (1 second)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default poll budget (300 polls, a 5-minute ceiling at 1s each)
pub const DEFAULT_POLL_BUDGET: u32 = 300;

// =============================================================================
// SAMPLES
// =============================================================================

/// Which channel produced a progress observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSource {
    /// Read off the progress-bar attribute
    Dom,
    /// Extracted from an intercepted scan-status response
    Network,
}

impl std::fmt::Display for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dom => write!(f, "dom"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// One progress observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Completion percentage, clamped to 0–100
    pub percent: u8,
    /// Whether the channel reported the operation finished
    pub complete: bool,
    /// Producing channel
    pub source: SampleSource,
    /// Monotonic offset from the start of the monitoring run
    pub observed_at: Duration,
}

/// Terminal result of one monitoring run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressOutcome {
    /// Progress reached 100
    Completed,
    /// Poll budget exhausted before reaching 100
    Stuck {
        /// Last percentage observed
        last_percent: u8,
    },
    /// No progress indicator appeared within the initial bound
    Absent,
}

// =============================================================================
// MONOTONIC GUARD
// =============================================================================

/// Enforces non-decreasing percentages within one monitoring run.
///
/// The upstream scan API is monotonic under correct operation; a decrease
/// means crossed responses or a server-side restart and must abort the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicGuard {
    last: Option<u8>,
}

impl MonotonicGuard {
    /// Create a guard with no prior observation
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Accept the next percentage, failing on regression
    pub fn accept(&mut self, percent: u8) -> VigilarResult<()> {
        if let Some(last) = self.last {
            if percent < last {
                return Err(VigilarError::ProgressRegression {
                    from: last,
                    to: percent,
                });
            }
        }
        self.last = Some(percent);
        Ok(())
    }

    /// Highest percentage accepted so far
    #[must_use]
    pub const fn last(&self) -> Option<u8> {
        self.last
    }
}

// =============================================================================
// DOM STRATEGY
// =============================================================================

/// Options for the DOM polling strategy
#[derive(Debug, Clone)]
pub struct DomMonitorOptions {
    /// Progress bar selector
    pub bar: Selector,
    /// Bound for the bar to appear at all
    pub appear: WaitOptions,
    /// Delay between attribute reads
    pub poll_interval: Duration,
    /// Maximum attribute reads before declaring the operation stuck
    pub poll_budget: u32,
}

impl Default for DomMonitorOptions {
    fn default() -> Self {
        Self {
            bar: Selector::css("#progressbar"),
            appear: WaitOptions::new().with_timeout(DEFAULT_APPEAR_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_budget: DEFAULT_POLL_BUDGET,
        }
    }
}

impl DomMonitorOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress bar selector
    #[must_use]
    pub fn with_bar(mut self, bar: Selector) -> Self {
        self.bar = bar;
        self
    }

    /// Set the appearance bound
    #[must_use]
    pub fn with_appear(mut self, appear: WaitOptions) -> Self {
        self.appear = appear;
        self
    }

    /// Set the per-poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll budget
    #[must_use]
    pub const fn with_poll_budget(mut self, budget: u32) -> Self {
        self.poll_budget = budget;
        self
    }
}

/// DOM-channel progress monitor.
///
/// Reads the bar's percentage attribute at a fixed interval up to a poll
/// budget, recording every observation. One monitor instance covers one
/// monitoring run; discard it afterwards.
#[derive(Debug)]
pub struct DomProgressMonitor {
    options: DomMonitorOptions,
    guard: MonotonicGuard,
    samples: Vec<ProgressSample>,
}

impl Default for DomProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DomProgressMonitor {
    /// Create a monitor with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DomMonitorOptions::default())
    }

    /// Create a monitor with custom options
    #[must_use]
    pub fn with_options(options: DomMonitorOptions) -> Self {
        Self {
            options,
            guard: MonotonicGuard::new(),
            samples: Vec::new(),
        }
    }

    /// Run until the bar reaches 100, the budget is exhausted, or the bar
    /// never appears.
    ///
    /// Only protocol violations (percentage regression) surface as `Err`;
    /// stuck and absent are ordinary outcomes the caller turns into
    /// verdicts.
    pub fn wait_until_complete(&mut self, frame: &PageModel) -> VigilarResult<ProgressOutcome> {
        let started = Instant::now();

        let appeared = await_state(
            frame,
            &self.options.bar,
            TargetState::Visible,
            &self.options.appear,
        );
        if !appeared.satisfied {
            info!(bar = %self.options.bar, "no progress bar visible, treating refresh as already complete");
            return Ok(ProgressOutcome::Absent);
        }

        let policy = RetryPolicy::new(self.options.poll_budget, self.options.poll_interval);
        let bar = self.options.bar.clone();
        let guard = &mut self.guard;
        let samples = &mut self.samples;
        let done = retry(&policy, |attempt| {
            let percent = read_percent(frame, &bar);
            guard.accept(percent)?;
            samples.push(ProgressSample {
                percent,
                complete: percent >= 100,
                source: SampleSource::Dom,
                observed_at: started.elapsed(),
            });
            debug!(percent, attempt, "progress bar reading");
            Ok((percent >= 100).then_some(()))
        })?;

        if done.is_some() {
            info!("progress bar reached 100%");
            Ok(ProgressOutcome::Completed)
        } else {
            Ok(ProgressOutcome::Stuck {
                last_percent: self.guard.last().unwrap_or(0),
            })
        }
    }

    /// All observations recorded during the run
    #[must_use]
    pub fn samples(&self) -> &[ProgressSample] {
        &self.samples
    }

    /// Highest percentage observed so far
    #[must_use]
    pub const fn last_percent(&self) -> Option<u8> {
        self.guard.last()
    }
}

/// Read and coerce the bar percentage; a missing or unparsable attribute
/// counts as 0 since the bar may be freshly attached.
fn read_percent(frame: &PageModel, bar: &Selector) -> u8 {
    frame
        .attribute(bar, PROGRESS_ATTRIBUTE)
        .and_then(|value| value.trim().parse::<u8>().ok())
        .map_or(0, |percent| percent.min(100))
}
