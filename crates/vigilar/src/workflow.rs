//! Refresh workflow orchestration.
//!
//! One canonical state machine for "wait out a running refresh and confirm
//! the console is ready to trigger another": resolve the working iframe,
//! monitor the progress channel, reconcile the confirmation popup, and gate
//! on the Refresh All control. Historically this flow existed as two
//! near-identical page objects that disagreed only on whether a missing
//! popup fails the scenario; that policy is now the explicit
//! [`WorkflowConfig::popup_required`] flag.
//!
//! The orchestrator never panics and never throws for ordinary timeouts:
//! every dead end becomes a recorded [`FailureReason`] and an `Ok(false)`
//! verdict the assertion layer can report by name. Only protocol violations
//! (progress regression) and missing scaffold (the iframe itself) escalate
//! as hard errors.

use crate::frame::{FrameResolver, MAIN_FRAME};
use crate::page::PageModel;
use crate::popup::PopupReconciler;
use crate::progress::{DomMonitorOptions, DomProgressMonitor, ProgressOutcome, ProgressSample};
use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use crate::wait::{await_state, TargetState, WaitOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Visible label of the refresh trigger control
pub const REFRESH_CONTROL_TEXT: &str = "Refresh All";

/// Default bound for the trigger control to become ready (5 seconds)
pub const DEFAULT_CONTROL_READY_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// STATES AND REASONS
// =============================================================================

/// Why a workflow run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Progress never reached 100 within the poll budget
    Stuck,
    /// The confirmation popup never appeared (strict mode)
    PopupMissing,
    /// The popup appeared but could not be closed
    PopupNotDismissible,
    /// The trigger control is absent or disabled
    ControlNotReady,
}

impl FailureReason {
    /// Stable reason string reported to the assertion layer
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stuck => "stuck",
            Self::PopupMissing => "popup missing",
            Self::PopupNotDismissible => "popup not dismissible",
            Self::ControlNotReady => "control not ready",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// States of the refresh workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Starting point
    Idle,
    /// Probing for a progress indicator
    ProgressCheck,
    /// Progress bar visible and climbing
    ProgressRunning,
    /// Progress reached 100
    ProgressDone,
    /// No progress indicator appeared; refresh treated as already complete
    ProgressAbsent,
    /// Waiting for the confirmation popup
    PopupCheck,
    /// Popup closed through its OK control
    PopupDismissed,
    /// Trigger control confirmed visible and enabled
    ActionReady,
    /// Workflow finished successfully
    Done,
    /// Absorbing failure state
    Failed(FailureReason),
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ProgressCheck => write!(f, "progress-check"),
            Self::ProgressRunning => write!(f, "progress-running"),
            Self::ProgressDone => write!(f, "progress-done"),
            Self::ProgressAbsent => write!(f, "progress-absent"),
            Self::PopupCheck => write!(f, "popup-check"),
            Self::PopupDismissed => write!(f, "popup-dismissed"),
            Self::ActionReady => write!(f, "action-ready"),
            Self::Done => write!(f, "done"),
            Self::Failed(reason) => write!(f, "failed({reason})"),
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Bounds and policy for one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Whether a missing popup after completion fails the run (strict) or
    /// is tolerated with a warning
    pub popup_required: bool,
    /// Name of the working iframe
    pub frame_name: String,
    /// Bound for resolving the iframe
    pub frame_bound: WaitOptions,
    /// Progress monitoring options (appearance bound, poll cadence, budget)
    pub progress: DomMonitorOptions,
    /// Popup detection and dismissal bounds
    pub popup: PopupReconciler,
    /// Trigger control locator
    pub control: Selector,
    /// Bound for the trigger control to become ready
    pub control_ready: WaitOptions,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            popup_required: true,
            frame_name: MAIN_FRAME.to_string(),
            frame_bound: WaitOptions::default(),
            progress: DomMonitorOptions::default(),
            popup: PopupReconciler::new(),
            control: Selector::text(REFRESH_CONTROL_TEXT),
            control_ready: WaitOptions::new().with_timeout(DEFAULT_CONTROL_READY_TIMEOUT_MS),
        }
    }
}

impl WorkflowConfig {
    /// Create a config with defaults (strict popup policy)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select strict or tolerant popup policy
    #[must_use]
    pub const fn with_popup_required(mut self, required: bool) -> Self {
        self.popup_required = required;
        self
    }

    /// Override the working iframe name
    #[must_use]
    pub fn with_frame_name(mut self, name: impl Into<String>) -> Self {
        self.frame_name = name.into();
        self
    }

    /// Override the frame resolution bound
    #[must_use]
    pub fn with_frame_bound(mut self, bound: WaitOptions) -> Self {
        self.frame_bound = bound;
        self
    }

    /// Override progress monitoring options
    #[must_use]
    pub fn with_progress(mut self, progress: DomMonitorOptions) -> Self {
        self.progress = progress;
        self
    }

    /// Override popup reconciliation bounds
    #[must_use]
    pub fn with_popup(mut self, popup: PopupReconciler) -> Self {
        self.popup = popup;
        self
    }

    /// Override the trigger control locator
    #[must_use]
    pub fn with_control(mut self, control: Selector) -> Self {
        self.control = control;
        self
    }

    /// Override the control readiness bound
    #[must_use]
    pub fn with_control_ready(mut self, bound: WaitOptions) -> Self {
        self.control_ready = bound;
        self
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Drives one refresh confirmation flow to a verdict.
///
/// One instance covers one run; the state trace, progress samples, and
/// failure reason remain inspectable afterwards.
#[derive(Debug)]
pub struct RefreshWorkflow {
    config: WorkflowConfig,
    trace: Vec<WorkflowState>,
    samples: Vec<ProgressSample>,
    failure: Option<FailureReason>,
}

impl Default for RefreshWorkflow {
    fn default() -> Self {
        Self::new(WorkflowConfig::default())
    }
}

impl RefreshWorkflow {
    /// Create a workflow with the given config
    #[must_use]
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            trace: Vec::new(),
            samples: Vec::new(),
            failure: None,
        }
    }

    /// Run the workflow against the console page.
    ///
    /// `Ok(true)` means `Done`; `Ok(false)` means a recorded
    /// [`FailureReason`]. `Err` is reserved for hard faults: the iframe
    /// scaffold missing entirely, or a progress regression.
    pub fn run(&mut self, page: &PageModel) -> VigilarResult<bool> {
        self.trace.clear();
        self.samples.clear();
        self.failure = None;
        self.enter(WorkflowState::Idle);

        let resolver = FrameResolver::with_options(self.config.frame_bound.clone());
        let frame = resolver.resolve(page, &self.config.frame_name)?;

        self.enter(WorkflowState::ProgressCheck);
        let mut monitor = DomProgressMonitor::with_options(self.config.progress.clone());
        let outcome = monitor.wait_until_complete(frame.document())?;
        self.samples = monitor.samples().to_vec();

        match outcome {
            ProgressOutcome::Absent => {
                // No indicator within the bound: the refresh finished before
                // we looked, and no popup is expected on this path.
                self.enter(WorkflowState::ProgressAbsent);
            }
            ProgressOutcome::Stuck { last_percent } => {
                self.enter(WorkflowState::ProgressRunning);
                warn!(last_percent, "progress bar got stuck");
                self.fail(FailureReason::Stuck);
                return Ok(false);
            }
            ProgressOutcome::Completed => {
                self.enter(WorkflowState::ProgressRunning);
                self.enter(WorkflowState::ProgressDone);
                if !self.reconcile_popup(page)? {
                    return Ok(false);
                }
            }
        }

        // The popup dismissal can rebuild the frame content; re-resolve
        // instead of trusting the earlier handle.
        let frame = resolver.resolve(page, &self.config.frame_name)?;
        let visible = await_state(
            frame.document(),
            &self.config.control,
            TargetState::Visible,
            &self.config.control_ready,
        );
        if !visible.satisfied {
            warn!(control = %self.config.control, "trigger control did not appear");
            self.fail(FailureReason::ControlNotReady);
            return Ok(false);
        }
        let enabled = await_state(
            frame.document(),
            &self.config.control,
            TargetState::Enabled,
            &self.config.control_ready,
        );
        if !enabled.satisfied {
            warn!(control = %self.config.control, "trigger control is visible but disabled");
            self.fail(FailureReason::ControlNotReady);
            return Ok(false);
        }

        self.enter(WorkflowState::ActionReady);
        self.enter(WorkflowState::Done);
        info!("refresh workflow completed");
        Ok(true)
    }

    /// Popup phase after a completed progress run. Returns `Ok(true)` to
    /// continue toward the readiness gate.
    fn reconcile_popup(&mut self, page: &PageModel) -> VigilarResult<bool> {
        self.enter(WorkflowState::PopupCheck);
        let seen = self.config.popup.wait_for_popup(page);
        if !seen.satisfied {
            if self.config.popup_required {
                warn!("success popup did not appear after completion");
                self.fail(FailureReason::PopupMissing);
                return Ok(false);
            }
            warn!("success popup did not appear; tolerated by configuration");
            return Ok(true);
        }

        match self.config.popup.dismiss(page) {
            Ok(()) => {
                self.enter(WorkflowState::PopupDismissed);
                Ok(true)
            }
            Err(VigilarError::ElementNotFound { .. } | VigilarError::ControlNotReady { .. }) => {
                self.fail(FailureReason::PopupNotDismissible);
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    fn enter(&mut self, state: WorkflowState) {
        debug!(state = %state, "workflow transition");
        self.trace.push(state);
    }

    fn fail(&mut self, reason: FailureReason) {
        self.failure = Some(reason);
        self.trace.push(WorkflowState::Failed(reason));
    }

    /// The recorded state trace of the last run
    #[must_use]
    pub fn trace(&self) -> &[WorkflowState] {
        &self.trace
    }

    /// Progress samples observed during the last run
    #[must_use]
    pub fn samples(&self) -> &[ProgressSample] {
        &self.samples
    }

    /// Failure reason of the last run, if any
    #[must_use]
    pub const fn failure(&self) -> Option<FailureReason> {
        self.failure
    }
}
