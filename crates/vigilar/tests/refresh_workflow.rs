//! End-to-end properties of the refresh confirmation workflow.
//!
//! Each test scripts a console with the simulated device and drives the
//! orchestrator to a verdict, covering both progress channels, the popup
//! policies, and the readiness gate.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use vigilar::popup::POPUP_OK_BUTTON;
use vigilar::{
    DomMonitorOptions, FailureReason, NetworkProgressMonitor, PopupReconciler, RefreshWorkflow,
    SimulatedConsole, VigilarError, WaitOptions, WorkflowConfig, WorkflowState,
};

fn fast_wait() -> WaitOptions {
    WaitOptions::new().with_timeout(60).with_poll_interval(5)
}

fn fast_config() -> WorkflowConfig {
    WorkflowConfig::new()
        .with_frame_bound(fast_wait())
        .with_progress(
            DomMonitorOptions::new()
                .with_appear(fast_wait())
                .with_poll_interval(Duration::from_millis(5))
                .with_poll_budget(10),
        )
        .with_popup(
            PopupReconciler::new()
                .with_appear(fast_wait())
                .with_dismiss_bound(fast_wait()),
        )
        .with_control_ready(fast_wait())
}

// ============================================================================
// Happy Path
// ============================================================================

#[test]
fn test_full_refresh_cycle_reaches_done() {
    // Progress climbs over three polls, the popup shows on its second
    // observation, and the OK button is actionable.
    let sim = SimulatedConsole::new()
        .with_progress_sequence(vec!["30", "70", "100"])
        .with_popup_after(2);
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let verdict = workflow.run(&page).unwrap();

    assert!(verdict);
    assert!(workflow.failure().is_none());
    assert_eq!(workflow.trace().last(), Some(&WorkflowState::Done));
    assert!(workflow.trace().contains(&WorkflowState::PopupDismissed));
    assert!(page.clicked(POPUP_OK_BUTTON));

    let percents: Vec<u8> = workflow.samples().iter().map(|s| s.percent).collect();
    assert_eq!(percents, vec![30, 70, 100]);
}

#[test]
fn test_absent_progress_bar_skips_popup_path() {
    // Idle console: no indicator within the bound means the refresh already
    // finished, and no popup is expected.
    let page = SimulatedConsole::new().build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let verdict = workflow.run(&page).unwrap();

    assert!(verdict);
    assert!(workflow.trace().contains(&WorkflowState::ProgressAbsent));
    assert!(!workflow.trace().contains(&WorkflowState::PopupCheck));
    assert!(workflow.samples().is_empty());
    assert_eq!(workflow.trace().last(), Some(&WorkflowState::Done));
}

// ============================================================================
// Failure Verdicts
// ============================================================================

#[test]
fn test_stalled_progress_is_stuck() {
    let sim = SimulatedConsole::new()
        .with_progress_sequence(vec!["40"])
        .with_popup();
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let verdict = workflow.run(&page).unwrap();

    assert!(!verdict);
    assert_eq!(workflow.failure(), Some(FailureReason::Stuck));
    // The popup path was never entered
    assert!(!workflow.trace().contains(&WorkflowState::PopupCheck));
    assert!(!page.clicked(POPUP_OK_BUTTON));
    assert!(workflow.samples().iter().all(|s| s.percent == 40));
}

#[test]
fn test_missing_popup_fails_strict_mode() {
    let sim = SimulatedConsole::new().with_progress_sequence(vec!["30", "100"]);
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config().with_popup_required(true));
    let verdict = workflow.run(&page).unwrap();

    assert!(!verdict);
    assert_eq!(workflow.failure(), Some(FailureReason::PopupMissing));
}

#[test]
fn test_missing_popup_tolerated_when_configured() {
    // Same console state as the strict case; only the policy flag differs.
    let sim = SimulatedConsole::new().with_progress_sequence(vec!["30", "100"]);
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config().with_popup_required(false));
    let verdict = workflow.run(&page).unwrap();

    assert!(verdict);
    assert!(workflow.failure().is_none());
    assert!(workflow.trace().contains(&WorkflowState::PopupCheck));
    assert!(!workflow.trace().contains(&WorkflowState::PopupDismissed));
    assert_eq!(workflow.trace().last(), Some(&WorkflowState::Done));
}

#[test]
fn test_undismissible_popup() {
    let sim = SimulatedConsole::new()
        .with_progress_sequence(vec!["100"])
        .with_popup()
        .with_ok_disabled();
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let verdict = workflow.run(&page).unwrap();

    assert!(!verdict);
    assert_eq!(workflow.failure(), Some(FailureReason::PopupNotDismissible));
    assert!(!page.clicked(POPUP_OK_BUTTON));
}

#[test]
fn test_disabled_control_fails_even_after_clean_refresh() {
    let sim = SimulatedConsole::new()
        .with_progress_sequence(vec!["30", "100"])
        .with_popup()
        .with_refresh_disabled();
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let verdict = workflow.run(&page).unwrap();

    assert!(!verdict);
    assert_eq!(workflow.failure(), Some(FailureReason::ControlNotReady));
    // Everything before the readiness gate succeeded
    assert!(workflow.trace().contains(&WorkflowState::PopupDismissed));
}

#[test]
fn test_hidden_control_fails_readiness_gate() {
    let page = SimulatedConsole::new().with_refresh_hidden().build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let verdict = workflow.run(&page).unwrap();

    assert!(!verdict);
    assert_eq!(workflow.failure(), Some(FailureReason::ControlNotReady));
}

// ============================================================================
// Hard Faults
// ============================================================================

#[test]
fn test_progress_regression_aborts_scenario() {
    let sim = SimulatedConsole::new().with_progress_sequence(vec!["30", "20"]);
    let page = sim.build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let err = workflow.run(&page).unwrap_err();
    assert!(matches!(
        err,
        VigilarError::ProgressRegression { from: 30, to: 20 }
    ));
    assert!(workflow.failure().is_none());
}

#[test]
fn test_detached_frame_is_a_hard_fault() {
    let page = SimulatedConsole::new().without_frame().build();

    let mut workflow = RefreshWorkflow::new(fast_config());
    let err = workflow.run(&page).unwrap_err();
    assert!(matches!(err, VigilarError::FrameNotFound { .. }));
}

// ============================================================================
// Network Channel
// ============================================================================

#[test]
fn test_network_channel_tracks_same_run() {
    let sim = SimulatedConsole::new().with_progress_sequence(vec!["30", "70", "100"]);
    let feed = sim.scan_feed();

    let mut monitor = NetworkProgressMonitor::with_options(
        vigilar::NetworkMonitorOptions::new()
            .with_timeout(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(5)),
    );
    assert!(monitor.wait_until_running(&feed).unwrap());
    assert!(monitor.wait_until_complete(&feed).unwrap());
    assert_eq!(monitor.last_percent(), Some(100));
}

#[test]
fn test_network_channel_regression_is_fatal() {
    let sim = SimulatedConsole::new().with_progress_sequence(vec!["70", "30"]);
    let feed = sim.scan_feed();

    let mut monitor = NetworkProgressMonitor::with_options(
        vigilar::NetworkMonitorOptions::new()
            .with_timeout(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(5)),
    );
    let err = monitor.wait_until_complete(&feed).unwrap_err();
    assert!(matches!(err, VigilarError::ProgressRegression { .. }));
}

// ============================================================================
// Reuse
// ============================================================================

#[test]
fn test_workflow_instance_resets_between_runs() {
    let stuck = SimulatedConsole::new().with_progress_sequence(vec!["40"]);
    let mut workflow = RefreshWorkflow::new(fast_config());
    assert!(!workflow.run(&stuck.build()).unwrap());
    assert_eq!(workflow.failure(), Some(FailureReason::Stuck));

    let idle = SimulatedConsole::new();
    assert!(workflow.run(&idle.build()).unwrap());
    assert!(workflow.failure().is_none());
    assert_eq!(workflow.trace().last(), Some(&WorkflowState::Done));
}
