//! Scenario runs over the simulated console.
//!
//! Exercises the BDD boundary end to end: phrase dispatch, page objects,
//! the refresh workflow, and the per-step verdict reporting the assertion
//! layer consumes.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use vigilar::pages::{APPLICATION_MENU, MANAGEMENT_MENU};
use vigilar::popup::POPUP_OK_BUTTON;
use vigilar::scenario::suite_registry;
use vigilar::{
    Credential, DomMonitorOptions, PageModel, PopupReconciler, Scenario, ScenarioContext,
    ScenarioRunner, SimulatedConsole, SuiteConfig, WaitOptions, WorkflowConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn fast_wait() -> WaitOptions {
    WaitOptions::new().with_timeout(60).with_poll_interval(5)
}

fn fast_workflow() -> WorkflowConfig {
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

fn context(page: PageModel) -> ScenarioContext {
    let config = SuiteConfig::new(
        "http://192.168.7.15/",
        Credential::admin_only("adm"),
        Credential::named("operator", "pw"),
    );
    ScenarioContext::new(page, config)
        .with_step_bounds(fast_wait())
        .with_frame_bound(fast_wait())
        .with_workflow(fast_workflow())
}

#[test]
fn test_media_refresh_scenario_passes() {
    init_tracing();
    let page = SimulatedConsole::new()
        .with_progress_sequence(vec!["30", "70", "100"])
        .with_popup_after(2)
        .build();

    let scenario = Scenario::new("Media library refresh")
        .given("The user is logged in as Admin")
        .given("The user opens Management menu")
        .given("The user opens Application Management menu")
        .given("The user opens the UPnP AV Server tab")
        .then("The user see the progress bar")
        .when("The user clicks Refresh All button and waits for completion");

    let mut ctx = context(page.clone());
    let report = ScenarioRunner::new(suite_registry()).run(&scenario, &mut ctx);

    assert!(report.passed, "report: {:?}", report);
    assert_eq!(report.steps.len(), 6);
    assert!(report.steps.iter().all(|s| s.passed));

    // The navigation and workflow really drove the console
    assert!(page.clicked("#submit_but"));
    assert!(page.clicked(MANAGEMENT_MENU));
    assert!(page.clicked(APPLICATION_MENU));
    assert!(page.clicked(POPUP_OK_BUTTON));
}

#[test]
fn test_stuck_refresh_scenario_reports_failing_step() {
    init_tracing();
    let page = SimulatedConsole::new()
        .with_progress_sequence(vec!["40"])
        .build();

    let scenario = Scenario::new("Refresh gets stuck")
        .given("The user is logged in as Admin")
        .then("The user gets the Refresh All button is visible and enabled");

    let mut ctx = context(page);
    let report = ScenarioRunner::new(suite_registry()).run(&scenario, &mut ctx);

    assert!(!report.passed);
    let failure = report.first_failure().unwrap();
    assert_eq!(
        failure.phrase,
        "The user gets the Refresh All button is visible and enabled"
    );
    assert_eq!(failure.reason.as_deref(), Some("step condition not met"));
}

#[test]
fn test_rejected_credentials_scenario() {
    init_tracing();
    let page = SimulatedConsole::new().build();
    // The device answers a bad login with its error banner
    page.set_text(
        "#id_warn",
        "You entered an incorrect login name or password.Please try again.",
    );
    page.set_visible("#id_warn", true);

    let scenario = Scenario::new("Rejected credentials")
        .given("The user navigates to the login page")
        .when("The user enters credentials \"baduser\" and \"badpass\"")
        .then("The \"badusernamepassword\" error is displayed");

    let mut ctx = context(page.clone());
    let report = ScenarioRunner::new(suite_registry()).run(&scenario, &mut ctx);

    assert!(report.passed, "report: {:?}", report);
    assert!(page
        .fills()
        .contains(&("#f_username".to_string(), "baduser".to_string())));
}

#[test]
fn test_unmatched_phrase_fails_dispatch() {
    init_tracing();
    let page = SimulatedConsole::new().build();

    let scenario = Scenario::new("Unknown step")
        .given("The user is logged in as Admin")
        .when("The user does something unheard of");

    let mut ctx = context(page);
    let report = ScenarioRunner::new(suite_registry()).run(&scenario, &mut ctx);

    assert!(!report.passed);
    let failure = report.first_failure().unwrap();
    assert!(failure
        .reason
        .as_deref()
        .unwrap()
        .contains("No step definition matches"));
}

#[test]
fn test_report_serializes_for_postmortem() {
    init_tracing();
    let page = SimulatedConsole::new().build();

    let scenario = Scenario::new("Ready console")
        .given("The user is logged in as Admin")
        .then("The user gets the Refresh All button is visible and enabled");

    let mut ctx = context(page);
    let report = ScenarioRunner::new(suite_registry()).run(&scenario, &mut ctx);
    assert!(report.passed);

    let json = report.to_json().unwrap();
    assert!(json.contains("Ready console"));
    assert!(json.contains("Refresh All"));
}
