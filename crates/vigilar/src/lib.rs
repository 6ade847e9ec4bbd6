//! Vigilar: deterministic E2E automation for NAS management consoles.
//!
//! Vigilar (Spanish: "to keep watch") drives a device management console
//! through login, navigation, and the asynchronous media-library refresh
//! workflow, asserting UI state at every step. The core is a state-polling
//! protocol: locate elements (possibly inside an iframe), wait for target
//! states under strict bounds, reconcile the DOM and network progress
//! channels, and close the confirmation popup, producing one verdict per
//! scenario step for the assertion layer.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     VIGILAR Architecture                        │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌────────────────────┐     │
//! │  │ Scenario  │   │ Page Objects │   │ Refresh Workflow   │     │
//! │  │ Steps     │──►│ (login, mgmt)│──►│ (state machine)    │     │
//! │  └───────────┘   └──────────────┘   └────────┬───────────┘     │
//! │                                              ▼                 │
//! │        ┌──────────┐  ┌──────────┐  ┌──────────────────┐        │
//! │        │ Frame    │  │ Waiter + │  │ Progress (DOM /  │        │
//! │        │ Resolver │  │ Retry    │  │ network) + Popup │        │
//! │        └────┬─────┘  └────┬─────┘  └────────┬─────────┘        │
//! │             └─────────────┴────────┬────────┘                  │
//! │                                    ▼                           │
//! │                          ┌──────────────────┐                  │
//! │                          │ Modeled console  │                  │
//! │                          │ (PageModel)      │                  │
//! │                          └──────────────────┘                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every wait is bounded and reports a [`wait::WaitOutcome`] instead of
//! throwing; only protocol violations (progress regression) and missing
//! scaffold (the working iframe) abort a scenario hard.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod page;
mod result;
mod selector;

/// Suite configuration and credentials
pub mod config;

/// Embedded sub-document (iframe) resolution
pub mod frame;

/// Network response interception and the scan status channel
pub mod network;

/// Page objects for the console screens
pub mod pages;

/// Success-popup reconciliation
pub mod popup;

/// Progress monitoring and the monotonicity invariant
pub mod progress;

/// Scenario execution: step patterns, registry, runner, reports
pub mod scenario;

/// Simulated device console for deterministic tests
pub mod sim;

/// Wait mechanisms and the shared bounded-retry combinator
pub mod wait;

/// Refresh workflow orchestration
pub mod workflow;

pub use config::{Credential, SuiteConfig};
pub use frame::{FrameHandle, FrameResolver, MAIN_FRAME};
pub use network::{
    InterceptedResponse, NetworkMonitorOptions, NetworkProgressMonitor, ResponseFeed, ScanStatus,
    UrlPattern,
};
pub use page::{ElementSnapshot, ElementSpec, PageModel};
pub use pages::{ConsolePage, HomePage, LoginPage, ManagementPage};
pub use popup::PopupReconciler;
pub use progress::{
    DomMonitorOptions, DomProgressMonitor, MonotonicGuard, ProgressOutcome, ProgressSample,
    SampleSource,
};
pub use result::{VigilarError, VigilarResult};
pub use scenario::{
    Scenario, ScenarioContext, ScenarioReport, ScenarioRunner, StepKeyword, StepRegistry,
    StepVerdict,
};
pub use selector::{Locator, LocatorOptions, Selector};
pub use sim::SimulatedConsole;
pub use wait::{
    await_locator, await_state, retry, wait_until, RetryPolicy, TargetState, WaitOptions,
    WaitOutcome,
};
pub use workflow::{FailureReason, RefreshWorkflow, WorkflowConfig, WorkflowState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!VERSION.is_empty());
    }
}
