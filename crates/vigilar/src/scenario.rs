//! Scenario execution: the BDD step boundary.
//!
//! Step definitions bind a phrase pattern (with `{string}` placeholders) to
//! a handler receiving the scenario context. A scenario is an ordered list
//! of phrases; the runner dispatches each against the registry, stops at
//! the first failure, and reports which named step failed and why. The
//! assertion layer only ever consumes the per-step verdicts.
//!
//! ## Toyota Way Application
//!
//! - **Poka-Yoke**: unmatched phrases fail dispatch instead of silently
//!   passing
//! - **Genchi Genbutsu**: reports carry the failing step's own reason string

use crate::config::{Credential, SuiteConfig};
use crate::page::PageModel;
use crate::pages::{ConsolePage, HomePage, LoginPage, ManagementPage};
use crate::result::{VigilarError, VigilarResult};
use crate::wait::WaitOptions;
use crate::workflow::WorkflowConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};
use uuid::Uuid;

// =============================================================================
// STEP KEYWORDS AND PATTERNS
// =============================================================================

/// BDD step keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKeyword {
    /// Precondition step
    Given,
    /// Action step
    When,
    /// Assertion step
    Then,
}

impl std::fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Given => write!(f, "Given"),
            Self::When => write!(f, "When"),
            Self::Then => write!(f, "Then"),
        }
    }
}

/// A phrase pattern with `{string}` placeholders.
///
/// `The user enters credentials {string} and {string}` matches
/// `The user enters credentials "CPUSER" and "CPUSERPSWD"` and captures the
/// quoted arguments.
#[derive(Debug, Clone)]
pub struct StepPattern {
    raw: String,
    regex: regex::Regex,
}

impl StepPattern {
    /// Compile a pattern
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let mut expr = String::from("^");
        for (i, literal) in raw.split("{string}").enumerate() {
            if i > 0 {
                expr.push_str("\"([^\"]*)\"");
            }
            expr.push_str(&regex::escape(literal));
        }
        expr.push('$');
        // Escaped literals always compile
        let regex = regex::Regex::new(&expr).expect("step pattern regex");
        Self { raw, regex }
    }

    /// Match a phrase, returning the captured placeholder arguments
    #[must_use]
    pub fn matches(&self, phrase: &str) -> Option<Vec<String>> {
        self.regex.captures(phrase).map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect()
        })
    }

    /// The original pattern text
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Scenario-scoped collaborators handed to every step handler
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    page: PageModel,
    /// Suite configuration (credentials, base URL)
    pub config: SuiteConfig,
    /// Workflow policy used by refresh steps
    pub workflow: WorkflowConfig,
    /// Scratchpad shared between steps of one scenario
    pub shared: HashMap<String, String>,
    step_bounds: WaitOptions,
    frame_bound: WaitOptions,
}

impl ScenarioContext {
    /// Create a context over the console page
    #[must_use]
    pub fn new(page: PageModel, config: SuiteConfig) -> Self {
        Self {
            page,
            config,
            workflow: WorkflowConfig::default(),
            shared: HashMap::new(),
            step_bounds: WaitOptions::default(),
            frame_bound: WaitOptions::default(),
        }
    }

    /// Override the wait bounds page objects use
    #[must_use]
    pub fn with_step_bounds(mut self, bounds: WaitOptions) -> Self {
        self.step_bounds = bounds;
        self
    }

    /// Override the iframe resolution bound
    #[must_use]
    pub fn with_frame_bound(mut self, bound: WaitOptions) -> Self {
        self.frame_bound = bound;
        self
    }

    /// Override the workflow policy
    #[must_use]
    pub fn with_workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    /// The shared console document
    #[must_use]
    pub const fn page(&self) -> &PageModel {
        &self.page
    }

    /// Fresh login page object
    #[must_use]
    pub fn login_page(&self) -> LoginPage {
        LoginPage::new(self.page.clone()).with_options(self.step_bounds.clone())
    }

    /// Fresh home page object
    #[must_use]
    pub fn home_page(&self) -> HomePage {
        HomePage::new(self.page.clone()).with_options(self.step_bounds.clone())
    }

    /// Fresh management page object
    #[must_use]
    pub fn management_page(&self) -> ManagementPage {
        ManagementPage::new(self.page.clone())
            .with_options(self.step_bounds.clone())
            .with_frame_bound(self.frame_bound.clone())
    }

    /// Resolve a step argument: configuration keys map to their values,
    /// anything else passes through verbatim
    #[must_use]
    pub fn resolve(&self, key: &str) -> String {
        match key {
            crate::config::ENV_BASE_URL => self.config.base_url.clone(),
            crate::config::ENV_ADMIN_PASSWORD => self.config.admin.password().to_string(),
            crate::config::ENV_USER_NAME => self
                .config
                .user
                .username()
                .unwrap_or_default()
                .to_string(),
            crate::config::ENV_USER_PASSWORD => self.config.user.password().to_string(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Handler bound to a step pattern
pub type StepHandler =
    Box<dyn Fn(&mut ScenarioContext, &[String]) -> VigilarResult<bool> + Send + Sync>;

struct StepDef {
    keyword: StepKeyword,
    pattern: StepPattern,
    handler: StepHandler,
}

/// Registry of step definitions
#[derive(Default)]
pub struct StepRegistry {
    steps: Vec<StepDef>,
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("step_count", &self.steps.len())
            .finish()
    }
}

impl StepRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a precondition step
    pub fn given<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&mut ScenarioContext, &[String]) -> VigilarResult<bool> + Send + Sync + 'static,
    {
        self.bind(StepKeyword::Given, pattern, handler);
    }

    /// Bind an action step
    pub fn when<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&mut ScenarioContext, &[String]) -> VigilarResult<bool> + Send + Sync + 'static,
    {
        self.bind(StepKeyword::When, pattern, handler);
    }

    /// Bind an assertion step
    pub fn then<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&mut ScenarioContext, &[String]) -> VigilarResult<bool> + Send + Sync + 'static,
    {
        self.bind(StepKeyword::Then, pattern, handler);
    }

    fn bind<F>(&mut self, keyword: StepKeyword, pattern: &str, handler: F)
    where
        F: Fn(&mut ScenarioContext, &[String]) -> VigilarResult<bool> + Send + Sync + 'static,
    {
        self.steps.push(StepDef {
            keyword,
            pattern: StepPattern::new(pattern),
            handler: Box::new(handler),
        });
    }

    /// Number of bound steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Dispatch a phrase to the first matching definition.
    ///
    /// The keyword does not constrain matching (an `And` continuation keeps
    /// the previous keyword in feature text); phrases themselves are unique.
    pub fn dispatch(&self, ctx: &mut ScenarioContext, phrase: &str) -> VigilarResult<bool> {
        for def in &self.steps {
            if let Some(args) = def.pattern.matches(phrase) {
                return (def.handler)(ctx, &args);
            }
        }
        Err(VigilarError::StepUnmatched {
            phrase: phrase.to_string(),
        })
    }

    /// Keyword a phrase was registered under, if any
    #[must_use]
    pub fn keyword_of(&self, phrase: &str) -> Option<StepKeyword> {
        self.steps
            .iter()
            .find(|def| def.pattern.matches(phrase).is_some())
            .map(|def| def.keyword)
    }
}

// =============================================================================
// SCENARIOS AND REPORTS
// =============================================================================

/// A named, ordered sequence of step phrases
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    steps: Vec<(StepKeyword, String)>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a Given step
    #[must_use]
    pub fn given(mut self, phrase: impl Into<String>) -> Self {
        self.steps.push((StepKeyword::Given, phrase.into()));
        self
    }

    /// Append a When step
    #[must_use]
    pub fn when(mut self, phrase: impl Into<String>) -> Self {
        self.steps.push((StepKeyword::When, phrase.into()));
        self
    }

    /// Append a Then step
    #[must_use]
    pub fn then(mut self, phrase: impl Into<String>) -> Self {
        self.steps.push((StepKeyword::Then, phrase.into()));
        self
    }

    /// The scenario's steps
    #[must_use]
    pub fn steps(&self) -> &[(StepKeyword, String)] {
        &self.steps
    }
}

/// Verdict of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepVerdict {
    /// Step keyword
    pub keyword: StepKeyword,
    /// Step phrase
    pub phrase: String,
    /// Whether the step passed
    pub passed: bool,
    /// Failure reason, when it did not
    pub reason: Option<String>,
}

/// Aggregate result of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Unique run identifier
    pub id: Uuid,
    /// Scenario name
    pub name: String,
    /// Per-step verdicts, in execution order
    pub steps: Vec<StepVerdict>,
    /// Whether every step passed
    pub passed: bool,
}

impl ScenarioReport {
    /// The first failing step, if any
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepVerdict> {
        self.steps.iter().find(|s| !s.passed)
    }

    /// Serialize the report as pretty JSON
    pub fn to_json(&self) -> VigilarResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report for the postmortem bundle
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> VigilarResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Executes scenarios against a registry
#[derive(Debug)]
pub struct ScenarioRunner {
    registry: StepRegistry,
}

impl ScenarioRunner {
    /// Create a runner over a registry
    #[must_use]
    pub fn new(registry: StepRegistry) -> Self {
        Self { registry }
    }

    /// Run a scenario, stopping at the first failing step
    pub fn run(&self, scenario: &Scenario, ctx: &mut ScenarioContext) -> ScenarioReport {
        let mut verdicts = Vec::new();
        info!(scenario = %scenario.name, "scenario started");

        for (keyword, phrase) in scenario.steps() {
            let (passed, reason) = match self.registry.dispatch(ctx, phrase) {
                Ok(true) => (true, None),
                Ok(false) => (false, Some("step condition not met".to_string())),
                Err(e) => (false, Some(e.to_string())),
            };

            if passed {
                info!(step = %phrase, "step passed");
            } else {
                error!(step = %phrase, reason = reason.as_deref().unwrap_or(""), "step failed");
            }

            verdicts.push(StepVerdict {
                keyword: *keyword,
                phrase: phrase.clone(),
                passed,
                reason,
            });
            if !passed {
                break;
            }
        }

        let executed_all = verdicts.len() == scenario.steps().len();
        let passed = executed_all && verdicts.iter().all(|v| v.passed);
        ScenarioReport {
            id: Uuid::new_v4(),
            name: scenario.name.clone(),
            steps: verdicts,
            passed,
        }
    }
}

// =============================================================================
// SUITE STEPS
// =============================================================================

/// The suite's step bindings for the management console.
#[must_use]
pub fn suite_registry() -> StepRegistry {
    let mut registry = StepRegistry::new();

    registry.given("The user navigates to the login page", |ctx, _| {
        Ok(ctx.login_page().is_loaded())
    });

    registry.given("The user is logged in as Admin", |ctx, _| {
        let admin = ctx.config.admin.clone();
        ctx.login_page().login(&admin)?;
        Ok(true)
    });

    registry.when(
        "The user enters credentials {string} and {string}",
        |ctx, args| {
            let username = ctx.resolve(&args[0]);
            let password = ctx.resolve(&args[1]);
            ctx.login_page()
                .login(&Credential::named(username, password))?;
            Ok(true)
        },
    );

    registry.when("The user enters {string} only", |ctx, args| {
        let password = ctx.resolve(&args[0]);
        ctx.login_page().login(&Credential::admin_only(password))?;
        Ok(true)
    });

    registry.then("The Login page is displayed", |ctx, _| {
        Ok(ctx.login_page().is_loaded())
    });

    registry.then("The {string} error is displayed", |ctx, args| {
        if args[0].eq_ignore_ascii_case("badusernamepassword") {
            ctx.login_page().expect_bad_credentials()?;
            Ok(true)
        } else {
            Err(VigilarError::AssertionFailed {
                message: format!("unrecognized error kind: {:?}", args[0]),
            })
        }
    });

    registry.then("The home page is displayed", |ctx, _| {
        ctx.home_page().wait_loaded()?;
        Ok(true)
    });

    registry.given("The user opens Management menu", |ctx, _| {
        ctx.management_page().open_management_menu()?;
        Ok(true)
    });

    registry.given("The user opens Application Management menu", |ctx, _| {
        ctx.management_page().open_application_management()?;
        Ok(true)
    });

    registry.given("The user opens the UPnP AV Server tab", |ctx, _| {
        ctx.management_page().open_media_tab()
    });

    registry.then("The user leaves to another tab", |ctx, _| {
        ctx.management_page().open_second_tab()
    });

    registry.then("The user see the progress bar", |ctx, _| {
        ctx.management_page().progress_bar_visible()
    });

    registry.then("The user clicks Refresh All button", |ctx, _| {
        ctx.management_page().click_refresh_all()?;
        Ok(true)
    });

    registry.when(
        "The user clicks Refresh All button and waits for completion",
        |ctx, _| {
            let management = ctx.management_page();
            management.click_refresh_all()?;
            management.refresh_and_confirm(ctx.workflow.clone())
        },
    );

    registry.then(
        "The user gets the Refresh All button is visible and enabled",
        |ctx, _| {
            ctx.management_page()
                .refresh_and_confirm(ctx.workflow.clone())
        },
    );

    registry
}
