//! Management page object.
//!
//! Drives the Application Management area: the Management menu, the media
//! server tab, and the library refresh workflow running inside the
//! `mainFrame` iframe. Tab opens return `Ok(false)` when the tab never
//! shows instead of swallowing the distinction between "not there" and
//! "query failed".

use crate::frame::{FrameHandle, FrameResolver, MAIN_FRAME};
use crate::page::PageModel;
use crate::pages::ConsolePage;
use crate::popup::PopupReconciler;
use crate::result::{VigilarError, VigilarResult};
use crate::selector::{Locator, Selector};
use crate::wait::{await_locator, await_state, RetryPolicy, TargetState, WaitOptions};
use crate::workflow::{RefreshWorkflow, WorkflowConfig, REFRESH_CONTROL_TEXT};
use tracing::{info, warn};

/// Selector of the Management menu entry
pub const MANAGEMENT_MENU: &str = "span[datafld='management']";

/// Selector of the Application Management submenu entry
pub const APPLICATION_MENU: &str = "#desc_app";

/// Label of the media server tab
pub const MEDIA_TAB_TEXT: &str = "UPnP AV Server";

/// Selector of the refresh trigger inside the iframe
pub const REFRESH_BUTTON: &str = "#refresh_button";

/// Selector of the refresh progress bar inside the iframe
pub const PROGRESS_BAR: &str = "#progressbar";

const MEDIA_TAB: &str = "#m_2";
const SECOND_TAB: &str = "#m_1";
const SECOND_TAB_TEXT: &str = "FTP Server";

/// Page object for the Application Management screen
#[derive(Debug, Clone)]
pub struct ManagementPage {
    page: PageModel,
    options: WaitOptions,
    frame_bound: WaitOptions,
}

impl ManagementPage {
    /// Create the page object over the shared document
    #[must_use]
    pub fn new(page: PageModel) -> Self {
        Self {
            page,
            options: WaitOptions::default(),
            frame_bound: WaitOptions::default(),
        }
    }

    /// Override menu/tab wait bounds
    #[must_use]
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the iframe resolution bound
    #[must_use]
    pub fn with_frame_bound(mut self, bound: WaitOptions) -> Self {
        self.frame_bound = bound;
        self
    }

    /// Open the Management menu from the landing page
    pub fn open_management_menu(&self) -> VigilarResult<()> {
        self.require_and_click(MANAGEMENT_MENU)?;
        info!("opened the Management menu");
        Ok(())
    }

    /// Open the Application Management submenu
    pub fn open_application_management(&self) -> VigilarResult<()> {
        self.require_and_click(APPLICATION_MENU)?;
        info!("opened the Application Management submenu");
        Ok(())
    }

    /// Open the media server tab; `Ok(false)` if it never became visible
    pub fn open_media_tab(&self) -> VigilarResult<bool> {
        self.open_tab(MEDIA_TAB, MEDIA_TAB_TEXT)
    }

    /// Open the second application tab; `Ok(false)` if it never became visible
    pub fn open_second_tab(&self) -> VigilarResult<bool> {
        self.open_tab(SECOND_TAB, SECOND_TAB_TEXT)
    }

    fn open_tab(&self, css: &str, text: &str) -> VigilarResult<bool> {
        let tab = Locator::new(css)
            .with_text(text)
            .with_timeout(self.options.timeout())
            .with_poll_interval(self.options.poll_interval());
        let outcome = await_locator(&self.page, &tab, TargetState::Visible);
        if !outcome.satisfied {
            warn!(tab = %tab.selector(), "tab did not become visible");
            return Ok(false);
        }
        self.page.click(tab.selector())?;
        info!(tab = %tab.selector(), "opened tab");
        Ok(true)
    }

    /// Resolve the working iframe; never cached, since client-side
    /// navigation can tear it down and recreate it
    pub fn frame(&self) -> VigilarResult<FrameHandle> {
        FrameResolver::with_options(self.frame_bound.clone()).resolve(&self.page, MAIN_FRAME)
    }

    /// Probe whether the refresh progress bar is currently shown
    pub fn progress_bar_visible(&self) -> VigilarResult<bool> {
        let frame = self.frame()?;
        let outcome = await_state(
            frame.document(),
            &Selector::css(PROGRESS_BAR),
            TargetState::Visible,
            &self.options,
        );
        Ok(outcome.satisfied)
    }

    /// Click the Refresh All control inside the iframe
    pub fn click_refresh_all(&self) -> VigilarResult<()> {
        let frame = self.frame()?;
        let button = Selector::CssWithText {
            css: REFRESH_BUTTON.to_string(),
            text: REFRESH_CONTROL_TEXT.to_string(),
        };
        frame.document().click(&button)?;
        info!("clicked Refresh All");
        Ok(())
    }

    /// Check the trigger control without driving the workflow.
    ///
    /// `Ok(true)` when visible and enabled; `Ok(false)` when disabled or
    /// when a refresh is still running (progress bar showing). A page with
    /// neither the control nor a progress bar has lost its scaffold and
    /// fails hard.
    pub fn ensure_refresh_ready(&self) -> VigilarResult<bool> {
        let frame = self.frame()?;
        let control = Selector::text(REFRESH_CONTROL_TEXT);
        let visible = await_state(
            frame.document(),
            &control,
            TargetState::Visible,
            &self.options,
        );
        if visible.satisfied {
            let enabled = await_state(
                frame.document(),
                &control,
                TargetState::Enabled,
                &self.options,
            );
            return Ok(enabled.satisfied);
        }

        let bar = await_state(
            frame.document(),
            &Selector::css(PROGRESS_BAR),
            TargetState::Visible,
            &self.options,
        );
        if bar.satisfied {
            info!("Refresh All hidden while a refresh is running");
            Ok(false)
        } else {
            Err(VigilarError::ScaffoldMissing {
                message: "neither Refresh All nor the progress bar is visible".to_string(),
            })
        }
    }

    /// Drive the full refresh confirmation workflow to a verdict
    pub fn refresh_and_confirm(&self, config: WorkflowConfig) -> VigilarResult<bool> {
        let mut workflow = RefreshWorkflow::new(config);
        let verdict = workflow.run(&self.page)?;
        if let Some(reason) = workflow.failure() {
            warn!(reason = %reason, "refresh workflow failed");
        }
        Ok(verdict)
    }

    /// Tolerant popup sweep after a completed refresh
    pub fn handle_success_popup(&self, policy: &RetryPolicy) -> VigilarResult<bool> {
        PopupReconciler::new().retry_dismiss(&self.page, policy)
    }

    fn require_and_click(&self, css: &str) -> VigilarResult<()> {
        let entry = Locator::new(css)
            .with_timeout(self.options.timeout())
            .with_poll_interval(self.options.poll_interval());
        let outcome = await_locator(&self.page, &entry, TargetState::Visible);
        if !outcome.satisfied {
            return Err(VigilarError::ElementNotFound {
                selector: css.to_string(),
            });
        }
        self.page.click(entry.selector())
    }
}

impl ConsolePage for ManagementPage {
    fn url_pattern(&self) -> &str {
        "/web/home.html"
    }
}
