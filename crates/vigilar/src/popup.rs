//! Success-popup reconciliation.
//!
//! After a refresh completes the console shows a transient "Refreshed
//! Successfully." confirmation that must be dismissed through its OK button
//! before the page is usable again. The popup may appear a few seconds
//! after the progress channel reports completion, so two call patterns
//! exist:
//!
//! - [`PopupReconciler::dismiss`] is strict: the OK control must become
//!   visible AND enabled within the bound; visible-but-disabled is
//!   `ControlNotReady`, distinct from not-found.
//! - [`PopupReconciler::retry_dismiss`] is tolerant: it repeats
//!   detect-and-click on a fixed cadence and logs a warning instead of
//!   failing when the popup never shows.

use crate::page::PageModel;
use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use crate::wait::{await_state, retry, RetryPolicy, TargetState, WaitOptions, WaitOutcome};
use tracing::{debug, info, warn};

/// Exact text of the refresh confirmation popup
pub const SUCCESS_POPUP_TEXT: &str = "Refreshed Successfully.";

/// Selector of the popup's OK button
pub const POPUP_OK_BUTTON: &str = "#popup_ok";

/// Default bound for the popup to appear (6 seconds)
pub const DEFAULT_POPUP_TIMEOUT_MS: u64 = 6_000;

/// Default bound for the OK button to become actionable (3 seconds)
pub const DEFAULT_DISMISS_TIMEOUT_MS: u64 = 3_000;

/// Detects and dismisses the refresh confirmation popup
#[derive(Debug, Clone)]
pub struct PopupReconciler {
    popup: Selector,
    ok_button: Selector,
    appear: WaitOptions,
    dismiss_bound: WaitOptions,
}

impl Default for PopupReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupReconciler {
    /// Create a reconciler for the standard confirmation popup
    #[must_use]
    pub fn new() -> Self {
        Self {
            popup: Selector::text(SUCCESS_POPUP_TEXT),
            ok_button: Selector::css(POPUP_OK_BUTTON),
            appear: WaitOptions::new().with_timeout(DEFAULT_POPUP_TIMEOUT_MS),
            dismiss_bound: WaitOptions::new().with_timeout(DEFAULT_DISMISS_TIMEOUT_MS),
        }
    }

    /// Override the popup selector
    #[must_use]
    pub fn with_popup(mut self, popup: Selector) -> Self {
        self.popup = popup;
        self
    }

    /// Override the OK-button selector
    #[must_use]
    pub fn with_ok_button(mut self, ok_button: Selector) -> Self {
        self.ok_button = ok_button;
        self
    }

    /// Override the appearance bound
    #[must_use]
    pub fn with_appear(mut self, appear: WaitOptions) -> Self {
        self.appear = appear;
        self
    }

    /// Override the dismissal bound
    #[must_use]
    pub fn with_dismiss_bound(mut self, bound: WaitOptions) -> Self {
        self.dismiss_bound = bound;
        self
    }

    /// Single bounded attempt to see the popup
    #[must_use]
    pub fn wait_for_popup(&self, page: &PageModel) -> WaitOutcome {
        await_state(page, &self.popup, TargetState::Visible, &self.appear)
    }

    /// Strict dismissal: require the OK control to be visible and enabled,
    /// then click it.
    pub fn dismiss(&self, page: &PageModel) -> VigilarResult<()> {
        let visible = await_state(
            page,
            &self.ok_button,
            TargetState::Visible,
            &self.dismiss_bound,
        );
        if !visible.satisfied {
            return Err(VigilarError::ElementNotFound {
                selector: self.ok_button.describe(),
            });
        }
        let enabled = await_state(
            page,
            &self.ok_button,
            TargetState::Enabled,
            &self.dismiss_bound,
        );
        if !enabled.satisfied {
            return Err(VigilarError::ControlNotReady {
                control: self.ok_button.describe(),
            });
        }
        page.click(&self.ok_button)?;
        info!("clicked OK on the success popup");
        Ok(())
    }

    /// Tolerant dismissal: repeat detect-and-click up to the policy budget.
    ///
    /// Returns `Ok(true)` once clicked, and `Ok(false)` (a warning, not a
    /// failure) when the popup never appears. A popup whose OK button is
    /// disabled still aborts hard, since a confirmation that cannot be
    /// closed blocks the page.
    pub fn retry_dismiss(&self, page: &PageModel, policy: &RetryPolicy) -> VigilarResult<bool> {
        let dismissed = retry(policy, |attempt| {
            debug!(attempt, max = policy.max_attempts, "waiting for success popup");
            let popup_visible = page.query(&self.popup).is_some_and(|s| s.visible);
            if !popup_visible {
                return Ok(None);
            }
            info!("success popup appeared");
            let ok_visible = page.query(&self.ok_button).is_some_and(|s| s.visible);
            if !ok_visible {
                return Ok(None);
            }
            page.click(&self.ok_button)?;
            info!("clicked OK on the success popup");
            Ok(Some(()))
        })?;

        if dismissed.is_none() {
            warn!(
                attempts = policy.max_attempts,
                "success popup did not appear after all retries"
            );
            return Ok(false);
        }
        Ok(true)
    }
}
