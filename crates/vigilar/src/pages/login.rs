//! Login page object.
//!
//! The console's login form switches shape with the account type: the
//! administrator logs in with a password alone, while a named user first
//! selects the user account radio and fills a login name. The
//! [`Credential`] variant drives that branch.

use crate::config::Credential;
use crate::page::PageModel;
use crate::pages::ConsolePage;
use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use crate::wait::{await_state, wait_until, TargetState, WaitOptions};
use tracing::info;

/// Error banner text for rejected credentials
pub const BAD_CREDENTIALS_MESSAGE: &str =
    "You entered an incorrect login name or password.Please try again.";

const USERNAME_INPUT: &str = "#f_username";
const PASSWORD_INPUT: &str = "#pre_pwd";
const LOGIN_BUTTON: &str = "#submit_but";
const ERROR_BANNER: &str = "#id_warn";
const USER_RADIO: &str = "#f_type2";
const ACCOUNT_PROMPT: &str = "Please Select Your Account:";

/// Page object for the console login screen
#[derive(Debug, Clone)]
pub struct LoginPage {
    page: PageModel,
    options: WaitOptions,
}

impl LoginPage {
    /// Create the page object over the shared document
    #[must_use]
    pub fn new(page: PageModel) -> Self {
        Self {
            page,
            options: WaitOptions::default(),
        }
    }

    /// Override wait bounds
    #[must_use]
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Fill the form for the given account and submit.
    ///
    /// Named accounts select the user radio and fill the login name first;
    /// the administrator goes straight to the password field.
    pub fn login(&self, credential: &Credential) -> VigilarResult<()> {
        if let Some(username) = credential.username() {
            self.require(USER_RADIO, TargetState::Visible)?;
            self.page.click(&Selector::css(USER_RADIO))?;
            self.require(USERNAME_INPUT, TargetState::Visible)?;
            self.page.fill(&Selector::css(USERNAME_INPUT), username)?;
        }
        self.require(PASSWORD_INPUT, TargetState::Visible)?;
        self.page
            .fill(&Selector::css(PASSWORD_INPUT), credential.password())?;
        self.require(LOGIN_BUTTON, TargetState::Enabled)?;
        self.page.click(&Selector::css(LOGIN_BUTTON))?;
        info!(account = ?credential.username(), "submitted login form");
        Ok(())
    }

    /// Assert the bad-credentials banner is shown with its exact text
    pub fn expect_bad_credentials(&self) -> VigilarResult<()> {
        let banner = Selector::css(ERROR_BANNER);
        let outcome = wait_until(
            || {
                self.page
                    .query(&banner)
                    .is_some_and(|s| s.visible && s.text == BAD_CREDENTIALS_MESSAGE)
            },
            &self.options,
        );
        if outcome.satisfied {
            Ok(())
        } else {
            Err(VigilarError::AssertionFailed {
                message: format!("expected error banner {BAD_CREDENTIALS_MESSAGE:?}"),
            })
        }
    }

    fn require(&self, css: &str, state: TargetState) -> VigilarResult<()> {
        let selector = Selector::css(css);
        let outcome = await_state(&self.page, &selector, state, &self.options);
        if outcome.satisfied {
            return Ok(());
        }
        match state {
            TargetState::Enabled => Err(VigilarError::ControlNotReady {
                control: css.to_string(),
            }),
            _ => Err(VigilarError::ElementNotFound {
                selector: css.to_string(),
            }),
        }
    }
}

impl ConsolePage for LoginPage {
    fn url_pattern(&self) -> &str {
        "/web/login.html"
    }

    fn is_loaded(&self) -> bool {
        self.page
            .query(&Selector::text(ACCOUNT_PROMPT))
            .is_some_and(|s| s.visible)
    }
}
