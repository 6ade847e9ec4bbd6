//! Home page object.

use crate::page::PageModel;
use crate::pages::ConsolePage;
use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use crate::wait::{await_state, TargetState, WaitOptions};

const HOME_MARKER: &str = "My Folder";

/// Page object for the console landing page
#[derive(Debug, Clone)]
pub struct HomePage {
    page: PageModel,
    options: WaitOptions,
}

impl HomePage {
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

    /// Wait for the landing page marker to be visible
    pub fn wait_loaded(&self) -> VigilarResult<()> {
        let marker = Selector::text(HOME_MARKER);
        let outcome = await_state(&self.page, &marker, TargetState::Visible, &self.options);
        if outcome.satisfied {
            Ok(())
        } else {
            Err(VigilarError::AssertionFailed {
                message: format!("home marker {HOME_MARKER:?} not visible"),
            })
        }
    }
}

impl ConsolePage for HomePage {
    fn url_pattern(&self) -> &str {
        "/web/home.html"
    }

    fn is_loaded(&self) -> bool {
        self.page
            .query(&Selector::text(HOME_MARKER))
            .is_some_and(|s| s.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ElementSpec;

    fn fast() -> WaitOptions {
        WaitOptions::new().with_timeout(50).with_poll_interval(5)
    }

    #[test]
    fn test_wait_loaded() {
        let page = PageModel::new();
        page.install(ElementSpec::new("#my_folder").text(HOME_MARKER));
        HomePage::new(page).with_options(fast()).wait_loaded().unwrap();
    }

    #[test]
    fn test_wait_loaded_failure() {
        let home = HomePage::new(PageModel::new()).with_options(fast());
        let err = home.wait_loaded().unwrap_err();
        assert!(matches!(err, VigilarError::AssertionFailed { .. }));
        assert!(!home.is_loaded());
    }

    #[test]
    fn test_url_pattern() {
        let home = HomePage::new(PageModel::new());
        assert_eq!(home.url_pattern(), "/web/home.html");
    }
}
