//! Page objects for the device management console.
//!
//! Each page object encapsulates the selectors and operations of one screen
//! and holds a clone of the shared [`PageModel`](crate::page::PageModel).
//! Operations that can legitimately come up empty return
//! `VigilarResult<bool>` so callers can tell "condition false" apart from
//! "query itself failed".

mod home;
mod login;
mod management;

pub use home::HomePage;
pub use login::{LoginPage, BAD_CREDENTIALS_MESSAGE};
pub use management::{
    ManagementPage, APPLICATION_MENU, MANAGEMENT_MENU, MEDIA_TAB_TEXT, PROGRESS_BAR,
    REFRESH_BUTTON,
};

/// Trait for page objects representing one console screen.
pub trait ConsolePage {
    /// URL pattern that matches this page (e.g., `/web/home.html`)
    fn url_pattern(&self) -> &str;

    /// Check if the page is fully loaded and ready for interaction
    fn is_loaded(&self) -> bool {
        true
    }

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
