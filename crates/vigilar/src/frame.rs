//! Embedded sub-document resolution.
//!
//! The console renders its working area inside an iframe. A resolved
//! [`FrameHandle`] is valid only while the iframe stays attached; client-side
//! navigation can tear it down and recreate it without notice, so callers
//! re-resolve before every scoped query instead of caching the handle.

use crate::page::PageModel;
use crate::result::{VigilarError, VigilarResult};
use crate::selector::Selector;
use crate::wait::{await_state, TargetState, WaitOptions};

/// Name of the console's main working iframe
pub const MAIN_FRAME: &str = "mainFrame";

/// Default bound for the iframe element to become visible (3 seconds)
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 3_000;

/// An ownership-free reference to a resolved sub-document
#[derive(Debug, Clone)]
pub struct FrameHandle {
    name: String,
    document: PageModel,
}

impl FrameHandle {
    /// The iframe `name` attribute this handle was resolved from
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sub-document as a query root
    #[must_use]
    pub const fn document(&self) -> &PageModel {
        &self.document
    }
}

/// Resolves named iframes to addressable query roots.
///
/// Resolution is fail-fast and load-bearing: the orchestrator cannot make
/// progress without the frame, so absence is a hard
/// [`FrameNotFound`](VigilarError::FrameNotFound) rather than a negative
/// outcome.
#[derive(Debug, Clone)]
pub struct FrameResolver {
    options: WaitOptions,
}

impl Default for FrameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameResolver {
    /// Create a resolver with the default short bound
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: WaitOptions::new().with_timeout(DEFAULT_FRAME_TIMEOUT_MS),
        }
    }

    /// Create a resolver with custom wait options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Resolve the named iframe to a scoped query root.
    ///
    /// The iframe element itself must become visible within the bound AND
    /// carry an attached content document.
    pub fn resolve(&self, page: &PageModel, name: &str) -> VigilarResult<FrameHandle> {
        let selector = Selector::css(format!("iframe[name=\"{name}\"]"));
        let outcome = await_state(page, &selector, TargetState::Visible, &self.options);
        if !outcome.satisfied {
            return Err(VigilarError::FrameNotFound {
                name: name.to_string(),
            });
        }
        let document = page
            .frame_document(name)
            .ok_or_else(|| VigilarError::FrameNotFound {
                name: name.to_string(),
            })?;
        Ok(FrameHandle {
            name: name.to_string(),
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ElementSpec;

    fn resolver() -> FrameResolver {
        FrameResolver::with_options(WaitOptions::new().with_timeout(50).with_poll_interval(5))
    }

    fn console_with_frame() -> PageModel {
        let page = PageModel::new();
        page.install(ElementSpec::new(format!("iframe[name=\"{MAIN_FRAME}\"]")));
        let frame_doc = PageModel::new();
        frame_doc.install(ElementSpec::new("#refresh_button").text("Refresh All"));
        page.attach_frame(MAIN_FRAME, frame_doc);
        page
    }

    #[test]
    fn test_resolve_success() {
        let page = console_with_frame();
        let handle = resolver().resolve(&page, MAIN_FRAME).unwrap();
        assert_eq!(handle.name(), MAIN_FRAME);
        assert!(handle
            .document()
            .query(&Selector::css("#refresh_button"))
            .is_some());
    }

    #[test]
    fn test_missing_iframe_element() {
        let page = PageModel::new();
        page.attach_frame(MAIN_FRAME, PageModel::new());
        let err = resolver().resolve(&page, MAIN_FRAME).unwrap_err();
        assert!(matches!(err, VigilarError::FrameNotFound { .. }));
    }

    #[test]
    fn test_hidden_iframe_element() {
        let page = console_with_frame();
        page.set_visible(&format!("iframe[name=\"{MAIN_FRAME}\"]"), false);
        let err = resolver().resolve(&page, MAIN_FRAME).unwrap_err();
        assert!(matches!(err, VigilarError::FrameNotFound { .. }));
    }

    #[test]
    fn test_iframe_without_content_document() {
        let page = PageModel::new();
        page.install(ElementSpec::new(format!("iframe[name=\"{MAIN_FRAME}\"]")));
        let err = resolver().resolve(&page, MAIN_FRAME).unwrap_err();
        assert!(matches!(err, VigilarError::FrameNotFound { name } if name == MAIN_FRAME));
    }

    #[test]
    fn test_idempotent_re_resolution() {
        let page = console_with_frame();
        let resolver = resolver();
        let first = resolver.resolve(&page, MAIN_FRAME).unwrap();
        let second = resolver.resolve(&page, MAIN_FRAME).unwrap();
        // Without an intervening navigation, both handles address the same
        // document and queries behave identically.
        let selector = Selector::css("#refresh_button");
        assert_eq!(
            first.document().query(&selector).unwrap().text,
            second.document().query(&selector).unwrap().text
        );
    }

    #[test]
    fn test_resolution_after_frame_recreated() {
        let page = console_with_frame();
        let resolver = resolver();
        resolver.resolve(&page, MAIN_FRAME).unwrap();

        // Client-side navigation replaces the frame document
        page.detach_frame(MAIN_FRAME);
        let fresh = PageModel::new();
        fresh.install(ElementSpec::new("#progressbar"));
        page.attach_frame(MAIN_FRAME, fresh);

        let handle = resolver.resolve(&page, MAIN_FRAME).unwrap();
        assert!(handle
            .document()
            .query(&Selector::css("#progressbar"))
            .is_some());
        assert!(handle
            .document()
            .query(&Selector::css("#refresh_button"))
            .is_none());
    }
}
