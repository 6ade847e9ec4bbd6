//! Simulated device console.
//!
//! Builds a fully-populated [`PageModel`] of the management console (login
//! form, landing page, management menus, the `mainFrame` iframe with the
//! refresh control and progress bar, and the confirmation popup) with
//! knobs for the asynchronous behaviors the suite exercises: how the
//! progress value climbs, when the popup shows, whether controls are
//! enabled. Scenario and integration tests script a console here instead of
//! standing up a live device.

use crate::frame::MAIN_FRAME;
use crate::network::{InterceptedResponse, ResponseFeed, SCAN_STATUS_ENDPOINT};
use crate::page::{ElementSpec, PageModel};
use crate::pages::{APPLICATION_MENU, MANAGEMENT_MENU, MEDIA_TAB_TEXT, PROGRESS_BAR, REFRESH_BUTTON};
use crate::popup::{POPUP_OK_BUTTON, SUCCESS_POPUP_TEXT};
use crate::progress::PROGRESS_ATTRIBUTE;
use crate::workflow::REFRESH_CONTROL_TEXT;

const MEDIA_TAB: &str = "#m_2";
const SECOND_TAB: &str = "#m_1";
const POPUP_TEXT: &str = "#popup_text";

/// Builder for a scripted console
#[derive(Debug, Clone)]
pub struct SimulatedConsole {
    progress: Option<Vec<String>>,
    bar_reveal_after: Option<u32>,
    popup_present: bool,
    popup_reveal_after: Option<u32>,
    ok_enabled: bool,
    refresh_visible: bool,
    refresh_enabled: bool,
    frame_attached: bool,
}

impl Default for SimulatedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedConsole {
    /// An idle console: no refresh running, no popup pending, Refresh All
    /// ready to click
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: None,
            bar_reveal_after: None,
            popup_present: false,
            popup_reveal_after: None,
            ok_enabled: true,
            refresh_visible: true,
            refresh_enabled: true,
            frame_attached: true,
        }
    }

    /// Show a progress bar climbing through the given percentages
    #[must_use]
    pub fn with_progress_sequence<V: Into<String>>(mut self, values: Vec<V>) -> Self {
        self.progress = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Delay the progress bar until its Nth observation
    #[must_use]
    pub const fn with_bar_revealed_after(mut self, observations: u32) -> Self {
        self.bar_reveal_after = Some(observations);
        self
    }

    /// Show the confirmation popup immediately
    #[must_use]
    pub const fn with_popup(mut self) -> Self {
        self.popup_present = true;
        self.popup_reveal_after = None;
        self
    }

    /// Show the confirmation popup on its Nth observation
    #[must_use]
    pub const fn with_popup_after(mut self, observations: u32) -> Self {
        self.popup_present = true;
        self.popup_reveal_after = Some(observations);
        self
    }

    /// Render the popup's OK button disabled
    #[must_use]
    pub const fn with_ok_disabled(mut self) -> Self {
        self.ok_enabled = false;
        self
    }

    /// Render the refresh control disabled
    #[must_use]
    pub const fn with_refresh_disabled(mut self) -> Self {
        self.refresh_enabled = false;
        self
    }

    /// Hide the refresh control entirely
    #[must_use]
    pub const fn with_refresh_hidden(mut self) -> Self {
        self.refresh_visible = false;
        self
    }

    /// Leave the iframe without an attached document
    #[must_use]
    pub const fn without_frame(mut self) -> Self {
        self.frame_attached = false;
        self
    }

    /// Materialize the console as a page model
    #[must_use]
    pub fn build(&self) -> PageModel {
        let page = PageModel::new();

        // Login form
        page.install(ElementSpec::new("#prompt").text("Please Select Your Account:"));
        page.install(ElementSpec::new("#f_type1"));
        page.install(ElementSpec::new("#f_type2"));
        page.install(ElementSpec::new("#f_username"));
        page.install(ElementSpec::new("#pre_pwd"));
        page.install(ElementSpec::new("#submit_but").text("Log In"));
        page.install(ElementSpec::new("#id_warn").visible(false));

        // Landing page and menus
        page.install(ElementSpec::new("#my_folder").text("My Folder"));
        page.install(ElementSpec::new(MANAGEMENT_MENU).text("Management"));
        page.install(ElementSpec::new(APPLICATION_MENU).text("Application Management"));
        page.install(ElementSpec::new(MEDIA_TAB).text(MEDIA_TAB_TEXT));
        page.install(ElementSpec::new(SECOND_TAB).text("FTP Server"));

        // Working iframe
        page.install(ElementSpec::new(format!("iframe[name=\"{MAIN_FRAME}\"]")));
        if self.frame_attached {
            let frame = PageModel::new();
            frame.install(
                ElementSpec::new(REFRESH_BUTTON)
                    .text(REFRESH_CONTROL_TEXT)
                    .visible(self.refresh_visible)
                    .enabled(self.refresh_enabled),
            );
            if let Some(values) = &self.progress {
                let mut bar = ElementSpec::new(PROGRESS_BAR)
                    .attribute_sequence(PROGRESS_ATTRIBUTE, values.clone());
                if let Some(observations) = self.bar_reveal_after {
                    bar = bar.reveal_after(observations);
                }
                frame.install(bar);
            }
            page.attach_frame(MAIN_FRAME, frame);
        }

        // Confirmation popup lives in the top document
        if self.popup_present {
            let mut popup = ElementSpec::new(POPUP_TEXT).text(SUCCESS_POPUP_TEXT);
            if let Some(observations) = self.popup_reveal_after {
                popup = popup.reveal_after(observations);
            }
            page.install(popup);
            page.install(
                ElementSpec::new(POPUP_OK_BUTTON)
                    .text("OK")
                    .enabled(self.ok_enabled),
            );
        }

        page
    }

    /// A scan-status response feed matching the progress sequence, reporting
    /// `complete=1` once the percentage reaches 100
    #[must_use]
    pub fn scan_feed(&self) -> ResponseFeed {
        let feed = ResponseFeed::new();
        if let Some(values) = &self.progress {
            for (i, value) in values.iter().enumerate() {
                let percent: u32 = value.trim().parse().unwrap_or(0);
                let complete = u32::from(percent >= 100);
                feed.push(InterceptedResponse::new(
                    SCAN_STATUS_ENDPOINT,
                    format!(
                        "<root><percent>{percent}</percent><complete>{complete}</complete></root>"
                    ),
                    i as u64 * 100,
                ));
            }
        }
        feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    #[test]
    fn test_idle_console_has_ready_refresh() {
        let page = SimulatedConsole::new().build();
        let frame = page.frame_document(MAIN_FRAME).unwrap();
        let snap = frame.query(&Selector::text(REFRESH_CONTROL_TEXT)).unwrap();
        assert!(snap.visible);
        assert!(snap.enabled);
        assert!(frame.query(&Selector::css(PROGRESS_BAR)).is_none());
    }

    #[test]
    fn test_progress_sequence_installed() {
        let page = SimulatedConsole::new()
            .with_progress_sequence(vec!["30", "70", "100"])
            .build();
        let frame = page.frame_document(MAIN_FRAME).unwrap();
        let bar = Selector::css(PROGRESS_BAR);
        assert_eq!(frame.attribute(&bar, PROGRESS_ATTRIBUTE).unwrap(), "30");
        assert_eq!(frame.attribute(&bar, PROGRESS_ATTRIBUTE).unwrap(), "70");
    }

    #[test]
    fn test_popup_knobs() {
        let page = SimulatedConsole::new().with_popup_after(2).build();
        let popup = Selector::text(SUCCESS_POPUP_TEXT);
        assert!(!page.query(&popup).unwrap().visible);
        assert!(page.query(&popup).unwrap().visible);
    }

    #[test]
    fn test_without_frame() {
        let page = SimulatedConsole::new().without_frame().build();
        assert!(page.frame_document(MAIN_FRAME).is_none());
    }

    #[test]
    fn test_scan_feed_reports_completion() {
        let sim = SimulatedConsole::new().with_progress_sequence(vec!["30", "100"]);
        let feed = sim.scan_feed();
        assert_eq!(feed.len(), 2);
        let pattern = crate::network::UrlPattern::Contains(SCAN_STATUS_ENDPOINT.into());
        feed.next_matching(&pattern).unwrap();
        let last = feed.next_matching(&pattern).unwrap();
        assert!(last.body.contains("<complete>1</complete>"));
    }
}
