//! Network response interception for the scan status channel.
//!
//! The console's client polls a fixed status endpoint while a library
//! refresh runs; inspecting those responses is the second, DOM-independent
//! way to track completion. The feed here is the capture side of that
//! interception: a browser bridge (or a test) pushes observed responses,
//! and the monitor drains the ones matching the status endpoint.
//!
//! ## Toyota Way Application
//!
//! - **Poka-Yoke**: typed URL patterns prevent invalid route matching
//! - **Jidoka**: a regressed percentage aborts the run immediately

use crate::progress::{MonotonicGuard, ProgressSample, SampleSource};
use crate::result::{VigilarError, VigilarResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Path of the scan status endpoint polled by the console client
pub const SCAN_STATUS_ENDPOINT: &str = "/xml/upnp_prescan.xml";

/// Default bound for the network channel (60 seconds)
pub const DEFAULT_NETWORK_TIMEOUT_MS: u64 = 60_000;

// =============================================================================
// URL PATTERNS
// =============================================================================

/// Pattern for matching response URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., `**/xml/*.xml`)
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Simple glob matching for URLs
    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.is_empty() {
            return url.is_empty();
        }

        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if let Some(found) = url[pos..].find(part) {
                if i == 0 && found != 0 {
                    return false;
                }
                pos += found + part.len();
            } else {
                return false;
            }
        }

        pattern.ends_with('*') || pos == url.len()
    }
}

// =============================================================================
// CAPTURED RESPONSES
// =============================================================================

/// A captured network response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptedResponse {
    /// Response URL
    pub url: String,
    /// Response body
    pub body: String,
    /// Milliseconds since interception start
    pub timestamp_ms: u64,
}

impl InterceptedResponse {
    /// Create a captured response
    #[must_use]
    pub fn new(url: impl Into<String>, body: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            timestamp_ms,
        }
    }
}

/// Shared queue of captured responses.
///
/// The producing side (browser bridge or test) pushes; a monitor drains.
/// Cheap to clone; clones share the queue.
#[derive(Debug, Clone, Default)]
pub struct ResponseFeed {
    queue: Arc<Mutex<VecDeque<InterceptedResponse>>>,
}

impl ResponseFeed {
    /// Create an empty feed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a captured response
    pub fn push(&self, response: InterceptedResponse) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(response);
        }
    }

    /// Pop the next response matching the pattern, discarding earlier
    /// non-matching traffic
    #[must_use]
    pub fn next_matching(&self, pattern: &UrlPattern) -> Option<InterceptedResponse> {
        let mut queue = self.queue.lock().ok()?;
        while let Some(response) = queue.pop_front() {
            if pattern.matches(&response.url) {
                return Some(response);
            }
        }
        None
    }

    /// Number of responses currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Whether the feed is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// SCAN STATUS BODY
// =============================================================================

/// Parsed scan status fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    /// Completion percentage
    pub percent: u8,
    /// Whether the scan reported itself finished
    pub complete: bool,
}

impl ScanStatus {
    /// Parse the status body's `percent`/`complete` fields.
    ///
    /// An absent field counts as 0 (the scan may not have started); a field
    /// that is present but non-numeric is a malformed body.
    pub fn parse(body: &str) -> VigilarResult<Self> {
        let percent = extract_field(body, "percent")?.unwrap_or(0);
        let complete = extract_field(body, "complete")?.unwrap_or(0);
        Ok(Self {
            percent: percent.clamp(0, 100) as u8,
            complete: complete == 1,
        })
    }

    /// Whether the scan is underway (strictly between not-started and done)
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.percent > 0 && self.percent < 100
    }

    /// Whether the scan is finished on both fields
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.percent == 100 && self.complete
    }
}

fn extract_field(body: &str, field: &str) -> VigilarResult<Option<i64>> {
    let pattern = format!("<{field}>(.*?)</{field}>");
    let re = regex::Regex::new(&pattern).map_err(|e| VigilarError::MalformedScanBody {
        message: e.to_string(),
    })?;
    match re.captures(body) {
        None => Ok(None),
        Some(caps) => {
            let raw = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            raw.parse::<i64>()
                .map(Some)
                .map_err(|_| VigilarError::MalformedScanBody {
                    message: format!("field '{field}' is not an integer: {raw:?}"),
                })
        }
    }
}

// =============================================================================
// NETWORK STRATEGY
// =============================================================================

/// Options for the network monitoring strategy
#[derive(Debug, Clone)]
pub struct NetworkMonitorOptions {
    /// Pattern selecting scan status responses
    pub endpoint: UrlPattern,
    /// Overall bound for the wait
    pub timeout: Duration,
    /// Delay between feed polls
    pub poll_interval: Duration,
}

impl Default for NetworkMonitorOptions {
    fn default() -> Self {
        Self {
            endpoint: UrlPattern::Contains(SCAN_STATUS_ENDPOINT.to_string()),
            timeout: Duration::from_millis(DEFAULT_NETWORK_TIMEOUT_MS),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl NetworkMonitorOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint pattern
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: UrlPattern) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the overall bound
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the feed poll delay
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Network-channel progress monitor.
///
/// Drains scan status responses from a feed and evaluates the same
/// monotonicity invariant as the DOM channel. One monitor covers one
/// monitoring run.
#[derive(Debug)]
pub struct NetworkProgressMonitor {
    options: NetworkMonitorOptions,
    guard: MonotonicGuard,
    samples: Vec<ProgressSample>,
}

impl Default for NetworkProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkProgressMonitor {
    /// Create a monitor with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(NetworkMonitorOptions::default())
    }

    /// Create a monitor with custom options
    #[must_use]
    pub fn with_options(options: NetworkMonitorOptions) -> Self {
        Self {
            options,
            guard: MonotonicGuard::new(),
            samples: Vec::new(),
        }
    }

    /// Wait for a status response reporting the scan underway
    /// (`0 < percent < 100`); `Ok(false)` on timeout.
    pub fn wait_until_running(&mut self, feed: &ResponseFeed) -> VigilarResult<bool> {
        self.wait_for(feed, ScanStatus::is_running)
    }

    /// Wait for a status response reporting full completion
    /// (`percent == 100` AND `complete == 1`); `Ok(false)` on timeout.
    pub fn wait_until_complete(&mut self, feed: &ResponseFeed) -> VigilarResult<bool> {
        self.wait_for(feed, ScanStatus::is_complete)
    }

    fn wait_for<F>(&mut self, feed: &ResponseFeed, predicate: F) -> VigilarResult<bool>
    where
        F: Fn(&ScanStatus) -> bool,
    {
        let started = Instant::now();
        loop {
            while let Some(response) = feed.next_matching(&self.options.endpoint) {
                let status = ScanStatus::parse(&response.body)?;
                self.guard.accept(status.percent)?;
                self.samples.push(ProgressSample {
                    percent: status.percent,
                    complete: status.complete,
                    source: SampleSource::Network,
                    observed_at: started.elapsed(),
                });
                debug!(url = %response.url, percent = status.percent, complete = status.complete, "scan status response");
                if predicate(&status) {
                    return Ok(true);
                }
            }
            if started.elapsed() >= self.options.timeout {
                return Ok(false);
            }
            std::thread::sleep(self.options.poll_interval);
        }
    }

    /// All observations recorded during the run
    #[must_use]
    pub fn samples(&self) -> &[ProgressSample] {
        &self.samples
    }

    /// Highest percentage observed so far
    #[must_use]
    pub const fn last_percent(&self) -> Option<u8> {
        self.guard.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_body(percent: u32, complete: u32) -> String {
        format!("<root><percent>{percent}</percent><complete>{complete}</complete></root>")
    }

    fn fast_options() -> NetworkMonitorOptions {
        NetworkMonitorOptions::new()
            .with_timeout(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(5))
    }

    mod url_pattern_tests {
        use super::*;

        #[test]
        fn test_exact_match() {
            let pattern = UrlPattern::Exact("http://192.168.7.15/xml/upnp_prescan.xml".into());
            assert!(pattern.matches("http://192.168.7.15/xml/upnp_prescan.xml"));
            assert!(!pattern.matches("http://192.168.7.15/xml/other.xml"));
        }

        #[test]
        fn test_contains_match() {
            let pattern = UrlPattern::Contains(SCAN_STATUS_ENDPOINT.into());
            assert!(pattern.matches("http://device/xml/upnp_prescan.xml?t=1"));
            assert!(!pattern.matches("http://device/web/home.html"));
        }

        #[test]
        fn test_prefix_match() {
            let pattern = UrlPattern::Prefix("http://device/".into());
            assert!(pattern.matches("http://device/xml/upnp_prescan.xml"));
            assert!(!pattern.matches("https://other/"));
        }

        #[test]
        fn test_regex_match() {
            let pattern = UrlPattern::Regex(r"upnp_prescan\.xml$".into());
            assert!(pattern.matches("http://device/xml/upnp_prescan.xml"));
            assert!(!pattern.matches("http://device/xml/upnp_prescan.xml?x=1"));
        }

        #[test]
        fn test_invalid_regex_never_matches() {
            let pattern = UrlPattern::Regex("(".into());
            assert!(!pattern.matches("anything"));
        }

        #[test]
        fn test_glob_match() {
            let pattern = UrlPattern::Glob("*/xml/*.xml".into());
            assert!(pattern.matches("http://device/xml/upnp_prescan.xml"));
            assert!(!pattern.matches("http://device/web/home.html"));
        }

        #[test]
        fn test_any_matches_everything() {
            assert!(UrlPattern::Any.matches(""));
            assert!(UrlPattern::Any.matches("http://device/"));
        }
    }

    mod feed_tests {
        use super::*;

        #[test]
        fn test_push_and_drain_matching() {
            let feed = ResponseFeed::new();
            feed.push(InterceptedResponse::new("/web/home.html", "", 0));
            feed.push(InterceptedResponse::new(
                "/xml/upnp_prescan.xml",
                status_body(40, 0),
                10,
            ));

            let pattern = UrlPattern::Contains(SCAN_STATUS_ENDPOINT.into());
            let response = feed.next_matching(&pattern).unwrap();
            assert_eq!(response.url, "/xml/upnp_prescan.xml");
            // Non-matching traffic before the hit was discarded
            assert!(feed.is_empty());
        }

        #[test]
        fn test_empty_feed_yields_none() {
            let feed = ResponseFeed::new();
            assert!(feed.next_matching(&UrlPattern::Any).is_none());
        }

        #[test]
        fn test_clones_share_queue() {
            let feed = ResponseFeed::new();
            let producer = feed.clone();
            producer.push(InterceptedResponse::new("/xml/upnp_prescan.xml", "", 0));
            assert_eq!(feed.len(), 1);
        }
    }

    mod scan_status_tests {
        use super::*;

        #[test]
        fn test_parse_running() {
            let status = ScanStatus::parse(&status_body(42, 0)).unwrap();
            assert_eq!(status.percent, 42);
            assert!(!status.complete);
            assert!(status.is_running());
            assert!(!status.is_complete());
        }

        #[test]
        fn test_parse_complete() {
            let status = ScanStatus::parse(&status_body(100, 1)).unwrap();
            assert!(status.is_complete());
            assert!(!status.is_running());
        }

        #[test]
        fn test_hundred_percent_without_complete_flag() {
            let status = ScanStatus::parse(&status_body(100, 0)).unwrap();
            assert!(!status.is_complete());
            assert!(!status.is_running());
        }

        #[test]
        fn test_zero_is_not_running() {
            let status = ScanStatus::parse(&status_body(0, 0)).unwrap();
            assert!(!status.is_running());
        }

        #[test]
        fn test_missing_fields_default_to_zero() {
            let status = ScanStatus::parse("<root></root>").unwrap();
            assert_eq!(status.percent, 0);
            assert!(!status.complete);
        }

        #[test]
        fn test_non_numeric_field_is_malformed() {
            let err = ScanStatus::parse("<percent>soon</percent>").unwrap_err();
            assert!(matches!(err, VigilarError::MalformedScanBody { .. }));
        }

        #[test]
        fn test_whitespace_tolerated() {
            let status = ScanStatus::parse("<percent> 55 </percent>").unwrap();
            assert_eq!(status.percent, 55);
        }
    }

    mod monitor_tests {
        use super::*;

        fn feed_with(bodies: &[(u32, u32)]) -> ResponseFeed {
            let feed = ResponseFeed::new();
            for (i, (percent, complete)) in bodies.iter().enumerate() {
                feed.push(InterceptedResponse::new(
                    "/xml/upnp_prescan.xml",
                    status_body(*percent, *complete),
                    i as u64 * 10,
                ));
            }
            feed
        }

        #[test]
        fn test_wait_until_running() {
            let feed = feed_with(&[(0, 0), (30, 0)]);
            let mut monitor = NetworkProgressMonitor::with_options(fast_options());
            assert!(monitor.wait_until_running(&feed).unwrap());
            assert_eq!(monitor.last_percent(), Some(30));
        }

        #[test]
        fn test_wait_until_complete() {
            let feed = feed_with(&[(30, 0), (70, 0), (100, 1)]);
            let mut monitor = NetworkProgressMonitor::with_options(fast_options());
            assert!(monitor.wait_until_complete(&feed).unwrap());
            assert_eq!(monitor.samples().len(), 3);
            assert!(monitor.samples().iter().all(|s| s.source == SampleSource::Network));
        }

        #[test]
        fn test_timeout_without_completion() {
            let feed = feed_with(&[(30, 0)]);
            let mut monitor = NetworkProgressMonitor::with_options(fast_options());
            assert!(!monitor.wait_until_complete(&feed).unwrap());
        }

        #[test]
        fn test_regression_across_responses() {
            let feed = feed_with(&[(70, 0), (30, 0)]);
            let mut monitor = NetworkProgressMonitor::with_options(fast_options());
            let err = monitor.wait_until_complete(&feed).unwrap_err();
            assert!(
                matches!(err, VigilarError::ProgressRegression { from: 70, to: 30 })
            );
        }

        #[test]
        fn test_unrelated_traffic_ignored() {
            let feed = ResponseFeed::new();
            feed.push(InterceptedResponse::new("/web/home.html", "irrelevant", 0));
            feed.push(InterceptedResponse::new(
                "/xml/upnp_prescan.xml",
                status_body(100, 1),
                5,
            ));
            let mut monitor = NetworkProgressMonitor::with_options(fast_options());
            assert!(monitor.wait_until_complete(&feed).unwrap());
            assert_eq!(monitor.samples().len(), 1);
        }
    }
}
