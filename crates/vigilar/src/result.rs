//! Result and error types for Vigilar.

use thiserror::Error;

/// Result type for Vigilar operations
pub type VigilarResult<T> = Result<T, VigilarError>;

/// Errors that can occur in Vigilar
///
/// Ordinary timeouts are NOT errors: bounded waits report them as negative
/// [`WaitOutcome`](crate::wait::WaitOutcome)s so call sites can branch.
/// The variants here are reserved for conditions that abort the current
/// scenario: protocol violations, missing DOM scaffold, bad configuration.
#[derive(Debug, Error)]
pub enum VigilarError {
    /// Named iframe never became visible or has no attached document
    #[error("Frame '{name}' not found")]
    FrameNotFound {
        /// The iframe `name` attribute
        name: String,
    },

    /// A load-bearing element could not be located
    #[error("Element '{selector}' not found")]
    ElementNotFound {
        /// Selector expression that failed to match
        selector: String,
    },

    /// Control is visible but cannot be interacted with
    #[error("Control '{control}' is visible but not interactable")]
    ControlNotReady {
        /// Selector of the unavailable control
        control: String,
    },

    /// Progress percentage moved backwards within one monitoring run
    #[error("Progress regressed: {from}% -> {to}%")]
    ProgressRegression {
        /// Percentage observed earlier in the run
        from: u8,
        /// Lower percentage observed later
        to: u8,
    },

    /// Expected DOM scaffold is missing entirely
    #[error("Page scaffold missing: {message}")]
    ScaffoldMissing {
        /// What was expected on the page
        message: String,
    },

    /// Scan status response body could not be parsed
    #[error("Malformed scan status body: {message}")]
    MalformedScanBody {
        /// Parse failure detail
        message: String,
    },

    /// No registered step definition matches a scenario phrase
    #[error("No step definition matches '{phrase}'")]
    StepUnmatched {
        /// The unmatched phrase
        phrase: String,
    },

    /// Required environment value is missing
    #[error("Environment variable '{name}' is not set")]
    EnvVar {
        /// Variable name
        name: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_not_found_display() {
        let err = VigilarError::FrameNotFound {
            name: "mainFrame".to_string(),
        };
        assert_eq!(err.to_string(), "Frame 'mainFrame' not found");
    }

    #[test]
    fn test_regression_display() {
        let err = VigilarError::ProgressRegression { from: 70, to: 30 };
        assert_eq!(err.to_string(), "Progress regressed: 70% -> 30%");
    }

    #[test]
    fn test_control_not_ready_display() {
        let err = VigilarError::ControlNotReady {
            control: "#popup_ok".to_string(),
        };
        assert!(err.to_string().contains("#popup_ok"));
        assert!(err.to_string().contains("not interactable"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VigilarError = io.into();
        assert!(matches!(err, VigilarError::Io(_)));
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: VigilarError = json_err.into();
        assert!(matches!(err, VigilarError::Json(_)));
    }
}
