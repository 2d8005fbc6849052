use chromiumoxide::error::CdpError;
use thiserror::Error;

/// A single browser operation failed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("browser protocol error: {0}")]
    Browser(#[from] CdpError),

    #[error("unexpected script result for {operation}: {source}")]
    Script {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no option matching \"{location}\" in the location filter")]
    FilterOptionNotFound { location: String },

    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    #[error("no page is open")]
    NotOpen,
}

impl SessionError {
    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::Browser(_) | SessionError::Timeout { .. } | SessionError::Script { .. }
        )
    }
}

/// A failure that ends the run before any page was read.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("initial load of {url} failed after {attempts} attempts: {last_error}")]
    InitialLoad {
        url: String,
        attempts: u32,
        #[source]
        last_error: SessionError,
    },

    #[error("could not apply location filter \"{location}\": {source}")]
    Filter {
        location: String,
        #[source]
        source: SessionError,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid CSS selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_transient() {
        let err = SessionError::Timeout {
            operation: "page_html",
            timeout_secs: 30,
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "page_html timed out after 30s");
    }

    #[test]
    fn missing_filter_option_is_not_transient() {
        let err = SessionError::FilterOptionNotFound {
            location: "Atlantis".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn initial_load_error_includes_cause() {
        let err = NavigationError::InitialLoad {
            url: "https://example.test".to_string(),
            attempts: 3,
            last_error: SessionError::NotOpen,
        };
        assert_eq!(
            err.to_string(),
            "initial load of https://example.test failed after 3 attempts: no page is open"
        );
    }
}
