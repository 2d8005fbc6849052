use thiserror::Error;

/// Errors returned by the geocoding client.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure, or a non-2xx HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered but found nothing for the address.
    #[error("no geocoding match for '{address}'")]
    NoMatch { address: String },

    /// `OVER_QUERY_LIMIT` or `UNKNOWN_ERROR`; the same request may succeed later.
    #[error("geocoding service temporarily unavailable ({status}): {message}")]
    Transient { status: String, message: String },

    /// `REQUEST_DENIED` or `INVALID_REQUEST`, usually a key or quota problem.
    #[error("geocoding request rejected ({status}): {message}")]
    Rejected { status: String, message: String },

    #[error("unexpected geocoding status '{0}'")]
    UnexpectedStatus(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid geocoder base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl GeocodeError {
    /// Whether the same request is worth repeating after a back-off delay.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS
                    })
            }
            Self::Transient { .. } => true,
            Self::NoMatch { .. }
            | Self::Rejected { .. }
            | Self::UnexpectedStatus(_)
            | Self::Deserialize { .. }
            | Self::InvalidBaseUrl { .. } => false,
        }
    }
}
