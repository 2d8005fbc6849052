use async_trait::async_trait;

use crate::error::SessionError;

/// The handful of listing-site interactions the navigator depends on.
///
/// A session is owned exclusively by one navigator for the duration of a run.
#[async_trait]
pub trait ListingSession: Send {
    /// Loads the listing entry page.
    async fn open(&mut self, url: &str) -> Result<(), SessionError>;

    /// Selects `location` in the listing's location filter.
    async fn apply_filter(&mut self, location: &str) -> Result<(), SessionError>;

    /// Number of result panels currently rendered.
    async fn panel_count(&mut self) -> Result<usize, SessionError>;

    /// Serialized HTML of the current result page.
    async fn page_html(&mut self) -> Result<String, SessionError>;

    /// Whether an enabled next-page control is present.
    async fn has_next_page(&mut self) -> Result<bool, SessionError>;

    /// Activates the next-page control.
    async fn next_page(&mut self) -> Result<(), SessionError>;

    /// Releases the browser. Safe to call more than once.
    async fn close(&mut self) -> Result<(), SessionError>;
}
