//! Browser-driven traversal of the outlet listing and HTML panel extraction.

pub mod chromium;
pub mod error;
pub mod extract;
pub mod navigator;
pub mod session;

pub use chromium::{ChromiumSession, ChromiumSessionConfig};
pub use error::{ExtractError, NavigationError, SessionError};
pub use extract::{ExtractionWarning, PageExtraction, PanelExtractor, PanelSelectors};
pub use navigator::{Navigator, NavigatorConfig, PageCursor, RawPage};
pub use session::ListingSession;
