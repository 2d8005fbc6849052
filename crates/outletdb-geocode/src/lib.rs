pub mod client;
pub mod enricher;
pub mod error;
pub mod limiter;
pub(crate) mod retry;

pub use client::{GeocodeMatch, GeocodeService, GoogleGeocoder};
pub use enricher::{EnrichResult, Enricher, EnricherConfig};
pub use error::GeocodeError;
pub use limiter::WindowRateLimiter;
