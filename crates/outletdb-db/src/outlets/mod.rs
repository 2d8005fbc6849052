//! Database operations for the `outlets` table.

mod read;
mod types;
mod write;

pub use read::{
    count_outlets_awaiting_geocode, get_outlet, get_outlet_by_identity_key, identity_key_exists,
    list_outlets_pending_geocode, outlet_stats,
};
pub use types::{OutletRow, OutletStatsRow};
pub use write::{insert_outlet, record_geocode_outcome, record_geocode_success};

