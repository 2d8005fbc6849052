pub mod app_config;
pub mod config;
pub mod identity;
pub mod outlet;
pub mod text;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use identity::{make_identity_key, normalize_candidate};
pub use outlet::{
    CandidateRecord, Decision, GeocodeStatus, NewOutlet, OutletRecord, RejectReason, RunSummary,
    SkipReason,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
