use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let positive_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("OUTLETDB_ENV", "development"))?;
    let log_level = or_default("OUTLETDB_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("OUTLETDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("OUTLETDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("OUTLETDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let listing_url = or_default(
        "OUTLETDB_LISTING_URL",
        "https://www.mcdonalds.com.my/locate-us",
    );
    let location_filter = or_default("OUTLETDB_LOCATION_FILTER", "Kuala Lumpur");
    if location_filter.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "OUTLETDB_LOCATION_FILTER".to_string(),
            reason: "must not be blank".to_string(),
        });
    }
    let max_pages = positive_u32("OUTLETDB_MAX_PAGES", "50")?;
    let inter_page_delay_ms = parse_u64("OUTLETDB_INTER_PAGE_DELAY_MS", "3000")?;
    let page_load_attempts = positive_u32("OUTLETDB_PAGE_LOAD_ATTEMPTS", "3")?;
    let page_render_retries = parse_u32("OUTLETDB_PAGE_RENDER_RETRIES", "2")?;
    let stable_poll_attempts = positive_u32("OUTLETDB_STABLE_POLL_ATTEMPTS", "10")?;
    let stable_poll_interval_ms = parse_u64("OUTLETDB_STABLE_POLL_INTERVAL_MS", "500")?;
    let browser_timeout_secs = positive_u64("OUTLETDB_BROWSER_TIMEOUT_SECS", "30")?;
    let chrome_executable = lookup("OUTLETDB_CHROME_EXECUTABLE").ok();

    let google_maps_api_key = lookup("GOOGLE_MAPS_API_KEY").ok();
    let geocode_max_requests = positive_u32("OUTLETDB_GEOCODE_MAX_REQUESTS", "10")?;
    let geocode_window_ms = positive_u64("OUTLETDB_GEOCODE_WINDOW_MS", "1000")?;
    let geocode_timeout_secs = parse_u64("OUTLETDB_GEOCODE_TIMEOUT_SECS", "10")?;
    let geocode_max_retries = parse_u32("OUTLETDB_GEOCODE_MAX_RETRIES", "2")?;
    let geocode_retry_backoff_ms = parse_u64("OUTLETDB_GEOCODE_RETRY_BACKOFF_MS", "500")?;
    let geocode_region_suffix = or_default("OUTLETDB_GEOCODE_REGION_SUFFIX", ", Malaysia");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        listing_url,
        location_filter,
        max_pages,
        inter_page_delay_ms,
        page_load_attempts,
        page_render_retries,
        stable_poll_attempts,
        stable_poll_interval_ms,
        browser_timeout_secs,
        chrome_executable,
        google_maps_api_key,
        geocode_max_requests,
        geocode_window_ms,
        geocode_timeout_secs,
        geocode_max_retries,
        geocode_retry_backoff_ms,
        geocode_region_suffix,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "OUTLETDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
