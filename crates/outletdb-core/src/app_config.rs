#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub listing_url: String,
    pub location_filter: String,
    pub max_pages: u32,
    pub inter_page_delay_ms: u64,
    pub page_load_attempts: u32,
    pub page_render_retries: u32,
    pub stable_poll_attempts: u32,
    pub stable_poll_interval_ms: u64,
    pub browser_timeout_secs: u64,
    pub chrome_executable: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub geocode_max_requests: u32,
    pub geocode_window_ms: u64,
    pub geocode_timeout_secs: u64,
    pub geocode_max_retries: u32,
    pub geocode_retry_backoff_ms: u64,
    pub geocode_region_suffix: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("listing_url", &self.listing_url)
            .field("location_filter", &self.location_filter)
            .field("max_pages", &self.max_pages)
            .field("inter_page_delay_ms", &self.inter_page_delay_ms)
            .field("page_load_attempts", &self.page_load_attempts)
            .field("page_render_retries", &self.page_render_retries)
            .field("stable_poll_attempts", &self.stable_poll_attempts)
            .field("stable_poll_interval_ms", &self.stable_poll_interval_ms)
            .field("browser_timeout_secs", &self.browser_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field(
                "google_maps_api_key",
                &self.google_maps_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("geocode_max_requests", &self.geocode_max_requests)
            .field("geocode_window_ms", &self.geocode_window_ms)
            .field("geocode_timeout_secs", &self.geocode_timeout_secs)
            .field("geocode_max_retries", &self.geocode_max_retries)
            .field("geocode_retry_backoff_ms", &self.geocode_retry_backoff_ms)
            .field("geocode_region_suffix", &self.geocode_region_suffix)
            .finish()
    }
}
