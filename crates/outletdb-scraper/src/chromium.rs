//! Headless Chromium implementation of [`ListingSession`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use outletdb_core::AppConfig;
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::extract::PanelSelectors;
use crate::session::ListingSession;

/// The listing's state dropdown.
pub const DEFAULT_FILTER_SELECTOR: &str = "div.location_inputs select#states";
/// An enabled "next page" control.
pub const DEFAULT_NEXT_SELECTOR: &str = ".pagination-next:not(.disabled)";

#[derive(Debug, Clone)]
pub struct ChromiumSessionConfig {
    pub chrome_executable: Option<PathBuf>,
    pub request_timeout: Duration,
    pub panel_selector: String,
    pub filter_selector: String,
    pub next_selector: String,
}

impl ChromiumSessionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, selectors: &PanelSelectors) -> Self {
        Self {
            chrome_executable: config.chrome_executable.as_ref().map(PathBuf::from),
            request_timeout: Duration::from_secs(config.browser_timeout_secs),
            panel_selector: selectors.panel.clone(),
            filter_selector: DEFAULT_FILTER_SELECTOR.to_string(),
            next_selector: DEFAULT_NEXT_SELECTOR.to_string(),
        }
    }
}

/// Drives one headless Chromium instance with a single tab.
///
/// The CDP event handler runs on a spawned task that is aborted when the
/// session is closed or dropped. Dropping the [`Browser`] kills the child
/// process if [`ListingSession::close`] was never reached.
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    page: Option<Page>,
    config: ChromiumSessionConfig,
}

impl ChromiumSession {
    /// Launches the browser.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Launch`] if the browser config is invalid, or
    /// [`SessionError::Browser`] if Chromium cannot be started.
    pub async fn launch(config: ChromiumSessionConfig) -> Result<Self, SessionError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(config.request_timeout);
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        tracing::info!("headless browser launched");
        Ok(Self {
            browser: Some(browser),
            handler,
            page: None,
            config,
        })
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::NotOpen)
    }

    async fn eval<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        script: String,
    ) -> Result<T, SessionError> {
        let result = self.page()?.evaluate(script).await?;
        result
            .into_value::<T>()
            .map_err(|source| SessionError::Script { operation, source })
    }
}

/// Quotes `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn filter_script(filter_selector: &str, location: &str) -> String {
    format!(
        "(() => {{\n\
           const select = document.querySelector({sel});\n\
           if (!select) return false;\n\
           const norm = (s) => s.trim().replace(/\\s+/g, ' ').toLowerCase();\n\
           const wanted = norm({loc});\n\
           const option = Array.from(select.options).find((o) => norm(o.textContent) === wanted);\n\
           if (!option) return false;\n\
           select.value = option.value;\n\
           select.dispatchEvent(new Event('change', {{ bubbles: true }}));\n\
           return true;\n\
         }})()",
        sel = js_string(filter_selector),
        loc = js_string(location),
    )
}

#[async_trait]
impl ListingSession for ChromiumSession {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        if let Some(old) = self.page.take() {
            if let Err(e) = old.close().await {
                tracing::debug!(error = %e, "failed to close previous tab");
            }
        }
        let browser = self.browser.as_ref().ok_or(SessionError::NotOpen)?;
        let page = browser.new_page(url).await?;
        page.wait_for_navigation().await?;
        self.page = Some(page);
        Ok(())
    }

    async fn apply_filter(&mut self, location: &str) -> Result<(), SessionError> {
        let script = filter_script(&self.config.filter_selector, location);
        let selected: bool = self.eval("apply_filter", script).await?;
        if selected {
            Ok(())
        } else {
            Err(SessionError::FilterOptionNotFound {
                location: location.to_string(),
            })
        }
    }

    async fn panel_count(&mut self) -> Result<usize, SessionError> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(&self.config.panel_selector)
        );
        self.eval("panel_count", script).await
    }

    async fn page_html(&mut self) -> Result<String, SessionError> {
        Ok(self.page()?.content().await?)
    }

    async fn has_next_page(&mut self) -> Result<bool, SessionError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); \
             return !!el && el.offsetParent !== null; }})()",
            js_string(&self.config.next_selector)
        );
        self.eval("has_next_page", script).await
    }

    async fn next_page(&mut self) -> Result<(), SessionError> {
        let element = self.page()?.find_element(self.config.next_selector.clone()).await?;
        element.click().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!(error = %e, "failed to close tab");
            }
        }
        if let Some(mut browser) = self.browser.take() {
            browser.close().await?;
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "failed to reap browser process");
            }
            tracing::info!("headless browser closed");
        }
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
