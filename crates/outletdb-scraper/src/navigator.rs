//! Page-by-page traversal of the filtered listing.
//!
//! A [`Navigator`] owns its [`ListingSession`] for one run. It loads the
//! listing (retrying a bounded number of times), applies the location filter,
//! then hands out one [`RawPage`] per call to [`Navigator::next_page`] until
//! the listing is exhausted:
//!
//! - no enabled next-page control,
//! - a page with zero result panels,
//! - content still identical to the previous page once the post-click poll
//!   budget is spent,
//! - the configured page limit.
//!
//! Only the initial load and filter are fatal. Once traversal starts, a page
//! that keeps failing to render is handed out as an empty page and ends the run.

use std::future::Future;
use std::time::Duration;

use outletdb_core::AppConfig;
use sha2::{Digest, Sha256};

use crate::error::{NavigationError, SessionError};
use crate::session::ListingSession;

#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub listing_url: String,
    pub max_pages: u32,
    /// Sleep between consecutive pages.
    pub inter_page_delay: Duration,
    pub page_load_attempts: u32,
    /// Extra attempts for a page that fails to render or advance.
    pub page_render_retries: u32,
    pub stable_poll_attempts: u32,
    pub stable_poll_interval: Duration,
    /// Upper bound for any single browser operation.
    pub operation_timeout: Duration,
    pub retry_delay: Duration,
}

impl NavigatorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            listing_url: config.listing_url.clone(),
            max_pages: config.max_pages,
            inter_page_delay: Duration::from_millis(config.inter_page_delay_ms),
            page_load_attempts: config.page_load_attempts,
            page_render_retries: config.page_render_retries,
            stable_poll_attempts: config.stable_poll_attempts,
            stable_poll_interval: Duration::from_millis(config.stable_poll_interval_ms),
            operation_timeout: Duration::from_secs(config.browser_timeout_secs),
            retry_delay: Duration::from_millis(config.stable_poll_interval_ms),
        }
    }
}

/// Traversal state for the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    /// Number of pages handed out so far; also the 1-based index of the last one.
    pub page_index: u32,
    /// Set once the listing reported that no further page exists.
    pub total_pages_known: bool,
    /// Panel count of the last page handed out.
    pub last_seen_count: usize,
}

/// One rendered result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub page_number: u32,
    pub html: String,
    pub panel_count: usize,
}

impl RawPage {
    fn empty(page_number: u32) -> Self {
        Self {
            page_number,
            html: String::new(),
            panel_count: 0,
        }
    }
}

async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout {
            operation,
            timeout_secs: timeout.as_secs(),
        }),
    }
}

fn fingerprint(html: &str) -> String {
    format!("{:x}", Sha256::digest(html.as_bytes()))
}

pub struct Navigator<S: ListingSession> {
    session: S,
    config: NavigatorConfig,
    cursor: PageCursor,
    last_fingerprint: Option<String>,
    exhausted: bool,
    closed: bool,
}

impl<S: ListingSession> Navigator<S> {
    /// Loads the listing and applies `location_filter`. Traversal always
    /// starts from page 1.
    ///
    /// The session is closed before an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InitialLoad`] when the listing cannot be
    /// loaded within the configured attempts, or [`NavigationError::Filter`]
    /// when the filter cannot be applied.
    pub async fn start(
        mut session: S,
        config: NavigatorConfig,
        location_filter: &str,
    ) -> Result<Self, NavigationError> {
        if let Err(e) = initial_load(&mut session, &config).await {
            close_session(&mut session, config.operation_timeout).await;
            return Err(e);
        }

        if let Err(source) = bounded(
            config.operation_timeout,
            "apply_filter",
            session.apply_filter(location_filter),
        )
        .await
        {
            close_session(&mut session, config.operation_timeout).await;
            return Err(NavigationError::Filter {
                location: location_filter.to_string(),
                source,
            });
        }
        tracing::info!(location = location_filter, "location filter applied");

        Ok(Self {
            session,
            config,
            cursor: PageCursor::default(),
            last_fingerprint: None,
            exhausted: false,
            closed: false,
        })
    }

    #[must_use]
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Returns the next result page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Option<RawPage> {
        if self.exhausted || self.closed {
            return None;
        }

        if self.cursor.page_index > 0 {
            if self.cursor.page_index >= self.config.max_pages {
                tracing::info!(
                    pages = self.cursor.page_index,
                    max_pages = self.config.max_pages,
                    "page limit reached"
                );
                self.exhausted = true;
                return None;
            }

            match bounded(
                self.config.operation_timeout,
                "has_next_page",
                self.session.has_next_page(),
            )
            .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(pages = self.cursor.page_index, "no next page; listing exhausted");
                    self.cursor.total_pages_known = true;
                    self.exhausted = true;
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        page = self.cursor.page_index,
                        error = %e,
                        "could not check for a next page; stopping"
                    );
                    self.exhausted = true;
                    return None;
                }
            }

            tokio::time::sleep(self.config.inter_page_delay).await;

            if !self.advance().await {
                self.cursor.page_index += 1;
                self.cursor.last_seen_count = 0;
                self.exhausted = true;
                return Some(RawPage::empty(self.cursor.page_index));
            }

            if !self.wait_for_swap().await {
                tracing::info!(
                    page = self.cursor.page_index + 1,
                    "page did not change after advancing; stopping"
                );
                self.exhausted = true;
                return None;
            }
        }

        let page_number = self.cursor.page_index + 1;
        let Some((panel_count, html)) = self.render(page_number).await else {
            tracing::warn!(page = page_number, "page failed to render; treating it as empty");
            self.cursor.page_index = page_number;
            self.cursor.last_seen_count = 0;
            self.exhausted = true;
            return Some(RawPage::empty(page_number));
        };

        let print = fingerprint(&html);
        if self.last_fingerprint.as_deref() == Some(print.as_str()) {
            tracing::info!(page = page_number, "page did not change after advancing; stopping");
            self.exhausted = true;
            return None;
        }

        if panel_count == 0 {
            tracing::info!(page = page_number, "page has no result panels; stopping");
            self.exhausted = true;
        }

        self.last_fingerprint = Some(print);
        self.cursor.page_index = page_number;
        self.cursor.last_seen_count = panel_count;
        tracing::info!(page = page_number, panels = panel_count, "result page ready");

        Some(RawPage {
            page_number,
            html,
            panel_count,
        })
    }

    /// Closes the session. Later calls are no-ops.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        close_session(&mut self.session, self.config.operation_timeout).await;
    }

    /// Clicks through to the next page, retrying transient failures.
    async fn advance(&mut self) -> bool {
        let attempts = self.config.page_render_retries + 1;
        for attempt in 1..=attempts {
            match bounded(
                self.config.operation_timeout,
                "next_page",
                self.session.next_page(),
            )
            .await
            {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        page = self.cursor.page_index + 1,
                        attempt,
                        attempts,
                        error = %e,
                        "failed to advance to next page"
                    );
                    if !e.is_transient() {
                        break;
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
        false
    }

    /// Polls the page HTML after a click until it differs from the last page
    /// handed out. The listing swaps results in place, so the panel count
    /// alone cannot tell the pages apart.
    ///
    /// Returns `false` only when every read within the poll budget succeeded
    /// and still showed the previous page. Failed reads are left for
    /// [`Self::render`] to retry.
    async fn wait_for_swap(&mut self) -> bool {
        let Some(previous) = self.last_fingerprint.clone() else {
            return true;
        };
        let polls = self.config.stable_poll_attempts.max(1);
        let mut unchanged_reads = 0u32;

        for poll in 1..=polls {
            match bounded(
                self.config.operation_timeout,
                "page_html",
                self.session.page_html(),
            )
            .await
            {
                Ok(html) if fingerprint(&html) != previous => return true,
                Ok(_) => unchanged_reads += 1,
                Err(e) => {
                    tracing::debug!(
                        poll,
                        error = %e,
                        "page read failed while waiting for next page"
                    );
                }
            }
            if poll < polls {
                tokio::time::sleep(self.config.stable_poll_interval).await;
            }
        }

        unchanged_reads < polls
    }

    /// Waits for the panel count to settle, then reads the page HTML.
    async fn render(&mut self, page_number: u32) -> Option<(usize, String)> {
        let attempts = self.config.page_render_retries + 1;
        for attempt in 1..=attempts {
            match self.render_once().await {
                Ok(rendered) => return Some(rendered),
                Err(e) => {
                    tracing::warn!(
                        page = page_number,
                        attempt,
                        attempts,
                        error = %e,
                        "page render failed"
                    );
                    if !e.is_transient() {
                        break;
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
        None
    }

    async fn render_once(&mut self) -> Result<(usize, String), SessionError> {
        let panel_count = self.wait_until_stable().await?;
        let html = bounded(
            self.config.operation_timeout,
            "page_html",
            self.session.page_html(),
        )
        .await?;
        Ok((panel_count, html))
    }

    /// Polls the panel count until two consecutive non-zero readings agree or
    /// the poll budget runs out, in which case the last reading is used.
    async fn wait_until_stable(&mut self) -> Result<usize, SessionError> {
        let polls = self.config.stable_poll_attempts.max(1);
        let mut previous: Option<usize> = None;

        for poll in 1..=polls {
            let count = bounded(
                self.config.operation_timeout,
                "panel_count",
                self.session.panel_count(),
            )
            .await?;
            if count > 0 && previous == Some(count) {
                return Ok(count);
            }
            previous = Some(count);
            if poll < polls {
                tokio::time::sleep(self.config.stable_poll_interval).await;
            }
        }

        tracing::debug!(polls, "panel count did not settle; using last reading");
        Ok(previous.unwrap_or(0))
    }
}

async fn initial_load<S: ListingSession>(
    session: &mut S,
    config: &NavigatorConfig,
) -> Result<(), NavigationError> {
    let attempts = config.page_load_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match bounded(
            config.operation_timeout,
            "open",
            session.open(&config.listing_url),
        )
        .await
        {
            Ok(()) => {
                tracing::info!(url = %config.listing_url, attempt, "listing loaded");
                return Ok(());
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    url = %config.listing_url,
                    attempt,
                    attempts,
                    error = %e,
                    "listing load failed, retrying"
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(last_error) => {
                return Err(NavigationError::InitialLoad {
                    url: config.listing_url.clone(),
                    attempts: attempt,
                    last_error,
                });
            }
        }
    }
}

async fn close_session<S: ListingSession>(session: &mut S, timeout: Duration) {
    if let Err(e) = bounded(timeout, "close", session.close()).await {
        tracing::warn!(error = %e, "failed to close browser session");
    }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;
