//! Page fetching with optional exponential backoff.
//!
//! # Architecture
//!
//! - [`Fetcher`]: core trait, `fetch(url, headers) -> body`
//! - [`HttpFetcher`]: `reqwest` client with a per-request timeout
//! - [`RetryFetch`]: decorator that retries any [`Fetcher`]
//!
//! # Retry Strategy
//!
//! Retrying is off unless `--retries` is set, so that a transport failure
//! on a listing page aborts the edition immediately by default.
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::error::TransportError;
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Something that can turn a URL into a document body.
pub trait Fetcher {
    /// Fetch `url`, sending `headers` with the request.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the page
    /// * `headers` - Header names and values sent with the request
    ///
    /// # Returns
    ///
    /// The document body as text.
    ///
    /// # Errors
    ///
    /// [`TransportError`] if the page could not be obtained, including a
    /// non-2xx status or a timeout.
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError>;
}

/// HTTP fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher whose every request times out after `timeout`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Limit for one request, connect through body
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
    /// let body = fetcher.fetch("https://www.futwiz.com/", &headers).await?;
    /// ```
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

/// Convert configured headers into a `reqwest` [`HeaderMap`].
fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        let t0 = Instant::now();
        let request_error = |source| TransportError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .headers(header_map(headers)?)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(request_error)?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetcher`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: Fetcher> RetryFetch<T> {
    /// Wrap `inner` with up to `max_retries` retries.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fetcher to retry
    /// * `max_retries` - Retries after the first attempt; 0 passes errors through
    /// * `base_delay` - Delay before the first retry, doubled for each later one
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = RetryFetch::new(HttpFetcher::new(timeout)?, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Fetcher> Fetcher for RetryFetch<T> {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url, headers).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                                error = %e,
                                "fetch exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let exp = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory fetcher for crawl tests.

    use super::Fetcher;
    use crate::error::TransportError;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    /// Serves canned bodies by URL. Unknown URLs fail as unreachable, a URL
    /// can be made to fail a set number of times before succeeding, and a
    /// URL can be made to answer late.
    #[derive(Debug, Default)]
    pub struct MemoryFetcher {
        pages: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        failures_left: Mutex<HashMap<String, usize>>,
        requests: Mutex<Vec<String>>,
        last_headers: Mutex<BTreeMap<String, String>>,
    }

    impl MemoryFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.pages.insert(url.into(), body.into());
            self
        }

        pub fn delayed(mut self, url: impl Into<String>, delay: Duration) -> Self {
            self.delays.insert(url.into(), delay);
            self
        }

        pub fn flaky(self, url: impl Into<String>, failures: usize) -> Self {
            self.failures_left
                .lock()
                .unwrap()
                .insert(url.into(), failures);
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn last_headers(&self) -> BTreeMap<String, String> {
            self.last_headers.lock().unwrap().clone()
        }
    }

    impl Fetcher for MemoryFetcher {
        async fn fetch(
            &self,
            url: &str,
            headers: &BTreeMap<String, String>,
        ) -> Result<String, TransportError> {
            self.requests.lock().unwrap().push(url.to_string());
            *self.last_headers.lock().unwrap() = headers.clone();
            if let Some(delay) = self.delays.get(url) {
                sleep(*delay).await;
            }

            if let Some(left) = self.failures_left.lock().unwrap().get_mut(url) {
                if *left > 0 {
                    *left -= 1;
                    return Err(TransportError::Unreachable(url.to_string()));
                }
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::Unreachable(url.to_string()))
        }
    }
}
