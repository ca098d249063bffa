use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, ScheduleCache};
use crate::error::FetchError;
use crate::model::game::{GameRecord, normalize, sort_schedule};
use crate::model::page::{GamesPage, RawGame};

/// Public host of the BallDontLie API.
pub const DEFAULT_BASE_URL: &str = "https://api.balldontlie.io";

const GAMES_PATH: &str = "/v1/games";

/// Bounds one attempt, not the whole retry budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// One blocking HTTP GET attempt. Non-2xx statuses are returned as data, not
/// errors; only transport-level problems (connect, TLS, timeout, read) fail.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError>;
}

/// Status and body of a completed attempt.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Failure of a single transport attempt.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Blocks the current thread between attempts. Injected so tests can record
/// the requested delays instead of waiting them out.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper; the client runs on blocking threads.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Production transport backed by a ureq agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            // Statuses are policy (429 backs off, 5xx retries); keep them out
            // of the error channel and branch on them upstairs.
            .http_status_as_error(false)
            .build();
        UreqTransport {
            agent: config.new_agent(),
        }
    }
}

impl Transport for UreqTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.agent.get(url);
        for (name, value) in query {
            request = request.query(name, value);
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.call().map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let mut body = response.into_body();
        let body = body
            .read_to_string()
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

/// Retry budget and backoff curve for one logical request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 4,
            backoff_base: 1.8,
        }
    }
}

impl RetryPolicy {
    /// Sleep after the 0-based `attempt`: `backoff_base^attempt` seconds,
    /// uncapped, no jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_base.powi(attempt as i32))
    }
}

/// Issues a single GET with bounded retries and exponential backoff, and
/// decodes the JSON body on success.
pub struct RequestExecutor {
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl RequestExecutor {
    pub fn new(
        retry: RetryPolicy,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        RequestExecutor {
            retry,
            transport,
            sleeper,
        }
    }

    /// Run the request until it decodes cleanly or the budget is spent.
    ///
    /// A 429 backs off on the same curve as a failure but is not recorded as
    /// one; anything else that goes wrong (transport error, unexpected
    /// status, undecodable 2xx body) becomes the candidate last error. Every
    /// failed attempt is followed by its backoff sleep, the final one
    /// included.
    pub fn execute<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<T, FetchError> {
        let mut last_error: Option<String> = None;

        for attempt in 0..self.retry.max_retries {
            debug!(url, attempt = attempt + 1, max = self.retry.max_retries, "GET");
            match self.transport.get(url, query, headers) {
                Ok(response) if response.status == 429 => {
                    warn!(attempt = attempt + 1, "rate limited (429), backing off");
                }
                Ok(response) if (200..300).contains(&response.status) => {
                    match serde_json::from_str::<T>(&response.body) {
                        Ok(decoded) => return Ok(decoded),
                        Err(e) => {
                            warn!(attempt = attempt + 1, error = %e, "undecodable response body");
                            last_error = Some(format!("decode error: {e}"));
                        }
                    }
                }
                Ok(response) => {
                    warn!(attempt = attempt + 1, status = response.status, "unexpected HTTP status");
                    last_error = Some(format!("HTTP {}", response.status));
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "request attempt failed");
                    last_error = Some(e.to_string());
                }
            }
            self.sleeper.sleep(self.retry.delay(attempt));
        }

        Err(FetchError::RetriesExhausted {
            attempts: self.retry.max_retries,
            last_error,
        })
    }
}

/// BallDontLie API client: resilient GETs plus cursor pagination over the
/// games listing.
pub struct BallDontLie {
    base_url: String,
    headers: Vec<(String, String)>,
    executor: RequestExecutor,
}

impl BallDontLie {
    /// Client with production wiring (ureq transport, thread sleeper,
    /// default retry policy).
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self::with_executor(
            base_url,
            api_key,
            RequestExecutor::new(
                RetryPolicy::default(),
                Arc::new(UreqTransport::new(REQUEST_TIMEOUT)),
                Arc::new(ThreadSleeper),
            ),
        )
    }

    /// Client with a caller-supplied executor; lets tests run without a live
    /// network.
    pub fn with_executor(base_url: &str, api_key: String, executor: RequestExecutor) -> Self {
        BallDontLie {
            base_url: base_url.trim_end_matches('/').to_string(),
            // The API expects the bare key, no scheme prefix.
            headers: vec![("Authorization".to_string(), api_key)],
            executor,
        }
    }

    /// Collect every page of games in `[start_date, end_date]` and return
    /// the normalized, sorted schedule. An empty range yields `Ok(vec![])`.
    ///
    /// The caller guarantees `start_date <= end_date`; the range is passed
    /// through to the API as-is.
    #[instrument(level = "info", skip(self))]
    pub fn fetch_games(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        per_page: u32,
    ) -> Result<Vec<GameRecord>, FetchError> {
        let url = format!("{}{}", self.base_url, GAMES_PATH);
        let mut rows: Vec<RawGame> = Vec::new();
        let mut requested: HashSet<i64> = HashSet::new();
        let mut cursor: i64 = 0;

        loop {
            if !requested.insert(cursor) {
                return Err(FetchError::CursorRepeated { cursor });
            }
            let query = [
                ("start_date".to_string(), start_date.to_string()),
                ("end_date".to_string(), end_date.to_string()),
                ("per_page".to_string(), per_page.to_string()),
                ("cursor".to_string(), cursor.to_string()),
            ];
            let page: GamesPage = self.executor.execute(&url, &query, &self.headers)?;
            debug!(cursor, rows = page.data.len(), "collected page");

            let next = page.next_cursor();
            rows.extend(page.data);
            match next {
                Some(next) => cursor = next,
                None => break,
            }
        }

        if rows.is_empty() {
            info!("no games scheduled in range");
            return Ok(Vec::new());
        }

        let mut games = normalize(rows);
        sort_schedule(&mut games);
        info!(games = games.len(), pages = requested.len(), "assembled schedule");
        Ok(games)
    }

    /// Cached variant of [`fetch_games`](Self::fetch_games): identical
    /// parameters within the cache window are answered from memory without
    /// touching the network.
    pub fn fetch_games_cached(
        &self,
        cache: &ScheduleCache,
        start_date: NaiveDate,
        end_date: NaiveDate,
        per_page: u32,
    ) -> Result<Vec<GameRecord>, FetchError> {
        let key = CacheKey {
            start_date,
            end_date,
            per_page,
        };
        cache.get_or_fetch(key, || self.fetch_games(start_date, end_date, per_page))
    }
}
