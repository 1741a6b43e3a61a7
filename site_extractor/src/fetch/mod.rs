//! Rate-limited, retrying HTTP fetcher.

mod rate_limit;

use std::time::Duration;

use reqwest::{Client, StatusCode};

use rate_limit::HostGate;

const USER_AGENT: &str =
    "InventoryReconciliationBot/1.0 (+https://example.invalid/bot; contact: ops@example.invalid)";

const ERROR_PAGE_PHRASES: &[&str] = &[
    "page not found",
    "does not exist",
    "has been removed",
    "no longer available",
    "access denied",
    "forbidden",
];

const MIN_VALID_BODY_LEN: usize = 500;

/// Tunables for a single [`fetch`] call, with the documented defaults.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum retry attempts after the first try.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for the exponential backoff delay.
    pub max_delay: Duration,
    /// Per-request deadline.
    pub timeout: Duration,
    /// Minimum gap between requests to the same host.
    pub rate_limit: Duration,
    /// Whether to reject short/error-page bodies.
    pub validate: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            rate_limit: Duration::from_secs(1),
            validate: true,
        }
    }
}

/// Outcome of a fetch attempt. Never panics/throws on network error; the
/// caller inspects `error` to decide whether to proceed.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Whether a usable body was obtained.
    pub success: bool,
    /// HTTP status code, if a response was received at all.
    pub status: Option<u16>,
    /// Response body, present only on success.
    pub body: Option<String>,
    /// Human-readable failure reason, present only on failure.
    pub error: Option<String>,
    /// Number of attempts made (including the first).
    pub attempts: u32,
}

/// A process-local fetcher sharing one HTTP client and one per-host rate gate.
pub struct Fetcher {
    client: Client,
    gate: HostGate,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Build a fetcher with the crate's fixed UA and standard `Accept*` headers.
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client builder never fails for this config");
        Self {
            client,
            gate: HostGate::new(),
        }
    }

    /// Fetch `url`, retrying transient failures with exponential backoff and
    /// respecting the per-host minimum gap in `opts.rate_limit`.
    pub async fn fetch(&self, url: &str, opts: &FetchOptions) -> FetchResult {
        let host = match reqwest::Url::parse(url) {
            Ok(u) => u.host_str().unwrap_or("").to_string(),
            Err(e) => {
                return FetchResult {
                    success: false,
                    status: None,
                    body: None,
                    error: Some(format!("invalid url: {e}")),
                    attempts: 0,
                };
            }
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.gate.wait(&host, opts.rate_limit).await;

            let outcome = self.try_once(url, opts).await;
            match outcome {
                Ok(mut result) => {
                    result.attempts = attempt;
                    return result;
                }
                Err(Retry::Terminal(mut result)) => {
                    result.attempts = attempt;
                    return result;
                }
                Err(Retry::Transient(reason)) => {
                    if attempt > opts.max_retries {
                        return FetchResult {
                            success: false,
                            status: None,
                            body: None,
                            error: Some(reason),
                            attempts: attempt,
                        };
                    }
                    let delay = backoff_delay(opts.initial_delay, opts.max_delay, attempt);
                    tracing::debug!(url, attempt, reason = %reason, delay_ms = delay.as_millis() as u64, "retrying fetch");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_once(&self, url: &str, opts: &FetchOptions) -> std::result::Result<FetchResult, Retry> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Retry::Transient(format!("timeout fetching {url}"))
                } else {
                    Retry::Transient(format!("network error fetching {url}: {e}"))
                }
            })?;

        let status = resp.status();
        if is_terminal_failure(status) {
            return Err(Retry::Terminal(FetchResult {
                success: false,
                status: Some(status.as_u16()),
                body: None,
                error: Some(format!("terminal status {status}")),
                attempts: 0,
            }));
        }
        if is_retryable(status) {
            return Err(Retry::Transient(format!("retryable status {status} for {url}")));
        }
        if !status.is_success() {
            return Ok(FetchResult {
                success: false,
                status: Some(status.as_u16()),
                body: None,
                error: Some(format!("unexpected status {status}")),
                attempts: 0,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Retry::Transient(format!("body read error for {url}: {e}")))?;

        if opts.validate {
            if let Some(reason) = validation_failure(&body) {
                return Ok(FetchResult {
                    success: false,
                    status: Some(status.as_u16()),
                    body: None,
                    error: Some(reason),
                    attempts: 0,
                });
            }
        }

        Ok(FetchResult {
            success: true,
            status: Some(status.as_u16()),
            body: Some(body),
            error: None,
            attempts: 0,
        })
    }
}

enum Retry {
    Transient(String),
    Terminal(FetchResult),
}

fn is_terminal_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::GONE
    )
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Body is too short or mentions a known error-page phrase.
pub fn validation_failure(body: &str) -> Option<String> {
    if body.len() < MIN_VALID_BODY_LEN {
        return Some(format!("body too short ({} bytes)", body.len()));
    }
    let lower = body.to_lowercase();
    ERROR_PAGE_PHRASES
        .iter()
        .find(|phrase| lower.contains(*phrase))
        .map(|phrase| format!("error page phrase matched: {phrase}"))
}

fn backoff_delay(initial: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    let scaled = initial.saturating_mul(factor);
    scaled.min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_short_body() {
        assert!(validation_failure("too short").is_some());
    }

    #[test]
    fn validation_rejects_error_phrases_even_with_200() {
        let body = "x".repeat(600) + "This page does not exist anymore.";
        assert!(validation_failure(&body).is_some());
    }

    #[test]
    fn validation_accepts_normal_body() {
        let body = "<html><body>".to_string() + &"vehicle listing ".repeat(40) + "</body></html>";
        assert!(validation_failure(&body).is_none());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let initial = Duration::from_secs(1);
        let max = Duration::from_secs(10);
        assert_eq!(backoff_delay(initial, max, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(initial, max, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(initial, max, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(initial, max, 5), Duration::from_secs(10));
    }

    #[test]
    fn terminal_vs_retryable_status() {
        assert!(is_terminal_failure(StatusCode::NOT_FOUND));
        assert!(is_terminal_failure(StatusCode::FORBIDDEN));
        assert!(!is_terminal_failure(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }
}
