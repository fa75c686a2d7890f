//! # HTTP Client
//!
//! Shared request execution for every Plausible endpoint: bearer auth,
//! request timeout, bounded retry with exponential backoff, and mapping of
//! failure responses onto [`ApiError`].

use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after a timeout or connection failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

// =============================================================================
// Error Types
// =============================================================================

/// Errors from Plausible API operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller supplied invalid arguments; nothing was sent.
    ValidationError { message: String },
    /// HTTP 429. `retry_after` is the server's hint in seconds, if any.
    RateLimited {
        retry_after: Option<u64>,
        message: String,
    },
    /// HTTP 401.
    Unauthorized { message: String },
    /// HTTP 403.
    Forbidden { message: String },
    /// HTTP 404.
    NotFound { message: String },
    /// Any other 5xx response.
    Server { status: u16, message: String },
    /// Any other non-success response.
    ClientError { status: u16, message: String },
    /// Response body did not match the expected shape.
    ParseError { message: String },
    /// Connection could not be established or was dropped.
    Network { message: String },
    /// Request exceeded the configured timeout.
    Timeout { message: String },
    /// Retryable failures persisted through every retry.
    RetriesExhausted { attempts: u32, message: String },
}

impl ApiError {
    /// Whether the request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Timeout { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError { message } => write!(f, "Invalid request: {}", message),
            ApiError::RateLimited {
                retry_after: Some(secs),
                message,
            } => write!(f, "{} (retry after {}s)", message, secs),
            ApiError::RateLimited {
                retry_after: None,
                message,
            } => write!(f, "{}", message),
            ApiError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            ApiError::Forbidden { message } => write!(f, "Forbidden: {}", message),
            ApiError::NotFound { message } => write!(f, "Not found: {}", message),
            ApiError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            ApiError::ClientError { status, message } => {
                write!(f, "Request failed ({}): {}", status, message)
            }
            ApiError::ParseError { message } => write!(f, "Parse error: {}", message),
            ApiError::Network { message } => write!(f, "Network error: {}", message),
            ApiError::Timeout { message } => write!(f, "Request timed out: {}", message),
            ApiError::RetriesExhausted { attempts, message } => {
                write!(f, "Giving up after {} attempts: {}", attempts, message)
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert a reqwest error to an ApiError.
pub(crate) fn to_network_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_builder() {
        ApiError::ValidationError {
            message: err.to_string(),
        }
    } else if err.is_decode() {
        ApiError::ParseError {
            message: err.to_string(),
        }
    } else {
        ApiError::Network {
            message: err.to_string(),
        }
    }
}

/// Pull the `error` field out of a Plausible JSON error body, falling back to
/// the raw text.
fn extract_error_message(error_text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(error_text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| error_text.trim().to_string())
}

fn or_default(error_text: String, fallback: impl FnOnce() -> String) -> String {
    if error_text.is_empty() {
        fallback()
    } else {
        error_text
    }
}

/// Convert an HTTP response with error status to an ApiError.
pub(crate) fn to_http_error(
    status: StatusCode,
    headers: &HeaderMap,
    error_text: &str,
) -> ApiError {
    let status_code = status.as_u16();
    let error_text = extract_error_message(error_text);

    match status_code {
        429 => ApiError::RateLimited {
            retry_after: parse_retry_after(headers),
            message: or_default(error_text, || "Rate limit exceeded".to_string()),
        },
        401 => ApiError::Unauthorized {
            message: or_default(error_text, || "Invalid or expired API key".to_string()),
        },
        403 => ApiError::Forbidden {
            message: or_default(error_text, || {
                "API key lacks access to this resource".to_string()
            }),
        },
        404 => ApiError::NotFound {
            message: or_default(error_text, || "Resource not found".to_string()),
        },
        500..=599 => ApiError::Server {
            status: status_code,
            message: or_default(error_text, || format!("Server error ({})", status_code)),
        },
        _ => ApiError::ClientError {
            status: status_code,
            message: or_default(error_text, || format!("Request failed ({})", status_code)),
        },
    }
}

/// Read a delay-seconds `Retry-After` header.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential backoff for timeouts and connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt` (zero-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Construction options for [`ApiClient`].
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Client for the Plausible Stats and Sites APIs.
///
/// Requests are sent one at a time; the client holds no state between calls
/// beyond its connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client with the default timeout and retry policy.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: options.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send a request, retrying timeouts and connection failures.
    ///
    /// `build` is called once per attempt. `what` names the response in
    /// parse errors.
    pub(crate) async fn send_json<T, F>(&self, what: &str, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(what, build(&self.client)).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "[API] {} (attempt {}/{}), retrying in {:?}",
                        err,
                        attempt + 1,
                        self.retry.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt + 1,
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(to_network_error)?;

        let status = response.status();
        debug!(
            "[API] Response status: {} ({})",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        );

        if !status.is_success() {
            let headers = response.headers().clone();
            let error_text = response.text().await.unwrap_or_default();
            debug!("[API] Error response body: {}", error_text);
            return Err(to_http_error(status, &headers, &error_text));
        }

        let body = response.text().await.map_err(to_network_error)?;
        serde_json::from_str(&body).map_err(|e| ApiError::ParseError {
            message: format!("Failed to parse {} response: {}", what, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_backoff_doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy {
            max_retries: 100,
            base_delay: Duration::from_secs(1),
        };
        assert!(policy.delay_for(64) >= policy.delay_for(31));
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("17"));
        let err = to_http_error(StatusCode::TOO_MANY_REQUESTS, &headers, "");
        assert_eq!(
            err,
            ApiError::RateLimited {
                retry_after: Some(17),
                message: "Rate limit exceeded".to_string(),
            }
        );
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("retry after 17s"));
    }

    #[test]
    fn test_rate_limit_ignores_http_date_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        match to_http_error(StatusCode::TOO_MANY_REQUESTS, &headers, "") {
            ApiError::RateLimited { retry_after, .. } => assert_eq!(retry_after, None),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_status_classification() {
        let headers = HeaderMap::new();
        assert!(matches!(
            to_http_error(StatusCode::UNAUTHORIZED, &headers, ""),
            ApiError::Unauthorized { .. }
        ));
        assert!(matches!(
            to_http_error(StatusCode::FORBIDDEN, &headers, ""),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            to_http_error(StatusCode::NOT_FOUND, &headers, ""),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            to_http_error(StatusCode::BAD_GATEWAY, &headers, ""),
            ApiError::Server { status: 502, .. }
        ));
        assert!(matches!(
            to_http_error(StatusCode::BAD_REQUEST, &headers, ""),
            ApiError::ClientError { status: 400, .. }
        ));
    }

    #[test]
    fn test_error_body_message_is_extracted() {
        let err = to_http_error(
            StatusCode::BAD_REQUEST,
            &HeaderMap::new(),
            r#"{"error": "Invalid metric \"foo\""}"#,
        );
        assert_eq!(
            err,
            ApiError::ClientError {
                status: 400,
                message: "Invalid metric \"foo\"".to_string(),
            }
        );
    }

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(ApiError::Timeout { message: String::new() }.is_retryable());
        assert!(ApiError::Network { message: String::new() }.is_retryable());
        assert!(!ApiError::validation("bad").is_retryable());
        assert!(
            !ApiError::Server {
                status: 500,
                message: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://plausible.io/", "key").unwrap();
        assert_eq!(client.base_url(), "https://plausible.io");
    }
}
