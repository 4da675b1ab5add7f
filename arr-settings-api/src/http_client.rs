//! Generic HTTP client tools
//!
//! Reusable request execution for the settings backend: sending, logging,
//! status classification and JSON parsing. Endpoint methods in
//! [`crate::client`] build their own `RequestBuilder` and hand it over here.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ApiError;
use crate::types::ErrorBody;
use crate::utils::log_sanitizer::truncate_for_log;

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns the response text.
    ///
    /// Transport failures, HTTP 429 and 502/503/504 become errors here; other
    /// statuses are returned to the caller for classification with
    /// [`HttpUtils::ensure_success`].
    ///
    /// # Arguments
    /// * `request_builder` - configured request (URL, headers, body)
    /// * `endpoint` - `"METHOD /path"` label used in logs and errors
    ///
    /// # Returns
    /// * `Ok((status_code, response_text))`
    /// * `Err(ApiError::NetworkError | Timeout | RateLimited)`
    pub async fn execute_request(
        request_builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<(u16, String), ApiError> {
        log::debug!("[{endpoint}] sending");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    endpoint: endpoint.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ApiError::NetworkError {
                    endpoint: endpoint.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{endpoint}] Response Status: {status_code}");

        // Extract Retry-After header (before consuming response body)
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if status_code == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{endpoint}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            return Err(ApiError::RateLimited {
                endpoint: endpoint.to_string(),
                retry_after,
                raw_message: Some(body),
            });
        }

        // Gateway errors are transient
        if matches!(status_code, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{endpoint}] Server error (HTTP {status_code})");
            return Err(ApiError::NetworkError {
                endpoint: endpoint.to_string(),
                detail: format!("HTTP {status_code}: {}", truncate_for_log(&body)),
            });
        }

        let response_text = response.text().await.map_err(|e| ApiError::NetworkError {
            endpoint: endpoint.to_string(),
            detail: format!("Failed to read response body: {e}"),
        })?;

        log::debug!(
            "[{endpoint}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Map a non-2xx status to the matching [`ApiError`].
    ///
    /// The body's `error` (or `message`) field is surfaced verbatim; a body
    /// that is not JSON is used as-is.
    pub fn ensure_success(status: u16, body: &str, endpoint: &str) -> Result<(), ApiError> {
        if (200..300).contains(&status) {
            return Ok(());
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| truncate_for_log(trimmed))
            });

        let err = match status {
            401 | 403 => ApiError::Unauthorized {
                endpoint: endpoint.to_string(),
                raw_message: message,
            },
            404 => ApiError::NotFound {
                endpoint: endpoint.to_string(),
                raw_message: message,
            },
            _ => ApiError::ServerRejected {
                endpoint: endpoint.to_string(),
                status,
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
        };

        if err.is_expected() {
            log::warn!("{err}");
        } else {
            log::error!("{err}");
        }
        Err(err)
    }

    /// Parse JSON response
    ///
    /// # Returns
    /// * `Ok(T)` - successfully parsed
    /// * `Err(ApiError::ParseError)` - parsing failed
    pub fn parse_json<T>(response_text: &str, endpoint: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{endpoint}] JSON parse failed: {e}");
            log::error!(
                "[{endpoint}] Raw response: {}",
                truncate_for_log(response_text)
            );
            ApiError::ParseError {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Performs an HTTP request with retries.
    ///
    /// Only use this for idempotent requests.
    ///
    /// # Retry strategy
    /// - Only retryable errors (network, timeout, rate limited) are retried
    /// - Exponential backoff: 100ms, 200ms, 400ms, ... (maximum 10 seconds)
    /// - `Retry-After` is honored for rate limits (capped at 30 seconds)
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        endpoint: &str,
        max_retries: u32,
    ) -> Result<(u16, String), ApiError> {
        if max_retries == 0 {
            return Self::execute_request(request_builder, endpoint).await;
        }

        let mut last_error = None;

        for attempt in 0..=max_retries {
            // RequestBuilder can only be used once
            let Some(req) = request_builder.try_clone() else {
                log::warn!("[{endpoint}] Cannot clone request, disabling retry");
                return Self::execute_request(request_builder, endpoint).await;
            };

            match Self::execute_request(req, endpoint).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    let delay = retry_delay(&e, attempt);
                    log::warn!(
                        "[{}] Request failed (attempt {}/{}), retrying in {:.1}s: {}",
                        endpoint,
                        attempt + 1,
                        max_retries,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::NetworkError {
            endpoint: endpoint.to_string(),
            detail: "All retries exhausted with no error captured".to_string(),
        }))
    }
}

/// Calculate retry delay
///
/// `RateLimited` with `retry_after` waits that long (capped at 30s);
/// everything else uses exponential backoff.
fn retry_delay(error: &ApiError, attempt: u32) -> Duration {
    if let ApiError::RateLimited {
        retry_after: Some(secs),
        ..
    } = error
    {
        Duration::from_secs((*secs).min(30))
    } else {
        backoff_delay(attempt)
    }
}

/// Exponential backoff: 100ms, 200ms, 400ms, 800ms, 1.6s, ... capped at 10s.
fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(20); // Prevent 2^attempt from overflowing
    let delay_ms = 100_u64.saturating_mul(1_u64 << capped_attempt);
    let delay_ms = delay_ms.min(10_000);
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::time::Duration;

    // ---- retry_delay ----

    #[test]
    fn retry_delay_honors_retry_after() {
        let e = ApiError::RateLimited {
            endpoint: "test".into(),
            retry_after: Some(7),
            raw_message: None,
        };
        assert_eq!(retry_delay(&e, 0), Duration::from_secs(7));
    }

    #[test]
    fn retry_delay_caps_retry_after() {
        let e = ApiError::RateLimited {
            endpoint: "test".into(),
            retry_after: Some(600),
            raw_message: None,
        };
        assert_eq!(retry_delay(&e, 0), Duration::from_secs(30));
    }

    #[test]
    fn retry_delay_falls_back_to_backoff() {
        let e = ApiError::Timeout {
            endpoint: "test".into(),
            detail: "err".into(),
        };
        assert_eq!(retry_delay(&e, 2), Duration::from_millis(400));
    }

    // ---- backoff_delay ----

    #[test]
    fn backoff_attempt_0() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
    }

    #[test]
    fn backoff_attempt_3() {
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn backoff_capped_at_10s() {
        // attempt 7: 100 * 2^7 = 12800ms, capped to 10000ms
        assert_eq!(backoff_delay(7), Duration::from_millis(10_000));
    }

    // ---- ensure_success ----

    #[test]
    fn success_status_passes() {
        assert!(HttpUtils::ensure_success(204, "", "test").is_ok());
    }

    #[test]
    fn rejected_status_surfaces_error_field() {
        let result = HttpUtils::ensure_success(400, r#"{"error":"API URL is required"}"#, "test");
        assert!(
            matches!(
                &result,
                Err(ApiError::ServerRejected { status: 400, message, .. }) if message == "API URL is required"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn rejected_status_falls_back_to_plain_body() {
        let result = HttpUtils::ensure_success(500, "Internal Server Error", "test");
        assert!(
            matches!(
                &result,
                Err(ApiError::ServerRejected { message, .. }) if message == "Internal Server Error"
            ),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn auth_and_missing_statuses_are_classified() {
        assert!(matches!(
            HttpUtils::ensure_success(401, "", "test"),
            Err(ApiError::Unauthorized { .. })
        ));
        assert!(matches!(
            HttpUtils::ensure_success(404, r#"{"message":"no such server"}"#, "test"),
            Err(ApiError::NotFound { raw_message: Some(_), .. })
        ));
    }

    // ---- parse_json ----

    #[test]
    fn parse_json_valid() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Foo {
            x: i32,
        }
        let result: Result<Foo, ApiError> = HttpUtils::parse_json(r#"{"x":42}"#, "test");
        assert!(
            matches!(&result, Ok(Foo { x: 42 })),
            "unexpected parse result: {result:?}"
        );
    }

    #[test]
    fn parse_json_invalid() {
        #[derive(serde::Deserialize, Debug)]
        #[allow(dead_code)]
        struct Foo {
            x: i32,
        }
        let result: Result<Foo, ApiError> = HttpUtils::parse_json("not json", "test");
        assert!(
            matches!(&result, Err(ApiError::ParseError { .. })),
            "unexpected parse result: {result:?}"
        );
    }
}
