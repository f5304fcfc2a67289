//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One pooled client per request timeout, reused across providers and requests.
static SHARED_CLIENTS: LazyLock<Mutex<HashMap<Duration, reqwest::Client>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Create the HTTP client used by every provider.
///
/// Config: 10s connect timeout, `timeout` for the whole request, rustls TLS,
/// `skillrec/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .timeout(timeout)
        .user_agent(concat!("skillrec/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}

/// Client for `timeout`, built on first use and shared afterwards so connection pools survive
/// between requests.
#[must_use]
pub fn shared_client(timeout: Duration) -> reqwest::Client {
    let mut clients = SHARED_CLIENTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    clients
        .entry(timeout)
        .or_insert_with(|| client_with_timeout(timeout))
        .clone()
}

#[must_use]
pub fn default_client() -> reqwest::Client {
    shared_client(DEFAULT_TIMEOUT)
}

/// Pull a human-readable message out of a provider error body.
///
/// Both supported providers answer with `{"error": {"message": "..."}}`. Anything else is
/// reduced to the status reason so raw bodies never reach the caller.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_error_message() {
        let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
        assert_eq!(
            error_message(reqwest::StatusCode::UNAUTHORIZED, body),
            "Invalid API key"
        );
    }

    #[test]
    fn falls_back_to_reason() {
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "Bad Gateway"
        );
    }

    #[test]
    fn client_builds() {
        let _ = client_with_timeout(Duration::from_millis(50));
    }

    #[test]
    fn shared_client_cached_per_timeout() {
        let timeout = Duration::from_millis(4321);
        let _ = shared_client(timeout);
        let _ = shared_client(timeout);
        let _ = shared_client(timeout + Duration::from_millis(1));

        let clients = SHARED_CLIENTS.lock().unwrap();
        assert!(clients.contains_key(&timeout));
        assert!(clients.contains_key(&(timeout + Duration::from_millis(1))));
        assert_eq!(
            clients
                .keys()
                .filter(|t| **t == timeout || **t == timeout + Duration::from_millis(1))
                .count(),
            2
        );
    }
}
