//! Bearer auth and per-IP rate limiting for the protected routes.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use super::handlers::ApiError;

const MAX_TRACKED_CLIENTS: usize = 10_000;
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Digest of the expected bearer token, computed once at startup.
#[derive(Clone)]
pub(crate) struct BearerAuth {
    expected: Option<blake3::Hash>,
}

impl BearerAuth {
    pub(crate) fn new(token: Option<&str>) -> Self {
        Self {
            expected: token.map(|t| blake3::hash(t.as_bytes())),
        }
    }

    /// Digests are fixed-length, so comparison does not leak the token length.
    fn accepts(&self, header_value: Option<&str>) -> bool {
        let Some(expected) = &self.expected else {
            return true;
        };
        let presented = header_value
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");
        let presented = blake3::hash(presented.as_bytes());
        bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
    }
}

pub(crate) async fn require_bearer(
    State(auth): State<BearerAuth>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !auth.accepts(header_value) {
        tracing::debug!(path = %req.uri().path(), "rejected request with bad bearer token");
        return ApiError::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token")
            .into_response();
    }
    next.run(req).await
}

/// Fixed-window request counter per client IP. A limit of 0 disables it.
///
/// At most `max_clients` windows are kept; when all of them are live the one that started
/// first is dropped to make room.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    limit: u32,
    max_clients: usize,
    windows: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
}

impl RateLimiter {
    pub(crate) fn new(limit: u32) -> Self {
        Self::with_max_clients(limit, MAX_TRACKED_CLIENTS)
    }

    pub(crate) fn with_max_clients(limit: u32, max_clients: usize) -> Self {
        Self {
            limit,
            max_clients: max_clients.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn admit(&self, ip: IpAddr, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }
        let mut windows = self.windows.lock().await;

        if windows.len() >= self.max_clients && !windows.contains_key(&ip) {
            windows.retain(|_, (_, started)| now.duration_since(*started) < RATE_WINDOW);
            if windows.len() >= self.max_clients {
                let oldest = windows
                    .iter()
                    .min_by_key(|(_, (_, started))| *started)
                    .map(|(client, _)| *client);
                if let Some(oldest) = oldest {
                    windows.remove(&oldest);
                    tracing::debug!(evicted = %oldest, "rate limiter full");
                }
            }
        }

        let (count, started) = windows.entry(ip).or_insert((0, now));
        if now.duration_since(*started) >= RATE_WINDOW {
            *count = 1;
            *started = now;
            return true;
        }
        *count += 1;
        *count <= self.limit
    }
}

pub(crate) async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ci| ci.0.ip());

    if !limiter.admit(ip, Instant::now()).await {
        tracing::warn!(%ip, "rate limit exceeded");
        return ApiError::new(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_token_configured() {
        let auth = BearerAuth::new(None);
        assert!(auth.accepts(None));
        assert!(auth.accepts(Some("Bearer anything")));
    }

    #[test]
    fn token_must_match_exactly() {
        let auth = BearerAuth::new(Some("secret"));
        assert!(auth.accepts(Some("Bearer secret")));
        assert!(!auth.accepts(Some("Bearer secret2")));
        assert!(!auth.accepts(Some("secret")));
        assert!(!auth.accepts(None));
    }

    #[tokio::test]
    async fn window_resets_after_a_minute() {
        let limiter = RateLimiter::new(1);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let t0 = Instant::now();

        assert!(limiter.admit(ip, t0).await);
        assert!(!limiter.admit(ip, t0 + Duration::from_secs(1)).await);
        assert!(limiter.admit(ip, t0 + RATE_WINDOW).await);
    }

    #[tokio::test]
    async fn clients_counted_separately() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();
        assert!(limiter.admit(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), now).await);
        assert!(limiter.admit(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), now).await);
    }

    #[tokio::test]
    async fn tracked_clients_stay_bounded() {
        let limiter = RateLimiter::with_max_clients(1, 3);
        let t0 = Instant::now();
        for n in 0..10u8 {
            let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, n));
            assert!(limiter.admit(ip, t0 + Duration::from_millis(u64::from(n))).await);
            assert!(limiter.windows.lock().await.len() <= 3);
        }
        let windows = limiter.windows.lock().await;
        // the most recent clients survive
        assert!(windows.contains_key(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))));
        assert!(!windows.contains_key(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0))));
    }

    #[tokio::test]
    async fn zero_limit_disables() {
        let limiter = RateLimiter::new(0);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        for _ in 0..100 {
            assert!(limiter.admit(ip, Instant::now()).await);
        }
    }
}
