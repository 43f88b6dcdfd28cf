//! Bearer-token authentication and per-IP rate limiting (§4.3 "HTTP
//! hardening"), adapted from the teacher gateway's auth middleware: a shared
//! token compared in constant time, rate limiting only on failed attempts,
//! loopback exempt.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use subtle::ConstantTimeEq;
use tracing::warn;

type IpLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

#[derive(Clone)]
pub struct AuthState {
    token: Arc<String>,
    limiter: Arc<IpLimiter>,
}

impl AuthState {
    pub fn new(token: impl Into<String>, max_per_minute: u32, burst: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(max_per_minute.max(1)).unwrap())
            .allow_burst(NonZeroU32::new(burst.max(1)).unwrap());
        Self {
            token: Arc::new(token.into()),
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    fn verify(&self, candidate: &str) -> bool {
        let expected = self.token.as_bytes();
        let given = candidate.as_bytes();
        if expected.len() != given.len() {
            return false;
        }
        expected.ct_eq(given).into()
    }
}

pub trait AsAuthState {
    fn auth_state(&self) -> &AuthState;
}

pub async fn bearer_auth_mw<S>(
    State(state): State<S>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response
where
    S: AsAuthState + Clone + Send + Sync + 'static,
{
    verify_bearer(state.auth_state(), addr.ip(), req, next).await
}

pub async fn verify_bearer(auth: &AuthState, ip: IpAddr, req: Request, next: Next) -> Response {
    match extract_bearer(req.headers()) {
        Some(token) if auth.verify(token) => next.run(req).await,
        _ => {
            if !is_loopback(ip) {
                if auth.limiter.check_key(&ip).is_err() {
                    warn!(%ip, "rate limit exceeded after repeated auth failures");
                    return (
                        StatusCode::TOO_MANY_REQUESTS,
                        [(axum::http::header::RETRY_AFTER, "60")],
                        "Too Many Requests",
                    )
                        .into_response();
                }
            }
            warn!(%ip, "authentication failed");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4 == Ipv4Addr::LOCALHOST,
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_from_valid_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer secret-token".parse().unwrap(),
        );
        assert_eq!(extract_bearer(&headers), Some("secret-token"));
    }

    #[test]
    fn extract_bearer_missing_header() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn verify_accepts_matching_token() {
        let state = AuthState::new("secret-token", 5, 2);
        assert!(state.verify("secret-token"));
    }

    #[test]
    fn verify_rejects_wrong_token() {
        let state = AuthState::new("secret-token", 5, 2);
        assert!(!state.verify("wrong-token"));
    }

    #[test]
    fn verify_rejects_different_length_without_panicking() {
        let state = AuthState::new("secret-token", 5, 2);
        assert!(!state.verify("short"));
    }

    #[test]
    fn loopback_v4_is_loopback() {
        assert!(is_loopback(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn non_loopback_is_not_loopback() {
        assert!(!is_loopback("10.0.0.5".parse().unwrap()));
    }
}
