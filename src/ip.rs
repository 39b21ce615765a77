//! Client IP derivation, shared by issuance and validation.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use uuid::Uuid;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Derive the client address for session binding.
///
/// Prefers the first `X-Forwarded-For` value, then the transport remote
/// address. Loopback variants collapse to `127.0.0.1` so local development
/// traffic binds consistently across IPv4 and IPv6.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let ip = forwarded
        .map(ToOwned::to_owned)
        .or_else(|| remote.map(|addr| addr.ip().to_string()));

    match ip.as_deref() {
        Some("::1") | Some("127.0.0.1") => "127.0.0.1".to_owned(),
        Some(ip) => ip.to_owned(),
        None => {
            // No address at all: bind the session to a unique placeholder
            // so issuance still records *something*. A later validation
            // derives a fresh placeholder and fails the IP check, which is
            // the fail-closed side of this known weakness.
            let placeholder = Uuid::new_v4().to_string();
            tracing::warn!(
                %placeholder,
                "no client address available, generated placeholder"
            );
            placeholder
        },
    }
}

/// Extractor yielding the derived client address.
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self(client_ip(&parts.headers, remote)))
    }
}
