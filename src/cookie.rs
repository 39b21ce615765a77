//! The `AccessToken` cookie.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::{Duration, OffsetDateTime};

use crate::session::TOKEN_TTL;

pub const ACCESS_TOKEN_COOKIE: &str = "AccessToken";

/// HttpOnly, Secure, cross-site cookie carrying the raw signed token.
///
/// `SameSite=None` because the back-office front-end lives on another
/// origin; CORS restricts who may actually send it.
pub fn access_token(token: String) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::seconds(TOKEN_TTL.as_secs() as i64))
        .build()
}

/// Expired replacement used to clear the cookie on sign-out and revocation.
pub fn removal() -> Cookie<'static> {
    let mut cookie = access_token(String::new());
    cookie.set_max_age(Duration::ZERO);
    cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
    cookie
}
