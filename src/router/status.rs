use axum::http::StatusCode;
use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::AuthStatus;
use crate::cookie::ACCESS_TOKEN_COOKIE;
use crate::ip::ClientIp;

/// Handler reporting the authentication status of the current request.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ClientIp(client_ip): ClientIp,
) -> (StatusCode, Json<AuthStatus>) {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned());

    let status = state.auth.validate(token.as_deref(), &client_ip);
    let code = if status.is_authenticated {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };

    (code, Json(status))
}
