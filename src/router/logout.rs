use axum::http::StatusCode;
use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::cookie::{self, ACCESS_TOKEN_COOKIE};
use crate::error::Result;
use crate::ip::ClientIp;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    pub message: String,
}

/// Handler to sign the current admin out.
///
/// Best-effort: an absent or invalid cookie still yields success, and the
/// cookie is cleared regardless.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ClientIp(client_ip): ClientIp,
) -> Result<(StatusCode, CookieJar, Json<Response>)> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned());

    let signed_out = state.auth.sign_out(token.as_deref(), &client_ip);
    let jar = jar.remove(cookie::removal());

    if signed_out {
        Ok((
            StatusCode::OK,
            jar,
            Json(Response {
                success: true,
                message: "Signed out.".into(),
            }),
        ))
    } else {
        tracing::error!("sign-out failed due to an internal error");
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            jar,
            Json(Response {
                success: false,
                message: "Sign-out failed.".into(),
            }),
        ))
    }
}
