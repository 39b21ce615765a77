use axum::http::StatusCode;
use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::admin::Role;
use crate::cookie;
use crate::error::Result;
use crate::ip::ClientIp;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set when the admin must complete the first-login password step;
    /// identifies which account the client should route to that flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub password_change_required: bool,
}

impl Response {
    fn signed_in(role: Role) -> Self {
        Self {
            success: true,
            role: Some(role),
            ..Default::default()
        }
    }

    // One message for unknown email and wrong password alike, so replies
    // cannot be used to enumerate accounts.
    fn bad_credentials() -> Self {
        Self {
            success: false,
            error_message: Some("Invalid email or password.".into()),
            ..Default::default()
        }
    }

    fn password_change_required(admin_id: Uuid) -> Self {
        Self {
            success: false,
            error_message: Some(
                "You need to change your password first.".into(),
            ),
            admin_id: Some(admin_id),
            password_change_required: true,
            ..Default::default()
        }
    }
}

/// Handler to sign an admin in and set the `AccessToken` cookie.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ClientIp(client_ip): ClientIp,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, CookieJar, Json<Response>)> {
    let Some(admin) = state.credentials.find_by_email(&body.email) else {
        tracing::warn!("sign-in failed: unknown email");
        return Ok((
            StatusCode::UNAUTHORIZED,
            jar,
            Json(Response::bad_credentials()),
        ));
    };

    // The password-set gate comes before verification: no token and no
    // cookie for these accounts, whatever the submitted password.
    if !admin.password_chosen {
        tracing::info!(admin = %admin.admin_id, "sign-in deferred to password setup");
        return Ok((
            StatusCode::BAD_REQUEST,
            jar,
            Json(Response::password_change_required(admin.admin_id)),
        ));
    }

    if state
        .crypto
        .verify_password(&body.password, &admin.password_hash)
        .is_err()
    {
        tracing::warn!(admin = %admin.admin_id, "sign-in failed: wrong password");
        return Ok((
            StatusCode::UNAUTHORIZED,
            jar,
            Json(Response::bad_credentials()),
        ));
    }

    let (token, role) = state.auth.issue(admin, &client_ip)?;
    let jar = jar.add(cookie::access_token(token));

    tracing::info!(admin = %admin.admin_id, "admin signed in");
    Ok((StatusCode::OK, jar, Json(Response::signed_in(role))))
}
