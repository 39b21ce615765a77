//! Access-token lifecycle: issue, validate, revoke.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::{Admin, Role};
use crate::error::Result;
use crate::session::SessionRegistry;
use crate::token::TokenManager;

/// Request-scoped authentication decision. Never cached; recomputed on
/// every protected request.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthStatus {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuthStatus {
    fn granted(role: String) -> Self {
        Self {
            is_authenticated: true,
            role: Some(role),
            error_message: None,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            is_authenticated: false,
            role: None,
            error_message: Some(reason.into()),
        }
    }
}

/// Issues, validates and revokes the single live access token each admin
/// may hold.
pub struct AccessTokenService {
    tokens: TokenManager,
    sessions: SessionRegistry,
}

impl AccessTokenService {
    /// Create a new [`AccessTokenService`].
    pub fn new(tokens: TokenManager, sessions: SessionRegistry) -> Self {
        Self { tokens, sessions }
    }

    /// Mint a signed token for `admin` and record its session bindings.
    ///
    /// Whatever token the admin held before is revoked first, so at most
    /// one token per admin is ever live. Returns the raw token (for the
    /// cookie) and the role claim (for post-login navigation).
    pub fn issue(&self, admin: &Admin, client_ip: &str) -> Result<(String, Role)> {
        self.revoke(&admin.admin_id);

        let token = self.tokens.create(admin)?;
        self.sessions.bind(&admin.admin_id, &token, client_ip);

        tracing::info!(admin = %admin.admin_id, "issued new access token");
        Ok((token, admin.role))
    }

    /// Authentication decision for the current request.
    ///
    /// Short-circuits on the first failure, in a fixed order: missing
    /// token, blacklist, signature/issuer/audience/expiry, `adminId`
    /// claim, IP binding. The blacklist comes before signature checks so a
    /// revoked token is rejected without touching the key at all.
    pub fn validate(&self, cookie: Option<&str>, client_ip: &str) -> AuthStatus {
        let Some(token) = cookie.filter(|token| !token.is_empty()) else {
            return AuthStatus::denied("token missing");
        };

        if self.sessions.is_blacklisted(token) {
            tracing::warn!("rejected blacklisted token");
            return AuthStatus::denied("token blacklisted");
        }

        let claims = match self.tokens.decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(error = %err, "token validation failed");
                return AuthStatus::denied(format!("token invalid: {err}"));
            },
        };

        let Ok(admin_id) = Uuid::parse_str(&claims.admin_id) else {
            tracing::warn!("adminId claim missing or unparseable");
            return AuthStatus::denied("claims invalid");
        };

        // No recorded IP passes; only an explicit mismatch fails. The role
        // is carried from the claims either way.
        match self.sessions.ip_for(&admin_id) {
            Some(bound) if bound != client_ip => {
                tracing::warn!(admin = %admin_id, "IP mismatch on validation");
                AuthStatus {
                    is_authenticated: false,
                    role: Some(claims.role),
                    error_message: Some("IP mismatch".into()),
                }
            },
            _ => {
                tracing::debug!(admin = %admin_id, "token validated");
                AuthStatus::granted(claims.role)
            },
        }
    }

    /// Revoke the admin's live token. No-op when nothing is cached.
    pub fn revoke(&self, admin_id: &Uuid) -> bool {
        match self.sessions.revoke(admin_id) {
            Some(_) => {
                tracing::info!(admin = %admin_id, "access token revoked and blacklisted");
                true
            },
            None => {
                tracing::debug!(admin = %admin_id, "no active token to revoke");
                false
            },
        }
    }

    /// Best-effort sign-out for whatever token the cookie carries.
    ///
    /// The validation outcome is only logged; expired and otherwise
    /// invalid tokens are still revoked via unverified claim extraction.
    pub fn sign_out(&self, cookie: Option<&str>, client_ip: &str) -> bool {
        let Some(token) = cookie.filter(|token| !token.is_empty()) else {
            tracing::warn!("signing out without a token");
            return true;
        };

        let status = self.validate(Some(token), client_ip);
        if !status.is_authenticated {
            tracing::info!(
                reason = status.error_message.as_deref().unwrap_or_default(),
                "token no longer valid, proceeding with sign-out"
            );
        }

        match self.tokens.decode_unverified(token) {
            Ok(claims) => match Uuid::parse_str(&claims.admin_id) {
                Ok(admin_id) => {
                    self.revoke(&admin_id);
                },
                Err(_) => {
                    tracing::warn!("adminId claim unparseable during sign-out");
                },
            },
            Err(err) => {
                tracing::warn!(error = %err, "cannot decode token during sign-out");
            },
        }

        true
    }

    /// Drop cached sessions whose embedded JWT expiry has passed.
    ///
    /// The store's own TTLs already bound every entry; this is periodic
    /// cleanup, not load-bearing.
    pub fn sweep_expired(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        for (admin_id, token) in self.sessions.active() {
            let expired = self
                .tokens
                .decode_unverified(&token)
                .map(|claims| claims.exp <= now)
                .unwrap_or(false);

            if expired {
                self.sessions.unbind(&admin_id);
                tracing::debug!(admin = %admin_id, "swept expired session");
            }
        }
    }

    /// Run [`Self::sweep_expired`] on an interval until shutdown.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately.
            loop {
                interval.tick().await;
                self.sweep_expired();
            }
        });
    }
}
