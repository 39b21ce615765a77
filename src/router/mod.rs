//! HTTP handlers for the auth surface.

pub mod login;
pub mod logout;
pub mod status;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// Json extractor that runs `validator` rules before the handler sees the
/// body.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::admin::{Admin, CredentialStore, Role};
    use crate::auth::AccessTokenService;
    use crate::session::SessionRegistry;
    use crate::store::{MemoryStore, SystemClock};
    use crate::{AppState, config, crypto, token};

    pub const PASSWORD: &str = "P$soW%920$n&";

    /// State over in-memory fixtures: one admin, one moderator still
    /// waiting on the first-login password step.
    pub fn state() -> AppState {
        let argon2 = config::Argon2 {
            memory_cost: 1024 * 8,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        };
        let crypto =
            crypto::PasswordManager::new(Some(argon2.clone())).unwrap();
        let password_hash = crypto.hash_password(PASSWORD).unwrap();

        let admins = vec![
            Admin {
                admin_id: Uuid::new_v4(),
                email: "alice@example.com".into(),
                password_hash: password_hash.clone(),
                role: Role::Admin,
                password_chosen: true,
            },
            Admin {
                admin_id: Uuid::new_v4(),
                email: "newcomer@example.com".into(),
                password_hash,
                role: Role::Moderator,
                password_chosen: false,
            },
        ];

        let token = config::Token {
            secret: "an-over-32-byte-test-signing-secret".into(),
            issuer: "https://admin.example.com".into(),
            audience: "backoffice.example.com".into(),
        };

        let mut config = config::Configuration::default();
        config.name = "admingate-test".into();
        config.url = "https://admin.example.com/".into();
        config.token = Some(token.clone());
        config.admins = admins.clone();
        config.argon2 = Some(argon2);

        let tokens = token::TokenManager::new(&token).unwrap();
        let sessions = SessionRegistry::new(Arc::new(MemoryStore::new(
            Arc::new(SystemClock),
        )));

        AppState {
            config: Arc::new(config),
            credentials: CredentialStore::new(admins),
            crypto: Arc::new(crypto),
            auth: Arc::new(AccessTokenService::new(tokens, sessions)),
        }
    }
}
