//! Manage json web tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::Admin;
use crate::config;
use crate::error::{Result, ServerError};
use crate::session::TOKEN_TTL;

/// Pieces of information asserted on a JWT.
///
/// The claim names are a contract with other back-office systems; do not
/// rename them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Random unique id; makes every issued token textually unique.
    pub jti: String,
    /// Admin ID, a stringified GUID.
    #[serde(rename = "adminId")]
    pub admin_id: String,
    /// One of `Admin` or `Moderator`.
    pub role: String,
    /// Stringified bool, `true` once the first-login password step is done.
    #[serde(rename = "passwordChosen")]
    pub password_chosen: String,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    ///
    /// Signing key, issuer and audience are all required; an empty member
    /// is a configuration error.
    pub fn new(config: &config::Token) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(ServerError::Configuration("token.secret is empty"));
        }
        if config.issuer.is_empty() {
            return Err(ServerError::Configuration("token.issuer is empty"));
        }
        if config.audience.is_empty() {
            return Err(ServerError::Configuration("token.audience is empty"));
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        })
    }

    /// Create a new [`jsonwebtoken`] for an admin, expiring in one hour.
    pub fn create(&self, admin: &Admin) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ServerError::Internal {
                details: err.to_string(),
            })?
            .as_secs();
        let header = Header::new(self.algorithm);
        let claims = Claims {
            aud: self.audience.clone(),
            exp: now + TOKEN_TTL.as_secs(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            admin_id: admin.admin_id.to_string(),
            role: admin.role.to_string(),
            password_chosen: admin.password_chosen.to_string(),
        };

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Decode and check a token. Zero leeway: an expired token fails
    /// immediately.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }

    /// Best-effort claim extraction: no signature, expiry or audience
    /// check.
    ///
    /// Sign-out needs the `adminId` claim out of tokens that may already be
    /// expired. Never use this where the caller must trust the claims.
    pub fn decode_unverified(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(&[]);
        Ok(decode::<Claims>(token, &key, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::Role;

    fn manager() -> TokenManager {
        TokenManager::new(&config::Token {
            secret: "an-over-32-byte-test-signing-secret".into(),
            issuer: "https://admin.example.com".into(),
            audience: "backoffice.example.com".into(),
        })
        .unwrap()
    }

    fn admin() -> Admin {
        Admin {
            admin_id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            role: Role::Admin,
            password_chosen: true,
        }
    }

    #[test]
    fn test_missing_configuration() {
        let incomplete = config::Token {
            secret: "key".into(),
            issuer: String::new(),
            audience: "aud".into(),
        };
        assert!(matches!(
            TokenManager::new(&incomplete),
            Err(ServerError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_and_decode() {
        let tokens = manager();
        let admin = admin();

        let token = tokens.create(&admin).unwrap();
        let claims = tokens.decode(&token).unwrap();

        assert_eq!(claims.admin_id, admin.admin_id.to_string());
        assert_eq!(claims.role, "Admin");
        assert_eq!(claims.password_chosen, "true");
        assert_eq!(claims.iss, "https://admin.example.com");
        assert_eq!(claims.aud, "backoffice.example.com");
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_every_token_is_textually_unique() {
        let tokens = manager();
        let admin = admin();

        // same admin, same second: jti still differs.
        assert_ne!(
            tokens.create(&admin).unwrap(),
            tokens.create(&admin).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_wrong_key() {
        let token = manager().create(&admin()).unwrap();

        let other = TokenManager::new(&config::Token {
            secret: "a-different-signing-secret-entirely".into(),
            issuer: "https://admin.example.com".into(),
            audience: "backoffice.example.com".into(),
        })
        .unwrap();

        assert!(other.decode(&token).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_audience() {
        let token = manager().create(&admin()).unwrap();

        let other = TokenManager::new(&config::Token {
            secret: "an-over-32-byte-test-signing-secret".into(),
            issuer: "https://admin.example.com".into(),
            audience: "somewhere.else".into(),
        })
        .unwrap();

        assert!(other.decode(&token).is_err());
    }

    #[test]
    fn test_unverified_decode_tolerates_expired_token() {
        let tokens = manager();
        let admin = admin();

        let expired = Claims {
            aud: "backoffice.example.com".into(),
            exp: 1, // long past.
            iss: "https://admin.example.com".into(),
            jti: Uuid::new_v4().to_string(),
            admin_id: admin.admin_id.to_string(),
            role: "Admin".into(),
            password_chosen: "true".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &expired,
            &EncodingKey::from_secret(b"an-over-32-byte-test-signing-secret"),
        )
        .unwrap();

        // the verifying path refuses it,
        assert!(tokens.decode(&token).is_err());
        // the explicit best-effort path still surfaces the claims.
        let claims = tokens.decode_unverified(&token).unwrap();
        assert_eq!(claims.admin_id, admin.admin_id.to_string());
    }
}
