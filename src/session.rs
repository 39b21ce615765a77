//! Session bookkeeping: token, IP binding and blacklist sub-maps.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::store::TokenStore;

const TOKEN_PREFIX: &str = "token:";
const IP_PREFIX: &str = "ip:";
const BLACKLIST_PREFIX: &str = "blacklist:";

/// Token lifetime. Cookie and JWT `exp` use the same value.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
/// Revocation grace window. Outlives [`TOKEN_TTL`] so tokens already in
/// flight at revocation time stay rejected past their own expiry.
pub const BLACKLIST_TTL: Duration = Duration::from_secs(75 * 60);

/// Bookkeeping for active sessions over an injected [`TokenStore`].
///
/// Multi-key updates are sequential single-key operations, not
/// transactions. A concurrent request may observe a token without its IP
/// binding or a removed token before its blacklist entry lands; both
/// transients only narrow the authenticated window.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn TokenStore>,
}

impl SessionRegistry {
    /// Create a new [`SessionRegistry`].
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Record a freshly issued token and its IP binding, both on the token
    /// lifetime.
    pub fn bind(&self, admin_id: &Uuid, token: &str, ip: &str) {
        self.store
            .set(&format!("{TOKEN_PREFIX}{admin_id}"), token.into(), TOKEN_TTL);
        self.store
            .set(&format!("{IP_PREFIX}{admin_id}"), ip.into(), TOKEN_TTL);
    }

    /// The admin's live token, if one is cached.
    pub fn token_for(&self, admin_id: &Uuid) -> Option<String> {
        self.store.get(&format!("{TOKEN_PREFIX}{admin_id}"))
    }

    /// The IP recorded when the admin's live token was issued.
    pub fn ip_for(&self, admin_id: &Uuid) -> Option<String> {
        self.store.get(&format!("{IP_PREFIX}{admin_id}"))
    }

    /// Move the admin's cached token onto the blacklist and drop the token
    /// and IP bindings. Returns the revoked token when one existed.
    pub fn revoke(&self, admin_id: &Uuid) -> Option<String> {
        let token = self.token_for(admin_id)?;

        self.store.set(
            &format!("{BLACKLIST_PREFIX}{token}"),
            token.clone(),
            BLACKLIST_TTL,
        );
        self.store.remove(&format!("{TOKEN_PREFIX}{admin_id}"));
        self.store.remove(&format!("{IP_PREFIX}{admin_id}"));

        Some(token)
    }

    /// Whether a token sits on the blacklist. The store's TTL bounds the
    /// grace window; presence alone means "reject".
    pub fn is_blacklisted(&self, token: &str) -> bool {
        self.store
            .get(&format!("{BLACKLIST_PREFIX}{token}"))
            .is_some()
    }

    /// Drop the token and IP bindings without blacklisting. Sweeper only:
    /// the token is already past its embedded expiry.
    pub fn unbind(&self, admin_id: &Uuid) {
        self.store.remove(&format!("{TOKEN_PREFIX}{admin_id}"));
        self.store.remove(&format!("{IP_PREFIX}{admin_id}"));
    }

    /// Snapshot of cached `(admin_id, token)` pairs.
    pub fn active(&self) -> Vec<(Uuid, String)> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|key| {
                let admin_id =
                    Uuid::parse_str(key.strip_prefix(TOKEN_PREFIX)?).ok()?;
                let token = self.store.get(&key)?;
                Some((admin_id, token))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ManualClock, MemoryStore};

    fn registry(clock: Arc<ManualClock>) -> SessionRegistry {
        SessionRegistry::new(Arc::new(MemoryStore::new(clock)))
    }

    #[test]
    fn test_bind_and_lookup() {
        let registry = registry(ManualClock::new(0));
        let admin = Uuid::new_v4();

        registry.bind(&admin, "jwt", "1.2.3.4");
        assert_eq!(registry.token_for(&admin).as_deref(), Some("jwt"));
        assert_eq!(registry.ip_for(&admin).as_deref(), Some("1.2.3.4"));
        assert_eq!(registry.active(), vec![(admin, "jwt".to_owned())]);
    }

    #[test]
    fn test_bindings_expire_with_token_ttl() {
        let clock = ManualClock::new(0);
        let registry = registry(clock.clone());
        let admin = Uuid::new_v4();

        registry.bind(&admin, "jwt", "1.2.3.4");
        clock.advance(TOKEN_TTL.as_secs());

        assert_eq!(registry.token_for(&admin), None);
        assert_eq!(registry.ip_for(&admin), None);
    }

    #[test]
    fn test_revoke_moves_token_to_blacklist() {
        let registry = registry(ManualClock::new(0));
        let admin = Uuid::new_v4();

        registry.bind(&admin, "jwt", "1.2.3.4");
        assert_eq!(registry.revoke(&admin).as_deref(), Some("jwt"));

        assert!(registry.is_blacklisted("jwt"));
        assert_eq!(registry.token_for(&admin), None);
        assert_eq!(registry.ip_for(&admin), None);

        // second revoke is a no-op.
        assert_eq!(registry.revoke(&admin), None);
    }

    #[test]
    fn test_blacklist_outlives_token_ttl() {
        let clock = ManualClock::new(0);
        let registry = registry(clock.clone());
        let admin = Uuid::new_v4();

        registry.bind(&admin, "jwt", "1.2.3.4");
        registry.revoke(&admin);

        // past the token's own lifetime, still rejected.
        clock.advance(TOKEN_TTL.as_secs() + 1);
        assert!(registry.is_blacklisted("jwt"));

        // the grace window closes at 75 minutes.
        clock.advance(BLACKLIST_TTL.as_secs() - TOKEN_TTL.as_secs());
        assert!(!registry.is_blacklisted("jwt"));
    }
}
