//! Authoritative record of the signed-in user.
//!
//! SYSTEM CONTEXT
//! ==============
//! The credential client installs tokens here, the startup hook restores the
//! persisted token before first render, and UI collaborators read identity
//! and roles from here.
//!
//! DESIGN
//! ======
//! One store per application, shared by `Arc`. State lives in a
//! `tokio::sync::watch` channel: `borrow()` gives synchronous reads and
//! `subscribe()` gives change notification. Every mutation is complete when
//! the method returns, so no caller observes stale identity after a write.
//!
//! Expiry is lazy: it is only checked when a persisted token is restored.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{OnceCell, watch};

use crate::storage::DurableStorage;
use crate::token::{self, Claims, TokenError};

/// Durable storage key holding the raw bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Identity derived from a decoded token. Never persisted directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub username: String,
    pub user_id: i64,
    pub roles: BTreeSet<String>,
    /// Seconds since the Unix epoch.
    pub expiry: i64,
    pub display_name: String,
}

impl UserIdentity {
    #[must_use]
    pub fn from_claims(claims: Claims) -> Self {
        let roles = claims.roles();
        Self {
            username: claims.sub,
            user_id: claims.user_id,
            roles,
            expiry: claims.exp,
            display_name: claims.profile_name,
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Upper-cased first character of the display name.
    #[must_use]
    pub fn initials(&self) -> Option<String> {
        self.display_name.chars().next().map(|c| c.to_uppercase().collect())
    }
}

/// Session state machine: anonymous, or authenticated as one [`UserIdentity`].
pub struct SessionStore {
    storage: Arc<dyn DurableStorage>,
    user: watch::Sender<Option<UserIdentity>>,
    initialized: OnceCell<()>,
}

impl SessionStore {
    /// Create an anonymous store backed by `storage`. Call [`Self::initialize`]
    /// before first render to pick up a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage, user: watch::Sender::new(None), initialized: OnceCell::new() }
    }

    /// Install the identity carried by `token` and persist the raw token.
    ///
    /// The token is trusted to be fresh; no expiry check happens here.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the token cannot be decoded. State and
    /// storage are left untouched in that case.
    pub fn set_from_token(&self, token: &str) -> Result<(), TokenError> {
        let identity = UserIdentity::from_claims(token::decode(token)?);
        tracing::info!(username = %identity.username, user_id = identity.user_id, "session established");
        self.user.send_replace(Some(identity));
        if let Err(e) = self.storage.set_item(ACCESS_TOKEN_KEY, token) {
            tracing::warn!(error = %e, "failed to persist access token");
        }
        Ok(())
    }

    /// Re-establish the session from durable storage.
    ///
    /// No stored token is a no-op. An expired or undecodable token is
    /// discarded via [`Self::clear`]. Never fails.
    pub fn restore(&self) {
        self.restore_at(unix_now());
    }

    fn restore_at(&self, now: i64) {
        let Some(token) = self.storage.get_item(ACCESS_TOKEN_KEY) else {
            return;
        };

        match token::decode(&token) {
            Ok(claims) if claims.exp > now => {
                let identity = UserIdentity::from_claims(claims);
                tracing::info!(username = %identity.username, "session restored");
                self.user.send_replace(Some(identity));
            }
            Ok(claims) => {
                tracing::info!(expired_at = claims.exp, "stored session expired");
                self.clear();
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable stored token");
                self.clear();
            }
        }
    }

    /// Drop the session and erase the stored token. Idempotent; subscribers
    /// are only notified when a user was actually signed in.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(ACCESS_TOKEN_KEY) {
            tracing::warn!(error = %e, "failed to erase access token");
        }
        if self.user.send_if_modified(|user| user.take().is_some()) {
            tracing::info!("session cleared");
        }
    }

    /// Startup hook: restores the persisted session exactly once. Later calls
    /// return immediately.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                self.restore();
            })
            .await;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Snapshot of the current identity.
    #[must_use]
    pub fn user(&self) -> Option<UserIdentity> {
        self.user.borrow().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.borrow().is_some()
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.user.borrow().as_ref().is_some_and(|user| user.has_role(role))
    }

    /// True when signed in with at least one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.user
            .borrow()
            .as_ref()
            .is_some_and(|user| roles.iter().any(|role| user.has_role(role)))
    }

    /// Presentation-only initial for avatars; `None` when anonymous.
    #[must_use]
    pub fn initials(&self) -> Option<String> {
        self.user.borrow().as_ref().and_then(UserIdentity::initials)
    }

    /// Receiver that observes every identity change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.user.subscribe()
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::storage::MemoryStorage;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    /// Unsigned token carrying `claims` as its payload.
    #[must_use]
    pub fn make_token(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[must_use]
    pub fn now() -> i64 {
        unix_now()
    }

    /// Token for `john_doe` expiring `ttl_secs` from now (negative for the past).
    #[must_use]
    pub fn john_token(ttl_secs: i64) -> String {
        make_token(&serde_json::json!({
            "iss": "issuer",
            "sub": "john_doe",
            "exp": now() + ttl_secs,
            "iat": now(),
            "userId": 1,
            "authorities": "ROLE_ADMIN ROLE_WRITER ROLE_READER",
            "profileName": "Johny Doe",
        }))
    }

    /// Fresh store over its own memory storage.
    #[must_use]
    pub fn memory_store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        (storage, store)
    }
}
