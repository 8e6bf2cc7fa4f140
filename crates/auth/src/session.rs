//! Session store: the single owner of the persisted session token.
//!
//! One [`SessionStore`] is built at process start and shared (`Arc`) with
//! every consumer: navigation gates, the request augmenter, and views that
//! subscribe to role changes. There is no global instance.
//!
//! Decode and expiry failures never escape this module. A token that cannot
//! be decoded, or has expired, is evicted from storage the first time
//! [`SessionStore::is_authenticated`] sees it, and the session reads as
//! logged out from then on.
//!
//! Token writes, evictions and new subscriptions are serialized by one
//! store-level lock, and an eviction only removes the exact token that was
//! checked. A login landing between the check and the eviction survives.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use capstock_events::{EventBus, InMemoryEventBus, Subscription};

use crate::storage::{StorageError, TokenStorage};
use crate::{Claims, RoleSet, codec, extract_roles};

/// Storage key holding the raw token.
pub const TOKEN_KEY: &str = "authToken";

/// Wall-clock source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Snapshot of the derived session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub has_token: bool,
    pub is_expired: bool,
    pub roles: RoleSet,
}

/// Read-side view of a session, consumed by gates and request augmentation.
pub trait SessionView: Send + Sync {
    /// Raw token, if one is stored.
    fn token(&self) -> Option<String>;

    /// Token present, decodable and not expired.
    fn is_authenticated(&self) -> bool;

    /// Roles granted by the stored token.
    fn roles(&self) -> RoleSet;
}

pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    clock: Arc<dyn Clock>,
    bus: InMemoryEventBus<RoleSet>,
    published: Mutex<RoleSet>,
    guard: Mutex<()>,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("subscribers", &self.bus.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Build the store and restore role state from a token persisted by an
    /// earlier run, if it is still valid.
    pub fn new(storage: Arc<dyn TokenStorage>, clock: Arc<dyn Clock>) -> Self {
        let store = Self {
            storage,
            clock,
            bus: InMemoryEventBus::new(),
            published: Mutex::new(RoleSet::new()),
            guard: Mutex::new(()),
        };

        if store.is_authenticated() {
            tracing::debug!("restoring session from persisted token");
            store.publish(store.roles());
        }

        store
    }

    /// Store backed by the system clock.
    pub fn with_system_clock(storage: Arc<dyn TokenStorage>) -> Self {
        Self::new(storage, Arc::new(SystemClock))
    }

    /// Raw token as stored. Storage failures read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => {
                tracing::trace!(present = token.is_some(), "token lookup");
                token
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read session token; treating as absent");
                None
            }
        }
    }

    /// Persist `token` verbatim and publish the roles it grants.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        let token = token.into();
        let _guard = self.lock();
        self.storage.set(TOKEN_KEY, &token)?;
        self.publish(roles_of(&token));
        Ok(())
    }

    /// Remove the token and publish an empty role set.
    pub fn clear_token(&self) -> Result<(), StorageError> {
        let _guard = self.lock();
        self.storage.remove(TOKEN_KEY)?;
        self.publish(RoleSet::new());
        Ok(())
    }

    /// `true` iff a decodable, unexpired token is stored.
    ///
    /// Undecodable or expired tokens are evicted as a side effect.
    pub fn is_authenticated(&self) -> bool {
        let _guard = self.lock();
        let Some(token) = self.token() else {
            return false;
        };

        let now = self.clock.now();
        let reason = match codec::decode(&token) {
            Ok(claims) if !claims.is_expired_at(now) => return true,
            Ok(claims) if claims.exp().is_none() => "missing expiry",
            Ok(_) => "expired",
            Err(err) => {
                tracing::debug!(error = %err, "stored token failed to decode");
                "undecodable"
            }
        };

        tracing::info!(reason, "evicting session token");
        self.evict(&token);
        false
    }

    /// Roles granted by the stored token; empty when absent or undecodable.
    ///
    /// Expiry is not checked here. Callers gate on
    /// [`SessionStore::is_authenticated`] first.
    pub fn roles(&self) -> RoleSet {
        self.token().map(|t| roles_of(&t)).unwrap_or_default()
    }

    /// Decoded claims of the stored token, if any.
    pub fn claims(&self) -> Option<Claims> {
        codec::decode(&self.token()?).ok()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().has_role(role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.roles().is_super_admin()
    }

    pub fn is_admin(&self) -> bool {
        self.roles().is_admin()
    }

    pub fn is_user(&self) -> bool {
        self.roles().is_user()
    }

    /// Derived state snapshot. Does not evict.
    pub fn state(&self) -> SessionState {
        let token = self.token();
        let claims = token.as_deref().map(codec::decode);
        let is_expired = match &claims {
            Some(Ok(claims)) => claims.is_expired_at(self.clock.now()),
            Some(Err(_)) => true,
            None => false,
        };
        let roles = match &claims {
            Some(Ok(claims)) => extract_roles(claims),
            _ => RoleSet::new(),
        };

        SessionState {
            has_token: token.is_some(),
            is_expired,
            roles,
        }
    }

    /// Subscribe to role-set changes.
    ///
    /// The current published role set is delivered immediately, then one
    /// message per `set_token`/`clear_token`/eviction. Drop the
    /// subscription to unsubscribe.
    pub fn subscribe(&self) -> Subscription<RoleSet> {
        let _guard = self.lock();
        let current = self
            .published
            .lock()
            .map(|roles| roles.clone())
            .unwrap_or_default();
        self.bus.subscribe_with(current)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `token` if it is still the stored one.
    fn evict(&self, token: &str) {
        match self.storage.remove_if(TOKEN_KEY, token) {
            Ok(true) => self.publish(RoleSet::new()),
            Ok(false) => tracing::debug!("session token replaced before eviction; keeping it"),
            Err(err) => tracing::warn!(error = %err, "failed to evict session token"),
        }
    }

    fn publish(&self, roles: RoleSet) {
        tracing::debug!(roles = ?roles, "publishing role set");
        if let Ok(mut published) = self.published.lock() {
            *published = roles.clone();
        }
        if let Err(err) = self.bus.publish(roles) {
            tracing::warn!(error = ?err, "failed to publish role set");
        }
    }
}

impl SessionView for SessionStore {
    fn token(&self) -> Option<String> {
        SessionStore::token(self)
    }

    fn is_authenticated(&self) -> bool {
        SessionStore::is_authenticated(self)
    }

    fn roles(&self) -> RoleSet {
        SessionStore::roles(self)
    }
}

impl<S: SessionView + ?Sized> SessionView for Arc<S> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }

    fn roles(&self) -> RoleSet {
        (**self).roles()
    }
}

fn roles_of(token: &str) -> RoleSet {
    codec::decode(token)
        .map(|claims| extract_roles(&claims))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration;
    use serde_json::{Value, json};

    struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(now)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn token(payload: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        format!("{header}.{body}.sig")
    }

    fn store_at(now: DateTime<Utc>) -> (SessionStore, Arc<MemoryStorage>, Arc<FixedClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = FixedClock::at(now);
        let store = SessionStore::new(storage.clone(), clock.clone());
        (store, storage, clock)
    }

    #[test]
    fn no_token_is_unauthenticated() {
        let (store, _, _) = store_at(Utc::now());
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert!(store.roles().is_empty());
    }

    #[test]
    fn set_then_get_returns_token_verbatim() {
        let (store, _, _) = store_at(Utc::now());
        store.set_token("  not.even.valid  ").unwrap();
        assert_eq!(store.token().as_deref(), Some("  not.even.valid  "));
    }

    #[test]
    fn valid_token_authenticates_until_expiry() {
        let now = Utc::now();
        let (store, _, clock) = store_at(now);
        let exp = (now + Duration::hours(1)).timestamp();
        store.set_token(token(json!({ "exp": exp, "roles": ["Admin"] }))).unwrap();

        assert!(store.is_authenticated());
        assert!(store.has_role("Admin"));
        assert!(!store.has_role("SuperAdmin"));

        clock.advance(Duration::minutes(59));
        assert!(store.is_authenticated());

        clock.advance(Duration::minutes(2));
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn expired_token_is_evicted() {
        let now = Utc::now();
        let (store, storage, _) = store_at(now);
        store
            .set_token(token(json!({ "exp": (now - Duration::seconds(1)).timestamp() })))
            .unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_token_is_evicted() {
        let (store, _, _) = store_at(Utc::now());
        store.set_token("garbage").unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn token_without_exp_is_evicted() {
        let (store, _, _) = store_at(Utc::now());
        store.set_token(token(json!({ "roles": ["Admin"] }))).unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn clear_token_logs_out() {
        let now = Utc::now();
        let (store, _, _) = store_at(now);
        store
            .set_token(token(json!({ "exp": (now + Duration::hours(1)).timestamp() })))
            .unwrap();
        store.clear_token().unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn subscribers_see_current_value_then_changes() {
        let now = Utc::now();
        let (store, _, _) = store_at(now);
        let roles = store.subscribe();
        assert!(roles.try_recv().unwrap().is_empty());

        store
            .set_token(token(json!({
                "exp": (now + Duration::hours(1)).timestamp(),
                "role": "SuperAdmin",
            })))
            .unwrap();
        let after_login = roles.try_recv().unwrap();
        assert!(after_login.is_super_admin());

        let late = store.subscribe();
        assert_eq!(late.try_recv().unwrap(), after_login);

        store.clear_token().unwrap();
        assert!(roles.try_recv().unwrap().is_empty());
        assert!(late.try_recv().unwrap().is_empty());
    }

    #[test]
    fn eviction_publishes_empty_roles() {
        let now = Utc::now();
        let (store, _, clock) = store_at(now);
        store
            .set_token(token(json!({
                "exp": (now + Duration::seconds(30)).timestamp(),
                "roles": ["User"],
            })))
            .unwrap();
        let roles = store.subscribe();
        assert!(roles.try_recv().unwrap().has_role("User"));

        clock.advance(Duration::minutes(1));
        assert!(!store.is_authenticated());
        assert!(roles.try_recv().unwrap().is_empty());
    }

    #[test]
    fn persisted_token_restores_roles_on_construction() {
        let now = Utc::now();
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                TOKEN_KEY,
                &token(json!({
                    "exp": (now + Duration::hours(1)).timestamp(),
                    "roles": ["Admin", "User"],
                })),
            )
            .unwrap();

        let store = SessionStore::new(storage, FixedClock::at(now));
        let current = store.subscribe().try_recv().unwrap();
        assert!(current.has_role("Admin"));
        assert!(current.has_role("User"));
    }

    #[test]
    fn expired_persisted_token_is_dropped_on_construction() {
        let now = Utc::now();
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(TOKEN_KEY, &token(json!({ "exp": (now - Duration::hours(1)).timestamp() })))
            .unwrap();

        let store = SessionStore::new(storage.clone(), FixedClock::at(now));
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert!(store.subscribe().try_recv().unwrap().is_empty());
    }

    #[test]
    fn state_reports_expiry_without_evicting() {
        let now = Utc::now();
        let (store, _, _) = store_at(now);
        store
            .set_token(token(json!({
                "exp": (now - Duration::seconds(5)).timestamp(),
                "roles": ["Admin"],
            })))
            .unwrap();

        let state = store.state();
        assert!(state.has_token);
        assert!(state.is_expired);
        assert!(state.roles.has_role("Admin"));
        assert!(store.token().is_some());
    }

    /// Storage where another writer logs in right after a token is read.
    struct LoginDuringRead {
        inner: MemoryStorage,
        pending: Mutex<Option<String>>,
    }

    impl TokenStorage for LoginDuringRead {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let current = self.inner.get(key)?;
            if let Some(newer) = self.pending.lock().unwrap().take() {
                self.inner.set(key, &newer)?;
            }
            Ok(current)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }

        fn remove_if(&self, key: &str, expected: &str) -> Result<bool, StorageError> {
            self.inner.remove_if(key, expected)
        }
    }

    #[test]
    fn eviction_keeps_token_written_after_the_check() {
        let now = Utc::now();
        let storage = Arc::new(LoginDuringRead {
            inner: MemoryStorage::new(),
            pending: Mutex::new(None),
        });
        let store = SessionStore::new(storage.clone(), FixedClock::at(now));
        let roles = store.subscribe();
        assert!(roles.try_recv().unwrap().is_empty());

        let fresh = token(json!({
            "exp": (now + Duration::hours(1)).timestamp(),
            "roles": ["Admin"],
        }));
        storage.inner.set(TOKEN_KEY, "garbage").unwrap();
        *storage.pending.lock().unwrap() = Some(fresh.clone());

        assert!(!store.is_authenticated());

        assert_eq!(storage.inner.get(TOKEN_KEY).unwrap(), Some(fresh));
        assert!(roles.try_recv().is_err());
        assert!(store.is_authenticated());
        assert!(store.has_role("Admin"));
    }

    #[test]
    fn concurrent_subscribers_converge_on_final_roles() {
        let now = Utc::now();
        let (store, _, _) = store_at(now);
        let store = Arc::new(store);
        let admin = token(json!({
            "exp": (now + Duration::hours(1)).timestamp(),
            "roles": ["Admin"],
        }));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    store.set_token(admin.clone()).unwrap();
                    store.clear_token().unwrap();
                }
                store.set_token(admin).unwrap();
            })
        };

        let subscriptions: Vec<_> = (0..200).map(|_| store.subscribe()).collect();
        writer.join().unwrap();

        let expected = store.roles();
        assert!(expected.has_role("Admin"));
        for sub in &subscriptions {
            assert_eq!(sub.latest().as_ref(), Some(&expected));
        }
    }
}
