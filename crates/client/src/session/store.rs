//! Session store implementation.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AuthResponse, PersistedSession, Session, User, keys};

use super::{BearerToken, SessionError, SessionEvent, SessionStorage};

/// Capacity of the session event channel. Slow receivers skip old events.
const EVENT_CAPACITY: usize = 16;

/// Single source of truth for the current session.
///
/// Cheaply cloneable via `Arc`; every clone observes the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Box<dyn SessionStorage>,
    state: watch::Sender<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.inner.state.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store, rehydrating any valid session from `storage`.
    #[must_use]
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        let restored = restore(&storage);
        let (state, _) = watch::channel(restored);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionStoreInner {
                storage: Box::new(storage),
                state,
                events,
            }),
        }
    }

    /// The active session, if any.
    ///
    /// A session whose token has expired since the last read is cleared here
    /// and reported as absent.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        let session = self.inner.state.borrow().clone()?;
        if session.token.is_expired() {
            info!("Session token expired");
            self.expire();
            return None;
        }
        Some(session)
    }

    /// Returns true if a non-expired session is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.current().map(|session| session.user)
    }

    /// The active session, or a login-required signal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AuthRequired` (after emitting
    /// [`SessionEvent::LoginRequired`]) when no valid session exists.
    pub fn require_active(&self) -> Result<Session, SessionError> {
        self.current().ok_or_else(|| {
            debug!("Operation requires login");
            self.emit(SessionEvent::LoginRequired);
            SessionError::AuthRequired
        })
    }

    /// Start a session from an authentication response and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token is already expired or the
    /// session record cannot be persisted. In-memory state is unchanged on
    /// error.
    pub fn login(&self, response: AuthResponse) -> Result<Session, SessionError> {
        let session = Session {
            user: response.user,
            token: BearerToken::new(response.access),
        };

        if session.token.is_expired() {
            warn!("Authentication response carried an expired token");
            return Err(SessionError::ExpiredToken);
        }

        let record = serde_json::to_string(&session.to_persisted())?;
        self.inner.storage.set(keys::SESSION, &record)?;
        self.inner.state.send_replace(Some(session.clone()));

        set_sentry_user(&session.user);
        info!(user = %session.user.label(), "Logged in");
        self.emit(SessionEvent::LoggedIn);

        Ok(session)
    }

    /// Clear the session and remove the persisted record.
    ///
    /// Always takes local effect, even if the record cannot be removed.
    pub fn logout(&self) {
        if self.clear() {
            info!("Logged out");
            self.emit(SessionEvent::LoggedOut);
        }
    }

    /// Clear the session because its credential is no longer valid.
    pub fn expire(&self) {
        if self.clear() {
            info!("Session expired");
            self.emit(SessionEvent::Expired);
        }
    }

    /// Clear the session after the API rejected its credential.
    ///
    /// Always emits [`SessionEvent::LoginRequired`].
    pub fn handle_unauthorized(&self) {
        if self.clear() {
            warn!("API rejected the session credential");
        }
        self.emit(SessionEvent::LoginRequired);
    }

    /// Watch the session state. The value is `None` while logged out.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.state.subscribe()
    }

    /// Receive session events (login, logout, expiry, login-required).
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Clear state and storage. Returns true if a session was present.
    fn clear(&self) -> bool {
        let previous = self.inner.state.send_replace(None);

        if let Err(e) = self.inner.storage.remove(keys::SESSION) {
            warn!(error = %e, "Failed to remove persisted session");
        }

        if previous.is_some() {
            clear_sentry_user();
        }
        previous.is_some()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nothing is listening for navigation signals.
        let _ = self.inner.events.send(event);
    }
}

/// Load the persisted session, discarding anything unusable.
fn restore(storage: &dyn SessionStorage) -> Option<Session> {
    let raw = match storage.get(keys::SESSION) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "Failed to read persisted session");
            return None;
        }
    };

    let record: PersistedSession = match serde_json::from_str(&raw) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Discarding malformed persisted session");
            discard(storage);
            return None;
        }
    };

    let session = Session::from(record);
    if session.token.is_expired() {
        info!("Persisted session token expired");
        discard(storage);
        return None;
    }

    debug!(user = %session.user.label(), "Restored persisted session");
    Some(session)
}

fn discard(storage: &dyn SessionStorage) {
    if let Err(e) = storage.remove(keys::SESSION) {
        warn!(error = %e, "Failed to remove persisted session");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;
    use crate::session::MemoryStorage;

    fn token_expiring_in(seconds: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + seconds;
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#))
        )
    }

    fn auth_response(token: String) -> AuthResponse {
        serde_json::from_value(serde_json::json!({
            "user": {"id": 1, "email": "amina@example.com", "first_name": "Amina"},
            "access": token
        }))
        .unwrap()
    }

    #[test]
    fn test_login_persists_record() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::clone(&storage));

        store.login(auth_response(token_expiring_in(3600))).unwrap();

        assert!(store.is_authenticated());
        let raw = storage.get(keys::SESSION).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["user"]["email"], "amina@example.com");
        assert!(json["token"].is_string());
    }

    #[test]
    fn test_login_rejects_expired_token() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::clone(&storage));

        let result = store.login(auth_response(token_expiring_in(-10)));
        assert!(matches!(result, Err(SessionError::ExpiredToken)));
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(keys::SESSION).unwrap(), None);
    }

    #[test]
    fn test_logout_removes_record() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::clone(&storage));
        store.login(auth_response(token_expiring_in(3600))).unwrap();

        let mut events = store.events();
        store.logout();

        assert!(!store.is_authenticated());
        assert_eq!(storage.get(keys::SESSION).unwrap(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn test_restore_valid_session() {
        let record = serde_json::json!({
            "user": {"id": 2, "first_name": "Karim"},
            "token": token_expiring_in(600)
        });
        let storage = MemoryStorage::with_entry(keys::SESSION, &record.to_string());
        let store = SessionStore::new(storage);

        let user = store.user().unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Karim"));
    }

    #[test]
    fn test_restore_discards_expired_session() {
        let record = serde_json::json!({
            "user": {"id": 2},
            "token": token_expiring_in(-600)
        });
        let storage = Arc::new(MemoryStorage::with_entry(keys::SESSION, &record.to_string()));
        let store = SessionStore::new(Arc::clone(&storage));

        assert!(!store.is_authenticated());
        assert_eq!(storage.get(keys::SESSION).unwrap(), None);
    }

    #[test]
    fn test_restore_discards_malformed_record() {
        let storage = Arc::new(MemoryStorage::with_entry(keys::SESSION, "{not json"));
        let store = SessionStore::new(Arc::clone(&storage));

        assert!(!store.is_authenticated());
        assert_eq!(storage.get(keys::SESSION).unwrap(), None);
    }

    #[test]
    fn test_require_active_emits_login_required() {
        let store = SessionStore::new(MemoryStorage::new());
        let mut events = store.events();

        assert!(matches!(
            store.require_active(),
            Err(SessionError::AuthRequired)
        ));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
    }

    #[test]
    fn test_handle_unauthorized_clears_session() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(Arc::clone(&storage));
        store.login(auth_response(token_expiring_in(3600))).unwrap();
        let mut events = store.events();

        store.handle_unauthorized();

        assert!(!store.is_authenticated());
        assert_eq!(storage.get(keys::SESSION).unwrap(), None);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
    }

    #[test]
    fn test_subscribers_observe_changes() {
        let store = SessionStore::new(MemoryStorage::new());
        let receiver = store.subscribe();
        assert!(receiver.borrow().is_none());

        store.login(auth_response(token_expiring_in(3600))).unwrap();
        assert!(receiver.borrow().is_some());

        store.logout();
        assert!(receiver.borrow().is_none());
    }
}
