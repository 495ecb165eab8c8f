//! Session-related types.
//!
//! Types exchanged with the authentication endpoints and the record kept in
//! persistent storage between runs.

use serde::{Deserialize, Serialize};
use secrecy::ExposeSecret;

use crate::models::User;
use crate::session::BearerToken;

/// Authenticated session: who is logged in and their bearer credential.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: BearerToken,
}

impl Session {
    /// Record written to persistent storage for this session.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            user: self.user.clone(),
            token: self.token.secret().expose_secret().to_string(),
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(record: PersistedSession) -> Self {
        Self {
            user: record.user,
            token: BearerToken::new(record.token),
        }
    }
}

/// On-disk session record, stored under [`keys::SESSION`].
#[derive(Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: User,
    pub token: String,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Response of the login and register endpoints.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .field("access", &"[REDACTED]")
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Login request body.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration request body.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Storage keys for persisted client state.
pub mod keys {
    /// Key for the persisted `{user, token}` session record.
    pub const SESSION: &str = "gbg_session";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_debug_redacts_tokens() {
        let response: AuthResponse = serde_json::from_value(serde_json::json!({
            "user": {"id": 1, "email": "amina@example.com"},
            "access": "header.super-secret-access.sig",
            "refresh": "super-secret-refresh"
        }))
        .unwrap();

        let debug = format!("{response:?}");
        assert!(debug.contains("amina@example.com"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_persisted_session_roundtrip() {
        let record: PersistedSession = serde_json::from_value(serde_json::json!({
            "user": {"id": 3, "first_name": "Karim"},
            "token": "a.b.c"
        }))
        .unwrap();
        let session = Session::from(record);
        assert_eq!(session.token.secret().expose_secret(), "a.b.c");

        let persisted = session.to_persisted();
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["token"], "a.b.c");
        assert_eq!(json["user"]["first_name"], "Karim");
    }
}
