//! Authentication flows: login, registration and logout.
//!
//! Wraps the remote auth endpoints and keeps the session and cart stores in
//! step: a login loads the user's cart, a logout drops it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use gb_green_guide_core::{Email, EmailError};

use crate::api::{ApiError, RemoteApi};
use crate::cart::CartStore;
use crate::models::{LoginRequest, RegisterRequest, Session};
use crate::session::{SessionError, SessionStore};

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::MissingField(field) => format!("{field} is required"),
            Self::Api(ApiError::Unauthorized) => "Invalid email or password.".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Session(SessionError::ExpiredToken) => {
                "The server issued an expired session. Please try again.".to_string()
            }
            Self::Session(_) => "Could not save your session.".to_string(),
        }
    }
}

/// Details collected by the registration form.
#[derive(Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .finish()
    }
}

/// Authentication service.
pub struct AuthService<A> {
    api: Arc<A>,
    session: SessionStore,
    cart: CartStore<A>,
}

impl<A> Clone for AuthService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: self.session.clone(),
            cart: self.cart.clone(),
        }
    }
}

impl<A> std::fmt::Debug for AuthService<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

impl<A: RemoteApi> AuthService<A> {
    #[must_use]
    pub const fn new(api: Arc<A>, session: SessionStore, cart: CartStore<A>) -> Self {
        Self { api, session, cart }
    }

    /// Log in and load the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is invalid, the password is blank, the
    /// API rejects the credentials, or the session cannot be saved. A cart
    /// load failure is logged and does not fail the login.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email.trim())?;
        if password.is_empty() {
            return Err(AuthError::MissingField("Password"));
        }

        let request = LoginRequest {
            email: email.into_inner(),
            password: password.to_string(),
        };
        let response = self.api.login(&request).await?;
        let session = self.session.login(response)?;

        self.load_cart().await;
        Ok(session)
    }

    /// Create an account and log in.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is invalid, the API rejects the
    /// registration, or the session cannot be saved.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<Session, AuthError> {
        let email = Email::parse(registration.email.trim())?;
        if registration.password.is_empty() {
            return Err(AuthError::MissingField("Password"));
        }
        if registration.first_name.trim().is_empty() {
            return Err(AuthError::MissingField("First name"));
        }

        let request = RegisterRequest {
            email: email.into_inner(),
            password: registration.password,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            phone: registration
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        };
        let response = self.api.register(&request).await?;
        let session = self.session.login(response)?;

        info!(user = %session.user.label(), "Registered");
        self.load_cart().await;
        Ok(session)
    }

    /// Log out locally, after a best-effort server-side invalidation.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(session) = self.session.current()
            && let Err(e) = self.api.logout(&session.token).await
        {
            warn!(error = %e, "Remote logout failed; logging out locally");
        }

        self.session.logout();
        self.cart.reset();
    }

    async fn load_cart(&self) {
        if let Err(e) = self.cart.fetch_cart().await {
            warn!(error = %e, "Could not load cart after login");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::Api(ApiError::Unauthorized).user_message(),
            "Invalid email or password."
        );
        assert_eq!(
            AuthError::MissingField("Password").user_message(),
            "Password is required"
        );
        assert_eq!(
            AuthError::from(EmailError::Empty).user_message(),
            "Please enter a valid email address"
        );
    }

    #[test]
    fn test_registration_debug_redacts_password() {
        let registration = Registration {
            email: "karim@example.com".to_string(),
            password: "hunter22".to_string(),
            first_name: "Karim".to_string(),
            last_name: String::new(),
            phone: None,
        };
        assert!(!format!("{registration:?}").contains("hunter22"));
    }
}
