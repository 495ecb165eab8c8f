//! Unified error handling with Sentry integration.
//!
//! Each layer has its own error enum; [`ClientError`] wraps them all for
//! callers that drive several layers (the CLI). Server-class failures are
//! captured to Sentry by [`ClientError::report`] before being shown.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::models::User;
use crate::session::SessionError;

/// Application-level error type for the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session state could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// REST API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication flow failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog or review operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Bad input from the user.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::Session(SessionError::AuthRequired | SessionError::ExpiredToken) => {
                "Please log in to continue.".to_string()
            }
            Self::Session(_) => "Could not access the saved session.".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Auth(err) => err.user_message(),
            Self::Cart(err) => err.user_message(),
            Self::Checkout(err) => err.user_message(),
            Self::Catalog(err) => err.user_message(),
            Self::InvalidInput(message) => message.clone(),
        }
    }

    /// Returns true for failures worth an error-tracking event.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        let api = match self {
            Self::Api(err)
            | Self::Auth(AuthError::Api(err))
            | Self::Cart(CartError::Api(err))
            | Self::Checkout(CheckoutError::Api(err))
            | Self::Catalog(CatalogError::Api(err)) => err,
            Self::Session(SessionError::Storage(_) | SessionError::Serialize(_)) => return true,
            _ => return false,
        };
        match api {
            ApiError::Parse(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Capture server-class errors to Sentry and log them.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Client error"
            );
        } else {
            tracing::debug!(error = %self, "Client error");
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Set the Sentry user context from a user record.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user: &User) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: user.id.map(|id| id.to_string()),
            email: user.email.clone(),
            username: user.username.clone(),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::InvalidInput("quantity must be a number".to_string());
        assert_eq!(err.to_string(), "Invalid input: quantity must be a number");
        assert_eq!(err.user_message(), "quantity must be a number");
    }

    #[test]
    fn test_server_error_classification() {
        let server = ClientError::Api(ApiError::Status {
            status: 503,
            message: "down".to_string(),
        });
        assert!(server.is_server_error());

        let rejected = ClientError::Cart(CartError::Api(ApiError::Status {
            status: 400,
            message: "Out of stock".to_string(),
        }));
        assert!(!rejected.is_server_error());
        assert_eq!(rejected.user_message(), "Out of stock");

        assert!(!ClientError::Cart(CartError::Busy).is_server_error());
    }

    #[test]
    fn test_auth_required_message() {
        let err = ClientError::from(SessionError::AuthRequired);
        assert_eq!(err.user_message(), "Please log in to continue.");
    }
}
