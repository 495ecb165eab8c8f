//! Cart store: the local mirror of the remote cart.
//!
//! # Contract
//!
//! - Every operation needs an active session; without one it returns
//!   [`CartError::AuthRequired`] and signals login-required
//! - Successful mutations replace the whole local cart with the server's
//!   response. Nothing is merged or predicted locally
//! - Failed mutations leave the cart as it was; only `fetch_cart` empties it
//! - One operation at a time: an overlapping call is rejected with
//!   [`CartError::Busy`] instead of queued

mod store;

pub use store::{CartState, CartStore};

use thiserror::Error;

use crate::api::ApiError;
use crate::session::SessionError;

/// Errors that can occur in cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No active session, or the API rejected the credential.
    #[error("Authentication required")]
    AuthRequired,

    /// Another cart operation is still in flight.
    #[error("Another cart update is in progress")]
    Busy,

    /// Quantity must be at least one.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CartError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please log in to use your cart.".to_string(),
            Self::Busy => "Please wait for the current cart update to finish.".to_string(),
            Self::InvalidQuantity(_) => "Quantity must be at least 1.".to_string(),
            Self::Api(err) => err.user_message(),
        }
    }
}

impl From<SessionError> for CartError {
    fn from(_: SessionError) -> Self {
        Self::AuthRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_messages() {
        assert_eq!(CartError::InvalidQuantity(0).to_string(), "Invalid quantity: 0");
        assert_eq!(
            CartError::AuthRequired.user_message(),
            "Please log in to use your cart."
        );
        let api = CartError::Api(ApiError::Status {
            status: 400,
            message: "Insufficient stock".to_string(),
        });
        assert_eq!(api.to_string(), "HTTP 400: Insufficient stock");
        assert_eq!(api.user_message(), "Insufficient stock");
    }
}
