//! Checkout: form validation, order totals and the submit lifecycle.
//!
//! The orchestrator composes the session and cart stores into an order
//! request. Validation happens before any network call; the cart is cleared
//! only after the order is confirmed, and off the success path.

mod form;
mod orchestrator;
mod summary;

pub use form::{CheckoutField, CheckoutFormData, validate_field, validate_form};
pub use orchestrator::{Checkout, CheckoutState, CheckoutStatus, SubmitOutcome};
pub use summary::OrderSummary;

use thiserror::Error;

use crate::api::{ApiError, FieldErrors};

/// Errors that can occur when submitting an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No active session, or the API rejected the credential.
    #[error("Authentication required")]
    AuthRequired,

    /// One or more fields are invalid.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The cart cannot be ordered as it stands.
    #[error("Cart not orderable: {0}")]
    Cart(String),

    /// The order request failed.
    #[error(transparent)]
    Api(ApiError),
}

impl CheckoutError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please log in to place your order.".to_string(),
            Self::Validation(_) => "Please correct the highlighted fields.".to_string(),
            Self::Cart(message) => message.clone(),
            Self::Api(err) => err.user_message(),
        }
    }

    /// Field errors carried by a validation failure.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
