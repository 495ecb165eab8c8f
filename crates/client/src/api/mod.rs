//! GB Green Guide REST API access.
//!
//! # Architecture
//!
//! - [`RemoteApi`] is the seam the session-bound stores depend on (auth,
//!   cart, orders); [`ApiClient`] implements it over `reqwest`
//! - The API is the source of truth: responses replace local state, nothing
//!   is merged client-side
//! - Catalog reads (products, places) are cached in memory via `moka`
//!
//! # Error classification
//!
//! Non-success responses are mapped once, in [`classify_error`]:
//!
//! | Status        | Error                                             |
//! |---------------|---------------------------------------------------|
//! | 401           | [`ApiError::Unauthorized`]                        |
//! | 404           | [`ApiError::NotFound`]                            |
//! | 429           | [`ApiError::RateLimited`]                         |
//! | 400 / 422     | [`ApiError::Validation`] when the body has fields |
//! | anything else | [`ApiError::Status`] with the server's message    |

mod cache;
mod client;

pub use client::ApiClient;

use std::collections::BTreeMap;
use std::future::Future;

use gb_green_guide_core::ProductId;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    AuthResponse, Cart, CartPayload, LoginRequest, OrderRequest, OrderResponse, RegisterRequest,
};
use crate::session::BearerToken;

/// Keys that carry a top-level message rather than a field error.
const MESSAGE_KEYS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

/// Longest server body excerpt kept in an error message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The bearer token was missing or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structured field-level validation failure.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl ApiError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::Parse(_) | Self::InvalidUrl(_) => {
                "The server returned an unexpected response.".to_string()
            }
            Self::Unauthorized => "Please log in to continue.".to_string(),
            Self::NotFound(message) | Self::Status { message, .. } => message.clone(),
            Self::Validation(_) => "Please correct the highlighted fields.".to_string(),
            Self::RateLimited(seconds) => {
                format!("Too many requests. Try again in {seconds} seconds.")
            }
        }
    }

    /// Returns true if the API rejected the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

// =============================================================================
// FieldErrors
// =============================================================================

/// Field name → first error message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract field errors from a validation payload.
    ///
    /// Accepts `{"field": "message"}` and `{"field": ["message", ...]}`,
    /// keeping the first message per field. Top-level message keys are
    /// skipped. Returns `None` if no field errors are present.
    #[must_use]
    pub fn from_json(body: &Value) -> Option<Self> {
        let object = body.as_object()?;

        let errors: BTreeMap<String, String> = object
            .iter()
            .filter(|(key, _)| !MESSAGE_KEYS.contains(&key.as_str()))
            .filter_map(|(key, value)| first_message(value).map(|m| (key.clone(), m)))
            .collect();

        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    /// Set the error for `field`, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Remove and return the error for `field`.
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    /// The error for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate `(field, message)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

/// Extract a top-level message from an error body.
fn top_level_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    MESSAGE_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(first_message))
}

/// Map a non-success response to an [`ApiError`].
#[must_use]
pub fn classify_error(status: u16, body: &str, retry_after: Option<u64>) -> ApiError {
    let json: Option<Value> = serde_json::from_str(body).ok();

    let message = json
        .as_ref()
        .and_then(top_level_message)
        .or_else(|| {
            let excerpt: String = body.trim().chars().take(MAX_MESSAGE_CHARS).collect();
            // HTML error pages are noise to an end user.
            (!excerpt.is_empty() && !excerpt.starts_with('<')).then_some(excerpt)
        })
        .unwrap_or_else(|| format!("Request failed with status {status}"));

    match status {
        401 => ApiError::Unauthorized,
        404 => ApiError::NotFound(message),
        429 => ApiError::RateLimited(retry_after.unwrap_or(1)),
        400 | 422 => json
            .as_ref()
            .and_then(FieldErrors::from_json)
            .map_or(ApiError::Status { status, message }, ApiError::Validation),
        _ => ApiError::Status { status, message },
    }
}

// =============================================================================
// RemoteApi
// =============================================================================

/// Remote operations the session-bound stores depend on.
///
/// Implementations may use `async fn`; the returned futures must be `Send`
/// so stores can run on a multi-threaded runtime.
pub trait RemoteApi: Send + Sync + 'static {
    /// `POST auth/login/`
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `POST auth/register/`
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `POST auth/logout/`: server-side token invalidation.
    fn logout(&self, token: &BearerToken) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET cart/`
    fn fetch_cart(
        &self,
        token: &BearerToken,
    ) -> impl Future<Output = Result<CartPayload, ApiError>> + Send;

    /// `POST cart/add/`: returns the full updated cart.
    fn add_to_cart(
        &self,
        token: &BearerToken,
        product_id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `POST cart/remove/`: returns the full updated cart.
    fn remove_from_cart(
        &self,
        token: &BearerToken,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `POST cart/clear/`: any success status counts; the body is ignored.
    fn clear_cart(&self, token: &BearerToken) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST orders/`
    fn create_order(
        &self,
        token: &BearerToken,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderResponse, ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unauthorized() {
        assert!(classify_error(401, r#"{"detail":"Token expired"}"#, None).is_unauthorized());
    }

    #[test]
    fn test_classify_validation_payload() {
        let body = r#"{"phone": ["Enter a valid phone number."], "city": "Required", "detail": "Invalid"}"#;
        let ApiError::Validation(errors) = classify_error(400, body, None) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("phone"), Some("Enter a valid phone number."));
        assert_eq!(errors.get("city"), Some("Required"));
        assert_eq!(errors.get("detail"), None);
    }

    #[test]
    fn test_classify_bad_request_without_fields() {
        let err = classify_error(400, r#"{"error": "Insufficient stock"}"#, None);
        assert!(matches!(
            err,
            ApiError::Status { status: 400, ref message } if message == "Insufficient stock"
        ));
        assert_eq!(err.user_message(), "Insufficient stock");
    }

    #[test]
    fn test_classify_server_error_html_body() {
        let err = classify_error(502, "<html>Bad gateway</html>", None);
        assert_eq!(err.user_message(), "Request failed with status 502");
    }

    #[test]
    fn test_classify_rate_limited_and_not_found() {
        assert!(matches!(
            classify_error(429, "", Some(7)),
            ApiError::RateLimited(7)
        ));
        assert!(matches!(
            classify_error(429, "", None),
            ApiError::RateLimited(1)
        ));
        assert!(matches!(
            classify_error(404, r#"{"detail":"Not found."}"#, None),
            ApiError::NotFound(ref m) if m == "Not found."
        ));
    }

    #[test]
    fn test_field_errors_display() {
        let mut errors = FieldErrors::new();
        errors.insert("email", "Email is required");
        errors.insert("city", "City is required");
        assert_eq!(
            errors.to_string(),
            "city: City is required; email: Email is required"
        );
        assert_eq!(errors.remove("city").as_deref(), Some("City is required"));
        assert_eq!(errors.len(), 1);
    }
}
