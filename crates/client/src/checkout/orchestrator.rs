//! Checkout state machine.
//!
//! `Idle → Validating → Submitting → {Success, Failed}`. An edit moves
//! `Failed` back to `Idle`; `Success` stays until [`Checkout::reset`]. A
//! placed order resets the form but keeps the order for display.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use gb_green_guide_core::{PaymentMethod, UserId};

use super::form::{CheckoutField, CheckoutFormData, validate_field, validate_form};
use super::summary::OrderSummary;
use super::CheckoutError;
use crate::api::{ApiError, FieldErrors, RemoteApi};
use crate::cart::CartStore;
use crate::error::add_breadcrumb;
use crate::models::{Cart, OrderRecord, OrderRequest, User};
use crate::session::SessionStore;

const EMPTY_CART_MESSAGE: &str = "Your cart is empty.";

/// Submit lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutStatus {
    #[default]
    Idle,
    Validating,
    Submitting,
    Success,
    Failed,
}

/// Observable checkout state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutState {
    pub form: CheckoutFormData,
    pub errors: FieldErrors,
    pub touched: BTreeSet<CheckoutField>,
    pub status: CheckoutStatus,
    /// Top-level message from the last failed submit.
    pub message: Option<String>,
    /// Order placed by the last successful submit.
    pub order: Option<OrderRecord>,
}

/// Result of a submit that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The order was placed.
    Placed(OrderRecord),
    /// A submit is already running; nothing was sent.
    InProgress,
    /// An order was already placed; call `reset` to start another.
    AlreadyPlaced,
}

/// Checkout orchestrator over the session and cart stores.
pub struct Checkout<A> {
    inner: Arc<CheckoutInner<A>>,
}

struct CheckoutInner<A> {
    api: Arc<A>,
    session: SessionStore,
    cart: CartStore<A>,
    default_country: String,
    state: watch::Sender<CheckoutState>,
    cart_clear: Mutex<Option<JoinHandle<()>>>,
}

impl<A> Clone for Checkout<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for Checkout<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("status", &self.inner.state.borrow().status)
            .finish_non_exhaustive()
    }
}

impl<A: RemoteApi> Checkout<A> {
    /// Create an orchestrator with a form prefilled from the current session.
    #[must_use]
    pub fn new(
        api: Arc<A>,
        session: SessionStore,
        cart: CartStore<A>,
        default_country: impl Into<String>,
    ) -> Self {
        let default_country = default_country.into();
        let form = CheckoutFormData::prefilled(session.user().as_ref(), &default_country);
        let (state, _) = watch::channel(CheckoutState {
            form,
            ..CheckoutState::default()
        });

        Self {
            inner: Arc::new(CheckoutInner {
                api,
                session,
                cart,
                default_country,
                state,
                cart_clear: Mutex::new(None),
            }),
        }
    }

    // =========================================================================
    // Form editing
    // =========================================================================

    /// Update a field and clear its error. Ignored after a successful order.
    pub fn set_field(&self, field: CheckoutField, value: impl Into<String>) {
        let value = value.into();
        self.inner.state.send_if_modified(|state| {
            if state.status == CheckoutStatus::Success {
                return false;
            }
            state.form.set(field, value);
            state.errors.remove(field.key());
            if state.status == CheckoutStatus::Failed {
                state.status = CheckoutStatus::Idle;
                state.message = None;
            }
            true
        });
    }

    /// Mark a field touched and validate it.
    pub fn blur(&self, field: CheckoutField) {
        self.inner.state.send_modify(|state| {
            state.touched.insert(field);
            match validate_field(field, state.form.get(field)) {
                Some(message) => state.errors.insert(field.key(), message),
                None => {
                    state.errors.remove(field.key());
                }
            }
        });
    }

    /// Required fields filled and no outstanding errors.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let state = self.inner.state.borrow();
        state.form.required_filled() && state.errors.is_empty()
    }

    /// Totals for the current cart.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::from_cart(&self.inner.cart.cart())
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Validate and place the order.
    ///
    /// Nothing is sent unless the form is valid and every cart line is
    /// available in the requested quantity. On success the cart is cleared
    /// in the background; a failed clear does not affect the placed order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::AuthRequired` without a session,
    /// `CheckoutError::Validation` for field errors (local or from the API),
    /// `CheckoutError::Cart` for an empty or unorderable cart, and
    /// `CheckoutError::Api` for other API failures. Form values survive
    /// every error.
    #[instrument(skip(self, order_notes))]
    pub async fn submit(&self, order_notes: &str) -> Result<SubmitOutcome, CheckoutError> {
        if let Some(outcome) = self.claim() {
            debug!(?outcome, "Submit ignored");
            return Ok(outcome);
        }

        let Ok(session) = self.inner.session.require_active() else {
            return Err(self.fail(CheckoutError::AuthRequired, None));
        };

        let form = self.inner.state.borrow().form.clone();
        let errors = validate_form(&form);
        self.inner.state.send_modify(|state| {
            state.touched.extend(CheckoutField::ALL);
            state.errors = errors.clone();
        });
        if !errors.is_empty() {
            return Err(self.fail(CheckoutError::Validation(errors), None));
        }

        let cart = self.inner.cart.cart();
        if let Err(message) = check_orderable(&cart) {
            return Err(self.fail(CheckoutError::Cart(message), None));
        }

        let request = self.order_request(form, &cart, order_notes);
        self.inner
            .state
            .send_modify(|state| state.status = CheckoutStatus::Submitting);
        info!(
            items_count = request.items_count,
            expected_total = %request.expected_total,
            "Submitting order"
        );

        match self.inner.api.create_order(&session.token, &request).await {
            Ok(response) => {
                let order = response.into_order();
                self.succeed(&order);
                Ok(SubmitOutcome::Placed(order))
            }
            Err(ApiError::Unauthorized) => {
                self.inner.session.handle_unauthorized();
                Err(self.fail(CheckoutError::AuthRequired, None))
            }
            Err(ApiError::Validation(errors)) => {
                Err(self.fail(CheckoutError::Validation(errors.clone()), Some(errors)))
            }
            Err(e) => Err(self.fail(CheckoutError::Api(e), None)),
        }
    }

    /// Clear the form (re-prefilled), errors, order and status.
    pub fn reset(&self) {
        let form = self.prefilled_form();
        self.inner.state.send_replace(CheckoutState {
            form,
            ..CheckoutState::default()
        });
    }

    /// Keep the form in step with the session.
    ///
    /// A login fills blank contact fields from the new user. A logout, or a
    /// different user logging in, resets the form. Changes are skipped while
    /// a submit is running. The task ends when either store is dropped.
    pub fn follow_session(&self) -> JoinHandle<()> {
        let checkout: Weak<CheckoutInner<A>> = Arc::downgrade(&self.inner);
        let mut session = self.inner.session.subscribe();
        let mut previous = session.borrow_and_update().as_ref().map(|s| user_key(&s.user));

        tokio::spawn(async move {
            while session.changed().await.is_ok() {
                let user = session.borrow_and_update().as_ref().map(|s| s.user.clone());
                let Some(inner) = checkout.upgrade() else {
                    break;
                };
                let current = user.as_ref().map(user_key);
                let switched = previous.is_some() && previous != current;
                previous = current;

                Self { inner }.apply_user(user.as_ref(), switched);
            }
        })
    }

    /// Wait for the post-order cart clear, if one is pending.
    pub async fn wait_for_background(&self) {
        let handle = self
            .inner
            .cart_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Cart clear task failed");
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CheckoutState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn status(&self) -> CheckoutStatus {
        self.inner.state.borrow().status
    }

    /// Watch checkout state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn prefilled_form(&self) -> CheckoutFormData {
        CheckoutFormData::prefilled(
            self.inner.session.user().as_ref(),
            &self.inner.default_country,
        )
    }

    fn apply_user(&self, user: Option<&User>, switched: bool) {
        let default_country = &self.inner.default_country;
        self.inner.state.send_if_modified(|state| {
            if matches!(
                state.status,
                CheckoutStatus::Validating | CheckoutStatus::Submitting
            ) {
                return false;
            }
            if switched {
                debug!("Session changed; resetting checkout form");
                *state = CheckoutState {
                    form: CheckoutFormData::prefilled(user, default_country),
                    ..CheckoutState::default()
                };
                return true;
            }
            let prefill = CheckoutFormData::prefilled(user, default_country);
            state.form.fill_blanks(&prefill)
        });
    }

    /// Move to `Validating`, or report why a submit cannot start.
    fn claim(&self) -> Option<SubmitOutcome> {
        let mut blocked = None;
        self.inner.state.send_if_modified(|state| match state.status {
            CheckoutStatus::Validating | CheckoutStatus::Submitting => {
                blocked = Some(SubmitOutcome::InProgress);
                false
            }
            CheckoutStatus::Success => {
                blocked = Some(SubmitOutcome::AlreadyPlaced);
                false
            }
            CheckoutStatus::Idle | CheckoutStatus::Failed => {
                state.status = CheckoutStatus::Validating;
                state.message = None;
                true
            }
        });
        blocked
    }

    fn order_request(&self, form: CheckoutFormData, cart: &Cart, notes: &str) -> OrderRequest {
        let country = match form.country.trim() {
            "" => self.inner.default_country.clone(),
            country => country.to_string(),
        };

        OrderRequest {
            full_name: form.full_name.trim().to_string(),
            phone: form.phone.trim().to_string(),
            email: form.email.trim().to_string(),
            city: form.city.trim().to_string(),
            address_line1: form.address_line1.trim().to_string(),
            address_line2: form.address_line2.trim().to_string(),
            country,
            payment_method: PaymentMethod::CashOnDelivery,
            order_notes: notes.trim().to_string(),
            items_count: cart.item_count(),
            expected_total: cart.subtotal(),
        }
    }

    fn succeed(&self, order: &OrderRecord) {
        info!(order = %order.reference(), "Order placed");
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order", order.reference().as_str())]),
        );

        let form = self.prefilled_form();
        self.inner.state.send_replace(CheckoutState {
            form,
            status: CheckoutStatus::Success,
            order: Some(order.clone()),
            ..CheckoutState::default()
        });

        let cart = self.inner.cart.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = cart.clear_cart().await {
                warn!(error = %e, "Failed to clear cart after order");
            }
        });
        *self
            .inner
            .cart_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Record a failed submit. API field errors replace the local ones.
    fn fail(&self, err: CheckoutError, api_errors: Option<FieldErrors>) -> CheckoutError {
        warn!(error = %err, "Checkout failed");
        add_breadcrumb("checkout", "Checkout failed", None);

        // Errors on keys outside the form have nowhere else to show.
        let off_form = api_errors.as_ref().filter(|errors| {
            errors
                .iter()
                .all(|(key, _)| CheckoutField::from_key(key).is_none())
        });
        let message = off_form
            .and_then(|errors| errors.iter().next().map(|(_, m)| m.to_string()))
            .unwrap_or_else(|| err.user_message());

        self.inner.state.send_modify(|state| {
            state.status = CheckoutStatus::Failed;
            state.message = Some(message);
            if let Some(errors) = api_errors {
                state.errors = errors;
            }
        });
        err
    }
}

/// Identity used to tell one logged-in user from another.
fn user_key(user: &User) -> (Option<UserId>, Option<String>) {
    (user.id, user.email.clone())
}

/// Non-empty, and every line available in the requested quantity.
fn check_orderable(cart: &Cart) -> Result<(), String> {
    if cart.is_empty() {
        return Err(EMPTY_CART_MESSAGE.to_string());
    }
    match cart
        .items
        .iter()
        .find_map(crate::models::CartLineItem::availability_problem)
    {
        Some(problem) => Err(problem),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cart_with(stock: u32, quantity: u32, available: bool) -> Cart {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "items": [{
                "id": 10,
                "product": {
                    "id": 3,
                    "name": "Apricot jam",
                    "price": "350.00",
                    "stock": stock,
                    "is_available": available
                },
                "quantity": quantity
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_orderable_cart() {
        assert!(check_orderable(&cart_with(5, 2, true)).is_ok());
        assert!(check_orderable(&cart_with(2, 2, true)).is_ok());
    }

    #[test]
    fn test_unorderable_carts() {
        assert_eq!(
            check_orderable(&Cart::empty()).unwrap_err(),
            "Your cart is empty."
        );
        assert_eq!(
            check_orderable(&cart_with(1, 2, true)).unwrap_err(),
            "Only 1 left in stock for Apricot jam"
        );
        assert_eq!(
            check_orderable(&cart_with(5, 1, false)).unwrap_err(),
            "Apricot jam is no longer available"
        );
    }
}
