//! Cart store implementation.

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use gb_green_guide_core::{Money, ProductId};

use super::CartError;
use crate::api::{ApiError, RemoteApi};
use crate::error::add_breadcrumb;
use crate::models::{Cart, Session};
use crate::session::SessionStore;

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Last cart the server confirmed.
    pub cart: Cart,
    /// True while an operation is in flight.
    pub loading: bool,
    /// Message from the most recent failed operation.
    pub error: Option<String>,
}

/// Local mirror of the remote cart, bound to a session.
pub struct CartStore<A> {
    inner: Arc<CartStoreInner<A>>,
}

struct CartStoreInner<A> {
    api: Arc<A>,
    session: SessionStore,
    state: watch::Sender<CartState>,
    in_flight: Mutex<()>,
}

impl<A> Clone for CartStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for CartStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Holds the single-flight lock and clears `loading` when dropped.
struct Operation<'a> {
    state: &'a watch::Sender<CartState>,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for Operation<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.loading = false);
    }
}

impl<A: RemoteApi> CartStore<A> {
    /// Create an empty store. Call [`fetch_cart`](Self::fetch_cart) to load.
    #[must_use]
    pub fn new(api: Arc<A>, session: SessionStore) -> Self {
        let (state, _) = watch::channel(CartState::default());

        Self {
            inner: Arc::new(CartStoreInner {
                api,
                session,
                state,
                in_flight: Mutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the remote cart, replacing local state.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthRequired` without a session, `CartError::Busy`
    /// if another operation is running, or the API error. On API failure the
    /// local cart is emptied and the error flag set.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Cart, CartError> {
        let session = self.require_session()?;
        let _op = self.begin()?;

        match self.inner.api.fetch_cart(&session.token).await {
            Ok(payload) => {
                let cart = payload.into_cart();
                debug!(items = cart.items.len(), "Cart loaded");
                Ok(self.publish(cart))
            }
            Err(e) => {
                let err = self.fail(e);
                self.inner.state.send_modify(|state| state.cart = Cart::empty());
                Err(err)
            }
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for zero, plus the errors of
    /// [`fetch_cart`](Self::fetch_cart). The local cart is unchanged on error.
    #[instrument(skip(self), fields(product_id = %product_id, quantity = quantity))]
    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let session = self.require_session()?;
        let _op = self.begin()?;

        let cart = self
            .inner
            .api
            .add_to_cart(&session.token, product_id, quantity)
            .await
            .map_err(|e| self.fail(e))?;

        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[
                ("product_id", product_id.to_string().as_str()),
                ("quantity", quantity.to_string().as_str()),
            ]),
        );
        Ok(self.publish(cart))
    }

    /// Add a single unit of a product.
    ///
    /// # Errors
    ///
    /// See [`add_to_cart`](Self::add_to_cart).
    pub async fn add_one(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.add_to_cart(product_id, 1).await
    }

    /// Remove a product's line entirely.
    ///
    /// # Errors
    ///
    /// See [`fetch_cart`](Self::fetch_cart). The local cart is unchanged on error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let session = self.require_session()?;
        let _op = self.begin()?;

        let cart = self
            .inner
            .api
            .remove_from_cart(&session.token, product_id)
            .await
            .map_err(|e| self.fail(e))?;

        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product_id.to_string().as_str())]),
        );
        Ok(self.publish(cart))
    }

    /// Set a product's quantity. Zero removes the line.
    ///
    /// The API has no set-quantity call, so the line is removed and re-added
    /// with the new quantity inside one operation; only the final cart is
    /// published. A removal the server answers with not-found means there was
    /// no line. If the re-add fails, the cart the server returned
    /// after the removal is published and the add error returned.
    ///
    /// # Errors
    ///
    /// See [`fetch_cart`](Self::fetch_cart).
    #[instrument(skip(self), fields(product_id = %product_id, quantity = new_quantity))]
    pub async fn update_cart_item_quantity(
        &self,
        product_id: ProductId,
        new_quantity: u32,
    ) -> Result<Cart, CartError> {
        if new_quantity == 0 {
            return self.remove_from_cart(product_id).await;
        }
        let session = self.require_session()?;
        let _op = self.begin()?;

        let api = &self.inner.api;

        // The local cart may be stale, so the removal is always sent and the
        // server decides whether a line existed.
        let after_remove = match api.remove_from_cart(&session.token, product_id).await {
            Ok(cart) => Some(cart),
            Err(ApiError::NotFound(_)) => None,
            Err(e) => return Err(self.fail(e)),
        };

        let cart = match api
            .add_to_cart(&session.token, product_id, new_quantity)
            .await
        {
            Ok(cart) => cart,
            Err(e) => {
                if let Some(after_remove) = after_remove {
                    warn!(error = %e, "Re-add failed after removal; publishing server cart");
                    self.publish(after_remove);
                }
                return Err(self.fail(e));
            }
        };

        add_breadcrumb(
            "cart",
            "Updated quantity",
            Some(&[
                ("product_id", product_id.to_string().as_str()),
                ("quantity", new_quantity.to_string().as_str()),
            ]),
        );
        Ok(self.publish(cart))
    }

    /// Empty the remote cart.
    ///
    /// # Errors
    ///
    /// See [`fetch_cart`](Self::fetch_cart). The local cart is unchanged on error.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), CartError> {
        let session = self.require_session()?;
        let _op = self.begin()?;

        self.inner
            .api
            .clear_cart(&session.token)
            .await
            .map_err(|e| self.fail(e))?;

        add_breadcrumb("cart", "Cleared cart", None);
        self.publish(Cart::empty());
        Ok(())
    }

    /// Drop local cart state without calling the API.
    pub fn reset(&self) {
        self.inner.state.send_modify(|state| {
            state.cart = Cart::empty();
            state.error = None;
        });
    }

    /// Reset the cart whenever the session becomes empty.
    ///
    /// The task ends when the store or the session store is dropped.
    pub fn follow_session(&self) -> JoinHandle<()> {
        let store: Weak<CartStoreInner<A>> = Arc::downgrade(&self.inner);
        let mut session = self.inner.session.subscribe();

        tokio::spawn(async move {
            while session.changed().await.is_ok() {
                let logged_out = session.borrow_and_update().is_none();
                let Some(inner) = store.upgrade() else {
                    break;
                };
                if logged_out {
                    debug!("Session ended; resetting cart");
                    Self { inner }.reset();
                }
            }
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.state.borrow().cart.clone()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.state.borrow().cart.item_count()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.inner.state.borrow().cart.subtotal()
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.inner.state.borrow().cart.line_for(product_id).is_some()
    }

    /// Quantity of a product in the cart (0 when absent).
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId) -> u32 {
        self.inner.state.borrow().cart.quantity_of(product_id)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Watch cart state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_session(&self) -> Result<Session, CartError> {
        Ok(self.inner.session.require_active()?)
    }

    fn begin(&self) -> Result<Operation<'_>, CartError> {
        let lock = self.inner.in_flight.try_lock().map_err(|_| {
            debug!("Cart operation already in flight");
            CartError::Busy
        })?;

        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        Ok(Operation {
            state: &self.inner.state,
            _lock: lock,
        })
    }

    /// Replace the local cart with a server-confirmed one.
    fn publish(&self, cart: Cart) -> Cart {
        // A response that lands after logout must not resurrect the cart.
        if !self.inner.session.is_authenticated() {
            self.reset();
            return Cart::empty();
        }

        self.inner.state.send_modify(|state| {
            state.cart = cart.clone();
            state.error = None;
        });
        cart
    }

    /// Record an API failure. A rejected credential ends the session.
    fn fail(&self, err: ApiError) -> CartError {
        if err.is_unauthorized() {
            info!("Cart request unauthorized; ending session");
            self.inner.session.handle_unauthorized();
            self.reset();
            return CartError::AuthRequired;
        }

        warn!(error = %err, "Cart operation failed");
        let message = err.user_message();
        self.inner
            .state
            .send_modify(|state| state.error = Some(message));
        CartError::Api(err)
    }
}
