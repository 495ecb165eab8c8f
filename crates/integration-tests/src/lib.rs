//! Integration tests for the GB Green Guide client stores.
//!
//! The stores are driven against [`FakeApi`], an in-memory implementation of
//! [`RemoteApi`] that keeps a server-side cart, records every call and can
//! be told to fail. No network or filesystem access is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gb-green-guide-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Login, restore, expiry and logout
//! - `cart_store` - Cart mirroring, quantity updates and single-flight
//! - `checkout_flow` - Validation, order placement and post-order cart clear
//! - `gallery` - Gallery and product search transforms

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;

use gb_green_guide_client::api::{ApiError, FieldErrors, RemoteApi};
use gb_green_guide_client::cart::CartStore;
use gb_green_guide_client::checkout::Checkout;
use gb_green_guide_client::models::{
    AuthResponse, Cart, CartLineItem, CartPayload, CartProduct, LoginRequest, OrderRequest,
    OrderResponse, RegisterRequest,
};
use gb_green_guide_client::session::{BearerToken, MemoryStorage, SessionStore};
use gb_green_guide_core::{CartId, CartItemId, Money, ProductId};

/// Password the fake accepts for every account.
pub const PASSWORD: &str = "correct-horse";

/// Country used as the checkout default.
pub const DEFAULT_COUNTRY: &str = "Pakistan";

// =============================================================================
// Tokens
// =============================================================================

/// Build an unsigned JWT whose payload carries `exp`.
#[must_use]
pub fn jwt_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "user_id": 7 }).to_string());
    format!("{header}.{payload}.signature")
}

/// A token valid for the next hour.
#[must_use]
pub fn valid_token() -> String {
    jwt_expiring_at(chrono::Utc::now().timestamp() + 3600)
}

/// A token that expired an hour ago.
#[must_use]
pub fn expired_token() -> String {
    jwt_expiring_at(chrono::Utc::now().timestamp() - 3600)
}

/// Authentication response for the test user with the given access token.
///
/// # Panics
///
/// Panics if the fixed JSON does not decode, which would be a bug here.
#[must_use]
pub fn auth_response(access: &str) -> AuthResponse {
    serde_json::from_value(json!({
        "user": {
            "id": 7,
            "email": "karim@example.com",
            "first_name": "Karim",
            "last_name": "Baig",
            "phone": "+92 300 1234567",
        },
        "access": access,
        "refresh": "refresh-token",
    }))
    .unwrap_or_else(|e| panic!("invalid auth fixture: {e}"))
}

/// A session store with the test user logged in.
///
/// # Panics
///
/// Panics if the login is rejected.
#[must_use]
pub fn logged_in_session() -> SessionStore {
    let session = SessionStore::new(MemoryStorage::new());
    session
        .login(auth_response(&valid_token()))
        .unwrap_or_else(|e| panic!("login failed: {e}"));
    session
}

// =============================================================================
// FakeApi
// =============================================================================

/// A remote call, as recorded by [`FakeApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login,
    Register,
    Logout,
    FetchCart,
    Add(ProductId, u32),
    Remove(ProductId),
    Clear,
    CreateOrder,
}

impl Call {
    /// Returns true for calls that change the server cart or place an order.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Add(..) | Self::Remove(_) | Self::Clear | Self::CreateOrder
        )
    }
}

/// Endpoint selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    Login,
    FetchCart,
    Add,
    Remove,
    Clear,
    CreateOrder,
}

/// A failure the fake returns instead of a response.
#[derive(Debug, Clone)]
pub enum Failure {
    Unauthorized,
    Status(u16, String),
    Validation(Vec<(String, String)>),
}

impl Failure {
    fn into_error(self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::Unauthorized,
            Self::Status(404, message) => ApiError::NotFound(message),
            Self::Status(status, message) => ApiError::Status { status, message },
            Self::Validation(fields) => {
                let mut errors = FieldErrors::new();
                for (field, message) in fields {
                    errors.insert(field, message);
                }
                ApiError::Validation(errors)
            }
        }
    }
}

/// Shape of the order endpoint response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderShape {
    /// `{"data": {...}}`
    Nested,
    /// The record at the top level.
    Flat,
}

#[derive(Debug)]
struct FakeState {
    products: BTreeMap<ProductId, CartProduct>,
    /// Server cart lines in insertion order.
    lines: Vec<(ProductId, u32)>,
    calls: Vec<Call>,
    failures: BTreeMap<Endpoint, VecDeque<Failure>>,
    orders: Vec<OrderRequest>,
    order_shape: OrderShape,
    token_ttl: i64,
    /// Body served by the next cart fetch instead of the server cart.
    raw_cart: Option<serde_json::Value>,
}

/// In-memory REST API with a server-side cart.
#[derive(Debug)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    /// Held by a test to park add calls mid-flight.
    gate: tokio::sync::Mutex<()>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    /// A fake with no products and an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                products: BTreeMap::new(),
                lines: Vec::new(),
                calls: Vec::new(),
                failures: BTreeMap::new(),
                orders: Vec::new(),
                order_shape: OrderShape::Nested,
                token_ttl: 3600,
                raw_cart: None,
            }),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Register a product. Price is in minor units.
    #[must_use]
    pub fn with_product(self, id: i64, name: &str, price_minor: i64, stock: u32) -> Self {
        let product = CartProduct {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Money::from_minor(price_minor),
            discount_price: None,
            stock,
            is_available: true,
            image: None,
        };
        self.lock().products.insert(product.id, product);
        self
    }

    /// Change a product's stock; existing cart lines see the new value.
    pub fn set_stock(&self, id: i64, stock: u32) {
        if let Some(product) = self.lock().products.get_mut(&ProductId::new(id)) {
            product.stock = stock;
        }
    }

    /// Mark a product unavailable.
    pub fn discontinue(&self, id: i64) {
        if let Some(product) = self.lock().products.get_mut(&ProductId::new(id)) {
            product.is_available = false;
        }
    }

    /// Put a line in the server cart without going through the API.
    pub fn seed_line(&self, id: i64, quantity: u32) {
        self.lock().lines.push((ProductId::new(id), quantity));
    }

    /// Serve `body` from the next cart fetch, decoded like a real response.
    pub fn serve_cart_json(&self, body: serde_json::Value) {
        self.lock().raw_cart = Some(body);
    }

    /// Make the next call to `endpoint` fail.
    pub fn fail_next(&self, endpoint: Endpoint, failure: Failure) {
        self.lock()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(failure);
    }

    pub fn set_order_shape(&self, shape: OrderShape) {
        self.lock().order_shape = shape;
    }

    /// Issue tokens that expire `seconds` from now (negative for expired).
    pub fn set_token_ttl(&self, seconds: i64) {
        self.lock().token_ttl = seconds;
    }

    /// Block add calls until the returned guard is dropped.
    pub async fn hold_adds(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that change server state.
    #[must_use]
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Orders received so far.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.lock().orders.clone()
    }

    /// The server cart as the API would return it.
    #[must_use]
    pub fn server_cart(&self) -> Cart {
        self.lock().cart()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and pop any injected failure for it.
    fn enter(&self, call: Call, endpoint: Option<Endpoint>) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        let failure = endpoint.and_then(|e| state.failures.get_mut(&e)?.pop_front());
        failure.map_or(Ok(()), |f| Err(f.into_error()))
    }

    fn issue(&self, email: &str) -> Result<AuthResponse, ApiError> {
        let exp = chrono::Utc::now().timestamp() + self.lock().token_ttl;
        let response = serde_json::from_value(json!({
            "user": { "id": 7, "email": email, "first_name": "Karim", "last_name": "Baig" },
            "access": jwt_expiring_at(exp),
        }))?;
        Ok(response)
    }
}

impl FakeState {
    fn cart(&self) -> Cart {
        let items = self
            .lines
            .iter()
            .filter_map(|&(id, quantity)| {
                let product = self.products.get(&id)?.clone();
                Some(CartLineItem {
                    id: CartItemId::new(id.as_i64()),
                    total_price: Some(product.unit_price().times(quantity)),
                    product,
                    quantity,
                })
            })
            .collect();
        Cart {
            id: Some(CartId::new(1)),
            items,
        }
    }
}

impl RemoteApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.enter(Call::Login, Some(Endpoint::Login))?;
        if request.password != PASSWORD {
            return Err(ApiError::Unauthorized);
        }
        self.issue(&request.email)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.enter(Call::Register, None)?;
        self.issue(&request.email)
    }

    async fn logout(&self, _token: &BearerToken) -> Result<(), ApiError> {
        self.enter(Call::Logout, None)
    }

    async fn fetch_cart(&self, _token: &BearerToken) -> Result<CartPayload, ApiError> {
        self.enter(Call::FetchCart, Some(Endpoint::FetchCart))?;
        if let Some(body) = self.lock().raw_cart.take() {
            return Ok(serde_json::from_value(body)?);
        }
        Ok(CartPayload::Collection {
            results: vec![self.server_cart()],
        })
    }

    async fn add_to_cart(
        &self,
        _token: &BearerToken,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        self.enter(Call::Add(product_id, quantity), Some(Endpoint::Add))?;
        drop(self.gate.lock().await);

        let mut state = self.lock();
        if !state.products.contains_key(&product_id) {
            return Err(ApiError::NotFound("Product not found.".to_string()));
        }
        match state.lines.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, existing)) => *existing += quantity,
            None => state.lines.push((product_id, quantity)),
        }
        Ok(state.cart())
    }

    async fn remove_from_cart(
        &self,
        _token: &BearerToken,
        product_id: ProductId,
    ) -> Result<Cart, ApiError> {
        self.enter(Call::Remove(product_id), Some(Endpoint::Remove))?;
        let mut state = self.lock();
        state.lines.retain(|(id, _)| *id != product_id);
        Ok(state.cart())
    }

    async fn clear_cart(&self, _token: &BearerToken) -> Result<(), ApiError> {
        self.enter(Call::Clear, Some(Endpoint::Clear))?;
        self.lock().lines.clear();
        Ok(())
    }

    async fn create_order(
        &self,
        _token: &BearerToken,
        order: &OrderRequest,
    ) -> Result<OrderResponse, ApiError> {
        self.enter(Call::CreateOrder, Some(Endpoint::CreateOrder))?;
        let mut state = self.lock();
        state.orders.push(order.clone());
        let id = state.orders.len();

        let record = json!({
            "id": id,
            "order_number": format!("GBG-{id:05}"),
            "status": "pending",
            "total_amount": order.expected_total,
            "full_name": order.full_name,
            "city": order.city,
            "address_line1": order.address_line1,
        });
        let body = match state.order_shape {
            OrderShape::Nested => json!({ "data": record, "message": "Order placed" }),
            OrderShape::Flat => record,
        };
        Ok(serde_json::from_value(body)?)
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Stores wired over one [`FakeApi`], with the test user logged in.
#[derive(Debug)]
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub session: SessionStore,
    pub cart: CartStore<FakeApi>,
    pub checkout: Checkout<FakeApi>,
}

impl Harness {
    #[must_use]
    pub fn new(api: FakeApi) -> Self {
        Self::with_session(api, logged_in_session())
    }

    #[must_use]
    pub fn with_session(api: FakeApi, session: SessionStore) -> Self {
        let api = Arc::new(api);
        let cart = CartStore::new(Arc::clone(&api), session.clone());
        let checkout = Checkout::new(
            Arc::clone(&api),
            session.clone(),
            cart.clone(),
            DEFAULT_COUNTRY,
        );
        Self {
            api,
            session,
            cart,
            checkout,
        }
    }
}

/// The standard catalog: apricots, walnuts and a shawl.
#[must_use]
pub fn stocked_api() -> FakeApi {
    FakeApi::new()
        .with_product(1, "Dried Apricots 500g", 85_000, 20)
        .with_product(2, "Hunza Walnuts 1kg", 240_000, 5)
        .with_product(3, "Pashmina Shawl", 1_250_000, 2)
}
