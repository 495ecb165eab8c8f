//! REST API client implementation.
//!
//! Uses `reqwest` for HTTP with JSON bodies and bearer authentication.
//! Caches catalog reads (products, places) using `moka`.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;

use gb_green_guide_core::ProductId;

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, RemoteApi, classify_error};
use crate::config::ClientConfig;
use crate::models::{
    AuthResponse, Cart, CartPayload, Listing, LoginRequest, OrderRequest, OrderResponse, Place,
    Product, RegisterRequest, Review, ReviewRequest,
};
use crate::session::BearerToken;

/// Header carrying a per-request correlation ID.
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Longest body excerpt written to logs.
const LOG_BODY_CHARS: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the GB Green Guide REST API.
///
/// Cheaply cloneable via `Arc`. Catalog reads are cached for the configured
/// TTL; cart, order and auth calls always go to the API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Body of the cart add endpoint.
#[derive(Serialize)]
struct AddToCartBody {
    product_id: ProductId,
    quantity: u32,
}

/// Body of the cart remove endpoint.
#[derive(Serialize)]
struct RemoveFromCartBody {
    product_id: ProductId,
}

impl ApiClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_base_url(config.api_base_url.clone(), config.catalog_cache_ttl)
    }

    /// Create a client for `base_url` with the given catalog cache TTL.
    #[must_use]
    pub fn with_base_url(mut base_url: Url, cache_ttl: Duration) -> Self {
        // Relative joins drop the last path segment unless it ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url,
                cache,
            }),
        }
    }

    /// Base URL all endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not form a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        token: Option<&BearerToken>,
    ) -> RequestBuilder {
        let request = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string());

        match token {
            Some(token) => request.bearer_auth(token.secret().expose_secret()),
            None => request,
        }
    }

    /// Send a request and return the raw body of a success response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let err = classify_error(status.as_u16(), &body, retry_after);
            if status.is_server_error() {
                error!(
                    status = %status,
                    body = %excerpt(&body),
                    "API returned server error"
                );
            } else {
                warn!(status = %status, error = %err, "API rejected request");
            }
            return Err(err);
        }

        Ok(body)
    }

    /// Send a request and parse a JSON success body.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.execute(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse API response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let url = self.endpoint("products/")?;
        let listing: Listing<Product> = self
            .execute_json(self.request(Method::GET, url, None))
            .await?;
        let products = listing.into_vec();

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist, or another
    /// error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(product_id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("products/{product_id}/"))?;
        let product: Product = self
            .execute_json(self.request(Method::GET, url, None))
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List all places with their image collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_places(&self) -> Result<Vec<Place>, ApiError> {
        if let Some(CacheValue::Places(places)) = self.inner.cache.get(&CacheKey::Places).await {
            debug!("Cache hit for places");
            return Ok(places);
        }

        let url = self.endpoint("places/")?;
        let listing: Listing<Place> = self
            .execute_json(self.request(Method::GET, url, None))
            .await?;
        let places = listing.into_vec();

        self.inner
            .cache
            .insert(CacheKey::Places, CacheValue::Places(places.clone()))
            .await;

        Ok(places)
    }

    /// List reviews for a product. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, ApiError> {
        let url = self.endpoint(&format!("products/{product_id}/reviews/"))?;
        let listing: Listing<Review> = self
            .execute_json(self.request(Method::GET, url, None))
            .await?;
        Ok(listing.into_vec())
    }

    /// Post a review for a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the API rejects the review fields,
    /// or another error if the API request fails.
    #[instrument(skip(self, token, review), fields(product_id = %product_id, rating = review.rating.stars()))]
    pub async fn create_review(
        &self,
        token: &BearerToken,
        product_id: ProductId,
        review: &ReviewRequest,
    ) -> Result<Review, ApiError> {
        let url = self.endpoint(&format!("products/{product_id}/reviews/"))?;
        self.execute_json(self.request(Method::POST, url, Some(token)).json(review))
            .await
    }

    /// Drop all cached catalog data.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        debug!("Catalog cache invalidated");
    }
}

impl RemoteApi for ApiClient {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint("auth/login/")?;
        self.execute_json(self.request(Method::POST, url, None).json(request))
            .await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint("auth/register/")?;
        self.execute_json(self.request(Method::POST, url, None).json(request))
            .await
    }

    #[instrument(skip_all)]
    async fn logout(&self, token: &BearerToken) -> Result<(), ApiError> {
        let url = self.endpoint("auth/logout/")?;
        self.execute(self.request(Method::POST, url, Some(token)))
            .await
            .map(drop)
    }

    #[instrument(skip_all)]
    async fn fetch_cart(&self, token: &BearerToken) -> Result<CartPayload, ApiError> {
        let url = self.endpoint("cart/")?;
        let body = self
            .execute(self.request(Method::GET, url, Some(token)))
            .await?;

        // An empty body means the user has no cart yet.
        if body.trim().is_empty() {
            return Ok(CartPayload::Empty);
        }
        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %excerpt(&body), "Failed to parse cart response");
            ApiError::Parse(e)
        })
    }

    #[instrument(skip(self, token))]
    async fn add_to_cart(
        &self,
        token: &BearerToken,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint("cart/add/")?;
        let body = AddToCartBody {
            product_id,
            quantity,
        };
        self.execute_json(self.request(Method::POST, url, Some(token)).json(&body))
            .await
    }

    #[instrument(skip(self, token))]
    async fn remove_from_cart(
        &self,
        token: &BearerToken,
        product_id: ProductId,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint("cart/remove/")?;
        let body = RemoveFromCartBody { product_id };
        self.execute_json(self.request(Method::POST, url, Some(token)).json(&body))
            .await
    }

    #[instrument(skip_all)]
    async fn clear_cart(&self, token: &BearerToken) -> Result<(), ApiError> {
        let url = self.endpoint("cart/clear/")?;
        self.execute(self.request(Method::POST, url, Some(token)))
            .await
            .map(drop)
    }

    #[instrument(skip(self, token, order), fields(items_count = order.items_count, expected_total = %order.expected_total))]
    async fn create_order(
        &self,
        token: &BearerToken,
        order: &OrderRequest,
    ) -> Result<OrderResponse, ApiError> {
        let url = self.endpoint("orders/")?;
        self.execute_json(self.request(Method::POST, url, Some(token)).json(order))
            .await
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_base_url(Url::parse(base).unwrap(), Duration::from_secs(60))
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let api = client("https://api.example.com/api");
        assert_eq!(api.base_url().as_str(), "https://api.example.com/api/");
        assert_eq!(
            api.endpoint("cart/add/").unwrap().as_str(),
            "https://api.example.com/api/cart/add/"
        );
        assert_eq!(
            api.endpoint("/products/7/reviews/").unwrap().as_str(),
            "https://api.example.com/api/products/7/reviews/"
        );
    }

    #[test]
    fn test_debug_shows_base_url_only() {
        let api = client("https://api.example.com/");
        let debug = format!("{api:?}");
        assert!(debug.contains("https://api.example.com/"));
    }

    #[tokio::test]
    async fn test_cached_places_served_without_request() {
        // Unroutable base: any real request would fail.
        let api = client("http://127.0.0.1:9/");
        let places: Vec<Place> = serde_json::from_value(serde_json::json!([
            {"id": 1, "name": "Attabad Lake", "images": []}
        ]))
        .unwrap();
        api.inner
            .cache
            .insert(CacheKey::Places, CacheValue::Places(places.clone()))
            .await;

        assert_eq!(api.list_places().await.unwrap(), places);

        api.invalidate_catalog();
        api.inner.cache.run_pending_tasks().await;
        assert!(api.inner.cache.get(&CacheKey::Places).await.is_none());
    }
}
