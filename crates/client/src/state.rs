//! Application context shared across commands.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::cart::CartStore;
use crate::catalog::Catalog;
use crate::checkout::Checkout;
use crate::config::ClientConfig;
use crate::session::{FileStorage, SessionStorage, SessionStore};

/// Stores and services wired together once per process.
///
/// This struct is cheaply cloneable via `Arc`; every clone hands out the
/// same stores.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    config: ClientConfig,
    api: ApiClient,
    session: SessionStore,
    cart: CartStore<ApiClient>,
    checkout: Checkout<ApiClient>,
    auth: AuthService<ApiClient>,
    catalog: Catalog,
    followers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("api", &self.inner.api)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Build the context with file-backed session storage.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let storage = FileStorage::new(config.session_dir.clone());
        Self::with_storage(config, storage)
    }

    /// Build the context over the given session storage.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn with_storage(config: ClientConfig, storage: impl SessionStorage + 'static) -> Self {
        let api = ApiClient::new(&config);
        let remote = Arc::new(api.clone());
        let session = SessionStore::new(storage);
        let cart = CartStore::new(Arc::clone(&remote), session.clone());
        let checkout = Checkout::new(
            Arc::clone(&remote),
            session.clone(),
            cart.clone(),
            config.default_country.clone(),
        );
        let auth = AuthService::new(remote, session.clone(), cart.clone());
        let catalog = Catalog::new(api.clone(), session.clone());
        let followers = vec![cart.follow_session(), checkout.follow_session()];

        Self {
            inner: Arc::new(AppContextInner {
                config,
                api,
                session,
                cart,
                checkout,
                auth,
                catalog,
                followers: Mutex::new(followers),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore<ApiClient> {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &Checkout<ApiClient> {
        &self.inner.checkout
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService<ApiClient> {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Wait for background work (the post-order cart clear) and stop the
    /// session followers.
    pub async fn shutdown(&self) {
        self.inner.checkout.wait_for_background().await;

        let followers = std::mem::take(
            &mut *self
                .inner
                .followers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in followers {
            handle.abort();
        }
        debug!("Application context shut down");
    }
}
