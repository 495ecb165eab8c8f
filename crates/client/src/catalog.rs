//! Catalog access: products, the places gallery and product reviews.

use thiserror::Error;
use tracing::{info, instrument};

use gb_green_guide_core::{ProductId, Rating};

use crate::api::{ApiClient, ApiError};
use crate::gallery::{GalleryImage, filter_gallery, filter_products, flatten_gallery};
use crate::models::{Product, Review, ReviewRequest};
use crate::session::SessionStore;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Posting a review needs an active session.
    #[error("Authentication required")]
    AuthRequired,

    /// The review was rejected before sending.
    #[error("Invalid review: {0}")]
    InvalidReview(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CatalogError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please log in to leave a review.".to_string(),
            Self::InvalidReview(message) => message.clone(),
            Self::Api(err) => err.user_message(),
        }
    }
}

/// Catalog service over the API client.
#[derive(Debug, Clone)]
pub struct Catalog {
    api: ApiClient,
    session: SessionStore,
}

impl Catalog {
    #[must_use]
    pub const fn new(api: ApiClient, session: SessionStore) -> Self {
        Self { api, session }
    }

    /// All products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.api.list_products().await?)
    }

    /// Products matching `query` by name or category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let products = self.api.list_products().await?;
        Ok(filter_products(&products, query)
            .into_iter()
            .cloned()
            .collect())
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    pub async fn product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        Ok(self.api.get_product(product_id).await?)
    }

    /// Gallery tiles for every place image, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn gallery(&self, query: &str) -> Result<Vec<GalleryImage>, CatalogError> {
        let places = self.api.list_places().await?;
        let images = flatten_gallery(&places);
        Ok(filter_gallery(&images, query).into_iter().cloned().collect())
    }

    /// Reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn reviews(&self, product_id: ProductId) -> Result<Vec<Review>, CatalogError> {
        Ok(self.api.list_reviews(product_id).await?)
    }

    /// Post a review as the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidReview` for a rating outside 1-5 or a
    /// blank comment, `CatalogError::AuthRequired` without a session, or
    /// the API error.
    #[instrument(skip(self, comment), fields(product_id = %product_id, rating = stars))]
    pub async fn post_review(
        &self,
        product_id: ProductId,
        stars: u8,
        comment: &str,
    ) -> Result<Review, CatalogError> {
        let rating = Rating::new(stars).map_err(CatalogError::InvalidReview)?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(CatalogError::InvalidReview(
                "Please write a comment".to_string(),
            ));
        }

        let session = self
            .session
            .require_active()
            .map_err(|_| CatalogError::AuthRequired)?;

        let request = ReviewRequest {
            rating,
            comment: comment.to_string(),
        };
        match self
            .api
            .create_review(&session.token, product_id, &request)
            .await
        {
            Ok(review) => {
                info!(review_id = %review.id, "Review posted");
                Ok(review)
            }
            Err(ApiError::Unauthorized) => {
                self.session.handle_unauthorized();
                Err(CatalogError::AuthRequired)
            }
            Err(e) => Err(e.into()),
        }
    }
}
