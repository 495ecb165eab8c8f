//! Catalog types: products, places and reviews.

use serde::{Deserialize, Serialize};

use gb_green_guide_core::{ImageId, Money, PlaceId, ProductId, Rating, ReviewId};

// =============================================================================
// Listing
// =============================================================================

/// A list endpoint response, paginated or plain.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
    },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    /// Drop pagination metadata and return the items.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page { results, .. } | Self::Plain(results) => results,
        }
    }
}

// =============================================================================
// Product Types
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    /// Category, either a plain name or a nested `{ "name": ... }` object.
    #[serde(default)]
    pub category: Option<serde_json::Value>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
}

const fn default_available() -> bool {
    true
}

impl Product {
    /// Category name, whichever shape the API used.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        match self.category.as_ref()? {
            serde_json::Value::String(name) => Some(name.as_str()),
            serde_json::Value::Object(map) => map.get("name").and_then(serde_json::Value::as_str),
            _ => None,
        }
    }

    /// Effective unit price: the discount price when it is a real reduction.
    #[must_use]
    pub fn unit_price(&self) -> Money {
        match self.discount_price {
            Some(discount) if !discount.is_zero() && discount < self.price => discount,
            _ => self.price,
        }
    }

    /// Returns true if at least one unit can be ordered.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.is_available && self.stock > 0
    }
}

// =============================================================================
// Place Types
// =============================================================================

/// City a place belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// One image attached to a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceImage {
    #[serde(default)]
    pub id: Option<ImageId>,
    /// Image URL.
    pub image: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// A tourist place with its photo collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    #[serde(default)]
    pub city: Option<City>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<PlaceImage>,
}

impl Place {
    /// City name from the nested city, falling back to the flat field.
    #[must_use]
    pub fn city_label(&self) -> Option<&str> {
        self.city
            .as_ref()
            .map(|city| city.name.as_str())
            .or(self.city_name.as_deref())
    }
}

// =============================================================================
// Review Types
// =============================================================================

/// A product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub rating: Rating,
    #[serde(default)]
    pub comment: String,
    #[serde(default, alias = "user")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request body for posting a review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub rating: Rating,
    pub comment: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_shapes() {
        let page: Listing<Place> = serde_json::from_value(serde_json::json!({
            "count": 1,
            "results": [{"id": 1, "name": "Attabad Lake"}]
        }))
        .unwrap();
        assert_eq!(page.into_vec().len(), 1);

        let plain: Listing<Place> =
            serde_json::from_value(serde_json::json!([{"id": 1, "name": "Deosai"}])).unwrap();
        assert_eq!(plain.into_vec().len(), 1);
    }

    #[test]
    fn test_category_name_shapes() {
        let mut product: Product = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Walnuts", "price": "900.00", "category": "Dry fruits"
        }))
        .unwrap();
        assert_eq!(product.category_name(), Some("Dry fruits"));

        product.category = Some(serde_json::json!({"id": 2, "name": "Oils"}));
        assert_eq!(product.category_name(), Some("Oils"));
        assert!(!product.in_stock());
    }

    #[test]
    fn test_place_city_label() {
        let place: Place = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Baltit Fort", "city": {"name": "Karimabad"}, "city_name": "Hunza"
        }))
        .unwrap();
        assert_eq!(place.city_label(), Some("Karimabad"));

        let flat: Place = serde_json::from_value(serde_json::json!({
            "id": 2, "name": "Shangrila", "city_name": "Skardu"
        }))
        .unwrap();
        assert_eq!(flat.city_label(), Some("Skardu"));
    }
}
