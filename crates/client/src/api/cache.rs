//! Cache types for catalog responses.

use gb_green_guide_core::ProductId;

use crate::models::{Place, Product};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products,
    Places,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Places(Vec<Place>),
}
