//! Cart types.
//!
//! The remote cart is the source of truth. Line totals are computed by the
//! server; the client only falls back to `unit_price * quantity` for display
//! when a payload omits `total_price`.

use serde::{Deserialize, Deserializer, Serialize, de};

use gb_green_guide_core::{CartId, CartItemId, Money, ProductId};

/// Product snapshot embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Money>,
    /// Units in stock. A payload without stock information is treated as
    /// having none, so checkout refuses it rather than overselling.
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

const fn default_available() -> bool {
    true
}

impl CartProduct {
    /// Effective unit price: the discount price when it is a real reduction.
    #[must_use]
    pub fn unit_price(&self) -> Money {
        match self.discount_price {
            Some(discount) if !discount.is_zero() && discount < self.price => discount,
            _ => self.price,
        }
    }
}

/// One product/quantity pairing in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: CartItemId,
    pub product: CartProduct,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
}

impl CartLineItem {
    /// Line total: the server's `total_price`, or a display fallback.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.total_price
            .unwrap_or_else(|| self.product.unit_price().times(self.quantity))
    }

    /// Reason this line cannot be ordered, if any.
    #[must_use]
    pub fn availability_problem(&self) -> Option<String> {
        if !self.product.is_available {
            return Some(format!("{} is no longer available", self.product.name));
        }
        if self.product.stock < self.quantity {
            return Some(format!(
                "Only {} left in stock for {}",
                self.product.stock, self.product.name
            ));
        }
        None
    }
}

/// The active session's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartId>,
    #[serde(default)]
    pub items: Vec<CartLineItem>,
}

impl Cart {
    /// An empty cart with no remote identity.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Find the line holding a product.
    #[must_use]
    pub fn line_for(&self, product_id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    /// Quantity of a product in the cart (0 when absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line_for(product_id).map_or(0, |item| item.quantity)
    }
}

/// Response of the cart fetch endpoint.
///
/// The API may return a paginated collection, a bare list, a single cart
/// object, or nothing (`null` or an empty body). [`CartPayload::into_cart`]
/// normalizes every shape into one [`Cart`]. Anything else, including a cart
/// whose lines fail to decode, is a deserialization error.
#[derive(Debug, Clone)]
pub enum CartPayload {
    Collection { results: Vec<Cart> },
    List(Vec<Cart>),
    Single(Cart),
    Empty,
}

impl<'de> Deserialize<'de> for CartPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Results {
            results: Vec<Cart>,
        }

        let value = serde_json::Value::deserialize(deserializer)?;
        let (has_results, has_items) = value.as_object().map_or((false, false), |map| {
            (map.contains_key("results"), map.contains_key("items"))
        });

        let payload = if value.is_null() {
            Ok(Self::Empty)
        } else if value.is_array() {
            serde_json::from_value(value).map(Self::List)
        } else if has_results {
            serde_json::from_value::<Results>(value).map(|r| Self::Collection { results: r.results })
        } else if has_items {
            serde_json::from_value(value).map(Self::Single)
        } else {
            return Err(de::Error::custom(
                "cart payload has neither `results` nor `items`",
            ));
        };
        payload.map_err(de::Error::custom)
    }
}

impl CartPayload {
    /// Normalize the payload, using the first cart of a collection.
    #[must_use]
    pub fn into_cart(self) -> Cart {
        match self {
            Self::Collection { results } | Self::List(results) => {
                results.into_iter().next().unwrap_or_default()
            }
            Self::Single(cart) => cart,
            Self::Empty => Cart::empty(),
        }
    }
}

impl From<Cart> for CartPayload {
    fn from(cart: Cart) -> Self {
        Self::Single(cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line_json(product_id: i64, quantity: u32, total: &str) -> serde_json::Value {
        serde_json::json!({
            "id": product_id * 10,
            "product": {
                "id": product_id,
                "name": format!("Product {product_id}"),
                "price": "100.00",
                "stock": 5,
                "is_available": true
            },
            "quantity": quantity,
            "total_price": total
        })
    }

    #[test]
    fn test_payload_collection_uses_first_cart() {
        let json = serde_json::json!({
            "results": [
                {"id": 1, "items": [line_json(3, 2, "200.00")]},
                {"id": 2, "items": []}
            ]
        });
        let cart = serde_json::from_value::<CartPayload>(json).unwrap().into_cart();
        assert_eq!(cart.id, Some(CartId::new(1)));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_payload_direct_cart() {
        let json = serde_json::json!({"id": 9, "items": [line_json(1, 1, "100.00")]});
        let cart = serde_json::from_value::<CartPayload>(json).unwrap().into_cart();
        assert_eq!(cart.id, Some(CartId::new(9)));
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_payload_absent_cart_normalizes_to_empty() {
        for json in [
            serde_json::json!({"results": []}),
            serde_json::json!([]),
            serde_json::Value::Null,
        ] {
            let cart = serde_json::from_value::<CartPayload>(json).unwrap().into_cart();
            assert!(cart.is_empty());
            assert_eq!(cart.item_count(), 0);
        }
    }

    #[test]
    fn test_payload_with_broken_line_is_an_error() {
        let mut line = line_json(1, 1, "100.00");
        line["product"]["price"] = serde_json::Value::Null;

        for json in [
            serde_json::json!({"results": [{"id": 1, "items": [line.clone()]}]}),
            serde_json::json!({"id": 1, "items": [line.clone()]}),
            serde_json::json!([{"id": 1, "items": [line]}]),
        ] {
            assert!(serde_json::from_value::<CartPayload>(json).is_err());
        }
    }

    #[test]
    fn test_payload_of_unknown_shape_is_an_error() {
        for json in [
            serde_json::json!({"detail": "ok"}),
            serde_json::json!({}),
            serde_json::json!("cart"),
        ] {
            assert!(serde_json::from_value::<CartPayload>(json).is_err());
        }
    }

    #[test]
    fn test_subtotal_uses_server_totals() {
        let json = serde_json::json!({
            "id": 1,
            "items": [line_json(1, 2, "150.00"), line_json(2, 1, "100.00")]
        });
        let cart: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(cart.subtotal(), Money::from_minor(25_000));
        assert_eq!(cart.quantity_of(ProductId::new(1)), 2);
        assert_eq!(cart.quantity_of(ProductId::new(99)), 0);
    }

    #[test]
    fn test_line_total_display_fallback_uses_discount() {
        let json = serde_json::json!({
            "id": 1,
            "product": {"id": 1, "name": "Apricot Oil", "price": 500, "discount_price": 400, "stock": 3},
            "quantity": 2
        });
        let line: CartLineItem = serde_json::from_value(json).unwrap();
        assert!(line.product.is_available);
        assert_eq!(line.line_total(), Money::from_minor(80_000));
    }

    #[test]
    fn test_availability_problem() {
        let json = serde_json::json!({
            "id": 1,
            "product": {"id": 1, "name": "Dried Mulberries", "price": "10", "stock": 1},
            "quantity": 2,
            "total_price": "20"
        });
        let mut line: CartLineItem = serde_json::from_value(json).unwrap();
        assert_eq!(
            line.availability_problem().as_deref(),
            Some("Only 1 left in stock for Dried Mulberries")
        );

        line.product.is_available = false;
        assert_eq!(
            line.availability_problem().as_deref(),
            Some("Dried Mulberries is no longer available")
        );
    }
}
