//! Order totals derived from the cart.

use gb_green_guide_core::Money;

use crate::models::Cart;

/// Totals shown on the checkout page.
///
/// Shipping and tax are not charged; they stay zero and are kept so the
/// summary layout does not change if they ever are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
    pub item_count: u32,
}

impl OrderSummary {
    /// Fold a cart into its summary.
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        let subtotal = cart.subtotal();
        let shipping = Money::ZERO;
        let tax = Money::ZERO;

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
            item_count: cart.item_count(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_uses_server_line_totals() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "id": 1,
            "items": [
                {
                    "id": 10,
                    "product": {"id": 1, "name": "Dried apricots", "price": "450.00", "stock": 9},
                    "quantity": 2,
                    "total_price": "850.00"
                },
                {
                    "id": 11,
                    "product": {"id": 2, "name": "Walnut oil", "price": "1200.00", "stock": 3},
                    "quantity": 1
                }
            ]
        }))
        .unwrap();

        let summary = OrderSummary::from_cart(&cart);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, Money::from_minor(205_000));
        assert_eq!(summary.total, summary.subtotal);
        assert!(summary.shipping.is_zero());
        assert!(summary.tax.is_zero());
    }

    #[test]
    fn test_empty_cart_summary() {
        assert_eq!(OrderSummary::from_cart(&Cart::empty()), OrderSummary::default());
    }
}
