//! Order submission types.

use serde::{Deserialize, Serialize};

use gb_green_guide_core::{Money, OrderId, OrderStatus, PaymentMethod};

/// Request body for placing an order from the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub address_line1: String,
    pub address_line2: String,
    pub country: String,
    pub payment_method: PaymentMethod,
    pub order_notes: String,
    pub items_count: u32,
    pub expected_total: Money,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, alias = "product_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub total_price: Option<Money>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A placed order as returned by the order endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default, alias = "total_amount")]
    pub total: Option<Money>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OrderRecord {
    /// Human-facing reference: the order number if the API issued one.
    #[must_use]
    pub fn reference(&self) -> String {
        self.order_number
            .clone()
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

/// Order endpoint response: the record either nested under `data` or at
/// the top level.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderResponse {
    Nested { data: OrderRecord },
    Flat(OrderRecord),
}

impl OrderResponse {
    /// Normalize to the order record, whichever shape arrived.
    #[must_use]
    pub fn into_order(self) -> OrderRecord {
        match self {
            Self::Nested { data } | Self::Flat(data) => data,
        }
    }
}

impl From<OrderRecord> for OrderResponse {
    fn from(order: OrderRecord) -> Self {
        Self::Flat(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_response_flat() {
        let json = serde_json::json!({"id": 123, "items": [{"product_name": "Walnuts", "quantity": 2}]});
        let order = serde_json::from_value::<OrderResponse>(json).unwrap().into_order();
        assert_eq!(order.id, OrderId::new(123));
        assert_eq!(order.items.len(), 1);
        let first = order.items.first().unwrap();
        assert_eq!(first.name.as_deref(), Some("Walnuts"));
        assert_eq!(first.quantity, 2);
    }

    #[test]
    fn test_order_response_nested_under_data() {
        let json = serde_json::json!({
            "message": "Order placed",
            "data": {"id": 55, "status": "confirmed", "total_amount": "1500.00", "items": []}
        });
        let order = serde_json::from_value::<OrderResponse>(json).unwrap().into_order();
        assert_eq!(order.id, OrderId::new(55));
        assert_eq!(order.status, Some(OrderStatus::Confirmed));
        assert_eq!(order.total, Some(Money::from_minor(150_000)));
        assert_eq!(order.reference(), "#55");
    }

    #[test]
    fn test_order_request_wire_format() {
        let request = OrderRequest {
            full_name: "Amina Baig".to_string(),
            phone: "+92 300 1234567".to_string(),
            email: "amina@example.com".to_string(),
            city: "Gilgit".to_string(),
            address_line1: "Jutial Road".to_string(),
            address_line2: String::new(),
            country: "Pakistan".to_string(),
            payment_method: PaymentMethod::CashOnDelivery,
            order_notes: String::new(),
            items_count: 3,
            expected_total: Money::from_minor(250_000),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["payment_method"], "COD");
        assert_eq!(json["items_count"], 3);
        assert_eq!(json["expected_total"], "2500.00");
    }
}
