//! Purchase orders.
//!
//! Orders come in one shape only. They are read from `GET /orders` and skip the
//! schema registry: records decode straight into [`Order`], and a mismatch
//! surfaces as [`GraphError::Json`](crate::error::GraphError::Json).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the seller may split an order into shipments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShipmentGrouping {
    /// No preference.
    Unspecified,
    /// Ship lines as they become available.
    AsAvailable,
    /// Hold lines to minimize the number of shipments.
    MinShipments,
    /// Value not known to this client.
    #[serde(other)]
    Other,
}

/// Postal address of a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalAddress {
    /// Country name or ISO 3166-1 alpha-2 code.
    pub country: Option<String>,
    /// First-level administrative division.
    pub region: Option<String>,
    /// City or town.
    pub locality: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Attention line.
    pub attention_line: Option<String>,
    /// First street address line.
    pub street_address_line_one: Option<String>,
    /// Second street address line.
    pub street_address_line_two: Option<String>,
}

/// Buyer or shipping contact of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    /// Customer ID in the seller's system.
    pub seller_customer_id: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Phone number.
    pub telephone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Postal address.
    pub address: Option<PostalAddress>,
}

/// Scheduled partial release of an order line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduledRelease {
    /// Release date, as an ISO 8601 datetime.
    pub scheduled_date: Option<String>,
    /// Quantity released on that date.
    pub scheduled_quantity: Option<u64>,
}

/// One line of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLine {
    /// Buyer's own reference for the line.
    pub customer_reference: Option<String>,
    /// Cofactr product ID.
    pub cofactr_product_id: Option<String>,
    /// Seller SKU.
    pub seller_product_id: Option<String>,
    /// Quantity ordered.
    pub quantity_ordered: Option<u64>,
    /// Unit price the buyer expected when ordering.
    pub expected_unit_price: Option<Decimal>,
    /// Scheduled releases; empty for a single shipment.
    pub schedule: Vec<ScheduledRelease>,
}

/// Purchase order placed with a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Cofactr order ID (`{owner}:{seller order number}`).
    pub id: String,
    /// Org whose seller accounts placed the order; Cofactr's own when absent.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Seller ID.
    #[serde(default)]
    pub seller_id: Option<String>,
    /// Purchase order number.
    #[serde(default)]
    pub po_number: Option<String>,
    /// Contact of the buyer.
    #[serde(default)]
    pub buyer_contact: Option<Contact>,
    /// Contact to ship to.
    #[serde(default)]
    pub shipping_contact: Option<Contact>,
    /// Billing account at the seller.
    #[serde(default)]
    pub billing_account_id: Option<String>,
    /// Shipment grouping preference.
    #[serde(default)]
    pub shipment_grouping_preference: Option<ShipmentGrouping>,
    /// Shipping methods, most preferred first.
    #[serde(default)]
    pub shipping_methods: Vec<String>,
    /// Order lines.
    #[serde(default)]
    pub order_lines: Vec<OrderLine>,
}

impl Order {
    /// Total quantity over all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.order_lines.iter().filter_map(|line| line.quantity_ordered).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_order_decodes() {
        let order: Order = serde_json::from_value(json!({
            "id": "622fb450e4c292d8287b0af5:82103877",
            "seller_id": "digikey",
            "po_number": "123",
            "shipping_contact": {
                "company": "Cofactr",
                "address": {"country": "US", "postal_code": "11211"}
            },
            "shipment_grouping_preference": "as-available",
            "shipping_methods": ["UPS ground"],
            "order_lines": [
                {
                    "cofactr_product_id": "ICR446EIPYNM",
                    "seller_product_id": "497-8552-1-ND",
                    "quantity_ordered": 3,
                    "expected_unit_price": 10,
                    "schedule": []
                },
                {"quantity_ordered": 2, "expected_unit_price": "0.125"}
            ]
        }))
        .unwrap();

        assert_eq!(order.shipment_grouping_preference, Some(ShipmentGrouping::AsAvailable));
        assert_eq!(order.order_lines[1].expected_unit_price, Some(Decimal::from_str("0.125").unwrap()));
        assert_eq!(order.total_quantity(), 5);
        let address = order.shipping_contact.and_then(|c| c.address).unwrap();
        assert_eq!(address.postal_code.as_deref(), Some("11211"));
        assert!(order.buyer_contact.is_none());
    }

    #[test]
    fn test_order_requires_id() {
        assert!(serde_json::from_value::<Order>(json!({"seller_id": "digikey"})).is_err());
    }

    #[test]
    fn test_unknown_grouping_tolerated() {
        let order: Order = serde_json::from_value(json!({
            "id": "A:1",
            "shipment_grouping_preference": "by-weekday"
        }))
        .unwrap();
        assert_eq!(order.shipment_grouping_preference, Some(ShipmentGrouping::Other));
    }
}
