//! Organization and supplier shapes.
//!
//! Orgs and suppliers come from the same endpoints and share one schema table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DecodeFn, Entity, EntityKind, SchemaId, raw_deprecated_ids, raw_id};

/// Seller in the `flagship` and `logistics` schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    /// Display name.
    pub label: String,
    /// Other names the seller is known by.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Authenticity score, 0-100.
    #[serde(default)]
    pub authenticity_score: Option<i64>,
    /// Availability score, 0-100.
    #[serde(default)]
    pub availability_score: Option<i64>,
    /// Markup added on top of listed prices, as a fraction.
    #[serde(default)]
    pub additional_markup: Option<Decimal>,
    /// Flat fee added per order.
    #[serde(default)]
    pub additional_fee: Option<Decimal>,
    /// Quality certifications.
    #[serde(default)]
    pub certifications: Vec<String>,
    /// Independent of accuracy: whether orders can be placed with this seller.
    #[serde(default)]
    pub is_buyable: Option<bool>,
}

/// Seller in `flagship-v2` through `flagship-v4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerV2 {
    /// Organization ID.
    pub id: String,
    /// Former IDs merged into this organization.
    #[serde(default)]
    pub deprecated_ids: Vec<String>,
    /// Whether the seller is an authorized distributor.
    #[serde(default)]
    pub is_authorized: Option<bool>,
    /// Fields shared with `flagship`.
    #[serde(flatten)]
    pub seller: Seller,
}

/// Seller in `logistics-v2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsSeller {
    /// Organization ID.
    pub id: String,
    /// Former IDs merged into this organization.
    #[serde(default)]
    pub deprecated_ids: Vec<String>,
    /// Display name.
    pub label: String,
    /// Two-letter code of the seller's home country.
    #[serde(default)]
    pub country: Option<String>,
    /// Shipping carriers the seller works with.
    #[serde(default)]
    pub shipping_methods: Vec<String>,
}

/// An organization or supplier decoded with one schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum Org {
    /// Record of the `internal` schema, untouched.
    Raw(Value),
    /// `flagship` and `logistics`
    Seller(Seller),
    /// `flagship-v2` through `flagship-v4`
    SellerV2(SellerV2),
    /// `logistics-v2`
    Logistics(LogisticsSeller),
}

impl Org {
    /// Display name, when the shape carries one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Raw(record) => record.get("label").and_then(Value::as_str),
            Self::Seller(s) => Some(&s.label),
            Self::SellerV2(s) => Some(&s.seller.label),
            Self::Logistics(s) => Some(&s.label),
        }
    }
}

impl Entity for Org {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Raw(record) => raw_id(record),
            Self::Seller(_) => None,
            Self::SellerV2(s) => Some(&s.id),
            Self::Logistics(s) => Some(&s.id),
        }
    }

    fn deprecated_ids(&self) -> Vec<&str> {
        match self {
            Self::Raw(record) => raw_deprecated_ids(record),
            Self::Seller(_) => Vec::new(),
            Self::SellerV2(s) => s.deprecated_ids.iter().map(String::as_str).collect(),
            Self::Logistics(s) => s.deprecated_ids.iter().map(String::as_str).collect(),
        }
    }

    fn decoder(_kind: EntityKind, schema: SchemaId) -> Option<DecodeFn<Self>> {
        use SchemaId as S;

        let decode: DecodeFn<Self> = match schema {
            S::Internal => |v| Ok(Self::Raw(v)),
            S::Flagship | S::Logistics => |v| serde_json::from_value(v).map(Self::Seller),
            S::FlagshipV2 | S::FlagshipV3 | S::FlagshipV4 => {
                |v| serde_json::from_value(v).map(Self::SellerV2)
            }
            S::LogisticsV2 => |v| serde_json::from_value(v).map(Self::Logistics),
            _ => return None,
        };
        Some(decode)
    }
}
