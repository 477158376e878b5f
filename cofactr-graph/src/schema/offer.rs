//! Offer shapes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DecodeFn, Entity, EntityKind, PricePoint, SchemaId, raw_deprecated_ids, raw_id};

/// Seller offer in the `flagship` schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagshipOffer {
    /// ID of the selling organization.
    #[serde(default)]
    pub seller_id: Option<String>,
    /// Seller display name.
    #[serde(default)]
    pub seller_label: Option<String>,
    /// Whether the seller is an authorized distributor of the part.
    #[serde(default)]
    pub is_authorized: Option<bool>,
    /// Whether the offer can be purchased directly.
    #[serde(default)]
    pub is_buyable: Option<bool>,
    /// Seller's stock keeping unit.
    #[serde(default)]
    pub sku: Option<String>,
    /// Packaging (tape and reel, cut tape, tray...).
    #[serde(default)]
    pub packaging: Option<String>,
    /// Units in stock.
    #[serde(default)]
    pub inventory_level: Option<u64>,
    /// Factory lead time in days.
    #[serde(default)]
    pub factory_lead_days: Option<u32>,
    /// Minimum order quantity.
    #[serde(default)]
    pub moq: Option<u64>,
    /// Order multiple.
    #[serde(default)]
    pub order_multiple: Option<u64>,
    /// Price breaks.
    #[serde(default)]
    pub prices: Vec<PricePoint>,
    /// When the offer data was received.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Manual correction applied to one offer field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCorrection {
    /// Value after correction.
    pub correct_value: Value,
    /// Value reported by the seller.
    pub original_value: Value,
    /// Reason for the correction.
    #[serde(default)]
    pub detail: Option<String>,
    /// When the correction was recorded.
    pub created_at: String,
}

/// Seller offer in `flagship-v2` through `flagship-v5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferV2 {
    /// Fields shared with `flagship`.
    #[serde(flatten)]
    pub offer: FlagshipOffer,
    /// Corrections keyed by field name.
    #[serde(default)]
    pub corrections: HashMap<String, OfferCorrection>,
}

/// Seller offer in `logistics` and `logistics-v2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsOffer {
    /// ID of the selling organization.
    #[serde(default)]
    pub seller_id: Option<String>,
    /// Seller's stock keeping unit.
    #[serde(default)]
    pub sku: Option<String>,
    /// Packaging.
    #[serde(default)]
    pub packaging: Option<String>,
    /// Units in stock.
    #[serde(default)]
    pub inventory_level: Option<u64>,
    /// Two-letter code of the country the stock ships from.
    #[serde(default)]
    pub ship_from_country: Option<String>,
    /// Country of origin.
    #[serde(default)]
    pub country_of_origin: Option<String>,
}

/// An offer decoded with one schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    /// Record of the `internal` schema, untouched.
    Raw(Value),
    /// `flagship`
    Flagship(FlagshipOffer),
    /// `flagship-v2` through `flagship-v5`
    V2(OfferV2),
    /// `logistics` and `logistics-v2`
    Logistics(LogisticsOffer),
}

impl Entity for Offer {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Raw(record) => raw_id(record),
            Self::Flagship(_) | Self::V2(_) | Self::Logistics(_) => None,
        }
    }

    fn deprecated_ids(&self) -> Vec<&str> {
        match self {
            Self::Raw(record) => raw_deprecated_ids(record),
            Self::Flagship(_) | Self::V2(_) | Self::Logistics(_) => Vec::new(),
        }
    }

    fn decoder(_kind: EntityKind, schema: SchemaId) -> Option<DecodeFn<Self>> {
        use SchemaId as S;

        let decode: DecodeFn<Self> = match schema {
            S::Internal => |v| Ok(Self::Raw(v)),
            S::Flagship => |v| serde_json::from_value(v).map(Self::Flagship),
            S::FlagshipV2 | S::FlagshipV3 | S::FlagshipV4 | S::FlagshipV5 => {
                |v| serde_json::from_value(v).map(Self::V2)
            }
            S::Logistics | S::LogisticsV2 => |v| serde_json::from_value(v).map(Self::Logistics),
            _ => return None,
        };
        Some(decode)
    }
}
