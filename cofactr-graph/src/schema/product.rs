//! Product (part) shapes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DecodeFn, Entity, EntityKind, OfferV2, SchemaId, raw_deprecated_ids, raw_id};

/// Price at a quantity break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Minimum quantity for this price.
    pub quantity: u64,
    /// Unit price.
    pub price: Decimal,
    /// ISO 4217 currency code; USD when absent.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Technical specification value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    /// Property identifier (e.g. `packaging`).
    pub id: String,
    /// Human-readable property name.
    #[serde(default)]
    pub label: Option<String>,
    /// Value, in the property's own JSON shape.
    #[serde(default)]
    pub value: Value,
    /// Unit of a quantity value.
    #[serde(default)]
    pub unit: Option<String>,
}

/// Datasheet or other document attached to a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Display label.
    pub label: String,
    /// Download URL.
    pub url: String,
    /// File name.
    #[serde(default)]
    pub filename: Option<String>,
}

/// How a part attaches to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationType {
    /// Surface mount.
    #[serde(rename = "SMT")]
    Smt,
    /// Through hole.
    #[serde(rename = "THT")]
    Tht,
    /// Press fit.
    #[serde(rename = "pressed fit")]
    PressedFit,
    /// Mixed surface mount and through hole.
    #[serde(rename = "hybrid of SMT and THT")]
    HybridSmtTht,
    /// Mixed press fit and surface mount.
    #[serde(rename = "hybrid of pressed fit and SMT")]
    HybridPressedFitSmt,
    /// Mixed press fit and through hole.
    #[serde(rename = "hybrid of pressed fit and THT")]
    HybridPressedFitTht,
    /// Anything else, including values added after this client was built.
    #[serde(rename = "other", other)]
    Other,
}

/// Manufacturing lifecycle stage of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStatus {
    /// Newly introduced.
    New,
    /// Not recommended for new designs.
    #[serde(rename = "NRFND")]
    Nrfnd,
    /// In production.
    Production,
    /// End of life announced.
    #[serde(rename = "EOL")]
    Eol,
    /// No longer manufactured.
    Obsolete,
    /// Status not known to this client.
    #[serde(other)]
    Unknown,
}

/// Part in the `flagship` schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Cofactr product ID.
    pub id: String,
    /// Former IDs merged into this part.
    #[serde(default)]
    pub deprecated_ids: Vec<String>,
    /// Canonical manufacturer part number.
    #[serde(default)]
    pub mpn: Option<String>,
    /// Other part numbers the part is sold under.
    #[serde(default)]
    pub alt_mpns: Vec<String>,
    /// Manufacturer name.
    #[serde(default)]
    pub mfr: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Category label.
    #[serde(default)]
    pub classification: Option<String>,
    /// Hero image URL.
    #[serde(default)]
    pub hero_image: Option<String>,
    /// Package or case code.
    #[serde(default)]
    pub package: Option<String>,
    /// Pin count.
    #[serde(default)]
    pub terminations: Option<u32>,
    /// Technical specifications.
    #[serde(default)]
    pub specs: Vec<Spec>,
    /// Attached documents.
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Part in `flagship-v2` through `flagship-v7`.
///
/// The reference prices and `termination_type` are part of every version from v2
/// on, so a record without them fails to decode. `msl` appears from v5 and
/// `lifecycle_status` from v6; both stay `None` for earlier versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartV2 {
    /// Fields shared with `flagship`.
    #[serde(flatten)]
    pub part: Part,
    /// Reference prices from buyable offers.
    pub buyable_reference_prices: Vec<PricePoint>,
    /// Reference prices from all offers.
    pub reference_prices: Vec<PricePoint>,
    /// Termination type.
    pub termination_type: TerminationType,
    /// Moisture sensitivity level.
    #[serde(default)]
    pub msl: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub lifecycle_status: Option<LifecycleStatus>,
}

/// Alternate of a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltPart {
    /// Cofactr product ID of the alternate.
    pub id: String,
    /// Manufacturer part number.
    #[serde(default)]
    pub mpn: Option<String>,
    /// Manufacturer name.
    #[serde(default)]
    pub mfr: Option<String>,
}

/// Part in `flagship-alts-v0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltsPart {
    /// Fields shared with `flagship`.
    #[serde(flatten)]
    pub part: Part,
    /// Form-fit-function alternates.
    #[serde(default)]
    pub alts: Vec<AltPart>,
}

/// Part in `flagship-cache-v0` through `flagship-cache-v5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPart {
    /// Fields shared with the flagship part shapes.
    #[serde(flatten)]
    pub part: PartV2,
    /// Cached offers.
    #[serde(default)]
    pub offers: Vec<Value>,
    /// When the cache entry was written.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Part in `logistics` through `logistics-v4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsPart {
    /// Cofactr product ID.
    pub id: String,
    /// Former IDs merged into this part.
    #[serde(default)]
    pub deprecated_ids: Vec<String>,
    /// Manufacturer part number.
    #[serde(default)]
    pub mpn: Option<String>,
    /// Manufacturer name.
    #[serde(default)]
    pub mfr: Option<String>,
    /// Package or case code.
    #[serde(default)]
    pub package: Option<String>,
    /// Moisture sensitivity level.
    #[serde(default)]
    pub msl: Option<String>,
    /// Pin count.
    #[serde(default)]
    pub terminations: Option<u32>,
    /// Termination type.
    #[serde(default)]
    pub termination_type: Option<TerminationType>,
    /// Harmonized tariff code.
    #[serde(default)]
    pub hts_code: Option<String>,
    /// Export control classification number.
    #[serde(default)]
    pub eccn: Option<String>,
    /// Country of origin.
    #[serde(default)]
    pub country_of_origin: Option<String>,
}

/// Part in `price-solver-v0` through `price-solver-v7`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSolverPart {
    /// Cofactr product ID.
    pub id: String,
    /// Former IDs merged into this part.
    #[serde(default)]
    pub deprecated_ids: Vec<String>,
    /// Manufacturer part number.
    #[serde(default)]
    pub mpn: Option<String>,
    /// Manufacturer name.
    #[serde(default)]
    pub mfr: Option<String>,
    /// Offers to solve prices over.
    #[serde(default)]
    pub offers: Vec<OfferV2>,
    /// Reference prices from all offers.
    #[serde(default)]
    pub reference_prices: Vec<PricePoint>,
}

/// A product decoded with one schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum Product {
    /// Record of the `internal` schema, untouched.
    Raw(Value),
    /// `flagship`
    Part(Part),
    /// `flagship-v2` through `flagship-v7`
    PartV2(PartV2),
    /// `flagship-alts-v0`
    Alts(AltsPart),
    /// `flagship-cache-v0` through `flagship-cache-v5`
    Cached(CachedPart),
    /// `logistics` through `logistics-v4`
    Logistics(LogisticsPart),
    /// `price-solver-v0` through `price-solver-v7`
    PriceSolver(PriceSolverPart),
}

impl Product {
    /// Manufacturer part number, when the shape carries one.
    #[must_use]
    pub fn mpn(&self) -> Option<&str> {
        match self {
            Self::Raw(record) => record.get("mpn").and_then(Value::as_str),
            Self::Part(p) => p.mpn.as_deref(),
            Self::PartV2(p) => p.part.mpn.as_deref(),
            Self::Alts(p) => p.part.mpn.as_deref(),
            Self::Cached(p) => p.part.part.mpn.as_deref(),
            Self::Logistics(p) => p.mpn.as_deref(),
            Self::PriceSolver(p) => p.mpn.as_deref(),
        }
    }
}

impl Entity for Product {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Raw(record) => raw_id(record),
            Self::Part(p) => Some(&p.id),
            Self::PartV2(p) => Some(&p.part.id),
            Self::Alts(p) => Some(&p.part.id),
            Self::Cached(p) => Some(&p.part.part.id),
            Self::Logistics(p) => Some(&p.id),
            Self::PriceSolver(p) => Some(&p.id),
        }
    }

    fn deprecated_ids(&self) -> Vec<&str> {
        let ids = match self {
            Self::Raw(record) => return raw_deprecated_ids(record),
            Self::Part(p) => &p.deprecated_ids,
            Self::PartV2(p) => &p.part.deprecated_ids,
            Self::Alts(p) => &p.part.deprecated_ids,
            Self::Cached(p) => &p.part.part.deprecated_ids,
            Self::Logistics(p) => &p.deprecated_ids,
            Self::PriceSolver(p) => &p.deprecated_ids,
        };
        ids.iter().map(String::as_str).collect()
    }

    fn decoder(_kind: EntityKind, schema: SchemaId) -> Option<DecodeFn<Self>> {
        use SchemaId as S;

        let decode: DecodeFn<Self> = match schema {
            S::Internal => |v| Ok(Self::Raw(v)),
            S::Flagship => |v| serde_json::from_value(v).map(Self::Part),
            S::FlagshipV2
            | S::FlagshipV3
            | S::FlagshipV4
            | S::FlagshipV5
            | S::FlagshipV6
            | S::FlagshipV7 => |v| serde_json::from_value(v).map(Self::PartV2),
            S::FlagshipAltsV0 => |v| serde_json::from_value(v).map(Self::Alts),
            S::FlagshipCacheV0
            | S::FlagshipCacheV1
            | S::FlagshipCacheV2
            | S::FlagshipCacheV3
            | S::FlagshipCacheV4
            | S::FlagshipCacheV5 => |v| serde_json::from_value(v).map(Self::Cached),
            S::Logistics | S::LogisticsV2 | S::LogisticsV3 | S::LogisticsV4 => {
                |v| serde_json::from_value(v).map(Self::Logistics)
            }
            S::PriceSolverV0
            | S::PriceSolverV1
            | S::PriceSolverV2
            | S::PriceSolverV3
            | S::PriceSolverV4
            | S::PriceSolverV5
            | S::PriceSolverV6
            | S::PriceSolverV7 => |v| serde_json::from_value(v).map(Self::PriceSolver),
        };
        Some(decode)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    fn decode(schema: SchemaId, record: Value) -> serde_json::Result<Product> {
        let decode = Product::decoder(EntityKind::Product, schema).unwrap();
        decode(record)
    }

    #[test]
    fn test_every_schema_has_a_product_decoder() {
        for schema in SchemaId::ALL {
            assert!(Product::decoder(EntityKind::Product, *schema).is_some(), "{schema}");
        }
    }

    #[test]
    fn test_flagship_part() {
        let product = decode(
            SchemaId::Flagship,
            json!({
                "id": "TRRQ3ESYFO28",
                "mpn": "IRFH5006TRPBF",
                "mfr": "Infineon",
                "specs": [{"id": "packaging", "label": "Packaging", "value": "Tape & Reel"}],
                "documents": [{"label": "Datasheet", "url": "https://example.com/ds.pdf"}]
            }),
        )
        .unwrap();

        let Product::Part(part) = &product else {
            panic!("expected flagship part");
        };
        assert_eq!(part.specs[0].id, "packaging");
        assert_eq!(part.documents[0].filename, None);
        assert_eq!(product.mpn(), Some("IRFH5006TRPBF"));
        assert!(product.deprecated_ids().is_empty());
    }

    #[test]
    fn test_flagship_v6_part_with_prices() {
        let product = decode(
            SchemaId::FlagshipV6,
            json!({
                "id": "CCV1F7A8UIYH",
                "deprecated_ids": ["OLD1", "OLD2"],
                "buyable_reference_prices": [],
                "reference_prices": [{"quantity": 1, "price": "0.52"}, {"quantity": 100, "price": 0.31}],
                "termination_type": "SMT",
                "msl": "1",
                "lifecycle_status": "NRFND"
            }),
        )
        .unwrap();

        let Product::PartV2(part) = &product else {
            panic!("expected v2 part");
        };
        assert_eq!(part.reference_prices.len(), 2);
        assert_eq!(part.reference_prices[0].price, Decimal::from_str("0.52").unwrap());
        assert_eq!(part.termination_type, TerminationType::Smt);
        assert_eq!(part.lifecycle_status, Some(LifecycleStatus::Nrfnd));
        assert_eq!(product.id(), Some("CCV1F7A8UIYH"));
        assert_eq!(product.deprecated_ids(), vec!["OLD1", "OLD2"]);
    }

    #[test]
    fn test_unknown_enum_values_are_tolerated() {
        let product = decode(
            SchemaId::FlagshipV7,
            json!({
                "id": "X",
                "buyable_reference_prices": [],
                "reference_prices": [],
                "termination_type": "wire lead",
                "lifecycle_status": "Sunset"
            }),
        )
        .unwrap();
        let Product::PartV2(part) = product else {
            panic!("expected v2 part");
        };
        assert_eq!(part.termination_type, TerminationType::Other);
        assert_eq!(part.lifecycle_status, Some(LifecycleStatus::Unknown));
    }

    #[test]
    fn test_flagship_v2_fields_required() {
        let missing_prices = decode(
            SchemaId::FlagshipV2,
            json!({"id": "X", "buyable_reference_prices": [], "termination_type": "SMT"}),
        )
        .unwrap_err();
        assert!(missing_prices.to_string().contains("reference_prices"), "{missing_prices}");

        let missing_termination = decode(
            SchemaId::FlagshipV7,
            json!({"id": "X", "buyable_reference_prices": [], "reference_prices": []}),
        )
        .unwrap_err();
        assert!(missing_termination.to_string().contains("termination_type"));

        // Fields introduced after v2 stay optional.
        let product = decode(
            SchemaId::FlagshipV7,
            json!({
                "id": "X",
                "buyable_reference_prices": [],
                "reference_prices": [],
                "termination_type": "THT"
            }),
        )
        .unwrap();
        assert!(matches!(product, Product::PartV2(ref p) if p.msl.is_none()));
    }

    #[test]
    fn test_alts_part() {
        let product = decode(
            SchemaId::FlagshipAltsV0,
            json!({"id": "A", "alts": [{"id": "B", "mpn": "2N7002"}]}),
        )
        .unwrap();
        let Product::Alts(part) = product else {
            panic!("expected alts part");
        };
        assert_eq!(part.alts[0].id, "B");
    }

    #[test]
    fn test_cached_part() {
        let product = decode(
            SchemaId::FlagshipCacheV5,
            json!({
                "id": "A",
                "deprecated_ids": ["Z"],
                "buyable_reference_prices": [],
                "reference_prices": [],
                "termination_type": "SMT",
                "offers": [{"sku": "1"}],
                "updated_at": "2023-04-01T12:00:00Z",
                "msl": "3"
            }),
        )
        .unwrap();
        let Product::Cached(part) = &product else {
            panic!("expected cached part");
        };
        assert_eq!(part.offers.len(), 1);
        assert!(part.updated_at.is_some());
        assert_eq!(part.part.msl.as_deref(), Some("3"));
        assert_eq!(product.deprecated_ids(), vec!["Z"]);
    }

    #[test]
    fn test_logistics_part() {
        let product =
            decode(SchemaId::LogisticsV3, json!({"id": "A", "hts_code": "8541.29.0095"})).unwrap();
        assert!(matches!(product, Product::Logistics(ref p) if p.hts_code.is_some()));
    }

    #[test]
    fn test_price_solver_part() {
        let product = decode(
            SchemaId::PriceSolverV7,
            json!({"id": "A", "offers": [{"inventory_level": 1200, "prices": []}]}),
        )
        .unwrap();
        let Product::PriceSolver(part) = product else {
            panic!("expected price solver part");
        };
        assert_eq!(part.offers.len(), 1);
    }

    #[test]
    fn test_missing_id_fails() {
        assert!(decode(SchemaId::Logistics, json!({"mpn": "X"})).is_err());
    }

    #[test]
    fn test_wrong_field_type_fails() {
        assert!(decode(SchemaId::Flagship, json!({"id": "X", "terminations": "many"})).is_err());
    }

    #[test]
    fn test_internal_keeps_record() {
        let record = json!({"id": "A", "deprecated_ids": ["B"], "statements": {}});
        let product = decode(SchemaId::Internal, record.clone()).unwrap();
        assert_eq!(product, Product::Raw(record));
        assert_eq!(product.id(), Some("A"));
        assert_eq!(product.deprecated_ids(), vec!["B"]);
    }
}
