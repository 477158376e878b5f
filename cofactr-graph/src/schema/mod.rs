//! Versioned response schemas.
//!
//! The graph API serves the same endpoints in several response shapes, selected
//! with the `schema` query parameter. This module names every schema version
//! ([`SchemaId`]) and maps each `(entity kind, schema)` pair to a decoder that
//! turns a raw JSON record into a typed value.
//!
//! Later schema versions only add fields, so several versions share one shape.
//! The `internal` schema is never decoded: its records are kept as raw JSON.
//!
//! # Examples
//!
//! ```
//! use cofactr_graph::schema::{Entity, EntityKind, Product, SchemaDecoder, SchemaId};
//!
//! let decoder = SchemaDecoder::<Product>::lookup(EntityKind::Product, SchemaId::FlagshipV2)?;
//! let product = decoder.decode(serde_json::json!({
//!     "id": "TRRQ3ESYFO28",
//!     "mpn": "IRFH5006TRPBF",
//!     "deprecated_ids": ["CCV1F7A8UIYH"],
//!     "buyable_reference_prices": [],
//!     "reference_prices": [{"quantity": 1, "price": "2.14"}],
//!     "termination_type": "SMT",
//! }))?;
//!
//! assert!(matches!(product, Product::PartV2(_)));
//! assert_eq!(product.id(), Some("TRRQ3ESYFO28"));
//! # Ok::<(), cofactr_graph::error::GraphError>(())
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, Result};

mod offer;
mod product;
mod seller;

pub use offer::{FlagshipOffer, LogisticsOffer, Offer, OfferCorrection, OfferV2};
pub use product::{
    AltPart, AltsPart, CachedPart, Document, LifecycleStatus, LogisticsPart, Part, PartV2,
    PricePoint, PriceSolverPart, Product, Spec, TerminationType,
};
pub use seller::{LogisticsSeller, Org, Seller, SellerV2};

/// Kind of entity served by the graph API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Parts (`/products`).
    Product,
    /// Seller offers of a part (`/products/{id}/offers`).
    Offer,
    /// Organizations (`/orgs`).
    Org,
    /// Suppliers, served by the org endpoints.
    Supplier,
}

impl EntityKind {
    /// Lower-case name used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Offer => "offer",
            Self::Org => "org",
            Self::Supplier => "supplier",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! schema_ids {
    ($($(#[$meta:meta])* $variant:ident => $wire:literal,)+) => {
        /// Response schema version, identified on the wire by a stable string.
        ///
        /// Parsing an unknown string fails with [`GraphError::UnknownSchema`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum SchemaId {
            $($(#[$meta])* $variant,)+
        }

        impl SchemaId {
            /// Every schema version, in wire order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Wire string of this schema version.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for SchemaId {
            type Err = GraphError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(GraphError::UnknownSchema(other.to_owned())),
                }
            }
        }
    };
}

schema_ids! {
    /// Untransformed storage records.
    Internal => "internal",
    /// First public schema.
    Flagship => "flagship",
    /// Adds reference prices and termination type.
    FlagshipV2 => "flagship-v2",
    /// Flagship, revision 3.
    FlagshipV3 => "flagship-v3",
    /// Flagship, revision 4.
    FlagshipV4 => "flagship-v4",
    /// Adds moisture sensitivity level to parts.
    FlagshipV5 => "flagship-v5",
    /// Adds lifecycle status to parts.
    FlagshipV6 => "flagship-v6",
    /// Flagship, revision 7.
    FlagshipV7 => "flagship-v7",
    /// Parts with their alternates.
    FlagshipAltsV0 => "flagship-alts-v0",
    /// Cached parts with their offers.
    FlagshipCacheV0 => "flagship-cache-v0",
    /// Cached parts, revision 1.
    FlagshipCacheV1 => "flagship-cache-v1",
    /// Cached parts, revision 2.
    FlagshipCacheV2 => "flagship-cache-v2",
    /// Cached parts, revision 3.
    FlagshipCacheV3 => "flagship-cache-v3",
    /// Cached parts, revision 4.
    FlagshipCacheV4 => "flagship-cache-v4",
    /// Cached parts, revision 5.
    FlagshipCacheV5 => "flagship-cache-v5",
    /// Trade compliance and packaging data.
    Logistics => "logistics",
    /// Logistics, revision 2.
    LogisticsV2 => "logistics-v2",
    /// Logistics, revision 3.
    LogisticsV3 => "logistics-v3",
    /// Logistics, revision 4.
    LogisticsV4 => "logistics-v4",
    /// Parts with the offers consumed by price solving.
    PriceSolverV0 => "price-solver-v0",
    /// Price solver, revision 1.
    PriceSolverV1 => "price-solver-v1",
    /// Price solver, revision 2.
    PriceSolverV2 => "price-solver-v2",
    /// Price solver, revision 3.
    PriceSolverV3 => "price-solver-v3",
    /// Price solver, revision 4.
    PriceSolverV4 => "price-solver-v4",
    /// Price solver, revision 5.
    PriceSolverV5 => "price-solver-v5",
    /// Price solver, revision 6.
    PriceSolverV6 => "price-solver-v6",
    /// Price solver, revision 7.
    PriceSolverV7 => "price-solver-v7",
}

impl Default for SchemaId {
    fn default() -> Self {
        Self::Flagship
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SchemaId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SchemaId> for String {
    fn from(schema: SchemaId) -> Self {
        schema.as_str().to_owned()
    }
}

/// Decoder of one schema version, before error mapping.
pub type DecodeFn<T> = fn(Value) -> serde_json::Result<T>;

/// A decoded graph entity.
///
/// Implemented by the per-kind variant enums ([`Product`], [`Offer`], [`Org`]), whose
/// [`decoder`](Entity::decoder) is the static schema table of that kind.
pub trait Entity: Sized + Send + 'static {
    /// Entity ID, when the schema carries one.
    fn id(&self) -> Option<&str>;

    /// Former IDs that now resolve to this entity.
    fn deprecated_ids(&self) -> Vec<&str>;

    /// Returns the decoder registered for `(kind, schema)`, if any.
    fn decoder(kind: EntityKind, schema: SchemaId) -> Option<DecodeFn<Self>>;
}

/// Decoder resolved for one `(kind, schema)` pair.
///
/// Resolving happens before any request is sent, so an unsupported pair never
/// costs a network call.
pub struct SchemaDecoder<T> {
    kind: EntityKind,
    schema: SchemaId,
    decode: DecodeFn<T>,
}

impl<T> Clone for SchemaDecoder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SchemaDecoder<T> {}

impl<T> fmt::Debug for SchemaDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDecoder")
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl<T: Entity> SchemaDecoder<T> {
    /// Looks up the decoder of `(kind, schema)`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnsupportedSchema`] if no decoder is registered for the pair.
    pub fn lookup(kind: EntityKind, schema: SchemaId) -> Result<Self> {
        T::decoder(kind, schema).map(|decode| Self { kind, schema, decode }).ok_or_else(|| {
            GraphError::UnsupportedSchema { kind, schema: schema.as_str().to_owned() }
        })
    }

    /// Entity kind this decoder was resolved for.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Schema version this decoder was resolved for.
    #[must_use]
    pub const fn schema(&self) -> SchemaId {
        self.schema
    }

    /// Decodes one raw record.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Decode`] if the record does not match the schema shape.
    pub fn decode(&self, record: Value) -> Result<T> {
        (self.decode)(record).map_err(|e| GraphError::Decode {
            kind: self.kind,
            schema: self.schema.as_str().to_owned(),
            message: e.to_string(),
        })
    }
}

/// Reads the `id` of a raw record.
pub(crate) fn raw_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Reads the `deprecated_ids` of a raw record.
pub(crate) fn raw_deprecated_ids(record: &Value) -> Vec<&str> {
    record
        .get("deprecated_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
