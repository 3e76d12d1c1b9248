//! The `Property` entity set, backed by the MLS common view.

use super::key_codec;
use super::media;
use super::{EdmType, Expansion, FieldDef, Resource};
use crate::db::Row;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;

pub const TABLE: &str = "VW_MLS_COMMON";

/// RESO name -> backend column. Declaration order drives the default
/// `$select` projection and the default `ORDER BY`.
static FIELDS: &[FieldDef] = &[
    FieldDef { name: "ListingKey", column: "MLSNUMBER", ty: EdmType::String },
    FieldDef { name: "StandardStatus", column: "IDCSTATUS", ty: EdmType::String },
    FieldDef { name: "PropertyType", column: "IDCPROPTYPE", ty: EdmType::String },
    FieldDef { name: "PropertySubType", column: "IDCPROPSUBTYPE", ty: EdmType::String },
    FieldDef { name: "ListPrice", column: "IDCLISTPRICE", ty: EdmType::Decimal },
    FieldDef { name: "OriginalListPrice", column: "IDCORIGPRICE", ty: EdmType::Decimal },
    FieldDef { name: "ClosePrice", column: "IDCSOLDPRICE", ty: EdmType::Decimal },
    FieldDef { name: "CloseDate", column: "SOLDDATE", ty: EdmType::Date },
    FieldDef { name: "ListingContractDate", column: "LISTDATE", ty: EdmType::Date },
    FieldDef { name: "DaysOnMarket", column: "DOM", ty: EdmType::Int32 },
    FieldDef { name: "StreetNumber", column: "STREETNUM", ty: EdmType::String },
    FieldDef { name: "StreetName", column: "STREETNAME", ty: EdmType::String },
    FieldDef { name: "UnparsedAddress", column: "ADDRESS", ty: EdmType::String },
    FieldDef { name: "City", column: "CITY", ty: EdmType::String },
    FieldDef { name: "StateOrProvince", column: "STATE", ty: EdmType::String },
    FieldDef { name: "PostalCode", column: "ZIPCODE", ty: EdmType::String },
    FieldDef { name: "Latitude", column: "LATITUDE", ty: EdmType::Decimal },
    FieldDef { name: "Longitude", column: "LONGITUDE", ty: EdmType::Decimal },
    FieldDef { name: "BedroomsTotal", column: "BEDROOMS", ty: EdmType::Int32 },
    FieldDef { name: "BathroomsTotalInteger", column: "BATHSTOTAL", ty: EdmType::Int32 },
    FieldDef { name: "BathroomsFull", column: "BATHSFULL", ty: EdmType::Int32 },
    FieldDef { name: "BathroomsHalf", column: "BATHSHALF", ty: EdmType::Int32 },
    FieldDef { name: "LivingArea", column: "SQFT", ty: EdmType::Decimal },
    FieldDef { name: "LotSizeAcres", column: "ACRES", ty: EdmType::Decimal },
    FieldDef { name: "YearBuilt", column: "YEARBUILT", ty: EdmType::Int32 },
    FieldDef { name: "GarageSpaces", column: "GARAGES", ty: EdmType::Int32 },
    FieldDef { name: "PublicRemarks", column: "REMARKS", ty: EdmType::String },
    FieldDef { name: "ListAgentKey", column: "IDCLISTAGENTKEY", ty: EdmType::Int32 },
    FieldDef { name: "ListOfficeKey", column: "IDCLISTOFFICEKEY", ty: EdmType::Int32 },
    FieldDef { name: "PhotosCount", column: "PHOTOCOUNT", ty: EdmType::Int32 },
    FieldDef { name: "PhotosChangeTimestamp", column: "PHOTOMODIFIED", ty: EdmType::DateTimeOffset },
    FieldDef { name: "ModificationTimestamp", column: "MODIFIED", ty: EdmType::DateTimeOffset },
    FieldDef { name: "Media", column: "PHOTOXML", ty: EdmType::MediaCollection },
];

static EXPANSIONS: &[Expansion] = &[
    Expansion {
        name: "ListAgent",
        source_field: "ListAgentKey",
        target: "Member",
        param_prefix: "agent",
    },
    Expansion {
        name: "ListOffice",
        source_field: "ListOfficeKey",
        target: "Office",
        param_prefix: "office",
    },
];

pub static PROPERTY: Lazy<Resource> =
    Lazy::new(|| Resource::new("Property", TABLE, "ListingKey", FIELDS, EXPANSIONS, None));

/// Side map from the encoded 63-bit display key back to the backend
/// `MLSNUMBER`, populated whenever a Property row passes through reshape.
/// Lives for the process; a miss on lookup is a 404 before any query runs.
#[derive(Default)]
pub struct ListingKeyCache {
    map: DashMap<String, String>,
}

impl ListingKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, encoded: &str, backend: &str) {
        self.map.insert(encoded.to_string(), backend.to_string());
    }

    pub fn resolve(&self, encoded: &str) -> Option<String> {
        self.map.get(encoded).map(|v| v.clone())
    }
}

/// Property-specific row rewrites after reshape: the listing key becomes its
/// encoded display form and the photo blob becomes the `Media` collection.
pub fn transform_row(row: &mut Row, keys: &ListingKeyCache) {
    let backend_key = match row.get("ListingKey").and_then(Value::as_str) {
        Some(k) => k.to_string(),
        None => return,
    };

    let encoded = key_codec::encode(&backend_key);
    keys.record(&encoded, &backend_key);

    if let Some(slot) = row.get_mut("Media") {
        let xml = slot.as_str().unwrap_or_default().to_string();
        *slot = Value::Array(media::parse_media(&xml, &encoded));
    }

    row.insert("ListingKey".to_string(), Value::String(encoded));
}
