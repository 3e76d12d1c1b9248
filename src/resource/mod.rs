//! Entity-set definitions: RESO field maps over the backend schema, plus
//! row reshaping from backend column names to the exposed names.

pub mod driver;
pub mod key_codec;
pub mod media;
pub mod member;
pub mod office;
pub mod property;

pub use driver::CollectionEnvelope;
pub use member::MEMBER;
pub use office::OFFICE;
pub use property::{ListingKeyCache, PROPERTY};

use crate::db::Row;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdmType {
    String,
    Int32,
    Decimal,
    Date,
    DateTimeOffset,
    MediaCollection,
}

impl EdmType {
    pub fn as_edm(&self) -> &'static str {
        match self {
            EdmType::String => "Edm.String",
            EdmType::Int32 => "Edm.Int32",
            EdmType::Decimal => "Edm.Decimal",
            EdmType::Date => "Edm.Date",
            EdmType::DateTimeOffset => "Edm.DateTimeOffset",
            EdmType::MediaCollection => "Collection(org.reso.metadata.Media)",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Exposed RESO name.
    pub name: &'static str,
    /// Backend column it maps to.
    pub column: &'static str,
    pub ty: EdmType,
}

/// A navigation property satisfied by a batched lookup on a second table.
#[derive(Debug, Clone, Copy)]
pub struct Expansion {
    /// Navigation name attached to the parent row, e.g. `ListAgent`.
    pub name: &'static str,
    /// RESO field on the parent carrying the foreign key.
    pub source_field: &'static str,
    /// Target entity set name.
    pub target: &'static str,
    /// Parameter name prefix for the IN-list, e.g. `agent` -> `@agent0`.
    pub param_prefix: &'static str,
}

pub struct Resource {
    pub name: &'static str,
    pub table: &'static str,
    /// RESO name of the primary key; must appear in `fields`.
    pub key_field: &'static str,
    pub fields: &'static [FieldDef],
    pub expansions: &'static [Expansion],
    /// Fixed predicate ANDed into every query against this resource.
    pub base_where: Option<&'static str>,
    forward: HashMap<&'static str, &'static FieldDef>,
    reverse: HashMap<&'static str, &'static FieldDef>,
}

impl Resource {
    /// Derives the forward and reverse maps from one declaration so the two
    /// can never drift. Panics at startup on a non-bijective declaration.
    pub fn new(
        name: &'static str,
        table: &'static str,
        key_field: &'static str,
        fields: &'static [FieldDef],
        expansions: &'static [Expansion],
        base_where: Option<&'static str>,
    ) -> Self {
        let mut forward = HashMap::with_capacity(fields.len());
        let mut reverse = HashMap::with_capacity(fields.len());
        for field in fields {
            if forward.insert(field.name, field).is_some() {
                panic!("{}: duplicate field name {}", name, field.name);
            }
            if reverse.insert(field.column, field).is_some() {
                panic!("{}: duplicate column {}", name, field.column);
            }
        }
        assert!(
            forward.contains_key(key_field),
            "{}: key field {} missing from field map",
            name,
            key_field
        );

        Self {
            name,
            table,
            key_field,
            fields,
            expansions,
            base_where,
            forward,
            reverse,
        }
    }

    /// Backend column for an exposed name.
    pub fn column(&self, reso_name: &str) -> Option<&'static str> {
        self.forward.get(reso_name).map(|f| f.column)
    }

    /// Exposed name for a backend column.
    pub fn reso_name(&self, column: &str) -> Option<&'static str> {
        self.reverse.get(column).map(|f| f.name)
    }

    pub fn key_column(&self) -> &'static str {
        self.forward[self.key_field].column
    }

    /// All backend columns in field-map declaration order.
    pub fn all_columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }

    pub fn allowed_expansions(&self) -> String {
        self.expansions
            .iter()
            .map(|e| e.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn expansion(&self, name: &str) -> Option<&'static Expansion> {
        self.expansions.iter().find(|e| e.name == name)
    }

    /// Rename backend columns to RESO names; columns outside the reverse map
    /// are dropped.
    pub fn reshape(&self, row: Row) -> Row {
        let mut shaped = Row::new();
        for (column, value) in row {
            if let Some(name) = self.reso_name(&column) {
                shaped.insert(name.to_string(), value);
            }
        }
        shaped
    }
}

/// Entity-set lookup by exact name.
pub fn resource_by_name(name: &str) -> Option<&'static Resource> {
    match name {
        "Property" => Some(&*PROPERTY),
        "Member" => Some(&*MEMBER),
        "Office" => Some(&*OFFICE),
        _ => None,
    }
}

pub fn all_resources() -> [&'static Resource; 3] {
    [&*PROPERTY, &*MEMBER, &*OFFICE]
}
