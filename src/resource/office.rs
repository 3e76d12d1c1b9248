//! The `Office` entity set, backed by the office table.

use super::{EdmType, FieldDef, Resource};
use once_cell::sync::Lazy;

pub const TABLE: &str = "OFFICE";

static FIELDS: &[FieldDef] = &[
    FieldDef { name: "OfficeKey", column: "OFFICEKEY", ty: EdmType::Int32 },
    FieldDef { name: "OfficeMlsId", column: "OFFICEID", ty: EdmType::String },
    FieldDef { name: "OfficeName", column: "OFFICENAME", ty: EdmType::String },
    FieldDef { name: "OfficePhone", column: "PHONE", ty: EdmType::String },
    FieldDef { name: "OfficeEmail", column: "EMAIL", ty: EdmType::String },
    FieldDef { name: "OfficeAddress1", column: "ADDRESS1", ty: EdmType::String },
    FieldDef { name: "OfficeAddress2", column: "ADDRESS2", ty: EdmType::String },
    FieldDef { name: "OfficeCity", column: "CITY", ty: EdmType::String },
    FieldDef { name: "OfficeStateOrProvince", column: "STATE", ty: EdmType::String },
    FieldDef { name: "OfficePostalCode", column: "ZIPCODE", ty: EdmType::String },
    FieldDef { name: "OfficeStatus", column: "STATUS", ty: EdmType::String },
    FieldDef { name: "ModificationTimestamp", column: "MODIFIED", ty: EdmType::DateTimeOffset },
];

pub static OFFICE: Lazy<Resource> =
    Lazy::new(|| Resource::new("Office", TABLE, "OfficeKey", FIELDS, &[], None));
