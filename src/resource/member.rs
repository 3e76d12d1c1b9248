//! The `Member` entity set, backed by the agent table.

use super::{EdmType, FieldDef, Resource};
use once_cell::sync::Lazy;

pub const TABLE: &str = "AGENT";

static FIELDS: &[FieldDef] = &[
    FieldDef { name: "MemberKey", column: "AGENTKEY", ty: EdmType::Int32 },
    FieldDef { name: "MemberMlsId", column: "AGENTID", ty: EdmType::String },
    FieldDef { name: "MemberFirstName", column: "GIVENNAME", ty: EdmType::String },
    FieldDef { name: "MemberLastName", column: "SURNAME", ty: EdmType::String },
    FieldDef { name: "MemberFullName", column: "FULLNAME", ty: EdmType::String },
    FieldDef { name: "MemberEmail", column: "EMAIL", ty: EdmType::String },
    FieldDef { name: "MemberPreferredPhone", column: "PHONE", ty: EdmType::String },
    FieldDef { name: "MemberStateLicense", column: "LICENSENUM", ty: EdmType::String },
    FieldDef { name: "MemberStatus", column: "STATUS", ty: EdmType::String },
    FieldDef { name: "MemberType", column: "AGENTTYPE", ty: EdmType::String },
    FieldDef { name: "OfficeKey", column: "OFFICEKEY", ty: EdmType::Int32 },
    FieldDef { name: "ModificationTimestamp", column: "MODIFIED", ty: EdmType::DateTimeOffset },
];

pub static MEMBER: Lazy<Resource> =
    Lazy::new(|| Resource::new("Member", TABLE, "MemberKey", FIELDS, &[], None));
