//! OData v4 query option handling: lexing and compiling `$filter`, the
//! simple clause parsers, and the SQL plan builder.

pub mod builder;
pub mod clauses;
pub mod filter;
pub mod lexer;

pub use builder::{build_query, NextLink, QueryInput, QueryPlan};
pub use filter::{compile_filter, WhereFragment};

use serde::Deserialize;

/// Raw OData system query options, straight off the query string.
///
/// `$top`/`$skip` stay strings here so malformed numbers degrade to the
/// defaults instead of rejecting the request at extraction time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ODataParams {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    #[serde(rename = "$select")]
    pub select: Option<String>,
    #[serde(rename = "$orderby")]
    pub orderby: Option<String>,
    #[serde(rename = "$top")]
    pub top: Option<String>,
    #[serde(rename = "$skip")]
    pub skip: Option<String>,
    #[serde(rename = "$count")]
    pub count: Option<String>,
    #[serde(rename = "$expand")]
    pub expand: Option<String>,
}

impl ODataParams {
    pub fn count_requested(&self) -> bool {
        self.count.as_deref() == Some("true")
    }
}
