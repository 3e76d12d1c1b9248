//! Parsers for the comma-list query options: `$select`, `$orderby`,
//! `$expand`. Each name is whitelist-checked against the resource field map
//! before it can reach SQL text.

use crate::error::{ApiError, ApiResult};
use crate::resource::{Expansion, Resource};

/// `$select` -> projected backend columns, in map-declaration order when the
/// option is absent or empty.
pub fn parse_select(raw: Option<&str>, resource: &Resource) -> ApiResult<Vec<&'static str>> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(resource.all_columns()),
    };

    let mut columns = Vec::new();
    for entry in raw.split(',') {
        let name = entry.trim();
        let column = resource
            .column(name)
            .ok_or_else(|| ApiError::InvalidSelect(name.to_string()))?;
        columns.push(column);
    }
    Ok(columns)
}

/// `$orderby` -> an ORDER BY body (`COL ASC, COL2 DESC`), or None when the
/// option is absent.
pub fn parse_orderby(raw: Option<&str>, resource: &Resource) -> ApiResult<Option<String>> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(None),
    };

    let mut terms = Vec::new();
    for entry in raw.split(',') {
        let mut parts = entry.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| ApiError::InvalidOrderBy(entry.trim().to_string()))?;
        let column = resource
            .column(name)
            .ok_or_else(|| ApiError::InvalidOrderBy(name.to_string()))?;

        let direction = match parts.next() {
            None => "ASC",
            Some(d) if d.eq_ignore_ascii_case("asc") => "ASC",
            Some(d) if d.eq_ignore_ascii_case("desc") => "DESC",
            Some(d) => return Err(ApiError::InvalidOrderBy(d.to_string())),
        };
        if parts.next().is_some() {
            return Err(ApiError::InvalidOrderBy(entry.trim().to_string()));
        }

        terms.push(format!("{} {}", column, direction));
    }
    Ok(Some(terms.join(", ")))
}

/// `$expand` -> the requested navigation definitions. Unknown names fail,
/// naming what is allowed.
pub fn parse_expand(raw: Option<&str>, resource: &Resource) -> ApiResult<Vec<&'static Expansion>> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(Vec::new()),
    };

    let mut expansions = Vec::new();
    for entry in raw.split(',') {
        let name = entry.trim();
        let expansion = resource.expansion(name).ok_or_else(|| {
            ApiError::InvalidExpand(name.to_string(), resource.allowed_expansions())
        })?;
        expansions.push(expansion);
    }
    Ok(expansions)
}
