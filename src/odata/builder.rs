//! Query plan synthesis: combines the filter compiler and clause parsers
//! with pagination, base predicates and key lookup into the final
//! parameterized statements.

use crate::db::{Params, SqlValue};
use crate::error::ApiResult;
use crate::odata::clauses;
use crate::odata::filter::compile_filter;
use crate::odata::ODataParams;
use crate::resource::Resource;
use url::form_urlencoded;

const DEFAULT_TOP: i64 = 100;
const MAX_TOP: i64 = 1000;

pub struct QueryInput<'a> {
    pub resource: &'a Resource,
    pub query: &'a ODataParams,
    /// When set, wins over `$filter` and binds `<key column> = @keyValue`.
    pub key_value: Option<SqlValue>,
    /// Collection URL the next link is built from; None for entity fetches.
    pub base_url: Option<String>,
}

pub struct QueryPlan {
    pub data_sql: String,
    pub count_sql: Option<String>,
    pub params: Params,
    pub top: i64,
    pub skip: i64,
    pub next_link: Option<NextLink>,
}

/// Builds `@odata.nextLink` once the total row count is known.
pub struct NextLink {
    base_url: String,
    top: i64,
    skip: i64,
    carried: Vec<(&'static str, String)>,
}

impl NextLink {
    pub fn build(&self, total: i64) -> Option<String> {
        if self.skip + self.top >= total {
            return None;
        }

        let mut qs = form_urlencoded::Serializer::new(String::new());
        qs.append_pair("$top", &self.top.to_string());
        qs.append_pair("$skip", &(self.skip + self.top).to_string());
        for (name, value) in &self.carried {
            qs.append_pair(name, value);
        }
        Some(format!("{}?{}", self.base_url, qs.finish()))
    }
}

fn parse_non_negative(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default)
        .max(0)
}

pub fn build_query(input: QueryInput<'_>) -> ApiResult<QueryPlan> {
    let QueryInput {
        resource,
        query,
        key_value,
        base_url,
    } = input;

    let top = parse_non_negative(query.top.as_deref(), DEFAULT_TOP).clamp(1, MAX_TOP);
    let skip = parse_non_negative(query.skip.as_deref(), 0);
    let count = query.count_requested();

    let columns = clauses::parse_select(query.select.as_deref(), resource)?;

    let mut params = Params::new();
    let mut where_parts: Vec<String> = Vec::new();

    if let Some(base) = resource.base_where {
        where_parts.push(base.to_string());
    }

    if let Some(value) = key_value {
        // key lookup replaces any client filter
        where_parts.push(format!("{} = @keyValue", resource.key_column()));
        params.push(("keyValue".to_string(), value));
    } else if let Some(filter) = query.filter.as_deref() {
        if !filter.trim().is_empty() {
            let fragment = compile_filter(filter, resource)?;
            where_parts.push(fragment.sql);
            params.extend(fragment.params);
        }
    }

    let where_clause = match where_parts.len() {
        0 => String::new(),
        1 => format!(" WHERE {}", where_parts[0]),
        _ => format!(
            " WHERE {}",
            where_parts
                .iter()
                .map(|p| format!("({})", p))
                .collect::<Vec<_>>()
                .join(" AND ")
        ),
    };

    let order_by = clauses::parse_orderby(query.orderby.as_deref(), resource)?
        .unwrap_or_else(|| format!("{} ASC", resource.all_columns()[0]));

    let data_sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
        columns.join(", "),
        resource.table,
        where_clause,
        order_by,
        skip,
        top
    );

    let count_sql = count.then(|| {
        format!(
            "SELECT COUNT(*) AS total FROM {}{}",
            resource.table, where_clause
        )
    });

    let next_link = base_url.map(|base_url| {
        let mut carried = Vec::new();
        if let Some(v) = &query.select {
            carried.push(("$select", v.clone()));
        }
        if let Some(v) = &query.filter {
            carried.push(("$filter", v.clone()));
        }
        if let Some(v) = &query.orderby {
            carried.push(("$orderby", v.clone()));
        }
        if let Some(v) = &query.count {
            carried.push(("$count", v.clone()));
        }
        NextLink {
            base_url,
            top,
            skip,
            carried,
        }
    });

    Ok(QueryPlan {
        data_sql,
        count_sql,
        params,
        top,
        skip,
        next_link,
    })
}
