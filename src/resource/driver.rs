//! Per-entity-set orchestration: runs the data and count queries, reshapes
//! rows to RESO names, satisfies `$expand` with one batched lookup per
//! navigation, and assembles the OData envelope.

use crate::db::{Gateway, Params, Row, SqlValue};
use crate::error::{ApiError, ApiResult};
use crate::odata::{build_query, ODataParams, QueryInput};
use crate::resource::{property, resource_by_name, Expansion, ListingKeyCache, Resource};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Serialize)]
pub struct CollectionEnvelope {
    #[serde(rename = "@odata.context")]
    pub context: String,
    #[serde(rename = "@odata.count", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(rename = "@odata.nextLink", skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
    pub value: Vec<Value>,
}

pub async fn list(
    gateway: &dyn Gateway,
    keys: &ListingKeyCache,
    resource: &'static Resource,
    query: &ODataParams,
    service_root: &str,
) -> ApiResult<CollectionEnvelope> {
    let expansions = crate::odata::clauses::parse_expand(query.expand.as_deref(), resource)?;

    let plan = build_query(QueryInput {
        resource,
        query,
        key_value: None,
        base_url: Some(format!("{}/{}", service_root, resource.name)),
    })?;

    // data and count observe the same WHERE and run concurrently
    let data_fut = gateway.query(&plan.data_sql, &plan.params);
    let (rows, total) = match &plan.count_sql {
        Some(count_sql) => {
            let count_fut = gateway.query(count_sql, &plan.params);
            let (rows, count_rows) = tokio::try_join!(data_fut, count_fut)?;
            let total = count_rows
                .first()
                .and_then(|r| r.get("total"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            (rows, Some(total))
        }
        None => (data_fut.await?, None),
    };

    let mut items: Vec<Row> = rows.into_iter().map(|r| resource.reshape(r)).collect();
    if resource.name == "Property" {
        for item in &mut items {
            property::transform_row(item, keys);
        }
    }

    for expansion in &expansions {
        attach_expansion(gateway, expansion, &mut items).await?;
    }

    let next_link = match (total, &plan.next_link) {
        (Some(total), Some(builder)) => builder.build(total),
        _ => None,
    };

    Ok(CollectionEnvelope {
        context: format!("{}/$metadata#{}", service_root, resource.name),
        count: total,
        next_link,
        value: items.into_iter().map(Value::Object).collect(),
    })
}

pub async fn get(
    gateway: &dyn Gateway,
    keys: &ListingKeyCache,
    resource: &'static Resource,
    raw_key: &str,
    query: &ODataParams,
    service_root: &str,
) -> ApiResult<Value> {
    let expansions = crate::odata::clauses::parse_expand(query.expand.as_deref(), resource)?;

    let (key_text, quoted) = strip_quotes(raw_key);
    let not_found = || ApiError::NotFound {
        set: resource.name.to_string(),
        key: key_text.to_string(),
    };

    let key_value = if resource.name == "Property" {
        if !quoted && key_text.chars().all(|c| c.is_ascii_digit()) && !key_text.is_empty() {
            // encoded display form: resolve through the side map, never the DB
            let backend = keys.resolve(key_text).ok_or_else(not_found)?;
            SqlValue::Str(backend)
        } else {
            // quoted (or non-numeric) keys address the backend id directly
            SqlValue::Str(key_text.to_string())
        }
    } else {
        match key_text.parse::<i64>() {
            Ok(n) => SqlValue::Int(n),
            Err(_) => SqlValue::Str(key_text.to_string()),
        }
    };

    let plan = build_query(QueryInput {
        resource,
        query,
        key_value: Some(key_value),
        base_url: None,
    })?;

    let rows = gateway.query(&plan.data_sql, &plan.params).await?;
    let row = rows.into_iter().next().ok_or_else(not_found)?;

    let mut item = resource.reshape(row);
    if resource.name == "Property" {
        property::transform_row(&mut item, keys);
    }

    if !expansions.is_empty() {
        let mut parents = vec![item];
        for expansion in &expansions {
            attach_expansion(gateway, expansion, &mut parents).await?;
        }
        item = parents.pop().unwrap();
    }

    let mut entity = Row::new();
    entity.insert(
        "@odata.context".to_string(),
        Value::String(format!(
            "{}/$metadata#{}/$entity",
            service_root, resource.name
        )),
    );
    entity.extend(item);
    Ok(Value::Object(entity))
}

/// One batched SELECT over the de-duplicated non-null foreign keys; resolved
/// rows attach to their parents under the navigation name, misses stay
/// unattached.
async fn attach_expansion(
    gateway: &dyn Gateway,
    expansion: &Expansion,
    parents: &mut [Row],
) -> ApiResult<()> {
    let target = resource_by_name(expansion.target).ok_or_else(|| {
        ApiError::InternalError(format!("unknown expansion target {}", expansion.target))
    })?;

    let mut seen = HashSet::new();
    let mut fks = Vec::new();
    for parent in parents.iter() {
        if let Some(value) = parent.get(expansion.source_field) {
            if !value.is_null() && seen.insert(value.to_string()) {
                fks.push(value.clone());
            }
        }
    }
    if fks.is_empty() {
        return Ok(());
    }

    let params: Params = fks
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("{}{}", expansion.param_prefix, i), json_to_sql(v)))
        .collect();
    let markers = params
        .iter()
        .map(|(name, _)| format!("@{}", name))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        target.all_columns().join(", "),
        target.table,
        target.key_column(),
        markers
    );
    let rows = gateway.query(&sql, &params).await?;

    let mut by_key: HashMap<String, Value> = HashMap::new();
    for row in rows {
        let shaped = target.reshape(row);
        if let Some(key) = shaped.get(target.key_field) {
            by_key.insert(key.to_string(), Value::Object(shaped.clone()));
        }
    }

    for parent in parents.iter_mut() {
        let resolved = parent
            .get(expansion.source_field)
            .and_then(|fk| by_key.get(&fk.to_string()))
            .cloned();
        if let Some(related) = resolved {
            parent.insert(expansion.name.to_string(), related);
        }
    }

    Ok(())
}

fn strip_quotes(raw: &str) -> (&str, bool) {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        (&raw[1..raw.len() - 1], true)
    } else {
        (raw, false)
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Int(i)
            } else {
                SqlValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => SqlValue::Str(s.clone()),
        _ => SqlValue::Null,
    }
}
