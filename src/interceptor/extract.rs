// SPDX-License-Identifier: Apache-2.0

//! Tenant id extraction from argument bags.
//!
//! Search order: filter, write payload, then one level of nested filter
//! objects (including objects inside `AND`/`OR` style arrays at that level).
//! Deeper nesting is not searched.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::types::{Document, QueryArgs};

/// Where a tenant id was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantSource {
    Filter,
    Payload,
    NestedFilter,
    RawSql,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTenant {
    pub tenant_id: String,
    pub source: TenantSource,
}

static RAW_TENANT_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn raw_tenant_pattern() -> Option<&'static Regex> {
    RAW_TENANT_PATTERN
        .get_or_init(|| Regex::new(r#"(?i)\b"?tenant_?id"?\s*=\s*'([^']+)'"#).ok())
        .as_ref()
}

pub fn extract_tenant(args: &QueryArgs, field: &str) -> Option<ExtractedTenant> {
    let found = |tenant_id: String, source| ExtractedTenant { tenant_id, source };

    if let Some(filter) = &args.filter {
        if let Some(id) = field_value(filter, field) {
            return Some(found(id, TenantSource::Filter));
        }
    }

    if let Some(payload) = &args.payload {
        if let Some(id) = field_value(payload, field) {
            return Some(found(id, TenantSource::Payload));
        }
    }

    if let Some(filter) = &args.filter {
        if let Some(id) = nested_field_value(filter, field) {
            return Some(found(id, TenantSource::NestedFilter));
        }
    }

    if let Some(sql) = &args.raw {
        if let Some(id) = raw_sql_tenant(sql) {
            return Some(found(id, TenantSource::RawSql));
        }
    }

    None
}

fn field_value(doc: &Document, field: &str) -> Option<String> {
    doc.get(field).and_then(tenant_value)
}

fn nested_field_value(filter: &Document, field: &str) -> Option<String> {
    for (key, value) in filter {
        if key == field {
            continue;
        }
        match value {
            Value::Object(inner) => {
                if let Some(id) = field_value(inner, field) {
                    return Some(id);
                }
            }
            Value::Array(items) => {
                let hit = items
                    .iter()
                    .filter_map(Value::as_object)
                    .find_map(|inner| field_value(inner, field));
                if hit.is_some() {
                    return hit;
                }
            }
            _ => {}
        }
    }
    None
}

/// Accepts `"t1"`, `42` and `{ "equals": "t1" }`
fn tenant_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => match map.get("equals") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn raw_sql_tenant(sql: &str) -> Option<String> {
    raw_tenant_pattern()?
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> QueryArgs {
        QueryArgs::from_value(value)
    }

    #[test]
    fn filter_wins_over_payload() {
        let extracted = extract_tenant(
            &args(json!({ "where": { "tenantId": "t1" }, "data": { "tenantId": "t2" } })),
            "tenantId",
        )
        .unwrap();
        assert_eq!(extracted.tenant_id, "t1");
        assert_eq!(extracted.source, TenantSource::Filter);
    }

    #[test]
    fn payload_is_searched() {
        let extracted =
            extract_tenant(&args(json!({ "data": { "tenantId": "t2" } })), "tenantId").unwrap();
        assert_eq!(extracted.tenant_id, "t2");
        assert_eq!(extracted.source, TenantSource::Payload);
    }

    #[test]
    fn equals_operator_is_unwrapped() {
        let extracted = extract_tenant(
            &args(json!({ "where": { "tenantId": { "equals": "t3" } } })),
            "tenantId",
        )
        .unwrap();
        assert_eq!(extracted.tenant_id, "t3");
    }

    #[test]
    fn one_level_of_nesting_is_searched() {
        let nested_object = extract_tenant(
            &args(json!({ "where": { "team": { "tenantId": "t4" } } })),
            "tenantId",
        )
        .unwrap();
        assert_eq!(nested_object.tenant_id, "t4");
        assert_eq!(nested_object.source, TenantSource::NestedFilter);

        let combinator = extract_tenant(
            &args(json!({ "where": { "AND": [{ "name": "x" }, { "tenantId": "t5" }] } })),
            "tenantId",
        )
        .unwrap();
        assert_eq!(combinator.tenant_id, "t5");
    }

    #[test]
    fn deeper_nesting_is_not_searched() {
        let extracted = extract_tenant(
            &args(json!({ "where": { "team": { "club": { "tenantId": "t6" } } } })),
            "tenantId",
        );
        assert!(extracted.is_none());
    }

    #[test]
    fn empty_and_null_values_do_not_count() {
        assert!(extract_tenant(&args(json!({ "where": { "tenantId": "" } })), "tenantId").is_none());
        assert!(
            extract_tenant(&args(json!({ "where": { "tenantId": null } })), "tenantId").is_none()
        );
        assert!(extract_tenant(&args(json!({ "where": {} })), "tenantId").is_none());
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let extracted =
            extract_tenant(&args(json!({ "where": { "tenantId": 17 } })), "tenantId").unwrap();
        assert_eq!(extracted.tenant_id, "17");
    }

    #[test]
    fn raw_sql_predicate_is_recognized() {
        let extracted = extract_tenant(
            &QueryArgs::raw(r#"SELECT * FROM "Player" WHERE "tenantId" = 'club-9'"#),
            "tenantId",
        )
        .unwrap();
        assert_eq!(extracted.tenant_id, "club-9");
        assert_eq!(extracted.source, TenantSource::RawSql);

        let snake = extract_tenant(
            &QueryArgs::raw("delete from players where TENANT_ID = 'abc'"),
            "tenantId",
        )
        .unwrap();
        assert_eq!(snake.tenant_id, "abc");

        assert!(extract_tenant(&QueryArgs::raw("SELECT 1"), "tenantId").is_none());
    }
}
