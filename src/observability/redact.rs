// SPDX-License-Identifier: Apache-2.0

//! Keeping argument values out of logs.
//!
//! Query events carry a snapshot of the argument bag with sensitive keys
//! masked. Debug diagnostics go further and only print the bag's shape.

use std::fmt::{self, Debug, Formatter};

use serde_json::Value;

use crate::engine::types::{Document, QueryArgs};

const MASK: &str = "***";

/// Serializes `args` to JSON, masking every key accepted by `is_sensitive` at any depth
pub fn redact_args(args: &QueryArgs, is_sensitive: impl Fn(&str) -> bool) -> Value {
    let mut value = serde_json::to_value(args).unwrap_or(Value::Null);
    mask(&mut value, &is_sensitive);
    value
}

fn mask(value: &mut Value, is_sensitive: &impl Fn(&str) -> bool) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if is_sensitive(key) {
                    *inner = Value::String(MASK.to_string());
                } else {
                    mask(inner, is_sensitive);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                mask(item, is_sensitive);
            }
        }
        _ => {}
    }
}

/// Debug view of an argument bag listing keys only, never values
pub struct ArgShape<'a>(pub &'a QueryArgs);

impl Debug for ArgShape<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fn keys(doc: &Option<Document>) -> Option<Vec<&str>> {
            doc.as_ref().map(|d| d.keys().map(String::as_str).collect())
        }

        let mut out = f.debug_struct("QueryArgs");
        if let Some(filter) = keys(&self.0.filter) {
            out.field("filter", &filter);
        }
        if let Some(payload) = keys(&self.0.payload) {
            out.field("payload", &payload);
        }
        if let Some(raw) = &self.0.raw {
            out.field("raw_len", &raw.len());
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_sensitive_keys_are_masked() {
        let args = QueryArgs::from_value(json!({
            "where": { "tenantId": "t1", "OR": [{ "token": "abc" }] },
            "data": { "name": "Ada", "password": "hunter2" }
        }));

        let snapshot = redact_args(&args, |key| key == "password" || key == "token");
        assert_eq!(snapshot["payload"]["password"], json!("***"));
        assert_eq!(snapshot["payload"]["name"], json!("Ada"));
        assert_eq!(snapshot["filter"]["OR"][0]["token"], json!("***"));
        assert_eq!(snapshot["filter"]["tenantId"], json!("t1"));
    }

    #[test]
    fn test_shape_hides_values() {
        let args = QueryArgs::from_value(json!({
            "where": { "tenantId": "secret-tenant" },
            "data": { "email": "ada@example.com" }
        }));

        let printed = format!("{:?}", ArgShape(&args));
        assert!(printed.contains("tenantId"));
        assert!(printed.contains("email"));
        assert!(!printed.contains("secret-tenant"));
        assert!(!printed.contains("ada@example.com"));
    }
}
