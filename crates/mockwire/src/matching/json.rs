//! JSON body comparison by field path.
//!
//! Field paths use dotted/bracket notation (`order.items[0].sku`); a path that
//! already starts with `$` is taken as a full JSONPath expression.

use super::error::{BodyKind, BodyOrigin, MatchError};
use serde_json::Value;
use serde_json_path::JsonPath;

/// A field path compiled to JSONPath once per lookup.
#[derive(Debug)]
pub struct JsonField {
    raw: String,
    path: JsonPath,
}

impl JsonField {
    pub fn compile(raw: &str) -> Result<Self, MatchError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MatchError::field_path(raw, "empty path"));
        }
        let path = JsonPath::parse(&to_json_path(trimmed))
            .map_err(|e| MatchError::field_path(raw, e))?;
        Ok(Self {
            raw: raw.to_string(),
            path,
        })
    }

    /// The node selected by this path, `None` when absent.
    ///
    /// Paths selecting several nodes are rejected rather than compared.
    pub fn select<'a>(&self, value: &'a Value) -> Result<Option<&'a Value>, MatchError> {
        self.path
            .query(value)
            .at_most_one()
            .map_err(|_| MatchError::field_path(&self.raw, "selects more than one node"))
    }
}

/// Rewrite a dotted path as JSONPath using bracket member names, so keys that
/// are not valid shorthand names (`x-request-id`) still resolve.
fn to_json_path(path: &str) -> String {
    if path.starts_with('$') {
        return path.to_string();
    }
    let mut out = String::from("$");
    let mut name = String::new();
    let mut in_brackets = false;
    for c in path.chars() {
        match c {
            '[' if !in_brackets => {
                push_member(&mut out, &mut name);
                in_brackets = true;
                out.push('[');
            }
            ']' if in_brackets => {
                in_brackets = false;
                out.push(']');
            }
            '.' if !in_brackets => push_member(&mut out, &mut name),
            _ if in_brackets => out.push(c),
            _ => name.push(c),
        }
    }
    push_member(&mut out, &mut name);
    out
}

fn push_member(out: &mut String, name: &mut String) {
    if name.is_empty() {
        return;
    }
    out.push_str("['");
    for c in name.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("']");
    name.clear();
}

pub fn parse_body(body: &str, origin: BodyOrigin) -> Result<Value, MatchError> {
    serde_json::from_str(body).map_err(|e| MatchError::parse(BodyKind::Json, origin, e))
}

/// Whether every field selects a present and deep-equal node on both sides.
pub fn fields_equal(
    incoming: &Value,
    recorded: &Value,
    fields: &[JsonField],
) -> Result<bool, MatchError> {
    for field in fields {
        let (Some(left), Some(right)) = (field.select(incoming)?, field.select(recorded)?) else {
            return Ok(false);
        };
        if left != right {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_path() {
        assert_eq!(to_json_path("id"), "$['id']");
        assert_eq!(to_json_path("a.b[0].c"), "$['a']['b'][0]['c']");
        assert_eq!(to_json_path("[1].x-y"), "$[1]['x-y']");
        assert_eq!(to_json_path("$.a.b"), "$.a.b");
        assert_eq!(to_json_path("o'k"), r"$['o\'k']");
    }

    #[test]
    fn test_select_nested_values() {
        let value = json!({"order": {"items": [{"sku": "A1"}, {"sku": "B2"}]}, "x-id": 7});
        let sku = JsonField::compile("order.items[1].sku").unwrap();
        assert_eq!(sku.select(&value).unwrap(), Some(&json!("B2")));

        let hyphen = JsonField::compile("x-id").unwrap();
        assert_eq!(hyphen.select(&value).unwrap(), Some(&json!(7)));

        let missing = JsonField::compile("order.total").unwrap();
        assert_eq!(missing.select(&value).unwrap(), None);
    }

    #[test]
    fn test_multi_node_selection_is_rejected() {
        let value = json!({"items": [{"sku": "A1"}, {"sku": "B2"}]});
        let field = JsonField::compile("$.items[*].sku").unwrap();
        assert!(matches!(
            field.select(&value),
            Err(MatchError::FieldPath { .. })
        ));
    }

    #[test]
    fn test_invalid_paths() {
        assert!(JsonField::compile("  ").is_err());
        assert!(JsonField::compile("$..[").is_err());
    }

    #[test]
    fn test_fields_equal_deep_structures() {
        let fields = vec![JsonField::compile("customer").unwrap()];
        let a = json!({"customer": {"id": 1, "tags": ["x", "y"]}, "ts": 1});
        let b = json!({"customer": {"tags": ["x", "y"], "id": 1}, "ts": 2});
        let c = json!({"customer": {"id": 1, "tags": ["y", "x"]}});
        assert!(fields_equal(&a, &b, &fields).unwrap());
        assert!(!fields_equal(&a, &c, &fields).unwrap());
    }

    #[test]
    fn test_absent_field_is_a_mismatch() {
        let fields = vec![JsonField::compile("id").unwrap()];
        let absent = json!({});
        assert!(!fields_equal(&absent, &absent, &fields).unwrap());
        // explicit null is present
        let null = json!({"id": null});
        assert!(fields_equal(&null, &null, &fields).unwrap());
    }

    #[test]
    fn test_parse_body_error_carries_origin() {
        let err = parse_body("{not json", BodyOrigin::Recorded).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Parse {
                kind: BodyKind::Json,
                origin: BodyOrigin::Recorded,
                ..
            }
        ));
    }
}
