//! Resolution context - the `req` and `res` views for one call
//!
//! A context is built fresh for every resolution and dropped right after.
//! Lookups traverse by reference and never clone; the resolver clones the
//! final value once when inserting it into the output tree.

use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::error::{FormatError, Result};
use crate::placeholder::{Placeholder, Root};

/// Request and response views for a single resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    req: Value,
    res: Value,
}

impl Default for Context {
    /// Both views empty objects
    fn default() -> Self {
        Self::new(Value::Object(Map::new()), Value::Object(Map::new()))
    }
}

impl Context {
    pub fn new(req: Value, res: Value) -> Self {
        Self { req, res }
    }

    /// Build a context from a JSON object with optional `req` and `res` keys
    ///
    /// Missing views default to empty objects. Any other top-level key is
    /// rejected so typos surface early.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(FormatError::InvalidContext {
                    reason: format!("expected an object, got {}", value_type(&other)),
                });
            }
        };

        if let Some(key) = map.keys().find(|k| Root::from_selector(k).is_none()) {
            return Err(FormatError::InvalidContext {
                reason: format!("unexpected key '{}'", key),
            });
        }

        let req = map.remove("req").unwrap_or_else(|| Value::Object(Map::new()));
        let res = map.remove("res").unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Self::new(req, res))
    }

    /// The view selected by a root
    pub fn root(&self, root: Root) -> &Value {
        match root {
            Root::Req => &self.req,
            Root::Res => &self.res,
        }
    }

    pub fn req(&self) -> &Value {
        &self.req
    }

    pub fn res(&self) -> &Value {
        &self.res
    }

    /// Resolve a placeholder's path against this context
    ///
    /// Object segments are field names; on arrays a numeric segment is an
    /// index. A missing field or index is `PathNotFound`, and descending
    /// into a scalar (including null) is `InvalidTraversal`.
    pub fn lookup(&self, placeholder: &Placeholder<'_>) -> Result<&Value> {
        let mut current = self.root(placeholder.root);
        let mut traversed: SmallVec<[&str; 8]> = SmallVec::new();
        traversed.push(placeholder.root.as_str());

        for &segment in &placeholder.segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => array_index(segment).and_then(|i| items.get(i)),
                other => {
                    return Err(FormatError::InvalidTraversal {
                        segment: segment.to_string(),
                        value_type: value_type(other).to_string(),
                        full_path: placeholder.path.to_string(),
                    });
                }
            };

            match next {
                Some(v) => {
                    traversed.push(segment);
                    current = v;
                }
                None => {
                    return Err(FormatError::PathNotFound {
                        path: format!("{}.{}", traversed.join("."), segment),
                    });
                }
            }
        }

        Ok(current)
    }
}

/// Human-readable JSON type name for error messages
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Canonical decimal index: digits only, no sign, no leading zero
fn array_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::parse;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new(
            json!({"method": "GET", "headers": {"host": "example.com"}}),
            json!({
                "info": "ok",
                "user": {"name": "Ada", "tags": ["admin", "ops"]},
                "count": 3,
                "nothing": null
            }),
        )
    }

    #[test]
    fn lookup_req_field() {
        let ctx = ctx();
        let p = parse("<%= req.method %>").unwrap();
        assert_eq!(ctx.lookup(&p).unwrap(), &json!("GET"));
    }

    #[test]
    fn lookup_nested() {
        let ctx = ctx();
        let p = parse("<%= req.headers.host %>").unwrap();
        assert_eq!(ctx.lookup(&p).unwrap(), &json!("example.com"));
    }

    #[test]
    fn lookup_whole_view() {
        let ctx = ctx();
        let p = parse("<%= res.user %>").unwrap();
        assert_eq!(ctx.lookup(&p).unwrap(), &json!({"name": "Ada", "tags": ["admin", "ops"]}));
    }

    #[test]
    fn lookup_array_index() {
        let ctx = ctx();
        let p = parse("<%= res.user.tags.1 %>").unwrap();
        assert_eq!(ctx.lookup(&p).unwrap(), &json!("ops"));
    }

    #[test]
    fn lookup_null_leaf_is_value() {
        let ctx = ctx();
        let p = parse("<%= res.nothing %>").unwrap();
        assert_eq!(ctx.lookup(&p).unwrap(), &Value::Null);
    }

    #[test]
    fn lookup_missing_field() {
        let ctx = ctx();
        let p = parse("<%= res.user.email %>").unwrap();
        let err = ctx.lookup(&p).unwrap_err();
        assert!(matches!(err, FormatError::PathNotFound { ref path } if path == "res.user.email"));
    }

    #[test]
    fn lookup_missing_intermediate() {
        let ctx = ctx();
        let p = parse("<%= res.fiddus.info %>").unwrap();
        let err = ctx.lookup(&p).unwrap_err();
        assert!(matches!(err, FormatError::PathNotFound { ref path } if path == "res.fiddus"));
    }

    #[test]
    fn lookup_array_out_of_bounds() {
        let ctx = ctx();
        let p = parse("<%= res.user.tags.5 %>").unwrap();
        assert!(matches!(ctx.lookup(&p), Err(FormatError::PathNotFound { .. })));
    }

    #[test]
    fn lookup_array_index_must_be_canonical() {
        let ctx = ctx();
        let p = parse("<%= res.user.tags.0 %>").unwrap();
        assert_eq!(ctx.lookup(&p).unwrap(), &json!("admin"));

        for expr in ["<%= res.user.tags.+1 %>", "<%= res.user.tags.01 %>", "<%= res.user.tags.-0 %>"] {
            let p = parse(expr).unwrap();
            assert!(
                matches!(ctx.lookup(&p), Err(FormatError::PathNotFound { .. })),
                "{expr} should not index the array"
            );
        }
    }

    #[test]
    fn array_index_rules() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index(""), None);
        assert_eq!(array_index("+1"), None);
        assert_eq!(array_index("007"), None);
        assert_eq!(array_index("1e2"), None);
    }

    #[test]
    fn lookup_through_scalar() {
        let ctx = ctx();
        let p = parse("<%= res.count.value %>").unwrap();
        let err = ctx.lookup(&p).unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn lookup_through_null() {
        let ctx = ctx();
        let p = parse("<%= res.nothing.deeper %>").unwrap();
        assert!(matches!(
            ctx.lookup(&p),
            Err(FormatError::InvalidTraversal { ref value_type, .. }) if value_type == "null"
        ));
    }

    #[test]
    fn from_value_fills_missing_views() {
        let ctx = Context::from_value(json!({"res": {"info": "x"}})).unwrap();
        assert_eq!(ctx.req(), &json!({}));
        assert_eq!(ctx.res(), &json!({"info": "x"}));
    }

    #[test]
    fn default_views_are_empty_objects() {
        let ctx = Context::default();
        assert_eq!(ctx.req(), &json!({}));
        assert_eq!(ctx.res(), &json!({}));
    }

    #[test]
    fn from_value_rejects_non_object() {
        assert!(matches!(
            Context::from_value(json!([1, 2])),
            Err(FormatError::InvalidContext { .. })
        ));
    }

    #[test]
    fn from_value_rejects_unknown_key() {
        let err = Context::from_value(json!({"request": {}})).unwrap_err();
        assert!(err.to_string().contains("request"));
    }
}
