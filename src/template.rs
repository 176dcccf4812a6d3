//! Template resolution - deep copy with placeholder substitution
//!
//! Walks a template tree and returns a fresh tree of the same shape:
//! - objects are rebuilt key by key, in template order
//! - strings starting with `<%=` are replaced by the value they point at
//! - everything else (numbers, bools, null, arrays) is copied as-is
//!
//! Arrays are leaves: their elements are never inspected.
//!
//! Resolution is all-or-nothing. The first placeholder that fails to
//! parse or resolve aborts the call and no partial tree escapes.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::{FormatError, Result};
use crate::placeholder::{self, is_placeholder};

/// Immutable response template, cheap to clone and share across requests
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Arc<Value>,
}

/// A placeholder leaf found in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRef {
    /// JSON pointer to the leaf, e.g. `/response/info`
    pub pointer: String,
    /// The raw leaf string, e.g. `<%= res.info %>`
    pub expression: String,
}

impl Template {
    pub fn from_value(value: Value) -> Self {
        Self {
            root: Arc::new(value),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let value = serde_json::from_str(source).map_err(|e| FormatError::TemplateParse {
            path: "<inline>".to_string(),
            details: e.to_string(),
        })?;
        Ok(Self::from_value(value))
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let value = serde_yaml::from_str(source).map_err(|e| FormatError::TemplateParse {
            path: "<inline>".to_string(),
            details: e.to_string(),
        })?;
        Ok(Self::from_value(value))
    }

    /// Load a template file, picking the parser from the extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            return Err(FormatError::TemplateNotFound { path: display });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let source = fs::read_to_string(path)?;
        let parsed = match extension.as_str() {
            "json" => Self::from_json_str(&source),
            "yaml" | "yml" => Self::from_yaml_str(&source),
            _ => return Err(FormatError::UnsupportedFormat { extension }),
        };

        parsed.map_err(|e| match e {
            FormatError::TemplateParse { details, .. } => FormatError::TemplateParse {
                path: display.clone(),
                details,
            },
            other => other,
        })
    }

    /// The template tree
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Resolve every placeholder against `ctx`
    pub fn resolve(&self, ctx: &Context) -> Result<Value> {
        resolve(&self.root, ctx)
    }

    /// List every placeholder leaf in document order
    pub fn placeholders(&self) -> Vec<PlaceholderRef> {
        let mut found = Vec::new();
        collect_placeholders(&self.root, &mut String::new(), &mut found);
        found
    }

    /// Check placeholder syntax without a context
    ///
    /// Catches a missing path token or an unknown root. Whether the path
    /// exists can only be known per request.
    pub fn check(&self) -> Result<usize> {
        let refs = self.placeholders();
        for r in &refs {
            placeholder::parse(&r.expression)?;
        }
        Ok(refs.len())
    }
}

impl From<Value> for Template {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// Resolve a template tree against a context
///
/// Returns a new tree with the same keys in the same order; only
/// placeholder strings change.
pub fn resolve(template: &Value, ctx: &Context) -> Result<Value> {
    let mut resolved = 0usize;
    let out = resolve_node(template, ctx, &mut resolved)?;
    debug!(placeholders = resolved, "template resolved");
    Ok(out)
}

fn resolve_node(node: &Value, ctx: &Context, resolved: &mut usize) -> Result<Value> {
    match node {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve_node(value, ctx, resolved)?);
            }
            Ok(Value::Object(out))
        }
        Value::String(s) if is_placeholder(s) => {
            let parsed = placeholder::parse(s)?;
            let value = ctx.lookup(&parsed)?;
            *resolved += 1;
            Ok(value.clone())
        }
        other => Ok(other.clone()),
    }
}

fn collect_placeholders(node: &Value, pointer: &mut String, found: &mut Vec<PlaceholderRef>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
                collect_placeholders(value, pointer, found);
                pointer.truncate(len);
            }
        }
        Value::String(s) if is_placeholder(s) => found.push(PlaceholderRef {
            pointer: pointer.clone(),
            expression: s.clone(),
        }),
        _ => {}
    }
}
