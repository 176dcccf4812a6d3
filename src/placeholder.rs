//! Placeholder expressions - `<%= root.path %>`
//!
//! Grammar (deliberately narrow):
//! - the string starts with `<%=` at position 0 (no leading whitespace)
//! - the second space-delimited token is a dotted path
//! - the first path segment selects the context root: `req` or `res`
//!
//! Everything after the path token is ignored, so a malformed closing
//! marker (`<%= req.method =>`) still parses.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{FormatError, Result};

/// Opening marker of a placeholder
pub const MARKER: &str = "<%=";

/// Context root selected by the first path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    /// The incoming request view
    Req,
    /// The outgoing response view
    Res,
}

impl Root {
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "req" => Some(Root::Req),
            "res" => Some(Root::Res),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Root::Req => "req",
            Root::Res => "res",
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed placeholder, borrowing from the template string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Context root (`req` or `res`)
    pub root: Root,
    /// Full dotted path including the root, e.g. `res.user.name`
    pub path: &'a str,
    /// Segments after the root, e.g. `["user", "name"]`
    pub segments: SmallVec<[&'a str; 8]>,
}

/// Check whether a string leaf is a placeholder expression
#[inline]
pub fn is_placeholder(s: &str) -> bool {
    s.starts_with(MARKER)
}

/// Parse a placeholder string into root + segments
///
/// Callers are expected to have checked [`is_placeholder`] first; this
/// function only looks at the second space-delimited token.
pub fn parse(s: &str) -> Result<Placeholder<'_>> {
    let path = s
        .split(' ')
        .nth(1)
        .ok_or_else(|| FormatError::MissingPathToken {
            placeholder: s.to_string(),
        })?;

    let mut parts = path.split('.');
    // split always yields at least one item
    let selector = parts.next().unwrap_or_default();
    let root = Root::from_selector(selector).ok_or_else(|| FormatError::UnknownRoot {
        root: selector.to_string(),
        placeholder: s.to_string(),
    })?;

    Ok(Placeholder {
        root,
        path,
        segments: parts.collect(),
    })
}

impl fmt::Display for Placeholder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}
