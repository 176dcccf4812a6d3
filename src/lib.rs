//! shapeshift - shape JSON responses from a template
//!
//! A template is any JSON tree. String leaves starting with `<%=` are
//! placeholders (`<%= res.info %>`, `<%= req.method %>`) and get replaced by
//! values from the request (`req`) and response (`res`) views; everything
//! else is copied through.
//!
//! ```
//! use serde_json::json;
//! use shapeshift::{Context, Template};
//!
//! let template = Template::from_value(json!({
//!     "response": {"info": "<%= res.info %>", "method": "<%= req.method %>"},
//!     "version": 1
//! }));
//! let ctx = Context::new(json!({"method": "GET"}), json!({"info": "ok"}));
//!
//! let out = template.resolve(&ctx).unwrap();
//! assert_eq!(out, json!({"response": {"info": "ok", "method": "GET"}, "version": 1}));
//! ```

pub mod config;
pub mod context;
pub mod error;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod placeholder;
pub mod template;

pub use config::FormatConfig;
pub use context::Context;
pub use error::{FixSuggestion, FormatError, Result};
pub use placeholder::{Placeholder, Root};
pub use template::{resolve, PlaceholderRef, Template};
