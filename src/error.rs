//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - FMT-000-009: Template loading errors
//! - FMT-010-019: Placeholder syntax errors
//! - FMT-020-029: Path resolution errors
//! - FMT-030-039: Configuration errors
//! - FMT-040-049: Context/IO errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormatError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum FormatError {
    // ═══════════════════════════════════════════
    // TEMPLATE ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[FMT-001] Template file not found: {path}")]
    TemplateNotFound { path: String },

    #[error("[FMT-002] Failed to parse template '{path}': {details}")]
    TemplateParse { path: String, details: String },

    #[error("[FMT-003] Unsupported template format '{extension}' (expected json, yaml or yml)")]
    UnsupportedFormat { extension: String },

    // ═══════════════════════════════════════════
    // PLACEHOLDER ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[FMT-010] Placeholder '{placeholder}' has no path token after '<%='")]
    MissingPathToken { placeholder: String },

    #[error("[FMT-011] Unknown root '{root}' in placeholder '{placeholder}' (expected req or res)")]
    UnknownRoot { root: String, placeholder: String },

    // ═══════════════════════════════════════════
    // PATH ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[FMT-020] Path '{path}' not found in context")]
    PathNotFound { path: String },

    #[error("[FMT-021] Cannot traverse '{segment}' on {value_type} (in path '{full_path}')")]
    InvalidTraversal {
        segment: String,
        value_type: String,
        full_path: String,
    },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[FMT-030] Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("[FMT-031] No template configured")]
    NoTemplate,

    // ═══════════════════════════════════════════
    // CONTEXT / IO ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[FMT-040] Invalid context: {reason}")]
    InvalidContext { reason: String },

    #[error("[FMT-041] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[FMT-042] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormatError {
    /// Stable error code, e.g. `FMT-020`
    pub fn code(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. } => "FMT-001",
            Self::TemplateParse { .. } => "FMT-002",
            Self::UnsupportedFormat { .. } => "FMT-003",
            Self::MissingPathToken { .. } => "FMT-010",
            Self::UnknownRoot { .. } => "FMT-011",
            Self::PathNotFound { .. } => "FMT-020",
            Self::InvalidTraversal { .. } => "FMT-021",
            Self::ConfigError { .. } => "FMT-030",
            Self::NoTemplate => "FMT-031",
            Self::InvalidContext { .. } => "FMT-040",
            Self::Io(_) => "FMT-041",
            Self::Json(_) => "FMT-042",
        }
    }

    /// Whether the error comes from the template itself (syntax or shape)
    /// rather than from the per-request context.
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound { .. }
                | Self::TemplateParse { .. }
                | Self::UnsupportedFormat { .. }
                | Self::MissingPathToken { .. }
                | Self::UnknownRoot { .. }
        )
    }
}

impl FixSuggestion for FormatError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FormatError::TemplateNotFound { .. } => Some("Check the template path exists"),
            FormatError::TemplateParse { .. } => {
                Some("Check the template is a valid JSON or YAML document")
            }
            FormatError::UnsupportedFormat { .. } => {
                Some("Use a .json, .yaml or .yml template file")
            }
            FormatError::MissingPathToken { .. } => {
                Some("Write placeholders as '<%= res.field %>' with a single space after '<%='")
            }
            FormatError::UnknownRoot { .. } => {
                Some("Start the placeholder path with 'req.' or 'res.'")
            }
            FormatError::PathNotFound { .. } => {
                Some("Set the field on the response view before formatting, or fix the path")
            }
            FormatError::InvalidTraversal { .. } => {
                Some("Check the path - you're trying to access a field on a non-object value")
            }
            FormatError::ConfigError { .. } => Some("Check shapeshift.toml syntax"),
            FormatError::NoTemplate => {
                Some("Pass --template or set 'template' in shapeshift.toml")
            }
            FormatError::InvalidContext { .. } => {
                Some("Context must be a JSON object with optional 'req' and 'res' objects")
            }
            FormatError::Io(_) => Some("Check file path and permissions"),
            FormatError::Json(_) => Some("Check JSON syntax (try parsing with jq)"),
        }
    }
}
