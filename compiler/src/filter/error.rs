//! Error type for the filter tree and query compiler

use thiserror::Error;

/// Errors raised by tree editing, persistence, and query compilation.
///
/// Incomplete rules are not errors for the compiler: they are skipped and
/// reported through `CompiledQuery::complete`. `ValidationIncomplete` is only
/// returned by explicit checks such as [`crate::filter::Term::parse`].
#[derive(Error, Debug)]
pub enum FilterError {
    /// Tree shape violation (rule on an internal node, removing the root, cycles)
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    /// Leaf content missing or failing its schema
    #[error("Validation incomplete: {0}")]
    ValidationIncomplete(String),

    /// Request the compiler cannot express
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Malformed persisted tree or catalog
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FilterError {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralViolation(message.into())
    }

    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::ValidationIncomplete(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// Short machine-readable kind, used in CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StructuralViolation(_) => "structural_violation",
            Self::ValidationIncomplete(_) => "validation_incomplete",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_display() {
        let err = FilterError::structural("cannot remove the root node");
        assert_eq!(
            err.to_string(),
            "Structural violation: cannot remove the root node"
        );
        assert_eq!(err.kind(), "structural_violation");
    }

    #[test]
    fn test_unsupported_error_display() {
        let err = FilterError::unsupported("negated attribute rule");
        assert_eq!(
            err.to_string(),
            "Unsupported operation: negated attribute rule"
        );
        assert_eq!(err.kind(), "unsupported_operation");
    }

    #[test]
    fn test_json_error_from() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = FilterError::from(parse);
        assert_eq!(err.kind(), "json");
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
