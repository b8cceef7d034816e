use crate::validation::ValidationError;
use std::fmt;
use thiserror::Error;

/// All possible errors that can occur while handling flow model documents
#[derive(Error, Debug)]
pub enum DslError {
    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Errors that occur during JSON processing
    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Two elements in one model share a key
    #[error("Duplicate flow element key: {0}")]
    DuplicateElementKey(String),

    /// A key was looked up that the model does not contain
    #[error("Unknown flow element key: {0}")]
    UnknownElementKey(String),

    /// The model has no start event to begin execution from
    #[error("Flow model has no start event")]
    MissingStartEvent,

    /// A single validation error
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidationErrors(Vec<ValidationError>),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [ValidationError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl DslError {
    /// Build an error from the problems a validation pass collected.
    ///
    /// Returns `None` when the list is empty.
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop().map(DslError::ValidationError),
            _ => Some(DslError::MultipleValidationErrors(errors)),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DslError::YamlError(_) => "ERR_DSL_YAML_PARSE",
            DslError::JsonError(_) => "ERR_DSL_JSON_PARSE",
            DslError::DuplicateElementKey(_) => "ERR_DSL_DUPLICATE_KEY",
            DslError::UnknownElementKey(_) => "ERR_DSL_UNKNOWN_KEY",
            DslError::MissingStartEvent => "ERR_DSL_MISSING_START_EVENT",
            DslError::ValidationError(err) => err.code,
            DslError::MultipleValidationErrors(_) => "ERR_DSL_VALIDATION_MULTIPLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error_codes;

    #[test]
    fn test_from_validation_errors() {
        assert!(DslError::from_validation_errors(Vec::new()).is_none());

        let single = DslError::from_validation_errors(vec![ValidationError::new(
            error_codes::MISSING_END_EVENT,
            "no end event",
        )])
        .unwrap();
        assert_eq!(single.error_code(), error_codes::MISSING_END_EVENT);

        let multiple = DslError::from_validation_errors(vec![
            ValidationError::new(error_codes::MISSING_END_EVENT, "no end event"),
            ValidationError::at(error_codes::UNREACHABLE_NODE, "not reachable", "Task_1"),
        ])
        .unwrap();
        assert_eq!(multiple.error_code(), "ERR_DSL_VALIDATION_MULTIPLE");
        let rendered = multiple.to_string();
        assert!(rendered.contains("2 issues"));
        assert!(rendered.contains("(at Task_1)"));
    }
}
