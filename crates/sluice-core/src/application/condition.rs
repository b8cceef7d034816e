use serde_json::Value;

use crate::CoreError;

/// Evaluates sequence-flow conditions against instance data
pub trait ConditionEvaluator: Send + Sync {
    /// Whether `expression` holds for `data`
    fn evaluate(&self, expression: &str, data: &Value) -> Result<bool, CoreError>;
}

/// Condition evaluator using JMESPath truthiness
#[derive(Debug, Default, Clone, Copy)]
pub struct JmesPathConditionEvaluator;

impl ConditionEvaluator for JmesPathConditionEvaluator {
    fn evaluate(&self, expression: &str, data: &Value) -> Result<bool, CoreError> {
        let compiled = jmespath::compile(expression).map_err(|e| {
            CoreError::ConditionEvaluationError(format!(
                "Failed to compile JMESPath expression: {}: {}",
                expression, e
            ))
        })?;
        let result = compiled.search(data.clone()).map_err(|e| {
            CoreError::ConditionEvaluationError(format!(
                "Failed to evaluate JMESPath expression: {}: {}",
                expression, e
            ))
        })?;
        Ok(result.is_truthy())
    }
}
