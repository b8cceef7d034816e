use serde::{Deserialize, Serialize};

use crate::error::DslError;
use crate::flow::{FlowModel, FlowModelDocument};

/// Serialization format of a model document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// `{"flowElementList": [...]}`
    #[default]
    Json,
    /// The same document written as YAML
    Yaml,
}

/// Parse a model document in the given format.
///
/// Only the document shape and key uniqueness are checked here. Structural
/// rules (reachability, edge endpoints, ...) are left to
/// [`validate_flow_model`](crate::validation::validate_flow_model).
pub fn parse(text: &str, format: ModelFormat) -> Result<FlowModel, DslError> {
    match format {
        ModelFormat::Json => parse_flow_model(text),
        ModelFormat::Yaml => parse_flow_model_yaml(text),
    }
}

/// Parse a JSON model document
pub fn parse_flow_model(json: &str) -> Result<FlowModel, DslError> {
    let document: FlowModelDocument = serde_json::from_str(json)?;
    FlowModel::try_from(document)
}

/// Parse a YAML model document
pub fn parse_flow_model_yaml(yaml: &str) -> Result<FlowModel, DslError> {
    let document: FlowModelDocument = serde_yaml::from_str(yaml)?;
    FlowModel::try_from(document)
}

/// Parse a model document and run structural validation on it
pub fn parse_and_validate(text: &str, format: ModelFormat) -> Result<FlowModel, DslError> {
    let model = parse(text, format)?;
    crate::validation::validate_flow_model(&model)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowElementKind;

    #[test]
    fn test_parse_json_document() {
        let json = r#"{
            "flowElementList": [
                {"key": "Start", "type": "startEvent"},
                {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "End"},
                {"key": "End", "type": "endEvent", "properties": {"name": "Done"}}
            ]
        }"#;

        let model = parse_flow_model(json).unwrap();
        assert_eq!(model.len(), 3);
        assert_eq!(model.element("End").unwrap().display_name(), "Done");
        assert_eq!(model.element("F1").unwrap().endpoints(), Some(("Start", "End")));
    }

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
flowElementList:
  - key: Start
    type: startEvent
  - key: G
    type: exclusiveGateway
  - key: F1
    type: sequenceFlow
    source: G
    target: Start
    isDefault: true
"#;

        let model = parse(yaml, ModelFormat::Yaml).unwrap();
        match &model.element("F1").unwrap().kind {
            FlowElementKind::SequenceFlow { is_default, condition, .. } => {
                assert!(*is_default);
                assert!(condition.is_none());
            }
            other => panic!("Expected sequence flow, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_element_type() {
        let json = r#"{"flowElementList": [{"key": "X", "type": "parallelGateway"}]}"#;
        match parse_flow_model(json) {
            Err(DslError::JsonError(_)) => {}
            other => panic!("Expected JsonError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_yaml_syntax() {
        let yaml = "flowElementList: [\n  - key: broken";
        match parse(yaml, ModelFormat::Yaml) {
            Err(err) => assert_eq!(err.error_code(), "ERR_DSL_YAML_PARSE"),
            Ok(model) => panic!("Expected error, got {:?}", model),
        }
    }

    #[test]
    fn test_duplicate_key_in_document() {
        let json = r#"{"flowElementList": [
            {"key": "A", "type": "userTask"},
            {"key": "A", "type": "userTask"}
        ]}"#;
        assert!(matches!(
            parse_flow_model(json),
            Err(DslError::DuplicateElementKey(_))
        ));
    }
}
