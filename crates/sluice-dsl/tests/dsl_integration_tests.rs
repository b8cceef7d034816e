use pretty_assertions::assert_eq;
use sluice_dsl::{parse_and_validate, DslError, FlowElementKind, ModelFormat};

fn error_contains(err: &DslError, expected_code: &str) -> bool {
    format!("{:?}", err).contains(expected_code)
}

#[test]
fn test_parse_and_validate_approval_flow() {
    let yaml = r#"
flowElementList:
  - key: Start
    type: startEvent
  - key: F1
    type: sequenceFlow
    source: Start
    target: Submit
  - key: Submit
    type: userTask
    name: Submit request
  - key: F2
    type: sequenceFlow
    source: Submit
    target: Route
  - key: Route
    type: exclusiveGateway
  - key: F3
    type: sequenceFlow
    source: Route
    target: Approve
    condition: "amount > `1000`"
  - key: F4
    type: sequenceFlow
    source: Route
    target: End
    isDefault: true
  - key: Approve
    type: userTask
    properties:
      name: Manager approval
      assignee: manager
  - key: F5
    type: sequenceFlow
    source: Approve
    target: End
  - key: End
    type: endEvent
"#;

    let model = parse_and_validate(yaml, ModelFormat::Yaml).unwrap();

    assert_eq!(model.start_event().unwrap().key, "Start");
    assert_eq!(model.element("Submit").unwrap().display_name(), "Submit request");
    assert_eq!(model.element("Approve").unwrap().display_name(), "Manager approval");

    assert_eq!(model.element("Route").unwrap().kind, FlowElementKind::ExclusiveGateway);
    let route: Vec<&str> = model.outgoing("Route").map(|f| f.key.as_str()).collect();
    assert_eq!(route, vec!["F3", "F4"]);

    let suspension_points: Vec<&str> = model
        .elements()
        .iter()
        .filter(|e| e.kind.is_suspension_point())
        .map(|e| e.key.as_str())
        .collect();
    assert_eq!(suspension_points, vec!["Submit", "Approve"]);

    // JSON output parses back to the same elements
    let json = model.to_json().unwrap();
    let reparsed = parse_and_validate(&json, ModelFormat::Json).unwrap();
    assert_eq!(reparsed.elements(), model.elements());
}

#[test]
fn test_unreachable_task_is_reported() {
    let json = r#"{"flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "End"},
        {"key": "Orphan", "type": "userTask"},
        {"key": "F2", "type": "sequenceFlow", "source": "Orphan", "target": "End"},
        {"key": "End", "type": "endEvent"}
    ]}"#;

    let err = parse_and_validate(json, ModelFormat::Json).unwrap_err();
    assert!(error_contains(&err, "ERR_DSL_VALIDATION_UNREACHABLE_NODE"));
    assert!(err.to_string().contains("Orphan"));
}

#[test]
fn test_sequence_flow_cannot_target_a_flow() {
    let json = r#"{"flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "F2"},
        {"key": "F2", "type": "sequenceFlow", "source": "Start", "target": "End"},
        {"key": "End", "type": "endEvent"}
    ]}"#;

    let err = parse_and_validate(json, ModelFormat::Json).unwrap_err();
    assert!(error_contains(&err, "ERR_DSL_VALIDATION_INVALID_REFERENCE"));
    assert!(matches!(
        parse_and_validate(json, ModelFormat::Json).unwrap_err(),
        DslError::MultipleValidationErrors(_)
    ));
}
