#![allow(dead_code)]

use serde_json::Value;
use sluice_core::{DeployFlowParam, InstanceData, ProcessEngine, RuntimeConfig};

/// start -> A -> end
pub const SINGLE_TASK: &str = r#"{
    "flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "A"},
        {"key": "A", "type": "userTask", "name": "Submit request"},
        {"key": "F2", "type": "sequenceFlow", "source": "A", "target": "End"},
        {"key": "End", "type": "endEvent"}
    ]
}"#;

/// start -> A -> B -> end
pub const TWO_TASKS: &str = r#"{
    "flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "A"},
        {"key": "A", "type": "userTask", "name": "Submit request"},
        {"key": "F2", "type": "sequenceFlow", "source": "A", "target": "B"},
        {"key": "B", "type": "userTask", "name": "Review request"},
        {"key": "F3", "type": "sequenceFlow", "source": "B", "target": "End"},
        {"key": "End", "type": "endEvent"}
    ]
}"#;

/// start -> gateway -> (amount > 100) Approve -> end, default -> end
pub const APPROVAL: &str = r#"{
    "flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "Check"},
        {"key": "Check", "type": "exclusiveGateway"},
        {"key": "Big", "type": "sequenceFlow", "source": "Check", "target": "Approve", "condition": "amount > `100`"},
        {"key": "Small", "type": "sequenceFlow", "source": "Check", "target": "End", "isDefault": true},
        {"key": "Approve", "type": "userTask", "name": "Manager approval"},
        {"key": "F2", "type": "sequenceFlow", "source": "Approve", "target": "End"},
        {"key": "End", "type": "endEvent"}
    ]
}"#;

/// Gateway with a single conditional flow and no default
pub const NO_DEFAULT: &str = r#"{
    "flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "Check"},
        {"key": "Check", "type": "exclusiveGateway"},
        {"key": "Big", "type": "sequenceFlow", "source": "Check", "target": "End", "condition": "amount > `100`"},
        {"key": "End", "type": "endEvent"}
    ]
}"#;

/// start -> A -> gateway, which only lets x == 1 through to the end
pub const GATED_TASK: &str = r#"{
    "flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "A"},
        {"key": "A", "type": "userTask"},
        {"key": "F2", "type": "sequenceFlow", "source": "A", "target": "Check"},
        {"key": "Check", "type": "exclusiveGateway"},
        {"key": "Pass", "type": "sequenceFlow", "source": "Check", "target": "End", "condition": "x == `1`"},
        {"key": "End", "type": "endEvent"}
    ]
}"#;

/// Two gateways bouncing between each other forever
pub const GATEWAY_LOOP: &str = r#"{
    "flowElementList": [
        {"key": "Start", "type": "startEvent"},
        {"key": "F1", "type": "sequenceFlow", "source": "Start", "target": "G1"},
        {"key": "G1", "type": "exclusiveGateway"},
        {"key": "Across", "type": "sequenceFlow", "source": "G1", "target": "G2"},
        {"key": "Out", "type": "sequenceFlow", "source": "G1", "target": "End", "isDefault": true},
        {"key": "G2", "type": "exclusiveGateway"},
        {"key": "Back", "type": "sequenceFlow", "source": "G2", "target": "G1"},
        {"key": "End", "type": "endEvent"}
    ]
}"#;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine() -> ProcessEngine {
    init_test_logging();
    ProcessEngine::in_memory(RuntimeConfig::default())
}

pub fn vars(pairs: &[(&str, Value)]) -> Vec<InstanceData> {
    pairs
        .iter()
        .map(|(key, value)| InstanceData::new(*key, value.clone()))
        .collect()
}

pub fn var_pairs(variables: &[InstanceData]) -> Vec<(String, Value)> {
    variables
        .iter()
        .map(|data| (data.key.clone(), data.value.clone()))
        .collect()
}

pub async fn deploy(engine: &ProcessEngine, flow_module_id: &str, model: &str) -> String {
    let result = engine
        .deploy(DeployFlowParam::new(flow_module_id, model))
        .await;
    assert!(result.common.is_success(), "deploy failed: {}", result.common.err_msg);
    result.flow_deploy_id.expect("deploy id")
}

pub async fn cached_instance(engine: &ProcessEngine, flow_instance_id: &str) -> Option<String> {
    let key = RuntimeConfig::default().flow_instance_key(flow_instance_id);
    engine.cache().get(&key).await.unwrap()
}
