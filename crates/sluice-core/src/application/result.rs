use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sluice_dsl::FlowElement;

use crate::domain::instance_data::InstanceData;
use crate::domain::node_instance::{NodeInstance, NodeInstanceStatus};
use crate::domain::process_instance::ProcessStatus;
use crate::error::{CoreError, ErrorCode};

/// Code and message carried by every response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonResult {
    /// Numeric result code
    pub err_code: i32,
    /// Human-readable message
    pub err_msg: String,
}

impl CommonResult {
    /// A result with the code's default message
    pub fn of(code: ErrorCode) -> Self {
        Self {
            err_code: code.code(),
            err_msg: code.message().to_string(),
        }
    }

    /// A result describing an error
    pub fn from_error(error: &CoreError) -> Self {
        Self {
            err_code: error.error_code().code(),
            err_msg: error.to_string(),
        }
    }

    /// Whether the code is success class
    pub fn is_success(&self) -> bool {
        (1000..2000).contains(&self.err_code)
    }
}

impl Default for CommonResult {
    fn default() -> Self {
        Self::of(ErrorCode::Success)
    }
}

/// A node instance enriched with its flow element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstanceView {
    /// Node instance id
    pub node_instance_id: String,
    /// Flow element key
    pub model_key: String,
    /// Flow element name
    pub model_name: String,
    /// Flow element properties
    pub properties: Map<String, Value>,
    /// Node instance status
    pub status: NodeInstanceStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl NodeInstanceView {
    /// Combine a node instance with its element
    pub fn new(node: &NodeInstance, element: &FlowElement) -> Self {
        Self {
            node_instance_id: node.node_instance_id.clone(),
            model_key: node.node_key.clone(),
            model_name: element.display_name(),
            properties: element.properties.clone(),
            status: node.status,
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

/// One entry of an element trace: a node or the edge that led to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInstance {
    /// Flow element key
    pub element_key: String,
    /// Status of the traversal
    pub status: NodeInstanceStatus,
    /// Node instance id; absent for synthesized edge entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_instance_id: Option<String>,
}

/// Response of start, commit and rollback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// Process instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_instance_id: Option<String>,
    /// Process instance status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessStatus>,
    /// Task execution is suspended at, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_task_instance: Option<NodeInstanceView>,
    /// Current variables
    pub variables: Vec<InstanceData>,
}

/// Response of a start request
pub type StartProcessResult = RuntimeResult;
/// Response of a commit request
pub type CommitTaskResult = RuntimeResult;
/// Response of a rollback request
pub type RollbackTaskResult = RuntimeResult;

/// Response of a terminate request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// Process instance
    pub flow_instance_id: String,
    /// Status after the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessStatus>,
}

/// User-task history, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstanceListResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// Tasks
    pub node_instance_list: Vec<NodeInstanceView>,
}

/// Chronological trace of nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInstanceListResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// Trace entries
    pub element_instance_list: Vec<ElementInstance>,
}

/// One node instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstanceResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// The node instance, when found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_instance: Option<NodeInstanceView>,
}

/// Current variables of an instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDataListResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// Variables
    pub variables: Vec<InstanceData>,
}

/// Response of a deploy request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFlowResult {
    /// Code and message
    #[serde(flatten)]
    pub common: CommonResult,
    /// New deployment id, when deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_deploy_id: Option<String>,
    /// Module deployed to
    pub flow_module_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_is_flattened() {
        let result = TerminateResult {
            common: CommonResult::of(ErrorCode::Success),
            flow_instance_id: "fi-1".to_string(),
            status: Some(ProcessStatus::Terminated),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "errCode": 1000,
                "errMsg": "success",
                "flowInstanceId": "fi-1",
                "status": "TERMINATED"
            })
        );
    }

    #[test]
    fn test_from_error() {
        let common = CommonResult::from_error(&CoreError::CommitRejected("terminated".to_string()));
        assert_eq!(common.err_code, 4004);
        assert!(!common.is_success());
        assert!(CommonResult::of(ErrorCode::ReentrantWarning).is_success());
    }
}
