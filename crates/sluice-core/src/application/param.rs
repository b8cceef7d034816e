use serde::{Deserialize, Serialize};
use sluice_dsl::ModelFormat;

use crate::domain::instance_data::InstanceData;
use crate::CoreError;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn require(name: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!("{} is required", name)));
    }
    Ok(())
}

/// Start a process instance from a deployment or from a module's latest deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartProcessParam {
    /// Exact deployment to run
    pub flow_deploy_id: Option<String>,
    /// Module whose latest deployment to run
    pub flow_module_id: Option<String>,
    /// Initial variables
    pub variables: Vec<InstanceData>,
}

impl StartProcessParam {
    /// Start from a specific deployment
    pub fn by_deployment(flow_deploy_id: impl Into<String>, variables: Vec<InstanceData>) -> Self {
        Self {
            flow_deploy_id: Some(flow_deploy_id.into()),
            flow_module_id: None,
            variables,
        }
    }

    /// Start from a module's latest deployment
    pub fn by_module(flow_module_id: impl Into<String>, variables: Vec<InstanceData>) -> Self {
        Self {
            flow_deploy_id: None,
            flow_module_id: Some(flow_module_id.into()),
            variables,
        }
    }

    /// Exactly one of deployment id and module id must be given
    pub fn validate(&self) -> Result<(), CoreError> {
        match (is_blank(&self.flow_deploy_id), is_blank(&self.flow_module_id)) {
            (false, true) | (true, false) => Ok(()),
            (true, true) => Err(CoreError::ValidationError(
                "one of flowDeployId and flowModuleId is required".to_string(),
            )),
            (false, false) => Err(CoreError::ValidationError(
                "flowDeployId and flowModuleId are mutually exclusive".to_string(),
            )),
        }
    }
}

/// Commit data to a suspended user task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitTaskParam {
    /// Process instance
    pub flow_instance_id: String,
    /// Node instance of the suspended user task
    pub task_instance_id: String,
    /// Variables merged over the current ones
    pub variables: Vec<InstanceData>,
}

impl CommitTaskParam {
    /// Create a commit request
    pub fn new(
        flow_instance_id: impl Into<String>,
        task_instance_id: impl Into<String>,
        variables: Vec<InstanceData>,
    ) -> Self {
        Self {
            flow_instance_id: flow_instance_id.into(),
            task_instance_id: task_instance_id.into(),
            variables,
        }
    }

    /// Both ids are required
    pub fn validate(&self) -> Result<(), CoreError> {
        require("flowInstanceId", &self.flow_instance_id)?;
        require("taskInstanceId", &self.task_instance_id)
    }
}

/// Roll a running instance back to the user task before `task_instance_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollbackTaskParam {
    /// Process instance
    pub flow_instance_id: String,
    /// Node instance to roll back from
    pub task_instance_id: String,
}

impl RollbackTaskParam {
    /// Create a rollback request
    pub fn new(flow_instance_id: impl Into<String>, task_instance_id: impl Into<String>) -> Self {
        Self {
            flow_instance_id: flow_instance_id.into(),
            task_instance_id: task_instance_id.into(),
        }
    }

    /// Both ids are required
    pub fn validate(&self) -> Result<(), CoreError> {
        require("flowInstanceId", &self.flow_instance_id)?;
        require("taskInstanceId", &self.task_instance_id)
    }
}

/// Deploy a model document under a module id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployFlowParam {
    /// Module the deployment belongs to
    pub flow_module_id: String,
    /// Model document text
    pub flow_model: String,
    /// Format of `flow_model`
    pub format: ModelFormat,
    /// Owning tenant
    pub tenant_id: Option<String>,
    /// Who deploys
    pub operator: Option<String>,
}

impl DeployFlowParam {
    /// Create a deploy request for a JSON document
    pub fn new(flow_module_id: impl Into<String>, flow_model: impl Into<String>) -> Self {
        Self {
            flow_module_id: flow_module_id.into(),
            flow_model: flow_model.into(),
            ..Default::default()
        }
    }

    /// Use a different document format
    pub fn with_format(mut self, format: ModelFormat) -> Self {
        self.format = format;
        self
    }

    /// Module id and document are required
    pub fn validate(&self) -> Result<(), CoreError> {
        require("flowModuleId", &self.flow_module_id)?;
        require("flowModel", &self.flow_model)
    }
}

/// Require a non-blank instance id for single-id operations
pub fn validate_flow_instance_id(flow_instance_id: &str) -> Result<(), CoreError> {
    require("flowInstanceId", flow_instance_id)
}
