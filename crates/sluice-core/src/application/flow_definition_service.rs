use std::sync::Arc;
use tracing::{info, warn};

use super::param::DeployFlowParam;
use super::result::{CommonResult, DeployFlowResult};
use crate::{
    domain::flow_deployment::FlowDeployment,
    domain::repository::FlowDeploymentRepository,
    error::ErrorCode,
    CoreError,
};

/// Service for deploying flow models
pub struct FlowDefinitionService {
    deployments: Arc<dyn FlowDeploymentRepository>,
}

impl FlowDefinitionService {
    /// Create a new flow definition service
    pub fn new(deployments: Arc<dyn FlowDeploymentRepository>) -> Self {
        Self { deployments }
    }

    /// Parse, validate and store a model as a new deployment of its module.
    ///
    /// Earlier deployments of the module are left untouched; instances pinned
    /// to them keep running against them.
    pub async fn deploy(&self, param: DeployFlowParam) -> DeployFlowResult {
        match self.do_deploy(&param).await {
            Ok(deployment) => {
                info!(
                    flow_module_id = %deployment.flow_module_id,
                    flow_deploy_id = %deployment.flow_deploy_id,
                    "Flow model deployed"
                );
                DeployFlowResult {
                    common: CommonResult::of(ErrorCode::Success),
                    flow_deploy_id: Some(deployment.flow_deploy_id),
                    flow_module_id: deployment.flow_module_id,
                }
            }
            Err(e) => {
                warn!(flow_module_id = %param.flow_module_id, error = %e, "Flow model deploy rejected");
                DeployFlowResult {
                    common: CommonResult::from_error(&e),
                    flow_deploy_id: None,
                    flow_module_id: param.flow_module_id,
                }
            }
        }
    }

    /// Look up a deployment by id
    pub async fn get_deployment(&self, flow_deploy_id: &str) -> Result<FlowDeployment, CoreError> {
        self.deployments
            .find_by_deploy_id(flow_deploy_id)
            .await?
            .ok_or_else(|| CoreError::FlowDeploymentNotFound(flow_deploy_id.to_string()))
    }

    async fn do_deploy(&self, param: &DeployFlowParam) -> Result<FlowDeployment, CoreError> {
        param.validate()?;
        let model = sluice_dsl::parse_and_validate(&param.flow_model, param.format)?;
        let deployment = FlowDeployment::new(
            param.flow_module_id.clone(),
            &model,
            param.tenant_id.clone(),
            param.operator.clone(),
        )?;
        self.deployments.insert(&deployment).await?;
        Ok(deployment)
    }
}
