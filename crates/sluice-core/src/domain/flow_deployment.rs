use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_dsl::FlowModel;
use uuid::Uuid;

use crate::CoreError;

/// One immutable deployment of a flow model.
///
/// Every deploy event gets a fresh `flow_deploy_id`; `flow_module_id` stays
/// the same across deploys of logically the same flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDeployment {
    /// Unique deployment identifier
    pub flow_deploy_id: String,

    /// Stable module identifier
    pub flow_module_id: String,

    /// Owning tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Who deployed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    /// Model document in JSON form
    pub flow_model: String,

    /// Deployment time
    pub created_at: DateTime<Utc>,
}

impl FlowDeployment {
    /// Create a deployment record for an already validated model
    pub fn new(
        flow_module_id: impl Into<String>,
        flow_model: &FlowModel,
        tenant_id: Option<String>,
        operator: Option<String>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            flow_deploy_id: Uuid::new_v4().to_string(),
            flow_module_id: flow_module_id.into(),
            tenant_id,
            operator,
            flow_model: flow_model.to_json()?,
            created_at: Utc::now(),
        })
    }

    /// Parse the stored model document
    pub fn parse_model(&self) -> Result<FlowModel, CoreError> {
        Ok(sluice_dsl::parse_flow_model(&self.flow_model)?)
    }
}
