use sluice_dsl::FlowModel;
use std::sync::Arc;

use super::instance_data::InstanceDataMap;
use super::node_instance::NodeInstance;
use super::process_instance::ProcessStatus;

/// Per-operation state handed to the executor.
///
/// Built by one coordinator call, mutated in place by the executor, read
/// back for the response and then dropped. Never shared between calls.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Deployment the instance is pinned to
    pub flow_deploy_id: String,

    /// Module of that deployment
    pub flow_module_id: String,

    /// Owning tenant
    pub tenant_id: Option<String>,

    /// Parsed model of the deployment
    pub flow_model: Arc<FlowModel>,

    /// Process instance being driven
    pub flow_instance_id: String,

    /// Status after the executor returns
    pub flow_instance_status: ProcessStatus,

    /// Node instance execution is suspended at, if any
    pub suspend_node_instance: Option<NodeInstance>,

    /// Node instance named by a commit or rollback request
    pub origin_node_instance_id: Option<String>,

    /// Working variables (latest snapshot, merged with committed data)
    pub instance_data: InstanceDataMap,

    /// Variables supplied by a commit, not yet merged
    pub commit_data: InstanceDataMap,

    /// Id of the snapshot `instance_data` corresponds to
    pub instance_data_id: Option<String>,
}

impl ExecutionContext {
    /// A context for a running instance with no variables loaded
    pub fn new(
        flow_deploy_id: impl Into<String>,
        flow_module_id: impl Into<String>,
        tenant_id: Option<String>,
        flow_model: Arc<FlowModel>,
        flow_instance_id: impl Into<String>,
    ) -> Self {
        Self {
            flow_deploy_id: flow_deploy_id.into(),
            flow_module_id: flow_module_id.into(),
            tenant_id,
            flow_model,
            flow_instance_id: flow_instance_id.into(),
            flow_instance_status: ProcessStatus::Running,
            suspend_node_instance: None,
            origin_node_instance_id: None,
            instance_data: InstanceDataMap::new(),
            commit_data: InstanceDataMap::new(),
            instance_data_id: None,
        }
    }

    /// Whether the walk stopped at a user task
    pub fn is_suspended(&self) -> bool {
        self.flow_instance_status == ProcessStatus::Running && self.suspend_node_instance.is_some()
    }
}
