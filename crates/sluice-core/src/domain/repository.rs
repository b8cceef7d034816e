//! Repository traits for the Sluice runtime
//!
//! The durable store is consumed through these traits. Every write is a
//! single-row mutation; no operation spans more than one call.

use async_trait::async_trait;
use std::sync::Arc;

use super::flow_deployment::FlowDeployment;
use super::instance_data::InstanceDataSnapshot;
use super::node_instance::{NodeInstance, NodeInstanceStatus};
use super::process_instance::{ProcessInstance, ProcessStatus};
use crate::CoreError;

/// Repository for flow deployments
#[async_trait]
pub trait FlowDeploymentRepository: Send + Sync {
    /// Store a new deployment
    async fn insert(&self, deployment: &FlowDeployment) -> Result<(), CoreError>;

    /// Find a deployment by its id
    async fn find_by_deploy_id(&self, flow_deploy_id: &str)
        -> Result<Option<FlowDeployment>, CoreError>;

    /// Find the most recent deployment of a module
    async fn find_latest_by_module_id(
        &self,
        flow_module_id: &str,
    ) -> Result<Option<FlowDeployment>, CoreError>;
}

/// Repository for process instances
#[async_trait]
pub trait ProcessInstanceRepository: Send + Sync {
    /// Store a new process instance
    async fn insert(&self, instance: &ProcessInstance) -> Result<(), CoreError>;

    /// Find a process instance by id
    async fn find_by_id(&self, flow_instance_id: &str) -> Result<Option<ProcessInstance>, CoreError>;

    /// Overwrite the status of a process instance
    async fn update_status(
        &self,
        flow_instance_id: &str,
        status: ProcessStatus,
    ) -> Result<(), CoreError>;
}

/// Repository for node instances (append-only history)
#[async_trait]
pub trait NodeInstanceRepository: Send + Sync {
    /// Append a node instance, returning it with its creation sequence set
    async fn insert(&self, node_instance: NodeInstance) -> Result<NodeInstance, CoreError>;

    /// Overwrite the status of a node instance
    async fn update_status(
        &self,
        node_instance_id: &str,
        status: NodeInstanceStatus,
    ) -> Result<(), CoreError>;

    /// Find a node instance belonging to the given process instance
    async fn find_by_id(
        &self,
        flow_instance_id: &str,
        node_instance_id: &str,
    ) -> Result<Option<NodeInstance>, CoreError>;

    /// History of a process instance, oldest first
    async fn list_ascending(&self, flow_instance_id: &str) -> Result<Vec<NodeInstance>, CoreError>;

    /// History of a process instance, newest first
    async fn list_descending(&self, flow_instance_id: &str) -> Result<Vec<NodeInstance>, CoreError> {
        let mut list = self.list_ascending(flow_instance_id).await?;
        list.reverse();
        Ok(list)
    }
}

/// Repository for instance-data snapshots
#[async_trait]
pub trait InstanceDataRepository: Send + Sync {
    /// Store a new snapshot
    async fn insert(&self, snapshot: &InstanceDataSnapshot) -> Result<(), CoreError>;

    /// The most recent snapshot of a process instance
    async fn find_recent(&self, flow_instance_id: &str)
        -> Result<Option<InstanceDataSnapshot>, CoreError>;

    /// A specific snapshot of a process instance
    async fn find_by_id(
        &self,
        flow_instance_id: &str,
        instance_data_id: &str,
    ) -> Result<Option<InstanceDataSnapshot>, CoreError>;
}

/// The set of repositories the runtime works against
#[derive(Clone)]
pub struct Repositories {
    /// Deployments
    pub flow_deployments: Arc<dyn FlowDeploymentRepository>,
    /// Process instances
    pub process_instances: Arc<dyn ProcessInstanceRepository>,
    /// Node instances
    pub node_instances: Arc<dyn NodeInstanceRepository>,
    /// Instance-data snapshots
    pub instance_data: Arc<dyn InstanceDataRepository>,
}

#[cfg(feature = "testing")]
impl Repositories {
    /// Fresh in-memory repositories
    pub fn in_memory() -> Self {
        Self {
            flow_deployments: Arc::new(memory::MemoryFlowDeploymentRepository::new()),
            process_instances: Arc::new(memory::MemoryProcessInstanceRepository::new()),
            node_instances: Arc::new(memory::MemoryNodeInstanceRepository::new()),
            instance_data: Arc::new(memory::MemoryInstanceDataRepository::new()),
        }
    }
}

/// Memory implementations for testing
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use chrono::Utc;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// In-memory deployment store
    pub struct MemoryFlowDeploymentRepository {
        deployments: Arc<DashMap<String, FlowDeployment>>,
        // module id -> deploy ids in deploy order
        modules: Arc<DashMap<String, Vec<String>>>,
    }

    impl MemoryFlowDeploymentRepository {
        /// Create an empty store
        pub fn new() -> Self {
            Self {
                deployments: Arc::new(DashMap::with_capacity(16)),
                modules: Arc::new(DashMap::with_capacity(16)),
            }
        }
    }

    impl Default for MemoryFlowDeploymentRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl FlowDeploymentRepository for MemoryFlowDeploymentRepository {
        async fn insert(&self, deployment: &FlowDeployment) -> Result<(), CoreError> {
            self.deployments
                .insert(deployment.flow_deploy_id.clone(), deployment.clone());
            self.modules
                .entry(deployment.flow_module_id.clone())
                .or_default()
                .push(deployment.flow_deploy_id.clone());
            Ok(())
        }

        async fn find_by_deploy_id(
            &self,
            flow_deploy_id: &str,
        ) -> Result<Option<FlowDeployment>, CoreError> {
            Ok(self.deployments.get(flow_deploy_id).map(|d| d.clone()))
        }

        async fn find_latest_by_module_id(
            &self,
            flow_module_id: &str,
        ) -> Result<Option<FlowDeployment>, CoreError> {
            let latest = self
                .modules
                .get(flow_module_id)
                .and_then(|ids| ids.last().cloned());
            Ok(latest.and_then(|id| self.deployments.get(&id).map(|d| d.clone())))
        }
    }

    /// In-memory process instance store
    pub struct MemoryProcessInstanceRepository {
        instances: Arc<DashMap<String, ProcessInstance>>,
    }

    impl MemoryProcessInstanceRepository {
        /// Create an empty store
        pub fn new() -> Self {
            Self {
                instances: Arc::new(DashMap::with_capacity(64)),
            }
        }
    }

    impl Default for MemoryProcessInstanceRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ProcessInstanceRepository for MemoryProcessInstanceRepository {
        async fn insert(&self, instance: &ProcessInstance) -> Result<(), CoreError> {
            self.instances
                .insert(instance.flow_instance_id.clone(), instance.clone());
            Ok(())
        }

        async fn find_by_id(
            &self,
            flow_instance_id: &str,
        ) -> Result<Option<ProcessInstance>, CoreError> {
            Ok(self.instances.get(flow_instance_id).map(|i| i.clone()))
        }

        async fn update_status(
            &self,
            flow_instance_id: &str,
            status: ProcessStatus,
        ) -> Result<(), CoreError> {
            let mut instance = self
                .instances
                .get_mut(flow_instance_id)
                .ok_or_else(|| CoreError::FlowInstanceNotFound(flow_instance_id.to_string()))?;
            instance.status = status;
            instance.updated_at = Utc::now();
            Ok(())
        }
    }

    /// In-memory node instance store
    pub struct MemoryNodeInstanceRepository {
        nodes: Arc<DashMap<String, NodeInstance>>,
        // flow instance id -> node instance ids in insert order
        by_instance: Arc<DashMap<String, Vec<String>>>,
        next_seq: AtomicU64,
    }

    impl MemoryNodeInstanceRepository {
        /// Create an empty store
        pub fn new() -> Self {
            Self {
                nodes: Arc::new(DashMap::with_capacity(256)),
                by_instance: Arc::new(DashMap::with_capacity(64)),
                next_seq: AtomicU64::new(1),
            }
        }
    }

    impl Default for MemoryNodeInstanceRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl NodeInstanceRepository for MemoryNodeInstanceRepository {
        async fn insert(&self, mut node_instance: NodeInstance) -> Result<NodeInstance, CoreError> {
            node_instance.seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            self.by_instance
                .entry(node_instance.flow_instance_id.clone())
                .or_default()
                .push(node_instance.node_instance_id.clone());
            self.nodes
                .insert(node_instance.node_instance_id.clone(), node_instance.clone());
            Ok(node_instance)
        }

        async fn update_status(
            &self,
            node_instance_id: &str,
            status: NodeInstanceStatus,
        ) -> Result<(), CoreError> {
            let mut node = self
                .nodes
                .get_mut(node_instance_id)
                .ok_or_else(|| CoreError::NodeInstanceNotFound(node_instance_id.to_string()))?;
            node.status = status;
            node.updated_at = Utc::now();
            Ok(())
        }

        async fn find_by_id(
            &self,
            flow_instance_id: &str,
            node_instance_id: &str,
        ) -> Result<Option<NodeInstance>, CoreError> {
            Ok(self
                .nodes
                .get(node_instance_id)
                .filter(|node| node.flow_instance_id == flow_instance_id)
                .map(|node| node.clone()))
        }

        async fn list_ascending(
            &self,
            flow_instance_id: &str,
        ) -> Result<Vec<NodeInstance>, CoreError> {
            let ids = match self.by_instance.get(flow_instance_id) {
                Some(ids) => ids.clone(),
                None => return Ok(Vec::new()),
            };
            let mut list: Vec<NodeInstance> = ids
                .iter()
                .filter_map(|id| self.nodes.get(id).map(|node| node.clone()))
                .collect();
            list.sort_by_key(|node| node.seq);
            Ok(list)
        }
    }

    /// In-memory instance-data store
    pub struct MemoryInstanceDataRepository {
        // flow instance id -> snapshots in write order
        snapshots: Arc<DashMap<String, Vec<InstanceDataSnapshot>>>,
    }

    impl MemoryInstanceDataRepository {
        /// Create an empty store
        pub fn new() -> Self {
            Self {
                snapshots: Arc::new(DashMap::with_capacity(64)),
            }
        }
    }

    impl Default for MemoryInstanceDataRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl InstanceDataRepository for MemoryInstanceDataRepository {
        async fn insert(&self, snapshot: &InstanceDataSnapshot) -> Result<(), CoreError> {
            self.snapshots
                .entry(snapshot.flow_instance_id.clone())
                .or_default()
                .push(snapshot.clone());
            Ok(())
        }

        async fn find_recent(
            &self,
            flow_instance_id: &str,
        ) -> Result<Option<InstanceDataSnapshot>, CoreError> {
            Ok(self
                .snapshots
                .get(flow_instance_id)
                .and_then(|list| list.last().cloned()))
        }

        async fn find_by_id(
            &self,
            flow_instance_id: &str,
            instance_data_id: &str,
        ) -> Result<Option<InstanceDataSnapshot>, CoreError> {
            Ok(self.snapshots.get(flow_instance_id).and_then(|list| {
                list.iter()
                    .find(|snapshot| snapshot.instance_data_id == instance_data_id)
                    .cloned()
            }))
        }
    }

}
