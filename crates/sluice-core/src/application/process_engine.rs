use std::sync::Arc;

use super::condition::{ConditionEvaluator, JmesPathConditionEvaluator};
use super::executor::DefaultFlowExecutor;
use super::flow_definition_service::FlowDefinitionService;
use super::param::{CommitTaskParam, DeployFlowParam, RollbackTaskParam, StartProcessParam};
use super::result::{
    CommitTaskResult, DeployFlowResult, ElementInstanceListResult, InstanceDataListResult,
    NodeInstanceListResult, NodeInstanceResult, RollbackTaskResult, StartProcessResult,
    TerminateResult,
};
use super::runtime_processor::RuntimeProcessor;
use crate::{config::RuntimeConfig, domain::cache::InstanceCache, domain::repository::Repositories};

/// The API the engine offers to embedding systems
#[derive(Clone)]
pub struct ProcessEngine {
    runtime_processor: Arc<RuntimeProcessor>,
    flow_definition_service: Arc<FlowDefinitionService>,
    repositories: Repositories,
    cache: Arc<dyn InstanceCache>,
}

impl ProcessEngine {
    /// Wire an engine over the given stores with JMESPath gateway conditions
    pub fn new(repositories: Repositories, cache: Arc<dyn InstanceCache>, config: RuntimeConfig) -> Self {
        Self::with_evaluator(
            repositories,
            cache,
            Arc::new(JmesPathConditionEvaluator),
            config,
        )
    }

    /// Wire an engine with a custom condition evaluator
    pub fn with_evaluator(
        repositories: Repositories,
        cache: Arc<dyn InstanceCache>,
        evaluator: Arc<dyn ConditionEvaluator>,
        config: RuntimeConfig,
    ) -> Self {
        let executor = Arc::new(DefaultFlowExecutor::new(
            repositories.clone(),
            evaluator,
            config.max_walk_steps,
        ));
        let runtime_processor = Arc::new(RuntimeProcessor::new(
            repositories.clone(),
            Arc::clone(&cache),
            executor,
            config,
        ));
        let flow_definition_service = Arc::new(FlowDefinitionService::new(Arc::clone(
            &repositories.flow_deployments,
        )));

        Self {
            runtime_processor,
            flow_definition_service,
            repositories,
            cache,
        }
    }

    /// An engine over fresh in-memory stores and cache
    #[cfg(feature = "testing")]
    pub fn in_memory(config: RuntimeConfig) -> Self {
        use crate::domain::cache::memory::InMemoryInstanceCache;

        Self::new(
            Repositories::in_memory(),
            Arc::new(InMemoryInstanceCache::new()),
            config,
        )
    }

    /// Deploy a flow model
    pub async fn deploy(&self, param: DeployFlowParam) -> DeployFlowResult {
        self.flow_definition_service.deploy(param).await
    }

    /// Start a process instance
    pub async fn start_process(&self, param: StartProcessParam) -> StartProcessResult {
        self.runtime_processor.start_process(param).await
    }

    /// Commit a suspended user task
    pub async fn commit(&self, param: CommitTaskParam) -> CommitTaskResult {
        self.runtime_processor.commit(param).await
    }

    /// Roll back to the previous user task
    pub async fn rollback(&self, param: RollbackTaskParam) -> RollbackTaskResult {
        self.runtime_processor.rollback(param).await
    }

    /// Terminate a process instance
    pub async fn terminate_process(&self, flow_instance_id: &str) -> TerminateResult {
        self.runtime_processor.terminate_process(flow_instance_id).await
    }

    /// User-task history, newest first
    pub async fn get_history_user_task_list(&self, flow_instance_id: &str) -> NodeInstanceListResult {
        self.runtime_processor
            .get_history_user_task_list(flow_instance_id)
            .await
    }

    /// Element trace, oldest first
    pub async fn get_history_element_list(&self, flow_instance_id: &str) -> ElementInstanceListResult {
        self.runtime_processor
            .get_history_element_list(flow_instance_id)
            .await
    }

    /// One node instance
    pub async fn get_node_instance(
        &self,
        flow_instance_id: &str,
        node_instance_id: &str,
    ) -> NodeInstanceResult {
        self.runtime_processor
            .get_node_instance(flow_instance_id, node_instance_id)
            .await
    }

    /// Latest variables of an instance
    pub async fn get_instance_data(&self, flow_instance_id: &str) -> InstanceDataListResult {
        self.runtime_processor.get_instance_data(flow_instance_id).await
    }

    /// The lifecycle coordinator
    pub fn runtime_processor(&self) -> &RuntimeProcessor {
        &self.runtime_processor
    }

    /// The deployment service
    pub fn flow_definition_service(&self) -> &FlowDefinitionService {
        &self.flow_definition_service
    }

    /// The backing stores
    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// The instance cache
    pub fn cache(&self) -> &Arc<dyn InstanceCache> {
        &self.cache
    }
}
