//! Lifecycle coordinator
//!
//! Every operation validates its parameters, resolves instance state
//! (cache first), resolves the pinned flow model, builds an
//! [`ExecutionContext`], hands it to the executor and folds the outcome into
//! a response envelope. Errors never escape as `Err`; they become codes.
//!
//! There is no per-instance locking. Two commits that both pass the status
//! check race at the store and the last writer wins.

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::executor::FlowExecutor;
use super::flow_model_resolver::{FlowInfo, FlowModelResolver};
use super::history;
use super::param::{validate_flow_instance_id, CommitTaskParam, RollbackTaskParam, StartProcessParam};
use super::result::{
    CommitTaskResult, CommonResult, ElementInstanceListResult, InstanceDataListResult,
    NodeInstanceListResult, NodeInstanceResult, RollbackTaskResult, RuntimeResult,
    StartProcessResult, TerminateResult,
};
use crate::{
    config::RuntimeConfig,
    domain::cache::InstanceCache,
    domain::context::ExecutionContext,
    domain::instance_data::{to_data_list, to_data_map, InstanceDataMap},
    domain::process_instance::{CommitAdmission, ProcessInstance, ProcessStatus, TerminateDecision},
    domain::repository::Repositories,
    error::{ErrorCode, ErrorKind},
    CoreError,
};

/// Coordinates start, commit, rollback, terminate and history queries
pub struct RuntimeProcessor {
    repositories: Repositories,
    cache: Arc<dyn InstanceCache>,
    resolver: FlowModelResolver,
    executor: Arc<dyn FlowExecutor>,
    config: RuntimeConfig,
}

fn log_failure(operation: &str, flow_instance_id: &str, err: &CoreError) {
    let error_code = err.error_code().code();
    match err.kind() {
        ErrorKind::ModelConsistency | ErrorKind::System => error!(
            operation,
            flow_instance_id,
            error_code,
            error = %err,
            "Runtime operation failed"
        ),
        ErrorKind::Reentrant => warn!(
            operation,
            flow_instance_id,
            error = %err,
            "Reentrant commit"
        ),
        ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::IllegalState => warn!(
            operation,
            flow_instance_id,
            error_code,
            error = %err,
            "Runtime operation rejected"
        ),
    }
}

fn suspend_or_success(ctx: &ExecutionContext, suspend_code: ErrorCode) -> ErrorCode {
    if ctx.is_suspended() {
        suspend_code
    } else {
        ErrorCode::Success
    }
}

impl RuntimeProcessor {
    /// Create a new coordinator
    pub fn new(
        repositories: Repositories,
        cache: Arc<dyn InstanceCache>,
        executor: Arc<dyn FlowExecutor>,
        config: RuntimeConfig,
    ) -> Self {
        let resolver = FlowModelResolver::new(
            Arc::clone(&repositories.flow_deployments),
            Arc::clone(&cache),
            config.clone(),
        );
        Self {
            repositories,
            cache,
            resolver,
            executor,
            config,
        }
    }

    /// Start a process instance
    pub async fn start_process(&self, param: StartProcessParam) -> StartProcessResult {
        let mut slot = None;
        let outcome = self.do_start(&param, &mut slot).await;
        self.runtime_result("start_process", "", slot.as_ref(), outcome)
    }

    /// Commit data to the suspended user task of an instance
    pub async fn commit(&self, param: CommitTaskParam) -> CommitTaskResult {
        let mut slot = None;
        let outcome = self.do_commit(&param, &mut slot).await;
        self.reconcile_cache("commit", &param.flow_instance_id, &outcome).await;
        self.runtime_result("commit", &param.flow_instance_id, slot.as_ref(), outcome)
    }

    /// Roll a running instance back to its previous user task
    pub async fn rollback(&self, param: RollbackTaskParam) -> RollbackTaskResult {
        let mut slot = None;
        let outcome = self.do_rollback(&param, &mut slot).await;
        self.reconcile_cache("rollback", &param.flow_instance_id, &outcome).await;
        self.runtime_result("rollback", &param.flow_instance_id, slot.as_ref(), outcome)
    }

    /// Force an instance to `Terminated`; completed instances keep their status.
    ///
    /// Reads the store directly and always drops the cached instance.
    pub async fn terminate_process(&self, flow_instance_id: &str) -> TerminateResult {
        let mut result = TerminateResult {
            flow_instance_id: flow_instance_id.to_string(),
            ..Default::default()
        };
        if let Err(e) = validate_flow_instance_id(flow_instance_id) {
            log_failure("terminate_process", flow_instance_id, &e);
            result.common = CommonResult::from_error(&e);
            return result;
        }

        let outcome = self.do_terminate(flow_instance_id).await;

        if let Err(e) = self.invalidate_cache(flow_instance_id).await {
            error!(flow_instance_id, error = %e, "Failed to invalidate cached flow instance after terminate");
        }

        match outcome {
            Ok(status) => {
                info!(flow_instance_id, status = %status, "Terminate processed");
                result.status = Some(status);
            }
            Err(e) => {
                error!(flow_instance_id, error = %e, "Terminate failed");
                result.common = CommonResult {
                    err_code: ErrorCode::SystemError.code(),
                    err_msg: e.to_string(),
                };
            }
        }
        result
    }

    /// Effective user tasks of an instance, newest first
    pub async fn get_history_user_task_list(&self, flow_instance_id: &str) -> NodeInstanceListResult {
        match self.do_history_user_tasks(flow_instance_id).await {
            Ok(node_instance_list) => NodeInstanceListResult {
                common: CommonResult::of(ErrorCode::Success),
                node_instance_list,
            },
            Err(e) => {
                log_failure("get_history_user_task_list", flow_instance_id, &e);
                NodeInstanceListResult {
                    common: CommonResult::from_error(&e),
                    node_instance_list: Vec::new(),
                }
            }
        }
    }

    /// Chronological trace of the nodes and edges an instance traversed
    pub async fn get_history_element_list(&self, flow_instance_id: &str) -> ElementInstanceListResult {
        match self.do_element_trace(flow_instance_id).await {
            Ok(element_instance_list) => ElementInstanceListResult {
                common: CommonResult::of(ErrorCode::Success),
                element_instance_list,
            },
            Err(e) => {
                log_failure("get_history_element_list", flow_instance_id, &e);
                ElementInstanceListResult {
                    common: CommonResult::from_error(&e),
                    element_instance_list: Vec::new(),
                }
            }
        }
    }

    /// One node instance of an instance
    pub async fn get_node_instance(
        &self,
        flow_instance_id: &str,
        node_instance_id: &str,
    ) -> NodeInstanceResult {
        match self.do_get_node_instance(flow_instance_id, node_instance_id).await {
            Ok(view) => NodeInstanceResult {
                common: CommonResult::of(ErrorCode::Success),
                node_instance: Some(view),
            },
            Err(e) => {
                log_failure("get_node_instance", flow_instance_id, &e);
                NodeInstanceResult {
                    common: CommonResult::from_error(&e),
                    node_instance: None,
                }
            }
        }
    }

    /// Latest variables of an instance
    pub async fn get_instance_data(&self, flow_instance_id: &str) -> InstanceDataListResult {
        let outcome = async {
            validate_flow_instance_id(flow_instance_id)?;
            self.get_process_instance(flow_instance_id).await?;
            let (data, _) = self.latest_instance_data(flow_instance_id).await?;
            Ok::<_, CoreError>(to_data_list(&data))
        }
        .await;

        match outcome {
            Ok(variables) => InstanceDataListResult {
                common: CommonResult::of(ErrorCode::Success),
                variables,
            },
            Err(e) => {
                log_failure("get_instance_data", flow_instance_id, &e);
                InstanceDataListResult {
                    common: CommonResult::from_error(&e),
                    variables: Vec::new(),
                }
            }
        }
    }

    /// Read-through lookup of a process instance.
    ///
    /// A cache hit is trusted as is. On a miss the store is read and the
    /// cache populated. Cache failures only cost the shortcut.
    pub async fn get_process_instance(&self, flow_instance_id: &str) -> Result<ProcessInstance, CoreError> {
        let key = self.config.flow_instance_key(flow_instance_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<ProcessInstance>(&raw) {
                Ok(instance) => {
                    debug!(flow_instance_id, "Flow instance cache hit");
                    return Ok(instance);
                }
                Err(e) => warn!(flow_instance_id, error = %e, "Undecodable flow instance cache entry"),
            },
            Ok(None) => debug!(flow_instance_id, "Flow instance cache miss"),
            Err(e) => warn!(flow_instance_id, error = %e, "Flow instance cache read failed"),
        }

        let instance = self
            .repositories
            .process_instances
            .find_by_id(flow_instance_id)
            .await?
            .ok_or_else(|| CoreError::FlowInstanceNotFound(flow_instance_id.to_string()))?;
        self.cache_instance(&instance).await;
        Ok(instance)
    }

    async fn do_start(
        &self,
        param: &StartProcessParam,
        slot: &mut Option<ExecutionContext>,
    ) -> Result<ErrorCode, CoreError> {
        param.validate()?;

        let flow_info = match param.flow_deploy_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(flow_deploy_id) => self.resolver.resolve_by_deployment(flow_deploy_id).await?,
            None => {
                let flow_module_id = param.flow_module_id.as_deref().unwrap_or_default();
                self.resolver.resolve_latest_by_module(flow_module_id).await?
            }
        };

        let ctx = slot.insert(self.context_for(&flow_info, Uuid::new_v4().to_string()));
        ctx.instance_data = to_data_map(param.variables.iter().cloned());
        info!(
            flow_instance_id = %ctx.flow_instance_id,
            flow_deploy_id = %ctx.flow_deploy_id,
            "Starting flow instance"
        );

        self.executor.execute(ctx).await?;
        Ok(suspend_or_success(ctx, ErrorCode::CommitSuspend))
    }

    async fn do_commit(
        &self,
        param: &CommitTaskParam,
        slot: &mut Option<ExecutionContext>,
    ) -> Result<ErrorCode, CoreError> {
        param.validate()?;

        let instance = self.get_process_instance(&param.flow_instance_id).await?;
        let admission = instance.admit_commit()?;
        let flow_info = self.resolver.resolve_by_deployment(&instance.flow_deploy_id).await?;

        let ctx = slot.insert(self.context_for(&flow_info, instance.flow_instance_id.clone()));
        let (data, instance_data_id) = self.latest_instance_data(&instance.flow_instance_id).await?;
        ctx.instance_data = data;
        ctx.instance_data_id = instance_data_id;

        if admission == CommitAdmission::Reentrant {
            ctx.flow_instance_status = instance.status;
            return Err(CoreError::Reentrant(format!(
                "flow instance {} is already completed",
                instance.flow_instance_id
            )));
        }

        ctx.origin_node_instance_id = Some(param.task_instance_id.clone());
        ctx.commit_data = to_data_map(param.variables.iter().cloned());

        self.executor.commit(ctx).await?;
        self.cache_instance_status(&instance, ctx.flow_instance_status).await;
        Ok(suspend_or_success(ctx, ErrorCode::CommitSuspend))
    }

    async fn do_rollback(
        &self,
        param: &RollbackTaskParam,
        slot: &mut Option<ExecutionContext>,
    ) -> Result<ErrorCode, CoreError> {
        param.validate()?;

        let instance = self.get_process_instance(&param.flow_instance_id).await?;
        instance.admit_rollback()?;
        let flow_info = self.resolver.resolve_by_deployment(&instance.flow_deploy_id).await?;

        let ctx = slot.insert(self.context_for(&flow_info, instance.flow_instance_id.clone()));
        let (data, instance_data_id) = self.latest_instance_data(&instance.flow_instance_id).await?;
        ctx.instance_data = data;
        ctx.instance_data_id = instance_data_id;
        ctx.origin_node_instance_id = Some(param.task_instance_id.clone());

        self.executor.rollback(ctx).await?;
        self.cache_instance_status(&instance, ctx.flow_instance_status).await;
        Ok(ErrorCode::RollbackSuspend)
    }

    async fn do_terminate(&self, flow_instance_id: &str) -> Result<ProcessStatus, CoreError> {
        let instance = self
            .repositories
            .process_instances
            .find_by_id(flow_instance_id)
            .await?
            .ok_or_else(|| CoreError::FlowInstanceNotFound(flow_instance_id.to_string()))?;

        let decision = instance.terminate_decision();
        if decision == TerminateDecision::Terminate {
            self.repositories
                .process_instances
                .update_status(flow_instance_id, ProcessStatus::Terminated)
                .await?;
        }
        Ok(decision.reported_status())
    }

    async fn do_history_user_tasks(
        &self,
        flow_instance_id: &str,
    ) -> Result<Vec<super::result::NodeInstanceView>, CoreError> {
        let flow_info = self.flow_info_for_instance(flow_instance_id).await?;
        let nodes = self
            .repositories
            .node_instances
            .list_descending(flow_instance_id)
            .await?;
        history::user_task_history(&flow_info.flow_model, &nodes)
    }

    async fn do_element_trace(
        &self,
        flow_instance_id: &str,
    ) -> Result<Vec<super::result::ElementInstance>, CoreError> {
        let flow_info = self.flow_info_for_instance(flow_instance_id).await?;
        let nodes = self
            .repositories
            .node_instances
            .list_ascending(flow_instance_id)
            .await?;
        history::element_trace(&flow_info.flow_model, &nodes)
    }

    async fn do_get_node_instance(
        &self,
        flow_instance_id: &str,
        node_instance_id: &str,
    ) -> Result<super::result::NodeInstanceView, CoreError> {
        if node_instance_id.trim().is_empty() {
            return Err(CoreError::ValidationError("nodeInstanceId is required".to_string()));
        }
        let flow_info = self.flow_info_for_instance(flow_instance_id).await?;
        let node = self
            .repositories
            .node_instances
            .find_by_id(flow_instance_id, node_instance_id)
            .await?
            .ok_or_else(|| CoreError::NodeInstanceNotFound(node_instance_id.to_string()))?;
        history::node_instance_view(&flow_info.flow_model, &node)
    }

    async fn flow_info_for_instance(&self, flow_instance_id: &str) -> Result<FlowInfo, CoreError> {
        validate_flow_instance_id(flow_instance_id)?;
        let instance = self.get_process_instance(flow_instance_id).await?;
        self.resolver.resolve_by_deployment(&instance.flow_deploy_id).await
    }

    fn context_for(&self, flow_info: &FlowInfo, flow_instance_id: String) -> ExecutionContext {
        let deployment = &flow_info.deployment;
        ExecutionContext::new(
            &deployment.flow_deploy_id,
            &deployment.flow_module_id,
            deployment.tenant_id.clone(),
            Arc::clone(&flow_info.flow_model),
            flow_instance_id,
        )
    }

    async fn latest_instance_data(
        &self,
        flow_instance_id: &str,
    ) -> Result<(InstanceDataMap, Option<String>), CoreError> {
        match self
            .repositories
            .instance_data
            .find_recent(flow_instance_id)
            .await?
        {
            Some(snapshot) => Ok((snapshot.data_map()?, Some(snapshot.instance_data_id))),
            None => Ok((InstanceDataMap::new(), None)),
        }
    }

    async fn cache_instance(&self, instance: &ProcessInstance) {
        let raw = match serde_json::to_string(instance) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(flow_instance_id = %instance.flow_instance_id, error = %e, "Cannot encode flow instance");
                return;
            }
        };
        let key = self.config.flow_instance_key(&instance.flow_instance_id);
        if let Err(e) = self
            .cache
            .set_with_expiry(&key, raw, self.config.flow_instance_ttl())
            .await
        {
            warn!(flow_instance_id = %instance.flow_instance_id, error = %e, "Flow instance cache write failed");
        }
    }

    async fn cache_instance_status(&self, instance: &ProcessInstance, status: ProcessStatus) {
        let mut refreshed = instance.clone();
        if refreshed.status != status {
            if let Err(e) = refreshed.transition_to(status) {
                warn!(flow_instance_id = %instance.flow_instance_id, error = %e, "Not caching flow instance");
                return;
            }
        }
        self.cache_instance(&refreshed).await;
    }

    async fn invalidate_cache(&self, flow_instance_id: &str) -> Result<(), CoreError> {
        self.cache
            .delete(&self.config.flow_instance_key(flow_instance_id))
            .await
    }

    async fn reconcile_cache(
        &self,
        operation: &str,
        flow_instance_id: &str,
        outcome: &Result<ErrorCode, CoreError>,
    ) {
        let Err(err) = outcome else {
            return;
        };
        if matches!(err.kind(), ErrorKind::Validation | ErrorKind::Reentrant) {
            return;
        }
        if let Err(e) = self.invalidate_cache(flow_instance_id).await {
            warn!(operation, flow_instance_id, error = %e, "Failed to invalidate cached flow instance");
        }
    }

    fn runtime_result(
        &self,
        operation: &str,
        flow_instance_id: &str,
        ctx: Option<&ExecutionContext>,
        outcome: Result<ErrorCode, CoreError>,
    ) -> RuntimeResult {
        let common = match &outcome {
            Ok(code) => CommonResult::of(*code),
            Err(e) => {
                let id = ctx.map_or(flow_instance_id, |ctx| ctx.flow_instance_id.as_str());
                log_failure(operation, id, e);
                CommonResult::from_error(e)
            }
        };

        let mut result = RuntimeResult {
            common,
            ..Default::default()
        };
        if !flow_instance_id.is_empty() {
            result.flow_instance_id = Some(flow_instance_id.to_string());
        }

        if let Some(ctx) = ctx {
            result.flow_instance_id = Some(ctx.flow_instance_id.clone());
            result.status = Some(ctx.flow_instance_status);
            result.variables = to_data_list(&ctx.instance_data);
            result.active_task_instance = ctx
                .suspend_node_instance
                .as_ref()
                .and_then(|node| history::node_instance_view(&ctx.flow_model, node).ok());
        }
        result
    }
}
