//! Graph walk over a deployed flow model
//!
//! The executor owns node-instance creation and instance-data snapshots.
//! A walk collects its node instances first and writes them once it has
//! reached a user task or end event.
//! The coordinator owns everything about the process instance's lifecycle
//! except the final `Completed` write when a walk reaches an end event.

use async_trait::async_trait;
use sluice_dsl::{FlowElementKind, FlowModel};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::condition::ConditionEvaluator;
use crate::{
    domain::context::ExecutionContext,
    domain::instance_data::{to_json_object, InstanceDataMap, InstanceDataSnapshot},
    domain::node_instance::{NodeInstance, NodeInstanceStatus},
    domain::process_instance::{ProcessInstance, ProcessStatus},
    domain::repository::Repositories,
    CoreError,
};

/// Drives a process instance through its flow model
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    /// Create the instance and walk from the start event to the first
    /// suspension point or end event
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError>;

    /// Complete the suspended task named by `ctx.origin_node_instance_id`
    /// with `ctx.commit_data` and walk on
    async fn commit(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError>;

    /// Rewind to the nearest completed user task before
    /// `ctx.origin_node_instance_id`
    async fn rollback(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError>;
}

/// Executor for start/end events, user tasks and exclusive gateways
pub struct DefaultFlowExecutor {
    repositories: Repositories,
    evaluator: Arc<dyn ConditionEvaluator>,
    max_walk_steps: usize,
}

impl DefaultFlowExecutor {
    /// Create a new executor
    pub fn new(
        repositories: Repositories,
        evaluator: Arc<dyn ConditionEvaluator>,
        max_walk_steps: usize,
    ) -> Self {
        Self {
            repositories,
            evaluator,
            max_walk_steps,
        }
    }

    /// Walk from `current` until a user task or end event, collecting the
    /// node instances it passes into `trail`. Nothing is persisted here.
    fn walk(
        &self,
        ctx: &ExecutionContext,
        trail: &mut WalkTrail,
        mut current: String,
        mut source: Option<String>,
    ) -> Result<(), CoreError> {
        let model = Arc::clone(&ctx.flow_model);

        for _ in 0..self.max_walk_steps {
            let element = model.element(&current)?;
            debug!(
                flow_instance_id = %ctx.flow_instance_id,
                node_key = %current,
                node_type = element.kind.type_name(),
                "Visiting node"
            );

            let next = match &element.kind {
                FlowElementKind::UserTask => {
                    trail.push(ctx, &current, source.take(), NodeInstanceStatus::Active);
                    return Ok(());
                }
                FlowElementKind::EndEvent => {
                    trail.push(ctx, &current, source.take(), NodeInstanceStatus::Completed);
                    trail.completed = true;
                    return Ok(());
                }
                FlowElementKind::StartEvent => {
                    trail.push(ctx, &current, source.take(), NodeInstanceStatus::Completed);
                    single_successor(&model, &current)?
                }
                FlowElementKind::ExclusiveGateway => {
                    match self.select_gateway_target(&model, &current, &ctx.instance_data) {
                        Ok(target) => {
                            trail.push(ctx, &current, source.take(), NodeInstanceStatus::Completed);
                            target
                        }
                        Err(e) => {
                            trail.push(ctx, &current, source.take(), NodeInstanceStatus::Failed);
                            return Err(e);
                        }
                    }
                }
                FlowElementKind::SequenceFlow { .. } => {
                    return Err(CoreError::FlowExecutionError(format!(
                        "Sequence flow {} cannot be visited as a node",
                        current
                    )));
                }
            };

            source = Some(std::mem::replace(&mut current, next));
        }

        Err(CoreError::FlowExecutionError(format!(
            "Walk of flow instance {} exceeded {} steps",
            ctx.flow_instance_id, self.max_walk_steps
        )))
    }

    /// Append the trail's node instances and apply its outcome to `ctx`
    async fn persist(&self, ctx: &mut ExecutionContext, trail: WalkTrail) -> Result<(), CoreError> {
        let mut suspended = None;
        for node in trail.nodes {
            let node = self.repositories.node_instances.insert(node).await?;
            if node.status == NodeInstanceStatus::Active {
                suspended = Some(node);
            }
        }

        if trail.completed {
            self.repositories
                .process_instances
                .update_status(&ctx.flow_instance_id, ProcessStatus::Completed)
                .await?;
            ctx.flow_instance_status = ProcessStatus::Completed;
            info!(flow_instance_id = %ctx.flow_instance_id, "Flow instance completed");
        } else if let Some(node) = &suspended {
            ctx.flow_instance_status = ProcessStatus::Running;
            info!(
                flow_instance_id = %ctx.flow_instance_id,
                node_key = %node.node_key,
                node_instance_id = %node.node_instance_id,
                "Flow instance suspended at user task"
            );
        }
        ctx.suspend_node_instance = suspended;
        Ok(())
    }

    /// First conditional flow that holds, in model order; else the default flow
    fn select_gateway_target(
        &self,
        model: &FlowModel,
        gateway_key: &str,
        data: &InstanceDataMap,
    ) -> Result<String, CoreError> {
        let data = to_json_object(data);
        let mut default_target = None;

        for flow in model.outgoing(gateway_key) {
            if let FlowElementKind::SequenceFlow {
                target,
                condition,
                is_default,
                ..
            } = &flow.kind
            {
                if *is_default {
                    default_target.get_or_insert_with(|| target.clone());
                    continue;
                }
                let taken = match condition {
                    Some(expression) => self.evaluator.evaluate(expression, &data)?,
                    None => true,
                };
                if taken {
                    debug!(gateway_key, flow_key = %flow.key, "Gateway condition matched");
                    return Ok(target.clone());
                }
            }
        }

        default_target.ok_or_else(|| CoreError::GatewayNoOutgoing(gateway_key.to_string()))
    }

    async fn write_snapshot(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError> {
        let snapshot =
            InstanceDataSnapshot::new(&ctx.flow_instance_id, &ctx.flow_deploy_id, &ctx.instance_data)?;
        self.repositories.instance_data.insert(&snapshot).await?;
        ctx.instance_data_id = Some(snapshot.instance_data_id);
        Ok(())
    }

    /// Newest active user task of the instance, if any
    async fn active_task(&self, ctx: &ExecutionContext) -> Result<Option<NodeInstance>, CoreError> {
        let history = self
            .repositories
            .node_instances
            .list_descending(&ctx.flow_instance_id)
            .await?;
        for node in history {
            if node.status == NodeInstanceStatus::Active
                && ctx.flow_model.element(&node.node_key)?.kind.is_suspension_point()
            {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn origin_id(ctx: &ExecutionContext) -> Result<String, CoreError> {
        ctx.origin_node_instance_id
            .clone()
            .ok_or_else(|| CoreError::ValidationError("task instance id is required".to_string()))
    }

    async fn find_origin(&self, ctx: &ExecutionContext) -> Result<NodeInstance, CoreError> {
        let origin_id = Self::origin_id(ctx)?;
        let origin = self
            .repositories
            .node_instances
            .find_by_id(&ctx.flow_instance_id, &origin_id)
            .await?;
        origin.ok_or(CoreError::NodeInstanceNotFound(origin_id))
    }
}

/// Node instances produced by one walk, in visiting order
#[derive(Debug, Default)]
struct WalkTrail {
    nodes: Vec<NodeInstance>,
    completed: bool,
}

impl WalkTrail {
    fn push(&mut self, ctx: &ExecutionContext, node_key: &str, source: Option<String>, status: NodeInstanceStatus) {
        let node = NodeInstance::new(&ctx.flow_instance_id, &ctx.flow_deploy_id, node_key, status)
            .with_source(source)
            .with_instance_data(ctx.instance_data_id.clone());
        self.nodes.push(node);
    }
}

fn single_successor(model: &FlowModel, node_key: &str) -> Result<String, CoreError> {
    model
        .outgoing(node_key)
        .find_map(|flow| flow.endpoints())
        .map(|(_, target)| target.to_string())
        .ok_or_else(|| CoreError::FlowExecutionError(format!("Node {} has no outgoing flow", node_key)))
}

#[async_trait]
impl FlowExecutor for DefaultFlowExecutor {
    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError> {
        let instance = ProcessInstance::new(
            &ctx.flow_instance_id,
            &ctx.flow_deploy_id,
            &ctx.flow_module_id,
            ctx.tenant_id.clone(),
        );
        self.repositories.process_instances.insert(&instance).await?;
        self.write_snapshot(ctx).await?;

        // A failed start keeps its trail, failed gateway included
        let start_key = ctx.flow_model.start_event()?.key.clone();
        let mut trail = WalkTrail::default();
        let walked = self.walk(ctx, &mut trail, start_key, None);
        self.persist(ctx, trail).await?;
        walked
    }

    async fn commit(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError> {
        let node = self.find_origin(ctx).await?;
        let model = Arc::clone(&ctx.flow_model);

        if !model.element(&node.node_key)?.kind.is_suspension_point() {
            return Err(CoreError::CommitRejected(format!(
                "node {} is not a user task",
                node.node_key
            )));
        }
        match node.status {
            NodeInstanceStatus::Active => {}
            NodeInstanceStatus::Completed => {
                ctx.suspend_node_instance = self.active_task(ctx).await?;
                return Err(CoreError::Reentrant(format!(
                    "task instance {} is already completed",
                    node.node_instance_id
                )));
            }
            NodeInstanceStatus::Disabled | NodeInstanceStatus::Failed => {
                return Err(CoreError::CommitRejected(format!(
                    "task instance {} is {}",
                    node.node_instance_id, node.status
                )));
            }
        }

        // Merged variables and the completed task are only written once the
        // walk has reached its next stop; a failed walk leaves the task active
        let previous_data = ctx.instance_data.clone();
        let previous_data_id = ctx.instance_data_id.clone();
        let snapshot = if ctx.commit_data.is_empty() {
            None
        } else {
            let committed = std::mem::take(&mut ctx.commit_data);
            ctx.instance_data.extend(committed);
            let snapshot =
                InstanceDataSnapshot::new(&ctx.flow_instance_id, &ctx.flow_deploy_id, &ctx.instance_data)?;
            ctx.instance_data_id = Some(snapshot.instance_data_id.clone());
            Some(snapshot)
        };

        let mut trail = WalkTrail::default();
        let walked = match single_successor(&model, &node.node_key) {
            Ok(next) => self.walk(ctx, &mut trail, next, Some(node.node_key.clone())),
            Err(e) => Err(e),
        };
        if let Err(e) = walked {
            warn!(
                flow_instance_id = %ctx.flow_instance_id,
                node_instance_id = %node.node_instance_id,
                error = %e,
                "Commit walk failed, task left active"
            );
            ctx.instance_data = previous_data;
            ctx.instance_data_id = previous_data_id;
            ctx.suspend_node_instance = Some(node);
            return Err(e);
        }

        if let Some(snapshot) = &snapshot {
            self.repositories.instance_data.insert(snapshot).await?;
        }
        self.repositories
            .node_instances
            .update_status(&node.node_instance_id, NodeInstanceStatus::Completed)
            .await?;
        self.persist(ctx, trail).await
    }

    async fn rollback(&self, ctx: &mut ExecutionContext) -> Result<(), CoreError> {
        let origin = self.find_origin(ctx).await?;
        if !origin.status.is_effective() {
            return Err(CoreError::RollbackRejected(format!(
                "node instance {} is {}",
                origin.node_instance_id, origin.status
            )));
        }

        let model = Arc::clone(&ctx.flow_model);
        let history = self
            .repositories
            .node_instances
            .list_descending(&ctx.flow_instance_id)
            .await?;

        let mut target = None;
        for node in history
            .iter()
            .skip_while(|node| node.node_instance_id != origin.node_instance_id)
            .skip(1)
        {
            let element = model.element(&node.node_key)?;
            if element.kind.is_suspension_point() && node.status == NodeInstanceStatus::Completed {
                target = Some(node);
                break;
            }
        }
        let target = target.ok_or_else(|| {
            CoreError::NoUserTaskToRollback(format!(
                "no completed user task before node instance {}",
                origin.node_instance_id
            ))
        })?;

        for node in history
            .iter()
            .filter(|node| node.seq > target.seq && node.status.is_effective())
        {
            self.repositories
                .node_instances
                .update_status(&node.node_instance_id, NodeInstanceStatus::Disabled)
                .await?;
        }

        if let Some(instance_data_id) = &target.instance_data_id {
            let snapshot = self
                .repositories
                .instance_data
                .find_by_id(&ctx.flow_instance_id, instance_data_id)
                .await?
                .ok_or_else(|| {
                    CoreError::StateStoreError(format!("instance data {} is missing", instance_data_id))
                })?;
            ctx.instance_data = snapshot.data_map()?;
            self.write_snapshot(ctx).await?;
        }

        let restored = NodeInstance::new(
            &ctx.flow_instance_id,
            &ctx.flow_deploy_id,
            &target.node_key,
            NodeInstanceStatus::Active,
        )
        .with_source(target.source_node_key.clone())
        .with_instance_data(target.instance_data_id.clone());
        let restored = self.repositories.node_instances.insert(restored).await?;

        info!(
            flow_instance_id = %ctx.flow_instance_id,
            node_key = %restored.node_key,
            node_instance_id = %restored.node_instance_id,
            "Rolled back to user task"
        );
        ctx.suspend_node_instance = Some(restored);
        ctx.flow_instance_status = ProcessStatus::Running;
        Ok(())
    }
}
