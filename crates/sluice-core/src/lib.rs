//!
//! Sluice Core - process lifecycle engine
//!
//! Drives instances of deployed flow models: starting them, advancing them
//! by committing user tasks, rewinding them to an earlier user task and
//! terminating them. Instance state lives behind repository traits with a
//! read-through instance cache in front.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - instances, history records and storage interfaces
pub mod domain;

/// Application services - executor, coordinator and engine facade
pub mod application;

/// Runtime settings
pub mod config;

/// Error types
pub mod error;

pub use config::RuntimeConfig;
pub use error::{CoreError, ErrorCode, ErrorKind};

pub use application::condition::{ConditionEvaluator, JmesPathConditionEvaluator};
pub use application::executor::{DefaultFlowExecutor, FlowExecutor};
pub use application::flow_definition_service::FlowDefinitionService;
pub use application::param::{CommitTaskParam, DeployFlowParam, RollbackTaskParam, StartProcessParam};
pub use application::process_engine::ProcessEngine;
pub use application::result::{
    CommitTaskResult, CommonResult, DeployFlowResult, ElementInstance, ElementInstanceListResult,
    InstanceDataListResult, NodeInstanceListResult, NodeInstanceResult, NodeInstanceView,
    RollbackTaskResult, RuntimeResult, StartProcessResult, TerminateResult,
};
pub use application::runtime_processor::RuntimeProcessor;

pub use domain::cache::InstanceCache;
pub use domain::context::ExecutionContext;
pub use domain::flow_deployment::FlowDeployment;
pub use domain::instance_data::{InstanceData, InstanceDataMap, InstanceDataSnapshot};
pub use domain::node_instance::{NodeInstance, NodeInstanceStatus};
pub use domain::process_instance::{ProcessInstance, ProcessStatus};
pub use domain::repository::{
    FlowDeploymentRepository, InstanceDataRepository, NodeInstanceRepository,
    ProcessInstanceRepository, Repositories,
};
