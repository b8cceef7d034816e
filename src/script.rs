//! Scripted sessions against one engine.
//!
//! A script is a list of steps run in order against a single process
//! instance. Commit and rollback default to the task the instance is
//! currently suspended at.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_core::{
    CommitTaskParam, InstanceData, ProcessEngine, RollbackTaskParam, RuntimeResult,
    StartProcessParam,
};
use tracing::debug;

/// One scripted operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    /// Start an instance of the deployed model
    Start {
        /// Initial variables
        #[serde(default)]
        variables: Vec<InstanceData>,
    },
    /// Commit a task
    Commit {
        /// Task to commit; the current one when absent
        #[serde(default, rename = "taskInstanceId")]
        task_instance_id: Option<String>,
        /// Variables to merge
        #[serde(default)]
        variables: Vec<InstanceData>,
    },
    /// Roll back from a task
    Rollback {
        /// Task to roll back from; the current one when absent
        #[serde(default, rename = "taskInstanceId")]
        task_instance_id: Option<String>,
    },
    /// Terminate the instance
    Terminate,
    /// User-task history
    History,
    /// Element trace
    Trace,
    /// Current variables
    Data,
}

/// Output of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
    /// Position in the script
    pub step: usize,
    /// The step that ran
    #[serde(flatten)]
    pub op: Step,
    /// The engine's response
    pub result: Value,
}

/// Runs steps against one engine, tracking the current instance and task
pub struct ScriptSession<'a> {
    engine: &'a ProcessEngine,
    flow_deploy_id: String,
    flow_instance_id: Option<String>,
    active_task_id: Option<String>,
}

impl<'a> ScriptSession<'a> {
    /// Start a session against a deployment
    pub fn new(engine: &'a ProcessEngine, flow_deploy_id: impl Into<String>) -> Self {
        Self {
            engine,
            flow_deploy_id: flow_deploy_id.into(),
            flow_instance_id: None,
            active_task_id: None,
        }
    }

    /// Run every step, stopping at the first one that cannot be issued
    pub async fn run(&mut self, steps: Vec<Step>) -> Result<Vec<StepOutput>> {
        let mut outputs = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            let result = self.run_step(&step).await?;
            outputs.push(StepOutput {
                step: index + 1,
                op: step,
                result,
            });
        }
        Ok(outputs)
    }

    async fn run_step(&mut self, step: &Step) -> Result<Value> {
        debug!(?step, "Running script step");
        let value = match step {
            Step::Start { variables } => {
                let result = self
                    .engine
                    .start_process(StartProcessParam::by_deployment(
                        self.flow_deploy_id.clone(),
                        variables.clone(),
                    ))
                    .await;
                self.track(&result);
                serde_json::to_value(result)?
            }
            Step::Commit {
                task_instance_id,
                variables,
            } => {
                let flow_instance_id = self.instance()?;
                let task = self.task(task_instance_id)?;
                let result = self
                    .engine
                    .commit(CommitTaskParam::new(flow_instance_id, task, variables.clone()))
                    .await;
                self.track(&result);
                serde_json::to_value(result)?
            }
            Step::Rollback { task_instance_id } => {
                let flow_instance_id = self.instance()?;
                let task = self.task(task_instance_id)?;
                let result = self
                    .engine
                    .rollback(RollbackTaskParam::new(flow_instance_id, task))
                    .await;
                self.track(&result);
                serde_json::to_value(result)?
            }
            Step::Terminate => {
                let flow_instance_id = self.instance()?;
                serde_json::to_value(self.engine.terminate_process(&flow_instance_id).await)?
            }
            Step::History => {
                let flow_instance_id = self.instance()?;
                serde_json::to_value(self.engine.get_history_user_task_list(&flow_instance_id).await)?
            }
            Step::Trace => {
                let flow_instance_id = self.instance()?;
                serde_json::to_value(self.engine.get_history_element_list(&flow_instance_id).await)?
            }
            Step::Data => {
                let flow_instance_id = self.instance()?;
                serde_json::to_value(self.engine.get_instance_data(&flow_instance_id).await)?
            }
        };
        Ok(value)
    }

    fn track(&mut self, result: &RuntimeResult) {
        if let Some(flow_instance_id) = &result.flow_instance_id {
            self.flow_instance_id = Some(flow_instance_id.clone());
        }
        if result.common.is_success() {
            self.active_task_id = result
                .active_task_instance
                .as_ref()
                .map(|task| task.node_instance_id.clone());
        }
    }

    fn instance(&self) -> Result<String> {
        match &self.flow_instance_id {
            Some(id) => Ok(id.clone()),
            None => bail!("No process instance yet; the script must start one first"),
        }
    }

    fn task(&self, explicit: &Option<String>) -> Result<String> {
        match explicit.as_ref().or(self.active_task_id.as_ref()) {
            Some(id) => Ok(id.clone()),
            None => bail!("No suspended task to address; pass taskInstanceId"),
        }
    }
}
