use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Process instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    /// Executing or suspended at a user task
    Running,

    /// Reached an end event
    Completed,

    /// Forcibly stopped
    Terminated,
}

impl ProcessStatus {
    /// Whether no further lifecycle operation may change this status
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Completed | ProcessStatus::Terminated)
    }

    /// Legal status transitions. Rollback never leaves `Running`.
    pub fn can_transition_to(self, next: ProcessStatus) -> bool {
        match self {
            ProcessStatus::Running => true,
            ProcessStatus::Completed | ProcessStatus::Terminated => self == next,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessStatus::Running => "RUNNING",
            ProcessStatus::Completed => "COMPLETED",
            ProcessStatus::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// What a commit against an instance should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAdmission {
    /// Resume from the current suspension point
    Proceed,
    /// The instance already completed; answer success-shaped
    Reentrant,
}

/// What a terminate request should do to the stored instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateDecision {
    /// Write `Terminated` to the store
    Terminate,
    /// Already terminated; nothing to write
    AlreadyTerminated,
    /// Completed instances keep their status
    KeepCompleted,
}

impl TerminateDecision {
    /// Status reported to the caller
    pub fn reported_status(self) -> ProcessStatus {
        match self {
            TerminateDecision::Terminate | TerminateDecision::AlreadyTerminated => {
                ProcessStatus::Terminated
            }
            TerminateDecision::KeepCompleted => ProcessStatus::Completed,
        }
    }
}

/// Aggregate: one execution of a deployed flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    /// Unique identifier
    pub flow_instance_id: String,

    /// Deployment pinned for the instance's whole lifetime
    pub flow_deploy_id: String,

    /// Module of that deployment
    pub flow_module_id: String,

    /// Owning tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Current status
    pub status: ProcessStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ProcessInstance {
    /// Create a new running instance
    pub fn new(
        flow_instance_id: impl Into<String>,
        flow_deploy_id: impl Into<String>,
        flow_module_id: impl Into<String>,
        tenant_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            flow_instance_id: flow_instance_id.into(),
            flow_deploy_id: flow_deploy_id.into(),
            flow_module_id: flow_module_id.into(),
            tenant_id,
            status: ProcessStatus::Running,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether a commit may run against this instance
    pub fn admit_commit(&self) -> Result<CommitAdmission, CoreError> {
        match self.status {
            ProcessStatus::Running => Ok(CommitAdmission::Proceed),
            ProcessStatus::Completed => Ok(CommitAdmission::Reentrant),
            ProcessStatus::Terminated => Err(CoreError::CommitRejected(format!(
                "flow instance {} is terminated",
                self.flow_instance_id
            ))),
        }
    }

    /// Check whether a rollback may run against this instance
    pub fn admit_rollback(&self) -> Result<(), CoreError> {
        if self.status != ProcessStatus::Running {
            return Err(CoreError::RollbackRejected(format!(
                "flow instance {} is {}, not RUNNING",
                self.flow_instance_id, self.status
            )));
        }
        Ok(())
    }

    /// Decide what terminate does to this instance
    pub fn terminate_decision(&self) -> TerminateDecision {
        match self.status {
            ProcessStatus::Running => TerminateDecision::Terminate,
            ProcessStatus::Terminated => TerminateDecision::AlreadyTerminated,
            ProcessStatus::Completed => TerminateDecision::KeepCompleted,
        }
    }

    /// Move to a new status, enforcing the transition rules
    pub fn transition_to(&mut self, next: ProcessStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::FlowExecutionError(format!(
                "Cannot move flow instance {} from {} to {}",
                self.flow_instance_id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
