use sluice_dsl::DslError;
use thiserror::Error;

/// Core error type for the Sluice runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Caller-supplied parameters are missing or malformed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A flow model failed to parse or validate
    #[error("Invalid flow model: {0}")]
    ModelInvalid(String),

    /// Flow deployment not found
    #[error("Flow deployment not found: {0}")]
    FlowDeploymentNotFound(String),

    /// Flow instance not found
    #[error("Flow instance not found: {0}")]
    FlowInstanceNotFound(String),

    /// Node instance not found
    #[error("Node instance not found: {0}")]
    NodeInstanceNotFound(String),

    /// Commit is not legal in the current state
    #[error("Commit rejected: {0}")]
    CommitRejected(String),

    /// Rollback is not legal in the current state
    #[error("Rollback rejected: {0}")]
    RollbackRejected(String),

    /// No earlier user task exists to rewind to
    #[error("No user task to roll back to: {0}")]
    NoUserTaskToRollback(String),

    /// The commit was already applied
    #[error("Reentrant commit: {0}")]
    Reentrant(String),

    /// A node instance references a key missing from its flow model
    #[error("Unknown flow element key: {0}")]
    UnknownElementKey(String),

    /// No outgoing flow of a gateway could be taken
    #[error("Gateway has no outgoing flow to take: {0}")]
    GatewayNoOutgoing(String),

    /// Flow execution error
    #[error("Flow execution error: {0}")]
    FlowExecutionError(String),

    /// Condition evaluation error
    #[error("Condition evaluation error: {0}")]
    ConditionEvaluationError(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Instance cache error
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Broad classification of failures, used to pick log severity and codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any state is touched
    Validation,
    /// A deployment, instance or node instance is absent
    NotFound,
    /// The operation is not legal for the current status
    IllegalState,
    /// A repeated commit; the response stays success-shaped
    Reentrant,
    /// Stored history and deployed model disagree
    ModelConsistency,
    /// Store, cache or graph walk failure
    System,
}

/// Numeric result codes carried by every response envelope.
///
/// Codes in `1000..2000` are success class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Operation completed
    Success = 1000,
    /// Commit against an already completed instance or task
    ReentrantWarning = 1001,
    /// Execution stopped at a user task
    CommitSuspend = 1002,
    /// Rollback restored a user task
    RollbackSuspend = 1003,
    /// Unclassified failure
    Failed = 2000,
    /// Parameters are missing or malformed
    ParamInvalid = 2001,
    /// Store, cache or other infrastructure failure
    SystemError = 2002,
    /// Model failed to parse or validate
    ModelInvalid = 3001,
    /// Node key missing from the deployed model
    ModelUnknownElementKey = 3002,
    /// Deployment not found
    GetFlowDeploymentFailed = 4001,
    /// Instance not found
    GetFlowInstanceFailed = 4002,
    /// Node instance not found
    GetNodeInstanceFailed = 4003,
    /// Commit not legal in current state
    CommitRejected = 4004,
    /// Rollback not legal in current state
    RollbackRejected = 4005,
    /// No earlier user task to rewind to
    NoUserTaskToRollback = 4006,
    /// No gateway flow could be taken
    GatewayNoOutgoing = 4007,
    /// Graph walk failed
    FlowExecutionFailed = 4008,
}

impl ErrorCode {
    /// Numeric value
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Default message for the code
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::ReentrantWarning => "reentrant warning",
            ErrorCode::CommitSuspend => "commit suspend",
            ErrorCode::RollbackSuspend => "rollback suspend",
            ErrorCode::Failed => "failed",
            ErrorCode::ParamInvalid => "param invalid",
            ErrorCode::SystemError => "system error",
            ErrorCode::ModelInvalid => "flow model invalid",
            ErrorCode::ModelUnknownElementKey => "unknown flow element key",
            ErrorCode::GetFlowDeploymentFailed => "get flow deployment failed",
            ErrorCode::GetFlowInstanceFailed => "get flow instance failed",
            ErrorCode::GetNodeInstanceFailed => "get node instance failed",
            ErrorCode::CommitRejected => "commit rejected",
            ErrorCode::RollbackRejected => "rollback rejected",
            ErrorCode::NoUserTaskToRollback => "no user task to rollback",
            ErrorCode::GatewayNoOutgoing => "gateway has no outgoing flow",
            ErrorCode::FlowExecutionFailed => "flow execution failed",
        }
    }

    /// Whether a response with this code is success class
    pub fn is_success(self) -> bool {
        (1000..2000).contains(&self.code())
    }
}

impl CoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ValidationError(_) | CoreError::ModelInvalid(_) => ErrorKind::Validation,
            CoreError::FlowDeploymentNotFound(_)
            | CoreError::FlowInstanceNotFound(_)
            | CoreError::NodeInstanceNotFound(_) => ErrorKind::NotFound,
            CoreError::CommitRejected(_)
            | CoreError::RollbackRejected(_)
            | CoreError::NoUserTaskToRollback(_) => ErrorKind::IllegalState,
            CoreError::Reentrant(_) => ErrorKind::Reentrant,
            CoreError::UnknownElementKey(_) => ErrorKind::ModelConsistency,
            CoreError::GatewayNoOutgoing(_)
            | CoreError::FlowExecutionError(_)
            | CoreError::ConditionEvaluationError(_)
            | CoreError::StateStoreError(_)
            | CoreError::CacheError(_)
            | CoreError::SerializationError(_) => ErrorKind::System,
        }
    }

    /// The result code reported for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CoreError::ValidationError(_) => ErrorCode::ParamInvalid,
            CoreError::ModelInvalid(_) => ErrorCode::ModelInvalid,
            CoreError::FlowDeploymentNotFound(_) => ErrorCode::GetFlowDeploymentFailed,
            CoreError::FlowInstanceNotFound(_) => ErrorCode::GetFlowInstanceFailed,
            CoreError::NodeInstanceNotFound(_) => ErrorCode::GetNodeInstanceFailed,
            CoreError::CommitRejected(_) => ErrorCode::CommitRejected,
            CoreError::RollbackRejected(_) => ErrorCode::RollbackRejected,
            CoreError::NoUserTaskToRollback(_) => ErrorCode::NoUserTaskToRollback,
            CoreError::Reentrant(_) => ErrorCode::ReentrantWarning,
            CoreError::UnknownElementKey(_) => ErrorCode::ModelUnknownElementKey,
            CoreError::GatewayNoOutgoing(_) => ErrorCode::GatewayNoOutgoing,
            CoreError::FlowExecutionError(_) | CoreError::ConditionEvaluationError(_) => {
                ErrorCode::FlowExecutionFailed
            }
            CoreError::StateStoreError(_)
            | CoreError::CacheError(_)
            | CoreError::SerializationError(_) => ErrorCode::SystemError,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<DslError> for CoreError {
    fn from(err: DslError) -> Self {
        match err {
            DslError::UnknownElementKey(key) => CoreError::UnknownElementKey(key),
            other => CoreError::ModelInvalid(other.to_string()),
        }
    }
}
