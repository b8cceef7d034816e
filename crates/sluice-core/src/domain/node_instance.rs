use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Node instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeInstanceStatus {
    /// Current suspension point, awaiting commit
    Active,
    /// Traversed
    Completed,
    /// The walk failed at this node
    Failed,
    /// Made obsolete by a rollback
    Disabled,
}

impl NodeInstanceStatus {
    /// Statuses that count as live history (not failed or rolled back)
    pub fn is_effective(self) -> bool {
        matches!(self, NodeInstanceStatus::Active | NodeInstanceStatus::Completed)
    }
}

impl fmt::Display for NodeInstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeInstanceStatus::Active => "ACTIVE",
            NodeInstanceStatus::Completed => "COMPLETED",
            NodeInstanceStatus::Failed => "FAILED",
            NodeInstanceStatus::Disabled => "DISABLED",
        };
        f.write_str(name)
    }
}

/// One traversal of one flow element within a process instance.
///
/// Rows are append-only; only `status` and `updated_at` change after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    /// Unique per traversal
    pub node_instance_id: String,

    /// Owning process instance
    pub flow_instance_id: String,

    /// Deployment of the owning instance
    pub flow_deploy_id: String,

    /// Flow element this traversal belongs to
    pub node_key: String,

    /// Upstream node that led here; `None` for the start event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_node_key: Option<String>,

    /// Instance-data snapshot current when this node was reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_data_id: Option<String>,

    /// Current status
    pub status: NodeInstanceStatus,

    /// Creation order within the store, assigned on insert
    pub seq: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl NodeInstance {
    /// Create a traversal record; `seq` is assigned by the store
    pub fn new(
        flow_instance_id: impl Into<String>,
        flow_deploy_id: impl Into<String>,
        node_key: impl Into<String>,
        status: NodeInstanceStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            node_instance_id: Uuid::new_v4().to_string(),
            flow_instance_id: flow_instance_id.into(),
            flow_deploy_id: flow_deploy_id.into(),
            node_key: node_key.into(),
            source_node_key: None,
            instance_data_id: None,
            status,
            seq: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the upstream node key
    pub fn with_source(mut self, source_node_key: Option<String>) -> Self {
        self.source_node_key = source_node_key;
        self
    }

    /// Set the instance-data snapshot id
    pub fn with_instance_data(mut self, instance_data_id: Option<String>) -> Self {
        self.instance_data_id = instance_data_id;
        self
    }
}
