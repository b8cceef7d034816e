//! Read-only views over node-instance history.
//!
//! Every row is resolved against the flow model before any filtering, so a
//! key missing from the model fails the whole view instead of dropping rows.

use sluice_dsl::FlowModel;

use super::result::{ElementInstance, NodeInstanceView};
use crate::domain::node_instance::{NodeInstance, NodeInstanceStatus};
use crate::CoreError;

/// Effective user-task instances, in the order given (callers pass newest first)
pub fn user_task_history(
    model: &FlowModel,
    history: &[NodeInstance],
) -> Result<Vec<NodeInstanceView>, CoreError> {
    let mut views = Vec::new();
    for node in history {
        let element = model.element(&node.node_key)?;
        if element.kind.is_suspension_point() && node.status.is_effective() {
            views.push(NodeInstanceView::new(node, element));
        }
    }
    Ok(views)
}

/// Nodes in the order given (callers pass oldest first), each preceded by
/// the sequence flow that led to it.
///
/// An edge mirrors its destination's status, except that an `Active`
/// destination still yields a `Completed` edge.
pub fn element_trace(
    model: &FlowModel,
    history: &[NodeInstance],
) -> Result<Vec<ElementInstance>, CoreError> {
    let mut trace = Vec::with_capacity(history.len() * 2);
    for node in history {
        model.element(&node.node_key)?;

        let source = node
            .source_node_key
            .as_deref()
            .filter(|source| !source.trim().is_empty());
        if let Some(source) = source {
            let edge = model.sequence_flow_between(source, &node.node_key).ok_or_else(|| {
                CoreError::UnknownElementKey(format!("{}->{}", source, node.node_key))
            })?;
            let status = match node.status {
                NodeInstanceStatus::Active => NodeInstanceStatus::Completed,
                other => other,
            };
            trace.push(ElementInstance {
                element_key: edge.key.clone(),
                status,
                node_instance_id: None,
            });
        }

        trace.push(ElementInstance {
            element_key: node.node_key.clone(),
            status: node.status,
            node_instance_id: Some(node.node_instance_id.clone()),
        });
    }
    Ok(trace)
}

/// A single node instance with its element
pub fn node_instance_view(model: &FlowModel, node: &NodeInstance) -> Result<NodeInstanceView, CoreError> {
    let element = model.element(&node.node_key)?;
    Ok(NodeInstanceView::new(node, element))
}
