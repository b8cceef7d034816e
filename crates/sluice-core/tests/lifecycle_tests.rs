mod common;

use common::*;
use serde_json::json;
use sluice_core::{
    CommitTaskParam, ErrorCode, NodeInstanceStatus, ProcessStatus, RollbackTaskParam,
    StartProcessParam,
};

#[tokio::test]
async fn test_start_then_commit_to_completion() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("request", vars(&[("x", json!(1))])))
        .await;
    assert_eq!(started.common.err_code, ErrorCode::CommitSuspend.code());
    assert!(started.common.is_success());
    assert_eq!(started.status, Some(ProcessStatus::Running));
    let task = started.active_task_instance.expect("suspended at A");
    assert_eq!(task.model_key, "A");
    assert_eq!(task.model_name, "Submit request");
    assert_eq!(var_pairs(&started.variables), vec![("x".to_string(), json!(1))]);

    let flow_instance_id = started.flow_instance_id.unwrap();
    let committed = engine
        .commit(CommitTaskParam::new(
            &flow_instance_id,
            &task.node_instance_id,
            vars(&[("x", json!(2))]),
        ))
        .await;
    assert_eq!(committed.common.err_code, ErrorCode::Success.code());
    assert_eq!(committed.status, Some(ProcessStatus::Completed));
    assert!(committed.active_task_instance.is_none());
    assert_eq!(var_pairs(&committed.variables), vec![("x".to_string(), json!(2))]);
}

#[tokio::test]
async fn test_start_then_read_variables() {
    let engine = engine();
    let flow_deploy_id = deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_deployment(
            flow_deploy_id,
            vars(&[("b", json!("two")), ("a", json!(1))]),
        ))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();

    let data = engine.get_instance_data(&flow_instance_id).await;
    assert!(data.common.is_success());
    let mut pairs = var_pairs(&data.variables);
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        pairs,
        vec![("a".to_string(), json!(1)), ("b".to_string(), json!("two"))]
    );
}

#[tokio::test]
async fn test_start_param_errors() {
    let engine = engine();

    let both = StartProcessParam {
        flow_deploy_id: Some("fd".to_string()),
        flow_module_id: Some("fm".to_string()),
        variables: vec![],
    };
    let result = engine.start_process(both).await;
    assert_eq!(result.common.err_code, ErrorCode::ParamInvalid.code());
    assert!(result.flow_instance_id.is_none());

    let result = engine
        .start_process(StartProcessParam::by_deployment("missing", vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::GetFlowDeploymentFailed.code());

    let result = engine
        .start_process(StartProcessParam::by_module("missing", vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::GetFlowDeploymentFailed.code());
}

#[tokio::test]
async fn test_commit_on_completed_instance_is_reentrant() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("request", vars(&[("x", json!(1))])))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();
    let task_id = started.active_task_instance.unwrap().node_instance_id;

    let param = CommitTaskParam::new(&flow_instance_id, &task_id, vars(&[("x", json!(2))]));
    let first = engine.commit(param.clone()).await;
    assert_eq!(first.status, Some(ProcessStatus::Completed));

    let again = engine.commit(param).await;
    assert_eq!(again.common.err_code, ErrorCode::ReentrantWarning.code());
    assert!(again.common.is_success());
    assert_eq!(again.flow_instance_id.as_deref(), Some(flow_instance_id.as_str()));
    assert_eq!(again.status, Some(ProcessStatus::Completed));
    assert_eq!(var_pairs(&again.variables), var_pairs(&first.variables));
    assert_eq!(again.active_task_instance, first.active_task_instance);
}

#[tokio::test]
async fn test_commit_on_completed_task_is_reentrant() {
    let engine = engine();
    deploy(&engine, "review", TWO_TASKS).await;

    let started = engine
        .start_process(StartProcessParam::by_module("review", vec![]))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();
    let task_a = started.active_task_instance.unwrap().node_instance_id;

    let param = CommitTaskParam::new(&flow_instance_id, &task_a, vars(&[("y", json!(true))]));
    let first = engine.commit(param.clone()).await;
    assert_eq!(first.active_task_instance.as_ref().unwrap().model_key, "B");

    let task_b = first.active_task_instance.clone().unwrap();

    let again = engine.commit(param).await;
    assert_eq!(again.common.err_code, ErrorCode::ReentrantWarning.code());
    assert_eq!(again.status, Some(ProcessStatus::Running));
    assert_eq!(again.active_task_instance, Some(task_b));
    assert_eq!(var_pairs(&again.variables), vec![("y".to_string(), json!(true))]);

    let history = engine.get_history_user_task_list(&flow_instance_id).await;
    assert_eq!(history.node_instance_list.len(), 2);
}

#[tokio::test]
async fn test_failed_commit_leaves_task_active() {
    let engine = engine();
    deploy(&engine, "gated", GATED_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("gated", vars(&[("x", json!(0))])))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();
    let task = started.active_task_instance.unwrap();

    let failed = engine
        .commit(CommitTaskParam::new(&flow_instance_id, &task.node_instance_id, vars(&[("x", json!(2))])))
        .await;
    assert_eq!(failed.common.err_code, ErrorCode::GatewayNoOutgoing.code());
    assert_eq!(failed.status, Some(ProcessStatus::Running));
    assert_eq!(failed.active_task_instance.as_ref(), Some(&task));
    assert_eq!(var_pairs(&failed.variables), vec![("x".to_string(), json!(0))]);

    let history = engine.get_history_user_task_list(&flow_instance_id).await;
    let tasks: Vec<(&str, NodeInstanceStatus)> = history
        .node_instance_list
        .iter()
        .map(|view| (view.model_key.as_str(), view.status))
        .collect();
    assert_eq!(tasks, vec![("A", NodeInstanceStatus::Active)]);
    let data = engine.get_instance_data(&flow_instance_id).await;
    assert_eq!(var_pairs(&data.variables), vec![("x".to_string(), json!(0))]);
    let trace = engine.get_history_element_list(&flow_instance_id).await;
    assert_eq!(trace.element_instance_list.len(), 3);

    let retried = engine
        .commit(CommitTaskParam::new(&flow_instance_id, &task.node_instance_id, vars(&[("x", json!(1))])))
        .await;
    assert_eq!(retried.common.err_code, ErrorCode::Success.code());
    assert_eq!(retried.status, Some(ProcessStatus::Completed));
    let data = engine.get_instance_data(&flow_instance_id).await;
    assert_eq!(var_pairs(&data.variables), vec![("x".to_string(), json!(1))]);
}

#[tokio::test]
async fn test_commit_on_terminated_instance_leaves_store_untouched() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("request", vars(&[("x", json!(1))])))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();
    let task_id = started.active_task_instance.unwrap().node_instance_id;

    let terminated = engine.terminate_process(&flow_instance_id).await;
    assert_eq!(terminated.status, Some(ProcessStatus::Terminated));

    let repositories = engine.repositories();
    let nodes_before = repositories
        .node_instances
        .list_ascending(&flow_instance_id)
        .await
        .unwrap();
    let data_before = repositories
        .instance_data
        .find_recent(&flow_instance_id)
        .await
        .unwrap();

    let result = engine
        .commit(CommitTaskParam::new(&flow_instance_id, &task_id, vars(&[("x", json!(9))])))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::CommitRejected.code());
    assert!(!result.common.is_success());

    let nodes_after = repositories
        .node_instances
        .list_ascending(&flow_instance_id)
        .await
        .unwrap();
    let data_after = repositories
        .instance_data
        .find_recent(&flow_instance_id)
        .await
        .unwrap();
    assert_eq!(nodes_before, nodes_after);
    assert_eq!(data_before, data_after);

    let instance = repositories
        .process_instances
        .find_by_id(&flow_instance_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(instance.status, ProcessStatus::Terminated);
}

#[tokio::test]
async fn test_commit_rejects_unknown_and_non_task_nodes() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();

    let result = engine
        .commit(CommitTaskParam::new(&flow_instance_id, "no-such-node", vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::GetNodeInstanceFailed.code());

    let trace = engine.get_history_element_list(&flow_instance_id).await;
    let start_node = trace.element_instance_list[0].node_instance_id.clone().unwrap();
    let result = engine
        .commit(CommitTaskParam::new(&flow_instance_id, start_node, vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::CommitRejected.code());

    let result = engine
        .commit(CommitTaskParam::new("", "whatever", vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::ParamInvalid.code());

    let result = engine
        .commit(CommitTaskParam::new("no-such-instance", "whatever", vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::GetFlowInstanceFailed.code());
}

#[tokio::test]
async fn test_rollback_restores_previous_task_and_its_variables() {
    let engine = engine();
    deploy(&engine, "review", TWO_TASKS).await;

    let started = engine
        .start_process(StartProcessParam::by_module("review", vars(&[("x", json!(1))])))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();
    let task_a = started.active_task_instance.unwrap().node_instance_id;

    let committed = engine
        .commit(CommitTaskParam::new(&flow_instance_id, &task_a, vars(&[("x", json!(2))])))
        .await;
    let task_b = committed.active_task_instance.unwrap();
    assert_eq!(task_b.model_key, "B");

    let rolled_back = engine
        .rollback(RollbackTaskParam::new(&flow_instance_id, &task_b.node_instance_id))
        .await;
    assert_eq!(rolled_back.common.err_code, ErrorCode::RollbackSuspend.code());
    assert_eq!(rolled_back.status, Some(ProcessStatus::Running));
    let restored = rolled_back.active_task_instance.unwrap();
    assert_eq!(restored.model_key, "A");
    assert_ne!(restored.node_instance_id, task_a);
    assert_eq!(var_pairs(&rolled_back.variables), vec![("x".to_string(), json!(1))]);

    let data = engine.get_instance_data(&flow_instance_id).await;
    assert_eq!(var_pairs(&data.variables), vec![("x".to_string(), json!(1))]);

    let history = engine.get_history_user_task_list(&flow_instance_id).await;
    let summary: Vec<(&str, NodeInstanceStatus)> = history
        .node_instance_list
        .iter()
        .map(|view| (view.model_key.as_str(), view.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("A", NodeInstanceStatus::Active),
            ("A", NodeInstanceStatus::Completed),
        ]
    );

    let node_b = engine
        .get_node_instance(&flow_instance_id, &task_b.node_instance_id)
        .await;
    assert_eq!(node_b.node_instance.unwrap().status, NodeInstanceStatus::Disabled);

    let result = engine
        .commit(CommitTaskParam::new(&flow_instance_id, &task_b.node_instance_id, vec![]))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::CommitRejected.code());

    let resumed = engine
        .commit(CommitTaskParam::new(&flow_instance_id, &restored.node_instance_id, vec![]))
        .await;
    assert_eq!(resumed.active_task_instance.unwrap().model_key, "B");
}

#[tokio::test]
async fn test_rollback_without_earlier_task() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();
    let task_id = started.active_task_instance.unwrap().node_instance_id;

    let result = engine
        .rollback(RollbackTaskParam::new(&flow_instance_id, &task_id))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::NoUserTaskToRollback.code());
}

#[tokio::test]
async fn test_rollback_requires_running_instance() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let completed = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let completed_id = completed.flow_instance_id.unwrap();
    let task_id = completed.active_task_instance.unwrap().node_instance_id;
    engine
        .commit(CommitTaskParam::new(&completed_id, &task_id, vec![]))
        .await;

    let result = engine
        .rollback(RollbackTaskParam::new(&completed_id, &task_id))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::RollbackRejected.code());

    let terminated = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let terminated_id = terminated.flow_instance_id.unwrap();
    let task_id = terminated.active_task_instance.unwrap().node_instance_id;
    engine.terminate_process(&terminated_id).await;

    let result = engine
        .rollback(RollbackTaskParam::new(&terminated_id, &task_id))
        .await;
    assert_eq!(result.common.err_code, ErrorCode::RollbackRejected.code());
}

#[tokio::test]
async fn test_element_trace_synthesizes_edges() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let started = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let flow_instance_id = started.flow_instance_id.unwrap();

    let trace = engine.get_history_element_list(&flow_instance_id).await;
    assert!(trace.common.is_success());
    let summary: Vec<(&str, NodeInstanceStatus)> = trace
        .element_instance_list
        .iter()
        .map(|entry| (entry.element_key.as_str(), entry.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Start", NodeInstanceStatus::Completed),
            ("F1", NodeInstanceStatus::Completed),
            ("A", NodeInstanceStatus::Active),
        ]
    );
    assert!(trace.element_instance_list[1].node_instance_id.is_none());
}

#[tokio::test]
async fn test_queries_on_missing_instance() {
    let engine = engine();

    let history = engine.get_history_user_task_list("missing").await;
    assert_eq!(history.common.err_code, ErrorCode::GetFlowInstanceFailed.code());

    let trace = engine.get_history_element_list("").await;
    assert_eq!(trace.common.err_code, ErrorCode::ParamInvalid.code());

    let data = engine.get_instance_data("missing").await;
    assert_eq!(data.common.err_code, ErrorCode::GetFlowInstanceFailed.code());
}

#[tokio::test]
async fn test_instances_stay_pinned_to_their_deployment() {
    let engine = engine();
    deploy(&engine, "request", SINGLE_TASK).await;

    let old = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let old_id = old.flow_instance_id.unwrap();
    let old_task = old.active_task_instance.unwrap().node_instance_id;

    deploy(&engine, "request", TWO_TASKS).await;

    let finished = engine
        .commit(CommitTaskParam::new(&old_id, &old_task, vec![]))
        .await;
    assert_eq!(finished.status, Some(ProcessStatus::Completed));

    let new = engine
        .start_process(StartProcessParam::by_module("request", vec![]))
        .await;
    let new_id = new.flow_instance_id.unwrap();
    let new_task = new.active_task_instance.unwrap().node_instance_id;
    let next = engine
        .commit(CommitTaskParam::new(&new_id, &new_task, vec![]))
        .await;
    assert_eq!(next.active_task_instance.unwrap().model_key, "B");
}
