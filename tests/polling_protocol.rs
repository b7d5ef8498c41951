//! Cross region/account polling protocol.

mod common;

use common::{invocation, resumption_token, Harness};
use serde_json::json;
use stack_reconciler::constants::STACK_RESOURCE_TYPE;
use stack_reconciler::deploy::DeployOutcome;
use stack_reconciler::error::{BackendError, ReconcilerError};
use stack_reconciler::events::CompletionOutcome;
use stack_reconciler::models::{DesiredState, StackConfiguration};
use stack_reconciler::testing::BackendCall;
use stack_reconciler::workflow::FailureCode;
use tokio_test::{assert_err, assert_ok};

fn remote_network() -> StackConfiguration {
    StackConfiguration::new("network", "https://bucket.s3.amazonaws.com/network.yaml")
        .with_region("us-east-1")
}

fn mutations(harness: &Harness) -> usize {
    harness
        .backend
        .calls()
        .iter()
        .filter(|call| {
            matches!(
                call,
                BackendCall::Create(_) | BackendCall::Update(_) | BackendCall::Delete(_)
            )
        })
        .count()
}

#[tokio::test]
async fn test_polling_converges_on_first_terminal_observation() {
    let harness = Harness::new();

    // first invocation creates
    let first = assert_ok!(harness.handler.deploy(&invocation(remote_network(), "alpha")).await);
    assert!(first.is_in_progress());
    let BackendCall::Create(request) = &harness.backend.calls()[0] else {
        panic!("expected create");
    };
    assert!(request.notification_arns.is_empty());
    assert_eq!(request.location.region.as_deref(), Some("us-east-1"));

    // retries while the backend works
    for _ in 0..3 {
        let context = invocation(remote_network(), "alpha");
        let retry = assert_ok!(harness.handler.deploy(&context).await);
        assert!(retry.is_in_progress());
    }
    assert_eq!(mutations(&harness), 1);

    harness.backend.set_outputs("network", &[("VpcId", "vpc-123")]);
    harness.backend.finish_operation("network", "CREATE_COMPLETE");

    let done = assert_ok!(harness.handler.deploy(&invocation(remote_network(), "alpha")).await);
    assert_eq!(
        done,
        DeployOutcome::Completed(CompletionOutcome::Succeeded {
            payload: json!({"VpcId": "vpc-123"})
        })
    );
    assert_eq!(mutations(&harness), 1);

    let reports = harness.workflow.failures();
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|(_, message, code)| {
        *code == FailureCode::IsExecuting && message == "Is in progress"
    }));
    assert_eq!(
        harness.workflow.successes(),
        vec![(resumption_token("alpha"), json!({"VpcId": "vpc-123"}))]
    );
}

#[tokio::test]
async fn test_new_execution_updates_existing_stack_once() {
    let harness = Harness::new();
    harness
        .backend
        .seed_stack("network", "UPDATE_COMPLETE", Some("previous1700000000000"));
    let context = invocation(remote_network(), "beta");

    let outcome = assert_ok!(harness.handler.deploy(&context).await);

    assert!(outcome.is_in_progress());
    let calls = harness.backend.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], BackendCall::Update(_)));

    let record = harness.record_for(&context).await.unwrap();
    assert_eq!(record.resumption_token, None);
    assert_eq!(record.stack_id, harness.backend.stack_id("network"));
    assert_eq!(record.region, "us-east-1");

    let retry = assert_ok!(harness.handler.deploy(&invocation(remote_network(), "beta")).await);
    assert!(retry.is_in_progress());
    assert_eq!(mutations(&harness), 1);
}

#[tokio::test]
async fn test_foreign_token_on_owned_record_is_contention() {
    let harness = Harness::new();
    harness
        .backend
        .seed_stack("network", "UPDATE_COMPLETE", Some("previous1700000000000"));
    assert_ok!(harness.handler.deploy(&invocation(remote_network(), "beta")).await);

    // another orchestrator starts its own update of the same stack
    harness.backend.push_event(
        "network",
        "network",
        STACK_RESOURCE_TYPE,
        "UPDATE_IN_PROGRESS",
        None,
        Some("gamma1700000009999"),
    );

    let err = assert_err!(harness.handler.deploy(&invocation(remote_network(), "beta")).await);

    let ReconcilerError::StackContention { stack_name, observed_token } = err else {
        panic!("expected contention, got {err:?}");
    };
    assert_eq!(stack_name, "network");
    assert_eq!(observed_token, "gamma1700000009999");
    assert_eq!(harness.workflow.last().unwrap().token(), resumption_token("beta"));
    assert_eq!(harness.workflow.failures().last().unwrap().2, FailureCode::StackContention);
    assert_eq!(mutations(&harness), 1);
}

#[tokio::test]
async fn test_remote_delete_of_absent_stack_is_synthetic_success() {
    let harness = Harness::new();
    let context = invocation(
        remote_network().with_desired_state(DesiredState::Deleted),
        "alpha",
    );

    let outcome = assert_ok!(harness.handler.deploy(&context).await);

    assert_eq!(
        outcome,
        DeployOutcome::Completed(CompletionOutcome::Succeeded { payload: json!({}) })
    );
    assert!(harness.backend.calls().is_empty());
    assert!(harness.store.is_empty());
    assert_eq!(harness.workflow.successes(), vec![(resumption_token("alpha"), json!({}))]);
}

#[tokio::test]
async fn test_remote_delete_runs_to_completion() {
    let harness = Harness::new();
    harness
        .backend
        .seed_stack("network", "UPDATE_COMPLETE", Some("previous1700000000000"));
    let configuration = remote_network().with_desired_state(DesiredState::Deleted);

    let context = invocation(configuration, "alpha");
    let first = assert_ok!(harness.handler.deploy(&context).await);
    assert!(first.is_in_progress());
    assert!(matches!(harness.backend.calls()[0], BackendCall::Delete(_)));
    assert_eq!(harness.store.len(), 1);

    let retry = assert_ok!(harness.handler.deploy(&context).await);
    assert!(retry.is_in_progress());

    harness.backend.finish_operation("network", "DELETE_COMPLETE");
    let done = assert_ok!(harness.handler.deploy(&context).await);

    assert_eq!(
        done,
        DeployOutcome::Completed(CompletionOutcome::Succeeded { payload: json!({}) })
    );
    assert!(harness.store.is_empty());
    assert_eq!(mutations(&harness), 1);
}

#[tokio::test]
async fn test_local_delete_without_channel_is_polled() {
    let harness = Harness::new();
    harness
        .backend
        .seed_stack("network", "UPDATE_COMPLETE", Some("previous1700000000000"));
    let configuration = StackConfiguration::new("network", "https://bucket/network.yaml")
        .with_desired_state(DesiredState::Deleted);

    let outcome = assert_ok!(harness.handler.deploy(&invocation(configuration, "alpha")).await);

    assert!(outcome.is_in_progress());
    let BackendCall::Delete(request) = &harness.backend.calls()[0] else {
        panic!("expected delete");
    };
    assert_eq!(request.location.region, None);
}

#[tokio::test]
async fn test_failed_remote_update_reports_resolved_error() {
    let harness = Harness::new();
    harness
        .backend
        .seed_stack("network", "UPDATE_COMPLETE", Some("previous1700000000000"));
    assert_ok!(harness.handler.deploy(&invocation(remote_network(), "alpha")).await);

    let token = harness.backend.last_token("network").unwrap();
    harness.backend.push_event(
        "network",
        "Subnet",
        "AWS::EC2::Subnet",
        "UPDATE_FAILED",
        Some("Subnet quota exceeded"),
        Some(&token),
    );
    harness.backend.finish_operation("network", "UPDATE_ROLLBACK_COMPLETE");

    let outcome = assert_ok!(harness.handler.deploy(&invocation(remote_network(), "alpha")).await);

    assert_eq!(
        outcome,
        DeployOutcome::Completed(CompletionOutcome::Failed {
            code: FailureCode::StackStatus("UPDATE_FAILED".to_string()),
            message: "Subnet quota exceeded".to_string(),
        })
    );
    assert_eq!(
        harness.error_log.execution_errors()[0].1,
        "Step: Deploy-network failed with error: Subnet quota exceeded"
    );
}

#[tokio::test]
async fn test_remote_rollback_complete_is_deleted() {
    let harness = Harness::new();
    harness
        .backend
        .seed_stack("network", "ROLLBACK_COMPLETE", Some("previous1700000000000"));
    harness.backend.fail_next_update(BackendError::new(
        "ValidationError",
        "Stack:arn:aws:cloudformation:us-east-1:111111111111:stack/network/1 is in ROLLBACK_COMPLETE state and can not be updated.",
    ));

    let outcome = assert_ok!(harness.handler.deploy(&invocation(remote_network(), "alpha")).await);

    assert!(matches!(
        outcome,
        DeployOutcome::Failed { code: FailureCode::RollBackCompleteState, .. }
    ));
    assert!(matches!(harness.backend.calls()[1], BackendCall::Delete(_)));
}

#[tokio::test]
async fn test_describe_failure_is_classified() {
    let harness = Harness::new();
    harness.backend.fail_next_describe_events(BackendError::new(
        "AccessDenied",
        "not authorized to assume role",
    ));

    let err = assert_err!(harness.handler.deploy(&invocation(remote_network(), "alpha")).await);

    assert!(matches!(err, ReconcilerError::AccessDenied(_)));
    assert_eq!(harness.workflow.failures()[0].2, FailureCode::AccessDenied);
}
