//! Teardown: best-effort draining, idempotent destroy, and failure reporting.

use eksdeploy::application::services::CancelFlag;
use eksdeploy::application::services::teardown::teardown;
use eksdeploy::domain::error::{ApplyError, AuthError, DestroyError};
use eksdeploy::domain::report::{Phase, RunStatus};

use crate::mocks::{NoopReporter, StubCluster, StubInfra, request};

#[tokio::test]
async fn drains_then_destroys() {
    let infra = StubInfra::default();
    let cluster = StubCluster::default();

    let report = teardown(&infra, &cluster, &NoopReporter, &request(), &CancelFlag::new()).await;

    assert_eq!(report.status, RunStatus::Destroyed);
    assert_eq!(report.status.exit_code(), 0);
    assert_eq!(*cluster.drain_calls.lock().expect("lock"), 1);
    assert_eq!(*infra.destroy_calls.lock().expect("lock"), 1);
    let destroying = report
        .phases
        .iter()
        .find(|p| p.phase == Phase::Destroying)
        .expect("destroying phase recorded");
    assert!(destroying.detail.contains("31 resources destroyed"));
}

#[tokio::test]
async fn drain_failure_still_destroys() {
    let infra = StubInfra::default();
    let cluster = StubCluster {
        drain_error: Some(ApplyError::ToolFailed("connection timed out".into())),
        ..StubCluster::default()
    };

    let report = teardown(&infra, &cluster, &NoopReporter, &request(), &CancelFlag::new()).await;

    assert_eq!(report.status, RunStatus::Destroyed);
    assert_eq!(*infra.destroy_calls.lock().expect("lock"), 1);
    let draining = report
        .phases
        .iter()
        .find(|p| p.phase == Phase::Draining)
        .expect("draining phase recorded");
    assert!(!draining.ok);
}

#[tokio::test]
async fn unreachable_cluster_skips_drain_and_destroys() {
    let infra = StubInfra::default();
    let cluster = StubCluster {
        auth_error: Some(AuthError::UpdateFailed("cluster not found".into())),
        ..StubCluster::default()
    };

    let report = teardown(&infra, &cluster, &NoopReporter, &request(), &CancelFlag::new()).await;

    assert_eq!(report.status, RunStatus::Destroyed);
    assert_eq!(*cluster.drain_calls.lock().expect("lock"), 0);
    assert_eq!(*infra.destroy_calls.lock().expect("lock"), 1);
}

#[tokio::test]
async fn absent_infrastructure_destroys_cleanly() {
    let infra = StubInfra {
        present: false,
        destroyed: 0,
        ..StubInfra::default()
    };
    let cluster = StubCluster::default();

    let report = teardown(&infra, &cluster, &NoopReporter, &request(), &CancelFlag::new()).await;

    assert_eq!(report.status, RunStatus::Destroyed);
    assert_eq!(*cluster.drain_calls.lock().expect("lock"), 0);
    let draining = report
        .phases
        .iter()
        .find(|p| p.phase == Phase::Draining)
        .expect("draining phase recorded");
    assert!(draining.ok);
    assert!(draining.detail.contains("nothing to drain"));
    let destroying = report
        .phases
        .iter()
        .find(|p| p.phase == Phase::Destroying)
        .expect("destroying phase recorded");
    assert!(destroying.detail.contains("0 resources destroyed"));
}

#[tokio::test]
async fn destroy_failure_is_terminal() {
    let infra = StubInfra {
        destroy_error: Some(DestroyError::ToolFailed("dependency violation".into())),
        ..StubInfra::default()
    };
    let cluster = StubCluster::default();

    let report = teardown(&infra, &cluster, &NoopReporter, &request(), &CancelFlag::new()).await;

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.status.exit_code(), 1);
    assert_eq!(report.failed_phase(), Some(Phase::Destroying));
    assert!(report.next_action().contains("destroy"));
}

#[tokio::test]
async fn cancelled_before_destroy_leaves_infrastructure() {
    let infra = StubInfra::default();
    let cluster = StubCluster::default();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = teardown(&infra, &cluster, &NoopReporter, &request(), &cancel).await;

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(*infra.destroy_calls.lock().expect("lock"), 0);
}
