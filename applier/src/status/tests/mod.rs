use applier_testutils::*;
use assertables::*;
use futures::StreamExt;
use futures::stream;
use rstest::*;

use super::*;
use crate::k8s::DynamicApiSet;

fn depl_id(name: &str) -> ObjectId {
    ObjectId::new("apps", "v1", "Deployment", TEST_NAMESPACE, name)
}

fn event(id: &ObjectId, status: Status) -> StatusEvent {
    StatusEvent { id: id.clone(), status, resource: None, error: None }
}

fn deadline_event(id: &ObjectId) -> StatusEvent {
    StatusEvent { id: id.clone(), status: Status::Unknown, resource: None, error: Some(PollError::DeadlineExceeded) }
}

fn mock_poller(events: Vec<StatusEvent>) -> MockStatusPoller {
    let mut poller = MockStatusPoller::new();
    poller.expect_poll().return_once(move |_, _, _| stream::iter(events).boxed());
    poller
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_empty_is_noop() {
    let mut poller = MockStatusPoller::new();
    poller.expect_poll().never();
    assert_ok!(wait_for_set(&poller, &[], &WaitOptions::default()).await);
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_all_current() {
    let (a, b) = (depl_id("a"), depl_id("b"));
    let poller = mock_poller(vec![event(&a, Status::InProgress), event(&b, Status::Current), event(&a, Status::Current)]);
    assert_ok!(wait_for_set(&poller, &[a, b], &WaitOptions::default()).await);
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_fail_fast() {
    let (a, b) = (depl_id("a"), depl_id(TEST_DEPLOYMENT));
    // `a` never becomes ready, but fail-fast means `b` failing is enough to
    // bring the wait down immediately
    let poller = mock_poller(vec![event(&a, Status::InProgress), event(&b, Status::Failed)]);
    let opts = WaitOptions { fail_fast: true, ..Default::default() };

    let err = wait_for_set(&poller, &[a, b], &opts).await.unwrap_err();
    assert_starts_with!(err.to_string(), "failed early due to stalled resources: [");
    assert_contains!(err.to_string(), "Deployment/test/the-deployment status: 'Failed'");
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_timeout_diagnostics() {
    let (a, b) = (depl_id("ready"), depl_id("stuck"));
    let poller = mock_poller(vec![
        event(&a, Status::Current),
        event(&b, Status::InProgress),
        deadline_event(&a),
        deadline_event(&b),
    ]);

    let err = wait_for_set(&poller, &[a, b], &WaitOptions::default()).await.unwrap_err();
    let msg = err.to_string();
    assert_starts_with!(msg, "timeout waiting for: [");
    // the broadcast must not have clobbered the ready object's status
    assert_contains!(msg, "Deployment/test/stuck status: 'InProgress'");
    assert_not_contains!(msg, "Deployment/test/ready");
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_ttl_job_not_found_is_success() {
    let job = ObjectId::new("batch", "v1", "Job", TEST_NAMESPACE, "oneshot");
    let poller = mock_poller(vec![event(&job, Status::NotFound)]);
    let opts = WaitOptions { jobs_with_ttl: [job.clone()].into(), ..Default::default() };
    assert_ok!(wait_for_set(&poller, &[job], &opts).await);
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_not_found_without_ttl_times_out() {
    let job = ObjectId::new("batch", "v1", "Job", TEST_NAMESPACE, "oneshot");
    let poller = mock_poller(vec![event(&job, Status::NotFound), deadline_event(&job)]);
    let err = wait_for_set(&poller, &[job], &WaitOptions::default()).await.unwrap_err();
    assert_contains!(err.to_string(), "status: 'NotFound'");
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_suspended_objects_excluded() {
    let id = depl_id("suspended");
    let mut resource = test_deployment("suspended");
    resource.data = serde_json::json!({"spec": {"suspend": true}});
    let ev = StatusEvent { id: id.clone(), status: Status::Failed, resource: Some(resource), error: None };

    let poller = mock_poller(vec![ev]);
    assert_ok!(wait_for_set(&poller, &[id], &WaitOptions::default()).await);
}

#[rstest]
#[tokio::test]
async fn test_wait_for_set_surfaces_transport_errors() {
    let id = depl_id("flaky");
    let ev = StatusEvent {
        id: id.clone(),
        status: Status::Unknown,
        resource: None,
        error: Some(PollError::Transport("connection refused".into())),
    };
    let poller = mock_poller(vec![ev, deadline_event(&id)]);

    let err = wait_for_set(&poller, &[id], &WaitOptions::default()).await.unwrap_err();
    assert_contains!(err.to_string(), "connection refused");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_wait_for_termination_success_and_timeout() {
    let (mut fake_apiserver, client) = make_fake_apiserver();
    fake_apiserver.handle(|when, then| {
        when.path("/apis/apps/v1");
        then.json_body(apps_v1_discovery());
    });
    fake_apiserver.handle_not_found(format!("/apis/apps/v1/namespaces/{TEST_NAMESPACE}/deployments/gone"));
    fake_apiserver.handle(move |when, then| {
        when.path(format!("/apis/apps/v1/namespaces/{TEST_NAMESPACE}/deployments/lingering"));
        then.json_body(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"namespace": TEST_NAMESPACE, "name": "lingering", "resourceVersion": "1"},
        }));
    });
    fake_apiserver.build();
    let apis = DynamicApiSet::new(client);

    assert_ok!(wait_for_termination(&apis, &[depl_id("gone")], &WaitOptions::default()).await);

    let err = wait_for_termination(&apis, &[depl_id("lingering")], &WaitOptions::default()).await.unwrap_err();
    assert_contains!(err.to_string(), "timeout waiting for termination of: [Deployment/test/lingering]");
}
