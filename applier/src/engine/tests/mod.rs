
use std::time::Duration;

use applier_testutils::*;
use serde_json::json;

use super::*;
use crate::errors::*;
use crate::prelude::*;

pub fn make_manager(client: kube::Client) -> ResourceManager {
    ResourceManager::new(client, test_owner())
}

// Scripted apiserver for flows where the same endpoint has to answer
// differently over time (force-recreate, staged waits); see expect_request.
pub type MockApiHandle = tower_test::mock::Handle<http::Request<kube::client::Body>, http::Response<kube::client::Body>>;

pub fn make_mock_manager() -> (ResourceManager, MockApiHandle) {
    let (mock_service, handle) = tower_test::mock::pair();
    let client = kube::Client::new(mock_service, "default");
    (make_manager(client), handle)
}

// Assert the next request in the script and answer it.  `dry_run` of
// Some(true)/Some(false) additionally asserts the presence/absence of the
// dryRun=All query parameter, which is what tells the two apply phases apart.
pub async fn expect_request(
    handle: &mut MockApiHandle,
    method: http::Method,
    path: &str,
    dry_run: Option<bool>,
    status: u16,
    body: &serde_json::Value,
) {
    let (request, send) = handle.next_request().await.expect("expected another apiserver request");
    assert_eq!(*request.method(), method, "unexpected method for {path}");
    assert_eq!(request.uri().path(), path);
    if let Some(expected) = dry_run {
        let query = request.uri().query().unwrap_or_default();
        assert_eq!(query.contains("dryRun=All"), expected, "dryRun mismatch on {path}");
    }

    let response = http::Response::builder()
        .status(status)
        .body(kube::client::Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send.send_response(response);
}

pub fn fast_opts() -> ApplyOptions {
    ApplyOptions {
        wait_interval: Duration::from_millis(10),
        wait_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

pub fn depl_path(name: &str) -> String {
    format!("/apis/apps/v1/namespaces/{TEST_NAMESPACE}/deployments/{name}")
}

pub fn secret_path(name: &str) -> String {
    format!("/api/v1/namespaces/{TEST_NAMESPACE}/secrets/{name}")
}

// what the fake apiserver stores for test_deployment(name): the desired state
// plus the fields the cluster stamps on
pub fn live_deployment_body(name: &str) -> serde_json::Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "namespace": TEST_NAMESPACE,
            "name": name,
            "resourceVersion": "12345",
            "uid": "0000-1111",
        },
        "spec": {
            "replicas": 1,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": [{"name": "main", "image": "nginx"}]},
            },
        },
    })
}

pub fn live_secret_body(name: &str, value_b64: &str) -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "namespace": TEST_NAMESPACE,
            "name": name,
            "resourceVersion": "12345",
            "uid": "0000-2222",
        },
        "immutable": true,
        "data": {"foo": value_b64},
    })
}
