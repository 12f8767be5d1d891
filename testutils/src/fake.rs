use httpmock::prelude::*;
use httpmock::{
    Mock,
    Then,
    When,
};
use serde_json::json;

// A fake apiserver built on httpmock.  Handlers are buffered and only hit the
// wire when build() runs, so the unmatched-request fallback can be registered
// last; httpmock gives earlier mocks first crack at each request.
pub struct FakeApiServer {
    server: MockServer,
    pending: Vec<Box<dyn Fn(When, Then)>>,
    registered: Vec<usize>,
}

fn log_request(req: &HttpMockRequest) -> bool {
    // consumer test binaries don't necessarily install a tracing subscriber,
    // so this goes straight to stdout where cargo test shows it on failure
    println!("--> fake apiserver: {} {}", req.method_str(), req.uri().path());
    true
}

impl FakeApiServer {
    pub fn new() -> FakeApiServer {
        FakeApiServer {
            server: MockServer::start(),
            pending: vec![],
            registered: vec![],
        }
    }

    pub fn handle<F: Fn(When, Then) + 'static>(&mut self, f: F) -> &mut Self {
        self.pending.push(Box::new(move |when, then| {
            f(when.matches(log_request), then);
        }));
        self
    }

    pub fn handle_not_found(&mut self, path: String) -> &mut Self {
        self.handle(move |when, then| {
            when.path(&path);
            then.status(404).json_body(status_not_found());
        })
    }

    // Register every buffered handler, then a fallback that answers anything
    // unmatched with a k8s-flavored 404 instead of httpmock's default; a test
    // that strays off its mocked paths fails with a sensible apiserver error.
    pub fn build(&mut self) {
        for handler in self.pending.iter() {
            self.registered.push(self.server.mock(handler).id);
        }
        self.server.mock(|when, then| {
            when.matches(log_request);
            then.status(404).json_body(status_not_found());
        });
    }

    pub fn assert(&self) {
        for id in &self.registered {
            Mock::new(*id, &self.server).assert();
        }
    }

    // assert the nth registered handler was hit exactly `count` times
    pub fn assert_hits(&self, index: usize, count: usize) {
        Mock::new(self.registered[index], &self.server).assert_hits(count)
    }

    pub fn url(&self) -> http::Uri {
        http::Uri::try_from(self.server.url("/")).unwrap()
    }
}

pub fn make_fake_apiserver() -> (FakeApiServer, kube::Client) {
    let fake = FakeApiServer::new();
    let config = kube::Config::new(fake.url());
    let client = kube::Client::try_from(config).unwrap();
    (fake, client)
}

pub fn status_ok() -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Success",
      "code": 200
    })
}

// the Status payload the apiserver attaches to error responses
pub fn status_failure(code: u16, reason: &str, message: &str) -> serde_json::Value {
    json!({
      "kind": "Status",
      "apiVersion": "v1",
      "metadata": {},
      "status": "Failure",
      "message": message,
      "reason": reason,
      "code": code,
    })
}

pub fn status_not_found() -> serde_json::Value {
    status_failure(404, "NotFound", "the server could not find the requested resource")
}

pub fn status_invalid(message: &str) -> serde_json::Value {
    status_failure(422, "Invalid", message)
}

pub fn core_v1_discovery() -> serde_json::Value {
    json!({
        "kind":"APIResourceList",
        "groupVersion":"v1",
        "resources":[
            {
                "name":"configmaps",
                "singularName":"configmap",
                "namespaced":true,
                "kind":"ConfigMap",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["cm"],
            },
            {
                "name":"namespaces",
                "singularName":"namespace",
                "namespaced":false,
                "kind":"Namespace",
                "verbs":["create","delete","get","list","patch","update","watch"],
                "shortNames":["ns"],
            },
            {
                "name":"pods",
                "singularName":"pod",
                "namespaced":true,
                "kind":"Pod",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["po"],
                "categories":["all"],
            },
            {
                "name":"secrets",
                "singularName":"secret",
                "namespaced":true,
                "kind":"Secret",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
            },
            {
                "name":"services",
                "singularName":"service",
                "namespaced":true,
                "kind":"Service",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["svc"],
                "categories":["all"],
            },
        ],
    })
}

pub fn apps_v1_discovery() -> serde_json::Value {
    json!({
        "kind":"APIResourceList",
        "apiVersion":"v1",
        "groupVersion":"apps/v1",
        "resources":[
            {
                "name":"daemonsets",
                "singularName":"daemonset",
                "namespaced":true,
                "kind":"DaemonSet",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["ds"],
                "categories":["all"],
            },
            {
                "name":"deployments",
                "singularName":"deployment",
                "namespaced":true,
                "kind":"Deployment",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["deploy"],
                "categories":["all"],
            },
            {
                "name":"deployments/status",
                "singularName":"",
                "namespaced":true,
                "kind":"Deployment",
                "verbs":["get","patch","update"],
            },
            {
                "name":"replicasets",
                "singularName":"replicaset",
                "namespaced":true,
                "kind":"ReplicaSet",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["rs"],
                "categories":["all"],
            },
            {
                "name":"statefulsets",
                "singularName":"statefulset",
                "namespaced":true,
                "kind":"StatefulSet",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["sts"],
                "categories":["all"],
            },
        ],
    })
}

pub fn batch_v1_discovery() -> serde_json::Value {
    json!({
        "kind":"APIResourceList",
        "apiVersion":"v1",
        "groupVersion":"batch/v1",
        "resources":[
            {
                "name":"cronjobs",
                "singularName":"cronjob",
                "namespaced":true,
                "kind":"CronJob",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["cj"],
                "categories":["all"],
            },
            {
                "name":"jobs",
                "singularName":"job",
                "namespaced":true,
                "kind":"Job",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "categories":["all"],
            },
        ],
    })
}

pub fn apiextensions_v1_discovery() -> serde_json::Value {
    json!({
        "kind":"APIResourceList",
        "apiVersion":"v1",
        "groupVersion":"apiextensions.k8s.io/v1",
        "resources":[
            {
                "name":"customresourcedefinitions",
                "singularName":"customresourcedefinition",
                "namespaced":false,
                "kind":"CustomResourceDefinition",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
                "shortNames":["crd","crds"],
            },
        ],
    })
}

// discovery for a made-up CRD group, for staged-apply tests that apply a CRD
// and then an instance of it
pub fn example_v1_discovery() -> serde_json::Value {
    json!({
        "kind":"APIResourceList",
        "apiVersion":"v1",
        "groupVersion":"example.com/v1",
        "resources":[
            {
                "name":"widgets",
                "singularName":"widget",
                "namespaced":true,
                "kind":"Widget",
                "verbs":["create","delete","deletecollection","get","list","patch","update","watch"],
            },
        ],
    })
}
