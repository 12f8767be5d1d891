use applier::prelude::*;
use kube::api::TypeMeta;
use rstest::fixture;
use serde_json::json;

use crate::constants::*;

// the Owner identity every engine test reconciles under
pub fn test_owner() -> Owner {
    Owner::new(TEST_FIELD_MANAGER, TEST_OWNER_GROUP)
}

pub fn test_namespaced_obj(api_version: &str, kind: &str, namespace: &str, name: &str) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta { api_version: api_version.into(), kind: kind.into() }),
        metadata: metav1::ObjectMeta {
            namespace: Some(namespace.into()),
            name: Some(name.into()),
            ..Default::default()
        },
        data: json!({}),
    }
}

pub fn test_cluster_obj(api_version: &str, kind: &str, name: &str) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta { api_version: api_version.into(), kind: kind.into() }),
        metadata: metav1::ObjectMeta { name: Some(name.into()), ..Default::default() },
        data: json!({}),
    }
}

// A deployment with a spec complete enough to survive the typed round-trip
// the engine's normalization performs.
#[fixture]
pub fn test_deployment(#[default(TEST_DEPLOYMENT)] name: &str) -> DynamicObject {
    let mut obj = test_namespaced_obj("apps/v1", "Deployment", TEST_NAMESPACE, name);
    obj.data = json!({
        "spec": {
            "replicas": 1,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": [{"name": "main", "image": "nginx"}]},
            },
        },
    });
    obj
}

#[fixture]
pub fn test_secret(#[default(TEST_SECRET)] name: &str) -> DynamicObject {
    let mut obj = test_namespaced_obj("v1", "Secret", TEST_NAMESPACE, name);
    // base64("bar")
    obj.data = json!({"data": {"foo": "YmFy"}});
    obj
}

#[fixture]
pub fn test_namespace(#[default(TEST_NAMESPACE)] name: &str) -> DynamicObject {
    test_cluster_obj("v1", "Namespace", name)
}

#[fixture]
pub fn test_configmap(#[default("the-configmap")] name: &str) -> DynamicObject {
    let mut obj = test_namespaced_obj("v1", "ConfigMap", TEST_NAMESPACE, name);
    obj.data = json!({"data": {"key": "value"}});
    obj
}

#[fixture]
pub fn test_service(#[default("the-service")] name: &str) -> DynamicObject {
    let mut obj = test_namespaced_obj("v1", "Service", TEST_NAMESPACE, name);
    obj.data = json!({"spec": {"ports": [{"port": 80}], "selector": {"app": name}}});
    obj
}

#[fixture]
pub fn test_crd(#[default("widgets.example.com")] name: &str) -> DynamicObject {
    let mut obj = test_cluster_obj("apiextensions.k8s.io/v1", "CustomResourceDefinition", name);
    obj.data = json!({
        "spec": {
            "group": "example.com",
            "names": {"kind": "Widget", "plural": "widgets", "singular": "widget"},
            "scope": "Namespaced",
            "versions": [{"name": "v1", "served": true, "storage": true}],
        },
    });
    obj
}

#[fixture]
pub fn test_widget(#[default("the-widget")] name: &str) -> DynamicObject {
    let mut obj = test_namespaced_obj("example.com/v1", "Widget", TEST_NAMESPACE, name);
    obj.data = json!({"spec": {"size": 3}});
    obj
}
