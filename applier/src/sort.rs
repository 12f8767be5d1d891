use std::cmp::Ordering;

use crate::k8s::group_kind;
use crate::prelude::*;

// Kinds with dependents reconcile first, in this order; admission webhooks
// reconcile last so they can't reject the very objects being applied alongside
// them.  Everything unlisted lands in between, ordered lexically.
const APPLY_ORDER_FIRST: &[&str] = &[
    "CustomResourceDefinition",
    "Namespace",
    "StorageClass",
    "PriorityClass",
    "IngressClass",
    "RuntimeClass",
    "GatewayClass",
    "ResourceQuota",
    "ServiceAccount",
    "Role",
    "ClusterRole",
    "RoleBinding",
    "ClusterRoleBinding",
    "ConfigMap",
    "Secret",
    "Service",
    "LimitRange",
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "ReplicaSet",
    "Job",
    "CronJob",
    "HorizontalPodAutoscaler",
    "PodDisruptionBudget",
];

const APPLY_ORDER_LAST: &[&str] = &["MutatingWebhookConfiguration", "ValidatingWebhookConfiguration"];

fn kind_priority(kind: &str) -> (u8, usize) {
    if let Some(i) = APPLY_ORDER_FIRST.iter().position(|k| *k == kind) {
        (0, i)
    } else if let Some(i) = APPLY_ORDER_LAST.iter().position(|k| *k == kind) {
        (2, i)
    } else {
        (1, 0)
    }
}

fn sort_key(obj: &DynamicObject) -> (u8, usize, String, String, String, String) {
    let (group, kind) = group_kind(obj);
    let (tier, index) = kind_priority(kind);
    (tier, index, group.into(), kind.into(), obj.namespace().unwrap_or_default(), obj.name_any())
}

pub fn reconcile_order(a: &DynamicObject, b: &DynamicObject) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

pub fn sort_for_apply(objs: &mut [DynamicObject]) {
    objs.sort_by(reconcile_order);
}

// Deletion runs the order backwards so dependents go before their dependencies
pub fn sort_for_delete(objs: &mut [DynamicObject]) {
    objs.sort_by(|a, b| reconcile_order(b, a));
}
