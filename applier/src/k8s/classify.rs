use crate::prelude::*;

pub const CORE_GROUP: &str = "";
pub const APIEXTENSIONS_GROUP: &str = "apiextensions.k8s.io";
pub const RBAC_GROUP: &str = "rbac.authorization.k8s.io";
pub const BATCH_GROUP: &str = "batch";
pub const AUTOSCALING_GROUP: &str = "autoscaling";
pub const ADMISSION_GROUP: &str = "admissionregistration.k8s.io";

// group/kind of an object, ("", "") if it carries no type info; classification
// predicates treat untyped objects as matching nothing
pub fn group_kind(obj: &DynamicObject) -> (&str, &str) {
    match &obj.types {
        Some(t) => {
            let group = match t.api_version.split_once('/') {
                Some((g, _)) => g,
                None => CORE_GROUP,
            };
            (group, &t.kind)
        },
        None => ("", ""),
    }
}

pub fn is_kind(obj: &DynamicObject, group: &str, kind: &str) -> bool {
    obj.types.is_some() && group_kind(obj) == (group, kind)
}

pub fn is_crd(obj: &DynamicObject) -> bool {
    is_kind(obj, APIEXTENSIONS_GROUP, "CustomResourceDefinition")
}

pub fn is_namespace(obj: &DynamicObject) -> bool {
    is_kind(obj, CORE_GROUP, "Namespace")
}

pub fn is_secret(obj: &DynamicObject) -> bool {
    is_kind(obj, CORE_GROUP, "Secret")
}

pub fn is_job(obj: &DynamicObject) -> bool {
    is_kind(obj, BATCH_GROUP, "Job")
}

pub fn is_cluster_role(obj: &DynamicObject) -> bool {
    is_kind(obj, RBAC_GROUP, "ClusterRole")
}

// Role/ClusterRole are exempted from typed normalization so we never risk
// dropping rules the typed representation doesn't know about
pub fn is_role_kind(obj: &DynamicObject) -> bool {
    is_cluster_role(obj) || is_kind(obj, RBAC_GROUP, "Role")
}

// StorageClass, PriorityClass, IngressClass, RuntimeClass, GatewayClass, etc.;
// dependents reference these by name so they sort right after Namespace
pub fn is_class_definition(obj: &DynamicObject) -> bool {
    let (_, kind) = group_kind(obj);
    obj.types.is_some() && kind.ends_with("Class")
}

// Cluster-scoped definitions every other object may depend on; these make up
// stage one of a staged apply
pub fn is_cluster_definition(obj: &DynamicObject) -> bool {
    is_crd(obj) || is_namespace(obj)
}

// The orchestrator-specific suspend flag: a suspended object's controller will
// never reconcile it, so waiters must not hold it against the batch
pub fn is_suspended(obj: &DynamicObject) -> bool {
    obj.data.pointer("/spec/suspend").and_then(|v| v.as_bool()).unwrap_or(false)
}
