use serde_json::Value;

use super::Status;
use crate::k8s::group_kind;
use crate::prelude::*;

// Condition-based status computation over the property bag, in the style of
// kstatus: enough per-kind smarts to make readiness waits useful, with a
// generic Ready/Stalled fallback for everything else.  Objects with no status
// at all (ConfigMaps, Secrets, RBAC, ...) are Current by definition.

fn condition_status<'a>(data: &'a Value, type_: &str) -> Option<(&'a str, &'a str)> {
    let conditions = data.pointer("/status/conditions")?.as_array()?;
    let cond = conditions.iter().find(|c| c.get("type").and_then(Value::as_str) == Some(type_))?;
    let status = cond.get("status").and_then(Value::as_str).unwrap_or("");
    let reason = cond.get("reason").and_then(Value::as_str).unwrap_or("");
    Some((status, reason))
}

fn int_at(data: &Value, path: &str) -> Option<i64> {
    data.pointer(path).and_then(Value::as_i64)
}

pub fn compute_status(obj: &DynamicObject) -> Status {
    let data = &obj.data;

    // a controller that hasn't seen the latest generation can't have a
    // trustworthy status yet
    if let (Some(generation), Some(observed)) = (obj.metadata.generation, int_at(data, "/status/observedGeneration"))
        && observed < generation
    {
        return Status::InProgress;
    }

    let (_, kind) = group_kind(obj);
    match kind {
        "Deployment" => deployment_status(data),
        "StatefulSet" => replica_status(data, "/spec/replicas", "/status/readyReplicas"),
        "ReplicaSet" => replica_status(data, "/spec/replicas", "/status/readyReplicas"),
        "DaemonSet" => replica_status(data, "/status/desiredNumberScheduled", "/status/numberReady"),
        "Job" => job_status(data),
        "Pod" => pod_status(data),
        "CustomResourceDefinition" => crd_status(data),
        "Namespace" => namespace_status(data),
        _ => generic_status(data),
    }
}

fn deployment_status(data: &Value) -> Status {
    if let Some((_, reason)) = condition_status(data, "Progressing")
        && reason == "ProgressDeadlineExceeded"
    {
        return Status::Failed;
    }
    match condition_status(data, "Available") {
        Some(("True", _)) => Status::Current,
        _ => Status::InProgress,
    }
}

fn replica_status(data: &Value, desired_path: &str, ready_path: &str) -> Status {
    let desired = int_at(data, desired_path).unwrap_or(1);
    let ready = int_at(data, ready_path).unwrap_or(0);
    if ready >= desired { Status::Current } else { Status::InProgress }
}

fn job_status(data: &Value) -> Status {
    if let Some(("True", _)) = condition_status(data, "Failed") {
        return Status::Failed;
    }
    match condition_status(data, "Complete") {
        Some(("True", _)) => Status::Current,
        _ => Status::InProgress,
    }
}

fn pod_status(data: &Value) -> Status {
    match data.pointer("/status/phase").and_then(Value::as_str) {
        Some("Running") | Some("Succeeded") => Status::Current,
        Some("Failed") => Status::Failed,
        _ => Status::InProgress,
    }
}

fn crd_status(data: &Value) -> Status {
    if let Some(("False", _)) = condition_status(data, "NamesAccepted") {
        return Status::Failed;
    }
    match condition_status(data, "Established") {
        Some(("True", _)) => Status::Current,
        _ => Status::InProgress,
    }
}

fn namespace_status(data: &Value) -> Status {
    match data.pointer("/status/phase").and_then(Value::as_str) {
        Some("Terminating") => Status::InProgress,
        _ => Status::Current,
    }
}

fn generic_status(data: &Value) -> Status {
    if let Some(("True", _)) = condition_status(data, "Stalled") {
        return Status::Failed;
    }
    match condition_status(data, "Ready") {
        Some(("True", _)) => Status::Current,
        Some(_) => Status::InProgress,
        // no conditions to speak of; nothing to wait on
        None => Status::Current,
    }
}
