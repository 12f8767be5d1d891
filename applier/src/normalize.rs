use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::*;
use crate::k8s::{
    AUTOSCALING_GROUP,
    group_kind,
    is_crd,
    is_role_kind,
};
use crate::prelude::*;

const DEFAULT_PROTOCOL: &str = "TCP";

// Round-trip an object through its typed representation so it picks up the
// same defaults the apiserver would add, then put the result back into the
// property bag.  Unknown fields don't survive the trip, which is exactly the
// cluster-side behavior we're imitating.
fn roundtrip<K>(obj: &mut DynamicObject, f: impl FnOnce(&mut K)) -> EmptyResult
where
    K: Serialize + DeserializeOwned,
{
    let mut typed: K = serde_json::from_value(serde_json::to_value(&*obj)?)?;
    f(&mut typed);
    *obj = serde_json::from_value(serde_json::to_value(typed)?)?;
    Ok(())
}

fn default_pod_spec(spec: &mut corev1::PodSpec) {
    let containers = spec.containers.iter_mut().chain(spec.init_containers.iter_mut().flatten());
    for container in containers {
        for port in container.ports.iter_mut().flatten() {
            port.protocol.get_or_insert(DEFAULT_PROTOCOL.into());
        }
    }
}

fn default_pod_template(tpl: &mut corev1::PodTemplateSpec) {
    if let Some(spec) = tpl.spec.as_mut() {
        default_pod_spec(spec);
    }
}

// stringData is write-only sugar the apiserver folds into data; fold it
// ourselves so dry-run comparisons line up with what the cluster stores
fn fold_string_data(secret: &mut corev1::Secret) {
    if let Some(string_data) = secret.string_data.take() {
        let data = secret.data.get_or_insert(BTreeMap::new());
        for (k, v) in string_data {
            data.insert(k, ByteString(v.into_bytes()));
        }
    }
}

pub fn normalize_all(objs: &mut [DynamicObject]) -> EmptyResult {
    for obj in objs {
        normalize(obj)?;
    }
    Ok(())
}

pub fn normalize(obj: &mut DynamicObject) -> EmptyResult {
    // rbac rules don't round-trip reliably, leave Role/ClusterRole untouched
    if is_role_kind(obj) {
        return Ok(());
    }

    match group_kind(obj) {
        ("", "Pod") => roundtrip::<corev1::Pod>(obj, |pod| {
            if let Some(spec) = pod.spec.as_mut() {
                default_pod_spec(spec);
            }
        })?,
        ("", "Service") => roundtrip::<corev1::Service>(obj, |svc| {
            if let Some(spec) = svc.spec.as_mut() {
                for port in spec.ports.iter_mut().flatten() {
                    port.protocol.get_or_insert(DEFAULT_PROTOCOL.into());
                }
            }
        })?,
        ("", "Secret") => roundtrip::<corev1::Secret>(obj, fold_string_data)?,
        ("apps", "Deployment") => roundtrip::<appsv1::Deployment>(obj, |d| {
            if let Some(spec) = d.spec.as_mut() {
                default_pod_template(&mut spec.template);
            }
        })?,
        ("apps", "StatefulSet") => roundtrip::<appsv1::StatefulSet>(obj, |s| {
            if let Some(spec) = s.spec.as_mut() {
                default_pod_template(&mut spec.template);
            }
        })?,
        ("apps", "DaemonSet") => roundtrip::<appsv1::DaemonSet>(obj, |d| {
            if let Some(spec) = d.spec.as_mut() {
                default_pod_template(&mut spec.template);
            }
        })?,
        ("apps", "ReplicaSet") => roundtrip::<appsv1::ReplicaSet>(obj, |r| {
            if let Some(tpl) = r.spec.as_mut().and_then(|spec| spec.template.as_mut()) {
                default_pod_template(tpl);
            }
        })?,
        ("batch", "Job") => roundtrip::<batchv1::Job>(obj, |j| {
            if let Some(spec) = j.spec.as_mut() {
                default_pod_template(&mut spec.template);
            }
        })?,
        ("batch", "CronJob") => roundtrip::<batchv1::CronJob>(obj, |cj| {
            if let Some(job_spec) = cj.spec.as_mut().and_then(|spec| spec.job_template.spec.as_mut()) {
                default_pod_template(&mut job_spec.template);
            }
        })?,
        _ => (),
    }

    obj.metadata.creation_timestamp = None;
    // status is controller-owned and must not be applied -- except on CRDs,
    // where waiters watch status.conditions for establishment
    if !is_crd(obj)
        && let Some(map) = obj.data.as_object_mut()
    {
        map.remove("status");
    }

    Ok(())
}

// The apiserver's dry-run response for v2/v2beta2 HPAs duplicates the first
// metric and appends an empty one; collapse both artifacts before diffing or
// every HPA reads as permanently drifted.
pub fn normalize_dry_run(obj: &mut DynamicObject) {
    let is_hpa = {
        let (group, kind) = group_kind(obj);
        group == AUTOSCALING_GROUP && kind == "HorizontalPodAutoscaler"
    };
    if !is_hpa {
        return;
    }

    if let Some(metrics) = obj.data.pointer_mut("/spec/metrics").and_then(|m| m.as_array_mut()) {
        let mut seen: Vec<serde_json::Value> = vec![];
        metrics.retain(|m| {
            if m.get("type").and_then(|t| t.as_str()).unwrap_or_default().is_empty() {
                return false;
            }
            if seen.contains(m) {
                return false;
            }
            seen.push(m.clone());
            true
        });
    }
}
