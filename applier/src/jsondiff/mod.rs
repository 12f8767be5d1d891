mod mask;

use std::collections::BTreeMap;
use std::fmt;

pub use mask::mask_secret_patch;
use serde::Serialize;
use serde_json::Value;

use crate::jsonutils;
use crate::k8s::ObjectId;
use crate::prelude::*;
use crate::selector::Selector;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    None,
    Exclude,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::None => "none",
            ChangeType::Exclude => "exclude",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Test,
    Move,
    Copy,
}

// json_patch::PatchOperation has no old-value slot, and callers (and the
// secret masker) need to see what a remove/replace clobbered; so the diff
// pipeline re-homes operations into this type, resolving old values against
// the pre-image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Operation {
    pub op: OpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Patch(pub Vec<Operation>);

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// The outcome of diffing one desired object against the cluster.
#[derive(Clone, Debug)]
pub struct Diff {
    pub change_type: ChangeType,
    pub object_id: ObjectId,
    pub live: Option<DynamicObject>,
    pub dry_run: Option<DynamicObject>,
    pub patch: Patch,
}

impl Diff {
    pub fn new(change_type: ChangeType, object_id: ObjectId) -> Diff {
        Diff { change_type, object_id, live: None, dry_run: None, patch: Patch::default() }
    }
}

// Paths removed from both sides of a comparison before diffing; a nil
// selector applies the rule to every object, and the root sentinel ("")
// excludes the object outright.
#[derive(Clone, Debug, Default)]
pub struct IgnoreRule {
    pub paths: Vec<String>,
    pub selector: Option<Selector>,
}

pub const ROOT_SENTINEL: &str = "";

#[derive(Clone, Debug, Default)]
pub struct DiffOptions {
    // skip (ChangeType::Exclude) any object carrying one of these
    // label/annotation pairs
    pub exclusions: BTreeMap<String, String>,
    // dry-run under this field manager instead of the engine's owner
    pub field_owner: Option<String>,
    pub ignore_paths: Vec<String>,
    pub ignore_rules: Vec<IgnoreRule>,
    pub mask_secrets: bool,
    pub rationalize: bool,
    // diff_all: collect per-object errors into one instead of aborting
    pub graceful: bool,
}

impl DiffOptions {
    // union of the base ignore paths and every matching rule's paths
    pub(crate) fn ignore_paths_for(&self, obj: &DynamicObject) -> Vec<String> {
        let mut paths = self.ignore_paths.clone();
        for rule in &self.ignore_rules {
            if rule.selector.as_ref().is_none_or(|sel| sel.matches(obj)) {
                paths.extend(rule.paths.iter().cloned());
            }
        }
        paths
    }
}

fn resolve_old(before: &Value, path: &str) -> Option<Value> {
    before.pointer(path).cloned()
}

fn enrich(patch: json_patch::Patch, before: &Value) -> Vec<Operation> {
    patch
        .0
        .into_iter()
        .map(|op| match op {
            json_patch::PatchOperation::Add(a) => {
                Operation { op: OpKind::Add, path: a.path.to_string(), value: Some(a.value), old_value: None }
            },
            json_patch::PatchOperation::Remove(r) => {
                let path = r.path.to_string();
                Operation { op: OpKind::Remove, old_value: resolve_old(before, &path), path, value: None }
            },
            json_patch::PatchOperation::Replace(r) => {
                let path = r.path.to_string();
                Operation {
                    op: OpKind::Replace,
                    old_value: resolve_old(before, &path),
                    path,
                    value: Some(r.value),
                }
            },
            json_patch::PatchOperation::Test(t) => {
                Operation { op: OpKind::Test, path: t.path.to_string(), value: Some(t.value), old_value: None }
            },
            json_patch::PatchOperation::Move(m) => {
                Operation { op: OpKind::Move, path: m.path.to_string(), value: None, old_value: None }
            },
            json_patch::PatchOperation::Copy(c) => {
                Operation { op: OpKind::Copy, path: c.path.to_string(), value: None, old_value: None }
            },
        })
        .collect()
}

// Missing maps count as empty so a first-ever label still diffs as a
// key-level add rather than a whole-map add.
fn metadata_only(obj: &Value) -> Value {
    let mut out = serde_json::json!({"metadata": {"annotations": {}, "labels": {}}});
    for field in ["annotations", "labels"] {
        if let Some(v) = obj.pointer(&format!("/metadata/{field}")) {
            out["metadata"][field] = v.clone();
        }
    }
    out
}

fn without_metadata_and_status(obj: &Value) -> Value {
    let mut out = obj.clone();
    if let Some(map) = out.as_object_mut() {
        map.remove("metadata");
        map.remove("status");
    }
    out
}

// Compute the concatenated metadata + spec patch between the live object and
// the dry-run response.  The metadata half keeps only add/replace operations:
// cluster controllers inject their own labels and annotations, and a `remove`
// for those would be a false positive every time.
pub fn compute_patch(live: &Value, dry_run: &Value) -> Patch {
    let live_meta = metadata_only(live);
    let dry_meta = metadata_only(dry_run);
    let mut ops: Vec<_> = enrich(json_patch::diff(&live_meta, &dry_meta), &live_meta)
        .into_iter()
        .filter(|op| matches!(op.op, OpKind::Add | OpKind::Replace))
        .collect();

    let live_spec = without_metadata_and_status(live);
    let dry_spec = without_metadata_and_status(dry_run);
    ops.extend(enrich(json_patch::diff(&live_spec, &dry_spec), &live_spec));

    Patch(ops)
}

// Collapse multiple operations under one top-level field into a single
// whole-subtree replace.  Metadata is never rationalized: a whole-metadata
// replace would stomp on controller-owned entries.
pub fn rationalize_patch(patch: Patch, live: &Value, dry_run: &Value) -> Patch {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for op in &patch.0 {
        if let Some(root) = first_segment(&op.path)
            && root != "metadata"
        {
            *counts.entry(root.into()).or_default() += 1;
        }
    }

    let mut out = vec![];
    let mut emitted: Vec<String> = vec![];
    for op in patch.0 {
        match first_segment(&op.path) {
            Some(root) if root != "metadata" && counts[root] > 1 => {
                if !emitted.contains(&root.to_string()) {
                    emitted.push(root.into());
                    let path = format!("/{root}");
                    out.push(Operation {
                        op: OpKind::Replace,
                        value: dry_run.pointer(&path).cloned(),
                        old_value: live.pointer(&path).cloned(),
                        path,
                    });
                }
            },
            _ => out.push(op),
        }
    }
    Patch(out)
}

fn first_segment(path: &str) -> Option<&str> {
    path.strip_prefix('/').map(|rest| rest.split('/').next().unwrap_or(rest))
}

// strip ignore-paths from both sides; missing paths are fine
pub fn apply_ignore_paths(paths: &[String], live: &mut Value, dry_run: &mut Value) {
    for path in paths {
        jsonutils::remove_path(live, path);
        jsonutils::remove_path(dry_run, path);
    }
}

#[cfg(test)]
mod tests;
