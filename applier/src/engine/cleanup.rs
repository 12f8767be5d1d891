use std::collections::BTreeMap;

use serde_json::json;

use super::Owner;
use crate::errors::*;
use crate::jsonutils::fieldpath;
use crate::patch::{
    remove_annotation_op,
    remove_label_op,
    replace_managed_fields_op,
};
use crate::prelude::*;

const OPERATION_APPLY: &str = "Apply";
const OPERATION_UPDATE: &str = "Update";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FieldManagerOperation {
    #[default]
    Apply,
    Update,
}

impl FieldManagerOperation {
    fn as_str(&self) -> &'static str {
        match self {
            FieldManagerOperation::Apply => OPERATION_APPLY,
            FieldManagerOperation::Update => OPERATION_UPDATE,
        }
    }
}

// Which field-manager entries to take over: exact_match compares the whole
// manager name, otherwise `name` is treated as a prefix (which catches the
// "kubectl-client-side-apply"-style families).
#[derive(Clone, Debug, Default)]
pub struct FieldManagerSpec {
    pub name: String,
    pub operation: FieldManagerOperation,
    pub exact_match: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CleanupOptions {
    pub annotations: Vec<String>,
    pub labels: Vec<String>,
    pub field_managers: Vec<FieldManagerSpec>,
    // objects carrying any of these label/annotation pairs are left alone
    pub exclusions: BTreeMap<String, String>,
}

impl CleanupOptions {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.labels.is_empty() && self.field_managers.is_empty()
    }
}

fn matches_spec(entry: &metav1::ManagedFieldsEntry, spec: &FieldManagerSpec) -> bool {
    if entry.operation.as_deref() != Some(spec.operation.as_str()) {
        return false;
    }
    match (&entry.manager, spec.exact_match) {
        (Some(manager), true) => *manager == spec.name,
        (Some(manager), false) => manager.starts_with(&spec.name),
        (None, _) => false,
    }
}

fn is_owner_entry(entry: &metav1::ManagedFieldsEntry, owner: &Owner) -> bool {
    entry.manager.as_deref() == Some(owner.field_manager.as_str())
        && entry.operation.as_deref() == Some(OPERATION_APPLY)
}

// the apiserver rejects an empty managedFields array in a patch, so a cleanup
// that removes every entry substitutes this stub
fn placeholder_entry(live: &DynamicObject, owner: &Owner) -> metav1::ManagedFieldsEntry {
    metav1::ManagedFieldsEntry {
        api_version: live.types.as_ref().map(|t| t.api_version.clone()),
        fields_type: Some("FieldsV1".into()),
        fields_v1: Some(metav1::FieldsV1(json!({}))),
        manager: Some(owner.field_manager.clone()),
        operation: Some(OPERATION_APPLY.into()),
        ..Default::default()
    }
}

fn fields_of(entry: &metav1::ManagedFieldsEntry) -> serde_json::Value {
    entry.fields_v1.as_ref().map(|f| f.0.clone()).unwrap_or_else(|| json!({}))
}

// Filter out (or fold into the owner) every managed-fields entry matching the
// given specs.  If the owner already has a server-side-apply entry, the
// matched entries' field sets are unioned into it -- ownership transfers
// instead of evaporating, so later applies see no conflicts.  Otherwise the
// first match is renamed to the owner and absorbs the rest.  Subresource
// entries are never touched.
fn replace_field_managers(
    live: &DynamicObject,
    owner: &Owner,
    specs: &[FieldManagerSpec],
) -> anyhow::Result<Option<json_patch::PatchOperation>> {
    let Some(entries) = &live.metadata.managed_fields else {
        return Ok(None);
    };

    let mut kept: Vec<metav1::ManagedFieldsEntry> = vec![];
    let mut matched: Vec<metav1::ManagedFieldsEntry> = vec![];
    for entry in entries {
        let untouchable = entry.subresource.as_deref().is_some_and(|s| !s.is_empty()) || is_owner_entry(entry, owner);
        if !untouchable && specs.iter().any(|spec| matches_spec(entry, spec)) {
            matched.push(entry.clone());
        } else {
            kept.push(entry.clone());
        }
    }
    if matched.is_empty() {
        return Ok(None);
    }

    let merged_fields = matched.iter().fold(json!({}), |acc, e| fieldpath::union(&acc, &fields_of(e)));
    match kept.iter_mut().find(|e| is_owner_entry(e, owner)) {
        Some(owner_entry) => {
            owner_entry.fields_v1 = Some(metav1::FieldsV1(fieldpath::union(&fields_of(owner_entry), &merged_fields)));
        },
        None => {
            let mut adopted = matched.swap_remove(0);
            adopted.manager = Some(owner.field_manager.clone());
            adopted.operation = Some(OPERATION_APPLY.into());
            adopted.fields_v1 = Some(metav1::FieldsV1(merged_fields));
            kept.push(adopted);
        },
    }

    if kept.is_empty() {
        kept.push(placeholder_entry(live, owner));
    }
    Ok(Some(replace_managed_fields_op(&kept)?))
}

// One atomic RFC-6902 document covering annotation removal, label removal,
// and field-manager replacement; empty means nothing to submit.
pub(crate) fn build_cleanup_patch(
    live: &DynamicObject,
    owner: &Owner,
    opts: &CleanupOptions,
) -> anyhow::Result<json_patch::Patch> {
    let mut ops = vec![];

    for key in &opts.annotations {
        if live.annotations().contains_key(key) {
            ops.push(remove_annotation_op(key));
        }
    }
    for key in &opts.labels {
        if live.labels().contains_key(key) {
            ops.push(remove_label_op(key));
        }
    }
    if !opts.field_managers.is_empty()
        && let Some(op) = replace_field_managers(live, owner, &opts.field_managers)?
    {
        ops.push(op);
    }

    Ok(json_patch::Patch(ops))
}
