use serde_json::Value;

use crate::jsonutils::{
    semantic_derivative,
    semantic_eq,
};
use crate::prelude::*;

fn labels_value(map: &std::collections::BTreeMap<String, String>) -> Value {
    serde_json::to_value(map).unwrap_or(Value::Null)
}

fn spec_value(obj: &DynamicObject) -> Value {
    let mut v = serde_json::to_value(obj).unwrap_or(Value::Null);
    if let Some(map) = v.as_object_mut() {
        map.remove("metadata");
        map.remove("status");
    }
    v
}

// Whether the dry-run result differs from the live object in any way the
// engine owns.  Labels and annotations use deep-derivative (the live object
// must contain everything the dry-run has, but controllers are allowed to add
// more); everything outside metadata/status must be semantically deep-equal.
// The two notions are NOT interchangeable.
pub fn has_drifted(live: &DynamicObject, dry_run: &DynamicObject) -> bool {
    // no resource version means there's nothing stored to match against
    if live.resource_version().unwrap_or_default().is_empty() {
        return true;
    }

    if !semantic_derivative(&labels_value(dry_run.labels()), &labels_value(live.labels())) {
        return true;
    }
    if !semantic_derivative(&labels_value(dry_run.annotations()), &labels_value(live.annotations())) {
        return true;
    }

    !semantic_eq(&spec_value(live), &spec_value(dry_run))
}
