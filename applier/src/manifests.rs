use serde::Deserialize;

use crate::engine::Owner;
use crate::errors::*;
use crate::prelude::*;

// Decode a multi-document YAML (or JSON) manifest stream into DynamicObjects.
// Empty/null documents are skipped and v1 Lists are unrolled into their items,
// so the output is always a flat list of applyable objects.
pub fn read_objects(manifest: &str) -> anyhow::Result<Vec<DynamicObject>> {
    let mut objs = vec![];
    for doc in serde_yaml::Deserializer::from_str(manifest) {
        let value = serde_json::Value::deserialize(doc)?;
        if value.is_null() {
            continue;
        }
        append_object(value, &mut objs)?;
    }
    Ok(objs)
}

fn append_object(value: serde_json::Value, objs: &mut Vec<DynamicObject>) -> EmptyResult {
    if value.get("kind").and_then(|k| k.as_str()) == Some("List") {
        if let Some(items) = value.get("items").and_then(|i| i.as_array()) {
            for item in items {
                append_object(item.clone(), objs)?;
            }
        }
        return Ok(());
    }

    let obj: DynamicObject = serde_json::from_value(value)?;
    validate(&obj)?;
    objs.push(obj);
    Ok(())
}

// The minimum an object needs before the engine will touch it; whether a
// namespace is required isn't knowable until discovery tells us the scope, so
// that check happens at apply time instead.
pub fn validate(obj: &DynamicObject) -> EmptyResult {
    match &obj.types {
        None => bail!(InvalidObjectError::missing_type_meta(&obj.name_any())),
        Some(t) if t.api_version.is_empty() || t.kind.is_empty() => {
            bail!(InvalidObjectError::missing_type_meta(&obj.name_any()))
        },
        _ => (),
    }
    if obj.metadata.name.as_deref().unwrap_or_default().is_empty() {
        bail!(InvalidObjectError::missing_name(&obj.types.as_ref().unwrap().kind));
    }
    Ok(())
}

// Stamp the owner's ownership labels ("<group>/name", "<group>/namespace")
// onto every object in a batch, each derived from that object's own identity;
// existing values are overwritten since the batch claims ownership.
pub fn set_common_metadata(objs: &mut [DynamicObject], owner: &Owner) {
    for obj in objs {
        let labels = owner.ownership_labels(&obj.name_any(), &obj.namespace().unwrap_or_default());
        obj.labels_mut().extend(labels);
    }
}
