use serde_json::{
    Map,
    Value,
};

use super::{
    OpKind,
    Operation,
    Patch,
};

pub const MASK: &str = "***";
pub const MASK_BEFORE: &str = "*** (before)";
pub const MASK_AFTER: &str = "*** (after)";

fn is_data_key_path(path: &str) -> bool {
    path.starts_with("/data/") || path.starts_with("/stringData/")
}

fn is_data_map_path(path: &str) -> bool {
    path == "/data" || path == "/stringData"
}

// Rewrite one whole-map side of a rationalized patch: keys on both sides keep
// a plain sentinel when unchanged, before/after sentinels when they differ,
// and keys on only one side get the plain sentinel.
fn mask_map(this: Option<&Value>, other: Option<&Value>, changed_sentinel: &str) -> Option<Value> {
    let this = this?.as_object()?;
    let other = other.and_then(|v| v.as_object());

    let mut out = Map::new();
    for (k, v) in this {
        let masked = match other.and_then(|o| o.get(k)) {
            Some(ov) if ov == v => MASK,
            Some(_) => changed_sentinel,
            None => MASK,
        };
        out.insert(k.clone(), Value::String(masked.into()));
    }
    Some(Value::Object(out))
}

// Rewrite a Secret diff so data values never appear in output.  Key-level
// paths mask per-operation; whole-map paths (rationalized diffs) mask each
// entry individually so the shape of the change stays readable.
pub fn mask_secret_patch(patch: Patch) -> Patch {
    let ops = patch
        .0
        .into_iter()
        .map(|mut op| {
            if is_data_key_path(&op.path) {
                match op.op {
                    OpKind::Replace => {
                        op.old_value = op.old_value.map(|_| MASK_BEFORE.into());
                        op.value = op.value.map(|_| MASK_AFTER.into());
                    },
                    _ => {
                        op.old_value = op.old_value.map(|_| MASK.into());
                        op.value = op.value.map(|_| MASK.into());
                    },
                }
            } else if is_data_map_path(&op.path) {
                let masked_old = mask_map(op.old_value.as_ref(), op.value.as_ref(), MASK_BEFORE);
                let masked_new = mask_map(op.value.as_ref(), op.old_value.as_ref(), MASK_AFTER);
                // a non-map value here would be malformed, but it must still
                // never escape unmasked
                op.old_value = op.old_value.map(|_| masked_old.unwrap_or_else(|| MASK.into()));
                op.value = op.value.map(|_| masked_new.unwrap_or_else(|| MASK.into()));
            }
            op
        })
        .collect();
    Patch(ops)
}
