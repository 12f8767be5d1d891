use json_patch::{
    PatchOperation,
    RemoveOperation,
    ReplaceOperation,
};
use jsonptr::PointerBuf;

use crate::errors::*;
use crate::prelude::*;

// Builders for the RFC-6902 operations the cleanup protocol submits against
// live objects.  PointerBuf::from_tokens handles the ~0/~1 escaping, which
// matters because annotation keys routinely contain '/'.

pub fn remove_annotation_op(key: &str) -> PatchOperation {
    PatchOperation::Remove(RemoveOperation { path: PointerBuf::from_tokens(["metadata", "annotations", key]) })
}

pub fn remove_label_op(key: &str) -> PatchOperation {
    PatchOperation::Remove(RemoveOperation { path: PointerBuf::from_tokens(["metadata", "labels", key]) })
}

pub fn replace_managed_fields_op(entries: &[metav1::ManagedFieldsEntry]) -> anyhow::Result<PatchOperation> {
    Ok(PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(["metadata", "managedFields"]),
        value: serde_json::to_value(entries)?,
    }))
}
