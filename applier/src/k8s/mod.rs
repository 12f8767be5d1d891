mod apiset;
mod classify;
pub mod object_id;

use std::collections::BTreeMap;

pub use apiset::*;
pub use classify::*;
use kube::api::Resource;
pub use object_id::ObjectId;

use crate::errors::*;
use crate::prelude::*;

err_impl! {KubernetesError,
    #[error("malformed label selector: {0:?}")]
    MalformedLabelSelector(metav1::LabelSelectorRequirement),
}

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
    fn matches(&self, sel: &metav1::LabelSelector) -> anyhow::Result<bool>;
}

impl<T: Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any().clone(),
        }
    }

    fn matches(&self, sel: &metav1::LabelSelector) -> anyhow::Result<bool> {
        selector_matches(sel, self.labels())
    }
}

// Full label-selector evaluation (match_labels AND every match_expression)
// over an arbitrary key/value map, so it applies to annotations as well as
// labels.  An empty selector matches everything.
pub fn selector_matches(sel: &metav1::LabelSelector, kvs: &BTreeMap<String, String>) -> anyhow::Result<bool> {
    if let Some(exprs) = &sel.match_expressions {
        for expr in exprs {
            if !label_expr_match(kvs, expr)? {
                return Ok(false);
            }
        }
    }

    if let Some(labels) = &sel.match_labels {
        for (k, v) in labels {
            if kvs.get(k) != Some(v) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

// Surfaces the malformed-selector cases eagerly so Selector construction can
// reject them before any objects are evaluated.
pub fn validate_label_selector(sel: &metav1::LabelSelector) -> EmptyResult {
    for expr in sel.match_expressions.iter().flatten() {
        let has_values = expr.values.as_ref().is_some_and(|v| !v.is_empty());
        match expr.operator.as_str() {
            OPERATOR_IN | OPERATOR_NOT_IN if !has_values => {
                bail!(KubernetesError::malformed_label_selector(expr))
            },
            OPERATOR_EXISTS | OPERATOR_DOES_NOT_EXIST if has_values => {
                bail!(KubernetesError::malformed_label_selector(expr))
            },
            OPERATOR_IN | OPERATOR_NOT_IN | OPERATOR_EXISTS | OPERATOR_DOES_NOT_EXIST => (),
            _ => bail!("malformed label selector expression: {:?}", expr),
        }
    }
    Ok(())
}

// The "any-match" policy used by the engine's skip/force/exclusion selectors:
// true if any configured key/value pair appears among the object's labels or
// annotations.
pub fn matches_any_metadata(obj: &DynamicObject, sel: &BTreeMap<String, String>) -> bool {
    if sel.is_empty() {
        return false;
    }
    sel.iter().any(|(k, v)| {
        obj.labels().get(k).is_some_and(|ov| ov == v) || obj.annotations().get(k).is_some_and(|ov| ov == v)
    })
}

// The meanings of these operators is explained here:
// https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#set-based-requirement
pub(super) const OPERATOR_IN: &str = "In";
pub(super) const OPERATOR_NOT_IN: &str = "NotIn";
pub(super) const OPERATOR_EXISTS: &str = "Exists";
pub(super) const OPERATOR_DOES_NOT_EXIST: &str = "DoesNotExist";

fn label_expr_match(
    obj_labels: &BTreeMap<String, String>,
    expr: &metav1::LabelSelectorRequirement,
) -> anyhow::Result<bool> {
    // LabelSelectorRequirement is considered invalid if the Operator is "In" or NotIn"
    // and there are no values; conversely for "Exists" and "DoesNotExist".
    match expr.operator.as_str() {
        OPERATOR_IN => match obj_labels.get(&expr.key) {
            Some(v) => match &expr.values {
                Some(values) if !values.is_empty() => Ok(values.contains(v)),
                _ => bail!(KubernetesError::malformed_label_selector(expr)),
            },
            None => Ok(false),
        },
        OPERATOR_NOT_IN => match obj_labels.get(&expr.key) {
            Some(v) => match &expr.values {
                Some(values) if !values.is_empty() => Ok(!values.contains(v)),
                _ => bail!(KubernetesError::malformed_label_selector(expr)),
            },
            None => Ok(true),
        },
        OPERATOR_EXISTS => match &expr.values {
            Some(values) if !values.is_empty() => bail!(KubernetesError::malformed_label_selector(expr)),
            _ => Ok(obj_labels.contains_key(&expr.key)),
        },
        OPERATOR_DOES_NOT_EXIST => match &expr.values {
            Some(values) if !values.is_empty() => {
                bail!(KubernetesError::malformed_label_selector(expr));
            },
            _ => Ok(!obj_labels.contains_key(&expr.key)),
        },
        _ => bail!("malformed label selector expression: {:?}", expr),
    }
}

#[cfg(test)]
mod tests;
