use regex::Regex;

use crate::errors::*;
use crate::k8s::{
    selector_matches,
    validate_label_selector,
};
use crate::prelude::*;

// Caller-facing, all-strings description of a selector; empty fields match
// anything.  Compiled eagerly into a Selector so malformed regexes and label
// expressions fail at construction instead of mid-reconcile.
#[derive(Clone, Debug, Default)]
pub struct SelectorSpec {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub label_selector: Option<metav1::LabelSelector>,
    pub annotation_selector: Option<metav1::LabelSelector>,
}

#[derive(Clone, Debug, Default)]
pub struct Selector {
    group: Option<Regex>,
    version: Option<Regex>,
    kind: Option<Regex>,
    name: Option<Regex>,
    namespace: Option<Regex>,
    label_selector: Option<metav1::LabelSelector>,
    annotation_selector: Option<metav1::LabelSelector>,
}

fn compile(pattern: &str) -> anyhow::Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Ok(Some(Regex::new(pattern)?))
}

impl Selector {
    pub fn new(spec: SelectorSpec) -> anyhow::Result<Selector> {
        if let Some(sel) = &spec.label_selector {
            validate_label_selector(sel)?;
        }
        if let Some(sel) = &spec.annotation_selector {
            validate_label_selector(sel)?;
        }

        Ok(Selector {
            group: compile(&spec.group)?,
            version: compile(&spec.version)?,
            kind: compile(&spec.kind)?,
            name: compile(&spec.name)?,
            namespace: compile(&spec.namespace)?,
            label_selector: spec.label_selector,
            annotation_selector: spec.annotation_selector,
        })
    }

    pub fn matches(&self, obj: &DynamicObject) -> bool {
        let (group, version) = match &obj.types {
            Some(t) => match t.api_version.split_once('/') {
                Some((g, v)) => (g.to_string(), v.to_string()),
                None => (String::new(), t.api_version.clone()),
            },
            None => (String::new(), String::new()),
        };
        let kind = obj.types.as_ref().map(|t| t.kind.clone()).unwrap_or_default();
        let name = obj.name_any();
        let namespace = obj.namespace().unwrap_or_default();

        let field_match = [
            (&self.group, group.as_str()),
            (&self.version, version.as_str()),
            (&self.kind, kind.as_str()),
            (&self.name, name.as_str()),
            (&self.namespace, namespace.as_str()),
        ]
        .iter()
        .all(|(re, value)| re.as_ref().is_none_or(|re| re.is_match(value)));
        if !field_match {
            return false;
        }

        // expressions were validated at construction, so evaluation can't fail
        if let Some(sel) = &self.label_selector
            && !selector_matches(sel, obj.labels()).unwrap_or(false)
        {
            return false;
        }
        if let Some(sel) = &self.annotation_selector
            && !selector_matches(sel, obj.annotations()).unwrap_or(false)
        {
            return false;
        }
        true
    }
}
