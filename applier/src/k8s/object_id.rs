use std::cmp::Ordering;
use std::fmt;
use std::hash::{
    Hash,
    Hasher,
};

use kube::api::GroupVersionKind;

use crate::errors::*;
use crate::prelude::*;

// Canonical identity for an object across dry-run, apply, diff, wait, and
// change-set entries.  Identity is (group, kind, namespace, name); the version
// rides along so that APIs can be resolved without a round-trip through
// discovery's preferred-version logic, but it does not participate in
// equality or ordering.
#[derive(Clone, Debug)]
pub struct ObjectId {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectId {
    pub fn new(group: &str, version: &str, kind: &str, namespace: &str, name: &str) -> ObjectId {
        ObjectId {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_obj(obj: &DynamicObject) -> anyhow::Result<ObjectId> {
        let types = obj
            .types
            .as_ref()
            .ok_or_else(|| InvalidObjectError::missing_type_meta(&obj.name_any()))?;
        let gvk: GroupVersionKind = types.try_into()?;
        let name = obj.metadata.name.clone().ok_or_else(|| InvalidObjectError::missing_name(&gvk.kind))?;

        Ok(ObjectId {
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            namespace: obj.namespace().unwrap_or_default(),
            name,
        })
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&self.group, &self.version, &self.kind)
    }

    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    fn identity(&self) -> (&str, &str, &str, &str) {
        (&self.group, &self.kind, &self.namespace, &self.name)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}
