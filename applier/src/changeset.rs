use std::fmt;

use serde::{
    Deserialize,
    Serialize,
};

use crate::k8s::ObjectId;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Configured,
    Unchanged,
    Deleted,
    Skipped,
    Unknown,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Action::Created => "created",
            Action::Configured => "configured",
            Action::Unchanged => "unchanged",
            Action::Deleted => "deleted",
            Action::Skipped => "skipped",
            Action::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// One record of what the engine did (or decided not to do) to one object.
// Entries are built once and never mutated after landing in a ChangeSet.
#[derive(Clone, Debug)]
pub struct ChangeSetEntry {
    pub object_id: ObjectId,
    pub group_version: String,
    pub subject: String,
    pub action: Action,
}

impl ChangeSetEntry {
    pub fn new(object_id: ObjectId, action: Action) -> ChangeSetEntry {
        ChangeSetEntry {
            subject: object_id.to_string(),
            group_version: object_id.group_version(),
            object_id,
            action,
        }
    }
}

impl fmt::Display for ChangeSetEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.action)
    }
}

// Append-only, ordered; one per top-level engine call.  Entry order equals the
// reconcile-sorted input order regardless of how the work was scheduled.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    pub fn new() -> ChangeSet {
        ChangeSet::default()
    }

    pub fn add(&mut self, entry: ChangeSetEntry) {
        self.entries.push(entry);
    }

    pub fn append(&mut self, other: ChangeSet) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_object_ids(&self) -> Vec<ObjectId> {
        self.entries.iter().map(|e| e.object_id.clone()).collect()
    }

    pub fn entry_for_subject(&self, subject: &str) -> Option<&ChangeSetEntry> {
        self.entries.iter().find(|e| e.subject == subject)
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
