mod apply;
mod cleanup;
mod delete;
mod diff;
mod drift;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use cleanup::{
    CleanupOptions,
    FieldManagerOperation,
    FieldManagerSpec,
};
pub use drift::has_drifted;
use kube::api::PropagationPolicy;

use crate::changeset::ChangeSet;
use crate::k8s::{
    DynamicApiSet,
    ObjectId,
};
use crate::prelude::*;
use crate::status::{
    ClusterStatusPoller,
    StatusPoller,
    WaitOptions,
    wait_for_set,
    wait_for_termination,
};

// The identity under which the engine claims fields.  `group` names the
// ownership-label domain ("<group>/name", "<group>/namespace").
#[derive(Clone, Debug)]
pub struct Owner {
    pub field_manager: String,
    pub group: String,
}

impl Owner {
    pub fn new(field_manager: &str, group: &str) -> Owner {
        Owner { field_manager: field_manager.into(), group: group.into() }
    }

    pub fn ownership_labels(&self, name: &str, namespace: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (format!("{}/name", self.group), name.into()),
            (format!("{}/namespace", self.group), namespace.into()),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct ApplyOptions {
    // unconditionally delete + recreate on immutable-field errors
    pub force: bool,
    // per-object opt-in to force: any matching label/annotation on desired or live
    pub force_selector: BTreeMap<String, String>,
    // skip (Action::Skipped) any object carrying one of these
    pub exclusion_selector: BTreeMap<String, String>,
    // skip when the object already exists in the cluster
    pub if_not_present_selector: BTreeMap<String, String>,
    pub wait_interval: Duration,
    pub wait_timeout: Duration,
    pub cleanup: Option<CleanupOptions>,
}

impl Default for ApplyOptions {
    fn default() -> ApplyOptions {
        ApplyOptions {
            force: false,
            force_selector: BTreeMap::new(),
            exclusion_selector: BTreeMap::new(),
            if_not_present_selector: BTreeMap::new(),
            wait_interval: Duration::from_secs(2),
            wait_timeout: Duration::from_secs(60),
            cleanup: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeleteOptions {
    pub propagation_policy: PropagationPolicy,
    // full label-selector match against the live object; non-matching objects
    // are skipped
    pub inclusions: Option<metav1::LabelSelector>,
    // any-match policy, same as the apply-side exclusion selector
    pub exclusions: BTreeMap<String, String>,
}

impl Default for DeleteOptions {
    fn default() -> DeleteOptions {
        DeleteOptions {
            propagation_policy: PropagationPolicy::Background,
            inclusions: None,
            exclusions: BTreeMap::new(),
        }
    }
}

// A batch operation stopped early; carries the entries recorded before the
// failure so callers can see how far it got.  Retrieve with
// `err.downcast_ref::<AbortedError>()`.
#[derive(Debug)]
pub struct AbortedError {
    pub change_set: ChangeSet,
    pub source: anyhow::Error,
}

impl AbortedError {
    pub(crate) fn new(change_set: ChangeSet, source: anyhow::Error) -> anyhow::Error {
        anyhow::Error::new(AbortedError { change_set, source })
    }
}

impl fmt::Display for AbortedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for AbortedError {}

// The reconciliation engine.  One long-lived instance is shared across
// concurrent operations; the only state is the owner identity, the client
// handle (behind the discovery cache), the status poller, and the
// read-phase concurrency bound.
pub struct ResourceManager {
    apis: Arc<DynamicApiSet>,
    owner: Owner,
    poller: Arc<dyn StatusPoller>,
    concurrency: usize,
}

impl ResourceManager {
    pub fn new(client: kube::Client, owner: Owner) -> ResourceManager {
        let apis = Arc::new(DynamicApiSet::new(client));
        ResourceManager {
            poller: Arc::new(ClusterStatusPoller::new(apis.clone())),
            apis,
            owner,
            concurrency: 1,
        }
    }

    pub fn with_poller(mut self, poller: Arc<dyn StatusPoller>) -> ResourceManager {
        self.poller = poller;
        self
    }

    // bound on in-flight read/dry-run operations during apply_all; writes are
    // always sequential
    pub fn with_concurrency(mut self, concurrency: usize) -> ResourceManager {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn apis(&self) -> &DynamicApiSet {
        &self.apis
    }

    pub async fn wait_for_set(&self, ids: &[ObjectId], opts: &WaitOptions) -> EmptyResult {
        wait_for_set(self.poller.as_ref(), ids, opts).await
    }

    pub async fn wait_for_termination(&self, ids: &[ObjectId], opts: &WaitOptions) -> EmptyResult {
        wait_for_termination(&self.apis, ids, opts).await
    }
}

#[cfg(test)]
mod tests;
