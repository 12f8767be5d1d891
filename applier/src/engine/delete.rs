use kube::api::DeleteParams;
use tracing::*;

use super::{
    AbortedError,
    DeleteOptions,
    ResourceManager,
};
use crate::changeset::{
    Action,
    ChangeSet,
    ChangeSetEntry,
};
use crate::errors::*;
use crate::k8s::{
    KubeResourceExt,
    ObjectId,
    matches_any_metadata,
};
use crate::prelude::*;
use crate::sort::sort_for_delete;

impl ResourceManager {
    // Delete one object.  A missing live object is already the desired end
    // state, so it reports `deleted` rather than erroring.
    pub async fn delete(&self, obj: &DynamicObject, opts: &DeleteOptions) -> anyhow::Result<ChangeSetEntry> {
        let id = ObjectId::from_obj(obj)?;
        let api = self.apis.api_for_obj(obj).await?;

        let Some(live) = api.get_opt(&obj.name_any()).await? else {
            return Ok(ChangeSetEntry::new(id, Action::Deleted));
        };

        if let Some(inclusions) = &opts.inclusions
            && !live.matches(inclusions)?
        {
            debug!("skipping {id}, does not match inclusion selector");
            return Ok(ChangeSetEntry::new(id, Action::Skipped));
        }
        if matches_any_metadata(&live, &opts.exclusions) {
            debug!("skipping {id}, matches exclusion selector");
            return Ok(ChangeSetEntry::new(id, Action::Skipped));
        }

        let params = DeleteParams {
            propagation_policy: Some(opts.propagation_policy.clone()),
            ..Default::default()
        };
        match api.delete(&obj.name_any(), &params).await {
            Ok(_) => (),
            Err(e) if is_not_found(&e) => (),
            Err(e) => return Err(e.into()),
        }
        Ok(ChangeSetEntry::new(id, Action::Deleted))
    }

    // Delete a batch in reverse reconcile order, sequentially.  Per-object
    // failures don't stop the sweep; they accumulate into one aggregate error
    // alongside the partial change set.
    pub async fn delete_all(&self, objs: &[DynamicObject], opts: &DeleteOptions) -> anyhow::Result<ChangeSet> {
        let mut sorted = objs.to_vec();
        sort_for_delete(&mut sorted);

        let mut change_set = ChangeSet::new();
        let mut failures = vec![];
        for obj in &sorted {
            match self.delete(obj, opts).await {
                Ok(entry) => {
                    debug!("{entry}");
                    change_set.add(entry);
                },
                Err(e) => failures.push(format!("{}: {e}", obj.namespaced_name())),
            }
        }

        if !failures.is_empty() {
            return Err(AbortedError::new(change_set, anyhow!(failures.join("; "))));
        }
        Ok(change_set)
    }
}
