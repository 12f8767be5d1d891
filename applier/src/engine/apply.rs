use futures::StreamExt;
use futures::stream;
use kube::api::{
    DeleteParams,
    Patch,
    PatchParams,
    PropagationPolicy,
};
use tokio::time::{
    Instant,
    sleep,
};
use tracing::*;

use super::{
    AbortedError,
    ApplyOptions,
    ResourceManager,
    cleanup,
    drift,
};
use crate::cabundle::sanitize_conversion_webhook;
use crate::changeset::{
    Action,
    ChangeSet,
    ChangeSetEntry,
};
use crate::errors::*;
use crate::k8s::{
    ObjectId,
    is_cluster_definition,
    matches_any_metadata,
};
use crate::manifests;
use crate::normalize::{
    normalize,
    normalize_dry_run,
};
use crate::prelude::*;
use crate::sort::sort_for_apply;
use crate::status::WaitOptions;

// Outcome of the read/diff phase for one object: either the decision is
// already final (skipped/unchanged), or a real apply still has to happen in
// the sequential write phase.
enum Staged {
    Done(ChangeSetEntry),
    NeedsApply { desired: DynamicObject, existed: bool },
}

impl ResourceManager {
    // Reconcile one object: fetch live state, run the skip checks, dry-run,
    // recover from immutable-field rejections when force-eligible, clean up
    // metadata/field managers, and apply for real only if something drifted.
    pub async fn apply(&self, obj: &DynamicObject, opts: &ApplyOptions) -> anyhow::Result<ChangeSetEntry> {
        let desired = self.prepare(obj)?;
        match self.reconcile_object(&desired, opts).await? {
            Staged::Done(entry) => Ok(entry),
            Staged::NeedsApply { desired, existed } => self.run_apply(&desired, existed).await,
        }
    }

    // Apply a batch in reconcile order.  The read/dry-run phase runs with
    // bounded parallelism; output slots are pre-assigned by sorted position so
    // the change set always reads in input order.  The write phase is strictly
    // sequential -- interleaved creates/updates with dependencies between them
    // are not worth debugging.
    pub async fn apply_all(&self, objs: &[DynamicObject], opts: &ApplyOptions) -> anyhow::Result<ChangeSet> {
        let mut sorted = Vec::with_capacity(objs.len());
        for obj in objs {
            sorted.push(self.prepare(obj)?);
        }
        sort_for_apply(&mut sorted);

        let staged: Vec<anyhow::Result<Staged>> = stream::iter(sorted.iter().map(|o| self.reconcile_object(o, opts)))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut change_set = ChangeSet::new();
        for result in staged {
            let entry = match result {
                Ok(Staged::Done(entry)) => entry,
                Ok(Staged::NeedsApply { desired, existed }) => {
                    match self.run_apply(&desired, existed).await {
                        Ok(entry) => entry,
                        Err(e) => return Err(AbortedError::new(change_set, e)),
                    }
                },
                Err(e) => return Err(AbortedError::new(change_set, e)),
            };
            debug!("{entry}");
            change_set.add(entry);
        }
        Ok(change_set)
    }

    // Two-stage apply: cluster-scoped definitions (CRDs, Namespaces) go
    // first and must report Current before anything that might depend on them
    // is even read.
    pub async fn apply_all_staged(&self, objs: &[DynamicObject], opts: &ApplyOptions) -> anyhow::Result<ChangeSet> {
        let (stage_one, stage_two): (Vec<_>, Vec<_>) = objs.iter().cloned().partition(is_cluster_definition);

        let mut change_set = ChangeSet::new();
        if !stage_one.is_empty() {
            change_set.append(self.apply_all(&stage_one, opts).await?);

            let ids: Vec<ObjectId> = change_set
                .entries
                .iter()
                .filter(|e| e.action != Action::Skipped)
                .map(|e| e.object_id.clone())
                .collect();
            let wait_opts = WaitOptions {
                interval: opts.wait_interval,
                timeout: opts.wait_timeout,
                fail_fast: false,
                ..Default::default()
            };
            if let Err(e) = self.wait_for_set(&ids, &wait_opts).await {
                return Err(AbortedError::new(change_set, e));
            }
        }

        match self.apply_all(&stage_two, opts).await {
            Ok(cs) => {
                change_set.append(cs);
                Ok(change_set)
            },
            Err(e) => match e.downcast::<AbortedError>() {
                Ok(aborted) => {
                    change_set.append(aborted.change_set);
                    Err(AbortedError::new(change_set, aborted.source))
                },
                Err(e) => Err(AbortedError::new(change_set, e)),
            },
        }
    }

    fn prepare(&self, obj: &DynamicObject) -> anyhow::Result<DynamicObject> {
        manifests::validate(obj)?;
        let mut desired = obj.clone();
        normalize(&mut desired)?;
        sanitize_conversion_webhook(&mut desired);
        Ok(desired)
    }

    async fn reconcile_object(&self, desired: &DynamicObject, opts: &ApplyOptions) -> anyhow::Result<Staged> {
        let id = ObjectId::from_obj(desired)?;
        let api = self.apis.api_for_obj(desired).await?;

        // not-found is a normal state here; any other get failure aborts
        let mut live = api.get_opt(&desired.name_any()).await?;

        if matches_any_metadata(desired, &opts.exclusion_selector)
            || live.as_ref().is_some_and(|l| matches_any_metadata(l, &opts.exclusion_selector))
        {
            debug!("skipping {id}, matches exclusion selector");
            return Ok(Staged::Done(ChangeSetEntry::new(id, Action::Skipped)));
        }
        if live.as_ref().is_some_and(|l| l.uid().is_some()) && matches_any_metadata(desired, &opts.if_not_present_selector)
        {
            debug!("skipping {id}, already present in cluster");
            return Ok(Staged::Done(ChangeSetEntry::new(id, Action::Skipped)));
        }

        let mut dry_run = match self.dry_run_apply(&api, desired).await {
            Ok(obj) => obj,
            Err(err)
                if live.is_some()
                    && is_immutable_error(&err)
                    && self.force_eligible(desired, live.as_ref(), opts) =>
            {
                info!("{id} has immutable field changes, deleting and recreating");
                self.delete_and_wait(&api, desired, &id, opts).await?;
                // the old object is gone; everything downstream must treat
                // this as a fresh create
                live = None;
                self.dry_run_apply(&api, desired)
                    .await
                    .map_err(|e| anyhow!(DryRunError::new(desired, &id, &e)))?
            },
            Err(err) => return Err(anyhow!(DryRunError::new(desired, &id, &err))),
        };
        normalize_dry_run(&mut dry_run);

        let mut patched_live = None;
        if let (Some(live_obj), Some(cleanup_opts)) = (&live, &opts.cleanup)
            && !matches_any_metadata(live_obj, &cleanup_opts.exclusions)
            && !matches_any_metadata(desired, &cleanup_opts.exclusions)
        {
            let patch = cleanup::build_cleanup_patch(live_obj, &self.owner, cleanup_opts)?;
            if !patch.0.is_empty() {
                debug!("cleaning up metadata on {id}");
                let params = PatchParams { field_manager: Some(self.owner.field_manager.clone()), ..Default::default() };
                patched_live =
                    Some(api.patch(&desired.name_any(), &params, &Patch::<DynamicObject>::Json(patch)).await?);
            }
        }

        let cleaned = patched_live.is_some();
        if !cleaned
            && let Some(live_obj) = &live
            && !drift::has_drifted(live_obj, &dry_run)
        {
            return Ok(Staged::Done(ChangeSetEntry::new(id, Action::Unchanged)));
        }

        Ok(Staged::NeedsApply { desired: desired.clone(), existed: live.is_some() })
    }

    async fn run_apply(&self, desired: &DynamicObject, existed: bool) -> anyhow::Result<ChangeSetEntry> {
        let id = ObjectId::from_obj(desired)?;
        let api = self.apis.api_for_obj(desired).await?;
        let params = PatchParams {
            field_manager: Some(self.owner.field_manager.clone()),
            force: true,
            ..Default::default()
        };
        api.patch(&desired.name_any(), &params, &Patch::Apply(desired)).await?;

        let action = if existed { Action::Configured } else { Action::Created };
        Ok(ChangeSetEntry::new(id, action))
    }

    async fn dry_run_apply(
        &self,
        api: &kube::Api<DynamicObject>,
        desired: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error> {
        let params = PatchParams {
            field_manager: Some(self.owner.field_manager.clone()),
            force: true,
            dry_run: true,
            ..Default::default()
        };
        api.patch(&desired.name_any(), &params, &Patch::Apply(desired)).await
    }

    fn force_eligible(&self, desired: &DynamicObject, live: Option<&DynamicObject>, opts: &ApplyOptions) -> bool {
        opts.force
            || matches_any_metadata(desired, &opts.force_selector)
            || live.is_some_and(|l| matches_any_metadata(l, &opts.force_selector))
    }

    // Background-delete the object and poll until the apiserver reports
    // NotFound; the recreate must observe the deletion or the next apply just
    // hits the same immutable error.
    async fn delete_and_wait(
        &self,
        api: &kube::Api<DynamicObject>,
        desired: &DynamicObject,
        id: &ObjectId,
        opts: &ApplyOptions,
    ) -> EmptyResult {
        let params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };
        match api.delete(&desired.name_any(), &params).await {
            Ok(_) => (),
            Err(e) if is_not_found(&e) => (),
            Err(e) => return Err(e.into()),
        }

        let deadline = Instant::now() + opts.wait_timeout;
        loop {
            if api.get_opt(&desired.name_any()).await?.is_none() {
                return Ok(());
            }
            if Instant::now() + opts.wait_interval >= deadline {
                bail!("timed out waiting for {id} to be deleted before recreation");
            }
            sleep(opts.wait_interval).await;
        }
    }
}
