use kube::api::{
    Patch,
    PatchParams,
};

use super::ResourceManager;
use crate::cabundle::sanitize_conversion_webhook;
use crate::errors::*;
use crate::jsondiff::{
    ChangeType,
    Diff,
    DiffOptions,
    ROOT_SENTINEL,
    apply_ignore_paths,
    compute_patch,
    mask_secret_patch,
    rationalize_patch,
};
use crate::k8s::{
    ObjectId,
    is_secret,
    matches_any_metadata,
};
use crate::manifests;
use crate::normalize::{
    normalize,
    normalize_dry_run,
};
use crate::prelude::*;

impl ResourceManager {
    // Structured diff of one desired object against the cluster, computed
    // from a server-side dry-run so the comparison sees exactly what a real
    // apply would store.
    pub async fn diff(&self, obj: &DynamicObject, opts: &DiffOptions) -> anyhow::Result<Diff> {
        manifests::validate(obj)?;
        let mut desired = obj.clone();
        normalize(&mut desired)?;
        sanitize_conversion_webhook(&mut desired);
        let id = ObjectId::from_obj(&desired)?;

        let ignore_paths = opts.ignore_paths_for(&desired);
        if matches_any_metadata(&desired, &opts.exclusions) || ignore_paths.iter().any(|p| p == ROOT_SENTINEL) {
            return Ok(Diff::new(ChangeType::Exclude, id));
        }

        let api = self.apis.api_for_obj(&desired).await?;
        let live = api.get_opt(&desired.name_any()).await?;

        let field_manager = opts.field_owner.clone().unwrap_or_else(|| self.owner.field_manager.clone());
        let params = PatchParams { field_manager: Some(field_manager), force: true, dry_run: true, ..Default::default() };
        let mut dry_run = api
            .patch(&desired.name_any(), &params, &Patch::Apply(&desired))
            .await
            .map_err(|e| anyhow!(DryRunError::new(&desired, &id, &e)))?;

        if dry_run.resource_version().unwrap_or_default().is_empty() {
            let mut diff = Diff::new(ChangeType::Create, id);
            diff.dry_run = Some(dry_run);
            return Ok(diff);
        }
        normalize_dry_run(&mut dry_run);

        let mut live_value = match &live {
            Some(obj) => serde_json::to_value(obj)?,
            None => serde_json::json!({}),
        };
        let mut dry_run_value = serde_json::to_value(&dry_run)?;
        apply_ignore_paths(&ignore_paths, &mut live_value, &mut dry_run_value);

        let mut patch = compute_patch(&live_value, &dry_run_value);
        if patch.is_empty() {
            let mut diff = Diff::new(ChangeType::None, id);
            diff.live = live;
            diff.dry_run = Some(dry_run);
            return Ok(diff);
        }

        if opts.rationalize {
            patch = rationalize_patch(patch, &live_value, &dry_run_value);
        }
        if opts.mask_secrets && is_secret(&desired) {
            patch = mask_secret_patch(patch);
        }

        Ok(Diff { change_type: ChangeType::Update, object_id: id, live, dry_run: Some(dry_run), patch })
    }

    // Diff a batch.  Ignore-rule selectors are compiled eagerly at
    // IgnoreRule construction; per-object failures either abort (default) or
    // accumulate into one aggregate error when `graceful` is set.
    pub async fn diff_all(&self, objs: &[DynamicObject], opts: &DiffOptions) -> anyhow::Result<Vec<Diff>> {
        let mut diffs = vec![];
        let mut failures = vec![];
        for obj in objs {
            match self.diff(obj, opts).await {
                Ok(diff) => diffs.push(diff),
                Err(e) if opts.graceful => failures.push(e.to_string()),
                Err(e) => return Err(e),
            }
        }

        if !failures.is_empty() {
            bail!("diff failed for {} object(s): {}", failures.len(), failures.join("; "));
        }
        Ok(diffs)
    }
}
