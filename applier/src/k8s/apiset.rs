use std::collections::HashMap;
use std::sync::Mutex;

use kube::api::{
    ApiResource,
    GroupVersionKind,
};
use kube::discovery::{
    ApiCapabilities,
    Scope,
};

use crate::errors::*;
use crate::k8s::ObjectId;
use crate::prelude::*;

// A DynamicApiSet caches the ApiResources returned by the apiserver so that we
// don't have to repeatedly make "discovery" calls against it.  Unlike a plain
// per-task cache, the maps sit behind a Mutex so one long-lived manager can
// resolve APIs from &self on every concurrent operation.  The lock is never
// held across an await; a discovery miss may race and fetch twice, which is
// harmless.
pub struct DynamicApiSet {
    client: kube::Client,
    resources: Mutex<HashMap<GroupVersionKind, (ApiResource, ApiCapabilities)>>,
}

impl DynamicApiSet {
    pub fn new(client: kube::Client) -> DynamicApiSet {
        DynamicApiSet { client, resources: Mutex::new(HashMap::new()) }
    }

    pub fn client(&self) -> &kube::Client {
        &self.client
    }

    pub async fn api_for(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> anyhow::Result<kube::Api<DynamicObject>> {
        let (ar, caps) = self.api_meta_for(gvk).await?;
        if caps.scope == Scope::Namespaced {
            match namespace {
                Some(ns) if !ns.is_empty() => Ok(kube::Api::namespaced_with(self.client.clone(), ns, &ar)),
                _ => bail!(InvalidObjectError::missing_namespace(&gvk.kind)),
            }
        } else {
            Ok(kube::Api::all_with(self.client.clone(), &ar))
        }
    }

    pub async fn api_for_obj(&self, obj: &DynamicObject) -> anyhow::Result<kube::Api<DynamicObject>> {
        let id = ObjectId::from_obj(obj)?;
        self.api_for_id(&id).await
    }

    pub async fn api_for_id(&self, id: &ObjectId) -> anyhow::Result<kube::Api<DynamicObject>> {
        self.api_for(&id.gvk(), Some(&id.namespace)).await
    }

    async fn api_meta_for(&self, gvk: &GroupVersionKind) -> anyhow::Result<(ApiResource, ApiCapabilities)> {
        if let Some(meta) = self.resources.lock().unwrap().get(gvk) {
            return Ok(meta.clone());
        }

        let api_meta = kube::discovery::pinned_kind(&self.client, gvk).await?;
        self.resources.lock().unwrap().insert(gvk.clone(), api_meta.clone());
        Ok(api_meta)
    }
}
