pub mod cabundle;
pub mod changeset;
pub mod engine;
pub mod errors;
pub mod jsondiff;
pub mod jsonutils;
pub mod k8s;
pub mod logging;
pub mod manifests;
pub mod normalize;
pub mod patch;
pub mod selector;
pub mod sort;
pub mod status;

pub mod prelude {
    pub use k8s_openapi::api::core::v1 as corev1;
    pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
    pub use kube::ResourceExt;
    pub use kube::api::DynamicObject;

    pub use crate::changeset::{
        Action,
        ChangeSet,
        ChangeSetEntry,
    };
    pub use crate::engine::{
        ApplyOptions,
        DeleteOptions,
        Owner,
        ResourceManager,
    };
    pub use crate::errors::EmptyResult;
    pub use crate::k8s::{
        KubeResourceExt,
        ObjectId,
    };
    pub use crate::status::WaitOptions;
}
