pub mod compute;
mod poller;
mod waiter;

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use futures::stream::BoxStream;
pub use poller::ClusterStatusPoller;
use serde::Serialize;
use tokio::time::Instant;
pub use waiter::{
    wait_for_set,
    wait_for_termination,
};

use crate::errors::*;
use crate::k8s::ObjectId;
use crate::prelude::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Status {
    Current,
    InProgress,
    Failed,
    NotFound,
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Status::Current => "Current",
            Status::InProgress => "InProgress",
            Status::Failed => "Failed",
            Status::NotFound => "NotFound",
            Status::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PollError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Transport(String),
}

// One observation of one object from the polling stream.  `resource` rides
// along so the waiter can apply policy that depends on the object itself
// (e.g. suspended objects are excluded from failure diagnostics).
#[derive(Clone, Debug)]
pub struct StatusEvent {
    pub id: ObjectId,
    pub status: Status,
    pub resource: Option<DynamicObject>,
    pub error: Option<PollError>,
}

#[derive(Clone, Debug)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
    pub fail_fast: bool,
    // Jobs with a TTL may be reaped by the cluster the moment they complete;
    // NotFound counts as success for these identities
    pub jobs_with_ttl: HashSet<ObjectId>,
}

impl Default for WaitOptions {
    fn default() -> WaitOptions {
        WaitOptions {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
            fail_fast: false,
            jobs_with_ttl: HashSet::new(),
        }
    }
}

// The seam between the waiter and whatever watches the cluster: an
// implementation emits a StatusEvent per identity per tick until the deadline,
// then broadcasts one final DeadlineExceeded-flagged event per identity and
// ends the stream.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait StatusPoller: Send + Sync {
    fn poll(&self, ids: Vec<ObjectId>, interval: Duration, deadline: Instant) -> BoxStream<'static, StatusEvent>;
}

#[cfg(test)]
mod tests;
