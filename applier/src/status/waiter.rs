use std::collections::HashMap;

use futures::StreamExt;
use tokio::time::{
    Instant,
    sleep,
};
use tracing::*;

use super::{
    PollError,
    Status,
    StatusEvent,
    StatusPoller,
    WaitOptions,
};
use crate::errors::*;
use crate::k8s::{
    DynamicApiSet,
    ObjectId,
    is_suspended,
};

struct Collector<'a> {
    opts: &'a WaitOptions,
    ids: &'a [ObjectId],
    latest: HashMap<ObjectId, StatusEvent>,
    deadline_hit: bool,
}

impl<'a> Collector<'a> {
    fn new(ids: &'a [ObjectId], opts: &'a WaitOptions) -> Collector<'a> {
        Collector { opts, ids, latest: HashMap::new(), deadline_hit: false }
    }

    // Record an event; deadline-exceeded events are broadcast to every
    // identity by the polling layer, and must not clobber a meaningful status
    // observed moments earlier.
    fn observe(&mut self, ev: StatusEvent) {
        if matches!(ev.error, Some(PollError::DeadlineExceeded)) {
            self.deadline_hit = true;
            self.latest.entry(ev.id.clone()).or_insert(ev);
            return;
        }
        self.latest.insert(ev.id.clone(), ev);
    }

    fn status_of(&self, id: &ObjectId) -> Status {
        self.latest.get(id).map(|ev| ev.status).unwrap_or(Status::Unknown)
    }

    // "done" in the success sense: Current, or a TTL-job that was already
    // reaped by the cluster
    fn is_current(&self, id: &ObjectId) -> bool {
        match self.status_of(id) {
            Status::Current => true,
            Status::NotFound => self.opts.jobs_with_ttl.contains(id),
            _ => false,
        }
    }

    fn is_terminal(&self, id: &ObjectId) -> bool {
        self.is_current(id) || self.status_of(id) == Status::Failed
    }

    fn failed_count(&self) -> usize {
        self.ids.iter().filter(|id| self.status_of(id) == Status::Failed).count()
    }

    fn all_current(&self) -> bool {
        self.ids.iter().all(|id| self.is_current(id))
    }

    fn all_terminal(&self) -> bool {
        self.ids.iter().all(|id| self.is_terminal(id))
    }

    fn transport_error(&self) -> Option<String> {
        self.ids.iter().find_map(|id| match self.latest.get(id)?.error.as_ref()? {
            PollError::Transport(msg) => Some(msg.clone()),
            _ => None,
        })
    }

    // One diagnostic line per object that is actually a problem.  Suspended
    // objects never contribute: their controller will not reconcile them, so
    // holding the batch hostage on their status helps nobody.
    fn diagnostics(&self) -> Vec<String> {
        let mut problems = vec![];
        for id in self.ids {
            if self.is_current(id) {
                continue;
            }
            let ev = self.latest.get(id);
            if ev.and_then(|e| e.resource.as_ref()).is_some_and(is_suspended) {
                continue;
            }

            let status = self.status_of(id);
            if status == Status::Failed || self.deadline_hit {
                match ev.and_then(|e| e.error.as_ref()) {
                    Some(PollError::Transport(msg)) => problems.push(format!("{id} status: '{status}': {msg}")),
                    _ => problems.push(format!("{id} status: '{status}'")),
                }
            }
        }
        problems
    }
}

// Wait until every identity reaches its terminal healthy state, failing fast
// (or slow) per the options.  External cancellation is the caller dropping
// this future; everything in here is cancel-safe.
pub async fn wait_for_set(poller: &dyn StatusPoller, ids: &[ObjectId], opts: &WaitOptions) -> EmptyResult {
    if ids.is_empty() {
        return Ok(());
    }

    debug!("waiting for {} object(s) to become ready", ids.len());
    let deadline = Instant::now() + opts.timeout;
    let mut stream = poller.poll(ids.to_vec(), opts.interval, deadline);
    let mut collector = Collector::new(ids, opts);

    while let Some(ev) = stream.next().await {
        collector.observe(ev);

        if collector.all_current() {
            return Ok(());
        }
        if opts.fail_fast && collector.failed_count() > 0 {
            debug!("failing fast");
            break;
        }
        if collector.all_terminal() {
            break;
        }
    }

    if let Some(msg) = collector.transport_error() {
        bail!("status poll failed: {msg}");
    }

    let problems = collector.diagnostics();
    if problems.is_empty() {
        // everything terminal, and whatever wasn't Current was suspended
        return Ok(());
    }
    if collector.deadline_hit {
        bail!(WaitError::timeout(&problems.join(", ")));
    }
    bail!(WaitError::stalled(&problems.join(", ")));
}

// Wait for every identity to disappear from the cluster; used after
// force-recreates and teardown flows.
pub async fn wait_for_termination(apis: &DynamicApiSet, ids: &[ObjectId], opts: &WaitOptions) -> EmptyResult {
    let deadline = Instant::now() + opts.timeout;
    loop {
        let mut remaining = vec![];
        for id in ids {
            let api = apis.api_for_id(id).await?;
            if api.get_opt(&id.name).await?.is_some() {
                remaining.push(id.to_string());
            }
        }
        if remaining.is_empty() {
            return Ok(());
        }
        if Instant::now() + opts.interval >= deadline {
            bail!(WaitError::termination_timeout(&remaining.join(", ")));
        }
        sleep(opts.interval).await;
    }
}
