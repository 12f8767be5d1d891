use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{
    self,
    BoxStream,
};
use tokio::time::{
    Instant,
    sleep_until,
};

use super::compute::compute_status;
use super::{
    PollError,
    Status,
    StatusEvent,
    StatusPoller,
};
use crate::k8s::{
    DynamicApiSet,
    ObjectId,
};

// The default StatusPoller: one get per identity per tick.  Transport errors
// ride on the event rather than killing the stream, since a flaky get on one
// tick says nothing about the next.  When the deadline passes, every identity
// gets one final DeadlineExceeded-flagged event and the stream ends; the
// waiter knows not to let those clobber real observations.
pub struct ClusterStatusPoller {
    apis: Arc<DynamicApiSet>,
}

impl ClusterStatusPoller {
    pub fn new(apis: Arc<DynamicApiSet>) -> ClusterStatusPoller {
        ClusterStatusPoller { apis }
    }
}

struct PollState {
    apis: Arc<DynamicApiSet>,
    ids: Vec<ObjectId>,
    interval: Duration,
    deadline: Instant,
    buf: VecDeque<StatusEvent>,
    next_tick: Instant,
    done: bool,
}

async fn check_one(apis: &DynamicApiSet, id: &ObjectId) -> StatusEvent {
    let api = match apis.api_for_id(id).await {
        Ok(api) => api,
        Err(e) => {
            return StatusEvent {
                id: id.clone(),
                status: Status::Unknown,
                resource: None,
                error: Some(PollError::Transport(e.to_string())),
            };
        },
    };

    match api.get_opt(&id.name).await {
        Ok(Some(obj)) => {
            StatusEvent { id: id.clone(), status: compute_status(&obj), resource: Some(obj), error: None }
        },
        Ok(None) => StatusEvent { id: id.clone(), status: Status::NotFound, resource: None, error: None },
        Err(e) => StatusEvent {
            id: id.clone(),
            status: Status::Unknown,
            resource: None,
            error: Some(PollError::Transport(e.to_string())),
        },
    }
}

impl StatusPoller for ClusterStatusPoller {
    fn poll(&self, ids: Vec<ObjectId>, interval: Duration, deadline: Instant) -> BoxStream<'static, StatusEvent> {
        let state = PollState {
            apis: self.apis.clone(),
            ids,
            interval,
            deadline,
            buf: VecDeque::new(),
            next_tick: Instant::now(),
            done: false,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                if let Some(ev) = st.buf.pop_front() {
                    return Some((ev, st));
                }
                if st.done {
                    return None;
                }

                if st.next_tick >= st.deadline {
                    sleep_until(st.deadline).await;
                    for id in &st.ids {
                        st.buf.push_back(StatusEvent {
                            id: id.clone(),
                            status: Status::Unknown,
                            resource: None,
                            error: Some(PollError::DeadlineExceeded),
                        });
                    }
                    st.done = true;
                    continue;
                }

                sleep_until(st.next_tick).await;
                st.next_tick = Instant::now() + st.interval;
                for i in 0..st.ids.len() {
                    let ev = check_one(&st.apis, &st.ids[i]).await;
                    st.buf.push_back(ev);
                }
            }
        })
        .boxed()
    }
}
