// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Bootstrap: contact the initial peer's resolved endpoints one at a
//! time until one responds, then refresh every non-empty bucket.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use rand::RngCore;
use tracing::instrument;

use crate::error::Error;
use crate::id::Id;
use crate::routing_table::{RoutingTable, random_id_in_bucket};
use crate::tasks::notify_peer;
use crate::tracker::Tracker;
use crate::transport::Transport;
use crate::wire::message::Message;

struct DiscoverNeighborsTask<T: Transport + 'static> {
    endpoints: VecDeque<SocketAddr>,
    tracker: Tracker<T>,
    local_id: Id,
    request_timeout: Duration,
    is_finished: bool,
    on_result: Option<Box<dyn FnOnce(Result<(), Error>)>>,
}

/// Starts bootstrap against `endpoints` (the initial peer's resolved
/// addresses, tried in order). On success, fires one notify-peer task
/// per non-empty bucket of `routing_table` to fill it out. `on_result`
/// fires exactly once; failure is fatal (`InitialPeerFailedToRespond`)
/// once every endpoint has been tried.
#[instrument(skip(endpoints, tracker, on_result))]
pub fn start<T: Transport + 'static>(
    endpoints: Vec<SocketAddr>,
    tracker: Tracker<T>,
    local_id: Id,
    request_timeout: Duration,
    on_result: impl FnOnce(Result<(), Error>) + 'static,
) {
    let state = Rc::new(RefCell::new(DiscoverNeighborsTask {
        endpoints: endpoints.into(),
        tracker,
        local_id,
        request_timeout,
        is_finished: false,
        on_result: Some(Box::new(on_result)),
    }));

    try_next(&state);
}

fn try_next<T: Transport + 'static>(state: &Rc<RefCell<DiscoverNeighborsTask<T>>>) {
    let next = state.borrow_mut().endpoints.pop_front();
    match next {
        None => finish(state, Err(Error::InitialPeerFailedToRespond)),
        Some(endpoint) => {
            let target = state.borrow().local_id;
            let timeout = state.borrow().request_timeout;
            let body = Message::FindPeerRequest { target };

            let state_ok = Rc::clone(state);
            let state_err = Rc::clone(state);

            state.borrow().tracker.send_request(
                body,
                endpoint,
                timeout,
                move |_sender, response| on_response(&state_ok, response),
                move |_err| on_error(&state_err),
            );
        }
    }
}

fn on_response<T: Transport + 'static>(
    state: &Rc<RefCell<DiscoverNeighborsTask<T>>>,
    response: Message,
) {
    if state.borrow().is_finished {
        return;
    }
    if let Message::FindPeerResponse { .. } = response {
        finish(state, Ok(()));
    }
}

fn on_error<T: Transport + 'static>(state: &Rc<RefCell<DiscoverNeighborsTask<T>>>) {
    if state.borrow().is_finished {
        return;
    }
    try_next(state);
}

fn finish<T: Transport + 'static>(
    state: &Rc<RefCell<DiscoverNeighborsTask<T>>>,
    result: Result<(), Error>,
) {
    let callback = {
        let mut s = state.borrow_mut();
        if s.is_finished {
            return;
        }
        s.is_finished = true;
        s.on_result.take()
    };
    if let Some(callback) = callback {
        callback(result);
    }
}

/// Fires one notify-peer task per non-empty bucket in `routing_table`,
/// using a random target id that falls in each bucket. Called by the
/// engine once bootstrap succeeds (the engine owns the routing table
/// and the peers the response just populated it with).
pub fn refresh_all_buckets<T: Transport + 'static>(
    routing_table: &RoutingTable,
    tracker: &Tracker<T>,
    k: usize,
    request_timeout: Duration,
    rng: &mut impl RngCore,
) {
    let local_id = routing_table.local_id();
    let buckets: Vec<usize> = routing_table.non_empty_buckets().collect();
    for bucket in buckets {
        let target = random_id_in_bucket(&local_id, bucket, rng);
        notify_peer::start(routing_table, tracker.clone(), target, k, request_timeout);
    }
}
