// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Iterative store-value: write `(key, value)` to the `c` closest live
//! peers.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::instrument;

use crate::error::Error;
use crate::id::Id;
use crate::routing_table::RoutingTable;
use crate::tasks::{ALPHA, C};
use crate::tasks::lookup::LookupTask;
use crate::tracker::Tracker;
use crate::transport::Transport;
use crate::wire::message::Message;

struct StoreValueTask<T: Transport + 'static> {
    lookup: LookupTask,
    tracker: Tracker<T>,
    request_timeout: Duration,
    key_hash: Id,
    value: Vec<u8>,
    is_caller_notified: bool,
    on_result: Option<Box<dyn FnOnce(Result<(), Error>)>>,
}

/// Starts a store-value task for `(key_hash, value)`, seeded with up to
/// `k` peers from `routing_table`. `on_result` fires exactly once.
#[instrument(skip(routing_table, tracker, value, on_result))]
pub fn start<T: Transport + 'static>(
    routing_table: &RoutingTable,
    tracker: Tracker<T>,
    key_hash: Id,
    value: Vec<u8>,
    k: usize,
    request_timeout: Duration,
    on_result: impl FnOnce(Result<(), Error>) + 'static,
) {
    let mut lookup = LookupTask::new(key_hash);
    lookup.seed(routing_table.closest(&key_hash, k));

    let state = Rc::new(RefCell::new(StoreValueTask {
        lookup,
        tracker,
        request_timeout,
        key_hash,
        value,
        is_caller_notified: false,
        on_result: Some(Box::new(on_result)),
    }));

    advance(&state);
}

fn advance<T: Transport + 'static>(state: &Rc<RefCell<StoreValueTask<T>>>) {
    let to_contact = {
        let mut s = state.borrow_mut();
        if s.is_caller_notified {
            return;
        }
        s.lookup.select_new_closest(ALPHA)
    };

    if to_contact.is_empty() {
        let done = state.borrow().lookup.all_requests_completed();
        if done {
            complete(state);
        }
        return;
    }

    for peer in to_contact {
        let target = state.borrow().lookup.target();
        let timeout = state.borrow().request_timeout;
        let body = Message::FindPeerRequest { target };

        let state_ok = Rc::clone(state);
        let state_err = Rc::clone(state);
        let peer_id = peer.id;

        state.borrow().tracker.send_request(
            body,
            peer.endpoint,
            timeout,
            move |_sender, response| on_response(&state_ok, peer_id, response),
            move |_err| on_error(&state_err, peer_id),
        );
    }
}

fn on_response<T: Transport + 'static>(
    state: &Rc<RefCell<StoreValueTask<T>>>,
    peer_id: Id,
    response: Message,
) {
    if state.borrow().is_caller_notified {
        return;
    }

    if let Message::FindPeerResponse { peers } = response {
        state.borrow_mut().lookup.mark_responded(peer_id);
        let added_closer = state
            .borrow_mut()
            .lookup
            .add_candidates(peers.into_iter().map(Into::into));
        if added_closer {
            advance(state);
        } else if state.borrow().lookup.all_requests_completed() {
            complete(state);
        }
    }
}

fn on_error<T: Transport + 'static>(state: &Rc<RefCell<StoreValueTask<T>>>, peer_id: Id) {
    if state.borrow().is_caller_notified {
        return;
    }
    state.borrow_mut().lookup.mark_invalid(peer_id);
    advance(state);
}

/// Called once a round settles with no further progress possible:
/// sends `STORE_REQUEST` to the `c` closest responded peers, or fails
/// if none responded.
fn complete<T: Transport + 'static>(state: &Rc<RefCell<StoreValueTask<T>>>) {
    let chosen = state.borrow().lookup.select_closest_valid(C);
    if chosen.is_empty() {
        finish(state, Err(Error::InitialPeerFailedToRespond));
        return;
    }

    {
        let s = state.borrow();
        for peer in &chosen {
            s.tracker.send_fire_and_forget(
                Message::StoreRequest {
                    key_hash: s.key_hash,
                    value: s.value.clone(),
                },
                peer.endpoint,
            );
        }
    }

    finish(state, Ok(()));
}

fn finish<T: Transport + 'static>(state: &Rc<RefCell<StoreValueTask<T>>>, result: Result<(), Error>) {
    let callback = {
        let mut s = state.borrow_mut();
        if s.is_caller_notified {
            return;
        }
        s.is_caller_notified = true;
        s.on_result.take()
    };
    if let Some(callback) = callback {
        callback(result);
    }
}
