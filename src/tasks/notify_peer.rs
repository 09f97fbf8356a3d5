// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Bucket refresh: the same candidate loop as find-value, restricted to
//! `FIND_PEER_RESPONSE`, with no user-visible callback. Every responder
//! and every learned peer reach the routing table as a side effect of
//! the engine's inbound handling (see `engine.rs`), not of this task.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::instrument;

use crate::id::Id;
use crate::routing_table::RoutingTable;
use crate::tasks::ALPHA;
use crate::tasks::lookup::LookupTask;
use crate::tracker::Tracker;
use crate::transport::Transport;
use crate::wire::message::Message;

struct NotifyPeerTask<T: Transport + 'static> {
    lookup: LookupTask,
    tracker: Tracker<T>,
    request_timeout: Duration,
    is_finished: bool,
}

/// Starts a notify-peer task refreshing the bucket `target` falls in.
#[instrument(skip(routing_table, tracker))]
pub fn start<T: Transport + 'static>(
    routing_table: &RoutingTable,
    tracker: Tracker<T>,
    target: Id,
    k: usize,
    request_timeout: Duration,
) {
    let mut lookup = LookupTask::new(target);
    lookup.seed(routing_table.closest(&target, k));

    let state = Rc::new(RefCell::new(NotifyPeerTask {
        lookup,
        tracker,
        request_timeout,
        is_finished: false,
    }));

    advance(&state);
}

fn advance<T: Transport + 'static>(state: &Rc<RefCell<NotifyPeerTask<T>>>) {
    let to_contact = {
        let mut s = state.borrow_mut();
        if s.is_finished {
            return;
        }
        s.lookup.select_new_closest(ALPHA)
    };

    if to_contact.is_empty() {
        if state.borrow().lookup.all_requests_completed() {
            state.borrow_mut().is_finished = true;
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
    state: &Rc<RefCell<NotifyPeerTask<T>>>,
    peer_id: Id,
    response: Message,
) {
    if state.borrow().is_finished {
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
            state.borrow_mut().is_finished = true;
        }
    }
}

fn on_error<T: Transport + 'static>(state: &Rc<RefCell<NotifyPeerTask<T>>>, peer_id: Id) {
    if state.borrow().is_finished {
        return;
    }
    state.borrow_mut().lookup.mark_invalid(peer_id);
    advance(state);
}
