// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Iterative find-value: return the bytes stored under a key, or
//! `ValueNotFound`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::instrument;

use crate::error::Error;
use crate::id::Id;
use crate::routing_table::RoutingTable;
use crate::tasks::ALPHA;
use crate::tasks::lookup::LookupTask;
use crate::tracker::Tracker;
use crate::transport::Transport;
use crate::wire::message::Message;

struct FindValueTask<T: Transport + 'static> {
    lookup: LookupTask,
    tracker: Tracker<T>,
    request_timeout: Duration,
    is_caller_notified: bool,
    on_result: Option<Box<dyn FnOnce(Result<Vec<u8>, Error>)>>,
}

/// Starts a find-value lookup for `target`, seeded with up to `k`
/// peers from `routing_table`. `on_result` fires exactly once.
#[instrument(skip(routing_table, tracker, on_result))]
pub fn start<T: Transport + 'static>(
    routing_table: &RoutingTable,
    tracker: Tracker<T>,
    target: Id,
    k: usize,
    request_timeout: Duration,
    on_result: impl FnOnce(Result<Vec<u8>, Error>) + 'static,
) {
    let mut lookup = LookupTask::new(target);
    lookup.seed(routing_table.closest(&target, k));

    let state = Rc::new(RefCell::new(FindValueTask {
        lookup,
        tracker,
        request_timeout,
        is_caller_notified: false,
        on_result: Some(Box::new(on_result)),
    }));

    advance(&state);
}

fn advance<T: Transport + 'static>(state: &Rc<RefCell<FindValueTask<T>>>) {
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
            finish(state, Err(Error::ValueNotFound));
        }
        return;
    }

    for peer in to_contact {
        let target = state.borrow().lookup.target();
        let timeout = state.borrow().request_timeout;
        let body = Message::FindValueRequest { target };

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
    state: &Rc<RefCell<FindValueTask<T>>>,
    peer_id: Id,
    response: Message,
) {
    if state.borrow().is_caller_notified {
        return;
    }

    match response {
        Message::FindValueResponse { value } => {
            state.borrow_mut().lookup.mark_responded(peer_id);
            finish(state, Ok(value));
        }
        Message::FindPeerResponse { peers } => {
            state.borrow_mut().lookup.mark_responded(peer_id);
            let added_closer = state
                .borrow_mut()
                .lookup
                .add_candidates(peers.into_iter().map(Into::into));
            if added_closer {
                advance(state);
            } else if state.borrow().lookup.all_requests_completed() {
                finish(state, Err(Error::ValueNotFound));
            }
        }
        _ => {}
    }
}

fn on_error<T: Transport + 'static>(state: &Rc<RefCell<FindValueTask<T>>>, peer_id: Id) {
    if state.borrow().is_caller_notified {
        return;
    }
    state.borrow_mut().lookup.mark_invalid(peer_id);
    advance(state);
}

fn finish<T: Transport + 'static>(
    state: &Rc<RefCell<FindValueTask<T>>>,
    result: Result<Vec<u8>, Error>,
) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use crate::response_router::ResponseRouter;
    use crate::transport::fake::FakeTransport;
    use crate::wire::MessageType;
    use crate::wire::message;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn make_tracker(
        local_id: Id,
        transport: Rc<FakeTransport>,
        router: ResponseRouter,
    ) -> Tracker<FakeTransport> {
        use rand::SeedableRng;
        let rng: Rc<RefCell<dyn rand::RngCore>> =
            Rc::new(RefCell::new(rand::rngs::StdRng::seed_from_u64(7)));
        Tracker::new(transport, router, local_id, rng)
    }

    #[tokio::test]
    async fn empty_routing_table_completes_immediately_with_not_found() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let table = RoutingTable::new(Id::ZERO, 20);
                let transport = Rc::new(FakeTransport::new());
                let tracker = make_tracker(Id::ZERO, Rc::clone(&transport), ResponseRouter::new());

                let result = Rc::new(RefCell::new(None));
                let result_clone = Rc::clone(&result);
                start(
                    &table,
                    tracker,
                    Id::from_hex("a").expect("valid hex"),
                    20,
                    Duration::from_millis(50),
                    move |r| *result_clone.borrow_mut() = Some(r),
                );

                tokio::task::yield_now().await;
                assert!(matches!(
                    *result.borrow(),
                    Some(Err(Error::ValueNotFound))
                ));
                assert!(transport.sent().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn finds_value_via_one_hop() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let p1_id = Id::from_hex("b").expect("valid hex");
                let p2_id = Id::from_hex("a").expect("valid hex");
                let target = p2_id;

                let mut table = RoutingTable::new(Id::ZERO, 20);
                table.push(p1_id, addr(1));

                let transport = Rc::new(FakeTransport::new());
                let router = ResponseRouter::new();
                let tracker = make_tracker(Id::ZERO, Rc::clone(&transport), router.clone());

                let result = Rc::new(RefCell::new(None));
                let result_clone = Rc::clone(&result);
                start(
                    &table,
                    tracker,
                    target,
                    20,
                    Duration::from_secs(5),
                    move |r| *result_clone.borrow_mut() = Some(r),
                );

                tokio::task::yield_now().await;
                let sent = transport.sent();
                assert_eq!(sent.len(), 1);
                let (datagram, dest) = &sent[0];
                assert_eq!(*dest, addr(1));
                let (header1, _) = message::decode(datagram).expect("decodes");
                assert_eq!(header1.message_type, MessageType::FindValueRequest);

                // P1 responds with P2 as a closer candidate.
                let p2_peer = crate::wire::message::Peer::new(p2_id, addr(2));
                router
                    .dispatch(
                        addr(1),
                        &crate::wire::Header::new(
                            MessageType::FindPeerResponse,
                            p1_id,
                            header1.random_token,
                        ),
                        Message::FindPeerResponse {
                            peers: vec![p2_peer],
                        },
                    )
                    .expect("dispatch succeeds");

                tokio::task::yield_now().await;
                let sent = transport.sent();
                assert_eq!(sent.len(), 1);
                let (datagram2, dest2) = &sent[0];
                assert_eq!(*dest2, addr(2));
                let (header2, _) = message::decode(datagram2).expect("decodes");
                assert_eq!(header2.message_type, MessageType::FindValueRequest);

                // P2 responds with the value itself.
                router
                    .dispatch(
                        addr(2),
                        &crate::wire::Header::new(
                            MessageType::FindValueResponse,
                            p2_id,
                            header2.random_token,
                        ),
                        Message::FindValueResponse {
                            value: vec![1, 2, 3, 4],
                        },
                    )
                    .expect("dispatch succeeds");

                match &*result.borrow() {
                    Some(Ok(value)) => assert_eq!(value, &vec![1, 2, 3, 4]),
                    other => panic!("expected Ok(value), got {other:?}"),
                }
            })
            .await;
    }
}
