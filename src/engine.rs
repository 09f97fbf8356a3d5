// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Wires the transport to the tracker and routing table: decodes
//! inbound datagrams, keeps the routing table current, dispatches
//! requests to handlers, and routes responses to the tracker.
//!
//! Grounded on `ant-node/src/networking/driver/mod.rs`'s
//! decode-then-dispatch event loop shape, adapted from libp2p swarm
//! events to raw UDP datagrams.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;

use rand::RngCore;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::id::Id;
use crate::response_router::ResponseRouter;
use crate::routing_table::RoutingTable;
use crate::tasks::{discover_neighbors, find_value, store_value};
use crate::tracker::Tracker;
use crate::transport::Transport;
use crate::value_store::ValueStore;
use crate::wire::message::{self, Message};
use crate::wire::MessageType;

type PendingOp<T> = Box<dyn FnOnce(&Engine<T>)>;

struct EngineState<T: Transport + 'static> {
    routing_table: RoutingTable,
    value_store: ValueStore,
    tracker: Tracker<T>,
    rng: Rc<RefCell<dyn RngCore>>,
    config: Config,
    is_connected: bool,
    pending: VecDeque<PendingOp<T>>,
    bootstrap_error: Option<Error>,
}

/// Owns the routing table, value store, tracker, RNG, and a queue of
/// user operations deferred until the table has at least one peer.
/// Cheap to clone (an `Rc` of the shared state) so inbound-datagram
/// handling and deferred operations can both hold a handle back to it.
pub struct Engine<T: Transport + 'static> {
    state: Rc<RefCell<EngineState<T>>>,
}

impl<T: Transport + 'static> Clone for Engine<T> {
    fn clone(&self) -> Engine<T> {
        Engine {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Transport + 'static> Engine<T> {
    pub fn new(
        local_id: Id,
        config: Config,
        transport: Rc<T>,
        rng: Rc<RefCell<dyn RngCore>>,
    ) -> Engine<T> {
        let router = ResponseRouter::new();
        let tracker = Tracker::new(transport, router, local_id, Rc::clone(&rng));
        let routing_table = RoutingTable::new(local_id, config.k());

        Engine {
            state: Rc::new(RefCell::new(EngineState {
                routing_table,
                value_store: ValueStore::new(),
                tracker,
                rng,
                config,
                is_connected: false,
                pending: VecDeque::new(),
                bootstrap_error: None,
            })),
        }
    }

    /// If `initial_peer_endpoints` is non-empty, launches bootstrap
    /// against them. Whether or not bootstrap is requested,
    /// `is_connected` stays false until the first inbound datagram
    /// arrives.
    pub fn start(&self, initial_peer_endpoints: Vec<SocketAddr>) {
        if initial_peer_endpoints.is_empty() {
            return;
        }

        let (tracker, local_id, timeout, k) = {
            let s = self.state.borrow();
            (
                s.tracker.clone(),
                s.routing_table.local_id(),
                s.config.initial_contact_timeout(),
                s.config.k(),
            )
        };

        let engine = self.clone();
        discover_neighbors::start(initial_peer_endpoints, tracker, local_id, timeout, move |result| {
            match result {
                Ok(()) => engine.refresh_all_buckets(k),
                Err(err) => {
                    warn!(%err, "bootstrap failed");
                    engine.state.borrow_mut().bootstrap_error = Some(err);
                }
            }
        });
    }

    /// Takes the bootstrap failure, if any, clearing it. `Session::run`
    /// polls this to turn a failed bootstrap into a prompt `run()`
    /// error instead of leaving the session silently unconnectable.
    pub fn take_bootstrap_error(&self) -> Option<Error> {
        self.state.borrow_mut().bootstrap_error.take()
    }

    fn refresh_all_buckets(&self, k: usize) {
        let s = self.state.borrow();
        let timeout = s.config.peer_lookup_timeout();
        let tracker = s.tracker.clone();
        let mut rng = s.rng.borrow_mut();
        discover_neighbors::refresh_all_buckets(&s.routing_table, &tracker, k, timeout, &mut *rng);
    }

    /// Starts (or, before the routing table has any peers, enqueues) a
    /// store-value task for `(hash(key), value)`.
    pub fn async_save(
        &self,
        key: &[u8],
        value: Vec<u8>,
        cb: impl FnOnce(Result<()>) + 'static,
    ) {
        let key_hash = Id::hash(key);
        if self.state.borrow().is_connected {
            self.start_store(key_hash, value, cb);
        } else {
            self.state
                .borrow_mut()
                .pending
                .push_back(Box::new(move |engine: &Engine<T>| {
                    engine.start_store(key_hash, value, cb);
                }));
        }
    }

    /// Starts (or enqueues) a find-value task for `hash(key)`.
    pub fn async_load(&self, key: &[u8], cb: impl FnOnce(Result<Vec<u8>>) + 'static) {
        let key_hash = Id::hash(key);
        if self.state.borrow().is_connected {
            self.start_load(key_hash, cb);
        } else {
            self.state
                .borrow_mut()
                .pending
                .push_back(Box::new(move |engine: &Engine<T>| {
                    engine.start_load(key_hash, cb);
                }));
        }
    }

    fn start_store(&self, key_hash: Id, value: Vec<u8>, cb: impl FnOnce(Result<()>) + 'static) {
        let (tracker, k, timeout) = {
            let s = self.state.borrow();
            (s.tracker.clone(), s.config.k(), s.config.peer_lookup_timeout())
        };
        let s = self.state.borrow();
        store_value::start(&s.routing_table, tracker, key_hash, value, k, timeout, cb);
    }

    fn start_load(&self, key_hash: Id, cb: impl FnOnce(Result<Vec<u8>>) + 'static) {
        let (tracker, k, timeout) = {
            let s = self.state.borrow();
            (s.tracker.clone(), s.config.k(), s.config.peer_lookup_timeout())
        };
        let s = self.state.borrow();
        find_value::start(&s.routing_table, tracker, key_hash, k, timeout, cb);
    }

    fn drain_pending(&self) {
        let ops: Vec<PendingOp<T>> = self.state.borrow_mut().pending.drain(..).collect();
        for op in ops {
            op(self);
        }
    }

    /// Handles one inbound datagram: decodes the header, updates the
    /// routing table, connects the engine on first contact, and
    /// dispatches the body by type. Any decode failure is logged and
    /// the datagram dropped.
    #[instrument(skip(self, datagram))]
    pub fn handle_datagram(&self, sender: SocketAddr, datagram: &[u8]) {
        let (header, mut reader) = match message::decode_header(datagram) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(%sender, %err, "dropping datagram with unreadable header");
                return;
            }
        };

        self.state
            .borrow_mut()
            .routing_table
            .push(header.source_id, sender);

        let body = match Message::read_body(header.message_type, &mut reader) {
            Ok(body) => body,
            Err(err) => {
                debug!(%sender, %err, "dropping datagram with unreadable body");
                if is_response_type(header.message_type) {
                    self.state
                        .borrow()
                        .tracker
                        .handle_corrupted_response(header.random_token);
                }
                return;
            }
        };

        if let Message::FindPeerResponse { peers } = &body {
            let mut s = self.state.borrow_mut();
            for peer in peers {
                s.routing_table.push(peer.id, peer.endpoint);
            }
        }

        let just_connected = {
            let mut s = self.state.borrow_mut();
            if s.is_connected {
                false
            } else {
                s.is_connected = true;
                true
            }
        };
        if just_connected {
            self.drain_pending();
        }

        self.dispatch(sender, header.message_type, &header, body);
    }

    fn dispatch(
        &self,
        sender: SocketAddr,
        message_type: MessageType,
        header: &crate::wire::Header,
        body: Message,
    ) {
        match message_type {
            MessageType::PingRequest => {
                let s = self.state.borrow();
                s.tracker
                    .send_response(header.random_token, Message::PingResponse, sender);
            }
            MessageType::StoreRequest => {
                if let Message::StoreRequest { key_hash, value } = body {
                    self.state.borrow_mut().value_store.put(key_hash, value);
                }
            }
            MessageType::FindPeerRequest => {
                if let Message::FindPeerRequest { target } = body {
                    let s = self.state.borrow();
                    let peers = s
                        .routing_table
                        .closest(&target, s.config.k())
                        .into_iter()
                        .map(crate::wire::message::Peer::from)
                        .collect();
                    s.tracker.send_response(
                        header.random_token,
                        Message::FindPeerResponse { peers },
                        sender,
                    );
                }
            }
            MessageType::FindValueRequest => {
                if let Message::FindValueRequest { target } = body {
                    let s = self.state.borrow();
                    if let Some(value) = s.value_store.get(&target) {
                        let value = value.clone();
                        s.tracker.send_response(
                            header.random_token,
                            Message::FindValueResponse { value },
                            sender,
                        );
                    } else {
                        let peers = s
                            .routing_table
                            .closest(&target, s.config.k())
                            .into_iter()
                            .map(crate::wire::message::Peer::from)
                            .collect();
                        s.tracker.send_response(
                            header.random_token,
                            Message::FindPeerResponse { peers },
                            sender,
                        );
                    }
                }
            }
            MessageType::PingResponse
            | MessageType::FindPeerResponse
            | MessageType::FindValueResponse => {
                let result = self.state.borrow().tracker.handle_new_response(sender, header, body);
                if let Err(Error::UnassociatedMessageId) = result {
                    debug!(%sender, "response matched no pending request");
                }
            }
        }
    }

    pub fn routing_table_peer_count(&self) -> usize {
        self.state.borrow().routing_table.peer_count()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected
    }
}

fn is_response_type(message_type: MessageType) -> bool {
    matches!(
        message_type,
        MessageType::PingResponse | MessageType::FindPeerResponse | MessageType::FindValueResponse
    )
}
