// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Thin façade between tasks and the transport: serializes requests,
//! registers response waiters, and forwards send failures and inbound
//! responses.
//!
//! Grounded on `ant-node/src/networking/kad/transport.rs`'s
//! `KademliaTransport` trait shape, collapsed to the concrete UDP case
//! (see DESIGN.md — the teacher's multi-transport pluggability is not
//! carried forward).

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use rand::RngCore;
use tracing::warn;

use crate::error::Error;
use crate::id::Id;
use crate::response_router::ResponseRouter;
use crate::transport::Transport;
use crate::wire::message::Message;
use crate::wire::{Header, message};

/// Serializes/sends requests and responses, and routes inbound
/// responses back to the waiter that sent the matching request.
pub struct Tracker<T: Transport + 'static> {
    transport: Rc<T>,
    router: ResponseRouter,
    local_id: Id,
    rng: Rc<RefCell<dyn RngCore>>,
}

impl<T: Transport + 'static> Clone for Tracker<T> {
    fn clone(&self) -> Tracker<T> {
        Tracker {
            transport: Rc::clone(&self.transport),
            router: self.router.clone(),
            local_id: self.local_id,
            rng: Rc::clone(&self.rng),
        }
    }
}

impl<T: Transport + 'static> Tracker<T> {
    pub fn new(
        transport: Rc<T>,
        router: ResponseRouter,
        local_id: Id,
        rng: Rc<RefCell<dyn RngCore>>,
    ) -> Tracker<T> {
        Tracker {
            transport,
            router,
            local_id,
            rng,
        }
    }

    fn fresh_token(&self) -> Id {
        Id::random(&mut *self.rng.borrow_mut())
    }

    /// Sends `body` to `endpoint`, registering a waiter under a fresh
    /// random token with the given timeout. `on_error` fires (posted to
    /// the executor) if the send itself fails, or later if the request
    /// times out or a corrupted response body arrives for this token.
    pub fn send_request(
        &self,
        body: Message,
        endpoint: SocketAddr,
        timeout: Duration,
        on_response: impl FnOnce(SocketAddr, Message) + 'static,
        on_error: impl FnOnce(Error) + 'static,
    ) {
        let token = self.fresh_token();
        let header = Header::new(body.message_type(), self.local_id, token);
        let datagram = message::encode(&header, &body);

        self.router.register(token, timeout, on_response, on_error);

        let transport = Rc::clone(&self.transport);
        let router = self.router.clone();
        tokio::task::spawn_local(async move {
            if let Err(err) = transport.send_to(&datagram, endpoint).await {
                warn!(%endpoint, %err, "failed to send request");
                router.dispatch_error(token, err);
            }
        });
    }

    /// Fire-and-forget variant used for `STORE_REQUEST`: no waiter is
    /// registered and no response is expected.
    pub fn send_fire_and_forget(&self, body: Message, endpoint: SocketAddr) {
        let token = self.fresh_token();
        let header = Header::new(body.message_type(), self.local_id, token);
        let datagram = message::encode(&header, &body);

        let transport = Rc::clone(&self.transport);
        tokio::task::spawn_local(async move {
            if let Err(err) = transport.send_to(&datagram, endpoint).await {
                warn!(%endpoint, %err, "failed to send fire-and-forget request");
            }
        });
    }

    /// Replies to an inbound request, reusing its token. No waiter is
    /// registered.
    pub fn send_response(&self, token: Id, body: Message, endpoint: SocketAddr) {
        let header = Header::new(body.message_type(), self.local_id, token);
        let datagram = message::encode(&header, &body);

        let transport = Rc::clone(&self.transport);
        tokio::task::spawn_local(async move {
            if let Err(err) = transport.send_to(&datagram, endpoint).await {
                warn!(%endpoint, %err, "failed to send response");
            }
        });
    }

    /// Forwards a decoded inbound response to the response router.
    pub fn handle_new_response(
        &self,
        sender: SocketAddr,
        header: &Header,
        body: Message,
    ) -> Result<(), Error> {
        self.router.dispatch(sender, header, body)
    }

    /// Translates a corrupted response body into an immediate
    /// `on_error(CorruptedResponseBody)` for the matching waiter,
    /// rather than waiting for its timer (see DESIGN.md).
    pub fn handle_corrupted_response(&self, token: Id) {
        self.router
            .dispatch_error(token, Error::CorruptedResponseBody(token));
    }

    pub fn response_router(&self) -> &ResponseRouter {
        &self.router
    }
}
