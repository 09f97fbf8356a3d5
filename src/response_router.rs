// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Correlates inbound responses (by random token) with the callbacks
//! registered by whoever sent the matching request, enforcing a
//! per-token timeout.
//!
//! Grounded on the timeout/state-tracking shape of
//! `ant-node/src/networking/kad/query.rs`'s `PeerState`, generalized
//! into the exactly-once register/dispatch/timeout discipline spec.md
//! §4.4 and §9 describe: whichever side — the timer or an inbound
//! response — removes the waiter from the map first is the side that
//! gets to fire its callback.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use crate::error::Error;
use crate::id::Id;
use crate::wire::Header;
use crate::wire::message::Message;

type OnResponse = Box<dyn FnOnce(SocketAddr, Message)>;
type OnError = Box<dyn FnOnce(Error)>;

struct Waiter {
    on_response: OnResponse,
    on_error: OnError,
    timer: tokio::task::JoinHandle<()>,
}

/// Token-keyed waiter table shared between the router and its
/// spawned timeout tasks.
type SharedWaiters = Rc<RefCell<HashMap<Id, Waiter>>>;

/// Correlates random tokens to registered callbacks. Lives on the
/// single executor thread the rest of the engine runs on; cheap to
/// clone (an `Rc` of the underlying table).
#[derive(Clone)]
pub struct ResponseRouter {
    waiters: SharedWaiters,
}

impl ResponseRouter {
    pub fn new() -> ResponseRouter {
        ResponseRouter {
            waiters: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Registers a waiter for `token` and schedules a timer for `ttl`.
    /// On fire, the timer removes the waiter and invokes `on_error`
    /// only if the waiter is still present — a response that arrives
    /// first removes it instead, making the timer fire a no-op.
    pub fn register(
        &self,
        token: Id,
        ttl: Duration,
        on_response: impl FnOnce(SocketAddr, Message) + 'static,
        on_error: impl FnOnce(Error) + 'static,
    ) {
        let timer_waiters = Rc::clone(&self.waiters);
        let timer = tokio::task::spawn_local(async move {
            tokio::time::sleep(ttl).await;
            if let Some(waiter) = timer_waiters.borrow_mut().remove(&token) {
                (waiter.on_error)(Error::TimedOut);
            }
        });

        self.waiters.borrow_mut().insert(
            token,
            Waiter {
                on_response: Box::new(on_response),
                on_error: Box::new(on_error),
                timer,
            },
        );
    }

    /// Looks up `header.random_token`; if a waiter is present, removes
    /// it and invokes `on_response` exactly once. Returns
    /// `UnassociatedMessageId` if no waiter matches.
    pub fn dispatch(&self, sender: SocketAddr, header: &Header, body: Message) -> Result<(), Error> {
        let waiter = self.waiters.borrow_mut().remove(&header.random_token);
        match waiter {
            Some(waiter) => {
                waiter.timer.abort();
                (waiter.on_response)(sender, body);
                Ok(())
            }
            None => Err(Error::UnassociatedMessageId),
        }
    }

    /// Fires `on_error(err)` immediately for `token`'s waiter, if one
    /// is still registered, instead of waiting for its timer. Used
    /// when a response's body fails to decode (see DESIGN.md's
    /// "corrupted response body" policy decision).
    pub fn dispatch_error(&self, token: Id, err: Error) {
        if let Some(waiter) = self.waiters.borrow_mut().remove(&token) {
            waiter.timer.abort();
            (waiter.on_error)(err);
        }
    }

    /// Number of live waiters — every entry has a scheduled timer.
    pub fn len(&self) -> usize {
        self.waiters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseRouter {
    fn default() -> Self {
        ResponseRouter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::rc::Rc as StdRc;

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn response_wins_the_race_against_timeout() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let router = ResponseRouter::new();
                let token = Id::from_hex("1").expect("valid hex");
                let responded = StdRc::new(RefCell::new(false));
                let timed_out = StdRc::new(RefCell::new(false));

                let r1 = StdRc::clone(&responded);
                let t1 = StdRc::clone(&timed_out);
                router.register(
                    token,
                    Duration::from_millis(50),
                    move |_sender, _body| *r1.borrow_mut() = true,
                    move |_err| *t1.borrow_mut() = true,
                );

                let header = Header::new(
                    crate::wire::MessageType::PingResponse,
                    Id::from_hex("2").expect("valid hex"),
                    token,
                );
                router
                    .dispatch(addr(), &header, Message::PingResponse)
                    .expect("dispatch succeeds");

                tokio::time::sleep(Duration::from_millis(100)).await;

                assert!(*responded.borrow());
                assert!(!*timed_out.borrow());
                assert!(router.is_empty());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn timeout_fires_when_no_response_arrives() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let router = ResponseRouter::new();
                let token = Id::from_hex("1").expect("valid hex");
                let timed_out = StdRc::new(RefCell::new(false));
                let t1 = StdRc::clone(&timed_out);

                router.register(
                    token,
                    Duration::from_millis(10),
                    move |_sender, _body| panic!("should not respond"),
                    move |err| {
                        assert!(matches!(err, Error::TimedOut));
                        *t1.borrow_mut() = true;
                    },
                );

                tokio::time::advance(Duration::from_millis(20)).await;
                tokio::task::yield_now().await;

                assert!(*timed_out.borrow());
                assert!(router.is_empty());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_without_waiter_reports_unassociated() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let router = ResponseRouter::new();
                let header = Header::new(
                    crate::wire::MessageType::PingResponse,
                    Id::from_hex("2").expect("valid hex"),
                    Id::from_hex("dead").expect("valid hex"),
                );
                let result = router.dispatch(addr(), &header, Message::PingResponse);
                assert!(matches!(result, Err(Error::UnassociatedMessageId)));
            })
            .await;
    }
}
