// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The façade a host process embeds: owns the executor and the engine,
//! exposes `save`/`load`/`run`/`abort`.
//!
//! Grounded on `ant-node`'s use of a dedicated `tokio` runtime per node
//! process, narrowed to a current-thread runtime plus `LocalSet` since
//! every engine type here is `Rc`-based, not `Arc`-based (spec.md §5
//! forbids cross-thread state sharing beyond `abort()`).

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use tracing::{instrument, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::id::Id;
use crate::transport::{Transport, UdpTransport};

/// A `Send + Sync` handle that can `abort()` a [`Session`] from any
/// thread, independent of the session's own `Rc`-based internals.
#[derive(Clone)]
pub struct AbortHandle {
    abort: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Posts the abort flag. `run()` observes it on its next poll and
    /// returns `RunAborted`; in-flight requests are not cancelled.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }
}

/// Owns a single-threaded executor and the engine running on it.
/// `run()` enforces that only one caller drives the session's executor
/// at a time; a concurrent second call returns `AlreadyRunning`.
pub struct Session {
    engine: Engine<UdpTransport>,
    transport: Rc<UdpTransport>,
    runtime: tokio::runtime::Runtime,
    running: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
    initial_peer: Option<SocketAddr>,
    bootstrap_started: RefCell<bool>,
}

impl Session {
    /// Binds the configured listen addresses and constructs the
    /// engine. Bootstrap against `initial_peer`, if given, is deferred
    /// until the first call to `run()` (it needs an active executor to
    /// schedule its timers on).
    #[instrument(skip(config))]
    pub fn new(local_id: Id, config: Config, initial_peer: Option<SocketAddr>) -> Result<Session> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let bind_set = tokio::task::LocalSet::new();
        let transport = bind_set.block_on(&runtime, async {
            UdpTransport::bind(config.listen_v4(), config.listen_v6()).await
        })?;
        let transport = Rc::new(transport);

        let rng: Rc<RefCell<dyn rand::RngCore>> =
            Rc::new(RefCell::new(rand::rngs::StdRng::from_entropy()));
        let engine = Engine::new(local_id, config, Rc::clone(&transport), rng);

        Ok(Session {
            engine,
            transport,
            runtime,
            running: Arc::new(AtomicBool::new(false)),
            abort: Arc::new(AtomicBool::new(false)),
            initial_peer,
            bootstrap_started: RefCell::new(false),
        })
    }

    pub fn async_save(&self, key: &[u8], value: Vec<u8>, cb: impl FnOnce(Result<()>) + 'static) {
        self.engine.async_save(key, value, cb);
    }

    pub fn async_load(&self, key: &[u8], cb: impl FnOnce(Result<Vec<u8>>) + 'static) {
        self.engine.async_load(key, cb);
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            abort: Arc::clone(&self.abort),
        }
    }

    /// Drives the executor on the calling thread until `abort()` is
    /// called, then returns `RunAborted`. A second concurrent call
    /// returns `AlreadyRunning` immediately without touching the first
    /// run.
    pub fn run(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyRunning);
        }

        let result = self.run_inner();
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// Posts the abort flag directly; equivalent to
    /// `self.abort_handle().abort()`.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    fn run_inner(&self) -> Result<()> {
        if self.abort.load(Ordering::SeqCst) {
            return Err(Error::RunAborted);
        }

        let engine = self.engine.clone();
        let transport = Rc::clone(&self.transport);
        let abort = Arc::clone(&self.abort);
        let initial_peer = if !*self.bootstrap_started.borrow() {
            *self.bootstrap_started.borrow_mut() = true;
            self.initial_peer
        } else {
            None
        };

        let local = tokio::task::LocalSet::new();
        local.block_on(&self.runtime, async move {
            if let Some(peer) = initial_peer {
                engine.start(vec![peer]);
            }

            let recv_engine = engine.clone();
            tokio::task::spawn_local(async move {
                loop {
                    match transport.recv_from().await {
                        Ok((sender, datagram)) => recv_engine.handle_datagram(sender, &datagram),
                        Err(err) => warn!(%err, "transport receive failed"),
                    }
                }
            });

            loop {
                if abort.load(Ordering::SeqCst) {
                    return Err(Error::RunAborted);
                }
                if let Some(err) = engine.take_bootstrap_error() {
                    return Err(err);
                }
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }
        })
    }
}
