// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! End-to-end scenarios driving real participants over loopback UDP,
//! modeled on the reference suite's `test_session.cpp` scenarios
//! (spec.md §8, S1-S4).

use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;

use rand::SeedableRng;

use kademlia_dht::config::Config;
use kademlia_dht::engine::Engine;
use kademlia_dht::error::Error;
use kademlia_dht::id::Id;
use kademlia_dht::transport::{Transport, UdpTransport};

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

async fn bind_engine(local_id: Id) -> (Engine<UdpTransport>, SocketAddr) {
    let transport = UdpTransport::bind(Some(loopback(0)), None)
        .await
        .expect("bind loopback socket");
    let addr = transport.local_addr_v4().expect("query bound addr").expect("bound");
    let transport = Rc::new(transport);
    let rng: Rc<RefCell<dyn rand::RngCore>> =
        Rc::new(RefCell::new(rand::rngs::StdRng::seed_from_u64(addr.port() as u64)));
    let engine = Engine::new(local_id, Config::default(), Rc::clone(&transport), rng);

    let recv_engine = engine.clone();
    tokio::task::spawn_local(async move {
        loop {
            match transport.recv_from().await {
                Ok((sender, datagram)) => recv_engine.handle_datagram(sender, &datagram),
                Err(_) => break,
            }
        }
    });

    (engine, addr)
}

async fn poll_until(mut condition: impl FnMut() -> bool, attempts: usize) -> bool {
    for _ in 0..attempts {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test(flavor = "current_thread")]
async fn s1_isolated_bootstrap_cannot_serve_then_connects() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (engine_a, addr_a) = bind_engine(Id::ZERO).await;

            let fired = Rc::new(RefCell::new(None));
            let fired_clone = Rc::clone(&fired);
            engine_a.async_save(b"key", b"data".to_vec(), move |result| {
                *fired_clone.borrow_mut() = Some(result);
            });

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(fired.borrow().is_none(), "cb must not fire while isolated");

            let (engine_b, _addr_b) = bind_engine(Id::from_hex("1").expect("valid hex")).await;
            engine_b.start(vec![addr_a]);

            let connected = poll_until(|| fired.borrow().is_some(), 100).await;
            assert!(connected, "cb should fire once B bootstraps against A");
            assert!(matches!(*fired.borrow(), Some(Ok(()))));
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn s3_two_node_save_and_load() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let id_a = Id::from_hex("8000000000000000000000000000000000000000").expect("valid hex");
            let id_b = Id::from_hex("4000000000000000000000000000000000000000").expect("valid hex");

            let (engine_a, addr_a) = bind_engine(id_a).await;
            let (engine_b, _addr_b) = bind_engine(id_b).await;
            engine_b.start(vec![addr_a]);

            let connected = poll_until(|| engine_b.is_connected(), 100).await;
            assert!(connected, "B should connect to A");

            let save_result = Rc::new(RefCell::new(None));
            let save_result_clone = Rc::clone(&save_result);
            engine_a.async_save(b"key", b"data".to_vec(), move |result| {
                *save_result_clone.borrow_mut() = Some(result);
            });
            let saved = poll_until(|| save_result.borrow().is_some(), 100).await;
            assert!(saved, "save should complete");
            assert!(matches!(*save_result.borrow(), Some(Ok(()))));

            let load_result = Rc::new(RefCell::new(None));
            let load_result_clone = Rc::clone(&load_result);
            engine_b.async_load(b"key", move |result| {
                *load_result_clone.borrow_mut() = Some(result);
            });
            let loaded = poll_until(|| load_result.borrow().is_some(), 100).await;
            assert!(loaded, "load should complete");
            match load_result.borrow_mut().take() {
                Some(Ok(value)) => assert_eq!(value, b"data".to_vec()),
                other => panic!("expected Ok(\"data\"), got {other:?}"),
            }
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn s2_isolated_load_resolves_once_connected() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (engine_a, addr_a) = bind_engine(Id::ZERO).await;

            let fired = Rc::new(RefCell::new(None));
            let fired_clone = Rc::clone(&fired);
            engine_a.async_load(b"missing-key", move |result| {
                *fired_clone.borrow_mut() = Some(result);
            });

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(fired.borrow().is_none(), "cb must not fire while isolated");

            let (engine_b, _addr_b) = bind_engine(Id::from_hex("1").expect("valid hex")).await;
            engine_b.start(vec![addr_a]);

            let resolved = poll_until(|| fired.borrow().is_some(), 100).await;
            assert!(resolved, "cb should fire once B bootstraps against A");
            assert!(matches!(*fired.borrow(), Some(Err(Error::ValueNotFound))));
        })
        .await;
}
