// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Interactive participant: listens on `PORT`, bootstraps against
//! `PEER`, and accepts `save KEY VALUE` / `load KEY` / `help` commands
//! on stdin.
//!
//! Commands are read and queued up front, since `Session` is not
//! `Send` and cannot be driven from a second thread while `run()` is
//! blocking the first — the same restriction spec.md §5 places on the
//! engine itself. Queuing before `run()` is always safe: a session is
//! never connected before its first inbound datagram, so every queued
//! operation goes through the engine's deferred-operation path and
//! runs once `run()` starts draining it.

use std::io::BufRead;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use clap::Parser;
use color_eyre::Result;
use rand::SeedableRng;
use tracing::{error, info};

use kademlia_dht::{Config, Error, Id, Session};

#[derive(Parser, Debug)]
#[clap(name = "cli")]
struct Opt {
    /// UDP port to listen on for both IPv4 and IPv6.
    port: u16,
    /// Initial peer to bootstrap against, as `HOST:PORT`.
    peer: SocketAddr,
}

enum Command {
    Save(String, String),
    Load(String),
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "save" => {
            let key = parts.next()?.to_string();
            let value = parts.collect::<Vec<_>>().join(" ");
            Some(Command::Save(key, value))
        }
        "load" => Some(Command::Load(parts.next()?.to_string())),
        "help" => Some(Command::Help),
        _ => None,
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    kademlia_dht::logging::init();
    let opt = Opt::parse();

    let mut rng = rand::rngs::StdRng::from_entropy();
    let local_id = Id::random(&mut rng);
    info!(%local_id, port = opt.port, peer = %opt.peer, "starting participant");

    let config = Config::builder()
        .listen_v4(Some(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            opt.port,
        )))
        .listen_v6(Some(SocketAddr::new(
            IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            opt.port,
        )))
        .build();

    let session = Session::new(local_id, config, Some(opt.peer))?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_command(&line) {
            Some(Command::Help) => {
                println!("commands: save KEY VALUE | load KEY | help");
            }
            Some(Command::Save(key, value)) => {
                let key_for_log = key.clone();
                session.async_save(key.as_bytes(), value.into_bytes(), move |result| {
                    match result {
                        Ok(()) => println!("saved {key_for_log}"),
                        Err(err) => error!(%err, key = %key_for_log, "save failed"),
                    }
                });
            }
            Some(Command::Load(key)) => {
                let key_for_log = key.clone();
                session.async_load(key.as_bytes(), move |result| match result {
                    Ok(value) => {
                        println!("{key_for_log} = {}", String::from_utf8_lossy(&value));
                    }
                    Err(err) => error!(%err, key = %key_for_log, "load failed"),
                });
            }
            None => println!("unrecognized command, try `help`"),
        }
    }

    info!("stdin closed, running until interrupted");
    match session.run() {
        Ok(()) | Err(Error::RunAborted) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
