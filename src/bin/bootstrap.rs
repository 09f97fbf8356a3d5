// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Starts a bootstrap-only participant: listens on `PORT` and never
//! calls `save`/`load` itself, just answers requests so other
//! participants can use it as an initial peer.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use clap::Parser;
use color_eyre::Result;
use rand::SeedableRng;
use tracing::info;

use kademlia_dht::{Config, Id, Session};

#[derive(Parser, Debug)]
#[clap(name = "bootstrap")]
struct Opt {
    /// UDP port to listen on for both IPv4 and IPv6.
    port: u16,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    kademlia_dht::logging::init();
    let opt = Opt::parse();

    let mut rng = rand::rngs::StdRng::from_entropy();
    let local_id = Id::random(&mut rng);
    info!(%local_id, port = opt.port, "starting bootstrap participant");

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

    let session = Session::new(local_id, config, None)?;
    // Bootstrap-only: never aborts on its own, runs until killed.
    session.run()?;
    Ok(())
}
