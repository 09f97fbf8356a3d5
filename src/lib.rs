// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! An embeddable peer-to-peer key/value store built on the Kademlia
//! distributed hash table.
//!
//! Peers organize themselves into an overlay addressed by 160-bit
//! identifiers; each peer stores a slice of the global map and helps
//! locate peers near any target identifier using an XOR distance
//! metric. A host process creates a [`Session`](session::Session),
//! optionally bootstraps it against a known peer, then asks it to
//! publish opaque byte values under opaque byte keys and retrieve them
//! later.

pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod logging;
pub mod response_router;
pub mod routing_table;
pub mod session;
pub mod tasks;
pub mod tracker;
pub mod transport;
pub mod value_store;
pub mod wire;

pub use config::Config;
pub use error::{Error, Result};
pub use id::Id;
pub use session::Session;
