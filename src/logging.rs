// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Minimal logging setup for the example binaries.
//!
//! Grounded on `ant-logging`'s `EnvFilter` + `fmt` layering, trimmed to
//! what an embeddable library's examples need — no rotating files, no
//! multi-destination output.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber reading `RUST_LOG` (default `info`).
/// Intended for the example CLIs; a library embedding this crate is
/// free to install its own subscriber instead.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
