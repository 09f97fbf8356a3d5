// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Participant configuration: bucket size, concurrency/replication
//! factors, per-operation timeouts, and listen endpoints.
//!
//! Grounded on `ant-node/src/networking/kad/transport.rs`'s `KadConfig`
//! builder shape.

use std::net::SocketAddr;
use std::time::Duration;

/// Default UDP port for both address families.
pub const DEFAULT_PORT: u16 = 27_980;

/// Bucket capacity / replication factor (`k`).
pub const DEFAULT_K: usize = 20;

/// Concurrency factor for iterative lookups (`alpha`).
pub const DEFAULT_ALPHA: usize = 3;

/// Store redundancy (`c`).
pub const DEFAULT_C: usize = 3;

/// Runtime-tunable parameters for a participant.
#[derive(Clone, Debug)]
pub struct Config {
    k: usize,
    alpha: usize,
    c: usize,
    peer_lookup_timeout: Duration,
    initial_contact_timeout: Duration,
    listen_v4: Option<SocketAddr>,
    listen_v6: Option<SocketAddr>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn alpha(&self) -> usize {
        self.alpha
    }

    pub fn c(&self) -> usize {
        self.c
    }

    /// Timeout for a single FIND_PEER_REQUEST/FIND_VALUE_REQUEST within
    /// a lookup round.
    pub fn peer_lookup_timeout(&self) -> Duration {
        self.peer_lookup_timeout
    }

    /// Timeout for each endpoint tried during bootstrap.
    pub fn initial_contact_timeout(&self) -> Duration {
        self.initial_contact_timeout
    }

    pub fn listen_v4(&self) -> Option<SocketAddr> {
        self.listen_v4
    }

    pub fn listen_v6(&self) -> Option<SocketAddr> {
        self.listen_v6
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            k: DEFAULT_K,
            alpha: DEFAULT_ALPHA,
            c: DEFAULT_C,
            peer_lookup_timeout: Duration::from_secs(5),
            initial_contact_timeout: Duration::from_secs(1),
            listen_v4: Some(SocketAddr::new(
                std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
                DEFAULT_PORT,
            )),
            listen_v6: Some(SocketAddr::new(
                std::net::IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
                DEFAULT_PORT,
            )),
        }
    }
}

/// Builder for [`Config`]; every setter overrides the corresponding
/// default.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    config: ConfigOverrides,
}

#[derive(Clone, Debug, Default)]
struct ConfigOverrides {
    k: Option<usize>,
    alpha: Option<usize>,
    c: Option<usize>,
    peer_lookup_timeout: Option<Duration>,
    initial_contact_timeout: Option<Duration>,
    listen_v4: Option<Option<SocketAddr>>,
    listen_v6: Option<Option<SocketAddr>>,
}

impl ConfigBuilder {
    pub fn k(mut self, k: usize) -> ConfigBuilder {
        self.config.k = Some(k);
        self
    }

    pub fn alpha(mut self, alpha: usize) -> ConfigBuilder {
        self.config.alpha = Some(alpha);
        self
    }

    pub fn c(mut self, c: usize) -> ConfigBuilder {
        self.config.c = Some(c);
        self
    }

    pub fn peer_lookup_timeout(mut self, timeout: Duration) -> ConfigBuilder {
        self.config.peer_lookup_timeout = Some(timeout);
        self
    }

    pub fn initial_contact_timeout(mut self, timeout: Duration) -> ConfigBuilder {
        self.config.initial_contact_timeout = Some(timeout);
        self
    }

    pub fn listen_v4(mut self, addr: Option<SocketAddr>) -> ConfigBuilder {
        self.config.listen_v4 = Some(addr);
        self
    }

    pub fn listen_v6(mut self, addr: Option<SocketAddr>) -> ConfigBuilder {
        self.config.listen_v6 = Some(addr);
        self
    }

    pub fn build(self) -> Config {
        let default = Config::default();
        Config {
            k: self.config.k.unwrap_or(default.k),
            alpha: self.config.alpha.unwrap_or(default.alpha),
            c: self.config.c.unwrap_or(default.c),
            peer_lookup_timeout: self
                .config
                .peer_lookup_timeout
                .unwrap_or(default.peer_lookup_timeout),
            initial_contact_timeout: self
                .config
                .initial_contact_timeout
                .unwrap_or(default.initial_contact_timeout),
            listen_v4: self.config.listen_v4.unwrap_or(default.listen_v4),
            listen_v6: self.config.listen_v6.unwrap_or(default.listen_v6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = Config::default();
        assert_eq!(config.k(), 20);
        assert_eq!(config.alpha(), 3);
        assert_eq!(config.c(), 3);
    }

    #[test]
    fn builder_overrides_only_what_it_touches() {
        let config = Config::builder().k(5).build();
        assert_eq!(config.k(), 5);
        assert_eq!(config.alpha(), DEFAULT_ALPHA);
    }
}
