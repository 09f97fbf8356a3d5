// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Crate-wide error type.
//!
//! Grounded on `sn_protocol::error::Error`: a single flat enum, one
//! `#[error("...")]` per variant, no nested error trees.

use thiserror::Error;

use crate::id::Id;

/// A specialised `Result` type for the `kademlia` category of errors.
pub type Result<T> = std::result::Result<T, Error>;

/// All error kinds surfaced by this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// `run()` returned because `abort()` was called.
    #[error("run() aborted")]
    RunAborted,

    /// A second `run()` was attempted while one was already active.
    #[error("a session is already running")]
    AlreadyRunning,

    /// The bootstrap peer's endpoint list was exhausted without a response.
    #[error("initial peer failed to respond")]
    InitialPeerFailedToRespond,

    /// A find-value task exhausted its candidates without a hit.
    #[error("value not found")]
    ValueNotFound,

    /// A response-router waiter's timer fired before a response arrived.
    #[error("request timed out")]
    TimedOut,

    /// An inbound response's random token matched no registered waiter.
    #[error("response token does not match any pending request")]
    UnassociatedMessageId,

    /// A hex string could not be parsed into an identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A datagram ended before a complete 20-byte identifier.
    #[error("truncated identifier")]
    TruncatedId,

    /// A datagram ended before the 1-byte version/type field.
    #[error("truncated header")]
    TruncatedHeader,

    /// A datagram ended before the endpoint's family tag byte.
    #[error("truncated endpoint")]
    TruncatedEndpoint,

    /// A datagram ended before a complete address (4 or 16 bytes).
    #[error("truncated address")]
    TruncatedAddress,

    /// A datagram ended before a complete 8-byte length prefix.
    #[error("truncated size prefix")]
    TruncatedSize,

    /// A length-prefixed body claimed more bytes than the datagram held.
    #[error("corrupted message body")]
    CorruptedBody,

    /// The header's version nibble was not the only accepted value.
    #[error("unknown protocol version")]
    UnknownProtocolVersion,

    /// The configured IPv4 listen address could not be resolved.
    #[error("invalid IPv4 listen address: {0}")]
    InvalidIpv4Address(String),

    /// The configured IPv6 listen address could not be resolved.
    #[error("invalid IPv6 listen address: {0}")]
    InvalidIpv6Address(String),

    /// An inbound response's random token matched a waiter whose body was
    /// corrupted on the wire.
    #[error("corrupted response body for token {0}")]
    CorruptedResponseBody(Id),

    /// Underlying socket I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
