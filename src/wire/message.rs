// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! The seven message bodies and the top-level encode/decode entry
//! points.

use std::net::SocketAddr;

use bytes::BytesMut;

use crate::error::Result;
use crate::id::Id;
use crate::wire::codec::{Reader, Writer};
use crate::wire::{Header, MessageType};

/// A peer as carried inside a `FIND_PEER_RESPONSE` body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Peer {
    pub id: Id,
    pub endpoint: SocketAddr,
}

impl Peer {
    pub fn new(id: Id, endpoint: SocketAddr) -> Peer {
        Peer { id, endpoint }
    }
}

/// The body of every message type spec.md §3 defines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    PingRequest,
    PingResponse,
    StoreRequest { key_hash: Id, value: Vec<u8> },
    FindPeerRequest { target: Id },
    FindPeerResponse { peers: Vec<Peer> },
    FindValueRequest { target: Id },
    FindValueResponse { value: Vec<u8> },
}

impl Message {
    /// The message type tag this body pairs with in the header.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::PingRequest => MessageType::PingRequest,
            Message::PingResponse => MessageType::PingResponse,
            Message::StoreRequest { .. } => MessageType::StoreRequest,
            Message::FindPeerRequest { .. } => MessageType::FindPeerRequest,
            Message::FindPeerResponse { .. } => MessageType::FindPeerResponse,
            Message::FindValueRequest { .. } => MessageType::FindValueRequest,
            Message::FindValueResponse { .. } => MessageType::FindValueResponse,
        }
    }

    fn write_body(&self, w: &mut Writer) {
        match self {
            Message::PingRequest | Message::PingResponse => {}
            Message::StoreRequest { key_hash, value } => {
                w.write_id(key_hash);
                w.write_byte_vec(value);
            }
            Message::FindPeerRequest { target } => {
                w.write_id(target);
            }
            Message::FindPeerResponse { peers } => {
                w.write_u64_le(peers.len() as u64);
                for peer in peers {
                    w.write_id(&peer.id);
                    w.write_socket_addr(&peer.endpoint);
                }
            }
            Message::FindValueRequest { target } => {
                w.write_id(target);
            }
            Message::FindValueResponse { value } => {
                w.write_byte_vec(value);
            }
        }
    }

    pub(crate) fn read_body(message_type: MessageType, r: &mut Reader<'_>) -> Result<Message> {
        Ok(match message_type {
            MessageType::PingRequest => Message::PingRequest,
            MessageType::PingResponse => Message::PingResponse,
            MessageType::StoreRequest => {
                let key_hash = r.read_id()?;
                let value = r.read_byte_vec()?;
                Message::StoreRequest { key_hash, value }
            }
            MessageType::FindPeerRequest => Message::FindPeerRequest {
                target: r.read_id()?,
            },
            MessageType::FindPeerResponse => {
                let count = r.read_u64_le()?;
                let mut peers = Vec::with_capacity(count.min(4096) as usize);
                for _ in 0..count {
                    let id = r.read_id()?;
                    let endpoint = r.read_socket_addr()?;
                    peers.push(Peer::new(id, endpoint));
                }
                Message::FindPeerResponse { peers }
            }
            MessageType::FindValueRequest => Message::FindValueRequest {
                target: r.read_id()?,
            },
            MessageType::FindValueResponse => Message::FindValueResponse {
                value: r.read_byte_vec()?,
            },
        })
    }
}

/// Serializes a header and body into a single datagram buffer.
pub fn encode(header: &Header, body: &Message) -> BytesMut {
    let mut w = Writer::new();
    w.write_header(header);
    body.write_body(&mut w);
    w.into_bytes()
}

/// Deserializes a datagram into its header and body.
///
/// Any failure leaves no partial state behind: the caller should simply
/// discard the datagram.
pub fn decode(datagram: &[u8]) -> Result<(Header, Message)> {
    let (header, mut r) = decode_header(datagram)?;
    let body = Message::read_body(header.message_type, &mut r)?;
    Ok((header, body))
}

/// Decodes just the header, returning a `Reader` positioned right after
/// it. Lets a caller recover the header (and in particular the random
/// token) even when the body that follows fails to decode — the engine
/// uses this to translate a corrupted *response* body into an
/// immediate `on_error` instead of silently dropping the datagram.
pub fn decode_header(datagram: &[u8]) -> Result<(Header, Reader<'_>)> {
    let mut r = Reader::new(datagram);
    let header = r.read_header()?;
    Ok((header, r))
}
