// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! On-the-wire protocol: header layout, message type tags, and the
//! codec that turns messages into bytes and back.

pub mod codec;
pub mod message;

use crate::id::Id;

/// The only protocol version this crate accepts.
pub const PROTOCOL_VERSION: u8 = 1;

/// The seven message types, packed into the high nibble of the header's
/// first byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    PingRequest = 0,
    PingResponse = 1,
    StoreRequest = 2,
    FindPeerRequest = 3,
    FindPeerResponse = 4,
    FindValueRequest = 5,
    FindValueResponse = 6,
}

impl TryFrom<u8> for MessageType {
    type Error = crate::error::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MessageType::PingRequest,
            1 => MessageType::PingResponse,
            2 => MessageType::StoreRequest,
            3 => MessageType::FindPeerRequest,
            4 => MessageType::FindPeerResponse,
            5 => MessageType::FindValueRequest,
            6 => MessageType::FindValueResponse,
            _ => return Err(crate::error::Error::UnknownProtocolVersion),
        })
    }
}

/// Fixed 41-byte header prefixing every datagram: one tag byte (version
/// in the low nibble, message type in the high nibble), the sender's
/// identifier, and a random token used to correlate responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub message_type: MessageType,
    pub source_id: Id,
    pub random_token: Id,
}

impl Header {
    pub fn new(message_type: MessageType, source_id: Id, random_token: Id) -> Header {
        Header {
            message_type,
            source_id,
            random_token,
        }
    }
}
