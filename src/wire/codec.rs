// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Byte-exact reader/writer pair implementing spec.md §4.2's layout.
//!
//! Hand-rolled rather than delegated to a general serialization crate:
//! the wire format is a fixed, versioned layout that every participant
//! must reproduce exactly, which is precisely what a library like
//! `bincode` does not promise across versions.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::id::{self, Id};
use crate::wire::{Header, MessageType, PROTOCOL_VERSION};

const IPV4_TAG: u8 = 1;
const IPV6_TAG: u8 = 2;

/// A checked cursor over an immutable byte slice. Every read validates
/// that enough bytes remain before advancing, returning the matching
/// `Truncated*` error kind otherwise.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    /// The bytes not yet consumed.
    pub fn remainder(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.take(1).map(|b| b[0]).ok_or(Error::TruncatedHeader)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.take(2).ok_or(Error::TruncatedEndpoint)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let b = self.take(8).ok_or(Error::TruncatedSize)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(b);
        Ok(u64::from_le_bytes(bytes))
    }

    /// A length-prefixed byte vector: `size (8 bytes LE) || bytes`.
    pub fn read_byte_vec(&mut self) -> Result<Vec<u8>> {
        let size = self.read_u64_le()? as usize;
        self.take(size)
            .map(|b| b.to_vec())
            .ok_or(Error::CorruptedBody)
    }

    /// A raw 20-byte identifier, most significant byte first.
    pub fn read_id(&mut self) -> Result<Id> {
        let b = self.take(id::BYTE_LEN).ok_or(Error::TruncatedId)?;
        let mut bytes = [0u8; id::BYTE_LEN];
        bytes.copy_from_slice(b);
        Ok(Id::from_bytes(bytes))
    }

    /// `port (2 bytes LE) || family (1 byte) || address_bytes (4 or 16)`.
    pub fn read_socket_addr(&mut self) -> Result<SocketAddr> {
        let port = self.read_u16_le()?;
        let family = self.take(1).ok_or(Error::TruncatedEndpoint)?[0];
        let ip = match family {
            IPV4_TAG => {
                let b = self.take(4).ok_or(Error::TruncatedAddress)?;
                IpAddr::V4(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            IPV6_TAG => {
                let b = self.take(16).ok_or(Error::TruncatedAddress)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(b);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            _ => return Err(Error::TruncatedAddress),
        };
        Ok(SocketAddr::new(ip, port))
    }

    /// The header's version/type tag byte, the source id, and the
    /// random token, in that order.
    pub fn read_header(&mut self) -> Result<Header> {
        let tag = self.take(1).ok_or(Error::TruncatedHeader)?[0];
        let version = tag & 0x0f;
        if version != PROTOCOL_VERSION {
            return Err(Error::UnknownProtocolVersion);
        }
        let message_type = MessageType::try_from(tag >> 4)?;
        let source_id = self.read_id()?;
        let random_token = self.read_id()?;
        Ok(Header::new(message_type, source_id, random_token))
    }
}

/// An append-only byte buffer writer, the inverse of [`Reader`].
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Writer {
        Writer {
            buf: BytesMut::new(),
        }
    }

    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.buf.put_slice(&v.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, v: u64) {
        self.buf.put_slice(&v.to_le_bytes());
    }

    pub fn write_byte_vec(&mut self, data: &[u8]) {
        self.write_u64_le(data.len() as u64);
        self.buf.put_slice(data);
    }

    pub fn write_id(&mut self, id: &Id) {
        self.buf.put_slice(id.as_bytes());
    }

    pub fn write_socket_addr(&mut self, addr: &SocketAddr) {
        self.write_u16_le(addr.port());
        match addr.ip() {
            IpAddr::V4(v4) => {
                self.write_u8(IPV4_TAG);
                self.buf.put_slice(&v4.octets());
            }
            IpAddr::V6(v6) => {
                self.write_u8(IPV6_TAG);
                self.buf.put_slice(&v6.octets());
            }
        }
    }

    pub fn write_header(&mut self, header: &Header) {
        let tag = PROTOCOL_VERSION | ((header.message_type as u8) << 4);
        self.write_u8(tag);
        self.write_id(&header.source_id);
        self.write_id(&header.random_token);
    }
}

impl Default for Writer {
    fn default() -> Self {
        Writer::new()
    }
}
