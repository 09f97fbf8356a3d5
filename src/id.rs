// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! 160-bit identifiers: both peer addresses and key addresses in the
//! keyspace.

use std::fmt;

use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// Number of bytes in an identifier.
pub const BYTE_LEN: usize = 20;
/// Number of bits in an identifier.
pub const BIT_LEN: usize = BYTE_LEN * 8;

/// A 160-bit identifier, stored most-significant-byte first.
///
/// Bit 0 is the most significant bit of byte 0.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id([u8; BYTE_LEN]);

impl Id {
    /// The all-zero identifier.
    pub const ZERO: Id = Id([0u8; BYTE_LEN]);

    /// Builds an identifier from raw big-endian bytes.
    pub fn from_bytes(bytes: [u8; BYTE_LEN]) -> Id {
        Id(bytes)
    }

    /// Returns the identifier's raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; BYTE_LEN] {
        &self.0
    }

    /// Draws a uniformly random identifier.
    pub fn random(rng: &mut impl RngCore) -> Id {
        let mut bytes = [0u8; BYTE_LEN];
        rng.fill_bytes(&mut bytes);
        Id(bytes)
    }

    /// Parses a right-aligned hex string of at most 40 characters,
    /// left-zero-padding shorter strings.
    ///
    /// Rejects strings longer than 40 characters or containing any
    /// non-hex-digit character.
    pub fn from_hex(s: &str) -> Result<Id> {
        if s.len() > BYTE_LEN * 2 {
            return Err(Error::InvalidId(s.to_owned()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidId(s.to_owned()));
        }

        let mut padded = String::with_capacity(BYTE_LEN * 2);
        for _ in 0..(BYTE_LEN * 2 - s.len()) {
            padded.push('0');
        }
        padded.push_str(s);

        let mut bytes = [0u8; BYTE_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = &padded[i * 2..i * 2 + 1];
            let lo = &padded[i * 2 + 1..i * 2 + 2];
            let hi = u8::from_str_radix(hi, 16).map_err(|_| Error::InvalidId(s.to_owned()))?;
            let lo = u8::from_str_radix(lo, 16).map_err(|_| Error::InvalidId(s.to_owned()))?;
            *byte = (hi << 4) | lo;
        }

        Ok(Id(bytes))
    }

    /// Returns the full 40-character lower-hex representation, with no
    /// elision. Used for round-tripping (`to_hex(from_hex(s)) ==
    /// left_pad('0', 40, s)`).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The SHA-1 hash of an arbitrary byte sequence, truncated to the
    /// digest's natural 20-byte length.
    pub fn hash(data: &[u8]) -> Id {
        let mut hasher = Sha1::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut bytes = [0u8; BYTE_LEN];
        bytes.copy_from_slice(&digest);
        Id(bytes)
    }

    /// Reads bit `i` (0 = most significant bit of byte 0).
    ///
    /// # Panics
    /// Panics if `i >= BIT_LEN`.
    pub fn bit(&self, i: usize) -> bool {
        assert!(i < BIT_LEN, "bit index out of range");
        let byte = self.0[i / 8];
        let shift = 7 - (i % 8);
        (byte >> shift) & 1 != 0
    }

    /// Sets bit `i` (0 = most significant bit of byte 0) to `value`.
    ///
    /// # Panics
    /// Panics if `i >= BIT_LEN`.
    pub fn set_bit(&mut self, i: usize, value: bool) {
        assert!(i < BIT_LEN, "bit index out of range");
        let shift = 7 - (i % 8);
        if value {
            self.0[i / 8] |= 1 << shift;
        } else {
            self.0[i / 8] &= !(1 << shift);
        }
    }

    /// The bytewise XOR distance between two identifiers.
    pub fn distance(&self, other: &Id) -> Id {
        let mut out = [0u8; BYTE_LEN];
        for i in 0..BYTE_LEN {
            out[i] = self.0[i] ^ other.0[i];
        }
        Id(out)
    }

    /// Index of the first bit (0-indexed from the most significant bit)
    /// at which `self` differs from `other`, or `None` if the two
    /// identifiers are equal.
    pub fn first_differing_bit(&self, other: &Id) -> Option<usize> {
        for i in 0..BIT_LEN {
            if self.bit(i) != other.bit(i) {
                return Some(i);
            }
        }
        None
    }
}

impl fmt::Display for Id {
    /// Lowercase hex with leading zero nibbles elided (so the all-zero
    /// id prints as `"0"`, not 40 zeroes).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.to_hex();
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{trimmed}")
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

impl fmt::LowerHex for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
