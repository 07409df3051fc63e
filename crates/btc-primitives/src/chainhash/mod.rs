//! 32-byte chain hash used for transaction ids and signature digests.
//!
//! Bytes are kept in internal (little-endian) order, the way they appear on
//! the wire. `Display` and `from_hex` use the byte-reversed order shown by
//! block explorers and RPC.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize, Serializer, Deserializer};
use crate::hash::{sha256, sha256d};
use crate::PrimitivesError;

/// Size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Length of a Hash rendered as hex.
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// A 32-byte hash stored in internal byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Zero hash, used for the "zero" fields of the BIP143 preimage.
    pub const ZERO: Hash = Hash([0u8; HASH_SIZE]);

    /// Create a Hash from 32 bytes in internal order.
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a slice in internal order.
    ///
    /// # Arguments
    /// * `bytes` - A slice that must be exactly 32 bytes.
    ///
    /// # Returns
    /// `Ok(Hash)` if the slice is 32 bytes, or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidHash(format!(
                "invalid hash length of {}, want {}",
                bytes.len(),
                HASH_SIZE
            ))
        })?;
        Ok(Hash(arr))
    }

    /// Parse a hash from its display (byte-reversed) hex form.
    ///
    /// Exactly 64 hex characters are required. Unlike block-hash parsing,
    /// a transaction id is never abbreviated, so short input is rejected
    /// instead of being zero-padded.
    ///
    /// # Arguments
    /// * `hex_str` - 64 hex characters in display order.
    ///
    /// # Returns
    /// `Ok(Hash)` on success, or an error for invalid length or characters.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.len() != HASH_HEX_SIZE {
            return Err(PrimitivesError::InvalidHash(format!(
                "hash string must be {} hex characters, got {}",
                HASH_HEX_SIZE,
                hex_str.len()
            )));
        }
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)?;
        bytes.reverse();
        Ok(Hash(bytes))
    }

    /// Internal-order bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Consume the hash, returning its internal-order bytes.
    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// True for the all-zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Byte-reversed hex, the Bitcoin display convention.
impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// SHA-256 of `data` as a Hash.
pub fn hash_h(data: &[u8]) -> Hash {
    Hash(sha256(data))
}

/// Double SHA-256 of `data` as a Hash.
pub fn double_hash_h(data: &[u8]) -> Hash {
    Hash(sha256d(data))
}
