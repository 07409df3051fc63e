//! secp256k1 private key.
//!
//! Wraps a k256 signing key and adds hex and WIF import/export. Key material
//! decoded from text is held in `Zeroizing` buffers and wiped on drop.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::base58;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Mainnet WIF prefix byte.
pub const MAINNET_WIF_PREFIX: u8 = 0x80;

/// Testnet and regtest WIF prefix byte.
pub const TESTNET_WIF_PREFIX: u8 = 0xef;

/// Compression flag byte appended to WIF for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a random key from the OS RNG.
    pub fn new() -> Self {
        PrivateKey { inner: SigningKey::random(&mut OsRng) }
    }

    /// Create a private key from a raw 32-byte big-endian scalar.
    ///
    /// # Arguments
    /// * `bytes` - The scalar bytes.
    ///
    /// # Returns
    /// `Ok(PrivateKey)`, or `InvalidPrivateKey` if the length is wrong or the
    /// scalar is zero or not below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|_| PrimitivesError::InvalidPrivateKey(
                "scalar is zero or not below the curve order".to_string(),
            ))?;
        Ok(PrivateKey { inner: signing_key })
    }

    /// Create a private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = Zeroizing::new(hex::decode(hex_str)?);
        Self::from_bytes(&bytes)
    }

    /// Decode a WIF string, returning the key and the network prefix byte.
    ///
    /// Both compressed (38-byte payload) and uncompressed (37-byte payload)
    /// forms are accepted; the prefix is returned as-is so the caller can
    /// check it against the network it expects.
    ///
    /// # Arguments
    /// * `wif` - The Base58Check WIF string.
    ///
    /// # Returns
    /// `(key, prefix)` on success, or `InvalidWif` / `ChecksumMismatch`.
    pub fn from_wif_with_prefix(wif: &str) -> Result<(Self, u8), PrimitivesError> {
        let payload = Zeroizing::new(base58::check_decode(wif).map_err(|e| match e {
            PrimitivesError::ChecksumMismatch => e,
            other => PrimitivesError::InvalidWif(other.to_string()),
        })?);

        match payload.len() {
            33 => {}
            34 if payload[33] == COMPRESS_MAGIC => {}
            34 => {
                return Err(PrimitivesError::InvalidWif(
                    "invalid compression flag".to_string(),
                ))
            }
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "invalid payload length {}",
                    n
                )))
            }
        }

        let prefix = payload[0];
        if prefix != MAINNET_WIF_PREFIX && prefix != TESTNET_WIF_PREFIX {
            return Err(PrimitivesError::InvalidWif(format!(
                "unknown network prefix {:#04x}",
                prefix
            )));
        }
        let key = Self::from_bytes(&payload[1..1 + PRIVATE_KEY_BYTES_LEN])?;
        Ok((key, prefix))
    }

    /// Decode a WIF string for any known network.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        Self::from_wif_with_prefix(wif).map(|(key, _)| key)
    }

    /// Encode as compressed WIF with the given network prefix.
    ///
    /// # Arguments
    /// * `prefix` - `MAINNET_WIF_PREFIX` or `TESTNET_WIF_PREFIX`.
    pub fn to_wif_prefix(&self, prefix: u8) -> String {
        let mut payload = Zeroizing::new(Vec::with_capacity(2 + PRIVATE_KEY_BYTES_LEN));
        payload.push(prefix);
        payload.extend_from_slice(&self.to_bytes()[..]);
        payload.push(COMPRESS_MAGIC);
        base58::check_encode(&payload)
    }

    /// Secret scalar as 32 big-endian bytes.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// The corresponding compressed public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.inner.verifying_key())
    }

    /// Sign a 32-byte digest (RFC6979, low-S).
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        *self.to_bytes() == *other.to_bytes()
    }
}

impl Eq for PrivateKey {}
