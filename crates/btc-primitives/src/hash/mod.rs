//! Hash function primitives.
//!
//! SHA-256, double SHA-256, RIPEMD-160 and Hash160: the four digests a
//! P2WSH multisig spend touches (witness program, txid, sighash, P2PKH and
//! P2WPKH programs).

use sha2::{Sha256, Digest};
use ripemd::Ripemd160;

/// Compute SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute double SHA-256 (SHA-256d) hash of the input data.
///
/// This is the standard Bitcoin hash function used for transaction IDs
/// and block hashes. Computes SHA-256(SHA-256(data)).
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte double-SHA-256 digest.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute RIPEMD-160 hash of the input data.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 20-byte RIPEMD-160 digest.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 20];
    output.copy_from_slice(&result);
    output
}

/// Compute Hash160: RIPEMD-160(SHA-256(data)).
///
/// Used for Bitcoin address generation from public keys.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 20-byte Hash160 digest.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Incremental double SHA-256.
///
/// Feeds the first SHA-256 pass piece by piece so large preimages never
/// have to be concatenated into one buffer.
#[derive(Clone, Default)]
pub struct Sha256dEngine {
    inner: Sha256,
}

impl Sha256dEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the running first-pass hash.
    pub fn input(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finish both passes and return the digest.
    pub fn finalize(self) -> [u8; 32] {
        let first: [u8; 32] = self.inner.finalize().into();
        sha256(&first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DATA: &[u8] = b"I am a test";
    const TEST_DATA_2: &[u8] = b"this is the data I want to hash";

    // ---- RIPEMD-160 ----

    #[test]
    fn test_ripemd160_empty_string() {
        let hash = ripemd160(b"");
        assert_eq!(
            hex::encode(hash),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
    }

    #[test]
    fn test_ripemd160_string() {
        let hash = ripemd160(TEST_DATA);
        assert_eq!(
            hex::encode(hash),
            "09a23f506b4a37cabab8a9e49b541de582fca96b"
        );
    }

    // ---- SHA-256d (double SHA-256) ----

    #[test]
    fn test_sha256d_empty_string() {
        let hash = sha256d(b"");
        assert_eq!(
            hex::encode(hash),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_sha256d_string() {
        let hash = sha256d(TEST_DATA_2);
        assert_eq!(
            hex::encode(hash),
            "2209ddda5914a3fbad507ff2284c4b6e559c18a669f9fc3ad3b5826a2a999d58"
        );
    }

    // ---- SHA-256 ----

    #[test]
    fn test_sha256_empty_string() {
        let hash = sha256(b"");
        assert_eq!(
            hex::encode(hash),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_string() {
        let hash = sha256(TEST_DATA_2);
        assert_eq!(
            hex::encode(hash),
            "f88eec7ecabf88f9a64c4100cac1e0c0c4581100492137d1b656ea626cad63e3"
        );
    }

    // ---- Hash160 ----

    #[test]
    fn test_hash160_empty_string() {
        let hash = hash160(b"");
        assert_eq!(
            hex::encode(hash),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn test_hash160_string() {
        let hash = hash160(TEST_DATA_2);
        assert_eq!(
            hex::encode(hash),
            "e7fb13ef86fef4203f042fbfc2703fa628301e90"
        );
    }

    // ---- Sha256dEngine ----

    #[test]
    fn test_engine_matches_one_shot() {
        let mut engine = Sha256dEngine::new();
        engine.input(b"this is the data ");
        engine.input(b"I want to hash");
        assert_eq!(engine.finalize(), sha256d(TEST_DATA_2));
    }

    #[test]
    fn test_engine_empty() {
        assert_eq!(Sha256dEngine::new().finalize(), sha256d(b""));
    }

    // ---- multisig test keys ----

    #[test]
    fn test_sha256_passphrase_keys() {
        assert_eq!(
            hex::encode(sha256(b"correct horse battery staple first")),
            "5f33a70a4d4ed279d2aabe24ed04aa9592cc14abcf03fae0f17a793503ce0741"
        );
        assert_eq!(
            hex::encode(sha256(b"correct horse battery staple second")),
            "3d233236233f766bcdd256a4ee42014b4984af6c7491777bd06a5185795e943e"
        );
    }
}
