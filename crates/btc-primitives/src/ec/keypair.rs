//! A private key bundled with its compressed public key.

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Caller-supplied signing key with its public half computed once.
///
/// The public key is what multisig scripts and signature ordering look at,
/// so it is cached rather than re-derived per input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl KeyPair {
    pub fn new(private_key: PrivateKey) -> Self {
        let public_key = private_key.pub_key();
        KeyPair { private_key, public_key }
    }

    /// Build from raw secret bytes; fails with `InvalidPrivateKey`.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        PrivateKey::from_bytes(bytes).map(Self::new)
    }

    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        PrivateKey::from_wif(wif).map(Self::new)
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        self.private_key.sign(digest)
    }
}

impl From<PrivateKey> for KeyPair {
    fn from(private_key: PrivateKey) -> Self {
        KeyPair::new(private_key)
    }
}
