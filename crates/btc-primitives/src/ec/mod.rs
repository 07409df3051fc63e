//! secp256k1 keys and ECDSA signatures.

pub mod keypair;
pub mod private_key;
pub mod public_key;
pub mod signature;

pub use keypair::KeyPair;
pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
