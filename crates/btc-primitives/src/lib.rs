/// Cryptographic primitives, hashing, and wire-format utilities.
///
/// This crate provides the foundational building blocks for the SDK:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Chain hash type for transaction ids and signature digests
/// - secp256k1 keys and RFC6979 ECDSA signatures
/// - Variable-length integer encoding and byte reader/writer
/// - Base58 and Base58Check encoding

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod base58;
pub mod ec;

mod error;
pub use error::PrimitivesError;
