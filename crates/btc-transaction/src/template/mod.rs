//! Script templates for witness spends.
//!
//! Provides the `WitnessTemplate` trait and the P2WSH multisig
//! implementation used to produce witness stacks during signing.

pub mod p2wsh_multisig;

use crate::sighash::SighashCache;
use crate::witness::Witness;
use crate::TransactionError;

/// Trait for templates that produce a witness stack for one input.
///
/// The `sign` method receives the sighash cache of the transaction being
/// signed, computes the digest for `input_index`, signs it and returns the
/// complete witness.
pub trait WitnessTemplate {
    /// Produce the witness for the given input.
    fn sign(&self, cache: &SighashCache, input_index: usize) -> Result<Witness, TransactionError>;

    /// Upper bound on the serialized witness size, for fee estimation by
    /// callers.
    fn estimate_witness_size(&self) -> usize;
}
