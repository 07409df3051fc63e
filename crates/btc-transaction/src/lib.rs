/// Transaction building, signing, and serialization.
///
/// Provides the SegWit transaction model, the BIP143 signature hash,
/// RFC6979 signing, the P2WSH multisig witness template, co-signer partial
/// signing and one-shot spend assembly.

pub mod transaction;
pub mod outpoint;
pub mod input;
pub mod output;
pub mod witness;
pub mod sighash;
pub mod signer;
pub mod template;
pub mod partial;
pub mod assembler;

mod error;
pub use error::{ErrorStage, TransactionError};
pub use transaction::Transaction;
pub use outpoint::OutPoint;
pub use input::TxInput;
pub use output::TxOutput;
pub use witness::Witness;
pub use sighash::{compute_sighash, SighashCache, SighashRequest, SighashType};
pub use partial::{
    PartiallySignedSpend, RawPartialSpend, RawPendingInput, RawSignature, SpentOutput,
};
pub use assembler::{
    assemble, AssembledTransaction, AssemblerOptions, Destination, InputSpec, OutputSpec,
    SpendRequest,
};
