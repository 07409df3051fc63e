#![deny(missing_docs)]

//! Bitcoin P2WSH multisig SDK.
//!
//! Re-exports the primitives, script and transaction crates for
//! single-crate usage. The common entry points are also available at the
//! crate root.

pub use btc_primitives as primitives;
pub use btc_script as script;
pub use btc_transaction as transaction;

pub use btc_primitives::ec::{KeyPair, PrivateKey, PublicKey};
pub use btc_script::{Address, MultisigScript, Network, Script, ScriptError};
pub use btc_transaction::{
    assemble, AssembledTransaction, AssemblerOptions, Destination, ErrorStage, InputSpec,
    OutPoint, OutputSpec, PartiallySignedSpend, RawPartialSpend, SighashType, SpendRequest,
    SpentOutput, Transaction, TransactionError,
};
