/// Script building, parsing and address encoding.
///
/// Provides the Bitcoin Script type, opcode definitions, script chunk parsing,
/// witness script construction including M-of-N multisig, and the
/// Bech32/Base58Check address codec.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod builder;
pub mod multisig;
pub mod address;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use address::{address_to_script_pubkey, script_pubkey_to_address, Address, AddressPayload, Network};
pub use builder::{build_script, build_witness_script, ScriptBuilder, ScriptElement};
pub use chunk::ScriptChunk;
pub use multisig::MultisigScript;
