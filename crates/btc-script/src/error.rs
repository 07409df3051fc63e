use crate::address::Network;

/// Error types for script building, parsing and address encoding.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A push or a whole script exceeds what the builder will emit.
    #[error("script too large: {size} bytes exceeds limit of {limit}")]
    ScriptTooLarge { size: usize, limit: usize },

    /// Push opcodes must go through `append_push_data`.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// ASM token that is neither a known opcode nor hex data.
    #[error("invalid ASM token: {0}")]
    InvalidAsmToken(String),

    /// A push runs past the end of the script.
    #[error("not enough data for push")]
    DataTooSmall,

    #[error("invalid multisig script: {0}")]
    InvalidMultisig(String),

    /// Script is not one of P2WSH, P2WPKH or P2PKH.
    #[error("unsupported script type: {0}")]
    UnsupportedScriptType(String),

    #[error("invalid address checksum")]
    InvalidChecksum,

    #[error("invalid witness program length: {0} bytes")]
    InvalidProgramLength(usize),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address is for {found}, expected {expected}")]
    NetworkMismatch { expected: Network, found: Network },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("primitives error: {0}")]
    Primitives(#[from] btc_primitives::PrimitivesError),
}
