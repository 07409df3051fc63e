use btc_primitives::PrimitivesError;
use btc_script::ScriptError;

/// Pipeline stage an error came out of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorStage {
    ScriptBuild,
    AddressDecode,
    Serialization,
    Hashing,
    Signing,
    Assembly,
}

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Malformed wire bytes; the message names the field being read.
    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("input index {index} out of range (tx has {count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },

    /// Only ALL, NONE and SINGLE, each with or without ANYONECANPAY.
    #[error("invalid sighash type: 0x{0:02x}")]
    InvalidSighashType(u32),

    #[error("input {input}: {provided} signatures available, {required} required")]
    InsufficientSignatures { input: usize, required: usize, provided: usize },

    /// A key that does not appear in the witness script it was offered for.
    #[error("signing key not in witness script: {0}")]
    UnknownSigningKey(String),

    /// A co-signer signature that does not verify or has the wrong sighash byte.
    #[error("invalid signature for input {input}: {reason}")]
    InvalidSignature { input: usize, reason: String },

    /// The finished transaction hashes to a different digest than was signed.
    #[error("digest mismatch on input {input}")]
    DigestMismatch { input: usize },

    /// The spend request is structurally unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An underlying script error (forwarded from `btc-script`).
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// An underlying primitives error (forwarded from `btc-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
}

impl TransactionError {
    /// The stage of the build that failed.
    pub fn stage(&self) -> ErrorStage {
        match self {
            TransactionError::SerializationError(_) => ErrorStage::Serialization,
            TransactionError::InvalidSighashType(_) => ErrorStage::Hashing,
            TransactionError::InsufficientSignatures { .. }
            | TransactionError::UnknownSigningKey(_)
            | TransactionError::InvalidSignature { .. } => ErrorStage::Signing,
            TransactionError::InputIndexOutOfRange { .. }
            | TransactionError::DigestMismatch { .. }
            | TransactionError::InvalidRequest(_) => ErrorStage::Assembly,
            TransactionError::Script(e) => match e {
                ScriptError::UnsupportedScriptType(_)
                | ScriptError::InvalidChecksum
                | ScriptError::InvalidProgramLength(_)
                | ScriptError::InvalidAddress(_)
                | ScriptError::NetworkMismatch { .. }
                | ScriptError::UnknownNetwork(_) => ErrorStage::AddressDecode,
                _ => ErrorStage::ScriptBuild,
            },
            TransactionError::Primitives(e) => match e {
                PrimitivesError::InvalidPrivateKey(_)
                | PrimitivesError::InvalidPublicKey(_)
                | PrimitivesError::InvalidSignature(_)
                | PrimitivesError::InvalidWif(_) => ErrorStage::Signing,
                _ => ErrorStage::Serialization,
            },
        }
    }
}

/// Wrap a reader error with the field that was being read.
pub(crate) fn reading(field: &'static str) -> impl Fn(PrimitivesError) -> TransactionError {
    move |e| TransactionError::SerializationError(format!("reading {}: {}", field, e))
}
