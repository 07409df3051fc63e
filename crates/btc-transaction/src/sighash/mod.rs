//! Signature hash computation for SegWit v0 inputs.
//!
//! Computes the BIP143 digest that is signed by ECDSA to authorize spending
//! a witness input. Unlike the legacy algorithm it commits to the value
//! being spent, and the three aggregate hashes (prevouts, sequences,
//! outputs) are shared by every input of a transaction.
//!
//! See <https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki>

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteWriter, VarInt};
use btc_script::Script;

use crate::outpoint::OUTPOINT_SIZE;
use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// The six standard sighash types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SighashType {
    #[default]
    All,
    None,
    Single,
    AllAnyoneCanPay,
    NoneAnyoneCanPay,
    SingleAnyoneCanPay,
}

impl SighashType {
    /// Parse a 32-bit sighash value, accepting only the six standard types.
    pub fn from_u32(value: u32) -> Result<Self, TransactionError> {
        match value {
            0x01 => Ok(SighashType::All),
            0x02 => Ok(SighashType::None),
            0x03 => Ok(SighashType::Single),
            0x81 => Ok(SighashType::AllAnyoneCanPay),
            0x82 => Ok(SighashType::NoneAnyoneCanPay),
            0x83 => Ok(SighashType::SingleAnyoneCanPay),
            other => Err(TransactionError::InvalidSighashType(other)),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            SighashType::All => SIGHASH_ALL,
            SighashType::None => SIGHASH_NONE,
            SighashType::Single => SIGHASH_SINGLE,
            SighashType::AllAnyoneCanPay => SIGHASH_ALL | SIGHASH_ANYONECANPAY,
            SighashType::NoneAnyoneCanPay => SIGHASH_NONE | SIGHASH_ANYONECANPAY,
            SighashType::SingleAnyoneCanPay => SIGHASH_SINGLE | SIGHASH_ANYONECANPAY,
        }
    }

    /// The byte appended to a DER signature.
    pub fn to_byte(self) -> u8 {
        self.to_u32() as u8
    }

    pub fn anyone_can_pay(self) -> bool {
        self.to_u32() & SIGHASH_ANYONECANPAY != 0
    }

    fn base(self) -> u32 {
        self.to_u32() & SIGHASH_MASK
    }
}

impl TryFrom<u32> for SighashType {
    type Error = TransactionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        SighashType::from_u32(value)
    }
}

/// Signature version of the script being satisfied.
///
/// Only witness v0 programs are signed here; the legacy and taproot
/// algorithms are not implemented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SigVersion {
    #[default]
    WitnessV0,
}

/// Everything the digest for one input depends on.
#[derive(Clone, Copy, Debug)]
pub struct SighashRequest<'a> {
    pub tx: &'a Transaction,
    pub input_index: usize,
    /// The witness script for P2WSH, or the implied P2PKH script for P2WPKH.
    pub script_code: &'a Script,
    /// Value of the output being spent.
    pub value: u64,
    pub sighash_type: SighashType,
    pub sig_version: SigVersion,
}

impl<'a> SighashRequest<'a> {
    pub fn new(
        tx: &'a Transaction,
        input_index: usize,
        script_code: &'a Script,
        value: u64,
        sighash_type: SighashType,
    ) -> Self {
        SighashRequest {
            tx,
            input_index,
            script_code,
            value,
            sighash_type,
            sig_version: SigVersion::WitnessV0,
        }
    }
}

/// Compute the BIP143 digest for one input.
///
/// Builds a fresh `SighashCache`; use the cache directly when signing
/// several inputs of the same transaction.
pub fn compute_sighash(req: &SighashRequest) -> Result<[u8; 32], TransactionError> {
    SighashCache::new(req.tx).signature_hash(
        req.input_index,
        req.script_code,
        req.value,
        req.sighash_type,
    )
}

/// The raw BIP143 preimage for one input, before double hashing.
pub fn calc_preimage(req: &SighashRequest) -> Result<Vec<u8>, TransactionError> {
    SighashCache::new(req.tx).preimage(
        req.input_index,
        req.script_code,
        req.value,
        req.sighash_type,
    )
}

/// Per-transaction aggregate hashes reused across inputs.
///
/// Holds only shared references and fixed arrays, so one cache can be
/// read from several signing threads at once.
#[derive(Clone, Debug)]
pub struct SighashCache<'a> {
    tx: &'a Transaction,
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl<'a> SighashCache<'a> {
    pub fn new(tx: &'a Transaction) -> Self {
        let hash_prevouts = prevouts_hash(tx);
        let hash_sequence = sequence_hash(tx);
        let hash_outputs = outputs_hash(tx);
        debug!(
            hash_prevouts = %hex::encode(hash_prevouts),
            hash_sequence = %hex::encode(hash_sequence),
            hash_outputs = %hex::encode(hash_outputs),
            "computed sighash midstate"
        );
        SighashCache {
            tx,
            hash_prevouts,
            hash_sequence,
            hash_outputs,
        }
    }

    pub fn transaction(&self) -> &'a Transaction {
        self.tx
    }

    /// Double SHA-256 of the preimage for `input_index`.
    pub fn signature_hash(
        &self,
        input_index: usize,
        script_code: &Script,
        value: u64,
        sighash_type: SighashType,
    ) -> Result<[u8; 32], TransactionError> {
        let preimage = self.preimage(input_index, script_code, value, sighash_type)?;
        let digest = sha256d(&preimage);
        debug!(input_index, sighash = %hex::encode(digest), "computed sighash");
        Ok(digest)
    }

    /// Compute the BIP143 preimage.
    ///
    /// The preimage consists of:
    /// 1. nVersion (4 bytes LE)
    /// 2. hashPrevouts (32 bytes), zero with ANYONECANPAY
    /// 3. hashSequence (32 bytes), zero with ANYONECANPAY, SINGLE or NONE
    /// 4. outpoint (32+4 bytes) of the input being signed
    /// 5. scriptCode (varint + script)
    /// 6. value (8 bytes LE) of the output being spent
    /// 7. nSequence (4 bytes LE) of the input being signed
    /// 8. hashOutputs (32 bytes): all outputs, the matching output for
    ///    SINGLE, or zero for NONE and for SINGLE without a matching output
    /// 9. nLocktime (4 bytes LE)
    /// 10. sighashType (4 bytes LE)
    pub fn preimage(
        &self,
        input_index: usize,
        script_code: &Script,
        value: u64,
        sighash_type: SighashType,
    ) -> Result<Vec<u8>, TransactionError> {
        let tx = self.tx;
        let input = tx.inputs.get(input_index).ok_or(TransactionError::InputIndexOutOfRange {
            index: input_index,
            count: tx.inputs.len(),
        })?;

        let acp = sighash_type.anyone_can_pay();
        let base = sighash_type.base();

        let hash_prevouts = if acp { [0u8; 32] } else { self.hash_prevouts };

        let hash_sequence = if acp || base == SIGHASH_SINGLE || base == SIGHASH_NONE {
            [0u8; 32]
        } else {
            self.hash_sequence
        };

        let hash_outputs = if base != SIGHASH_SINGLE && base != SIGHASH_NONE {
            self.hash_outputs
        } else if base == SIGHASH_SINGLE && input_index < tx.outputs.len() {
            sha256d(&tx.outputs[input_index].to_bytes())
        } else {
            [0u8; 32]
        };

        let code = script_code.to_bytes();
        let mut writer = ByteWriter::with_capacity(156 + code.len() + VarInt::from(code.len()).length());

        writer.write_u32_le(tx.version);
        writer.write_bytes(&hash_prevouts);
        writer.write_bytes(&hash_sequence);
        input.outpoint.write_to(&mut writer);
        writer.write_var_bytes(code);
        writer.write_u64_le(value);
        writer.write_u32_le(input.sequence);
        writer.write_bytes(&hash_outputs);
        writer.write_u32_le(tx.lock_time);
        writer.write_u32_le(sighash_type.to_u32());

        trace!(input_index, preimage = %hex::encode(writer.as_bytes()), "built sighash preimage");
        Ok(writer.into_bytes())
    }
}

// -----------------------------------------------------------------------
// Internal helper functions
// -----------------------------------------------------------------------

/// sha256d over every input's outpoint.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * OUTPOINT_SIZE);
    for input in &tx.inputs {
        input.outpoint.write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}

/// sha256d over every input's sequence number.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

/// sha256d over every serialized output.
fn outputs_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    for output in &tx.outputs {
        output.write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}
