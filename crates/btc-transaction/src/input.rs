//! Transaction input referencing a previous output.
//!
//! Holds the outpoint, the legacy unlocking script (empty for native
//! SegWit spends), the sequence number and the witness. The witness is
//! serialized by the transaction, not by the input, since it lives in a
//! separate section of the wire format.

use btc_primitives::util::{ByteReader, ByteWriter};
use btc_script::Script;

use crate::error::reading;
use crate::outpoint::OutPoint;
use crate::witness::Witness;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// # Wire format (non-witness part)
///
/// | Field            | Size             |
/// |------------------|------------------|
/// | txid             | 32 bytes (LE)    |
/// | vout             | 4 bytes (LE)     |
/// | script length    | VarInt           |
/// | script_sig       | variable         |
/// | sequence         | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub outpoint: OutPoint,

    /// Legacy unlocking script. Empty for P2WSH and P2WPKH spends.
    pub script_sig: Script,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence: u32,

    /// Witness stack, populated once the input is signed.
    pub witness: Witness,
}

impl TxInput {
    /// An unsigned input spending `outpoint` with the default sequence.
    pub fn new(outpoint: OutPoint) -> Self {
        TxInput {
            outpoint,
            script_sig: Script::new(),
            sequence: DEFAULT_SEQUENCE_NUMBER,
            witness: Witness::new(),
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Read the non-witness part of an input. The witness is left empty.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let outpoint = OutPoint::read_from(reader)?;
        let script_bytes = reader.read_var_bytes().map_err(reading("unlocking script"))?;
        let sequence = reader.read_u32_le().map_err(reading("sequence number"))?;

        Ok(TxInput {
            outpoint,
            script_sig: Script::from_bytes(script_bytes),
            sequence,
            witness: Witness::new(),
        })
    }

    /// Write the non-witness part of the input.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        self.outpoint.write_to(writer);
        writer.write_var_bytes(self.script_sig.to_bytes());
        writer.write_u32_le(self.sequence);
    }
}
