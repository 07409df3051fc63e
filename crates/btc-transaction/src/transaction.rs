//! Core transaction type.
//!
//! Represents a transaction with version, inputs, outputs, per-input
//! witnesses and lock time. Serializes to the BIP144 SegWit wire format
//! whenever any input carries a witness, and to the legacy format otherwise.

use btc_primitives::chainhash::{double_hash_h, Hash};
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::error::reading;
use crate::input::TxInput;
use crate::output::TxOutput;
use crate::witness::Witness;
use crate::TransactionError;

/// First byte after the version in a SegWit serialization.
pub const SEGWIT_MARKER: u8 = 0x00;
/// Second byte after the version in a SegWit serialization.
pub const SEGWIT_FLAG: u8 = 0x01;
/// Weight multiplier for non-witness bytes.
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Smallest possible encoded input: outpoint, empty script, sequence.
const MIN_INPUT_SIZE: usize = 36 + 1 + 4;
/// Smallest possible encoded output: value and empty script.
const MIN_OUTPUT_SIZE: usize = 8 + 1;

/// A transaction consisting of a version, inputs, outputs and a lock time.
///
/// # Wire format
///
/// | Field          | Size                                   |
/// |----------------|----------------------------------------|
/// | version        | 4 bytes (LE)                           |
/// | marker, flag   | `00 01`, only when any witness is set  |
/// | input count    | VarInt                                 |
/// | inputs         | variable (per input)                   |
/// | output count   | VarInt                                 |
/// | outputs        | variable (per output)                  |
/// | witnesses      | one stack per input, SegWit form only  |
/// | lock_time      | 4 bytes (LE)                           |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version. Currently 1 or 2.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TxInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TxOutput>,

    /// Lock time. If non-zero, the transaction is not valid until the
    /// specified block height or Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------

    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
    }

    /// Replace the witness stack of input `index`.
    pub fn set_witness(
        &mut self,
        index: usize,
        witness: impl Into<Witness>,
    ) -> Result<(), TransactionError> {
        let count = self.inputs.len();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(TransactionError::InputIndexOutOfRange { index, count })?;
        input.witness = witness.into();
        Ok(())
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// True when any input carries a non-empty witness.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::deserialize(&bytes)
    }

    /// Parse a transaction from raw bytes, legacy or SegWit.
    ///
    /// The slice must hold exactly one transaction with no trailing data.
    /// A SegWit encoding must use flag 0x01 and carry at least one
    /// non-empty witness. A legacy transaction with no inputs starts with
    /// the same `00` byte as the marker; it is accepted when the SegWit
    /// reading fails and the legacy one consumes the whole slice.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        match Self::deserialize_as(bytes, true) {
            Ok(tx) => Ok(tx),
            Err(e) if bytes.get(4) == Some(&SEGWIT_MARKER) => {
                Self::deserialize_as(bytes, false).map_err(|_| e)
            }
            Err(e) => Err(e),
        }
    }

    fn deserialize_as(bytes: &[u8], allow_segwit: bool) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_body(&mut reader, allow_segwit)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// Same marker handling as `deserialize`. On failure the reader is left
    /// where it was.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let mut segwit = reader.clone();
        match Self::read_body(&mut segwit, true) {
            Ok(tx) => {
                *reader = segwit;
                Ok(tx)
            }
            Err(e) => {
                let mut legacy = reader.clone();
                let tx = Self::read_body(&mut legacy, false).map_err(|_| e)?;
                *reader = legacy;
                Ok(tx)
            }
        }
    }

    fn read_body(reader: &mut ByteReader, allow_segwit: bool) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(reading("version"))?;

        let segwit = allow_segwit && reader.peek_u8() == Some(SEGWIT_MARKER);
        if segwit {
            reader.read_u8().map_err(reading("segwit marker"))?;
            let flag = reader.read_u8().map_err(reading("segwit flag"))?;
            if flag != SEGWIT_FLAG {
                return Err(TransactionError::SerializationError(format!(
                    "reading segwit flag: unsupported flag 0x{:02x}",
                    flag
                )));
            }
        }

        let input_count = reader.read_varint().map_err(reading("input count"))?;
        let mut inputs = Vec::with_capacity(bounded(input_count, reader, MIN_INPUT_SIZE));
        for _ in 0..input_count.value() {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(reading("output count"))?;
        let mut outputs = Vec::with_capacity(bounded(output_count, reader, MIN_OUTPUT_SIZE));
        for _ in 0..output_count.value() {
            outputs.push(TxOutput::read_from(reader)?);
        }

        if segwit {
            for input in inputs.iter_mut() {
                input.witness = Witness::read_from(reader)?;
            }
            if inputs.iter().all(|i| i.witness.is_empty()) {
                return Err(TransactionError::SerializationError(
                    "segwit marker present but every witness is empty".to_string(),
                ));
            }
        }

        let lock_time = reader.read_u32_le().map_err(reading("lock time"))?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Full wire bytes, in SegWit form when any witness is non-empty.
    pub fn serialize(&self) -> Vec<u8> {
        self.encode(self.has_witness())
    }

    /// Wire bytes without marker, flag or witnesses. This is what the txid
    /// commits to.
    pub fn serialize_stripped(&self) -> Vec<u8> {
        self.encode(false)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    fn encode(&self, with_witness: bool) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);
        if with_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        if with_witness {
            for input in &self.inputs {
                input.witness.write_to(&mut writer);
            }
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    // -----------------------------------------------------------------
    // Identifiers and size
    // -----------------------------------------------------------------

    /// Double SHA-256 of the stripped serialization.
    ///
    /// `Display` on the returned hash gives the conventional reversed hex.
    pub fn txid(&self) -> Hash {
        double_hash_h(&self.serialize_stripped())
    }

    /// Double SHA-256 of the full serialization. Equal to `txid` when no
    /// input has a witness.
    pub fn wtxid(&self) -> Hash {
        double_hash_h(&self.serialize())
    }

    /// Total serialized size in bytes.
    pub fn size(&self) -> usize {
        self.serialize().len()
    }

    /// Size of the stripped serialization.
    pub fn base_size(&self) -> usize {
        self.serialize_stripped().len()
    }

    /// BIP141 weight: base size times three plus total size.
    pub fn weight(&self) -> usize {
        self.base_size() * (WITNESS_SCALE_FACTOR - 1) + self.size()
    }

    /// Virtual size: weight divided by four, rounded up.
    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(WITNESS_SCALE_FACTOR)
    }
}

/// Preallocation for `count` elements that cannot exceed what the
/// remaining bytes could hold.
fn bounded(count: VarInt, reader: &ByteReader, min_size: usize) -> usize {
    (count.value() as usize).min(reader.remaining() / min_size)
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
