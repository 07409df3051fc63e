//! Transaction output with a value and locking script.

use btc_primitives::util::{ByteReader, ByteWriter};
use btc_script::Script;

use crate::error::reading;
use crate::TransactionError;

/// A single output in a transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | value            | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | script_pubkey    | variable       |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxOutput {
    /// Amount in satoshis.
    pub value: u64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub script_pubkey: Script,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        TxOutput { value, script_pubkey }
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = reader.read_u64_le().map_err(reading("output value"))?;
        let script_bytes = reader.read_var_bytes().map_err(reading("locking script"))?;
        Ok(TxOutput {
            value,
            script_pubkey: Script::from_bytes(script_bytes),
        })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.value);
        writer.write_var_bytes(self.script_pubkey.to_bytes());
    }

    /// Wire bytes of this output, as committed to by hashOutputs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(9 + self.script_pubkey.len());
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2wpkh_output_bytes() {
        let spk = Script::from_hex("00147829e2df6fd013aa5303d4e0af578d4275629bd3").unwrap();
        let out = TxOutput::new(99_000_000, spk);
        assert_eq!(
            hex::encode(out.to_bytes()),
            "c09ee605000000001600147829e2df6fd013aa5303d4e0af578d4275629bd3"
        );
        let bytes = out.to_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(TxOutput::read_from(&mut r).unwrap(), out);
    }

    #[test]
    fn test_truncated_value() {
        let mut r = ByteReader::new(&[0u8; 5]);
        let err = TxOutput::read_from(&mut r).unwrap_err();
        assert!(err.to_string().contains("reading output value"));
    }
}
