//! Reference to a previous transaction output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use btc_primitives::chainhash::Hash;
use btc_primitives::util::{ByteReader, ByteWriter};

use crate::error::reading;
use crate::TransactionError;

/// Serialized size of an outpoint: 32-byte txid plus 4-byte index.
pub const OUTPOINT_SIZE: usize = 36;

/// A `(txid, vout)` pair.
///
/// The txid is held in internal byte order; `Display` and serde use the
/// reversed hex shown by explorers, so `"49ff..d1c4:0"` round-trips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid = reader.read_array::<32>().map_err(reading("source txid"))?;
        let vout = reader.read_u32_le().map_err(reading("output index"))?;
        Ok(OutPoint { txid: Hash::new(txid), vout })
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.txid.as_bytes());
        writer.write_u32_le(self.vout);
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for OutPoint {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s.split_once(':').ok_or_else(|| {
            TransactionError::InvalidRequest(format!("outpoint '{}' is not txid:vout", s))
        })?;
        let vout = vout.parse::<u32>().map_err(|e| {
            TransactionError::InvalidRequest(format!("outpoint index '{}': {}", vout, e))
        })?;
        Ok(OutPoint { txid: Hash::from_hex(txid)?, vout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "49ff22c9985c1991791b7a3bd6a2e8d1d6567ca283e0885afdc83bd92f56d1c4";

    #[test]
    fn test_display_and_parse() {
        let op: OutPoint = format!("{}:0", TXID).parse().unwrap();
        assert_eq!(op.vout, 0);
        assert_eq!(op.txid.as_bytes()[0], 0xc4);
        assert_eq!(op.to_string(), format!("{}:0", TXID));
    }

    #[test]
    fn test_wire_order() {
        let op = OutPoint::new(Hash::from_hex(TXID).unwrap(), 7);
        let mut w = ByteWriter::new();
        op.write_to(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), OUTPOINT_SIZE);
        assert_eq!(
            hex::encode(&bytes),
            "c4d1562fd93bc8fd5a88e083a27c56d6d1e8a2d63b7a1b7991195c98c922ff4907000000"
        );
        let mut r = ByteReader::new(&bytes);
        assert_eq!(OutPoint::read_from(&mut r).unwrap(), op);
    }

    #[test]
    fn test_parse_errors() {
        assert!("nocolon".parse::<OutPoint>().is_err());
        assert!(format!("{}:x", TXID).parse::<OutPoint>().is_err());
        assert!("abcd:0".parse::<OutPoint>().is_err());
    }

    #[test]
    fn test_serde_json() {
        let op = OutPoint::new(Hash::from_hex(TXID).unwrap(), 1);
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, format!("{{\"txid\":\"{}\",\"vout\":1}}", TXID));
        let back: OutPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
