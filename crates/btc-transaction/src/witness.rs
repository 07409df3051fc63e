//! Segregated witness stack for a single input.

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::error::reading;
use crate::TransactionError;

/// Ordered stack items, serialized as a count followed by
/// length-prefixed items.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Witness(Vec<Vec<u8>>);

impl Witness {
    pub fn new() -> Self {
        Witness(Vec::new())
    }

    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Witness(items)
    }

    pub fn push(&mut self, item: impl Into<Vec<u8>>) {
        self.0.push(item.into());
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// The last item, which for P2WSH spends is the witness script.
    pub fn last(&self) -> Option<&[u8]> {
        self.0.last().map(Vec::as_slice)
    }

    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let count = reader.read_varint().map_err(reading("witness item count"))?;
        // Each item needs at least its length byte.
        if count.value() > reader.remaining() as u64 {
            return Err(TransactionError::SerializationError(format!(
                "reading witness item count: {} items with {} bytes left",
                count.value(),
                reader.remaining()
            )));
        }
        let mut items = Vec::with_capacity(count.value() as usize);
        for _ in 0..count.value() {
            let item = reader.read_var_bytes().map_err(reading("witness item"))?;
            items.push(item.to_vec());
        }
        Ok(Witness(items))
    }

    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_varint(VarInt::from(self.0.len()));
        for item in &self.0 {
            writer.write_var_bytes(item);
        }
    }

    /// Serialized length in bytes.
    pub fn serialized_len(&self) -> usize {
        VarInt::from(self.0.len()).length()
            + self
                .0
                .iter()
                .map(|i| VarInt::from(i.len()).length() + i.len())
                .sum::<usize>()
    }
}

impl From<Vec<Vec<u8>>> for Witness {
    fn from(items: Vec<Vec<u8>>) -> Self {
        Witness(items)
    }
}
