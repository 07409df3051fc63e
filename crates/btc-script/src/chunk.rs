//! Script chunk parsing and push encoding.
//!
//! A chunk is either a bare opcode or a data push with its payload. Parsing
//! accepts every push form found on chain (direct, PUSHDATA1/2/4); building
//! is restricted to direct pushes, see `builder`.

use crate::opcodes::*;
use crate::ScriptError;

/// Largest push that fits the single length-byte encoding.
pub const MAX_DIRECT_PUSH: usize = OP_DATA_75 as usize;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes this is the payload length.
    pub op: u8,
    /// The payload, for push chunks.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// True for any data push, including the empty push `OP_0`.
    pub fn is_push(&self) -> bool {
        self.data.is_some() || self.op == OP_0
    }

    /// ASM token: hex for pushes, the opcode name otherwise.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) => hex::encode(data),
            None => opcode_to_string(self.op),
        }
    }
}

/// Decode raw script bytes into chunks.
///
/// # Arguments
/// * `bytes` - The raw script bytes.
///
/// # Returns
/// The chunks in order, or `DataTooSmall` if a push is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        pos += 1;

        let len = match op {
            OP_DATA_1..=OP_DATA_75 => op as usize,
            OP_PUSHDATA1 => read_len(bytes, &mut pos, 1)?,
            OP_PUSHDATA2 => read_len(bytes, &mut pos, 2)?,
            OP_PUSHDATA4 => read_len(bytes, &mut pos, 4)?,
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                continue;
            }
        };

        let end = pos.checked_add(len).ok_or(ScriptError::DataTooSmall)?;
        if end > bytes.len() {
            return Err(ScriptError::DataTooSmall);
        }
        chunks.push(ScriptChunk { op, data: Some(bytes[pos..end].to_vec()) });
        pos = end;
    }

    Ok(chunks)
}

fn read_len(bytes: &[u8], pos: &mut usize, width: usize) -> Result<usize, ScriptError> {
    if bytes.len() < *pos + width {
        return Err(ScriptError::DataTooSmall);
    }
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(&bytes[*pos..*pos + width]);
    *pos += width;
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Length prefix for a direct push of `data_len` bytes.
///
/// # Returns
/// The single prefix byte, or `ScriptTooLarge` above 75 bytes.
pub fn push_data_prefix(data_len: usize) -> Result<u8, ScriptError> {
    if data_len <= MAX_DIRECT_PUSH {
        Ok(data_len as u8)
    } else {
        Err(ScriptError::ScriptTooLarge { size: data_len, limit: MAX_DIRECT_PUSH })
    }
}
