//! Script assembly from an ordered list of opcodes and data pushes.
//!
//! The builder only emits direct pushes (one length byte, up to 75 bytes).
//! Anything larger fails with `ScriptTooLarge` instead of switching to
//! `OP_PUSHDATA1`, so a built script always has the shape its caller wrote.

use crate::opcodes::*;
use crate::script::Script;
use crate::ScriptError;

/// Standardness limit on a P2WSH witness script.
pub const MAX_WITNESS_SCRIPT_SIZE: usize = 3600;

/// One element of a script under construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptElement {
    /// A bare opcode. Push opcodes other than `OP_0` are rejected.
    Op(u8),
    /// Bytes to push with a single length-prefix byte.
    Push(Vec<u8>),
}

/// Serialize `elements` into a script.
///
/// # Arguments
/// * `elements` - Opcodes and pushes in script order.
///
/// # Returns
/// The script, or `ScriptTooLarge` / `InvalidOpcodeType` for the first
/// element that cannot be encoded.
pub fn build_script(elements: &[ScriptElement]) -> Result<Script, ScriptError> {
    elements
        .iter()
        .try_fold(ScriptBuilder::new(), |b, el| match el {
            ScriptElement::Op(op) => b.push_opcode(*op),
            ScriptElement::Push(data) => b.push_slice(data),
        })
        .map(ScriptBuilder::into_script)
}

/// Like `build_script`, but also enforces the witness-script size limit.
pub fn build_witness_script(elements: &[ScriptElement]) -> Result<Script, ScriptError> {
    let script = build_script(elements)?;
    if script.len() > MAX_WITNESS_SCRIPT_SIZE {
        return Err(ScriptError::ScriptTooLarge {
            size: script.len(),
            limit: MAX_WITNESS_SCRIPT_SIZE,
        });
    }
    Ok(script)
}

/// Incremental script builder.
#[derive(Clone, Debug, Default)]
pub struct ScriptBuilder {
    script: Script,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a non-push opcode (`OP_0` is allowed).
    pub fn push_opcode(mut self, op: u8) -> Result<Self, ScriptError> {
        self.script.append_opcodes(&[op])?;
        Ok(self)
    }

    /// Append a direct data push.
    pub fn push_slice(mut self, data: &[u8]) -> Result<Self, ScriptError> {
        self.script.append_push_data(data)?;
        Ok(self)
    }

    /// Append the opcode for a small integer 0..=16.
    pub fn push_small_int(self, n: u8) -> Result<Self, ScriptError> {
        let op = small_int_op(n).ok_or_else(|| {
            ScriptError::InvalidOpcodeType(format!("{} is not a small integer", n))
        })?;
        self.push_opcode(op)
    }

    pub fn into_script(self) -> Script {
        self.script
    }
}
