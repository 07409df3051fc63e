/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Covers the output forms a P2WSH multisig spend deals with (P2WSH, P2WPKH,
/// P2PKH) and the witness scripts committed to by P2WSH outputs.

use std::fmt;

use btc_primitives::hash::sha256;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A script, as its serialized bytes.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Parse an ASM string such as `OP_2 <hex> <hex> OP_2 OP_CHECKMULTISIG`.
    ///
    /// Tokens that name an opcode are emitted as that opcode; everything else
    /// must be hex and is pushed as data.
    ///
    /// # Arguments
    /// * `asm` - Whitespace-separated ASM tokens.
    ///
    /// # Returns
    /// The script, or `InvalidAsmToken` / `ScriptTooLarge` for a bad token.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            if let Some(opcode) = string_to_opcode(token) {
                script.0.push(opcode);
            } else {
                let data = hex::decode(token)
                    .map_err(|_| ScriptError::InvalidAsmToken(token.to_string()))?;
                script.append_push_data(&data)?;
            }
        }
        Ok(script)
    }

    /// P2WSH output script: `OP_0 <sha256(witness_script)>`.
    pub fn p2wsh(witness_script: &Script) -> Self {
        Self::witness_v0(&sha256(witness_script.to_bytes()))
    }

    /// P2WPKH output script: `OP_0 <hash160(pubkey)>`.
    pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        Self::witness_v0(pubkey_hash)
    }

    /// P2PKH output script: `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut b = Vec::with_capacity(25);
        b.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        b.extend_from_slice(pubkey_hash);
        b.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(b)
    }

    fn witness_v0(program: &[u8]) -> Self {
        let mut b = Vec::with_capacity(2 + program.len());
        b.push(OP_0);
        b.push(program.len() as u8);
        b.extend_from_slice(program);
        Script(b)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Render as ASM. Returns an empty string if the script does not parse.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(ScriptChunk::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// The serialized script bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse into chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// `OP_0 <20 bytes>`
    pub fn is_p2wpkh(&self) -> bool {
        self.0.len() == 22 && self.0[0] == OP_0 && self.0[1] == OP_DATA_20
    }

    /// `OP_0 <32 bytes>`
    pub fn is_p2wsh(&self) -> bool {
        self.0.len() == 34 && self.0[0] == OP_0 && self.0[1] == OP_DATA_32
    }

    /// Witness version and program, for any BIP141 witness output.
    ///
    /// A witness output is a version opcode (`OP_0` or `OP_1`..`OP_16`)
    /// followed by a single direct push of 2 to 40 bytes.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let b = &self.0;
        if b.len() < 4 || b.len() > 42 {
            return None;
        }
        let version = match b[0] {
            OP_0 => 0,
            op @ OP_1..=OP_16 => op - OP_1 + 1,
            _ => return None,
        };
        let len = b[1] as usize;
        if len + 2 != b.len() {
            return None;
        }
        Some((version, &b[2..]))
    }

    /// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG` with consistent counts.
    pub fn is_multisig(&self) -> bool {
        crate::multisig::MultisigScript::from_script(self).is_ok()
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// The 20-byte key hash of a P2PKH or P2WPKH script.
    pub fn public_key_hash(&self) -> Option<[u8; 20]> {
        let hash = if self.is_p2pkh() {
            &self.0[3..23]
        } else if self.is_p2wpkh() {
            &self.0[2..22]
        } else {
            return None;
        };
        hash.try_into().ok()
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Append a direct push of `data`.
    ///
    /// # Returns
    /// `ScriptTooLarge` for pushes above 75 bytes; nothing is appended then.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.push(prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append non-push opcodes.
    ///
    /// Rejects `OP_DATA_1`..`OP_PUSHDATA4`, which need a payload.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op)) {
            return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
