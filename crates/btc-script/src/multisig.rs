//! M-of-N `OP_CHECKMULTISIG` witness scripts.

use btc_primitives::ec::PublicKey;
use btc_primitives::ec::public_key::COMPRESSED_LEN;

use crate::builder::{build_witness_script, ScriptElement};
use crate::opcodes::*;
use crate::script::Script;
use crate::ScriptError;

/// Most keys a bare `OP_CHECKMULTISIG` script encodes with small-int opcodes.
pub const MAX_MULTISIG_KEYS: usize = 16;

/// A parsed or to-be-built `OP_m <pk1> .. <pkn> OP_n OP_CHECKMULTISIG` script.
///
/// Key order is significant: CHECKMULTISIG matches signatures against keys
/// front to back, so signatures must be supplied in this same order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigScript {
    threshold: usize,
    public_keys: Vec<PublicKey>,
}

impl MultisigScript {
    /// Validate `1 <= threshold <= keys.len() <= 16` and keep the key order.
    pub fn new(threshold: usize, public_keys: Vec<PublicKey>) -> Result<Self, ScriptError> {
        let n = public_keys.len();
        if n == 0 || n > MAX_MULTISIG_KEYS {
            return Err(ScriptError::InvalidMultisig(format!(
                "key count {} outside 1..={}",
                n, MAX_MULTISIG_KEYS
            )));
        }
        if threshold == 0 || threshold > n {
            return Err(ScriptError::InvalidMultisig(format!(
                "threshold {} outside 1..={}",
                threshold, n
            )));
        }
        Ok(MultisigScript { threshold, public_keys })
    }

    /// Parse a witness script.
    ///
    /// Only compressed keys are accepted, matching what segwit policy allows.
    pub fn from_script(script: &Script) -> Result<Self, ScriptError> {
        let chunks = script.chunks()?;
        if chunks.len() < 4 {
            return Err(ScriptError::InvalidMultisig("too few elements".to_string()));
        }
        let last = chunks.len() - 1;
        if chunks[last].op != OP_CHECKMULTISIG {
            return Err(ScriptError::InvalidMultisig("missing OP_CHECKMULTISIG".to_string()));
        }
        let m = small_int_value(chunks[0].op)
            .ok_or_else(|| ScriptError::InvalidMultisig("threshold is not a small int".to_string()))?;
        let n = small_int_value(chunks[last - 1].op)
            .ok_or_else(|| ScriptError::InvalidMultisig("key count is not a small int".to_string()))?;

        let key_chunks = &chunks[1..last - 1];
        if key_chunks.len() != n as usize {
            return Err(ScriptError::InvalidMultisig(format!(
                "declares {} keys, has {}",
                n,
                key_chunks.len()
            )));
        }

        let public_keys = key_chunks
            .iter()
            .map(|c| match &c.data {
                Some(d) if d.len() == COMPRESSED_LEN => PublicKey::from_bytes(d).map_err(ScriptError::from),
                _ => Err(ScriptError::InvalidMultisig(
                    "expected a 33-byte compressed key push".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let parsed = Self::new(m as usize, public_keys)?;
        // Reject non-canonical encodings of the same policy.
        if parsed.to_script()? != *script {
            return Err(ScriptError::InvalidMultisig("non-canonical encoding".to_string()));
        }
        Ok(parsed)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn public_keys(&self) -> &[PublicKey] {
        &self.public_keys
    }

    /// Index of `key` in script order.
    pub fn position_of(&self, key: &PublicKey) -> Option<usize> {
        self.public_keys.iter().position(|k| k == key)
    }

    /// Serialize as a witness script.
    pub fn to_script(&self) -> Result<Script, ScriptError> {
        let mut elements = Vec::with_capacity(self.public_keys.len() + 3);
        elements.push(ScriptElement::Op(small_int(self.threshold)?));
        elements.extend(
            self.public_keys
                .iter()
                .map(|k| ScriptElement::Push(k.to_compressed().to_vec())),
        );
        elements.push(ScriptElement::Op(small_int(self.public_keys.len())?));
        elements.push(ScriptElement::Op(OP_CHECKMULTISIG));
        build_witness_script(&elements)
    }

    /// The P2WSH output script committing to this witness script.
    pub fn script_pubkey(&self) -> Result<Script, ScriptError> {
        Ok(Script::p2wsh(&self.to_script()?))
    }
}

fn small_int(n: usize) -> Result<u8, ScriptError> {
    u8::try_from(n)
        .ok()
        .and_then(small_int_op)
        .ok_or_else(|| ScriptError::InvalidMultisig(format!("{} does not fit a small int", n)))
}
