//! Pay-to-Witness-Script-Hash M-of-N multisig template.
//!
//! Locks to `OP_0 <sha256(witness_script)>` and unlocks with the witness
//! stack `[<empty>, <sig_1> .. <sig_m>, <witness_script>]`. The empty item
//! feeds the extra element `OP_CHECKMULTISIG` pops; the signatures must
//! follow the order of their public keys in the script.

use std::collections::BTreeMap;

use btc_primitives::ec::PrivateKey;
use btc_primitives::util::VarInt;
use btc_script::{MultisigScript, Script};

use crate::sighash::{SighashCache, SighashType};
use crate::signer;
use crate::template::WitnessTemplate;
use crate::witness::Witness;
use crate::TransactionError;

/// Largest DER signature plus its sighash byte.
const MAX_SIG_WITH_TYPE: usize = 73;

/// Create the P2WSH scriptPubKey for a multisig script.
pub fn lock(multisig: &MultisigScript) -> Result<Script, TransactionError> {
    Ok(multisig.script_pubkey()?)
}

/// Create a P2WSH multisig signer for inputs worth `value`.
///
/// Every key must belong to the script; `UnknownSigningKey` otherwise.
/// The sighash type defaults to ALL.
pub fn unlock<'k>(
    multisig: MultisigScript,
    keys: &'k [PrivateKey],
    value: u64,
    sighash_type: Option<SighashType>,
) -> Result<P2wshMultisig<'k>, TransactionError> {
    let witness_script = multisig.to_script()?;
    let mut signers = BTreeMap::new();
    for key in keys {
        let pub_key = key.pub_key();
        let position = multisig
            .position_of(&pub_key)
            .ok_or_else(|| TransactionError::UnknownSigningKey(pub_key.to_hex()))?;
        signers.entry(position).or_insert(key);
    }
    Ok(P2wshMultisig {
        multisig,
        witness_script,
        signers,
        value,
        sighash_type: sighash_type.unwrap_or_default(),
    })
}

/// Assemble `[<empty>, sigs.., witness_script]`.
pub fn build_witness<I>(witness_script: &Script, signatures: I) -> Witness
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut witness = Witness::new();
    witness.push(Vec::new());
    for sig in signatures {
        witness.push(sig);
    }
    witness.push(witness_script.to_bytes());
    witness
}

/// P2WSH multisig signing template.
///
/// Holds the signing keys indexed by their position in the script, so
/// iteration order is CHECKMULTISIG order.
pub struct P2wshMultisig<'k> {
    multisig: MultisigScript,
    witness_script: Script,
    signers: BTreeMap<usize, &'k PrivateKey>,
    value: u64,
    sighash_type: SighashType,
}

impl<'k> P2wshMultisig<'k> {
    pub fn witness_script(&self) -> &Script {
        &self.witness_script
    }

    pub fn threshold(&self) -> usize {
        self.multisig.threshold()
    }

    /// Signatures over `digest` from the first M available keys, keyed by
    /// public key position.
    pub fn signatures(&self, digest: &[u8; 32]) -> Result<Vec<(usize, Vec<u8>)>, TransactionError> {
        self.signers
            .iter()
            .take(self.threshold())
            .map(|(&pos, key)| Ok((pos, signer::sign(key, digest, self.sighash_type)?)))
            .collect()
    }
}

impl WitnessTemplate for P2wshMultisig<'_> {
    fn sign(&self, cache: &SighashCache, input_index: usize) -> Result<Witness, TransactionError> {
        let digest =
            cache.signature_hash(input_index, &self.witness_script, self.value, self.sighash_type)?;
        let sigs = self.signatures(&digest)?;
        if sigs.len() < self.threshold() {
            return Err(TransactionError::InsufficientSignatures {
                input: input_index,
                required: self.threshold(),
                provided: sigs.len(),
            });
        }
        Ok(build_witness(
            &self.witness_script,
            sigs.into_iter().map(|(_, sig)| sig),
        ))
    }

    fn estimate_witness_size(&self) -> usize {
        let ws_len = self.witness_script.len();
        let items = self.threshold() + 2;
        VarInt::from(items).length()
            + 1
            + self.threshold() * (1 + MAX_SIG_WITH_TYPE)
            + VarInt::from(ws_len).length()
            + ws_len
    }
}
