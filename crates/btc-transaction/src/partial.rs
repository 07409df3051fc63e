//! Partially signed P2WSH multisig spends.
//!
//! An unsigned transaction plus, for every input, the witness script and
//! value it spends. Co-signers contribute signatures independently, in any
//! order; `finalize` assembles the witnesses once each input has reached
//! its threshold and then re-checks the finished transaction. A spend
//! travels between co-signers as a `RawPartialSpend`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use btc_primitives::chainhash::Hash;
use btc_primitives::ec::{PrivateKey, PublicKey};
use btc_script::{MultisigScript, Script};

use crate::sighash::{SighashCache, SighashType};
use crate::signer;
use crate::template::p2wsh_multisig::build_witness;
use crate::transaction::Transaction;
use crate::witness::Witness;
use crate::TransactionError;

/// The witness script and value of the output an input spends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpentOutput {
    pub witness_script: Script,
    pub value: u64,
}

impl SpentOutput {
    pub fn new(witness_script: Script, value: u64) -> Self {
        SpentOutput { witness_script, value }
    }
}

/// A collected signature and the key it verifies under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    pub public_key: PublicKey,
    /// DER signature plus sighash byte, hex.
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPendingInput {
    pub witness_script: Script,
    pub value: u64,
    #[serde(default)]
    pub signatures: Vec<RawSignature>,
}

/// Wire form of a `PartiallySignedSpend`.
///
/// Carries no digests; the importing side derives them again from the
/// transaction, witness scripts and values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPartialSpend {
    /// Unsigned transaction, hex.
    pub transaction: String,
    pub sighash_type: SighashType,
    pub inputs: Vec<RawPendingInput>,
}

#[derive(Clone, Debug)]
struct PendingInput {
    multisig: MultisigScript,
    spent: SpentOutput,
    sighash: [u8; 32],
    /// DER+type signatures keyed by public key position.
    signatures: BTreeMap<usize, Vec<u8>>,
}

/// An unsigned transaction collecting multisig signatures.
#[derive(Clone, Debug)]
pub struct PartiallySignedSpend {
    transaction: Transaction,
    sighash_type: SighashType,
    inputs: Vec<PendingInput>,
}

impl PartiallySignedSpend {
    /// Wrap `transaction`, one `SpentOutput` per input in input order.
    ///
    /// Each witness script must be a multisig script. Digests are computed
    /// here once, so the transaction must not change afterwards.
    pub fn new(
        transaction: Transaction,
        spent: Vec<SpentOutput>,
        sighash_type: SighashType,
    ) -> Result<Self, TransactionError> {
        if spent.len() != transaction.inputs.len() {
            return Err(TransactionError::InvalidRequest(format!(
                "{} spent outputs for {} inputs",
                spent.len(),
                transaction.inputs.len()
            )));
        }

        let inputs = {
            let cache = SighashCache::new(&transaction);
            spent
                .into_iter()
                .enumerate()
                .map(|(i, spent)| -> Result<PendingInput, TransactionError> {
                    let multisig = MultisigScript::from_script(&spent.witness_script)?;
                    let sighash =
                        cache.signature_hash(i, &spent.witness_script, spent.value, sighash_type)?;
                    Ok(PendingInput {
                        multisig,
                        spent,
                        sighash,
                        signatures: BTreeMap::new(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(PartiallySignedSpend {
            transaction,
            sighash_type,
            inputs,
        })
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn sighash_type(&self) -> SighashType {
        self.sighash_type
    }

    /// Digest each co-signer signs for `input_index`.
    pub fn sighash(&self, input_index: usize) -> Result<[u8; 32], TransactionError> {
        Ok(self.input(input_index)?.sighash)
    }

    /// All input digests, in input order.
    pub fn sighashes(&self) -> Vec<Hash> {
        self.inputs.iter().map(|i| Hash::new(i.sighash)).collect()
    }

    pub fn witness_script(&self, input_index: usize) -> Result<&Script, TransactionError> {
        Ok(&self.input(input_index)?.spent.witness_script)
    }

    pub fn signature_count(&self, input_index: usize) -> Result<usize, TransactionError> {
        Ok(self.input(input_index)?.signatures.len())
    }

    /// True once every input has at least its threshold of signatures.
    pub fn is_complete(&self) -> bool {
        self.inputs
            .iter()
            .all(|i| i.signatures.len() >= i.multisig.threshold())
    }

    /// Sign every input whose witness script contains `key`.
    ///
    /// Returns the number of signatures added. Inputs already holding a
    /// signature from this key are left alone.
    pub fn sign_with(&mut self, key: &PrivateKey) -> Result<usize, TransactionError> {
        let pub_key = key.pub_key();
        let mut known = false;
        let mut added = 0;
        for input in self.inputs.iter_mut() {
            let Some(position) = input.multisig.position_of(&pub_key) else {
                continue;
            };
            known = true;
            if input.signatures.contains_key(&position) {
                continue;
            }
            let sig = signer::sign(key, &input.sighash, self.sighash_type)?;
            input.signatures.insert(position, sig);
            added += 1;
        }
        if !known {
            return Err(TransactionError::UnknownSigningKey(pub_key.to_hex()));
        }
        Ok(added)
    }

    /// Add a signature produced elsewhere.
    ///
    /// The signature must carry this spend's sighash type and verify
    /// against the input's digest under `public_key`, which must appear in
    /// the input's witness script. A later signature for the same key
    /// replaces the earlier one.
    pub fn add_signature(
        &mut self,
        input_index: usize,
        public_key: &PublicKey,
        signature: Vec<u8>,
    ) -> Result<(), TransactionError> {
        let expected_type = self.sighash_type;
        let count = self.inputs.len();
        let input = self
            .inputs
            .get_mut(input_index)
            .ok_or(TransactionError::InputIndexOutOfRange { index: input_index, count })?;

        let position = input
            .multisig
            .position_of(public_key)
            .ok_or_else(|| TransactionError::UnknownSigningKey(public_key.to_hex()))?;

        let (sig, sighash_type) = signer::parse_signature(&signature)?;
        if sighash_type != expected_type {
            warn!(input = input_index, key = %public_key, ?sighash_type, "rejected signature with wrong sighash type");
            return Err(TransactionError::InvalidSignature {
                input: input_index,
                reason: format!("sighash type {:?}, expected {:?}", sighash_type, expected_type),
            });
        }
        if !public_key.verify(&input.sighash, &sig) {
            warn!(input = input_index, key = %public_key, "rejected signature that does not verify");
            return Err(TransactionError::InvalidSignature {
                input: input_index,
                reason: "signature does not verify".to_string(),
            });
        }

        input.signatures.insert(position, signature);
        Ok(())
    }

    /// Attach witnesses and return the signed transaction.
    ///
    /// Each input takes its first M signatures in public key order. Fails
    /// with `InsufficientSignatures` when an input has fewer than M. The
    /// finished transaction is re-hashed and every signature re-verified.
    pub fn finalize(self) -> Result<Transaction, TransactionError> {
        let witnesses = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let required = input.multisig.threshold();
                if input.signatures.len() < required {
                    return Err(TransactionError::InsufficientSignatures {
                        input: i,
                        required,
                        provided: input.signatures.len(),
                    });
                }
                let sigs = input.signatures.values().take(required).cloned();
                Ok(build_witness(&input.spent.witness_script, sigs))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.finalize_with(witnesses)
    }

    /// Attach one witness per input, produced elsewhere, and run the same
    /// checks as `finalize`.
    pub(crate) fn finalize_with(
        self,
        witnesses: Vec<Witness>,
    ) -> Result<Transaction, TransactionError> {
        if witnesses.len() != self.inputs.len() {
            return Err(TransactionError::InvalidRequest(format!(
                "{} witnesses for {} inputs",
                witnesses.len(),
                self.inputs.len()
            )));
        }
        let mut tx = self.transaction;
        for (i, witness) in witnesses.into_iter().enumerate() {
            tx.set_witness(i, witness)?;
        }

        let spent: Vec<SpentOutput> = self.inputs.iter().map(|i| i.spent.clone()).collect();
        let digests = verify_multisig_witnesses(&tx, &spent)?;
        for (i, (digest, input)) in digests.iter().zip(&self.inputs).enumerate() {
            if *digest != input.sighash {
                return Err(TransactionError::DigestMismatch { input: i });
            }
        }

        debug!(txid = %tx.txid(), inputs = tx.inputs.len(), "finalized multisig spend");
        Ok(tx)
    }

    /// Export form for handing the spend to another co-signer.
    pub fn to_raw(&self) -> RawPartialSpend {
        let inputs = self
            .inputs
            .iter()
            .map(|input| RawPendingInput {
                witness_script: input.spent.witness_script.clone(),
                value: input.spent.value,
                signatures: input
                    .signatures
                    .iter()
                    .map(|(&position, sig)| RawSignature {
                        public_key: input.multisig.public_keys()[position],
                        signature: hex::encode(sig),
                    })
                    .collect(),
            })
            .collect();
        RawPartialSpend {
            transaction: self.transaction.to_hex(),
            sighash_type: self.sighash_type,
            inputs,
        }
    }

    /// Rebuild a spend exported with `to_raw`.
    ///
    /// Digests are recomputed from the transaction and every carried
    /// signature goes through `add_signature`, so nothing in `raw` is
    /// trusted beyond what verifies.
    pub fn from_raw(raw: RawPartialSpend) -> Result<Self, TransactionError> {
        let transaction = Transaction::from_hex(&raw.transaction)?;
        if transaction.has_witness() {
            return Err(TransactionError::InvalidRequest(
                "partial spend transaction already carries witnesses".to_string(),
            ));
        }
        let spent = raw
            .inputs
            .iter()
            .map(|i| SpentOutput::new(i.witness_script.clone(), i.value))
            .collect();
        let mut spend = PartiallySignedSpend::new(transaction, spent, raw.sighash_type)?;

        for (i, input) in raw.inputs.into_iter().enumerate() {
            for sig in input.signatures {
                let bytes = hex::decode(&sig.signature).map_err(|e| {
                    TransactionError::InvalidSignature {
                        input: i,
                        reason: format!("invalid hex: {}", e),
                    }
                })?;
                spend.add_signature(i, &sig.public_key, bytes)?;
            }
        }
        debug!(
            inputs = spend.inputs.len(),
            complete = spend.is_complete(),
            "imported partial spend"
        );
        Ok(spend)
    }

    fn input(&self, input_index: usize) -> Result<&PendingInput, TransactionError> {
        self.inputs.get(input_index).ok_or(TransactionError::InputIndexOutOfRange {
            index: input_index,
            count: self.inputs.len(),
        })
    }
}

impl Serialize for PartiallySignedSpend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PartiallySignedSpend {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPartialSpend::deserialize(deserializer)?;
        PartiallySignedSpend::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

/// Check every input's witness the way `OP_CHECKMULTISIG` would.
///
/// Each witness must be `[<empty>, sig.., witness_script]` with the
/// expected script and exactly M signatures, and the signatures must verify
/// against the script's keys in order. Returns the digest each input's
/// signatures commit to.
pub fn verify_multisig_witnesses(
    tx: &Transaction,
    spent: &[SpentOutput],
) -> Result<Vec<[u8; 32]>, TransactionError> {
    if spent.len() != tx.inputs.len() {
        return Err(TransactionError::InvalidRequest(format!(
            "{} spent outputs for {} inputs",
            spent.len(),
            tx.inputs.len()
        )));
    }
    let cache = SighashCache::new(tx);
    let mut digests = Vec::with_capacity(spent.len());

    for (i, (input, spent)) in tx.inputs.iter().zip(spent).enumerate() {
        let invalid = |reason: &str| TransactionError::InvalidSignature {
            input: i,
            reason: reason.to_string(),
        };
        let multisig = MultisigScript::from_script(&spent.witness_script)?;
        let items = input.witness.items();
        if items.len() < 2 || !items[0].is_empty() {
            return Err(invalid("witness is not [<empty>, sigs.., script]"));
        }
        if input.witness.last() != Some(spent.witness_script.to_bytes()) {
            return Err(invalid("witness script does not match"));
        }
        let sigs = &items[1..items.len() - 1];
        if sigs.len() != multisig.threshold() {
            return Err(TransactionError::InsufficientSignatures {
                input: i,
                required: multisig.threshold(),
                provided: sigs.len(),
            });
        }

        let mut keys = multisig.public_keys().iter();
        let mut input_digest = None;
        for sig_bytes in sigs {
            let (sig, sighash_type) = signer::parse_signature(sig_bytes)?;
            let digest =
                cache.signature_hash(i, &spent.witness_script, spent.value, sighash_type)?;
            if !keys.any(|k| k.verify(&digest, &sig)) {
                return Err(invalid("signature does not match any remaining key"));
            }
            input_digest.get_or_insert(digest);
        }
        digests.push(input_digest.ok_or_else(|| invalid("no signatures"))?);
    }
    Ok(digests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TxInput;
    use crate::outpoint::OutPoint;
    use crate::output::TxOutput;
    use btc_primitives::hash::sha256;

    fn key(word: &str) -> PrivateKey {
        let phrase = format!("correct horse battery staple {}", word);
        PrivateKey::from_bytes(&sha256(phrase.as_bytes())).unwrap()
    }

    fn witness_script(m: usize, words: &[&str]) -> Script {
        MultisigScript::new(m, words.iter().map(|w| key(w).pub_key()).collect())
            .unwrap()
            .to_script()
            .unwrap()
    }

    fn spend(m: usize, words: &[&str]) -> PartiallySignedSpend {
        let mut tx = Transaction::new();
        let txid =
            Hash::from_hex("49ff22c9985c1991791b7a3bd6a2e8d1d6567ca283e0885afdc83bd92f56d1c4").unwrap();
        tx.add_input(TxInput::new(OutPoint::new(txid, 0)));
        tx.add_output(TxOutput::new(
            99_000_000,
            Script::from_hex("00147829e2df6fd013aa5303d4e0af578d4275629bd3").unwrap(),
        ));
        let spent = vec![SpentOutput::new(witness_script(m, words), 100_000_000)];
        PartiallySignedSpend::new(tx, spent, SighashType::All).unwrap()
    }

    #[test]
    fn test_sighash_precomputed() {
        let psbt = spend(2, &["first", "second"]);
        assert_eq!(
            hex::encode(psbt.sighash(0).unwrap()),
            "62c703bf936d9c70f11d41046ec0a72060235c95b648ab3abdf520d58e6ede83"
        );
        assert_eq!(psbt.sighashes().len(), 1);
    }

    #[test]
    fn test_cosigners_in_any_order() {
        let mut a = spend(2, &["first", "second"]);
        a.sign_with(&key("first")).unwrap();
        a.sign_with(&key("second")).unwrap();

        let mut b = spend(2, &["first", "second"]);
        b.sign_with(&key("second")).unwrap();
        assert!(!b.is_complete());
        b.sign_with(&key("first")).unwrap();
        assert!(b.is_complete());

        assert_eq!(a.finalize().unwrap().to_hex(), b.finalize().unwrap().to_hex());
    }

    #[test]
    fn test_sign_with_twice_adds_nothing() {
        let mut p = spend(2, &["first", "second"]);
        assert_eq!(p.sign_with(&key("first")).unwrap(), 1);
        assert_eq!(p.sign_with(&key("first")).unwrap(), 0);
        assert_eq!(p.signature_count(0).unwrap(), 1);
    }

    #[test]
    fn test_finalize_insufficient() {
        let mut p = spend(2, &["first", "second"]);
        p.sign_with(&key("first")).unwrap();
        assert!(matches!(
            p.finalize(),
            Err(TransactionError::InsufficientSignatures { input: 0, required: 2, provided: 1 })
        ));
    }

    #[test]
    fn test_finalize_takes_first_m_by_position() {
        let mut p = spend(2, &["first", "second", "third"]);
        p.sign_with(&key("third")).unwrap();
        p.sign_with(&key("first")).unwrap();
        p.sign_with(&key("second")).unwrap();
        let tx = p.finalize().unwrap();
        let items = tx.inputs[0].witness.items();
        assert_eq!(items.len(), 4);

        let digest: [u8; 32] = {
            let q = spend(2, &["first", "second", "third"]);
            q.sighash(0).unwrap()
        };
        let expected_first = signer::sign(&key("first"), &digest, SighashType::All).unwrap();
        let expected_second = signer::sign(&key("second"), &digest, SighashType::All).unwrap();
        assert_eq!(items[1], expected_first);
        assert_eq!(items[2], expected_second);
    }

    #[test]
    fn test_finalize_detects_digest_mismatch() {
        let mut p = spend(2, &["first", "second"]);
        p.sign_with(&key("first")).unwrap();
        p.sign_with(&key("second")).unwrap();
        p.inputs[0].sighash[0] ^= 1;
        assert!(matches!(p.finalize(), Err(TransactionError::DigestMismatch { input: 0 })));
    }

    #[test]
    fn test_raw_export_import() {
        let mut a = spend(2, &["first", "second"]);
        a.sign_with(&key("first")).unwrap();
        let raw = a.to_raw();
        assert_eq!(raw.inputs.len(), 1);
        assert_eq!(raw.inputs[0].signatures.len(), 1);
        assert_eq!(raw.inputs[0].signatures[0].public_key, key("first").pub_key());
        assert_eq!(raw.inputs[0].value, 100_000_000);

        let json = serde_json::to_string(&a).unwrap();
        let mut b: PartiallySignedSpend = serde_json::from_str(&json).unwrap();
        assert_eq!(b.to_raw(), raw);
        assert_eq!(b.sighashes(), a.sighashes());
        assert_eq!(b.signature_count(0).unwrap(), 1);
        assert!(!b.is_complete());

        b.sign_with(&key("second")).unwrap();
        a.sign_with(&key("second")).unwrap();
        assert_eq!(b.finalize().unwrap().to_hex(), a.finalize().unwrap().to_hex());
    }

    #[test]
    fn test_import_reverifies_signatures() {
        let mut p = spend(2, &["first", "second"]);
        p.sign_with(&key("first")).unwrap();

        // value changed in transit: the carried signature no longer verifies
        let mut raw = p.to_raw();
        raw.inputs[0].value = 100_000_001;
        assert!(matches!(
            PartiallySignedSpend::from_raw(raw),
            Err(TransactionError::InvalidSignature { input: 0, .. })
        ));

        let mut raw = p.to_raw();
        raw.inputs[0].signatures[0].public_key = key("second").pub_key();
        assert!(matches!(
            PartiallySignedSpend::from_raw(raw),
            Err(TransactionError::InvalidSignature { input: 0, .. })
        ));

        let mut raw = p.to_raw();
        raw.inputs[0].signatures[0].signature = "zz".to_string();
        assert!(PartiallySignedSpend::from_raw(raw).is_err());

        let mut raw = p.to_raw();
        raw.inputs.clear();
        assert!(matches!(
            PartiallySignedSpend::from_raw(raw),
            Err(TransactionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_import_rejects_signed_transaction() {
        let mut p = spend(2, &["first", "second"]);
        p.sign_with(&key("first")).unwrap();
        p.sign_with(&key("second")).unwrap();
        let mut raw = p.to_raw();
        raw.transaction = p.clone().finalize().unwrap().to_hex();
        assert!(matches!(
            PartiallySignedSpend::from_raw(raw),
            Err(TransactionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_add_external_signature() {
        let mut p = spend(2, &["first", "second"]);
        let digest = p.sighash(0).unwrap();
        let sig = signer::sign(&key("second"), &digest, SighashType::All).unwrap();
        p.add_signature(0, &key("second").pub_key(), sig).unwrap();
        p.sign_with(&key("first")).unwrap();
        assert!(p.finalize().is_ok());
    }

    #[test]
    fn test_add_signature_rejections() {
        let mut p = spend(2, &["first", "second"]);
        let digest = p.sighash(0).unwrap();

        // signed by one key, claimed for the other
        let sig = signer::sign(&key("first"), &digest, SighashType::All).unwrap();
        assert!(matches!(
            p.add_signature(0, &key("second").pub_key(), sig),
            Err(TransactionError::InvalidSignature { input: 0, .. })
        ));

        let wrong_type = signer::sign(&key("first"), &digest, SighashType::None).unwrap();
        assert!(matches!(
            p.add_signature(0, &key("first").pub_key(), wrong_type),
            Err(TransactionError::InvalidSignature { .. })
        ));

        let stranger = key("stranger");
        let sig = signer::sign(&stranger, &digest, SighashType::All).unwrap();
        assert!(matches!(
            p.add_signature(0, &stranger.pub_key(), sig),
            Err(TransactionError::UnknownSigningKey(_))
        ));

        let sig = signer::sign(&key("first"), &digest, SighashType::All).unwrap();
        assert!(matches!(
            p.add_signature(3, &key("first").pub_key(), sig),
            Err(TransactionError::InputIndexOutOfRange { index: 3, count: 1 })
        ));
        assert_eq!(p.signature_count(0).unwrap(), 0);
    }

    #[test]
    fn test_sign_with_unknown_key() {
        let mut p = spend(2, &["first", "second"]);
        assert!(matches!(
            p.sign_with(&key("stranger")),
            Err(TransactionError::UnknownSigningKey(_))
        ));
    }

    #[test]
    fn test_non_multisig_witness_script() {
        let mut tx = Transaction::new();
        tx.add_input(TxInput::new(OutPoint::new(Hash::ZERO, 0)));
        let spent = vec![SpentOutput::new(Script::from_hex("51").unwrap(), 1)];
        assert!(matches!(
            PartiallySignedSpend::new(tx, spent, SighashType::All),
            Err(TransactionError::Script(_))
        ));
    }

    #[test]
    fn test_spent_count_mismatch() {
        let tx = Transaction::new();
        let spent = vec![SpentOutput::new(witness_script(1, &["first"]), 1)];
        assert!(matches!(
            PartiallySignedSpend::new(tx, spent, SighashType::All),
            Err(TransactionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_verify_rejects_swapped_signatures() {
        let mut p = spend(2, &["first", "second"]);
        p.sign_with(&key("first")).unwrap();
        p.sign_with(&key("second")).unwrap();
        let spent = vec![SpentOutput::new(p.witness_script(0).unwrap().clone(), 100_000_000)];
        let mut tx = p.finalize().unwrap();

        let mut items = tx.inputs[0].witness.items().to_vec();
        items.swap(1, 2);
        tx.set_witness(0, items).unwrap();
        assert!(matches!(
            verify_multisig_witnesses(&tx, &spent),
            Err(TransactionError::InvalidSignature { input: 0, .. })
        ));
    }

    #[test]
    fn test_verify_detects_wrong_value() {
        let mut p = spend(2, &["first", "second"]);
        p.sign_with(&key("first")).unwrap();
        p.sign_with(&key("second")).unwrap();
        let ws = p.witness_script(0).unwrap().clone();
        let tx = p.finalize().unwrap();
        assert!(verify_multisig_witnesses(&tx, &[SpentOutput::new(ws.clone(), 100_000_000)]).is_ok());
        assert!(verify_multisig_witnesses(&tx, &[SpentOutput::new(ws, 100_000_001)]).is_err());
    }
}
