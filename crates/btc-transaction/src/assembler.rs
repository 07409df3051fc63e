//! One-shot assembly of signed P2WSH multisig spends.
//!
//! Turns a declarative `SpendRequest` plus the signing keys into a fully
//! signed transaction. Each input is signed through its `WitnessTemplate`
//! and the witnesses go through `PartiallySignedSpend`'s finalize checks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use btc_primitives::chainhash::Hash;
use btc_primitives::ec::PrivateKey;
use btc_script::{Address, MultisigScript, Network, Script};

use crate::input::{TxInput, DEFAULT_SEQUENCE_NUMBER};
use crate::outpoint::OutPoint;
use crate::output::TxOutput;
use crate::partial::{PartiallySignedSpend, SpentOutput};
use crate::sighash::{SighashCache, SighashType};
use crate::template::p2wsh_multisig;
use crate::template::WitnessTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// A UTXO locked to a P2WSH multisig script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub outpoint: OutPoint,
    /// Value of the output being spent, in satoshis.
    pub value: u64,
    pub witness_script: Script,
    /// Overrides `AssemblerOptions::sequence` for this input.
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// Where an output pays to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Any P2WSH, P2WPKH or P2PKH address on the request's network.
    Address(String),
    /// A raw scriptPubKey, used as given.
    Script(Script),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub value: u64,
    pub destination: Destination,
}

/// Transaction-level settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerOptions {
    pub version: u32,
    pub lock_time: u32,
    /// Sequence for inputs that do not set their own.
    pub sequence: u32,
    pub sighash_type: SighashType,
    /// Sign inputs on scoped worker threads.
    pub parallel: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        AssemblerOptions {
            version: 1,
            lock_time: 0,
            sequence: DEFAULT_SEQUENCE_NUMBER,
            sighash_type: SighashType::All,
            parallel: false,
        }
    }
}

/// Everything needed to build a spend except the private keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    pub network: Network,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub options: AssemblerOptions,
}

/// A signed transaction with the data callers usually want alongside it.
#[derive(Clone, Debug)]
pub struct AssembledTransaction {
    pub transaction: Transaction,
    /// P2WSH address of the first input's witness script.
    pub address: String,
    /// Digest signed for each input, in input order.
    pub sighashes: Vec<Hash>,
}

impl AssembledTransaction {
    pub fn to_hex(&self) -> String {
        self.transaction.to_hex()
    }

    pub fn txid(&self) -> Hash {
        self.transaction.txid()
    }
}

impl SpendRequest {
    /// Build the unsigned transaction described by this request.
    pub fn unsigned_transaction(&self) -> Result<Transaction, TransactionError> {
        if self.inputs.is_empty() {
            return Err(TransactionError::InvalidRequest("no inputs".to_string()));
        }
        if self.outputs.is_empty() {
            return Err(TransactionError::InvalidRequest("no outputs".to_string()));
        }

        let mut tx = Transaction::new();
        tx.version = self.options.version;
        tx.lock_time = self.options.lock_time;

        for input in &self.inputs {
            let sequence = input.sequence.unwrap_or(self.options.sequence);
            tx.add_input(TxInput::new(input.outpoint).with_sequence(sequence));
        }
        for output in &self.outputs {
            let script_pubkey = match &output.destination {
                Destination::Address(addr) => {
                    Address::from_string_checked(addr, self.network)?.script_pubkey()
                }
                Destination::Script(script) => script.clone(),
            };
            tx.add_output(TxOutput::new(output.value, script_pubkey));
        }
        Ok(tx)
    }

    /// An unsigned spend ready for co-signers.
    pub fn partially_signed(&self) -> Result<PartiallySignedSpend, TransactionError> {
        let spent = self
            .inputs
            .iter()
            .map(|i| SpentOutput::new(i.witness_script.clone(), i.value))
            .collect();
        PartiallySignedSpend::new(self.unsigned_transaction()?, spent, self.options.sighash_type)
    }

    /// Virtual size of the signed spend, known before signing.
    ///
    /// Witnesses are sized for maximum-length signatures, so this is an
    /// upper bound suitable for fee estimation.
    pub fn estimated_vsize(&self) -> Result<usize, TransactionError> {
        let base = self.unsigned_transaction()?.base_size();
        // marker and flag
        let mut witness_size = 2;
        for input in &self.inputs {
            let multisig = MultisigScript::from_script(&input.witness_script)?;
            let template =
                p2wsh_multisig::unlock(multisig, &[], input.value, Some(self.options.sighash_type))?;
            witness_size += template.estimate_witness_size();
        }
        Ok((base * 4 + witness_size).div_ceil(4))
    }
}

/// Build and sign the spend described by `request`.
///
/// Each key signs every input whose witness script lists it; a key listed
/// in none of them is rejected with `UnknownSigningKey`. Inputs that end up
/// with fewer than M signatures fail with `InsufficientSignatures`.
pub fn assemble(
    request: &SpendRequest,
    keys: &[PrivateKey],
) -> Result<AssembledTransaction, TransactionError> {
    let spend = request.partially_signed()?;

    let scripts = request
        .inputs
        .iter()
        .map(|i| MultisigScript::from_script(&i.witness_script))
        .collect::<Result<Vec<_>, _>>()?;
    for key in keys {
        let pub_key = key.pub_key();
        if !scripts.iter().any(|s| s.position_of(&pub_key).is_some()) {
            return Err(TransactionError::UnknownSigningKey(pub_key.to_hex()));
        }
    }

    // keys grouped per input; templates borrow from these
    let usable: Vec<Vec<PrivateKey>> = scripts
        .iter()
        .map(|s| {
            keys.iter()
                .filter(|k| s.position_of(&k.pub_key()).is_some())
                .cloned()
                .collect()
        })
        .collect();
    let templates = scripts
        .into_iter()
        .zip(&usable)
        .zip(&request.inputs)
        .map(|((multisig, keys), input)| {
            p2wsh_multisig::unlock(multisig, keys, input.value, Some(request.options.sighash_type))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let witnesses = {
        let cache = SighashCache::new(spend.transaction());
        if request.options.parallel && templates.len() > 1 {
            let cache = &cache;
            std::thread::scope(|s| {
                let workers: Vec<_> = templates
                    .iter()
                    .enumerate()
                    .map(|(i, template)| s.spawn(move || template.sign(cache, i)))
                    .collect();
                workers
                    .into_iter()
                    .map(|w| {
                        w.join().unwrap_or_else(|_| {
                            Err(TransactionError::InvalidRequest("signing worker panicked".to_string()))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            templates
                .iter()
                .enumerate()
                .map(|(i, template)| template.sign(&cache, i))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    debug!(inputs = witnesses.len(), parallel = request.options.parallel, "signed inputs");

    let sighashes = spend.sighashes();
    let transaction = spend.finalize_with(witnesses)?;
    let address = Address::p2wsh(&request.inputs[0].witness_script, request.network).to_string();

    debug!(txid = %transaction.txid(), vsize = transaction.vsize(), %address, "assembled transaction");
    Ok(AssembledTransaction {
        transaction,
        address,
        sighashes,
    })
}
