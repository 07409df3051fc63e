//! End-to-end P2WSH multisig flows through the SDK facade.

use btc_sdk::primitives::hash::sha256;
use btc_sdk::script::opcodes::{OP_1, OP_2, OP_CHECKMULTISIG};
use btc_sdk::script::{build_script, ScriptElement};
use btc_sdk::transaction::signer;
use btc_sdk::{
    assemble, Address, AssemblerOptions, Destination, ErrorStage, InputSpec, KeyPair, MultisigScript,
    Network, OutPoint, OutputSpec, PartiallySignedSpend, PrivateKey, PublicKey, RawPartialSpend,
    Script, ScriptError, SighashType, SpendRequest, Transaction, TransactionError,
};

const FUNDING_OUTPOINT: &str =
    "49ff22c9985c1991791b7a3bd6a2e8d1d6567ca283e0885afdc83bd92f56d1c4:0";

const REGTEST_MULTISIG_ADDRESS: &str =
    "bcrt1qljlyqaexx4mmhpl66e6nqdtagjaht87pghuq6p0f98a765c9uj9s3f3ee3";

/// Spend paying 99000000 sat to `mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK`.
const P2PKH_SPEND_HEX: &str = "01000000000101c4d1562fd93bc8fd5a88e083a27c56d6d1e8a2d63b7a1b7991195c98c922ff490000000000ffffffff01c09ee605000000001976a9143466223e25276af3fae4d3ba3706f08228147dc388ac040047304402200967fb284136b73fae22659f4a5be3af0403a22d590f91098dc1ec47554808dd02207b4accf25575efefbdcca3c3c465cb10978854c41cff26e3ff32839fe78ae21f0147304402207563e4d891797b4a5c0deaec60f154d200fd75ed4ef0f9f463517e7a14452172022064c3acda0fb368d90c9aa766527abe90273d2734af538f56e72fb34d81361ed801475221038d19497c3922b807c91b829d6873ae5bfa2ae500f3237100265a302fdce87b052103d3a9dff5a0bb0267f19a9ee1c374901c39045fbe041c1c168d4da4ce0112595552ae00000000";

/// Spend paying the same amount to a regtest P2WPKH address.
const P2WPKH_SPEND_HEX: &str = "01000000000101c4d1562fd93bc8fd5a88e083a27c56d6d1e8a2d63b7a1b7991195c98c922ff490000000000ffffffff01c09ee605000000001600147829e2df6fd013aa5303d4e0af578d4275629bd304004830450221009c257c16883da168f826631a2cf81f0327492f31b637bfefa4409ad8d4b2981f022038a266e418fbd3e95bea18524aa86890270c586461b114b87aff1608e4aad9e401473044022037f823cf1d407ab368af0537e01dbac8e05f8ab2908c741a12e092952b2ca02702203e7c862174ecdb16245bbf9fecb284ef81f8bb8098a3fc1444d6c76a3ece5dbf01475221038d19497c3922b807c91b829d6873ae5bfa2ae500f3237100265a302fdce87b052103d3a9dff5a0bb0267f19a9ee1c374901c39045fbe041c1c168d4da4ce0112595552ae00000000";

fn key(word: &str) -> PrivateKey {
    let phrase = format!("correct horse battery staple {}", word);
    PrivateKey::from_bytes(&sha256(phrase.as_bytes())).unwrap()
}

fn keys() -> [PrivateKey; 2] {
    [key("first"), key("second")]
}

fn pubkey(hex_str: &str) -> PublicKey {
    PublicKey::from_hex(hex_str).unwrap()
}

fn witness_script() -> Script {
    let pks = keys().iter().map(|k| k.pub_key()).collect();
    MultisigScript::new(2, pks).unwrap().to_script().unwrap()
}

fn request(destination: &str) -> SpendRequest {
    SpendRequest {
        network: Network::Regtest,
        inputs: vec![InputSpec {
            outpoint: FUNDING_OUTPOINT.parse::<OutPoint>().unwrap(),
            value: 100_000_000,
            witness_script: witness_script(),
            sequence: None,
        }],
        outputs: vec![OutputSpec {
            value: 99_000_000,
            destination: Destination::Address(destination.to_string()),
        }],
        options: AssemblerOptions::default(),
    }
}

// -----------------------------------------------------------------------
// Script and address
// -----------------------------------------------------------------------

#[test]
fn multisig_address_on_regtest() {
    let ws = witness_script();
    assert_eq!(
        Address::p2wsh(&ws, Network::Regtest).to_string(),
        REGTEST_MULTISIG_ADDRESS
    );
    assert_eq!(
        btc_sdk::script::script_pubkey_to_address(&Script::p2wsh(&ws), Network::Regtest).unwrap(),
        REGTEST_MULTISIG_ADDRESS
    );
}

/// The builder gives the same script as the multisig helper, and a
/// different key set gives a different address.
#[test]
fn built_script_matches_multisig_helper() {
    let k1 = pubkey("0301abde8810babb194564c49f690a54cbe3be595838e1668950118bc2e0cc655a");
    let k2 = pubkey("023134778661a1cbb8ca508734f728ca12c1a9d4e379b58ff3e491f69ceb2eb824");
    let built = build_script(&[
        ScriptElement::Op(OP_2),
        ScriptElement::Push(k1.to_compressed().to_vec()),
        ScriptElement::Push(k2.to_compressed().to_vec()),
        ScriptElement::Op(OP_2),
        ScriptElement::Op(OP_CHECKMULTISIG),
    ])
    .unwrap();
    let helper = MultisigScript::new(2, vec![k1, k2]).unwrap().to_script().unwrap();
    assert_eq!(built, helper);
    assert_eq!(
        Address::p2wsh(&built, Network::Regtest).to_string(),
        "bcrt1qjzrkp6ms3ghxdx2mq9mkr3gaap880swq4v4w7cnaglnk75p8epzqn57zgj"
    );
}

#[test]
fn oversized_push_is_rejected() {
    let err = build_script(&[ScriptElement::Op(OP_1), ScriptElement::Push(vec![0xab; 76])])
        .unwrap_err();
    assert!(matches!(err, ScriptError::ScriptTooLarge { size: 76, limit: 75 }));

    assert!(build_script(&[ScriptElement::Push(vec![0xab; 75])]).is_ok());
}

// -----------------------------------------------------------------------
// Signed spends
// -----------------------------------------------------------------------

#[test]
fn spend_to_p2pkh_exact_hex() {
    let out = assemble(&request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK"), &keys()).unwrap();
    assert_eq!(out.to_hex(), P2PKH_SPEND_HEX);
    assert_eq!(out.address, REGTEST_MULTISIG_ADDRESS);
    assert_eq!(
        hex::encode(out.sighashes[0].as_bytes()),
        "fe3ac4e93d8a212c1c45a7b049c69f06cc01776b62dfdf34c680bab86eb18470"
    );
}

#[test]
fn spend_to_p2wpkh_exact_hex() {
    let out = assemble(&request("bcrt1q0q579hm06qf655cr6ns274udgf6k9x7nedkeaa"), &keys()).unwrap();
    assert_eq!(out.to_hex(), P2WPKH_SPEND_HEX);
    assert_eq!(
        out.txid().to_string(),
        "8a5115099d07455670db03f791f3caf9788bb9eea4a0d5b7133c3ff804d262ac"
    );
}

#[test]
fn signing_is_deterministic() {
    let req = request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK");
    let a = assemble(&req, &keys()).unwrap();
    let b = assemble(&req, &keys()).unwrap();
    assert_eq!(a.to_hex(), b.to_hex());

    let [first, second] = keys();
    let reversed = assemble(&req, &[second, first]).unwrap();
    assert_eq!(a.to_hex(), reversed.to_hex());
}

#[test]
fn output_roundtrips_through_parser() {
    let tx = Transaction::from_hex(P2PKH_SPEND_HEX).unwrap();
    assert_eq!(tx.to_hex(), P2PKH_SPEND_HEX);
    assert_eq!(
        btc_sdk::script::script_pubkey_to_address(&tx.outputs[0].script_pubkey, Network::Testnet)
            .unwrap(),
        "mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK"
    );
}

#[test]
fn one_key_is_not_enough() {
    let err = assemble(&request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK"), &[key("first")])
        .unwrap_err();
    assert!(matches!(
        err,
        TransactionError::InsufficientSignatures { input: 0, required: 2, provided: 1 }
    ));
    assert_eq!(err.stage(), ErrorStage::Signing);
}

#[test]
fn corrupted_address_is_rejected() {
    let err = assemble(&request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyL"), &keys()).unwrap_err();
    assert!(matches!(err, TransactionError::Script(ScriptError::InvalidChecksum)));
    assert_eq!(err.stage(), ErrorStage::AddressDecode);
}

/// Signing against the wrong spent amount produces a witness that does not
/// verify for the real amount.
#[test]
fn wrong_amount_signatures_fail_verification() {
    let mut req = request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK");
    req.inputs[0].value = 100_000_001;
    let wrong = assemble(&req, &keys()).unwrap();
    assert_eq!(
        hex::encode(wrong.sighashes[0].as_bytes()),
        "1969d3b4bec03862718fc38928917defad8e1a42c849f15a1463eb876e36e628"
    );

    let real = btc_sdk::SpentOutput::new(witness_script(), 100_000_000);
    let err = btc_sdk::transaction::partial::verify_multisig_witnesses(&wrong.transaction, &[real])
        .unwrap_err();
    assert!(matches!(err, TransactionError::InvalidSignature { input: 0, .. }));
}

// -----------------------------------------------------------------------
// Co-signing
// -----------------------------------------------------------------------

/// Two parties sign separately and the result equals one-shot assembly.
#[test]
fn co_signers_produce_same_transaction() {
    let req = request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK");

    let mut spend = req.partially_signed().unwrap();
    assert_eq!(spend.sign_with(&key("second")).unwrap(), 1);
    assert!(!spend.is_complete());

    let digest = spend.sighash(0).unwrap();
    let remote = signer::sign(&key("first"), &digest, SighashType::All).unwrap();
    spend.add_signature(0, &key("first").pub_key(), remote).unwrap();
    assert!(spend.is_complete());

    let tx = spend.finalize().unwrap();
    assert_eq!(tx.to_hex(), P2PKH_SPEND_HEX);
}

/// The first party exports its half-signed spend as JSON; the second
/// imports it on another machine, adds its signature and broadcasts.
#[test]
fn partial_spend_handed_between_parties() {
    let req = request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK");

    let mut first = req.partially_signed().unwrap();
    assert_eq!(first.sign_with(&key("first")).unwrap(), 1);
    let json = serde_json::to_string(&first.to_raw()).unwrap();

    let raw: RawPartialSpend = serde_json::from_str(&json).unwrap();
    let mut second = PartiallySignedSpend::from_raw(raw).unwrap();
    assert_eq!(second.sighashes(), first.sighashes());
    assert_eq!(second.signature_count(0).unwrap(), 1);
    assert_eq!(second.sign_with(&key("second")).unwrap(), 1);

    assert_eq!(second.finalize().unwrap().to_hex(), P2PKH_SPEND_HEX);
}

#[test]
fn imported_partial_spend_with_forged_signature_is_rejected() {
    let mut spend = request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK")
        .partially_signed()
        .unwrap();
    spend.sign_with(&key("first")).unwrap();
    let mut raw = spend.to_raw();
    let other_digest = [7u8; 32];
    raw.inputs[0].signatures[0].signature =
        hex::encode(signer::sign(&key("first"), &other_digest, SighashType::All).unwrap());

    let err = PartiallySignedSpend::from_raw(raw).unwrap_err();
    assert!(matches!(err, TransactionError::InvalidSignature { input: 0, .. }));
}

#[test]
fn co_signer_with_wrong_sighash_type_is_rejected() {
    let mut spend = request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK")
        .partially_signed()
        .unwrap();
    let digest = spend.sighash(0).unwrap();
    let sig = signer::sign(&key("first"), &digest, SighashType::None).unwrap();
    let err = spend.add_signature(0, &key("first").pub_key(), sig).unwrap_err();
    assert!(matches!(err, TransactionError::InvalidSignature { input: 0, .. }));
    assert_eq!(spend.signature_count(0).unwrap(), 0);
}

/// Keys imported from regtest WIF strings sign the same spend.
#[test]
fn wif_keys_sign_identically() {
    let wifs: Vec<String> = keys()
        .iter()
        .map(|k| k.to_wif_prefix(Network::Regtest.wif_prefix()))
        .collect();
    assert!(wifs.iter().all(|w| w.starts_with('c')));

    let pairs: Vec<KeyPair> = wifs.iter().map(|w| KeyPair::from_wif(w).unwrap()).collect();
    assert_eq!(pairs[0].public_key(), &key("first").pub_key());

    let imported: Vec<PrivateKey> = pairs.iter().map(|p| p.private_key().clone()).collect();
    let out = assemble(&request("mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK"), &imported).unwrap();
    assert_eq!(out.to_hex(), P2PKH_SPEND_HEX);
}

/// A request loaded from JSON assembles the same transaction.
#[test]
fn json_request_assembles() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let json = format!(
        r#"{{
            "network": "regtest",
            "inputs": [{{
                "outpoint": {{
                    "txid": "49ff22c9985c1991791b7a3bd6a2e8d1d6567ca283e0885afdc83bd92f56d1c4",
                    "vout": 0
                }},
                "value": 100000000,
                "witness_script": "{}"
            }}],
            "outputs": [{{
                "value": 99000000,
                "destination": {{ "address": "mkJ1nQaSPppu8o5srLxaRBRSQeACp49eyK" }}
            }}],
            "options": {{ "parallel": true }}
        }}"#,
        witness_script().to_hex()
    );
    let req: SpendRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(req.options.sighash_type, SighashType::All);
    assert_eq!(assemble(&req, &keys()).unwrap().to_hex(), P2PKH_SPEND_HEX);
}
