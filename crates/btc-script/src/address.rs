/// Bitcoin address handling.
///
/// Witness v0 programs encode as Bech32 with the network HRP; P2PKH
/// encodes as Base58Check with the network version byte. Anything else
/// is rejected as an unsupported script type.

use std::fmt;
use std::str::FromStr;

use bech32::hrp::{self, Hrp};
use bech32::primitives::decode::{SegwitHrpstring, SegwitHrpstringError};
use bech32::segwit;
use serde::{Deserialize, Serialize};

use btc_primitives::base58;
use btc_primitives::ec::private_key::{MAINNET_WIF_PREFIX, TESTNET_WIF_PREFIX};
use btc_primitives::PrimitivesError;

use crate::script::Script;
use crate::ScriptError;

/// Mainnet P2PKH address version byte.
const MAINNET_P2PKH: u8 = 0x00;
/// Testnet and regtest P2PKH address version byte.
const TESTNET_P2PKH: u8 = 0x6f;

/// Bitcoin network, selecting address prefixes and HRPs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// `bc`, version 0x00, WIF 0x80.
    Mainnet,
    /// `tb`, version 0x6f, WIF 0xef.
    Testnet,
    /// `bcrt`, shares testnet's Base58 versions.
    Regtest,
}

impl Network {
    /// Bech32 human-readable part.
    pub fn hrp(&self) -> Hrp {
        match self {
            Network::Mainnet => hrp::BC,
            Network::Testnet => hrp::TB,
            Network::Regtest => hrp::BCRT,
        }
    }

    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_P2PKH,
            Network::Testnet | Network::Regtest => TESTNET_P2PKH,
        }
    }

    pub fn wif_prefix(&self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_WIF_PREFIX,
            Network::Testnet | Network::Regtest => TESTNET_WIF_PREFIX,
        }
    }

    /// Network for a lowercase HRP string.
    pub fn from_hrp(hrp: &str) -> Option<Network> {
        match hrp {
            "bc" => Some(Network::Mainnet),
            "tb" => Some(Network::Testnet),
            "bcrt" => Some(Network::Regtest),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ScriptError::UnknownNetwork(s.to_string())),
        }
    }
}

/// What an address commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressPayload {
    PubkeyHash([u8; 20]),
    WitnessPubkeyHash([u8; 20]),
    WitnessScriptHash([u8; 32]),
}

/// A decoded or to-be-encoded address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub network: Network,
    pub payload: AddressPayload,
}

impl Address {
    /// Address for a P2WSH, P2WPKH or P2PKH scriptPubKey.
    pub fn from_script(script: &Script, network: Network) -> Result<Self, ScriptError> {
        let payload = if script.is_p2pkh() {
            let mut h = [0u8; 20];
            h.copy_from_slice(&script.to_bytes()[3..23]);
            AddressPayload::PubkeyHash(h)
        } else {
            match script.witness_program() {
                Some((0, program)) if program.len() == 20 => {
                    let mut h = [0u8; 20];
                    h.copy_from_slice(program);
                    AddressPayload::WitnessPubkeyHash(h)
                }
                Some((0, program)) if program.len() == 32 => {
                    let mut h = [0u8; 32];
                    h.copy_from_slice(program);
                    AddressPayload::WitnessScriptHash(h)
                }
                Some((version, program)) => {
                    return Err(ScriptError::UnsupportedScriptType(format!(
                        "witness v{} program of {} bytes",
                        version,
                        program.len()
                    )))
                }
                None => {
                    return Err(ScriptError::UnsupportedScriptType(script.to_hex()));
                }
            }
        };
        Ok(Address { network, payload })
    }

    /// P2WSH address committing to `witness_script`.
    pub fn p2wsh(witness_script: &Script, network: Network) -> Self {
        let mut h = [0u8; 32];
        h.copy_from_slice(&Script::p2wsh(witness_script).to_bytes()[2..]);
        Address { network, payload: AddressPayload::WitnessScriptHash(h) }
    }

    pub fn p2wpkh(pubkey_hash: &[u8; 20], network: Network) -> Self {
        Address { network, payload: AddressPayload::WitnessPubkeyHash(*pubkey_hash) }
    }

    pub fn p2pkh(pubkey_hash: &[u8; 20], network: Network) -> Self {
        Address { network, payload: AddressPayload::PubkeyHash(*pubkey_hash) }
    }

    /// Parse an address, detecting its network from the HRP or version byte.
    ///
    /// Base58 version 0x6f is reported as `Testnet`; regtest shares it.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        match bech32_hrp_of(addr) {
            Some(network) => decode_segwit(addr, network),
            None => decode_base58(addr),
        }
    }

    /// Parse an address and require it to belong to `expected`.
    pub fn from_string_checked(addr: &str, expected: Network) -> Result<Self, ScriptError> {
        let mut parsed = Self::from_string(addr)?;
        let shared_base58 = matches!(parsed.payload, AddressPayload::PubkeyHash(_))
            && parsed.network.p2pkh_version() == expected.p2pkh_version();
        if parsed.network != expected {
            if !shared_base58 {
                return Err(ScriptError::NetworkMismatch { expected, found: parsed.network });
            }
            parsed.network = expected;
        }
        Ok(parsed)
    }

    /// scriptPubKey paying to this address.
    pub fn script_pubkey(&self) -> Script {
        match &self.payload {
            AddressPayload::PubkeyHash(h) => Script::p2pkh(h),
            AddressPayload::WitnessPubkeyHash(h) => Script::p2wpkh(h),
            AddressPayload::WitnessScriptHash(h) => {
                let mut bytes = Vec::with_capacity(34);
                bytes.push(crate::opcodes::OP_0);
                bytes.push(crate::opcodes::OP_DATA_32);
                bytes.extend_from_slice(h);
                Script::from(bytes)
            }
        }
    }

    fn witness_program(&self) -> Option<&[u8]> {
        match &self.payload {
            AddressPayload::PubkeyHash(_) => None,
            AddressPayload::WitnessPubkeyHash(h) => Some(&h[..]),
            AddressPayload::WitnessScriptHash(h) => Some(&h[..]),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.witness_program() {
            Some(program) => {
                // 20 and 32 byte v0 programs always fit the segwit length limit.
                let s = segwit::encode_v0(self.network.hrp(), program).map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
            None => {
                let AddressPayload::PubkeyHash(h) = &self.payload else {
                    return Err(fmt::Error);
                };
                let mut payload = Vec::with_capacity(21);
                payload.push(self.network.p2pkh_version());
                payload.extend_from_slice(h);
                f.write_str(&base58::check_encode(&payload))
            }
        }
    }
}

impl FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

/// Encode a scriptPubKey as an address string for `network`.
pub fn script_pubkey_to_address(script: &Script, network: Network) -> Result<String, ScriptError> {
    Ok(Address::from_script(script, network)?.to_string())
}

/// Decode an address string back into the scriptPubKey it pays to.
pub fn address_to_script_pubkey(addr: &str) -> Result<Script, ScriptError> {
    Ok(Address::from_string(addr)?.script_pubkey())
}

/// Network of a string that looks like Bech32 with a known HRP.
fn bech32_hrp_of(addr: &str) -> Option<Network> {
    let sep = addr.rfind('1')?;
    Network::from_hrp(&addr[..sep].to_ascii_lowercase())
}

fn decode_segwit(addr: &str, network: Network) -> Result<Address, ScriptError> {
    let parsed = SegwitHrpstring::new(addr).map_err(|e| match e {
        SegwitHrpstringError::Checksum(_) => ScriptError::InvalidChecksum,
        SegwitHrpstringError::WitnessLength(_) => {
            ScriptError::InvalidProgramLength(program_len_hint(addr))
        }
        other => ScriptError::InvalidAddress(format!("{}: {}", addr, other)),
    })?;

    let version = parsed.witness_version().to_u8();
    let program: Vec<u8> = parsed.byte_iter().collect();
    if version != 0 {
        return Err(ScriptError::UnsupportedScriptType(format!(
            "witness v{} address {}",
            version, addr
        )));
    }

    let payload = match program.len() {
        20 => {
            let mut h = [0u8; 20];
            h.copy_from_slice(&program);
            AddressPayload::WitnessPubkeyHash(h)
        }
        32 => {
            let mut h = [0u8; 32];
            h.copy_from_slice(&program);
            AddressPayload::WitnessScriptHash(h)
        }
        n => return Err(ScriptError::InvalidProgramLength(n)),
    };
    Ok(Address { network, payload })
}

/// Byte length the data part would carry, for error reporting.
fn program_len_hint(addr: &str) -> usize {
    let sep = addr.rfind('1').unwrap_or(0);
    // data part minus the version char and the 6-char checksum
    let chars = addr.len().saturating_sub(sep + 1 + 1 + 6);
    chars * 5 / 8
}

fn decode_base58(addr: &str) -> Result<Address, ScriptError> {
    let (version, payload) = base58::check_decode_versioned(addr).map_err(|e| match e {
        PrimitivesError::ChecksumMismatch => ScriptError::InvalidChecksum,
        other => ScriptError::InvalidAddress(format!("{}: {}", addr, other)),
    })?;

    let network = match version {
        MAINNET_P2PKH => Network::Mainnet,
        TESTNET_P2PKH => Network::Testnet,
        v => {
            return Err(ScriptError::UnsupportedScriptType(format!(
                "base58 version 0x{:02x}",
                v
            )))
        }
    };
    let hash: [u8; 20] = payload
        .as_slice()
        .try_into()
        .map_err(|_| ScriptError::InvalidAddress(format!("{}: payload of {} bytes", addr, payload.len())))?;
    Ok(Address::p2pkh(&hash, network))
}
