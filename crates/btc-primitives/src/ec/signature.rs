//! ECDSA signature with strict DER serialization and RFC6979 deterministic
//! nonces.
//!
//! Signatures produced here are always low-S (BIP-0062); `from_der` accepts
//! either half so that third-party signatures can still be inspected.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// The secp256k1 curve order N.
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// N/2, the largest S value considered "low".
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// Maximum DER signature length: two 33-byte integers plus 6 bytes of framing.
pub const MAX_DER_LEN: usize = 72;

/// An ECDSA signature as big-endian R and S scalars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S values.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// True when S is in the lower half of the curve order.
    pub fn is_low_s(&self) -> bool {
        !is_greater_than(&self.s, &HALF_ORDER)
    }

    /// Parse a strict DER-encoded signature.
    ///
    /// Expected layout: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`, with
    /// the total length covering the whole input and each integer minimally
    /// encoded and positive.
    ///
    /// # Arguments
    /// * `bytes` - DER bytes, without any trailing sighash byte.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` describing the defect.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() < 8 || bytes.len() > MAX_DER_LEN {
            return Err(invalid("bad total length"));
        }
        if bytes[0] != 0x30 {
            return Err(invalid("no sequence header"));
        }
        if bytes[1] as usize != bytes.len() - 2 {
            return Err(invalid("sequence length does not cover input"));
        }

        let (r_bytes, rest) = read_der_int(&bytes[2..], "R")?;
        let (s_bytes, rest) = read_der_int(rest, "S")?;
        if !rest.is_empty() {
            return Err(invalid("trailing bytes after S"));
        }

        let r = to_32_bytes(r_bytes)?;
        let s = to_32_bytes(s_bytes)?;

        for (name, v) in [("R", &r), ("S", &s)] {
            if v.iter().all(|&b| b == 0) {
                return Err(PrimitivesError::InvalidSignature(format!("signature {} is zero", name)));
            }
            if !is_less_than(v, &CURVE_ORDER) {
                return Err(PrimitivesError::InvalidSignature(format!(
                    "signature {} is >= curve order",
                    name
                )));
            }
        }

        Ok(Signature { r, s })
    }

    /// Serialize as DER with low-S normalization.
    pub fn to_der(&self) -> Vec<u8> {
        let s = if self.is_low_s() { self.s } else { subtract_from_order(&self.s) };

        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&s);

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Sign a 32-byte digest with an RFC6979 deterministic nonce.
    ///
    /// The same key and digest always give the same signature. The result is
    /// low-S normalized.
    pub fn sign(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let (k256_sig, _recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(digest)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);

        if is_greater_than(&s, &HALF_ORDER) {
            s = subtract_from_order(&s);
        }

        Ok(Signature { r, s })
    }

    /// Verify against a digest and public key.
    ///
    /// High-S signatures verify as well; use `is_low_s` to enforce policy.
    pub fn verify(&self, digest: &[u8; 32], pub_key: &PublicKey) -> bool {
        let k256_sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let k256_sig = k256_sig.normalize_s().unwrap_or(k256_sig);

        pub_key
            .verifying_key()
            .verify_prehash(digest, &k256_sig)
            .is_ok()
    }
}

fn invalid(msg: &str) -> PrimitivesError {
    PrimitivesError::InvalidSignature(format!("malformed signature: {}", msg))
}

/// Split one DER INTEGER off the front of `data`.
fn read_der_int<'a>(data: &'a [u8], name: &str) -> Result<(&'a [u8], &'a [u8]), PrimitivesError> {
    if data.len() < 2 || data[0] != 0x02 {
        return Err(invalid(&format!("no integer marker for {}", name)));
    }
    let len = data[1] as usize;
    if len == 0 || 2 + len > data.len() {
        return Err(invalid(&format!("bogus {} length", name)));
    }
    let value = &data[2..2 + len];
    if value[0] & 0x80 != 0 {
        return Err(invalid(&format!("{} is negative", name)));
    }
    if len > 1 && value[0] == 0x00 && value[1] & 0x80 == 0 {
        return Err(invalid(&format!("{} has excessive padding", name)));
    }
    Ok((value, &data[2 + len..]))
}

/// Minimal big-endian DER integer body for a 32-byte value.
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];

    if trimmed[0] & 0x80 != 0 {
        let mut out = Vec::with_capacity(trimmed.len() + 1);
        out.push(0x00);
        out.extend_from_slice(trimmed);
        out
    } else {
        trimmed.to_vec()
    }
}

fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "integer value too large for 32 bytes".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

fn is_less_than(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a < b
}

fn is_greater_than(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a > b
}

/// N - val, used for low-S normalization.
fn subtract_from_order(val: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;
    for i in (0..32).rev() {
        let diff = CURVE_ORDER[i] as i32 - val[i] as i32 - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    fn hex_to_32(s: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).unwrap();
        out
    }

    #[test]
    fn test_der_parsing() {
        let valid = hex::decode(
            "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41\
             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09",
        )
        .unwrap();
        let sig = Signature::from_der(&valid).unwrap();
        assert_eq!(sig.to_der(), valid);

        assert!(Signature::from_der(&[]).is_err());

        let mut bad_magic = valid.clone();
        bad_magic[0] = 0x31;
        assert!(Signature::from_der(&bad_magic).is_err());

        let mut bad_marker = valid.clone();
        bad_marker[2] = 0x03;
        assert!(Signature::from_der(&bad_marker).is_err());

        // Sighash byte left on the end.
        let mut with_hashtype = valid.clone();
        with_hashtype.push(0x01);
        assert!(Signature::from_der(&with_hashtype).is_err());
    }

    #[test]
    fn test_der_rejects_non_minimal_integers() {
        // R padded with a redundant zero byte.
        let padded = hex::decode(
            "304502210004e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd4\
             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09",
        )
        .unwrap();
        assert!(Signature::from_der(&padded).is_err());

        // Negative R.
        let negative = hex::decode(
            "30440220a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404\
             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09",
        )
        .unwrap();
        assert!(Signature::from_der(&negative).is_err());
    }

    #[test]
    fn test_der_low_s_normalization() {
        let sig = Signature::new(
            hex_to_32("a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404"),
            hex_to_32("971729c7fa944b465b35250c6570a2f31acbb14b13d1565fab7330dcb2b3dfb1"),
        );
        assert!(!sig.is_low_s());
        assert_eq!(
            hex::encode(sig.to_der()),
            "3045022100a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404\
             022068e8d638056bb4b9a4cadaf39a8f5d0b9fe32b9b9b7749dc145f2db01d826190"
        );
    }

    #[test]
    fn test_rfc6979_vectors() {
        let tests = [
            (
                "cca9fbcc1b41e5a95d369eaa6ddcff73b61a4efaa279cfc6567e8daa39cbaf50",
                "sample",
                "3045022100af340daf02cc15c8d5d08d7735dfe6b98a474ed373bdb5fbecf7571be52b384202205009fb27f37034a9b24b707b7c6b79ca23ddef9e25f7282e8a797efe53a8f124",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000001",
                "Satoshi Nakamoto",
                "3045022100934b1ea10a4b3c1757e2b0c017d0b6143ce3c9a7e6a4a49860d7a6ab210ee3d802202442ce9d2b916064108014783e923ec36b49743e2ffa1c4496f01a512aafd9e5",
            ),
            (
                "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140",
                "Satoshi Nakamoto",
                "3045022100fd567d121db66e382991534ada77a6bd3106f0a1098c231e47993447cd6af2d002206b39cd0eb1bc8603e159ef5c20a5c8ad685a45b06ce9bebed3f153d10d93bed5",
            ),
            (
                "f8b8af8ce3c7cca5e300d33939540c10d45ce001b8f252bfbc57ba0342904181",
                "Alan Turing",
                "304402207063ae83e7f62bbb171798131b4a0564b956930092b33b07b395615d9ec7e15c022058dfcc1e00a35e1572f366ffe34ba0fc47db1e7189759b9fb233c5b05ab388ea",
            ),
        ];

        for (key_hex, msg, expected) in &tests {
            let priv_key = PrivateKey::from_hex(key_hex).unwrap();
            let digest = sha256(msg.as_bytes());

            let sig = priv_key.sign(&digest).unwrap();
            assert_eq!(hex::encode(sig.to_der()), *expected, "message '{}'", msg);
            assert!(sig.is_low_s());
            assert!(priv_key.pub_key().verify(&digest, &sig));

            // Deterministic: a second signature is identical.
            assert_eq!(priv_key.sign(&digest).unwrap(), sig);
        }
    }

    #[test]
    fn test_verify_rejects_wrong_digest_and_key() {
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let other = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000002",
        )
        .unwrap();
        let digest = sha256(b"digest");
        let sig = key.sign(&digest).unwrap();

        assert!(!key.pub_key().verify(&sha256(b"other"), &sig));
        assert!(!other.pub_key().verify(&digest, &sig));
    }

    #[test]
    fn test_verify_accepts_high_s_form() {
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let digest = sha256(b"Satoshi Nakamoto");
        let sig = key.sign(&digest).unwrap();
        let high = Signature::new(*sig.r(), subtract_from_order(sig.s()));
        assert!(!high.is_low_s());
        assert!(key.pub_key().verify(&digest, &high));
    }
}
