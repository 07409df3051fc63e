//! Transaction signatures: DER-encoded ECDSA plus the sighash type byte.

use btc_primitives::ec::{PrivateKey, PublicKey, Signature};

use crate::sighash::SighashType;
use crate::TransactionError;

/// Sign `digest` and append the sighash byte.
///
/// Nonces come from RFC6979 so the same key, digest and type always give
/// the same bytes. The signature is low-S.
pub fn sign(
    private_key: &PrivateKey,
    digest: &[u8; 32],
    sighash_type: SighashType,
) -> Result<Vec<u8>, TransactionError> {
    let signature = private_key.sign(digest)?;
    let der = signature.to_der();
    let mut out = Vec::with_capacity(der.len() + 1);
    out.extend_from_slice(&der);
    out.push(sighash_type.to_byte());
    Ok(out)
}

/// Split a transaction signature into its ECDSA part and sighash type.
pub fn parse_signature(bytes: &[u8]) -> Result<(Signature, SighashType), TransactionError> {
    let (type_byte, der) = bytes.split_last().ok_or_else(|| {
        TransactionError::Primitives(btc_primitives::PrimitivesError::InvalidSignature(
            "empty signature".to_string(),
        ))
    })?;
    let sighash_type = SighashType::from_u32(u32::from(*type_byte))?;
    Ok((Signature::from_der(der)?, sighash_type))
}

/// Check a DER+type signature against `digest` and `public_key`.
///
/// Returns the sighash type carried by the signature when it verifies.
pub fn verify(
    public_key: &PublicKey,
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<Option<SighashType>, TransactionError> {
    let (sig, sighash_type) = parse_signature(signature)?;
    Ok(public_key.verify(digest, &sig).then_some(sighash_type))
}
