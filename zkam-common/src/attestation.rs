// zkam/zkam-common/src/attestation.rs

//! secp256k1 ECDSA receipts from the commitment mapper.
//!
//! The mapper signs the 32-byte big-endian encoding of the commitment as a
//! prehash. Signature scalars and key coordinates are 256-bit, wider than the
//! BN254 field, so each travels as a `[high, low]` pair of 128-bit limbs.

use halo2curves_axiom::bn256::Fr;
use k256::{
    ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey},
    elliptic_curve::IsHigh,
    EncodedPoint, FieldBytes,
};

use crate::{
    commitment::{AttestationScheme, AttestationVerifier},
    field::{fr_to_be_bytes, join_u256, split_u256},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1EcdsaVerifier;

impl Secp256k1EcdsaVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl AttestationVerifier for Secp256k1EcdsaVerifier {
    fn scheme(&self) -> AttestationScheme {
        AttestationScheme::Secp256k1Ecdsa
    }

    fn verify(&self, commitment: &Fr, receipt: &[Fr], pubkey: &[Fr]) -> bool {
        let Some(signature) = decode_signature(receipt) else {
            return false;
        };
        let Some(key) = decode_verifying_key(pubkey) else {
            return false;
        };
        // High-s signatures are malleable twins; the mapper only issues low-s.
        if bool::from(signature.s().is_high()) {
            return false;
        }
        key.verify_prehash(&commitment_message(commitment), &signature)
            .is_ok()
    }
}

/// Message the mapper signs for a commitment.
pub fn commitment_message(commitment: &Fr) -> [u8; 32] {
    fr_to_be_bytes(commitment)
}

/// `[r_hi, r_lo, s_hi, s_lo]`.
pub fn encode_signature(signature: &Signature) -> [Fr; 4] {
    let bytes = signature.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    let [r_hi, r_lo] = split_u256(&r);
    let [s_hi, s_lo] = split_u256(&s);
    [r_hi, r_lo, s_hi, s_lo]
}

/// `[x_hi, x_lo, y_hi, y_lo]` of the uncompressed affine point.
pub fn encode_verifying_key(key: &VerifyingKey) -> Option<[Fr; 4]> {
    let encoded = key.to_encoded_point(false);
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(encoded.x()?);
    y.copy_from_slice(encoded.y()?);
    let [x_hi, x_lo] = split_u256(&x);
    let [y_hi, y_lo] = split_u256(&y);
    Some([x_hi, x_lo, y_hi, y_lo])
}

pub fn decode_signature(receipt: &[Fr]) -> Option<Signature> {
    let [r_hi, r_lo, s_hi, s_lo] = receipt else {
        return None;
    };
    let r = join_u256(r_hi, r_lo)?;
    let s = join_u256(s_hi, s_lo)?;
    Signature::from_scalars(
        FieldBytes::clone_from_slice(&r),
        FieldBytes::clone_from_slice(&s),
    )
    .ok()
}

/// `None` for oversized limbs or a point not on the curve.
pub fn decode_verifying_key(pubkey: &[Fr]) -> Option<VerifyingKey> {
    let [x_hi, x_lo, y_hi, y_lo] = pubkey else {
        return None;
    };
    let x = join_u256(x_hi, x_lo)?;
    let y = join_u256(y_hi, y_lo)?;
    let point = EncodedPoint::from_affine_coordinates(
        &FieldBytes::clone_from_slice(&x),
        &FieldBytes::clone_from_slice(&y),
        false,
    );
    VerifyingKey::from_encoded_point(&point).ok()
}
