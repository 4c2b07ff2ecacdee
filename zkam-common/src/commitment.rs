// zkam/zkam-common/src/commitment.rs
// Numan Thabit 2025

use std::fmt;

use halo2curves_axiom::bn256::Fr;
use serde::{Deserialize, Serialize};

use crate::hash::hash2;

/// Leaf of the accounts tree and the message the commitment mapper attests.
pub fn commitment(source_identifier: &Fr, source_secret: &Fr) -> Fr {
    hash2(source_identifier, source_secret)
}

/// Signature schemes a commitment mapper may attest with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttestationScheme {
    /// ECDSA over secp256k1; receipt `[r_hi, r_lo, s_hi, s_lo]`, key `[x_hi, x_lo, y_hi, y_lo]`.
    Secp256k1Ecdsa,
}

impl AttestationScheme {
    pub fn receipt_len(self) -> usize {
        match self {
            Self::Secp256k1Ecdsa => 4,
        }
    }

    pub fn pubkey_len(self) -> usize {
        match self {
            Self::Secp256k1Ecdsa => 4,
        }
    }
}

impl Default for AttestationScheme {
    fn default() -> Self {
        Self::Secp256k1Ecdsa
    }
}

impl fmt::Display for AttestationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1Ecdsa => f.write_str("secp256k1-ecdsa"),
        }
    }
}

/// Checks a mapper receipt over a commitment. Implementations never panic on
/// malformed receipts or keys; they answer `false`.
pub trait AttestationVerifier: Send + Sync {
    fn scheme(&self) -> AttestationScheme;

    fn receipt_len(&self) -> usize {
        self.scheme().receipt_len()
    }

    fn pubkey_len(&self) -> usize {
        self.scheme().pubkey_len()
    }

    fn verify(&self, commitment: &Fr, receipt: &[Fr], pubkey: &[Fr]) -> bool;
}

/// Fails closed: a length disagreeing with the scheme is a failed receipt.
pub fn verify_receipt(
    verifier: &dyn AttestationVerifier,
    commitment: &Fr,
    receipt: &[Fr],
    pubkey: &[Fr],
) -> bool {
    if receipt.len() != verifier.receipt_len() || pubkey.len() != verifier.pubkey_len() {
        tracing::debug!(
            scheme = %verifier.scheme(),
            receipt_len = receipt.len(),
            pubkey_len = pubkey.len(),
            "receipt or key length disagrees with scheme"
        );
        return false;
    }
    verifier.verify(commitment, receipt, pubkey)
}
