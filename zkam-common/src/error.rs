// zkam/zkam-common/src/error.rs
// Numan Thabit 2025

//! Error taxonomy for witness construction, proving and verification.
//!
//! Messages name fields, indices and lengths only. No variant carries the
//! value of an input, so an error can be logged or returned to a caller
//! without leaking private signals.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable machine-readable code for a [`ProofError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    OutOfFieldRange,
    ShapeMismatch,
    MerkleMismatch,
    ReceiptInvalid,
    NullifierMismatch,
    BackendFailure,
    Aborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::OutOfFieldRange => "OUT_OF_FIELD_RANGE",
            Self::ShapeMismatch => "SHAPE_MISMATCH",
            Self::MerkleMismatch => "MERKLE_MISMATCH",
            Self::ReceiptInvalid => "RECEIPT_INVALID",
            Self::NullifierMismatch => "NULLIFIER_MISMATCH",
            Self::BackendFailure => "BACKEND_FAILURE",
            Self::Aborted => "ABORTED",
        };
        f.write_str(code)
    }
}

/// Failure reported by an external proving or verifying backend.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// The circuit rejected the witness.
    #[error("constraint unsatisfied ({}): {reason}", describe_signal(.signal))]
    Unsatisfied {
        signal: Option<usize>,
        reason: String,
    },

    #[error("{0}")]
    Failed(String),

    #[error("backend call cancelled")]
    Cancelled,
}

fn describe_signal(signal: &Option<usize>) -> String {
    match signal {
        Some(idx) => format!("signal {idx}"),
        None => "signal unknown".to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    TimedOut(Duration),
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut(after) => write!(f, "proving timed out after {} ms", after.as_millis()),
            Self::Cancelled => f.write_str("proving cancelled by caller"),
        }
    }
}

/// Terminal failure of a proof attempt. The first failing check wins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("{signal} is not below the field modulus")]
    OutOfFieldRange { signal: String },

    #[error("shape mismatch in {field}: expected {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("recomputed accounts tree root does not match the claimed root")]
    MerkleMismatch,

    #[error("commitment receipt does not verify under the commitment mapper key")]
    ReceiptInvalid,

    #[error("recomputed nullifier does not match the claimed nullifier")]
    NullifierMismatch,

    #[error("proving backend failed: {0}")]
    BackendFailure(#[from] BackendError),

    #[error("proof attempt aborted: {0}")]
    Aborted(AbortReason),
}

impl ProofError {
    pub fn out_of_range(signal: impl Into<String>) -> Self {
        Self::OutOfFieldRange {
            signal: signal.into(),
        }
    }

    pub fn length_mismatch(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected: format!("{expected} elements"),
            actual: format!("{actual} elements"),
        }
    }

    pub fn not_a_bit(field: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected: "0 or 1".to_string(),
            actual: "a non-bit value".to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfFieldRange { .. } => ErrorKind::OutOfFieldRange,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::MerkleMismatch => ErrorKind::MerkleMismatch,
            Self::ReceiptInvalid => ErrorKind::ReceiptInvalid,
            Self::NullifierMismatch => ErrorKind::NullifierMismatch,
            Self::BackendFailure(_) => ErrorKind::BackendFailure,
            Self::Aborted(_) => ErrorKind::Aborted,
        }
    }
}

/// Why a submitted proof was rejected on the verifier side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Public inputs are out of range, mis-shaped, or bound to another schema.
    #[error("malformed public inputs: {0}")]
    MalformedPublicInputs(String),

    /// Well-formed, but not the context this verifier expects.
    #[error("public input {field} does not match the expected context")]
    ContextMismatch { field: &'static str },

    #[error("cryptographic verification failed")]
    VerificationFailed,

    #[error("verifying backend failed: {0}")]
    Backend(BackendError),
}

impl RejectReason {
    /// True when the proof was never handed to the cryptographic verifier.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedPublicInputs(_) | Self::ContextMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_codes() {
        assert_eq!(ProofError::MerkleMismatch.kind().to_string(), "MERKLE_MISMATCH");
        assert_eq!(
            serde_json::to_string(&ErrorKind::OutOfFieldRange).unwrap(),
            "\"OUT_OF_FIELD_RANGE\""
        );
    }

    #[test]
    fn backend_reason_is_kept_verbatim() {
        let err = ProofError::from(BackendError::Unsatisfied {
            signal: Some(12),
            reason: "gate 3 row 9".into(),
        });
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
        assert_eq!(
            err.to_string(),
            "proving backend failed: constraint unsatisfied (signal 12): gate 3 row 9"
        );
    }

    #[test]
    fn shape_messages_carry_no_values() {
        let err = ProofError::length_mismatch("accountMerklePathIndices", 20, 19);
        assert_eq!(
            err.to_string(),
            "shape mismatch in accountMerklePathIndices: expected 20 elements, got 19 elements"
        );
    }

    #[test]
    fn malformed_and_crypto_rejections_are_distinguished() {
        assert!(RejectReason::MalformedPublicInputs("x".into()).is_malformed());
        assert!(RejectReason::ContextMismatch { field: "nullifier" }.is_malformed());
        assert!(!RejectReason::VerificationFailed.is_malformed());
    }
}
