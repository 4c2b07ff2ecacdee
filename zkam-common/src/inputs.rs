// zkam/zkam-common/src/inputs.rs
// Numan Thabit 2025

//! Caller-facing inputs of one proof attempt, as they arrive in JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::field::FieldValue;

/// Private half of the witness. Wiped on drop; `Debug` shows shapes only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct PrivateInputs {
    pub source_identifier: FieldValue,
    pub source_secret: FieldValue,
    pub source_commitment_receipt: Vec<FieldValue>,
    pub account_merkle_path_elements: Vec<FieldValue>,
    /// 0: the running node is the left child; 1: the right child.
    pub account_merkle_path_indices: Vec<FieldValue>,
    pub accounts_tree_root: FieldValue,
}

impl fmt::Debug for PrivateInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateInputs")
            .field("source_identifier", &"<redacted>")
            .field("source_secret", &"<redacted>")
            .field(
                "source_commitment_receipt_len",
                &self.source_commitment_receipt.len(),
            )
            .field("path_elements_len", &self.account_merkle_path_elements.len())
            .field("path_indices_len", &self.account_merkle_path_indices.len())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInputs {
    /// Bound into the proof as-is; nothing is derived from it.
    pub destination_identifier: FieldValue,
    pub commitment_mapper_pub_key: Vec<FieldValue>,
    pub external_nullifier: FieldValue,
    pub nullifier: FieldValue,
}

/// Everything one attempt consumes. Moved into the assembler whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inputs {
    pub private_inputs: PrivateInputs,
    pub public_inputs: PublicInputs,
}

impl Inputs {
    pub fn new(private_inputs: PrivateInputs, public_inputs: PublicInputs) -> Self {
        Self {
            private_inputs,
            public_inputs,
        }
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
