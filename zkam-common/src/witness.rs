// zkam/zkam-common/src/witness.rs
// Numan Thabit 2025

//! Witness assembly: shape and range validation, then the ordered signal vector.
//!
//! Validation walks the inputs in schema order, one field at a time; for a
//! vector the length is checked before any element. The first failure is
//! returned. The semantic pre-checks (membership, receipt, nullifier) live in
//! [`Witness::precheck`] and are not part of [`assemble`].

use std::fmt;

use halo2curves_axiom::bn256::Fr;
use tracing::{debug, warn};

use crate::{
    commitment::{commitment, verify_receipt, AttestationVerifier},
    config::DeploymentProfile,
    error::ProofError,
    field::{FieldValue, SecretField, SecretFields},
    inputs::{Inputs, PublicInputs},
    merkle::{fold_root, PathSide},
    nullifier::verify_nullifier,
    schema::{names, SignalKind, SignalSchema},
};

fn scalar(value: &FieldValue, kind: SignalKind) -> Result<Fr, ProofError> {
    value
        .to_fr()
        .ok_or_else(|| ProofError::out_of_range(kind.to_string()))
}

fn vector<C: FromIterator<Fr>>(
    values: &[FieldValue],
    expected: usize,
    field: &str,
    kind: fn(usize) -> SignalKind,
) -> Result<C, ProofError> {
    if values.len() != expected {
        return Err(ProofError::length_mismatch(field, expected, values.len()));
    }
    values
        .iter()
        .enumerate()
        .map(|(i, value)| scalar(value, kind(i)))
        .collect()
}

fn path_bits(values: &[FieldValue], expected: usize) -> Result<SecretFields, ProofError> {
    if values.len() != expected {
        return Err(ProofError::length_mismatch(
            names::PATH_INDICES,
            expected,
            values.len(),
        ));
    }
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let kind = SignalKind::PathIndex(i);
            let bit = scalar(value, kind)?;
            PathSide::from_bit(&bit)
                .map(|_| bit)
                .ok_or_else(|| ProofError::not_a_bit(kind.to_string()))
        })
        .collect()
}

fn side_of(bit: Fr) -> PathSide {
    PathSide::from_bit(&bit).unwrap_or(PathSide::Left)
}

/// Public signals in schema order, already range and shape checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicSignals {
    pub destination_identifier: Fr,
    pub commitment_mapper_pub_key: Vec<Fr>,
    pub external_nullifier: Fr,
    pub nullifier: Fr,
}

impl PublicSignals {
    pub fn from_inputs(public: &PublicInputs, schema: &SignalSchema) -> Result<Self, ProofError> {
        let destination_identifier = scalar(
            &public.destination_identifier,
            SignalKind::DestinationIdentifier,
        )?;
        let commitment_mapper_pub_key = vector(
            &public.commitment_mapper_pub_key,
            schema.pubkey_len(),
            names::MAPPER_PUBKEY,
            SignalKind::MapperPubKey,
        )?;
        let external_nullifier =
            scalar(&public.external_nullifier, SignalKind::ExternalNullifier)?;
        let nullifier = scalar(&public.nullifier, SignalKind::Nullifier)?;
        Ok(Self {
            destination_identifier,
            commitment_mapper_pub_key,
            external_nullifier,
            nullifier,
        })
    }

    pub fn to_vec(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(3 + self.commitment_mapper_pub_key.len());
        out.push(self.destination_identifier);
        out.extend_from_slice(&self.commitment_mapper_pub_key);
        out.push(self.external_nullifier);
        out.push(self.nullifier);
        out
    }

    pub fn to_inputs(&self) -> PublicInputs {
        PublicInputs {
            destination_identifier: FieldValue::from_fr(&self.destination_identifier),
            commitment_mapper_pub_key: self
                .commitment_mapper_pub_key
                .iter()
                .map(FieldValue::from_fr)
                .collect(),
            external_nullifier: FieldValue::from_fr(&self.external_nullifier),
            nullifier: FieldValue::from_fr(&self.nullifier),
        }
    }
}

/// Normalized witness of one attempt. Private parts are wiped on drop.
pub struct Witness {
    schema: SignalSchema,
    source_identifier: SecretField,
    source_secret: SecretField,
    receipt: SecretFields,
    path_elements: SecretFields,
    /// Validated to be 0 or 1.
    path_indices: SecretFields,
    accounts_tree_root: SecretField,
    public: PublicSignals,
}

impl Witness {
    /// Consume `inputs` and validate every shape and range invariant.
    pub fn from_inputs(inputs: Inputs, profile: &DeploymentProfile) -> Result<Self, ProofError> {
        let schema = profile.schema();
        let depth = schema.tree_depth();
        let private = &inputs.private_inputs;

        let source_identifier = SecretField::new(scalar(
            &private.source_identifier,
            SignalKind::SourceIdentifier,
        )?);
        let source_secret =
            SecretField::new(scalar(&private.source_secret, SignalKind::SourceSecret)?);
        let receipt = vector(
            &private.source_commitment_receipt,
            schema.receipt_len(),
            names::COMMITMENT_RECEIPT,
            SignalKind::CommitmentReceipt,
        )?;
        let path_elements = vector(
            &private.account_merkle_path_elements,
            depth,
            names::PATH_ELEMENTS,
            SignalKind::PathElement,
        )?;
        let path_indices = path_bits(&private.account_merkle_path_indices, depth)?;
        let accounts_tree_root = SecretField::new(scalar(
            &private.accounts_tree_root,
            SignalKind::AccountsTreeRoot,
        )?);

        let public = PublicSignals::from_inputs(&inputs.public_inputs, &schema)?;

        debug!(
            tree_depth = depth,
            receipt_len = schema.receipt_len(),
            pubkey_len = schema.pubkey_len(),
            "witness shapes validated"
        );

        Ok(Self {
            schema,
            source_identifier,
            source_secret,
            receipt,
            path_elements,
            path_indices,
            accounts_tree_root,
            public,
        })
    }

    pub fn schema(&self) -> &SignalSchema {
        &self.schema
    }

    pub fn public(&self) -> &PublicSignals {
        &self.public
    }

    pub fn commitment(&self) -> Fr {
        commitment(&self.source_identifier.expose(), &self.source_secret.expose())
    }

    /// Membership, then receipt, then nullifier. Stops at the first failure.
    pub fn precheck(&self, attestation: &dyn AttestationVerifier) -> Result<(), ProofError> {
        let leaf = self.commitment();

        let root = fold_root(
            &leaf,
            self.path_elements.iter(),
            self.path_indices.iter().map(side_of),
        );
        if root != self.accounts_tree_root.expose() {
            warn!(check = "membership", "pre-check failed");
            return Err(ProofError::MerkleMismatch);
        }
        debug!(check = "membership", "pre-check passed");

        if !verify_receipt(
            attestation,
            &leaf,
            &self.receipt.to_vec(),
            &self.public.commitment_mapper_pub_key,
        ) {
            warn!(check = "receipt", scheme = %attestation.scheme(), "pre-check failed");
            return Err(ProofError::ReceiptInvalid);
        }
        debug!(check = "receipt", "pre-check passed");

        if !verify_nullifier(
            &self.source_secret.expose(),
            &self.public.external_nullifier,
            &self.public.nullifier,
        ) {
            warn!(check = "nullifier", "pre-check failed");
            return Err(ProofError::NullifierMismatch);
        }
        debug!(check = "nullifier", "pre-check passed");

        Ok(())
    }

    /// Flatten into the schema-ordered signal vector.
    pub fn signals(&self) -> Signals {
        let private = std::iter::once(self.source_identifier.expose())
            .chain(std::iter::once(self.source_secret.expose()))
            .chain(self.receipt.iter())
            .chain(self.path_elements.iter())
            .chain(self.path_indices.iter())
            .chain(std::iter::once(self.accounts_tree_root.expose()))
            .collect();
        Signals {
            schema: self.schema.clone(),
            private,
            public: self.public.to_vec(),
        }
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("schema_version", &self.schema.version())
            .field("tree_depth", &self.schema.tree_depth())
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Validate and pack `inputs` into the signal vector for `profile`.
pub fn assemble(inputs: Inputs, profile: &DeploymentProfile) -> Result<Signals, ProofError> {
    Witness::from_inputs(inputs, profile).map(|witness| witness.signals())
}

/// Flat, schema-ordered signals: private first, public last. The private
/// part is wiped on drop.
pub struct Signals {
    schema: SignalSchema,
    private: SecretFields,
    public: Vec<Fr>,
}

impl Signals {
    pub fn schema(&self) -> &SignalSchema {
        &self.schema
    }

    /// The whole vector in schema order, private values included.
    pub fn values(&self) -> Vec<Fr> {
        self.private.iter().chain(self.public.iter().copied()).collect()
    }

    pub fn len(&self) -> usize {
        self.private.len() + self.public.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, kind: SignalKind) -> Option<Fr> {
        let pos = self.schema.position(kind)?;
        match pos.checked_sub(self.private.len()) {
            None => self.private.get(pos),
            Some(offset) => self.public.get(offset).copied(),
        }
    }

    pub fn public_values(&self) -> &[Fr] {
        &self.public
    }

    pub fn public_signals(&self) -> PublicSignals {
        let public = self.public_values();
        let k = self.schema.pubkey_len();
        PublicSignals {
            destination_identifier: public[0],
            commitment_mapper_pub_key: public[1..1 + k].to_vec(),
            external_nullifier: public[1 + k],
            nullifier: public[2 + k],
        }
    }
}

impl fmt::Debug for Signals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("schema_version", &self.schema.version())
            .field("len", &self.len())
            .field("public", &self.public_values())
            .finish_non_exhaustive()
    }
}
