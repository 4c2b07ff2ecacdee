// zkam/zkam-common/src/lib.rs
// Numan Thabit 2025

//! Witness construction and verification front-end for zero-knowledge account
//! membership proofs.
//!
//! A holder proves their account commitment sits in the accounts Merkle tree
//! and carries a receipt from the commitment mapper, and emits a per-context
//! nullifier, without revealing the account identifier. This crate validates
//! and packs the witness, replays every check natively, and drives a proving
//! backend behind the [`ProvingBackend`] trait.

pub mod attestation;
pub mod commitment;
pub mod config;
pub mod error;
pub mod field;
pub mod hash;
pub mod inputs;
pub mod merkle;
pub mod nullifier;
pub mod orchestrator;
pub mod schema;
pub mod verifier;
pub mod witness;

pub use attestation::Secp256k1EcdsaVerifier;
pub use commitment::{commitment, verify_receipt, AttestationScheme, AttestationVerifier};
pub use config::DeploymentProfile;
pub use error::{AbortReason, BackendError, ErrorKind, ProofError, RejectReason};
pub use field::{FieldValue, SecretField, SecretFields};
pub use hash::{hash, hash2, hash_values};
pub use inputs::{Inputs, PrivateInputs, PublicInputs};
pub use merkle::{compute_root, verify_membership, MerklePath, MerkleTree, PathSide};
pub use nullifier::{derive_nullifier, verify_nullifier};
pub use orchestrator::{
    Proof, ProofAttempt, ProofBundle, ProofOrchestrator, ProofState, ProvingBackend,
};
pub use schema::{SignalKind, SignalSchema, SCHEMA_VERSION};
pub use verifier::{ExpectedContext, ProofVerifier, VerifyOutcome, VerifyingBackend};
pub use witness::{assemble, PublicSignals, Signals, Witness};

pub use halo2curves_axiom::bn256::Fr;
pub use tokio_util::sync::CancellationToken;
