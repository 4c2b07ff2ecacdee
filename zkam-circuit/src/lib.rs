// zkam/zkam-circuit/src/lib.rs
// Numan Thabit 2025

//! Halo2 circuit replaying the membership, mapper-receipt and nullifier
//! checks over the signal vector assembled by `zkam-common`.

pub mod gadgets;
pub mod keys;

use std::fmt;

use anyhow::{anyhow, Context as _};
use halo2_base::{
    gates::{
        circuit::builder::BaseCircuitBuilder,
        circuit::{BaseCircuitParams, BaseConfig, CircuitBuilderStage},
        RangeInstructions,
    },
    AssignedValue,
};
use halo2_proofs_axiom::{
    circuit::{Layouter, SimpleFloorPlanner},
    plonk::{Circuit, ConstraintSystem, Error},
};
use halo2curves_axiom::bn256::Fr;
use k256::{
    ecdsa::{hazmat::SignPrimitive, Signature, SigningKey, VerifyingKey},
    FieldBytes,
};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;
use zkam_common::{
    attestation::{commitment_message, encode_signature, encode_verifying_key},
    commitment, derive_nullifier,
    field::{SecretField, SecretFields},
    DeploymentProfile, MerkleTree, SignalKind, Signals,
};

use crate::gadgets::{
    ecdsa::{verify_mapper_receipt, LimbPair, MapperAttestation},
    merkle::compute_root,
    nullifier::{compute_commitment, compute_nullifier},
    poseidon::Poseidon,
};

pub const DEFAULT_K: usize = 19;
const DEFAULT_LOOKUP_BITS: usize = 18;
const NUM_INSTANCE_COLUMNS: usize = 1;
const DEFAULT_ADVICE_PER_PHASE: usize = 4;
const DEFAULT_FIXED_COLUMNS: usize = 1;
const DEFAULT_LOOKUP_ADVICE_PER_PHASE: usize = 1;

/// Width of the receipt and of the mapper key, in 128-bit limbs.
pub const LIMB_WIDTH: usize = 4;

const SAMPLE_MAPPER_KEY: [u8; 32] = [0x42; 32];
const SAMPLE_IDENTIFIER: u64 = 1;
const SAMPLE_SECRET: u64 = 2;

pub fn default_params() -> BaseCircuitParams {
    BaseCircuitParams {
        k: DEFAULT_K,
        num_advice_per_phase: vec![DEFAULT_ADVICE_PER_PHASE],
        num_fixed: DEFAULT_FIXED_COLUMNS,
        num_lookup_advice_per_phase: vec![DEFAULT_LOOKUP_ADVICE_PER_PHASE],
        lookup_bits: Some(DEFAULT_LOOKUP_BITS),
        num_instance_columns: NUM_INSTANCE_COLUMNS,
    }
}

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("circuit supports 4-limb receipts and keys, schema has {receipt_len} and {pubkey_len}")]
    UnsupportedSchema {
        receipt_len: usize,
        pubkey_len: usize,
    },
    #[error("signal {signal} missing from signal vector")]
    MissingSignal { signal: String },
    #[error("circuit built for depth {circuit}, input has depth {input}")]
    DepthMismatch { circuit: usize, input: usize },
    #[error("limb of {signal} exceeds 128 bits")]
    OversizedLimb { signal: &'static str },
    #[error("mapper public key coordinate is not a secp256k1 base field element")]
    InvalidPubkeyCoordinate,
    #[error("mapper public key is not on secp256k1")]
    PubkeyNotOnCurve,
    #[error("receipt scalar is not a secp256k1 scalar field element")]
    InvalidSignatureScalar,
    #[error("commitment does not fit the secp256k1 scalar field")]
    InvalidMessageHash,
}

/// Every signal of one attempt, unpacked for witness generation. Private
/// signals are wiped on drop.
#[derive(Clone)]
pub struct MembershipInput {
    source_identifier: SecretField,
    source_secret: SecretField,
    receipt: SecretFields,
    path_elements: SecretFields,
    path_indices: SecretFields,
    accounts_tree_root: SecretField,
    destination_identifier: Fr,
    mapper_pub_key: [Fr; LIMB_WIDTH],
    external_nullifier: Fr,
    nullifier: Fr,
}

impl MembershipInput {
    pub fn from_signals(signals: &Signals) -> Result<Self, CircuitError> {
        let schema = signals.schema();
        if schema.receipt_len() != LIMB_WIDTH || schema.pubkey_len() != LIMB_WIDTH {
            return Err(CircuitError::UnsupportedSchema {
                receipt_len: schema.receipt_len(),
                pubkey_len: schema.pubkey_len(),
            });
        }

        let get = |kind: SignalKind| {
            signals.get(kind).ok_or_else(|| CircuitError::MissingSignal {
                signal: kind.to_string(),
            })
        };
        let limbs = |kind: fn(usize) -> SignalKind| -> Result<[Fr; LIMB_WIDTH], CircuitError> {
            Ok([get(kind(0))?, get(kind(1))?, get(kind(2))?, get(kind(3))?])
        };
        let secrets = |kind: fn(usize) -> SignalKind, len: usize| {
            (0..len)
                .map(|i| get(kind(i)))
                .collect::<Result<SecretFields, CircuitError>>()
        };
        let secret = |kind: SignalKind| get(kind).map(SecretField::new);

        Ok(Self {
            source_identifier: secret(SignalKind::SourceIdentifier)?,
            source_secret: secret(SignalKind::SourceSecret)?,
            receipt: secrets(SignalKind::CommitmentReceipt, LIMB_WIDTH)?,
            path_elements: secrets(SignalKind::PathElement, schema.tree_depth())?,
            path_indices: secrets(SignalKind::PathIndex, schema.tree_depth())?,
            accounts_tree_root: secret(SignalKind::AccountsTreeRoot)?,
            destination_identifier: get(SignalKind::DestinationIdentifier)?,
            mapper_pub_key: limbs(SignalKind::MapperPubKey)?,
            external_nullifier: get(SignalKind::ExternalNullifier)?,
            nullifier: get(SignalKind::Nullifier)?,
        })
    }

    pub fn depth(&self) -> usize {
        self.path_elements.len()
    }

    /// Public signals in schema order.
    pub fn public_signals(&self) -> Vec<Fr> {
        let mut out = Vec::with_capacity(3 + LIMB_WIDTH);
        out.push(self.destination_identifier);
        out.extend_from_slice(&self.mapper_pub_key);
        out.push(self.external_nullifier);
        out.push(self.nullifier);
        out
    }

    pub fn public_instances(&self) -> Vec<Vec<Fr>> {
        instance_columns(&self.public_signals())
    }
}

impl fmt::Debug for MembershipInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipInput")
            .field("depth", &self.depth())
            .field("public", &self.public_signals())
            .finish_non_exhaustive()
    }
}

/// The circuit's single instance column.
pub fn instance_columns(public_signals: &[Fr]) -> Vec<Vec<Fr>> {
    vec![public_signals.to_vec()]
}

#[derive(Clone, Debug)]
pub struct MembershipCircuit {
    pub input: Option<MembershipInput>,
    depth: usize,
    params: BaseCircuitParams,
}

impl Default for MembershipCircuit {
    fn default() -> Self {
        Self::for_profile(&DeploymentProfile::default(), None)
    }
}

impl MembershipCircuit {
    pub fn new(depth: usize, input: Option<MembershipInput>) -> Self {
        Self {
            input,
            depth,
            params: default_params(),
        }
    }

    pub fn for_profile(profile: &DeploymentProfile, input: Option<MembershipInput>) -> Self {
        Self::new(profile.tree_depth, input)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn k(&self) -> u32 {
        self.params.k as u32
    }
}

impl Circuit<Fr> for MembershipCircuit {
    type Config = BaseConfig<Fr>;
    type FloorPlanner = SimpleFloorPlanner;
    type Params = BaseCircuitParams;

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn without_witnesses(&self) -> Self {
        Self {
            input: None,
            depth: self.depth,
            params: self.params.clone(),
        }
    }

    fn configure_with_params(
        meta: &mut ConstraintSystem<Fr>,
        params: Self::Params,
    ) -> Self::Config {
        BaseConfig::configure(meta, params)
    }

    fn configure(_: &mut ConstraintSystem<Fr>) -> Self::Config {
        unreachable!("MembershipCircuit must be configured with explicit parameters")
    }

    fn synthesize(&self, config: Self::Config, layouter: impl Layouter<Fr>) -> Result<(), Error> {
        let stage = if self.input.is_some() {
            CircuitBuilderStage::Mock
        } else {
            CircuitBuilderStage::Keygen
        };

        let sample;
        let input = match self.input.as_ref() {
            Some(input) => input,
            None => {
                sample = sample_input(self.depth).map_err(|err| {
                    warn!(error = %err, "failed to build keygen sample");
                    Error::Synthesis
                })?;
                &sample
            }
        };

        let mut builder = BaseCircuitBuilder::<Fr>::from_stage(stage)
            .use_params(self.params.clone())
            .use_instance_columns(self.params.num_instance_columns);

        if let Some(bits) = self.params.lookup_bits {
            builder = builder.use_lookup_bits(bits);
        }

        build_constraints(&mut builder, self.depth, input).map_err(|err| {
            warn!(error = %err, "membership circuit rejected its witness");
            Error::Synthesis
        })?;
        <BaseCircuitBuilder<Fr> as Circuit<Fr>>::synthesize(&builder, config, layouter)
    }
}

fn build_constraints(
    builder: &mut BaseCircuitBuilder<Fr>,
    depth: usize,
    input: &MembershipInput,
) -> Result<(), CircuitError> {
    if input.depth() != depth {
        return Err(CircuitError::DepthMismatch {
            circuit: depth,
            input: input.depth(),
        });
    }

    let range = builder.range_chip();
    let gate = range.gate();
    let ctx = builder.main(0);

    let source_identifier = ctx.load_witness(input.source_identifier.expose());
    let source_secret = ctx.load_witness(input.source_secret.expose());
    let receipt = ctx.assign_witnesses(input.receipt.iter());
    let path_elements = ctx.assign_witnesses(input.path_elements.iter());
    let path_indices = ctx.assign_witnesses(input.path_indices.iter());
    let accounts_tree_root = ctx.load_witness(input.accounts_tree_root.expose());

    let public: Vec<AssignedValue<Fr>> = ctx.assign_witnesses(input.public_signals());
    let destination_identifier = public[0];
    let mapper_pub_key = &public[1..1 + LIMB_WIDTH];
    let external_nullifier = public[1 + LIMB_WIDTH];
    let nullifier = public[2 + LIMB_WIDTH];

    let poseidon = Poseidon::new(ctx, gate);

    let leaf = compute_commitment(ctx, gate, &poseidon, source_identifier, source_secret);
    let root = compute_root(ctx, gate, &poseidon, leaf, &path_elements, &path_indices);
    ctx.constrain_equal(&root, &accounts_tree_root);

    let computed_nullifier =
        compute_nullifier(ctx, gate, &poseidon, source_secret, external_nullifier);
    ctx.constrain_equal(&computed_nullifier, &nullifier);

    let attestation = MapperAttestation {
        r: LimbPair::load(ctx, &range, receipt[0], receipt[1]),
        s: LimbPair::load(ctx, &range, receipt[2], receipt[3]),
        pubkey_x: LimbPair::load(ctx, &range, mapper_pub_key[0], mapper_pub_key[1]),
        pubkey_y: LimbPair::load(ctx, &range, mapper_pub_key[2], mapper_pub_key[3]),
    };
    verify_mapper_receipt(ctx, &range, &attestation, leaf)?;

    // The destination is bound only through the instance column.
    let _ = destination_identifier;

    builder.assigned_instances[0].extend(public);
    Ok(())
}

/// A valid input of the given depth, used to lay out the circuit at keygen.
pub fn sample_input(depth: usize) -> anyhow::Result<MembershipInput> {
    let source_identifier = Fr::from(SAMPLE_IDENTIFIER);
    let source_secret = Fr::from(SAMPLE_SECRET);
    let external_nullifier = Fr::from(0u64);

    let leaf = commitment(&source_identifier, &source_secret);
    let tree = MerkleTree::from_leaves(depth, &[leaf])?;
    let path = tree
        .path(0)
        .ok_or_else(|| anyhow!("sample tree has no leaf 0"))?;

    let signing_key =
        SigningKey::from_bytes(&SAMPLE_MAPPER_KEY).context("invalid sample mapper key")?;
    let mut digest = FieldBytes::default();
    digest.copy_from_slice(&commitment_message(&leaf));
    let (signature, _): (Signature, _) = signing_key
        .as_nonzero_scalar()
        .try_sign_prehashed_rfc6979::<Sha256>(digest, b"")
        .context("sign sample commitment")?;
    let mapper_pub_key = encode_verifying_key(&VerifyingKey::from(&signing_key))
        .ok_or_else(|| anyhow!("sample mapper key has no affine coordinates"))?;

    Ok(MembershipInput {
        source_identifier: SecretField::new(source_identifier),
        source_secret: SecretField::new(source_secret),
        receipt: SecretFields::from(encode_signature(&signature).as_slice()),
        path_elements: SecretFields::from(path.siblings()),
        path_indices: path.index_bits().into_iter().collect(),
        accounts_tree_root: SecretField::new(tree.root()),
        destination_identifier: Fr::from(0u64),
        mapper_pub_key,
        external_nullifier,
        nullifier: derive_nullifier(&source_secret, &external_nullifier),
    })
}
