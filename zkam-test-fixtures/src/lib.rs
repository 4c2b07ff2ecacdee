//! Deterministic fixtures shared by the zkam crates' tests: a mock commitment
//! mapper, an accounts tree holding the fixture account, and a builder for
//! valid `Inputs` with mutators for corrupting them.

use anyhow::{anyhow, Context, Result};
use halo2curves_axiom::bn256::Fr;
use k256::{
    ecdsa::{hazmat::SignPrimitive, Signature, SigningKey, VerifyingKey},
    FieldBytes,
};
use once_cell::sync::OnceCell;
use sha2::Sha256;
use zkam_common::{
    attestation::{commitment_message, encode_signature, encode_verifying_key},
    commitment, derive_nullifier, DeploymentProfile, FieldValue, Inputs, MerkleTree,
    PrivateInputs, PublicInputs,
};

pub const FIXTURE_DEPTH: usize = 4;
pub const MAPPER_KEY_BYTES: [u8; 32] = [7u8; 32];

pub const BASE_IDENTIFIER: u64 = 0x5eed_0001;
pub const BASE_SECRET: u64 = 0x5ec2_e7ed;
pub const BASE_DESTINATION: u64 = 0xde57_0001;
pub const BASE_EXTERNAL_NULLIFIER: u64 = 31_415;
pub const BASE_LEAF_INDEX: usize = 5;
pub const TREE_POPULATION: usize = 11;

static FIXTURE: OnceCell<Fixture> = OnceCell::new();

/// The default fixture, built once per test binary.
pub fn fixture() -> &'static Fixture {
    FIXTURE.get_or_init(|| FixtureBuilder::new().build())
}

pub fn valid_inputs() -> Inputs {
    fixture().inputs.clone()
}

pub fn mapper_signing_key(bytes: &[u8; 32]) -> Result<SigningKey> {
    SigningKey::from_bytes(bytes).context("invalid mapper signing key bytes")
}

/// `[x_hi, x_lo, y_hi, y_lo]` of the mapper's public key.
pub fn mapper_pubkey(signing_key: &SigningKey) -> Result<[Fr; 4]> {
    encode_verifying_key(&VerifyingKey::from(signing_key))
        .ok_or_else(|| anyhow!("mapper key has no affine coordinates"))
}

/// Sign a commitment the way the commitment mapper does; `[r_hi, r_lo, s_hi, s_lo]`.
pub fn sign_commitment(signing_key: &SigningKey, commitment: &Fr) -> Result<[Fr; 4]> {
    let scalar = signing_key.as_nonzero_scalar();
    let mut digest = FieldBytes::default();
    digest.copy_from_slice(&commitment_message(commitment));
    let (signature, _): (Signature, _) = scalar
        .try_sign_prehashed_rfc6979::<Sha256>(digest, b"")
        .context("sign commitment")?;
    Ok(encode_signature(&signature))
}

/// Values the account half of the witness is derived from.
#[derive(Clone, Debug)]
pub struct AccountCore {
    pub source_identifier: Fr,
    pub source_secret: Fr,
    pub leaf_index: usize,
    /// Total populated leaves, including the fixture account.
    pub population: usize,
}

/// Values the relying party fixes.
#[derive(Clone, Debug)]
pub struct ContextCore {
    pub destination_identifier: Fr,
    pub external_nullifier: Fr,
}

/// A consistent set of inputs plus everything they were derived from.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub inputs: Inputs,
    pub profile: DeploymentProfile,
    pub tree: MerkleTree,
    pub commitment: Fr,
    pub nullifier: Fr,
    pub mapper_pubkey: [Fr; 4],
    pub account: AccountCore,
    pub context: ContextCore,
}

type PrivateMutator = Box<dyn Fn(&mut PrivateInputs)>;
type PublicMutator = Box<dyn Fn(&mut PublicInputs)>;

/// Derives valid inputs from cores, then applies raw mutators on top.
///
/// `with_account`/`with_context` change what the inputs are derived from (the
/// result stays consistent); `with_private`/`with_public` edit the finished
/// inputs (the result is usually invalid).
pub struct FixtureBuilder {
    depth: usize,
    mapper_key: [u8; 32],
    account: AccountCore,
    context: ContextCore,
    private_mutators: Vec<PrivateMutator>,
    public_mutators: Vec<PublicMutator>,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            depth: FIXTURE_DEPTH,
            mapper_key: MAPPER_KEY_BYTES,
            account: AccountCore {
                source_identifier: Fr::from(BASE_IDENTIFIER),
                source_secret: Fr::from(BASE_SECRET),
                leaf_index: BASE_LEAF_INDEX,
                population: TREE_POPULATION,
            },
            context: ContextCore {
                destination_identifier: Fr::from(BASE_DESTINATION),
                external_nullifier: Fr::from(BASE_EXTERNAL_NULLIFIER),
            },
            private_mutators: Vec::new(),
            public_mutators: Vec::new(),
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_mapper_key(mut self, key: [u8; 32]) -> Self {
        self.mapper_key = key;
        self
    }

    pub fn with_account(mut self, f: impl FnOnce(&mut AccountCore)) -> Self {
        f(&mut self.account);
        self
    }

    pub fn with_context(mut self, f: impl FnOnce(&mut ContextCore)) -> Self {
        f(&mut self.context);
        self
    }

    pub fn with_private(mut self, f: impl Fn(&mut PrivateInputs) + 'static) -> Self {
        self.private_mutators.push(Box::new(f));
        self
    }

    pub fn with_public(mut self, f: impl Fn(&mut PublicInputs) + 'static) -> Self {
        self.public_mutators.push(Box::new(f));
        self
    }

    pub fn build(self) -> Fixture {
        self.try_build().expect("failed to build zkam fixture")
    }

    pub fn try_build(self) -> Result<Fixture> {
        let profile = DeploymentProfile::with_depth(self.depth);
        let account = self.account;
        let context = self.context;
        let signing_key = mapper_signing_key(&self.mapper_key)?;

        let leaf = commitment(&account.source_identifier, &account.source_secret);
        let population = account.population.max(account.leaf_index + 1);
        let leaves: Vec<Fr> = (0..population)
            .map(|i| {
                if i == account.leaf_index {
                    leaf
                } else {
                    Fr::from(10_000 + i as u64)
                }
            })
            .collect();
        let tree = MerkleTree::from_leaves(self.depth, &leaves)?;
        let path = tree
            .path(account.leaf_index)
            .ok_or_else(|| anyhow!("leaf {} missing from tree", account.leaf_index))?;

        let receipt = sign_commitment(&signing_key, &leaf)?;
        let pubkey = mapper_pubkey(&signing_key)?;
        let nullifier = derive_nullifier(&account.source_secret, &context.external_nullifier);

        let mut private_inputs = PrivateInputs {
            source_identifier: FieldValue::from_fr(&account.source_identifier),
            source_secret: FieldValue::from_fr(&account.source_secret),
            source_commitment_receipt: receipt.iter().map(FieldValue::from_fr).collect(),
            account_merkle_path_elements: path.siblings().iter().map(FieldValue::from_fr).collect(),
            account_merkle_path_indices: path.index_bits().iter().map(FieldValue::from_fr).collect(),
            accounts_tree_root: FieldValue::from_fr(&tree.root()),
        };
        let mut public_inputs = PublicInputs {
            destination_identifier: FieldValue::from_fr(&context.destination_identifier),
            commitment_mapper_pub_key: pubkey.iter().map(FieldValue::from_fr).collect(),
            external_nullifier: FieldValue::from_fr(&context.external_nullifier),
            nullifier: FieldValue::from_fr(&nullifier),
        };

        for mutate in &self.private_mutators {
            mutate(&mut private_inputs);
        }
        for mutate in &self.public_mutators {
            mutate(&mut public_inputs);
        }

        Ok(Fixture {
            inputs: Inputs::new(private_inputs, public_inputs),
            profile,
            tree,
            commitment: leaf,
            nullifier,
            mapper_pubkey: pubkey,
            account,
            context,
        })
    }
}

impl Fixture {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.inputs).context("encode fixture inputs")
    }
}

/// Add one to a field value; used to corrupt exactly one input.
pub fn bump(value: &FieldValue) -> FieldValue {
    FieldValue::from_biguint(&(value.to_biguint() + 1u32))
}
