use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use zkam_common::{
    derive_nullifier, hash2, verify_membership, BackendError, CancellationToken, ErrorKind,
    FieldValue, Fr, MerklePath, MerkleTree, Proof, ProofOrchestrator, ProofState,
    ProvingBackend, Secp256k1EcdsaVerifier, Signals, SignalKind,
};
use zkam_test_fixtures::{bump, fixture, FixtureBuilder};

struct RecordingBackend {
    calls: AtomicUsize,
}

impl RecordingBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

impl ProvingBackend for RecordingBackend {
    fn prove(&self, signals: &Signals, _: &CancellationToken) -> Result<Proof, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(signals.len(), signals.schema().len());
        Ok(Proof(b"recorded".to_vec()))
    }
}

fn orchestrator(backend: Arc<RecordingBackend>) -> ProofOrchestrator {
    ProofOrchestrator::new(
        fixture().profile.clone(),
        Arc::new(Secp256k1EcdsaVerifier::new()),
        backend,
    )
    .unwrap()
}

#[test]
fn depth_two_tree_accepts_only_the_true_path() {
    let c: Vec<Fr> = (1..=4u64).map(|i| Fr::from(i * 111)).collect();
    let tree = MerkleTree::from_leaves(2, &c).unwrap();
    let root = tree.root();
    let elements = vec![c[3], hash2(&c[0], &c[1])];

    let path = MerklePath::new(elements.clone(), &[Fr::from(0u64), Fr::from(1u64)]).unwrap();
    assert!(verify_membership(&c[2], &path, &root));

    let wrong = MerklePath::new(elements, &[Fr::from(1u64), Fr::from(1u64)]).unwrap();
    assert!(!verify_membership(&c[2], &wrong, &root));
}

#[test]
fn nullifier_repeats_within_a_context_only() {
    let secret = Fr::from(424_242u64);
    let n = Fr::from(9u64);
    let n_prime = Fr::from(10u64);
    assert_eq!(derive_nullifier(&secret, &n), derive_nullifier(&secret, &n));
    assert_ne!(derive_nullifier(&secret, &n), derive_nullifier(&secret, &n_prime));
}

#[test]
fn valid_inputs_reach_proving_and_bind_public_inputs() {
    let backend = RecordingBackend::new();
    let attempt = orchestrator(backend.clone())
        .attempt(fixture().inputs.clone(), &CancellationToken::new());

    assert_eq!(
        attempt.history(),
        &[
            ProofState::Idle,
            ProofState::Validating,
            ProofState::Proving,
            ProofState::Proved
        ]
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let bundle = attempt.into_result().unwrap();
    assert_eq!(bundle.public_inputs, fixture().inputs.public_inputs);
    assert_eq!(bundle.schema_version, 1);
    assert_eq!(bundle.schema_fingerprint, fixture().profile.schema().fingerprint());
}

#[test]
fn corrupted_identifier_is_rejected_while_validating() {
    let backend = RecordingBackend::new();
    let inputs = FixtureBuilder::new()
        .with_private(|p| p.source_identifier = bump(&p.source_identifier))
        .build()
        .inputs;
    let attempt = orchestrator(backend.clone()).attempt(inputs, &CancellationToken::new());

    assert!(attempt.reached(ProofState::Validating));
    assert!(!attempt.reached(ProofState::Proving));
    assert_eq!(attempt.state(), ProofState::Rejected);
    assert_eq!(
        attempt.result().as_ref().unwrap_err().kind(),
        ErrorKind::MerkleMismatch
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn each_precheck_reports_its_own_kind() {
    let cases: Vec<(FixtureBuilder, ErrorKind)> = vec![
        (
            FixtureBuilder::new().with_private(|p| p.accounts_tree_root = bump(&p.accounts_tree_root)),
            ErrorKind::MerkleMismatch,
        ),
        (
            FixtureBuilder::new().with_private(|p| {
                p.source_commitment_receipt[3] = bump(&p.source_commitment_receipt[3])
            }),
            ErrorKind::ReceiptInvalid,
        ),
        (
            FixtureBuilder::new().with_public(|p| {
                p.commitment_mapper_pub_key[0] = bump(&p.commitment_mapper_pub_key[0])
            }),
            ErrorKind::ReceiptInvalid,
        ),
        (
            FixtureBuilder::new().with_mapper_key([8u8; 32]).with_public(|p| {
                p.commitment_mapper_pub_key = fixture().inputs.public_inputs.commitment_mapper_pub_key.clone()
            }),
            ErrorKind::ReceiptInvalid,
        ),
        (
            FixtureBuilder::new().with_public(|p| p.nullifier = bump(&p.nullifier)),
            ErrorKind::NullifierMismatch,
        ),
        (
            FixtureBuilder::new().with_public(|p| p.external_nullifier = bump(&p.external_nullifier)),
            ErrorKind::NullifierMismatch,
        ),
        (
            FixtureBuilder::new().with_private(|p| {
                p.account_merkle_path_indices[0] = FieldValue::from_u64(2)
            }),
            ErrorKind::ShapeMismatch,
        ),
    ];

    for (builder, expected) in cases {
        let backend = RecordingBackend::new();
        let err = orchestrator(backend.clone())
            .prove(builder.build().inputs, &CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), expected, "{err}");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn json_inputs_round_trip_through_the_assembler() {
    let json = fixture().to_json().unwrap();
    let inputs = zkam_common::Inputs::from_json(&json).unwrap();
    let signals = zkam_common::assemble(inputs, &fixture().profile).unwrap();
    assert_eq!(signals.get(SignalKind::Nullifier), Some(fixture().nullifier));
    assert_eq!(
        signals.get(SignalKind::AccountsTreeRoot),
        Some(fixture().tree.root())
    );
}
