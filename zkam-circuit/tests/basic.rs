use halo2_proofs_axiom::{dev::MockProver, plonk::Error};
use halo2curves_axiom::bn256::Fr;
use zkam_circuit::{MembershipCircuit, MembershipInput};
use zkam_common::{assemble, FieldValue};
use zkam_test_fixtures::{bump, fixture, mapper_pubkey, mapper_signing_key, Fixture, FixtureBuilder};

fn circuit_input(fixture: &Fixture) -> MembershipInput {
    let signals = assemble(fixture.inputs.clone(), &fixture.profile).unwrap();
    MembershipInput::from_signals(&signals).unwrap()
}

fn run_mock_prover(
    input: MembershipInput,
    instances: Vec<Vec<Fr>>,
) -> Result<MockProver<Fr>, Error> {
    let circuit = MembershipCircuit::new(input.depth(), Some(input));
    MockProver::run(circuit.k(), &circuit, instances)
}

fn is_rejected(fixture: &Fixture) -> bool {
    let input = circuit_input(fixture);
    let instances = input.public_instances();
    match run_mock_prover(input, instances) {
        Ok(prover) => prover.verify().is_err(),
        Err(_) => true,
    }
}

#[test]
fn valid_signals_satisfy_the_circuit() {
    let input = circuit_input(fixture());
    let instances = input.public_instances();
    let prover = run_mock_prover(input, instances).expect("mock prover run");
    prover.assert_satisfied();
}

#[test]
fn wrong_nullifier_fails() {
    let fixture = FixtureBuilder::new()
        .with_public(|p| p.nullifier = bump(&p.nullifier))
        .build();
    assert!(is_rejected(&fixture));
}

#[test]
fn wrong_root_fails() {
    let fixture = FixtureBuilder::new()
        .with_private(|p| p.accounts_tree_root = bump(&p.accounts_tree_root))
        .build();
    assert!(is_rejected(&fixture));
}

#[test]
fn flipped_path_index_fails() {
    let fixture = FixtureBuilder::new()
        .with_private(|p| {
            let flipped = if p.account_merkle_path_indices[0] == FieldValue::zero() {
                FieldValue::from_u64(1)
            } else {
                FieldValue::zero()
            };
            p.account_merkle_path_indices[0] = flipped;
        })
        .build();
    assert!(is_rejected(&fixture));
}

#[test]
fn wrong_signature_fails() {
    let fixture = FixtureBuilder::new()
        .with_private(|p| {
            p.source_commitment_receipt[3] = bump(&p.source_commitment_receipt[3])
        })
        .build();
    assert!(is_rejected(&fixture));
}

#[test]
fn receipt_under_another_mapper_key_fails() {
    let other = mapper_pubkey(&mapper_signing_key(&[8u8; 32]).unwrap()).unwrap();
    let fixture = FixtureBuilder::new()
        .with_public(move |p| {
            p.commitment_mapper_pub_key = other.iter().map(FieldValue::from_fr).collect()
        })
        .build();
    assert!(is_rejected(&fixture));
}

#[test]
fn off_curve_mapper_key_fails() {
    let fixture = FixtureBuilder::new()
        .with_public(|p| {
            p.commitment_mapper_pub_key[1] = bump(&p.commitment_mapper_pub_key[1])
        })
        .build();
    assert!(is_rejected(&fixture));
}

#[test]
fn instances_must_match_the_witness() {
    let input = circuit_input(fixture());
    let mut instances = input.public_instances();
    let last = instances[0].len() - 1;
    instances[0][last] += Fr::from(1u64);
    let prover = run_mock_prover(input, instances).expect("mock prover run");
    assert!(prover.verify().is_err());
}
