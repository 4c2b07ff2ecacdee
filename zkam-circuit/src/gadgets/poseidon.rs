// zkam/zkam-circuit/src/gadgets/poseidon.rs
// Numan Thabit 2025

use halo2_base::{
    gates::flex_gate::GateChip,
    poseidon::hasher::{spec::OptimizedPoseidonSpec, PoseidonHasher},
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;
use zkam_common::hash::{
    POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS, POSEIDON_RATE, POSEIDON_T,
};

/// Loads the round constants once; reuse it for every hash in a circuit.
pub struct Poseidon {
    hasher: PoseidonHasher<Fr, POSEIDON_T, POSEIDON_RATE>,
}

impl Poseidon {
    pub fn new(ctx: &mut Context<Fr>, gate: &GateChip<Fr>) -> Self {
        let mut hasher = PoseidonHasher::<Fr, POSEIDON_T, POSEIDON_RATE>::new(poseidon_spec());
        hasher.initialize_consts(ctx, gate);
        Self { hasher }
    }

    pub fn hash_elements(
        &self,
        ctx: &mut Context<Fr>,
        gate: &GateChip<Fr>,
        inputs: &[AssignedValue<Fr>],
    ) -> AssignedValue<Fr> {
        self.hasher.hash_fix_len_array(ctx, gate, inputs)
    }

    pub fn hash2(
        &self,
        ctx: &mut Context<Fr>,
        gate: &GateChip<Fr>,
        left: AssignedValue<Fr>,
        right: AssignedValue<Fr>,
    ) -> AssignedValue<Fr> {
        self.hash_elements(ctx, gate, &[left, right])
    }
}

fn poseidon_spec() -> OptimizedPoseidonSpec<Fr, POSEIDON_T, POSEIDON_RATE> {
    OptimizedPoseidonSpec::new::<POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS, 0>()
}
