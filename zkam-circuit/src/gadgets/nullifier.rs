// zkam/zkam-circuit/src/gadgets/nullifier.rs
// Numan Thabit 2025

use halo2_base::{gates::flex_gate::GateChip, AssignedValue, Context};
use halo2curves_axiom::bn256::Fr;

use crate::gadgets::poseidon::Poseidon;

pub fn compute_commitment(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    poseidon: &Poseidon,
    source_identifier: AssignedValue<Fr>,
    source_secret: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    poseidon.hash2(ctx, gate, source_identifier, source_secret)
}

pub fn compute_nullifier(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    poseidon: &Poseidon,
    source_secret: AssignedValue<Fr>,
    external_nullifier: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    poseidon.hash2(ctx, gate, source_secret, external_nullifier)
}
