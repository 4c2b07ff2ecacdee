// zkam/zkam-circuit/src/gadgets/merkle.rs

use halo2_base::{
    gates::{flex_gate::GateChip, GateInstructions},
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;

use crate::gadgets::poseidon::Poseidon;

/// Replay an inclusion path. Each index is constrained to a bit; bit 0 keeps
/// the running node on the left, bit 1 swaps it to the right.
pub fn compute_root(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    poseidon: &Poseidon,
    leaf: AssignedValue<Fr>,
    siblings: &[AssignedValue<Fr>],
    index_bits: &[AssignedValue<Fr>],
) -> AssignedValue<Fr> {
    let mut current = leaf;
    for (sibling, bit) in siblings.iter().zip(index_bits.iter()) {
        gate.assert_bit(ctx, *bit);
        let left = gate.select(ctx, *sibling, current, *bit);
        let right = gate.select(ctx, current, *sibling, *bit);
        current = poseidon.hash2(ctx, gate, left, right);
    }
    current
}
