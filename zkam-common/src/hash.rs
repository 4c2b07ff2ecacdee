// zkam/zkam-common/src/hash.rs
// Numan Thabit 2025

//! Native Poseidon over BN254.
//!
//! Uses halo2-base's `OptimizedPoseidonSpec` directly so the output is
//! bit-identical to `PoseidonHasher::hash_fix_len_array` inside the circuit.
//! Every commitment, Merkle node and nullifier in the system goes through
//! [`hash`]; swapping the hash for any single use breaks the circuit.

use halo2_base::poseidon::hasher::spec::OptimizedPoseidonSpec;
use halo2curves_axiom::{bn256::Fr, ff::Field, ff::PrimeField};
use once_cell::sync::Lazy;

use crate::{error::ProofError, field::FieldValue};

pub const POSEIDON_T: usize = 6;
pub const POSEIDON_RATE: usize = 5;
pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

static POSEIDON_SPEC: Lazy<OptimizedPoseidonSpec<Fr, POSEIDON_T, POSEIDON_RATE>> = Lazy::new(|| {
    OptimizedPoseidonSpec::new::<POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS, 0>()
});

/// Poseidon sponge over an arbitrary-length, fixed-at-call-site input.
pub fn hash(inputs: &[Fr]) -> Fr {
    let spec = &*POSEIDON_SPEC;
    let mut state = [Fr::ZERO; POSEIDON_T];
    state[0] = Fr::from_u128(1u128 << 64);

    for chunk in inputs.chunks(POSEIDON_RATE) {
        poseidon_permutation(&mut state, chunk, spec);
    }

    if inputs.len() % POSEIDON_RATE == 0 {
        poseidon_permutation(&mut state, &[], spec);
    }

    state[1]
}

pub fn hash2(left: &Fr, right: &Fr) -> Fr {
    hash(&[*left, *right])
}

/// Hash raw caller integers; fails if any element is not below the modulus.
pub fn hash_values(values: &[FieldValue]) -> Result<Fr, ProofError> {
    let elements = values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            value
                .to_fr()
                .ok_or_else(|| ProofError::out_of_range(format!("hash input[{idx}]")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hash(&elements))
}

fn poseidon_permutation(
    state: &mut [Fr; POSEIDON_T],
    inputs: &[Fr],
    spec: &OptimizedPoseidonSpec<Fr, POSEIDON_T, POSEIDON_RATE>,
) {
    let r_f = spec.r_f() / 2;
    let constants = spec.constants();
    let matrices = spec.mds_matrices();
    let start = constants.start();

    absorb_with_pre_constants(state, inputs, &start[0]);

    for coeffs in start.iter().skip(1).take(r_f - 1) {
        sbox_full(state, coeffs);
        apply_mds(state, matrices.mds().as_ref());
    }

    if let Some(last) = start.last() {
        sbox_full(state, last);
    }
    apply_mds(state, matrices.pre_sparse_mds().as_ref());

    for (constant, sparse) in constants
        .partial()
        .iter()
        .zip(matrices.sparse_matrices().iter())
    {
        sbox_part(state, constant);
        apply_sparse_mds(state, sparse.row(), sparse.col_hat());
    }

    for coeffs in constants.end().iter() {
        sbox_full(state, coeffs);
        apply_mds(state, matrices.mds().as_ref());
    }

    sbox_full(state, &[Fr::ZERO; POSEIDON_T]);
    apply_mds(state, matrices.mds().as_ref());
}

// The padding `1` lands right after the last absorbed element.
fn absorb_with_pre_constants(
    state: &mut [Fr; POSEIDON_T],
    inputs: &[Fr],
    pre_constants: &[Fr; POSEIDON_T],
) {
    debug_assert!(inputs.len() < POSEIDON_T);
    state[0] += pre_constants[0];
    for (idx, input) in inputs.iter().enumerate() {
        state[idx + 1] += *input + pre_constants[idx + 1];
    }

    let offset = inputs.len() + 1;
    for (i, idx) in (offset..POSEIDON_T).enumerate() {
        let mut addend = pre_constants[idx];
        if i == 0 {
            addend += Fr::ONE;
        }
        state[idx] += addend;
    }
}

fn sbox_full(state: &mut [Fr; POSEIDON_T], constants: &[Fr; POSEIDON_T]) {
    for (value, constant) in state.iter_mut().zip(constants.iter()) {
        *value = value.pow_vartime([5]) + constant;
    }
}

fn sbox_part(state: &mut [Fr; POSEIDON_T], constant: &Fr) {
    state[0] = state[0].pow_vartime([5]) + constant;
}

fn apply_mds(state: &mut [Fr; POSEIDON_T], matrix: &[[Fr; POSEIDON_T]; POSEIDON_T]) {
    let current = *state;
    let mut next = [Fr::ZERO; POSEIDON_T];
    for (i, row) in matrix.iter().enumerate() {
        let mut acc = Fr::ZERO;
        for (coeff, value) in row.iter().zip(current.iter()) {
            acc += *coeff * *value;
        }
        next[i] = acc;
    }
    *state = next;
}

fn apply_sparse_mds(
    state: &mut [Fr; POSEIDON_T],
    row: &[Fr; POSEIDON_T],
    col_hat: &[Fr; POSEIDON_RATE],
) {
    let current = *state;
    let mut next = [Fr::ZERO; POSEIDON_T];

    let mut acc = Fr::ZERO;
    for (coeff, value) in row.iter().zip(current.iter()) {
        acc += *coeff * *value;
    }
    next[0] = acc;

    for (i, (coeff, value)) in col_hat.iter().zip(current.iter().skip(1)).enumerate() {
        next[i + 1] = current[0] * *coeff + *value;
    }

    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::field::FIELD_MODULUS_DECIMAL;

    #[test]
    fn hash_is_deterministic() {
        let a = hash2(&Fr::from(1u64), &Fr::from(2u64));
        let b = hash2(&Fr::from(1u64), &Fr::from(2u64));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_order_sensitive() {
        let ab = hash2(&Fr::from(1u64), &Fr::from(2u64));
        let ba = hash2(&Fr::from(2u64), &Fr::from(1u64));
        assert_ne!(ab, ba);
    }

    #[test]
    fn hash_distinguishes_lengths() {
        let one = hash(&[Fr::from(5u64)]);
        let two = hash(&[Fr::from(5u64), Fr::ZERO]);
        assert_ne!(one, two);
    }

    #[test]
    fn rate_multiple_inputs_take_extra_permutation() {
        let five: Vec<Fr> = (1..=5u64).map(Fr::from).collect();
        let six: Vec<Fr> = (1..=6u64).map(Fr::from).collect();
        assert_ne!(hash(&five), hash(&six));
        assert_ne!(hash(&five), hash(&five[..4]));
    }

    #[test]
    fn hash_values_matches_hash() {
        let values = [FieldValue::from_u64(3), FieldValue::from_u64(4)];
        assert_eq!(
            hash_values(&values).unwrap(),
            hash2(&Fr::from(3u64), &Fr::from(4u64))
        );
    }

    #[test]
    fn hash_values_rejects_out_of_range() {
        let values = [
            FieldValue::from_u64(3),
            FieldValue::parse(FIELD_MODULUS_DECIMAL).unwrap(),
        ];
        let err = hash_values(&values).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfFieldRange);
    }
}
