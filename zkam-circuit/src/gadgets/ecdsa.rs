// zkam/zkam-circuit/src/gadgets/ecdsa.rs
// Numan Thabit 2025

use halo2_base::{
    gates::{range::RangeChip, GateInstructions, RangeInstructions},
    AssignedValue, Context,
    QuantumCell::Constant,
};
use halo2_ecc::{
    bigint::ProperCrtUint,
    ecc::{ecdsa::ecdsa_verify_no_pubkey_check, EcPoint},
    fields::FieldChip,
    secp256k1::{FpChip as SecpFpChip, FqChip, Secp256k1Chip},
};
use halo2curves_axiom::{
    bn256::Fr,
    ff::PrimeField,
    secp256k1::{Fp, Fq, Secp256k1Affine},
};
use zkam_common::field::{fr_to_be_bytes, fr_to_u128, join_u256};

use crate::CircuitError;

const SECP_LIMB_BITS: usize = 88;
const SECP_NUM_LIMBS: usize = 3;

/// The 128-bit split point falls inside the middle CRT limb.
const MID_LOW_BITS: usize = 128 - SECP_LIMB_BITS;
const MID_HIGH_BITS: usize = SECP_LIMB_BITS - MID_LOW_BITS;

/// secp256k1: y² = x³ + 7
const SECP256K1_B: u64 = 7;

/// A 256-bit value carried as two 128-bit signals, high limb first.
#[derive(Clone, Copy, Debug)]
pub struct LimbPair {
    pub hi: AssignedValue<Fr>,
    pub lo: AssignedValue<Fr>,
}

impl LimbPair {
    /// Range-check both halves to 128 bits.
    pub fn load(
        ctx: &mut Context<Fr>,
        range: &RangeChip<Fr>,
        hi: AssignedValue<Fr>,
        lo: AssignedValue<Fr>,
    ) -> Self {
        range.range_check(ctx, hi, 128);
        range.range_check(ctx, lo, 128);
        Self { hi, lo }
    }

    fn be_bytes(&self, signal: &'static str) -> Result<[u8; 32], CircuitError> {
        join_u256(self.hi.value(), self.lo.value()).ok_or(CircuitError::OversizedLimb { signal })
    }
}

/// Receipt and key limbs of the commitment mapper, as assigned signals.
pub struct MapperAttestation {
    pub r: LimbPair,
    pub s: LimbPair,
    pub pubkey_x: LimbPair,
    pub pubkey_y: LimbPair,
}

/// Verify the mapper's ECDSA receipt over `commitment`.
///
/// The loaded key, `r` and `s` are tied limb-for-limb to their signals; the
/// message scalar is tied to the commitment through its native value, which
/// is exact because the commitment is below both moduli.
pub fn verify_mapper_receipt(
    ctx: &mut Context<Fr>,
    range: &RangeChip<Fr>,
    attestation: &MapperAttestation,
    commitment: AssignedValue<Fr>,
) -> Result<(), CircuitError> {
    let fp_chip = SecpFpChip::new(range, SECP_LIMB_BITS, SECP_NUM_LIMBS);
    let fq_chip = FqChip::new(range, SECP_LIMB_BITS, SECP_NUM_LIMBS);
    let ecc_chip = Secp256k1Chip::new(&fp_chip);

    let x = try_fp_from_bytes(&attestation.pubkey_x.be_bytes("commitmentMapperPubKey")?)
        .ok_or(CircuitError::InvalidPubkeyCoordinate)?;
    let y = try_fp_from_bytes(&attestation.pubkey_y.be_bytes("commitmentMapperPubKey")?)
        .ok_or(CircuitError::InvalidPubkeyCoordinate)?;
    validate_point_on_curve(&x, &y)?;

    let pk = ecc_chip.load_private::<Secp256k1Affine>(ctx, (x, y));
    constrain_pubkey_on_curve(ctx, &fp_chip, &pk);
    bind_limbs(ctx, range, &pk.x, &attestation.pubkey_x);
    bind_limbs(ctx, range, &pk.y, &attestation.pubkey_y);

    let r_val = try_fq_from_bytes(&attestation.r.be_bytes("sourceCommitmentReceipt")?)
        .ok_or(CircuitError::InvalidSignatureScalar)?;
    let s_val = try_fq_from_bytes(&attestation.s.be_bytes("sourceCommitmentReceipt")?)
        .ok_or(CircuitError::InvalidSignatureScalar)?;
    let r = fq_chip.load_private(ctx, r_val);
    let s = fq_chip.load_private(ctx, s_val);
    bind_limbs(ctx, range, &r, &attestation.r);
    bind_limbs(ctx, range, &s, &attestation.s);

    let msghash_val = try_fq_from_bytes(&fr_to_be_bytes(commitment.value()))
        .ok_or(CircuitError::InvalidMessageHash)?;
    let msghash = fq_chip.load_private(ctx, msghash_val);
    ctx.constrain_equal(msghash.native(), &commitment);

    let verified = ecdsa_verify_no_pubkey_check::<Fr, Fp, Fq, Secp256k1Affine>(
        &ecc_chip, ctx, pk, r, s, msghash, 4, 4,
    );
    range.gate().assert_is_const(ctx, &verified, &Fr::one());

    Ok(())
}

/// Constrain `hi * 2^128 + lo` to equal the CRT integer exactly.
///
/// With 88-bit CRT limbs `l0, l1, l2`, split `l1 = a + b * 2^40` so that
/// `lo = l0 + a * 2^88` and `hi = b + l2 * 2^48`. Every term stays far below
/// the native modulus, so the equalities hold over the integers.
fn bind_limbs(
    ctx: &mut Context<Fr>,
    range: &RangeChip<Fr>,
    crt: &ProperCrtUint<Fr>,
    limbs: &LimbPair,
) {
    let gate = range.gate();
    let crt_limbs = crt.limbs();
    let (l0, l1, l2) = (crt_limbs[0], crt_limbs[1], crt_limbs[2]);

    let mid = fr_to_u128(l1.value()).unwrap_or_default();
    let a = ctx.load_witness(Fr::from_u128(mid & ((1u128 << MID_LOW_BITS) - 1)));
    let b = ctx.load_witness(Fr::from_u128(mid >> MID_LOW_BITS));
    range.range_check(ctx, a, MID_LOW_BITS);
    range.range_check(ctx, b, MID_HIGH_BITS);

    let mid_recomposed = gate.mul_add(ctx, b, Constant(pow2(MID_LOW_BITS)), a);
    ctx.constrain_equal(&mid_recomposed, &l1);

    let lo = gate.mul_add(ctx, a, Constant(pow2(SECP_LIMB_BITS)), l0);
    ctx.constrain_equal(&lo, &limbs.lo);

    let hi = gate.mul_add(ctx, l2, Constant(pow2(MID_HIGH_BITS)), b);
    ctx.constrain_equal(&hi, &limbs.hi);
}

fn pow2(bits: usize) -> Fr {
    Fr::from_u128(1u128 << bits)
}

fn validate_point_on_curve(x: &Fp, y: &Fp) -> Result<(), CircuitError> {
    if y.square() != x.square() * x + Fp::from(SECP256K1_B) {
        return Err(CircuitError::PubkeyNotOnCurve);
    }
    Ok(())
}

fn constrain_pubkey_on_curve<'chip>(
    ctx: &mut Context<Fr>,
    fp_chip: &SecpFpChip<'chip, Fr>,
    pk: &EcPoint<Fr, ProperCrtUint<Fr>>,
) {
    let y_squared = fp_chip.mul(ctx, pk.y.clone(), pk.y.clone());
    let x_squared = fp_chip.mul(ctx, pk.x.clone(), pk.x.clone());
    let x_cubed = fp_chip.mul(ctx, x_squared, pk.x.clone());
    let b = fp_chip.load_constant(ctx, Fp::from(SECP256K1_B));
    let rhs = fp_chip.add_no_carry(ctx, x_cubed, b);
    let rhs = fp_chip.carry_mod(ctx, rhs);
    fp_chip.assert_equal(ctx, y_squared, rhs);
}

/// Strict big-endian decode into the secp256k1 scalar field.
pub fn try_fq_from_bytes(bytes: &[u8; 32]) -> Option<Fq> {
    let mut le_bytes = *bytes;
    le_bytes.reverse();
    Fq::from_bytes(&le_bytes).into_option()
}

/// Strict big-endian decode into the secp256k1 base field.
pub fn try_fp_from_bytes(bytes: &[u8; 32]) -> Option<Fp> {
    let mut le_bytes = *bytes;
    le_bytes.reverse();
    Fp::from_bytes(&le_bytes).into_option()
}
