// zkam/zkam-common/src/field.rs
// Numan Thabit 2025

//! BN254 scalar field helpers and the unreduced integer type callers hand us.
//!
//! Every integer entering the system arrives as a [`FieldValue`]: an arbitrary
//! precision magnitude that has **not** been reduced modulo the field prime.
//! Conversion to [`Fr`] is strict, so a value at or above the modulus is
//! reported instead of silently wrapping.

use std::{fmt, str::FromStr};

use halo2curves_axiom::{
    bn256::Fr,
    ff::{Field, PrimeField},
};
use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Decimal representation of the BN254 scalar field modulus.
pub const FIELD_MODULUS_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

const LIMB_BITS: u32 = 128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldValueError {
    #[error("empty integer literal")]
    Empty,
    #[error("invalid {radix} integer literal")]
    InvalidDigits { radix: &'static str },
    #[error("negative integers are not field elements")]
    Negative,
    #[error("JSON numbers must be integers below 2^64; pass larger values as strings")]
    UnrepresentableNumber,
}

/// Unreduced non-negative integer, stored as its minimal big-endian magnitude.
#[derive(Clone, Default, PartialEq, Eq, Hash, Zeroize)]
pub struct FieldValue {
    be: Vec<u8>,
}

impl FieldValue {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }

    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self {
            be: bytes[start..].to_vec(),
        }
    }

    pub fn from_biguint(value: &BigUint) -> Self {
        Self::from_be_bytes(&value.to_bytes_be())
    }

    pub fn from_fr(value: &Fr) -> Self {
        Self::from_be_bytes(&fr_to_be_bytes(value))
    }

    /// Parse a decimal literal, or a hexadecimal one when prefixed with `0x`.
    pub fn parse(literal: &str) -> Result<Self, FieldValueError> {
        let literal = literal.trim();
        if literal.is_empty() {
            return Err(FieldValueError::Empty);
        }
        if literal.starts_with('-') {
            return Err(FieldValueError::Negative);
        }
        let parsed = match literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16)
                .ok_or(FieldValueError::InvalidDigits { radix: "hex" })?,
            None => BigUint::parse_bytes(literal.as_bytes(), 10)
                .ok_or(FieldValueError::InvalidDigits { radix: "decimal" })?,
        };
        Ok(Self::from_biguint(&parsed))
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.be)
    }

    /// Strict conversion: `None` when the value is not below the field modulus.
    pub fn to_fr(&self) -> Option<Fr> {
        if self.be.len() > 32 {
            return None;
        }
        let mut le = [0u8; 32];
        for (dst, src) in le.iter_mut().zip(self.be.iter().rev()) {
            *dst = *src;
        }
        let fr = Option::from(Fr::from_repr(le));
        le.zeroize();
        fr
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldValue({})", self)
    }
}

impl FromStr for FieldValue {
    type Err = FieldValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<Fr> for FieldValue {
    fn from(value: Fr) -> Self {
        Self::from_fr(&value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldValueVisitor;

        impl de::Visitor<'_> for FieldValueVisitor {
            type Value = FieldValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer, as a JSON number or a decimal/0x-hex string")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::from_u64(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v)
                    .map(FieldValue::from_u64)
                    .map_err(|_| E::custom(FieldValueError::Negative))
            }

            fn visit_u128<E>(self, v: u128) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::from_be_bytes(&v.to_be_bytes()))
            }

            fn visit_i128<E>(self, v: i128) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u128::try_from(v)
                    .map(|v| FieldValue::from_be_bytes(&v.to_be_bytes()))
                    .map_err(|_| E::custom(FieldValueError::Negative))
            }

            // serde_json hands over integers past u64 as lossy floats. The
            // digits are gone by now and must not end up in the error.
            fn visit_f64<E>(self, _: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Err(E::custom(FieldValueError::UnrepresentableNumber))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                FieldValue::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// A normalized secret field element, wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretField {
    repr: [u8; 32],
}

impl SecretField {
    pub fn new(value: Fr) -> Self {
        Self {
            repr: fr_to_bytes(&value),
        }
    }

    /// Copy the secret out for a hash evaluation. Callers keep the copy local.
    pub fn expose(&self) -> Fr {
        decode_repr(&self.repr)
    }
}

impl fmt::Debug for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretField(<redacted>)")
    }
}

/// Secret field elements held as canonical encodings, wiped on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretFields {
    reprs: Vec<[u8; 32]>,
}

impl SecretFields {
    pub fn len(&self) -> usize {
        self.reprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reprs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Fr> {
        self.reprs.get(index).map(decode_repr)
    }

    pub fn iter(&self) -> impl Iterator<Item = Fr> + '_ {
        self.reprs.iter().map(decode_repr)
    }

    /// Unprotected copy for APIs that take a slice. Callers keep it local.
    pub fn to_vec(&self) -> Vec<Fr> {
        self.iter().collect()
    }
}

impl FromIterator<Fr> for SecretFields {
    fn from_iter<I: IntoIterator<Item = Fr>>(iter: I) -> Self {
        Self {
            reprs: iter.into_iter().map(|value| fr_to_bytes(&value)).collect(),
        }
    }
}

impl From<&[Fr]> for SecretFields {
    fn from(values: &[Fr]) -> Self {
        values.iter().copied().collect()
    }
}

impl fmt::Debug for SecretFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretFields(<{} redacted>)", self.reprs.len())
    }
}

fn decode_repr(repr: &[u8; 32]) -> Fr {
    Option::from(Fr::from_repr(*repr)).unwrap_or(Fr::ZERO)
}

/// Canonical little-endian encoding, matching `Fr::to_repr`.
pub fn fr_to_bytes(fr: &Fr) -> [u8; 32] {
    let repr = fr.to_repr();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(repr.as_ref());
    bytes
}

pub fn fr_to_be_bytes(fr: &Fr) -> [u8; 32] {
    let mut bytes = fr_to_bytes(fr);
    bytes.reverse();
    bytes
}

pub fn fr_to_u128(fr: &Fr) -> Option<u128> {
    let bytes = fr_to_bytes(fr);
    if bytes[16..].iter().any(|&b| b != 0) {
        return None;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&bytes[..16]);
    Some(u128::from_le_bytes(buf))
}

/// Split a 256-bit big-endian integer into `[high, low]` 128-bit limbs.
pub fn split_u256(be: &[u8; 32]) -> [Fr; 2] {
    let mut hi = [0u8; 16];
    let mut lo = [0u8; 16];
    hi.copy_from_slice(&be[..16]);
    lo.copy_from_slice(&be[16..]);
    [
        Fr::from_u128(u128::from_be_bytes(hi)),
        Fr::from_u128(u128::from_be_bytes(lo)),
    ]
}

/// Inverse of [`split_u256`]; `None` if either limb exceeds 128 bits.
pub fn join_u256(hi: &Fr, lo: &Fr) -> Option<[u8; 32]> {
    let hi = fr_to_u128(hi)?;
    let lo = fr_to_u128(lo)?;
    let mut be = [0u8; 32];
    be[..16].copy_from_slice(&hi.to_be_bytes());
    be[16..].copy_from_slice(&lo.to_be_bytes());
    Some(be)
}

/// `2^128` as a field element, the weight of a high limb.
pub fn limb_shift() -> Fr {
    Fr::from_u128(1u128 << (LIMB_BITS - 1)) * Fr::from(2u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulus_is_out_of_range() {
        let modulus = FieldValue::parse(FIELD_MODULUS_DECIMAL).unwrap();
        assert!(modulus.to_fr().is_none());

        let below = FieldValue::from_biguint(&(modulus.to_biguint() - 1u32));
        assert_eq!(below.to_fr(), Some(-Fr::ONE));
    }

    #[test]
    fn parses_decimal_and_hex() {
        let dec = FieldValue::parse("255").unwrap();
        let hex = FieldValue::parse("0xff").unwrap();
        assert_eq!(dec, hex);
        assert_eq!(dec.to_fr(), Some(Fr::from(255u64)));
        assert_eq!(FieldValue::parse("-1"), Err(FieldValueError::Negative));
        assert!(FieldValue::parse("12a").is_err());
        assert_eq!(FieldValue::parse(" "), Err(FieldValueError::Empty));
    }

    #[test]
    fn leading_zeros_do_not_change_the_value() {
        let padded = FieldValue::from_be_bytes(&[0, 0, 0, 7]);
        assert_eq!(padded, FieldValue::from_u64(7));
        assert_eq!(FieldValue::from_be_bytes(&[0; 40]).to_fr(), Some(Fr::ZERO));
    }

    #[test]
    fn serde_accepts_numbers_and_strings() {
        let from_number: FieldValue = serde_json::from_str("42").unwrap();
        let from_string: FieldValue = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"42\"");
        assert!(serde_json::from_str::<FieldValue>("-3").is_err());
    }

    #[test]
    fn oversized_json_numbers_are_rejected_without_digits() {
        let err = serde_json::from_str::<FieldValue>("123456789012345678901234567890")
            .unwrap_err()
            .to_string();
        assert!(err.contains("as strings"), "{err}");
        assert!(!err.contains("12345"), "{err}");
        assert!(!err.contains("1.23"), "{err}");

        let err = serde_json::from_str::<FieldValue>("2.5").unwrap_err().to_string();
        assert!(!err.contains("2.5"), "{err}");

        let quoted: FieldValue =
            serde_json::from_str("\"123456789012345678901234567890\"").unwrap();
        assert_eq!(quoted.to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn u256_limbs_join_back() {
        let mut be = [0u8; 32];
        for (i, byte) in be.iter_mut().enumerate() {
            *byte = 0xF0 ^ i as u8;
        }
        let [hi, lo] = split_u256(&be);
        assert_eq!(join_u256(&hi, &lo), Some(be));
        assert_eq!(hi * limb_shift() + lo, {
            let mut acc = Fr::ZERO;
            for byte in be.iter() {
                acc = acc * Fr::from(256u64) + Fr::from(*byte as u64);
            }
            acc
        });
    }

    #[test]
    fn oversized_limb_is_rejected() {
        let big = Fr::from_u128(u128::MAX) + Fr::ONE;
        assert!(join_u256(&big, &Fr::ONE).is_none());
    }

    #[test]
    fn secret_field_hides_value() {
        let secret = SecretField::new(Fr::from(99u64));
        assert_eq!(secret.expose(), Fr::from(99u64));
        assert_eq!(format!("{:?}", secret), "SecretField(<redacted>)");
    }

    #[test]
    fn secret_fields_keep_order_and_wipe() {
        let values = [Fr::from(7u64), -Fr::ONE, Fr::ZERO];
        let mut secrets = SecretFields::from(values.as_slice());
        assert_eq!(secrets.to_vec(), values.to_vec());
        assert_eq!(secrets.get(1), Some(-Fr::ONE));
        assert_eq!(secrets.get(3), None);
        assert_eq!(format!("{secrets:?}"), "SecretFields(<3 redacted>)");

        secrets.zeroize();
        assert!(secrets.is_empty());
    }
}
