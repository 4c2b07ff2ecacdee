// zkam/zkam-circuit/src/keys.rs

//! Byte encodings of the KZG parameters and the circuit keys.

use std::io::Cursor;

use anyhow::{Context, Result};
use halo2_proofs_axiom::{
    plonk::{self, Circuit},
    poly::{commitment::Params, kzg::commitment::ParamsKZG},
    SerdeFormat,
};
use halo2curves_axiom::bn256::{Bn256, G1Affine};

use crate::MembershipCircuit;

pub fn serialize_params(params: &ParamsKZG<Bn256>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    params
        .write(&mut buf)
        .context("failed to serialize KZG params")?;
    Ok(buf)
}

pub fn deserialize_params(bytes: &[u8]) -> Result<ParamsKZG<Bn256>> {
    let mut reader = Cursor::new(bytes);
    ParamsKZG::<Bn256>::read(&mut reader).context("failed to deserialize KZG params")
}

pub fn serialize_verifying_key(vk: &plonk::VerifyingKey<G1Affine>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    vk.write(&mut buf, SerdeFormat::Processed)
        .context("failed to serialize verifying key")?;
    Ok(buf)
}

pub fn deserialize_verifying_key(bytes: &[u8]) -> Result<plonk::VerifyingKey<G1Affine>> {
    let params = MembershipCircuit::default().params();
    let mut reader = Cursor::new(bytes);
    plonk::VerifyingKey::read::<_, MembershipCircuit>(&mut reader, SerdeFormat::Processed, params)
        .context("failed to deserialize verifying key")
}

pub fn serialize_proving_key(pk: &plonk::ProvingKey<G1Affine>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    pk.write(&mut buf, SerdeFormat::Processed)
        .context("failed to serialize proving key")?;
    Ok(buf)
}

pub fn deserialize_proving_key(bytes: &[u8]) -> Result<plonk::ProvingKey<G1Affine>> {
    let params = MembershipCircuit::default().params();
    let mut reader = Cursor::new(bytes);
    plonk::ProvingKey::read::<_, MembershipCircuit>(&mut reader, SerdeFormat::Processed, params)
        .context("failed to deserialize proving key")
}
