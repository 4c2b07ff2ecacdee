// zkam/zkam-verifier/src/lib.rs
// Numan Thabit 2025

use anyhow::Result;
use halo2_proofs_axiom::{
    plonk::{verify_proof, VerifyingKey},
    poly::kzg::{
        commitment::{KZGCommitmentScheme, ParamsKZG},
        multiopen::VerifierGWC,
        strategy::SingleStrategy,
    },
    transcript::{Blake2bRead, Challenge255, TranscriptReadBuffer},
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use tracing::debug;
use zkam_circuit::{
    instance_columns,
    keys::{deserialize_params, deserialize_verifying_key},
};
use zkam_common::{BackendError, Proof, VerifyingBackend};

pub fn verify(
    params: &ParamsKZG<Bn256>,
    vk: &VerifyingKey<G1Affine>,
    proof_bytes: &[u8],
    instances: &[Vec<Fr>],
) -> bool {
    let mut transcript = Blake2bRead::<_, G1Affine, Challenge255<_>>::init(proof_bytes);

    let columns: Vec<&[Fr]> = instances.iter().map(|col| col.as_slice()).collect();
    let prepared_instances = vec![columns.as_slice()];

    verify_proof::<KZGCommitmentScheme<Bn256>, VerifierGWC<'_, Bn256>, _, _, _>(
        params,
        vk,
        SingleStrategy::new(params),
        &prepared_instances,
        &mut transcript,
    )
    .is_ok()
}

/// `VerifyingBackend` checking KZG/GWC proofs against the public signals.
pub struct Halo2Verifier {
    params: ParamsKZG<Bn256>,
    vk: VerifyingKey<G1Affine>,
}

impl Halo2Verifier {
    pub fn new(params: ParamsKZG<Bn256>, vk: VerifyingKey<G1Affine>) -> Self {
        Self { params, vk }
    }

    pub fn from_bytes(params_bytes: &[u8], vk_bytes: &[u8]) -> Result<Self> {
        let params = deserialize_params(params_bytes)?;
        let vk = deserialize_verifying_key(vk_bytes)?;
        Ok(Self::new(params, vk))
    }
}

impl VerifyingBackend for Halo2Verifier {
    fn verify(&self, proof: &Proof, public_signals: &[Fr]) -> Result<bool, BackendError> {
        if proof.is_empty() {
            return Ok(false);
        }
        let accepted = verify(
            &self.params,
            &self.vk,
            proof.as_bytes(),
            &instance_columns(public_signals),
        );
        debug!(accepted, proof_bytes = proof.len(), "proof checked");
        Ok(accepted)
    }
}
