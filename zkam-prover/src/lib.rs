// zkam/zkam-prover/src/lib.rs
// Numan Thabit 2025

use std::time::Instant;

use anyhow::{Context, Result};
use halo2_proofs_axiom::{
    dev::MockProver,
    plonk::{self, create_proof, keygen_pk, keygen_vk, Error},
    poly::{
        commitment::Params,
        kzg::{
            commitment::{KZGCommitmentScheme, ParamsKZG},
            multiopen::ProverGWC,
        },
    },
    transcript::{Blake2bWrite, Challenge255, TranscriptWriterBuffer},
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use rand::rngs::OsRng;
use tracing::{debug, info, warn};

use zkam_circuit::{
    keys::{deserialize_params, deserialize_proving_key},
    MembershipCircuit, MembershipInput,
};
use zkam_common::{BackendError, CancellationToken, Proof, ProvingBackend, Signals};

pub struct ProverParams {
    pub params: ParamsKZG<Bn256>,
    pub vk: plonk::VerifyingKey<G1Affine>,
    pub pk: plonk::ProvingKey<G1Affine>,
}

/// Fresh (insecure, test-only) KZG setup and keys for a circuit of `depth`.
pub fn setup(k: u32, depth: usize) -> Result<ProverParams> {
    let mut rng = OsRng;
    let params = ParamsKZG::<Bn256>::setup(k, &mut rng);
    let empty_circuit = MembershipCircuit::new(depth, None);
    let vk = keygen_vk(&params, &empty_circuit).context("verifying key generation")?;
    let pk = keygen_pk(&params, vk.clone(), &empty_circuit).context("proving key generation")?;
    Ok(ProverParams { params, vk, pk })
}

/// `ProvingBackend` producing KZG/GWC proofs over a Blake2b transcript.
pub struct Halo2Prover {
    params: ParamsKZG<Bn256>,
    pk: plonk::ProvingKey<G1Affine>,
    depth: usize,
    check_constraints: bool,
}

impl Halo2Prover {
    pub fn new(params: ParamsKZG<Bn256>, pk: plonk::ProvingKey<G1Affine>, depth: usize) -> Self {
        Self {
            params,
            pk,
            depth,
            check_constraints: false,
        }
    }

    pub fn from_bytes(params_bytes: &[u8], pk_bytes: &[u8], depth: usize) -> Result<Self> {
        let params = deserialize_params(params_bytes)?;
        let pk = deserialize_proving_key(pk_bytes)?;
        Ok(Self::new(params, pk, depth))
    }

    /// Run the mock prover before proving so that an unsatisfied witness is
    /// reported instead of yielding a proof that will not verify.
    pub fn with_constraint_check(mut self, enabled: bool) -> Self {
        self.check_constraints = enabled;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn check(&self, circuit: &MembershipCircuit, instances: Vec<Vec<Fr>>) -> Result<(), BackendError> {
        let prover = MockProver::run(self.params_k(), circuit, instances).map_err(synthesis_error)?;
        prover.verify().map_err(|failures| {
            let first = failures
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!(failures = failures.len(), "constraint check failed");
            BackendError::Unsatisfied {
                signal: None,
                reason: format!("{} constraint failures, first: {first}", failures.len()),
            }
        })
    }

    fn params_k(&self) -> u32 {
        self.params.k()
    }
}

impl ProvingBackend for Halo2Prover {
    fn prove(&self, signals: &Signals, cancel: &CancellationToken) -> Result<Proof, BackendError> {
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let depth = signals.schema().tree_depth();
        if depth != self.depth {
            return Err(BackendError::Failed(format!(
                "proving key built for depth {}, signals have depth {depth}",
                self.depth
            )));
        }

        let input = MembershipInput::from_signals(signals)
            .map_err(|err| BackendError::Failed(err.to_string()))?;
        let instances = input.public_instances();
        let circuit = MembershipCircuit::new(self.depth, Some(input));

        if self.check_constraints {
            self.check(&circuit, instances.clone())?;
            debug!("constraint check passed");
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
        }

        let started = Instant::now();
        let proof = create_proof_bytes(&self.params, &self.pk, circuit, &instances)?;
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        info!(
            proof_bytes = proof.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proof created"
        );
        Ok(Proof(proof))
    }
}

fn create_proof_bytes(
    params: &ParamsKZG<Bn256>,
    pk: &plonk::ProvingKey<G1Affine>,
    circuit: MembershipCircuit,
    instances: &[Vec<Fr>],
) -> Result<Vec<u8>, BackendError> {
    let instance_refs: Vec<&[Fr]> = instances.iter().map(|col| col.as_slice()).collect();

    let mut transcript = Blake2bWrite::<_, G1Affine, Challenge255<_>>::init(vec![]);
    create_proof::<KZGCommitmentScheme<Bn256>, ProverGWC<'_, Bn256>, _, _, _, _>(
        params,
        pk,
        &[circuit],
        &[instance_refs.as_slice()],
        OsRng,
        &mut transcript,
    )
    .map_err(synthesis_error)?;
    Ok(transcript.finalize())
}

fn synthesis_error(err: Error) -> BackendError {
    match err {
        Error::Synthesis => BackendError::Unsatisfied {
            signal: None,
            reason: "witness rejected during synthesis".into(),
        },
        other => BackendError::Failed(other.to_string()),
    }
}
