// zkam/zkam-common/src/verifier.rs

//! Relying-party side: re-check the public context, then delegate.

use std::sync::Arc;

use halo2curves_axiom::bn256::Fr;
use tracing::{debug, warn};

use crate::{
    config::DeploymentProfile,
    error::{BackendError, RejectReason},
    orchestrator::{Proof, ProofBundle},
    schema::{names, SignalSchema},
    witness::PublicSignals,
};

/// External verifier for the proving system paired with a [`ProvingBackend`].
///
/// [`ProvingBackend`]: crate::orchestrator::ProvingBackend
pub trait VerifyingBackend: Send + Sync {
    fn verify(&self, proof: &Proof, public_inputs: &[Fr]) -> Result<bool, BackendError>;
}

/// Public values the relying party pins. Unset fields are not compared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpectedContext {
    pub destination_identifier: Option<Fr>,
    pub commitment_mapper_pub_key: Option<Vec<Fr>>,
    pub external_nullifier: Option<Fr>,
}

impl ExpectedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(mut self, value: Fr) -> Self {
        self.destination_identifier = Some(value);
        self
    }

    pub fn mapper_pub_key(mut self, value: Vec<Fr>) -> Self {
        self.commitment_mapper_pub_key = Some(value);
        self
    }

    pub fn external_nullifier(mut self, value: Fr) -> Self {
        self.external_nullifier = Some(value);
        self
    }

    fn check(&self, public: &PublicSignals) -> Result<(), RejectReason> {
        if let Some(expected) = &self.destination_identifier {
            if *expected != public.destination_identifier {
                return Err(RejectReason::ContextMismatch {
                    field: names::DESTINATION_IDENTIFIER,
                });
            }
        }
        if let Some(expected) = &self.commitment_mapper_pub_key {
            if *expected != public.commitment_mapper_pub_key {
                return Err(RejectReason::ContextMismatch {
                    field: names::MAPPER_PUBKEY,
                });
            }
        }
        if let Some(expected) = &self.external_nullifier {
            if *expected != public.external_nullifier {
                return Err(RejectReason::ContextMismatch {
                    field: names::EXTERNAL_NULLIFIER,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl VerifyOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

pub struct ProofVerifier {
    schema: SignalSchema,
    backend: Arc<dyn VerifyingBackend>,
}

impl ProofVerifier {
    pub fn new(profile: &DeploymentProfile, backend: Arc<dyn VerifyingBackend>) -> Self {
        Self {
            schema: profile.schema(),
            backend,
        }
    }

    /// Malformed inputs and context mismatches never reach the backend.
    pub fn verify(&self, bundle: &ProofBundle, expected: &ExpectedContext) -> VerifyOutcome {
        let public = match self.check_public_inputs(bundle) {
            Ok(public) => public,
            Err(reason) => {
                warn!(error = %reason, "rejecting proof bundle before verification");
                return VerifyOutcome::Rejected(reason);
            }
        };

        if let Err(reason) = expected.check(&public) {
            warn!(error = %reason, "proof bundle bound to another context");
            return VerifyOutcome::Rejected(reason);
        }

        match self.backend.verify(&bundle.proof, &public.to_vec()) {
            Ok(true) => {
                debug!(proof_bytes = bundle.proof.len(), "proof accepted");
                VerifyOutcome::Accepted
            }
            Ok(false) => VerifyOutcome::Rejected(RejectReason::VerificationFailed),
            Err(err) => VerifyOutcome::Rejected(RejectReason::Backend(err)),
        }
    }

    fn check_public_inputs(&self, bundle: &ProofBundle) -> Result<PublicSignals, RejectReason> {
        if bundle.schema_version != self.schema.version() {
            return Err(RejectReason::MalformedPublicInputs(format!(
                "schema version {} (expected {})",
                bundle.schema_version,
                self.schema.version()
            )));
        }
        if bundle.schema_fingerprint != self.schema.fingerprint() {
            return Err(RejectReason::MalformedPublicInputs(
                "schema fingerprint does not match this deployment".into(),
            ));
        }
        PublicSignals::from_inputs(&bundle.public_inputs, &self.schema)
            .map_err(|err| RejectReason::MalformedPublicInputs(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::FieldValue, inputs::PublicInputs};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        answer: Result<bool, BackendError>,
        calls: AtomicUsize,
    }

    impl VerifyingBackend for Fixed {
        fn verify(&self, _: &Proof, public_inputs: &[Fr]) -> Result<bool, BackendError> {
            assert_eq!(public_inputs.len(), 7);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn backend(answer: Result<bool, BackendError>) -> Arc<Fixed> {
        Arc::new(Fixed {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn bundle(profile: &DeploymentProfile) -> ProofBundle {
        let v = FieldValue::from_u64;
        let schema = profile.schema();
        ProofBundle {
            schema_version: schema.version(),
            schema_fingerprint: schema.fingerprint(),
            proof: Proof(vec![7; 32]),
            public_inputs: PublicInputs {
                destination_identifier: v(1),
                commitment_mapper_pub_key: vec![v(2), v(3), v(4), v(5)],
                external_nullifier: v(6),
                nullifier: v(7),
            },
        }
    }

    #[test]
    fn accepted_when_context_matches() {
        let profile = DeploymentProfile::with_depth(2);
        let verifier = ProofVerifier::new(&profile, backend(Ok(true)));
        let expected = ExpectedContext::new()
            .destination(Fr::from(1u64))
            .external_nullifier(Fr::from(6u64));
        assert_eq!(verifier.verify(&bundle(&profile), &expected), VerifyOutcome::Accepted);
    }

    #[test]
    fn context_mismatch_skips_backend() {
        let profile = DeploymentProfile::with_depth(2);
        let fixed = backend(Ok(true));
        let verifier = ProofVerifier::new(&profile, fixed.clone());
        let expected = ExpectedContext::new().external_nullifier(Fr::from(99u64));
        let outcome = verifier.verify(&bundle(&profile), &expected);
        assert_eq!(
            outcome,
            VerifyOutcome::Rejected(RejectReason::ContextMismatch {
                field: "externalNullifier"
            })
        );
        assert_eq!(fixed.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_and_failed_are_distinguishable() {
        let profile = DeploymentProfile::with_depth(2);

        let mut truncated = bundle(&profile);
        truncated.public_inputs.commitment_mapper_pub_key.pop();
        let outcome = ProofVerifier::new(&profile, backend(Ok(true)))
            .verify(&truncated, &ExpectedContext::new());
        assert!(outcome.reject_reason().unwrap().is_malformed());

        let outcome = ProofVerifier::new(&profile, backend(Ok(false)))
            .verify(&bundle(&profile), &ExpectedContext::new());
        assert_eq!(
            outcome,
            VerifyOutcome::Rejected(RejectReason::VerificationFailed)
        );
        assert!(!outcome.reject_reason().unwrap().is_malformed());
    }

    #[test]
    fn bundle_for_another_layout_is_malformed() {
        let profile = DeploymentProfile::with_depth(2);
        let other = bundle(&DeploymentProfile::with_depth(3));
        let outcome = ProofVerifier::new(&profile, backend(Ok(true)))
            .verify(&other, &ExpectedContext::new());
        assert!(matches!(
            outcome,
            VerifyOutcome::Rejected(RejectReason::MalformedPublicInputs(_))
        ));
    }

    #[test]
    fn backend_errors_are_reported() {
        let profile = DeploymentProfile::with_depth(2);
        let outcome = ProofVerifier::new(&profile, backend(Err(BackendError::Failed("io".into()))))
            .verify(&bundle(&profile), &ExpectedContext::new());
        assert_eq!(
            outcome,
            VerifyOutcome::Rejected(RejectReason::Backend(BackendError::Failed("io".into())))
        );
    }
}
