// zkam/zkam-common/src/orchestrator.rs
// Numan Thabit 2025

//! Proof orchestration: validate, pre-check, then hand the signals to a
//! proving backend under a deadline.
//!
//! ```text
//! Idle -> Validating -> Proving -> Proved
//!              |            |
//!              +----------> Rejected
//! ```

use std::{fmt, sync::Arc, time::Instant};

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tokio::{
    runtime, task,
    time::{timeout_at, Instant as TokioInstant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    commitment::AttestationVerifier,
    config::DeploymentProfile,
    error::{AbortReason, BackendError, ProofError},
    inputs::{Inputs, PublicInputs},
    witness::{Signals, Witness},
};

/// Opaque proof bytes produced by a backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof(pub Vec<u8>);

impl Proof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({} bytes)", self.0.len())
    }
}

/// A proof bound to the public inputs and signal layout it was produced for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub schema_version: u16,
    pub schema_fingerprint: String,
    pub proof: Proof,
    pub public_inputs: PublicInputs,
}

/// External proving system. Implementations should poll `cancel` between
/// expensive phases and return [`BackendError::Cancelled`] once it fires.
pub trait ProvingBackend: Send + Sync + 'static {
    fn prove(&self, signals: &Signals, cancel: &CancellationToken) -> Result<Proof, BackendError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProofState {
    Idle,
    Validating,
    Proving,
    Proved,
    Rejected,
}

impl fmt::Display for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Proving => "proving",
            Self::Proved => "proved",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Outcome of one attempt together with the states it passed through.
#[derive(Debug)]
pub struct ProofAttempt {
    history: Vec<ProofState>,
    result: Result<ProofBundle, ProofError>,
}

impl ProofAttempt {
    pub fn state(&self) -> ProofState {
        self.history.last().copied().unwrap_or(ProofState::Idle)
    }

    pub fn history(&self) -> &[ProofState] {
        &self.history
    }

    pub fn reached(&self, state: ProofState) -> bool {
        self.history.contains(&state)
    }

    pub fn result(&self) -> &Result<ProofBundle, ProofError> {
        &self.result
    }

    pub fn into_result(self) -> Result<ProofBundle, ProofError> {
        self.result
    }
}

struct Transitions {
    history: Vec<ProofState>,
}

impl Transitions {
    fn new() -> Self {
        Self {
            history: vec![ProofState::Idle],
        }
    }

    fn advance(&mut self, next: ProofState) {
        let from = self.history.last().copied().unwrap_or(ProofState::Idle);
        info!(from = %from, to = %next, "proof attempt transition");
        self.history.push(next);
    }

    fn finish(mut self, result: Result<ProofBundle, ProofError>) -> ProofAttempt {
        match &result {
            Ok(_) => self.advance(ProofState::Proved),
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "proof attempt rejected");
                self.advance(ProofState::Rejected);
            }
        }
        ProofAttempt {
            history: self.history,
            result,
        }
    }
}

/// Stateless across attempts; share it behind an `Arc` for parallel use.
pub struct ProofOrchestrator {
    profile: DeploymentProfile,
    attestation: Arc<dyn AttestationVerifier>,
    backend: Arc<dyn ProvingBackend>,
}

impl ProofOrchestrator {
    pub fn new(
        profile: DeploymentProfile,
        attestation: Arc<dyn AttestationVerifier>,
        backend: Arc<dyn ProvingBackend>,
    ) -> Result<Self> {
        profile.validate()?;
        ensure!(
            attestation.scheme() == profile.attestation_scheme,
            "attestation verifier implements {}, profile expects {}",
            attestation.scheme(),
            profile.attestation_scheme
        );
        ensure!(
            attestation.receipt_len() == profile.receipt_len
                && attestation.pubkey_len() == profile.pubkey_len,
            "attestation verifier widths do not match the deployment profile"
        );
        Ok(Self {
            profile,
            attestation,
            backend,
        })
    }

    pub fn profile(&self) -> &DeploymentProfile {
        &self.profile
    }

    pub fn prove(
        &self,
        inputs: Inputs,
        cancel: &CancellationToken,
    ) -> Result<ProofBundle, ProofError> {
        self.attempt(inputs, cancel).into_result()
    }

    /// Run one attempt and keep the state history for inspection.
    ///
    /// Blocks the calling thread on a private runtime; from async code use
    /// [`ProofOrchestrator::attempt_async`] instead.
    pub fn attempt(&self, inputs: Inputs, cancel: &CancellationToken) -> ProofAttempt {
        let runtime = match runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                return Transitions::new().finish(Err(ProofError::BackendFailure(
                    BackendError::Failed(format!("failed to start proving runtime: {err}")),
                )))
            }
        };
        let attempt = runtime.block_on(self.attempt_async(inputs, cancel));
        // An abandoned worker keeps running until the backend notices its token.
        runtime.shutdown_background();
        attempt
    }

    pub async fn prove_async(
        &self,
        inputs: Inputs,
        cancel: &CancellationToken,
    ) -> Result<ProofBundle, ProofError> {
        self.attempt_async(inputs, cancel).await.into_result()
    }

    pub async fn attempt_async(&self, inputs: Inputs, cancel: &CancellationToken) -> ProofAttempt {
        let mut transitions = Transitions::new();

        transitions.advance(ProofState::Validating);
        let signals = match self.validate(inputs) {
            Ok(signals) => signals,
            Err(err) => return transitions.finish(Err(err)),
        };

        if cancel.is_cancelled() {
            return transitions.finish(Err(ProofError::Aborted(AbortReason::Cancelled)));
        }

        transitions.advance(ProofState::Proving);
        let result = self.run_backend(signals, cancel).await;
        transitions.finish(result)
    }

    fn validate(&self, inputs: Inputs) -> Result<Signals, ProofError> {
        let witness = Witness::from_inputs(inputs, &self.profile)?;
        witness.precheck(self.attestation.as_ref())?;
        Ok(witness.signals())
    }

    async fn run_backend(
        &self,
        signals: Signals,
        cancel: &CancellationToken,
    ) -> Result<ProofBundle, ProofError> {
        let schema = signals.schema().clone();
        let public_inputs = signals.public_signals().to_inputs();
        let timeout = self.profile.proving_timeout();
        let worker_token = cancel.child_token();
        let token = worker_token.clone();
        let backend = Arc::clone(&self.backend);
        let started_at = Instant::now();

        // The worker owns the signals; they are wiped when it returns, even
        // after the orchestrator has stopped waiting for it.
        let job = task::spawn_blocking(move || {
            if token.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let result = backend.prove(&signals, &token);
            drop(signals);
            result
        });

        let wait = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ProofError::Aborted(AbortReason::Cancelled)),
                joined = job => match joined {
                    Ok(Ok(proof)) => Ok(proof),
                    Ok(Err(BackendError::Cancelled)) if cancel.is_cancelled() => {
                        Err(ProofError::Aborted(AbortReason::Cancelled))
                    }
                    Ok(Err(err)) => Err(ProofError::BackendFailure(err)),
                    Err(err) => Err(map_join_error(err)),
                },
            }
        };

        let deadline = started_at.checked_add(timeout).map(TokioInstant::from_std);
        let outcome = match deadline {
            Some(deadline) => match timeout_at(deadline, wait).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "proving exceeded timeout");
                    Err(ProofError::Aborted(AbortReason::TimedOut(timeout)))
                }
            },
            None => wait.await,
        };
        if outcome.is_err() {
            worker_token.cancel();
        }
        let proof = outcome?;

        debug!(
            proof_bytes = proof.len(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "backend produced proof"
        );

        Ok(ProofBundle {
            schema_version: schema.version(),
            schema_fingerprint: schema.fingerprint(),
            proof,
            public_inputs,
        })
    }
}

fn map_join_error(err: task::JoinError) -> ProofError {
    let reason = if err.is_panic() {
        "proving worker panicked".to_string()
    } else {
        format!("proving worker did not complete: {err}")
    };
    ProofError::BackendFailure(BackendError::Failed(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attestation::Secp256k1EcdsaVerifier, error::ErrorKind, field::FieldValue,
        inputs::PrivateInputs,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl ProvingBackend for CountingBackend {
        fn prove(&self, _: &Signals, _: &CancellationToken) -> Result<Proof, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Proof(vec![1, 2, 3]))
        }
    }

    fn orchestrator(backend: Arc<dyn ProvingBackend>) -> ProofOrchestrator {
        ProofOrchestrator::new(
            DeploymentProfile::with_depth(2),
            Arc::new(Secp256k1EcdsaVerifier::new()),
            backend,
        )
        .unwrap()
    }

    fn misshaped_inputs() -> Inputs {
        let mut private = PrivateInputs::default();
        private.source_identifier = FieldValue::from_u64(1);
        Inputs::new(private, PublicInputs::default())
    }

    #[test]
    fn rejected_inputs_never_reach_the_backend() {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let attempt = orchestrator(backend.clone())
            .attempt(misshaped_inputs(), &CancellationToken::new());
        assert_eq!(
            attempt.history(),
            &[ProofState::Idle, ProofState::Validating, ProofState::Rejected]
        );
        assert_eq!(
            attempt.result().as_ref().unwrap_err().kind(),
            ErrorKind::ShapeMismatch
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_mismatched_attestation_widths() {
        let mut profile = DeploymentProfile::with_depth(2);
        profile.attestation_scheme = crate::commitment::AttestationScheme::Secp256k1Ecdsa;
        profile.receipt_len = 3;
        let result = ProofOrchestrator::new(
            profile,
            Arc::new(Secp256k1EcdsaVerifier::new()),
            Arc::new(CountingBackend {
                calls: AtomicUsize::new(0),
            }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn proof_debug_hides_bytes() {
        assert_eq!(format!("{:?}", Proof(vec![0xaa; 5])), "Proof(5 bytes)");
    }

    #[test]
    fn orchestrator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProofOrchestrator>();
    }
}
