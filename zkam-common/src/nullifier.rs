// zkam/zkam-common/src/nullifier.rs

use halo2curves_axiom::bn256::Fr;

use crate::hash::hash2;

/// Per-context tag: stable for one secret inside one external nullifier,
/// unlinkable across external nullifiers.
pub fn derive_nullifier(source_secret: &Fr, external_nullifier: &Fr) -> Fr {
    hash2(source_secret, external_nullifier)
}

pub fn verify_nullifier(source_secret: &Fr, external_nullifier: &Fr, claimed: &Fr) -> bool {
    derive_nullifier(source_secret, external_nullifier) == *claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::commitment;

    #[test]
    fn same_secret_and_context_repeat() {
        let secret = Fr::from(0xdead_beefu64);
        let context = Fr::from(77u64);
        let first = derive_nullifier(&secret, &context);
        assert_eq!(first, derive_nullifier(&secret, &context));
        assert!(verify_nullifier(&secret, &context, &first));
    }

    #[test]
    fn contexts_separate() {
        let secret = Fr::from(0xdead_beefu64);
        let n = derive_nullifier(&secret, &Fr::from(77u64));
        let n_prime = derive_nullifier(&secret, &Fr::from(78u64));
        assert_ne!(n, n_prime);
        assert!(!verify_nullifier(&secret, &Fr::from(78u64), &n));
    }

    #[test]
    fn nullifier_is_not_the_commitment() {
        // hash(S, N) against hash(N, S)
        let secret = Fr::from(5u64);
        let context = Fr::from(6u64);
        assert_ne!(
            derive_nullifier(&secret, &context),
            commitment(&context, &secret)
        );
    }
}
