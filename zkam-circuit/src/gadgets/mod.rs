// zkam/zkam-circuit/src/gadgets/mod.rs
// Numan Thabit 2025

pub mod ecdsa;
pub mod merkle;
pub mod nullifier;
pub mod poseidon;
