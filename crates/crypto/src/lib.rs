//! Cryptographic checks the settlement core relies on: exit tree inclusion,
//! the batch proof verifier seam and coordinator authorization recovery.

pub mod bjj_auth;
pub mod groth16;
pub mod smt;
