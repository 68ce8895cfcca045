//! Cryptographic operations for Replica.
//!
//! - `hash`: SHA-256 digests naming downloaded assets

pub mod hash;
