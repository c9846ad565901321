//! Concrete key material for warrant tokens. Ed25519, P-256 and secp256k1
//! keys can issue and check tokens; X25519 and BLS12-381 G2 keys only
//! identify parties and refuse to sign.
//!
//! The [`KeyPair`] type tags the five supported algorithms and handles
//! `did:key` encoding and decoding for all of them.

pub mod bls12381;
pub mod p256;
pub mod secp256k1;
pub mod x25519;

mod key_pair;
pub use key_pair::*;

pub use warrant_ucan::key_material::ed25519;
