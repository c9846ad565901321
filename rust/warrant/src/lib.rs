//! An issuance and verification engine for [UCAN][ucan website] tokens.
//!
//! The engine covers the full lifecycle: generating `did:key` identities
//! as DID documents ([`did`]), issuing delegated tokens with attenuated
//! capabilities ([`token::build_token`]), and verifying a presented token
//! against a root issuer, required capabilities and required facts
//! ([`token::verify_token`]). Capability matching follows `/`-separated
//! path segments with single-segment wildcards ([`semantics`]).
//!
//! [ucan website]: https://ucan.xyz
//!
//! ```rust
//! use warrant::{did::{create_did, DidFormat}, KeyType};
//!
//! let document = create_did(KeyType::Ed25519, DidFormat::JsonLd);
//! assert!(document.id.starts_with("did:key:z"));
//! ```

pub mod did;
pub mod semantics;
pub mod token;

pub use warrant_key_support::{decode_did, encode_did, KeyPair, KeyType};
pub use warrant_ucan::error::UcanError;

#[cfg(test)]
mod tests;
