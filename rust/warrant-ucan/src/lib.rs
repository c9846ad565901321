//! Implementation of the core data structures for [UCAN][ucan website]
//! tokens: a JWT-shaped bearer credential that encodes delegated, attenuable
//! capabilities as data.
//!
//! This crate is deliberately storage- and transport-agnostic. It gives you
//! the token codec, a builder, a capability model with pluggable semantics
//! and a proof-chain verifier; concrete key algorithms plug in through the
//! [`crypto::KeyMaterial`] trait.
//!
//! [ucan website]: https://ucan.xyz
//!
//! ```rust
//! use warrant_ucan::{builder::UcanBuilder, crypto::KeyMaterial, error::UcanError};
//!
//! async fn generate_token<K: KeyMaterial>(
//!     issuer_key: &K,
//!     audience_did: &str,
//! ) -> Result<String, UcanError> {
//!     UcanBuilder::default()
//!         .issued_by(issuer_key)
//!         .for_audience(audience_did)
//!         .with_lifetime(60)
//!         .build()?
//!         .sign()
//!         .await?
//!         .encode()
//! }
//! ```

pub mod builder;
pub mod capability;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod key_material;
pub mod serde;
pub mod store;
pub mod time;
pub mod ucan;

pub use self::ucan::Ucan;

#[cfg(test)]
mod tests;
