use anyhow::{anyhow, Result};
use async_trait::async_trait;
use warrant_ucan::{crypto::KeyMaterial, error::UcanError};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519PrivateKey};

pub use warrant_ucan::crypto::did::X25519_MAGIC_BYTES;

pub fn bytes_to_x25519_key(bytes: Vec<u8>) -> Result<Box<dyn KeyMaterial>> {
    let bytes = <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow!("an X25519 public key must be 32 bytes"))?;
    Ok(Box::new(X25519KeyMaterial(X25519PublicKey::from(bytes), None)))
}

pub fn bytes_to_x25519_private_key(bytes: &[u8]) -> Result<X25519KeyMaterial> {
    let bytes = <[u8; 32]>::try_from(bytes)
        .map_err(|_| anyhow!("an X25519 private key must be 32 bytes"))?;
    let private_key = X25519PrivateKey::from(bytes);
    Ok(X25519KeyMaterial(
        X25519PublicKey::from(&private_key),
        Some(private_key),
    ))
}

/// X25519 keys identify key-agreement parties. They have no signature
/// algorithm, so `sign` and `verify` always fail.
#[derive(Clone)]
pub struct X25519KeyMaterial(pub X25519PublicKey, pub Option<X25519PrivateKey>);

#[async_trait]
impl KeyMaterial for X25519KeyMaterial {
    fn get_jwt_algorithm_name(&self) -> String {
        "ECDH-ES".into()
    }

    async fn get_did(&self) -> Result<String> {
        let bytes = [X25519_MAGIC_BYTES, self.0.as_bytes().as_slice()].concat();
        Ok(format!("did:key:z{}", bs58::encode(bytes).into_string()))
    }

    async fn sign(&self, _payload: &[u8]) -> Result<Vec<u8>> {
        Err(UcanError::NotSigningCapable("X25519".into()).into())
    }

    async fn verify(&self, _payload: &[u8], _signature: &[u8]) -> Result<()> {
        Err(UcanError::NotSigningCapable("X25519".into()).into())
    }
}
