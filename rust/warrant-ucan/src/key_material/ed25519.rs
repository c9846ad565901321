use crate::crypto::{JwtSignatureAlgorithm, KeyMaterial};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ed25519_dalek::{
    Signature, Signer, SigningKey as Ed25519PrivateKey, Verifier,
    VerifyingKey as Ed25519PublicKey,
};

pub use crate::crypto::did::ED25519_MAGIC_BYTES;

pub fn bytes_to_ed25519_key(bytes: Vec<u8>) -> Result<Box<dyn KeyMaterial>> {
    let bytes = <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow!("an Ed25519 public key must be 32 bytes"))?;
    let public_key = Ed25519PublicKey::from_bytes(&bytes)?;
    Ok(Box::new(Ed25519KeyMaterial(public_key, None)))
}

pub fn bytes_to_ed25519_private_key(bytes: Vec<u8>) -> Result<Ed25519KeyMaterial> {
    let bytes = <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow!("an Ed25519 private key must be 32 bytes"))?;
    let private_key = Ed25519PrivateKey::from_bytes(&bytes);
    Ok(Ed25519KeyMaterial(
        private_key.verifying_key(),
        Some(private_key),
    ))
}

#[derive(Clone)]
pub struct Ed25519KeyMaterial(pub Ed25519PublicKey, pub Option<Ed25519PrivateKey>);

#[async_trait]
impl KeyMaterial for Ed25519KeyMaterial {
    fn get_jwt_algorithm_name(&self) -> String {
        JwtSignatureAlgorithm::EdDSA.to_string()
    }

    async fn get_did(&self) -> Result<String> {
        let bytes = [ED25519_MAGIC_BYTES, self.0.as_bytes().as_slice()].concat();
        Ok(format!("did:key:z{}", bs58::encode(bytes).into_string()))
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        match &self.1 {
            Some(private_key) => {
                let signature: Signature = private_key.sign(payload);
                Ok(signature.to_bytes().to_vec())
            }
            None => Err(anyhow!("no private key; cannot sign")),
        }
    }

    async fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
        let signature = Signature::from_slice(signature)?;
        self.0
            .verify(payload, &signature)
            .map_err(|error| anyhow!("could not verify signature: {error}"))
    }
}
