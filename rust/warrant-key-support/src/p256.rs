use anyhow::{anyhow, Result};
use async_trait::async_trait;
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey as P256PrivateKey, VerifyingKey as P256PublicKey,
};
use warrant_ucan::crypto::{JwtSignatureAlgorithm, KeyMaterial};

pub use warrant_ucan::crypto::did::P256_MAGIC_BYTES;

pub fn bytes_to_p256_key(bytes: Vec<u8>) -> Result<Box<dyn KeyMaterial>> {
    let public_key = P256PublicKey::from_sec1_bytes(&bytes)?;
    Ok(Box::new(P256KeyMaterial(public_key, None)))
}

pub fn bytes_to_p256_private_key(bytes: &[u8]) -> Result<P256KeyMaterial> {
    let private_key = P256PrivateKey::from_slice(bytes)?;
    Ok(P256KeyMaterial(
        P256PublicKey::from(&private_key),
        Some(private_key),
    ))
}

/// NIST P-256 (secp256r1) ECDSA keys; JOSE algorithm ES256. The `did:key`
/// encoding uses the 33-byte compressed SEC1 public key.
#[derive(Clone)]
pub struct P256KeyMaterial(pub P256PublicKey, pub Option<P256PrivateKey>);

#[async_trait]
impl KeyMaterial for P256KeyMaterial {
    fn get_jwt_algorithm_name(&self) -> String {
        JwtSignatureAlgorithm::ES256.to_string()
    }

    async fn get_did(&self) -> Result<String> {
        let bytes = [P256_MAGIC_BYTES, self.0.to_encoded_point(true).as_bytes()].concat();
        Ok(format!("did:key:z{}", bs58::encode(bytes).into_string()))
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        match &self.1 {
            Some(private_key) => {
                let signature: Signature = private_key.sign(payload);
                Ok(signature.to_vec())
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

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::rand_core::OsRng;
    use warrant_ucan::{
        builder::UcanBuilder,
        crypto::did::{DidParser, KeyConstructorSlice},
        ucan::Ucan,
    };

    const SUPPORTED_KEYS: &KeyConstructorSlice = &[(P256_MAGIC_BYTES, bytes_to_p256_key)];

    #[tokio::test]
    async fn it_can_sign_and_verify_a_ucan() {
        let private_key = P256PrivateKey::random(&mut OsRng);
        let key_material = P256KeyMaterial(P256PublicKey::from(&private_key), Some(private_key));

        let token_string = UcanBuilder::default()
            .issued_by(&key_material)
            .for_audience(key_material.get_did().await.unwrap().as_str())
            .with_lifetime(60)
            .build()
            .unwrap()
            .sign()
            .await
            .unwrap()
            .encode()
            .unwrap();

        let mut did_parser = DidParser::new(SUPPORTED_KEYS);

        let ucan = Ucan::try_from(token_string.as_str()).unwrap();
        ucan.check_signature(&mut did_parser).await.unwrap();
    }

    #[tokio::test]
    async fn it_reconstructs_the_key_from_the_private_scalar() {
        let private_key = P256PrivateKey::random(&mut OsRng);
        let public_key = P256PublicKey::from(&private_key);

        let restored = bytes_to_p256_private_key(&private_key.to_bytes()).unwrap();

        assert_eq!(
            restored.0.to_encoded_point(true),
            public_key.to_encoded_point(true)
        );
    }
}
