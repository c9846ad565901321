use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey as Secp256k1PrivateKey, VerifyingKey as Secp256k1PublicKey,
};
use warrant_ucan::crypto::{JwtSignatureAlgorithm, KeyMaterial};

pub use warrant_ucan::crypto::did::SECP256K1_MAGIC_BYTES;

pub fn bytes_to_secp256k1_key(bytes: Vec<u8>) -> Result<Box<dyn KeyMaterial>> {
    let public_key = Secp256k1PublicKey::from_sec1_bytes(&bytes)?;
    Ok(Box::new(Secp256k1KeyMaterial(public_key, None)))
}

pub fn bytes_to_secp256k1_private_key(bytes: &[u8]) -> Result<Secp256k1KeyMaterial> {
    let private_key = Secp256k1PrivateKey::from_slice(bytes)?;
    Ok(Secp256k1KeyMaterial(
        Secp256k1PublicKey::from(&private_key),
        Some(private_key),
    ))
}

/// secp256k1 ECDSA keys; JOSE algorithm ES256K. The `did:key` encoding
/// uses the 33-byte compressed SEC1 public key.
#[derive(Clone)]
pub struct Secp256k1KeyMaterial(pub Secp256k1PublicKey, pub Option<Secp256k1PrivateKey>);

#[async_trait]
impl KeyMaterial for Secp256k1KeyMaterial {
    fn get_jwt_algorithm_name(&self) -> String {
        JwtSignatureAlgorithm::ES256K.to_string()
    }

    async fn get_did(&self) -> Result<String> {
        let bytes = [
            SECP256K1_MAGIC_BYTES,
            self.0.to_encoded_point(true).as_bytes(),
        ]
        .concat();
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
    use k256::elliptic_curve::rand_core::OsRng;
    use warrant_ucan::{
        builder::UcanBuilder,
        crypto::did::{DidParser, KeyConstructorSlice},
        ucan::Ucan,
    };

    const SUPPORTED_KEYS: &KeyConstructorSlice = &[(SECP256K1_MAGIC_BYTES, bytes_to_secp256k1_key)];

    #[tokio::test]
    async fn it_can_sign_and_verify_a_ucan() {
        let private_key = Secp256k1PrivateKey::random(&mut OsRng);
        let key_material =
            Secp256k1KeyMaterial(Secp256k1PublicKey::from(&private_key), Some(private_key));

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
}
