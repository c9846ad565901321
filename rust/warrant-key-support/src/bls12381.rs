use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bls12_381::{G2Affine, G2Projective, Scalar};
use ff::Field;
use group::Curve;
use rand::rngs::OsRng;
use warrant_ucan::{crypto::KeyMaterial, error::UcanError};

pub use warrant_ucan::crypto::did::BLS12381G2_MAGIC_BYTES;

pub fn bytes_to_bls12381_key(bytes: Vec<u8>) -> Result<Box<dyn KeyMaterial>> {
    let bytes = <[u8; 96]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow!("a BLS12-381 G2 public key must be 96 bytes"))?;
    let public_key = Option::<G2Affine>::from(G2Affine::from_compressed(&bytes))
        .ok_or_else(|| anyhow!("not a valid BLS12-381 G2 point"))?;
    Ok(Box::new(Bls12381KeyMaterial(public_key, None)))
}

pub fn bytes_to_bls12381_private_key(bytes: &[u8]) -> Result<Bls12381KeyMaterial> {
    let bytes = <[u8; 32]>::try_from(bytes)
        .map_err(|_| anyhow!("a BLS12-381 private key must be 32 bytes"))?;
    let private_key = Option::<Scalar>::from(Scalar::from_bytes(&bytes))
        .ok_or_else(|| anyhow!("not a valid BLS12-381 scalar"))?;
    Ok(Bls12381KeyMaterial(
        derive_public_key(&private_key),
        Some(private_key),
    ))
}

pub fn generate_bls12381_key() -> Bls12381KeyMaterial {
    let private_key = Scalar::random(&mut OsRng);
    Bls12381KeyMaterial(derive_public_key(&private_key), Some(private_key))
}

fn derive_public_key(private_key: &Scalar) -> G2Affine {
    (G2Projective::generator() * private_key).to_affine()
}

/// BLS12-381 keys in the G2 group, for party identification. Signing is
/// deliberately unsupported.
#[derive(Clone)]
pub struct Bls12381KeyMaterial(pub G2Affine, pub Option<Scalar>);

#[async_trait]
impl KeyMaterial for Bls12381KeyMaterial {
    fn get_jwt_algorithm_name(&self) -> String {
        "BLS12381G2".into()
    }

    async fn get_did(&self) -> Result<String> {
        let bytes = [BLS12381G2_MAGIC_BYTES, self.0.to_compressed().as_slice()].concat();
        Ok(format!("did:key:z{}", bs58::encode(bytes).into_string()))
    }

    async fn sign(&self, _payload: &[u8]) -> Result<Vec<u8>> {
        Err(UcanError::NotSigningCapable("BLS12-381-G2".into()).into())
    }

    async fn verify(&self, _payload: &[u8], _signature: &[u8]) -> Result<()> {
        Err(UcanError::NotSigningCapable("BLS12-381-G2".into()).into())
    }
}
