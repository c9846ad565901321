use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The minimum surface a keypair must offer in order to issue and check
/// tokens. Implementations with no private half should still implement
/// [`KeyMaterial::verify`] where the algorithm allows it, and fail `sign`.
#[async_trait]
pub trait KeyMaterial: Send + Sync {
    /// The JWT `alg` name associated with this key material, e.g. `"EdDSA"`.
    fn get_jwt_algorithm_name(&self) -> String;

    /// The `did:key` string associated with the public half of this key.
    async fn get_did(&self) -> Result<String>;

    /// Sign some bytes with the private half of this key.
    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// Verify an alleged signature over some bytes against the public half
    /// of this key.
    async fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()>;
}

#[async_trait]
impl<K> KeyMaterial for Box<K>
where
    K: KeyMaterial + ?Sized,
{
    fn get_jwt_algorithm_name(&self) -> String {
        self.as_ref().get_jwt_algorithm_name()
    }

    async fn get_did(&self) -> Result<String> {
        self.as_ref().get_did().await
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.as_ref().sign(payload).await
    }

    async fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
        self.as_ref().verify(payload, signature).await
    }
}

#[async_trait]
impl<K> KeyMaterial for Arc<K>
where
    K: KeyMaterial + ?Sized,
{
    fn get_jwt_algorithm_name(&self) -> String {
        self.as_ref().get_jwt_algorithm_name()
    }

    async fn get_did(&self) -> Result<String> {
        self.as_ref().get_did().await
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.as_ref().sign(payload).await
    }

    async fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
        self.as_ref().verify(payload, signature).await
    }
}
