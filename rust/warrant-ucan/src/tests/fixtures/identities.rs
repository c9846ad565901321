use crate::{crypto::KeyMaterial, key_material::ed25519::Ed25519KeyMaterial};
use ed25519_dalek::SigningKey as Ed25519PrivateKey;
use rand::rngs::OsRng;

pub struct Identities {
    pub alice_key: Ed25519KeyMaterial,
    pub bob_key: Ed25519KeyMaterial,
    pub mallory_key: Ed25519KeyMaterial,

    pub alice_did: String,
    pub bob_did: String,
    pub mallory_did: String,
}

impl Identities {
    pub async fn new() -> Self {
        let alice_key = generate_ed25519_key();
        let bob_key = generate_ed25519_key();
        let mallory_key = generate_ed25519_key();

        let alice_did = alice_key.get_did().await.unwrap();
        let bob_did = bob_key.get_did().await.unwrap();
        let mallory_did = mallory_key.get_did().await.unwrap();

        Identities {
            alice_key,
            bob_key,
            mallory_key,

            alice_did,
            bob_did,
            mallory_did,
        }
    }

    #[allow(dead_code)]
    pub fn name_for(&self, did: String) -> String {
        match did {
            _ if did == self.alice_did => "alice".into(),
            _ if did == self.bob_did => "bob".into(),
            _ if did == self.mallory_did => "mallory".into(),
            _ => did,
        }
    }
}

pub fn generate_ed25519_key() -> Ed25519KeyMaterial {
    let private_key = Ed25519PrivateKey::generate(&mut OsRng);
    Ed25519KeyMaterial(private_key.verifying_key(), Some(private_key))
}
