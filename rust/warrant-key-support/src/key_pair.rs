use crate::{
    bls12381::{bytes_to_bls12381_private_key, generate_bls12381_key, Bls12381KeyMaterial},
    p256::{bytes_to_p256_private_key, P256KeyMaterial},
    secp256k1::{bytes_to_secp256k1_private_key, Secp256k1KeyMaterial},
    x25519::{bytes_to_x25519_private_key, X25519KeyMaterial},
};
use anyhow::Result;
use async_trait::async_trait;
use ed25519_dalek::SigningKey as Ed25519PrivateKey;
use k256::ecdsa::{
    SigningKey as Secp256k1PrivateKey, VerifyingKey as Secp256k1PublicKey,
};
use p256::ecdsa::{SigningKey as P256PrivateKey, VerifyingKey as P256PublicKey};
use rand::rngs::OsRng;
use std::fmt;
use warrant_ucan::{
    crypto::{
        did::{
            BLS12381G2_MAGIC_BYTES, DID_KEY_PREFIX, ED25519_MAGIC_BYTES, P256_MAGIC_BYTES,
            SECP256K1_MAGIC_BYTES, X25519_MAGIC_BYTES,
        },
        KeyMaterial,
    },
    error::UcanError,
    key_material::ed25519::{bytes_to_ed25519_private_key, Ed25519KeyMaterial},
};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519PrivateKey};

/// The key algorithms a [`KeyPair`] can be tagged with. Ed25519, P-256 and
/// secp256k1 keys can sign; X25519 and BLS12-381 G2 keys only identify.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyType {
    Ed25519,
    P256,
    Secp256k1,
    X25519,
    Bls12381G2,
}

impl KeyType {
    /// The multicodec tag that prefixes this key type's public bytes in a
    /// `did:key`.
    pub fn multicodec_prefix(&self) -> &'static [u8] {
        match self {
            KeyType::Ed25519 => ED25519_MAGIC_BYTES,
            KeyType::P256 => P256_MAGIC_BYTES,
            KeyType::Secp256k1 => SECP256K1_MAGIC_BYTES,
            KeyType::X25519 => X25519_MAGIC_BYTES,
            KeyType::Bls12381G2 => BLS12381G2_MAGIC_BYTES,
        }
    }

    pub fn from_multicodec_prefix(prefix: &[u8]) -> Option<KeyType> {
        match prefix {
            _ if prefix == ED25519_MAGIC_BYTES => Some(KeyType::Ed25519),
            _ if prefix == P256_MAGIC_BYTES => Some(KeyType::P256),
            _ if prefix == SECP256K1_MAGIC_BYTES => Some(KeyType::Secp256k1),
            _ if prefix == X25519_MAGIC_BYTES => Some(KeyType::X25519),
            _ if prefix == BLS12381G2_MAGIC_BYTES => Some(KeyType::Bls12381G2),
            _ => None,
        }
    }

    /// Whether keys of this type can produce and check signatures.
    pub fn is_signing(&self) -> bool {
        matches!(self, KeyType::Ed25519 | KeyType::P256 | KeyType::Secp256k1)
    }

    /// The length in bytes of this key type's public key encoding.
    pub fn public_key_length(&self) -> usize {
        match self {
            KeyType::Ed25519 | KeyType::X25519 => 32,
            KeyType::P256 | KeyType::Secp256k1 => 33,
            KeyType::Bls12381G2 => 96,
        }
    }

    /// The verification method `type` string used in JSON-LD documents.
    pub fn verification_method_type(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "Ed25519VerificationKey2018",
            KeyType::P256 => "UnsupportedVerificationMethod2020",
            KeyType::Secp256k1 => "EcdsaSecp256k1VerificationKey2019",
            KeyType::X25519 => "X25519KeyAgreementKey2019",
            KeyType::Bls12381G2 => "Bls12381G2Key2020",
        }
    }

    /// The `crv` value used in JWK representations of this key type.
    pub fn jwk_curve(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "Ed25519",
            KeyType::P256 => "P-256",
            KeyType::Secp256k1 => "secp256k1",
            KeyType::X25519 => "X25519",
            KeyType::Bls12381G2 => "Bls12381G2",
        }
    }

    /// The JWK `kty` family this key type belongs to.
    pub fn jwk_key_family(&self) -> &'static str {
        match self {
            KeyType::P256 | KeyType::Secp256k1 => "EC",
            KeyType::Ed25519 | KeyType::X25519 | KeyType::Bls12381G2 => "OKP",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                KeyType::Ed25519 => "Ed25519",
                KeyType::P256 => "P-256",
                KeyType::Secp256k1 => "Secp256k1",
                KeyType::X25519 => "X25519",
                KeyType::Bls12381G2 => "Bls12381G2",
            }
        )
    }
}

/// Key type names as they appear in verification methods and host
/// configuration, including the aliases used by common DID tooling.
impl TryFrom<&str> for KeyType {
    type Error = UcanError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "Ed25519" | "Ed25519VerificationKey2018" => KeyType::Ed25519,
            "P256" | "P-256" | "UnsupportedVerificationMethod2020" => KeyType::P256,
            "Secp256k1" | "secp256k1" | "EcdsaSecp256k1VerificationKey2019" => KeyType::Secp256k1,
            "X25519" | "X25519KeyAgreementKey2019" => KeyType::X25519,
            "Bls12381" | "Bls12381G2" | "BLS12381_G2" | "Bls12381G2Key2020" => KeyType::Bls12381G2,
            _ => return Err(UcanError::UnsupportedKeyType(value.to_string())),
        })
    }
}

/// Encode public key bytes as a `did:key` string for the given key type.
pub fn encode_did(key_type: KeyType, public_key: &[u8]) -> String {
    let bytes = [key_type.multicodec_prefix(), public_key].concat();
    format!("{DID_KEY_PREFIX}{}", bs58::encode(bytes).into_string())
}

/// Decode a `did:key` string into its key type and raw public key bytes.
pub fn decode_did(did: &str) -> Result<(KeyType, Vec<u8>), UcanError> {
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| UcanError::InvalidDid(format!("expected a did:key, got {did}")))?;

    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| UcanError::InvalidDid(format!("{did} is not base58btc")))?;

    if bytes.len() < 2 {
        return Err(UcanError::InvalidDid(format!("{did} is too short")));
    }

    let key_type = KeyType::from_multicodec_prefix(&bytes[0..2]).ok_or_else(|| {
        UcanError::InvalidDid(format!("unrecognized multicodec prefix in {did}"))
    })?;

    let public_key = bytes[2..].to_vec();

    if public_key.len() != key_type.public_key_length() {
        return Err(UcanError::InvalidDid(format!(
            "wrong key length for {key_type} in {did}"
        )));
    }

    Ok((key_type, public_key))
}

/// A keypair of any supported algorithm, possibly public-only. Implements
/// [`KeyMaterial`] by delegating to the tagged concrete material.
#[derive(Clone)]
pub enum KeyPair {
    Ed25519(Ed25519KeyMaterial),
    P256(P256KeyMaterial),
    Secp256k1(Secp256k1KeyMaterial),
    X25519(X25519KeyMaterial),
    Bls12381G2(Bls12381KeyMaterial),
}

impl KeyPair {
    /// Generate a fresh keypair of the given type from the system CSPRNG.
    pub fn generate(key_type: KeyType) -> KeyPair {
        match key_type {
            KeyType::Ed25519 => {
                let private_key = Ed25519PrivateKey::generate(&mut OsRng);
                KeyPair::Ed25519(Ed25519KeyMaterial(
                    private_key.verifying_key(),
                    Some(private_key),
                ))
            }
            KeyType::P256 => {
                let private_key = P256PrivateKey::random(&mut OsRng);
                KeyPair::P256(P256KeyMaterial(
                    P256PublicKey::from(&private_key),
                    Some(private_key),
                ))
            }
            KeyType::Secp256k1 => {
                let private_key = Secp256k1PrivateKey::random(&mut OsRng);
                KeyPair::Secp256k1(Secp256k1KeyMaterial(
                    Secp256k1PublicKey::from(&private_key),
                    Some(private_key),
                ))
            }
            KeyType::X25519 => {
                let private_key = X25519PrivateKey::random_from_rng(OsRng);
                KeyPair::X25519(X25519KeyMaterial(
                    X25519PublicKey::from(&private_key),
                    Some(private_key),
                ))
            }
            KeyType::Bls12381G2 => KeyPair::Bls12381G2(generate_bls12381_key()),
        }
    }

    /// Reconstruct a public-only keypair from raw public key bytes.
    pub fn from_public_key(key_type: KeyType, public_key: &[u8]) -> Result<KeyPair, UcanError> {
        if public_key.len() != key_type.public_key_length() {
            return Err(UcanError::InvalidDid(format!(
                "wrong public key length for {key_type}"
            )));
        }

        let invalid =
            |error: &dyn fmt::Display| UcanError::InvalidDid(format!("{key_type}: {error}"));

        Ok(match key_type {
            KeyType::Ed25519 => {
                let bytes = <[u8; 32]>::try_from(public_key)
                    .map_err(|error| invalid(&error))?;
                let public_key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map_err(|error| invalid(&error))?;
                KeyPair::Ed25519(Ed25519KeyMaterial(public_key, None))
            }
            KeyType::P256 => {
                let public_key = P256PublicKey::from_sec1_bytes(public_key)
                    .map_err(|error| invalid(&error))?;
                KeyPair::P256(P256KeyMaterial(public_key, None))
            }
            KeyType::Secp256k1 => {
                let public_key = Secp256k1PublicKey::from_sec1_bytes(public_key)
                    .map_err(|error| invalid(&error))?;
                KeyPair::Secp256k1(Secp256k1KeyMaterial(public_key, None))
            }
            KeyType::X25519 => {
                let bytes = <[u8; 32]>::try_from(public_key)
                    .map_err(|error| invalid(&error))?;
                KeyPair::X25519(X25519KeyMaterial(X25519PublicKey::from(bytes), None))
            }
            KeyType::Bls12381G2 => {
                let bytes = <[u8; 96]>::try_from(public_key)
                    .map_err(|error| invalid(&error))?;
                let public_key =
                    Option::<bls12_381::G2Affine>::from(bls12_381::G2Affine::from_compressed(
                        &bytes,
                    ))
                    .ok_or_else(|| invalid(&"not a valid G2 point"))?;
                KeyPair::Bls12381G2(Bls12381KeyMaterial(public_key, None))
            }
        })
    }

    /// Reconstruct a full keypair from raw private key bytes. The public
    /// key is re-derived from the private key; when `public_key` is given,
    /// a contradiction with the derived key fails with
    /// [`UcanError::KeyMismatch`].
    pub fn from_private_key(
        key_type: KeyType,
        private_key: &[u8],
        public_key: Option<&[u8]>,
    ) -> Result<KeyPair, UcanError> {
        let key_pair = match key_type {
            KeyType::Ed25519 => {
                KeyPair::Ed25519(bytes_to_ed25519_private_key(private_key.to_vec())?)
            }
            KeyType::P256 => KeyPair::P256(bytes_to_p256_private_key(private_key)?),
            KeyType::Secp256k1 => {
                KeyPair::Secp256k1(bytes_to_secp256k1_private_key(private_key)?)
            }
            KeyType::X25519 => KeyPair::X25519(bytes_to_x25519_private_key(private_key)?),
            KeyType::Bls12381G2 => {
                KeyPair::Bls12381G2(bytes_to_bls12381_private_key(private_key)?)
            }
        };

        if let Some(public_key) = public_key {
            if key_pair.public_key_bytes() != public_key {
                return Err(UcanError::KeyMismatch);
            }
        }

        Ok(key_pair)
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Ed25519(_) => KeyType::Ed25519,
            KeyPair::P256(_) => KeyType::P256,
            KeyPair::Secp256k1(_) => KeyType::Secp256k1,
            KeyPair::X25519(_) => KeyType::X25519,
            KeyPair::Bls12381G2(_) => KeyType::Bls12381G2,
        }
    }

    /// The raw public key bytes, in the same encoding used by `did:key`.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            KeyPair::Ed25519(key) => key.0.as_bytes().to_vec(),
            KeyPair::P256(key) => key.0.to_encoded_point(true).as_bytes().to_vec(),
            KeyPair::Secp256k1(key) => key.0.to_encoded_point(true).as_bytes().to_vec(),
            KeyPair::X25519(key) => key.0.as_bytes().to_vec(),
            KeyPair::Bls12381G2(key) => key.0.to_compressed().to_vec(),
        }
    }

    /// The raw private key bytes, when the private half is present.
    pub fn private_key_bytes(&self) -> Option<Vec<u8>> {
        match self {
            KeyPair::Ed25519(key) => key.1.as_ref().map(|sk| sk.to_bytes().to_vec()),
            KeyPair::P256(key) => key.1.as_ref().map(|sk| sk.to_bytes().to_vec()),
            KeyPair::Secp256k1(key) => key.1.as_ref().map(|sk| sk.to_bytes().to_vec()),
            KeyPair::X25519(key) => key.1.as_ref().map(|sk| sk.to_bytes().to_vec()),
            KeyPair::Bls12381G2(key) => key.1.as_ref().map(|sk| sk.to_bytes().to_vec()),
        }
    }

    /// The `did:key` string for the public half of this keypair.
    pub fn did(&self) -> String {
        encode_did(self.key_type(), &self.public_key_bytes())
    }

    fn key_material(&self) -> &dyn KeyMaterial {
        match self {
            KeyPair::Ed25519(key) => key,
            KeyPair::P256(key) => key,
            KeyPair::Secp256k1(key) => key,
            KeyPair::X25519(key) => key,
            KeyPair::Bls12381G2(key) => key,
        }
    }
}

#[async_trait]
impl KeyMaterial for KeyPair {
    fn get_jwt_algorithm_name(&self) -> String {
        self.key_material().get_jwt_algorithm_name()
    }

    async fn get_did(&self) -> Result<String> {
        self.key_material().get_did().await
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.key_material().sign(payload).await
    }

    async fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<()> {
        self.key_material().verify(payload, signature).await
    }
}
