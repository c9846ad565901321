use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;
use warrant_key_support::{decode_did, KeyPair, KeyType};
use warrant_ucan::{crypto::KeyMaterial, error::UcanError};

pub const DID_DOCUMENT_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// How key material is represented inside a DID document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DidFormat {
    /// JSON-LD style: per-algorithm `type` strings and base58 key fields.
    #[default]
    JsonLd,
    /// JOSE style: `JsonWebKey2020` methods carrying JWK key fields.
    Jose,
}

/// A JSON Web Key, restricted to the fields the supported key types use.
/// Public keys live in `x`; private keys add `d`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_base58: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_jwk: Option<Jwk>,
}

impl VerificationMethod {
    /// The key type tag, resolved from the method `type` string or, for
    /// `JsonWebKey2020` methods, from the JWK's curve.
    pub fn resolve_key_type(&self) -> Result<KeyType, UcanError> {
        if self.key_type == "JsonWebKey2020" {
            let jwk = self
                .private_key_jwk
                .as_ref()
                .or(self.public_key_jwk.as_ref())
                .ok_or_else(|| {
                    UcanError::InvalidDid("a JsonWebKey2020 method carries no JWK".into())
                })?;
            KeyType::try_from(jwk.crv.as_str())
        } else {
            KeyType::try_from(self.key_type.as_str())
        }
    }

    pub fn public_key_bytes(&self) -> Result<Option<Vec<u8>>, UcanError> {
        if let Some(encoded) = &self.public_key_base58 {
            return Ok(Some(bs58::decode(encoded).into_vec().map_err(|_| {
                UcanError::InvalidDid("publicKeyBase58 is not base58btc".into())
            })?));
        }

        if let Some(jwk) = &self.public_key_jwk {
            if let Some(x) = &jwk.x {
                return Ok(Some(base64url_decode(x, "publicKeyJwk.x")?));
            }
        }

        Ok(None)
    }

    pub fn private_key_bytes(&self) -> Result<Option<Vec<u8>>, UcanError> {
        if let Some(encoded) = &self.private_key_base58 {
            return Ok(Some(bs58::decode(encoded).into_vec().map_err(|_| {
                UcanError::InvalidDid("privateKeyBase58 is not base58btc".into())
            })?));
        }

        if let Some(jwk) = &self.private_key_jwk {
            // Tolerate exports that put the private scalar in `x`
            if let Some(d) = jwk.d.as_ref().or(jwk.x.as_ref()) {
                return Ok(Some(base64url_decode(d, "privateKeyJwk.d")?));
            }
        }

        Ok(None)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<String>,
}

/// Generate a fresh keypair and wrap it as a DID document that includes
/// the private key material.
pub fn create_did(key_type: KeyType, format: DidFormat) -> DidDocument {
    let key_pair = KeyPair::generate(key_type);
    document_for(&key_pair, format, true)
}

/// Resolve a `did:key` string into a public-only DID document.
pub fn resolve_did(did: &str, format: DidFormat) -> Result<DidDocument, UcanError> {
    let (key_type, public_key) = decode_did(did)?;
    let key_pair = KeyPair::from_public_key(key_type, &public_key)?;
    Ok(document_for(&key_pair, format, false))
}

/// Rebuild a full DID document from an exported verification method. The
/// public key is re-derived from the private key; a contradiction with the
/// supplied public key, `id` or `controller` fails with
/// [`UcanError::KeyMismatch`].
pub fn restore_did(method: &VerificationMethod, format: DidFormat) -> Result<DidDocument, UcanError> {
    let key_pair = key_pair_from_method(method)?;
    let document = document_for(&key_pair, format, true);

    for claimed in [&method.id, &method.controller] {
        let claimed_did = claimed.split('#').next().unwrap_or(claimed);

        if claimed_did.starts_with("did:") && claimed_did != document.id {
            return Err(UcanError::KeyMismatch);
        }
    }

    Ok(document)
}

/// Sign a message with the private key of a verification method, returning
/// the unpadded base64url signature.
pub async fn sign(method: &VerificationMethod, message: &[u8]) -> Result<String, UcanError> {
    let key_pair = key_pair_from_method(method)?;
    let signature = key_pair.sign(message).await?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(signature))
}

/// Check a base64url signature over a message against the public key of a
/// DID. A malformed or mismatched signature yields `Ok(false)`; only an
/// undecodable DID (or a key type with no signature algorithm) errors.
pub async fn verify_signature(
    did: &str,
    message: &[u8],
    signature: &str,
) -> Result<bool, UcanError> {
    let (key_type, public_key) = decode_did(did)?;
    let key_pair = KeyPair::from_public_key(key_type, &public_key)?;

    let Ok(signature) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(signature) else {
        warn!("Signature is not base64url; treating as unverified");
        return Ok(false);
    };

    match key_pair.verify(message, &signature).await {
        Ok(()) => Ok(true),
        Err(error) => match UcanError::from(error) {
            error @ UcanError::NotSigningCapable(_) => Err(error),
            _ => Ok(false),
        },
    }
}

/// Reconstruct the keypair held by an exported verification method.
pub(crate) fn key_pair_from_method(method: &VerificationMethod) -> Result<KeyPair, UcanError> {
    let key_type = method.resolve_key_type()?;
    let private_key = method.private_key_bytes()?.ok_or_else(|| {
        UcanError::InvalidDid("verification method carries no private key".into())
    })?;
    let public_key = method.public_key_bytes()?;

    KeyPair::from_private_key(key_type, &private_key, public_key.as_deref())
}

fn document_for(key_pair: &KeyPair, format: DidFormat, include_secrets: bool) -> DidDocument {
    let key_type = key_pair.key_type();
    let did = key_pair.did();
    let fingerprint = did.trim_start_matches("did:key:").to_owned();
    let method_id = format!("{did}#{fingerprint}");

    let public_key = key_pair.public_key_bytes();
    let private_key = if include_secrets {
        key_pair.private_key_bytes()
    } else {
        None
    };

    let method = match format {
        DidFormat::JsonLd => VerificationMethod {
            id: method_id.clone(),
            key_type: key_type.verification_method_type().to_owned(),
            controller: did.clone(),
            public_key_base58: Some(bs58::encode(&public_key).into_string()),
            public_key_jwk: None,
            private_key_base58: private_key.map(|bytes| bs58::encode(bytes).into_string()),
            private_key_jwk: None,
        },
        DidFormat::Jose => {
            let public_jwk = Jwk {
                kty: key_type.jwk_key_family().to_owned(),
                crv: key_type.jwk_curve().to_owned(),
                x: Some(base64url_encode(&public_key)),
                d: None,
            };

            VerificationMethod {
                id: method_id.clone(),
                key_type: "JsonWebKey2020".to_owned(),
                controller: did.clone(),
                public_key_base58: None,
                public_key_jwk: Some(public_jwk.clone()),
                private_key_base58: None,
                private_key_jwk: private_key.map(|bytes| Jwk {
                    d: Some(base64url_encode(&bytes)),
                    ..public_jwk
                }),
            }
        }
    };

    let mut document = DidDocument {
        context: DID_DOCUMENT_CONTEXT.to_owned(),
        id: did,
        verification_method: vec![method],
        authentication: Vec::new(),
        key_agreement: Vec::new(),
    };

    // X25519 keys are key-agreement keys; everything else authenticates
    if key_type == KeyType::X25519 {
        document.key_agreement.push(method_id);
    } else {
        document.authentication.push(method_id);
    }

    document
}

fn base64url_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn base64url_decode(encoded: &str, field: &str) -> Result<Vec<u8>, UcanError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| UcanError::InvalidDid(format!("{field} is not base64url")))
}
