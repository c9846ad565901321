use crate::{crypto::KeyMaterial, error::UcanError};
use anyhow::Result;
use std::{collections::BTreeMap, sync::Arc};

pub const DID_PREFIX: &str = "did:";
pub const DID_KEY_PREFIX: &str = "did:key:z";

// Multicodec tags that prefix the raw public key bytes in a did:key.
pub const ED25519_MAGIC_BYTES: &[u8] = &[0xed, 0x01];
pub const P256_MAGIC_BYTES: &[u8] = &[0x80, 0x24];
pub const SECP256K1_MAGIC_BYTES: &[u8] = &[0xe7, 0x01];
pub const X25519_MAGIC_BYTES: &[u8] = &[0xec, 0x01];
pub const BLS12381G2_MAGIC_BYTES: &[u8] = &[0xeb, 0x01];

pub type DidPrefix = &'static [u8];
pub type BytesToKey = fn(Vec<u8>) -> Result<Box<dyn KeyMaterial>>;
pub type KeyConstructors = BTreeMap<DidPrefix, BytesToKey>;
pub type KeyConstructorSlice = [(DidPrefix, BytesToKey)];
pub type KeyCache = BTreeMap<String, Arc<Box<dyn KeyMaterial>>>;

/// Resolves `did:key` strings to [`KeyMaterial`] using a configurable
/// table of multicodec tag to key constructor mappings. Parsed keys are
/// cached by DID so that repeated proof-chain walks do not re-derive them.
pub struct DidParser {
    key_constructors: KeyConstructors,
    key_cache: KeyCache,
}

impl DidParser {
    pub fn new(key_constructors: &KeyConstructorSlice) -> Self {
        DidParser {
            key_constructors: key_constructors.iter().cloned().collect(),
            key_cache: KeyCache::new(),
        }
    }

    pub fn parse(&mut self, did: &str) -> Result<Arc<Box<dyn KeyMaterial>>, UcanError> {
        if !did.starts_with(DID_KEY_PREFIX) {
            return Err(UcanError::InvalidDid(format!(
                "expected a did:key, got {did}"
            )));
        }

        if let Some(key) = self.key_cache.get(did) {
            return Ok(key.clone());
        }

        let did_bytes = bs58::decode(&did[DID_KEY_PREFIX.len()..])
            .into_vec()
            .map_err(|_| UcanError::InvalidDid(format!("{did} is not base58btc")))?;

        if did_bytes.len() < 2 {
            return Err(UcanError::InvalidDid(format!("{did} is too short")));
        }

        let magic_bytes = &did_bytes[0..2];
        let constructor = self.key_constructors.get(magic_bytes).ok_or_else(|| {
            UcanError::InvalidDid(format!(
                "unrecognized multicodec prefix {magic_bytes:02x?} in {did}"
            ))
        })?;

        let key = constructor(Vec::from(&did_bytes[2..]))
            .map_err(|error| UcanError::InvalidDid(format!("{did}: {error}")))?;
        let key = Arc::new(key);

        self.key_cache.insert(did.to_owned(), key.clone());

        Ok(key)
    }
}
