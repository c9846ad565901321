use thiserror::Error;

/// Every way that handling key material, decoding a token or verifying a
/// proof chain can fail. All variants are terminal for the operation that
/// produced them; none imply a retry.
#[derive(Error, Debug)]
pub enum UcanError {
    #[error("unsupported key type {0:?}")]
    UnsupportedKeyType(String),

    #[error("{0} keys identify parties but cannot produce or check signatures")]
    NotSigningCapable(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("derived public key does not match the declared identity")]
    KeyMismatch,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token audience {found:?} does not match expected audience {expected:?}")]
    AudienceMismatch { expected: String, found: String },

    #[error("signature does not verify against the issuer key")]
    InvalidSignature,

    #[error("no proof token found for CID {0}")]
    MissingProof(String),

    #[error("proof chain does not terminate at the root issuer; found {0}")]
    RootIssuerMismatch(String),

    #[error("capability not granted: {0}")]
    CapabilityDenied(String),

    #[error("fact requirement not met: {0}")]
    FactMismatch(String),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for UcanError {
    fn from(error: anyhow::Error) -> Self {
        // Typed errors that crossed an anyhow boundary (for example a
        // NotSigningCapable raised inside a KeyMaterial impl) are recovered
        // rather than flattened into Other.
        match error.downcast::<UcanError>() {
            Ok(error) => error,
            Err(error) => UcanError::Other(error),
        }
    }
}
