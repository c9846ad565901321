use crate::{
    capability::Capabilities,
    crypto::did::DidParser,
    error::UcanError,
    serde::{Base64Encode, DagJson},
    time::now,
};
use base64::Engine;
use cid::{
    multihash::{Code, MultihashDigest},
    Cid,
};
use libipld_core::{codec::Codec, raw::RawCodec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, str::FromStr};

/// The wire version emitted in the `ucv` field of every issued token.
pub const UCAN_VERSION: &str = "0.10.0-canary";

/// Reserved fact key under which encoded proof tokens may travel inline
/// with the token that references them by CID.
pub const PROOF_FACT_KEY: &str = "prf";

pub type FactsMap = BTreeMap<String, Value>;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UcanHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UcanPayload {
    pub ucv: String,
    pub iss: String,
    pub aud: String,
    pub exp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nnc: Option<String>,
    pub cap: Capabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fct: Option<FactsMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prf: Option<Vec<String>>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Ucan {
    header: UcanHeader,
    payload: UcanPayload,
    signed_data: Vec<u8>,
    signature: Vec<u8>,
}

impl Ucan {
    pub fn new(
        header: UcanHeader,
        payload: UcanPayload,
        signed_data: Vec<u8>,
        signature: Vec<u8>,
    ) -> Self {
        Ucan {
            signed_data,
            header,
            payload,
            signature,
        }
    }

    /// Validate the token's temporal bounds and signature.
    pub async fn validate(
        &self,
        now_time: Option<u64>,
        did_parser: &mut DidParser,
    ) -> Result<(), UcanError> {
        if self.is_expired(now_time) {
            return Err(UcanError::Expired);
        }

        if self.is_too_early() {
            return Err(UcanError::NotYetValid);
        }

        self.check_signature(did_parser).await
    }

    /// Validate the signed data against the issuer's public key, resolved
    /// from the `iss` DID.
    pub async fn check_signature(&self, did_parser: &mut DidParser) -> Result<(), UcanError> {
        let key = did_parser.parse(&self.payload.iss)?;

        key.verify(&self.signed_data, &self.signature)
            .await
            .map_err(|_| UcanError::InvalidSignature)
    }

    /// Produce a base64url-encoded `header.payload.signature` string.
    pub fn encode(&self) -> Result<String, UcanError> {
        let header = self.header.jwt_base64_encode()?;
        let payload = self.payload.jwt_base64_encode()?;
        let signature =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.signature.as_slice());

        Ok(format!("{header}.{payload}.{signature}"))
    }

    /// Whether the token's expiry is in the past, relative to `now_time`
    /// (seconds since the Unix epoch) or the system clock.
    pub fn is_expired(&self, now_time: Option<u64>) -> bool {
        self.payload.exp < now_time.unwrap_or_else(now)
    }

    /// Whether the token's not-before time is still in the future.
    pub fn is_too_early(&self) -> bool {
        match self.payload.nbf {
            Some(nbf) => nbf > now(),
            None => false,
        }
    }

    /// Whether this token's lifetime begins no later than the other's.
    pub fn lifetime_begins_before(&self, other: &Ucan) -> bool {
        match (self.payload.nbf, other.payload.nbf) {
            (Some(nbf), Some(other_nbf)) => nbf <= other_nbf,
            (Some(_), None) => false,
            _ => true,
        }
    }

    /// Whether this token's lifetime ends no earlier than the other's.
    pub fn lifetime_ends_after(&self, other: &Ucan) -> bool {
        self.payload.exp >= other.payload.exp
    }

    /// Whether this token's lifetime fully encompasses the other's.
    pub fn lifetime_encompasses(&self, other: &Ucan) -> bool {
        self.lifetime_begins_before(other) && self.lifetime_ends_after(other)
    }

    /// An encoded parent token carried inline under the reserved `"prf"`
    /// fact, if one was embedded for this CID.
    pub fn embedded_proof(&self, cid: &Cid) -> Option<String> {
        self.payload
            .fct
            .as_ref()
            .and_then(|facts| facts.get(PROOF_FACT_KEY))
            .and_then(|proofs| proofs.get(cid.to_string()))
            .and_then(|token| token.as_str())
            .map(String::from)
    }

    pub fn to_cid(&self, hasher: Code) -> Result<Cid, UcanError> {
        let codec = RawCodec;
        let token = self.encode()?;
        let encoded = codec
            .encode(token.as_bytes())
            .map_err(|error| UcanError::Other(error.into()))?;
        Ok(Cid::new_v1(codec.into(), hasher.digest(&encoded)))
    }

    pub fn header(&self) -> &UcanHeader {
        &self.header
    }

    pub fn payload(&self) -> &UcanPayload {
        &self.payload
    }

    pub fn algorithm(&self) -> &str {
        &self.header.alg
    }

    pub fn issuer(&self) -> &str {
        &self.payload.iss
    }

    pub fn audience(&self) -> &str {
        &self.payload.aud
    }

    pub fn proofs(&self) -> Option<&Vec<String>> {
        self.payload.prf.as_ref()
    }

    pub fn expires_at(&self) -> u64 {
        self.payload.exp
    }

    pub fn not_before(&self) -> Option<u64> {
        self.payload.nbf
    }

    pub fn nonce(&self) -> Option<&String> {
        self.payload.nnc.as_ref()
    }

    pub fn facts(&self) -> Option<&FactsMap> {
        self.payload.fct.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.payload.cap
    }

    pub fn version(&self) -> &str {
        &self.payload.ucv
    }

    pub fn signature(&self) -> &Vec<u8> {
        &self.signature
    }
}

/// Deserialize an encoded UCAN token string into a [`Ucan`]. No signature
/// or temporal validation is performed.
impl FromStr for Ucan {
    type Err = UcanError;

    fn from_str(ucan_token: &str) -> Result<Self, Self::Err> {
        let mut parts = ucan_token.split('.');

        let (Some(header_part), Some(payload_part), Some(signature_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(UcanError::MalformedToken(
                "expected header.payload.signature".into(),
            ));
        };

        let signed_data = format!("{header_part}.{payload_part}");

        let header_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(header_part)
            .map_err(|_| UcanError::MalformedToken("header is not base64url".into()))?;
        let header = UcanHeader::from_dag_json(&header_bytes)
            .map_err(|error| UcanError::MalformedToken(format!("header: {error}")))?;

        let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|_| UcanError::MalformedToken("payload is not base64url".into()))?;
        let payload = UcanPayload::from_dag_json(&payload_bytes)
            .map_err(|error| UcanError::MalformedToken(format!("payload: {error}")))?;

        let signature = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signature_part)
            .map_err(|_| UcanError::MalformedToken("signature is not base64url".into()))?;

        if let Some(nbf) = payload.nbf {
            if nbf > payload.exp {
                return Err(UcanError::MalformedToken(
                    "not-before is later than expiry".into(),
                ));
            }
        }

        Ok(Ucan::new(
            header,
            payload,
            signed_data.into_bytes(),
            signature,
        ))
    }
}

impl TryFrom<&str> for Ucan {
    type Error = UcanError;

    fn try_from(ucan_token: &str) -> Result<Self, Self::Error> {
        Ucan::from_str(ucan_token)
    }
}

impl TryFrom<String> for Ucan {
    type Error = UcanError;

    fn try_from(ucan_token: String) -> Result<Self, Self::Error> {
        Ucan::from_str(ucan_token.as_str())
    }
}
