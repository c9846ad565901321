use anyhow::Result;
use base64::Engine;
use libipld_core::{codec::Codec, serde::to_ipld};
use libipld_json::DagJsonCodec;
use serde::{de::DeserializeOwned, Serialize};

/// Canonical DAG-JSON encoding for any serde-compatible value. Token
/// sections must round-trip byte-for-byte, so all JSON emitted for signing
/// goes through this codec rather than serde_json directly.
pub trait DagJson: Serialize + DeserializeOwned {
    fn to_dag_json(&self) -> Result<Vec<u8>> {
        let ipld = to_ipld(self)?;
        Ok(DagJsonCodec.encode(&ipld)?)
    }

    fn from_dag_json(json_bytes: &[u8]) -> Result<Self> {
        let ipld = DagJsonCodec.decode(json_bytes)?;
        Ok(libipld_core::serde::from_ipld(ipld)?)
    }
}

impl<T> DagJson for T where T: Serialize + DeserializeOwned {}

/// Unpadded base64url framing for JWT sections.
pub trait Base64Encode: DagJson {
    fn jwt_base64_encode(&self) -> Result<String> {
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.to_dag_json()?))
    }
}

impl<T> Base64Encode for T where T: DagJson {}
