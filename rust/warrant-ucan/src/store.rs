use crate::ucan::Ucan;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cid::{
    multihash::{Code, MultihashDigest},
    Cid,
};
use libipld_core::{
    codec::{Codec, Decode, Encode},
    ipld::Ipld,
    raw::RawCodec,
};
use std::{
    collections::HashMap,
    fmt::Debug,
    io::Cursor,
    sync::{Arc, RwLock},
};

/// A content-addressed store for blocks referenced by proof chains. The
/// codec defaults to raw bytes, which is how encoded tokens are addressed.
#[async_trait]
pub trait UcanStore<C: Codec + Default = RawCodec>: Send + Sync {
    /// Read a value from the store by CID, returning `None` when the CID
    /// is not present.
    async fn read<T: Decode<C>>(&self, cid: &Cid) -> Result<Option<T>>;

    /// Write a value to the store, returning the CID it was stored under.
    async fn write<T: Encode<C> + Send + Debug>(&mut self, token: T) -> Result<Cid>;
}

/// Token-oriented helpers over any [`UcanStore`]: tokens go in and come
/// out as JWT strings, stored as raw bytes and addressed by BLAKE3-256.
#[async_trait]
pub trait UcanJwtStore: UcanStore<RawCodec> {
    async fn read_token(&self, cid: &Cid) -> Result<Option<String>> {
        match self.read::<Ipld>(cid).await? {
            Some(Ipld::Bytes(bytes)) => Ok(Some(String::from_utf8(bytes)?)),
            Some(other) => Err(anyhow!("expected token bytes at {cid}, found {other:?}")),
            None => Ok(None),
        }
    }

    async fn write_token(&mut self, token: &str) -> Result<Cid> {
        let ucan = Ucan::try_from(token)?;
        let cid = ucan.to_cid(Code::Blake3_256)?;

        self.write(Ipld::Bytes(token.as_bytes().to_vec())).await?;

        Ok(cid)
    }
}

impl<U> UcanJwtStore for U where U: UcanStore<RawCodec> {}

/// A rudimentary in-memory store, suitable for verifying a proof chain
/// against a set of known tokens supplied by the caller.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    dags: Arc<RwLock<HashMap<Cid, Vec<u8>>>>,
}

#[async_trait]
impl UcanStore for MemoryStore {
    async fn read<T: Decode<RawCodec>>(&self, cid: &Cid) -> Result<Option<T>> {
        let dags = self.dags.read().map_err(|_| anyhow!("poisoned lock"))?;

        Ok(match dags.get(cid) {
            Some(bytes) => Some(T::decode(RawCodec, &mut Cursor::new(bytes))?),
            None => None,
        })
    }

    async fn write<T: Encode<RawCodec> + Send + Debug>(&mut self, token: T) -> Result<Cid> {
        let codec = RawCodec;
        let block = codec.encode(&token)?;
        let cid = Cid::new_v1(codec.into(), Code::Blake3_256.digest(&block));

        let mut dags = self.dags.write().map_err(|_| anyhow!("poisoned lock"))?;
        dags.insert(cid, block);

        Ok(cid)
    }
}
