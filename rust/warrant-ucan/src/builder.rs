use crate::{
    capability::Capability,
    crypto::KeyMaterial,
    error::UcanError,
    serde::Base64Encode,
    time::now,
    ucan::{FactsMap, Ucan, UcanHeader, UcanPayload, PROOF_FACT_KEY, UCAN_VERSION},
};
use base64::Engine;
use cid::multihash::Code;
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

/// A signable is a token in the state immediately before signing: all
/// fields are decided, and the next step is [`Signable::sign`].
pub struct Signable<'a, K>
where
    K: KeyMaterial,
{
    pub issuer: &'a K,
    pub audience: String,

    pub capabilities: Vec<Capability>,

    pub expiration: u64,
    pub not_before: Option<u64>,

    pub facts: FactsMap,
    pub proofs: Vec<String>,
    pub add_nonce: bool,
}

impl<'a, K> Signable<'a, K>
where
    K: KeyMaterial,
{
    pub async fn ucan_payload(&self) -> Result<UcanPayload, UcanError> {
        let nonce = match self.add_nonce {
            true => Some(
                base64::engine::general_purpose::URL_SAFE_NO_PAD
                    .encode(rand::thread_rng().gen::<[u8; 32]>()),
            ),
            false => None,
        };

        let facts = if self.facts.is_empty() {
            None
        } else {
            Some(self.facts.clone())
        };

        let proofs = if self.proofs.is_empty() {
            None
        } else {
            Some(self.proofs.clone())
        };

        Ok(UcanPayload {
            ucv: UCAN_VERSION.into(),
            aud: self.audience.clone(),
            iss: self.issuer.get_did().await?,
            exp: self.expiration,
            nbf: self.not_before,
            nnc: nonce,
            cap: self.capabilities.clone().try_into()?,
            fct: facts,
            prf: proofs,
        })
    }

    /// Sign the payload and produce a complete token.
    pub async fn sign(&self) -> Result<Ucan, UcanError> {
        let header = UcanHeader {
            alg: self.issuer.get_jwt_algorithm_name(),
            typ: "JWT".into(),
        };
        let payload = self.ucan_payload().await?;

        let header_base64 = header.jwt_base64_encode()?;
        let payload_base64 = payload.jwt_base64_encode()?;

        let data_to_sign = format!("{header_base64}.{payload_base64}")
            .as_bytes()
            .to_vec();
        let signature = self.issuer.sign(data_to_sign.as_slice()).await?;

        Ok(Ucan::new(header, payload, data_to_sign, signature))
    }
}

/// A builder API for UCAN tokens.
#[derive(Clone)]
pub struct UcanBuilder<'a, K>
where
    K: KeyMaterial,
{
    issuer: Option<&'a K>,
    audience: Option<String>,

    capabilities: Vec<Capability>,

    lifetime: Option<u64>,
    expiration: Option<u64>,
    not_before: Option<u64>,

    facts: FactsMap,
    proofs: Vec<String>,
    add_nonce: bool,
    add_proof_facts: bool,
}

impl<'a, K> Default for UcanBuilder<'a, K>
where
    K: KeyMaterial,
{
    /// Create an empty builder. Before finalizing the builder, you must set
    /// at least the issuer, the audience and an expiry.
    fn default() -> Self {
        UcanBuilder {
            issuer: None,
            audience: None,

            capabilities: Vec::new(),

            lifetime: None,
            expiration: None,
            not_before: None,

            facts: FactsMap::new(),
            proofs: Vec::new(),
            add_nonce: false,
            add_proof_facts: false,
        }
    }
}

impl<'a, K> UcanBuilder<'a, K>
where
    K: KeyMaterial,
{
    /// The issuer of the token, who signs it with their private key.
    pub fn issued_by(mut self, issuer: &'a K) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// The DID of the party the token is delegated or presented to.
    pub fn for_audience(mut self, audience: &str) -> Self {
        self.audience = Some(String::from(audience));
        self
    }

    /// The number of seconds into the future (relative to when this is
    /// called) that the token should expire.
    pub fn with_lifetime(mut self, seconds: u64) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    /// An absolute expiry, in seconds since the Unix epoch.
    pub fn with_expiration(mut self, timestamp: u64) -> Self {
        self.expiration = Some(timestamp);
        self
    }

    /// The point in time at which the token becomes valid.
    pub fn not_before(mut self, timestamp: u64) -> Self {
        self.not_before = Some(timestamp);
        self
    }

    /// Add a fact or proof of knowledge to this token.
    pub fn with_fact<T: Serialize + DeserializeOwned>(mut self, key: &str, fact: T) -> Self {
        match serde_json::to_value(fact) {
            Ok(value) => {
                self.facts.insert(key.to_owned(), value);
            }
            Err(error) => tracing::warn!("could not add fact to token: {}", error),
        }
        self
    }

    /// Add a batch of facts to this token.
    pub fn with_facts<T: Serialize + DeserializeOwned + Clone>(
        mut self,
        facts: &[(String, T)],
    ) -> Self {
        for (key, fact) in facts {
            self = self.with_fact(key, fact.clone());
        }
        self
    }

    /// Include a random nonce in the token, guaranteeing a distinct CID
    /// even when every other field matches an existing token.
    pub fn with_nonce(mut self) -> Self {
        self.add_nonce = true;
        self
    }

    /// Also embed the encoded bytes of every witnessing proof under the
    /// reserved `"prf"` fact, keyed by CID, so that verifiers can resolve
    /// the chain without any out-of-band token store.
    pub fn with_add_proof_facts(mut self, add_proof_facts: bool) -> Self {
        self.add_proof_facts = add_proof_facts;
        self
    }

    /// Includes a UCAN in the list of proofs for the token to be built.
    /// Note that the proof's audience must match this token's issuer.
    pub fn witnessed_by(mut self, authority: &Ucan, hasher: Option<Code>) -> Self {
        match authority.to_cid(hasher.unwrap_or(Self::default_hasher())) {
            Ok(proof) => {
                self.proofs.push(proof.to_string());

                if self.add_proof_facts {
                    self = self.insert_proof_fact(&proof.to_string(), authority);
                }
            }
            Err(error) => tracing::warn!("could not add authority to proofs: {}", error),
        }

        self
    }

    /// Includes a batch of UCANs in the list of proofs for the token to be
    /// built.
    pub fn with_proofs(mut self, proofs: &[Ucan], hasher: Option<Code>) -> Self {
        for proof in proofs {
            self = self.witnessed_by(proof, hasher);
        }
        self
    }

    /// Delegate all capabilities from a given proof to the audience of the
    /// token being built, via the `ucan:<cid>` resource.
    pub fn delegating_from(mut self, authority: &Ucan, hasher: Option<Code>) -> Self {
        match authority.to_cid(hasher.unwrap_or(Self::default_hasher())) {
            Ok(cid) => {
                self.proofs.push(cid.to_string());

                if self.add_proof_facts {
                    self = self.insert_proof_fact(&cid.to_string(), authority);
                }

                let capability = Capability::new(
                    format!("ucan:{cid}"),
                    "ucan/*".to_string(),
                    json!({}),
                );
                self.capabilities.push(capability);
            }
            Err(error) => tracing::warn!("could not encode authority to delegate from it: {}", error),
        }

        self
    }

    /// The default hasher used for the CIDs of proof references.
    pub fn default_hasher() -> Code {
        Code::Blake3_256
    }

    /// Claim a capability by inheritance (from an authorizing proof) or
    /// implicitly by ownership of the resource (eg. because you own the
    /// private key of the resource's DID).
    pub fn claiming_capability<C>(mut self, capability: C) -> Self
    where
        C: Into<Capability>,
    {
        self.capabilities.push(capability.into());
        self
    }

    /// Claim a batch of capabilities.
    pub fn claiming_capabilities<C>(mut self, capabilities: &[C]) -> Self
    where
        C: Into<Capability> + Clone,
    {
        for capability in capabilities {
            self = self.claiming_capability(capability.clone());
        }
        self
    }

    fn insert_proof_fact(mut self, cid_string: &str, authority: &Ucan) -> Self {
        let encoded = match authority.encode() {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::warn!("could not embed proof token in facts: {}", error);
                return self;
            }
        };

        match self.facts.get_mut(PROOF_FACT_KEY) {
            Some(Value::Object(proofs)) => {
                proofs.insert(cid_string.to_owned(), Value::String(encoded));
            }
            _ => {
                self.facts.insert(
                    PROOF_FACT_KEY.to_owned(),
                    json!({ cid_string: encoded }),
                );
            }
        }

        self
    }

    fn implied_expiration(&self) -> Option<u64> {
        match (self.expiration, self.lifetime) {
            (Some(expiration), _) => Some(expiration),
            (None, Some(lifetime)) => Some(now() + lifetime),
            (None, None) => None,
        }
    }

    pub fn build(self) -> Result<Signable<'a, K>, UcanError> {
        let issuer = self
            .issuer
            .ok_or_else(|| UcanError::MalformedToken("an issuer is required".into()))?;
        let audience = self
            .audience
            .clone()
            .ok_or_else(|| UcanError::MalformedToken("an audience is required".into()))?;
        let expiration = self
            .implied_expiration()
            .ok_or_else(|| UcanError::MalformedToken("an expiry is required".into()))?;

        if let Some(not_before) = self.not_before {
            if not_before > expiration {
                return Err(UcanError::MalformedToken(
                    "not-before is later than expiry".into(),
                ));
            }
        }

        Ok(Signable {
            issuer,
            audience,
            not_before: self.not_before,
            expiration,
            facts: self.facts,
            capabilities: self.capabilities,
            proofs: self.proofs,
            add_nonce: self.add_nonce,
        })
    }
}
