use crate::{
    did::{key_pair_from_method, VerificationMethod},
    semantics::{PathAbility, PathResource, PATH_SEMANTICS},
};
use cid::multihash::Code;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tinytemplate::{format_unescaped, TinyTemplate};
use tracing::debug;
use warrant_key_support::{
    ed25519::bytes_to_ed25519_key, p256::bytes_to_p256_key, secp256k1::bytes_to_secp256k1_key,
};
use warrant_ucan::{
    builder::UcanBuilder,
    capability::{Capabilities, Capability, CapabilitySemantics, CapabilityView},
    chain::ProofChain,
    crypto::did::{
        DidParser, KeyConstructorSlice, ED25519_MAGIC_BYTES, P256_MAGIC_BYTES,
        SECP256K1_MAGIC_BYTES,
    },
    error::UcanError,
    store::{MemoryStore, UcanJwtStore},
    ucan::{FactsMap, Ucan, UcanHeader, UcanPayload, PROOF_FACT_KEY},
};

/// The key types token issuers may sign with.
pub const SUPPORTED_KEYS: &KeyConstructorSlice = &[
    (ED25519_MAGIC_BYTES, bytes_to_ed25519_key),
    (P256_MAGIC_BYTES, bytes_to_p256_key),
    (SECP256K1_MAGIC_BYTES, bytes_to_secp256k1_key),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTokenOptions {
    /// The issuing identity; must carry a private key of a signing-capable
    /// key type.
    pub issuer: VerificationMethod,
    /// The DID of the party the token is delegated or presented to.
    pub audience: String,
    /// Absolute expiry, in seconds since the Unix epoch.
    pub expiration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<u64>,
    pub capabilities: Capabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<FactsMap>,
    /// Encoded parent tokens to reference as proofs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proofs: Option<Vec<String>>,
    #[serde(default)]
    pub add_nonce: bool,
    /// Embed the encoded proof tokens under the reserved `"prf"` fact so
    /// that verifiers need no out-of-band token store. Defaults to on.
    #[serde(default = "default_add_proof_facts")]
    pub add_proof_facts: bool,
}

fn default_add_proof_facts() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOptions {
    /// The DID every proofless terminal token of the chain must be issued
    /// by.
    pub root_issuer: String,
    /// The DID the presented token must be addressed to.
    pub audience: String,
    /// Capabilities the chain must prove, attributable to the root
    /// issuer. Values may reference `{fact}` placeholders.
    pub required_capabilities: Capabilities,
    /// Facts the chain must carry. A required value of `"*"` asserts
    /// presence only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_facts: Option<FactsMap>,
    /// Encoded tokens available for proof resolution by CID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_tokens: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// The required capabilities, with placeholders resolved.
    pub capabilities: Capabilities,
    /// Facts merged across the chain, leaf-first, without the reserved
    /// `"prf"` fact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<FactsMap>,
    /// Every CID in the chain, leaf to root, for external revocation
    /// checks.
    pub cids: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DecodedToken {
    pub header: UcanHeader,
    pub payload: UcanPayload,
    pub cid: String,
}

/// Issue a signed, encoded token.
pub async fn build_token(options: BuildTokenOptions) -> Result<String, UcanError> {
    let issuer = key_pair_from_method(&options.issuer)?;

    if !issuer.key_type().is_signing() {
        return Err(UcanError::NotSigningCapable(issuer.key_type().to_string()));
    }

    let proofs = match &options.proofs {
        Some(tokens) => {
            let mut proofs = Vec::with_capacity(tokens.len());
            for token in tokens {
                proofs.push(Ucan::try_from(token.as_str())?);
            }
            proofs
        }
        None => Vec::new(),
    };

    let capabilities: Vec<Capability> = options.capabilities.iter().collect();

    let mut builder = UcanBuilder::default()
        .issued_by(&issuer)
        .for_audience(&options.audience)
        .with_expiration(options.expiration)
        .with_add_proof_facts(options.add_proof_facts)
        .with_proofs(&proofs, None)
        .claiming_capabilities(&capabilities);

    if let Some(not_before) = options.not_before {
        builder = builder.not_before(not_before);
    }

    if let Some(facts) = &options.facts {
        for (key, fact) in facts {
            builder = builder.with_fact(key, fact.clone());
        }
    }

    if options.add_nonce {
        builder = builder.with_nonce();
    }

    builder.build()?.sign().await?.encode()
}

/// Decode a token without verifying anything, exposing its header, its
/// payload and its CID.
pub fn decode_token(token: &str) -> Result<DecodedToken, UcanError> {
    let ucan = Ucan::try_from(token)?;
    let cid = ucan.to_cid(Code::Blake3_256)?.to_string();

    Ok(DecodedToken {
        header: ucan.header().clone(),
        payload: ucan.payload().clone(),
        cid,
    })
}

/// Fully verify a presented token: structure, temporal bounds, audience,
/// signatures, proof-chain linkage, root issuer, required facts and
/// required capabilities. The first failure aborts; there are no partial
/// grants.
pub async fn verify_token(token: &str, options: VerifyOptions) -> Result<VerifyResponse, UcanError> {
    let ucan = Ucan::try_from(token)?;

    if ucan.is_expired(None) {
        return Err(UcanError::Expired);
    }

    if ucan.is_too_early() {
        return Err(UcanError::NotYetValid);
    }

    if ucan.audience() != options.audience {
        return Err(UcanError::AudienceMismatch {
            expected: options.audience.clone(),
            found: ucan.audience().to_owned(),
        });
    }

    let mut store = MemoryStore::default();

    if let Some(known_tokens) = &options.known_tokens {
        for known_token in known_tokens {
            store.write_token(known_token).await?;
        }
    }

    let mut did_parser = DidParser::new(SUPPORTED_KEYS);
    let chain = ProofChain::from_ucan(ucan, None, &mut did_parser, &store).await?;

    debug!("Proof chain verified with {} proof(s)", chain.proofs().len());

    for issuer in chain.terminal_issuers() {
        if issuer != options.root_issuer {
            return Err(UcanError::RootIssuerMismatch(issuer));
        }
    }

    let mut facts = merged_facts(&chain);

    if let Some(required_facts) = &options.required_facts {
        check_required_facts(required_facts, &facts)?;
    }

    facts.remove(PROOF_FACT_KEY);

    let capability_infos = chain.reduce_capabilities(&PATH_SEMANTICS);
    let mut granted: Vec<Capability> = Vec::new();

    for required in options.required_capabilities.iter() {
        let required_view = resolve_required_capability(&required, &facts)?;

        let enabled = capability_infos.iter().any(|info| {
            info.capability.enables(&required_view)
                && info.originators.contains(&options.root_issuer)
        });

        if !enabled {
            return Err(UcanError::CapabilityDenied(format!(
                "{} {}",
                required_view.resource(),
                required_view.ability()
            )));
        }

        granted.push(Capability::from(required_view));
    }

    let mut cids = Vec::new();
    collect_cids(&chain, &mut cids)?;

    Ok(VerifyResponse {
        capabilities: Capabilities::try_from(granted)?,
        facts: if facts.is_empty() { None } else { Some(facts) },
        cids,
    })
}

/// Facts merged across the whole chain. The traversal is leaf-first, so
/// when an ancestor repeats a fact key the leafmost value wins.
fn merged_facts(chain: &ProofChain) -> FactsMap {
    let mut facts = FactsMap::new();
    collect_facts(chain, &mut facts);
    facts
}

fn collect_facts(chain: &ProofChain, facts: &mut FactsMap) {
    if let Some(token_facts) = chain.ucan().facts() {
        for (key, value) in token_facts {
            facts.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    for proof in chain.proofs() {
        collect_facts(proof, facts);
    }
}

fn check_required_facts(required_facts: &FactsMap, facts: &FactsMap) -> Result<(), UcanError> {
    for (name, required_value) in required_facts {
        let Some(value) = facts.get(name) else {
            return Err(UcanError::FactMismatch(format!("missing fact {name:?}")));
        };

        // A token fact that is literally "*" would always satisfy the
        // presence wildcard below, so it is rejected outright
        if value.as_str() == Some("*") {
            return Err(UcanError::FactMismatch(format!(
                "fact {name:?} carries the reserved value \"*\""
            )));
        }

        if required_value.as_str() == Some("*") {
            continue;
        }

        if value != required_value {
            return Err(UcanError::FactMismatch(format!(
                "fact {name:?} does not match the required value"
            )));
        }
    }

    Ok(())
}

/// Resolve `{fact}` placeholders in a required capability's resource,
/// ability and string caveat values, then parse it under the path
/// semantics.
fn resolve_required_capability(
    required: &Capability,
    facts: &FactsMap,
) -> Result<CapabilityView<PathResource, PathAbility>, UcanError> {
    let resource = render_template(&required.resource, facts)?;
    let ability = render_template(&required.ability, facts)?;

    let mut caveat = required.caveat.clone();
    if let Some(conditions) = caveat.as_object_mut() {
        for (_, value) in conditions.iter_mut() {
            if let Some(text) = value.as_str() {
                if text.contains('{') {
                    *value = Value::String(render_template(text, facts)?);
                }
            }
        }
    }

    PATH_SEMANTICS
        .parse(&resource, &ability, Some(&caveat))
        .ok_or_else(|| UcanError::CapabilityDenied(format!("{resource} {ability}")))
}

fn render_template(template: &str, facts: &FactsMap) -> Result<String, UcanError> {
    if !template.contains('{') {
        return Ok(template.to_owned());
    }

    let mut templates = TinyTemplate::new();
    templates.set_default_formatter(&format_unescaped);
    templates.add_template("value", template).map_err(|error| {
        UcanError::FactMismatch(format!("invalid template {template:?}: {error}"))
    })?;

    templates.render("value", facts).map_err(|error| {
        UcanError::FactMismatch(format!("could not resolve {template:?}: {error}"))
    })
}

/// Collect the CIDs of every token in the chain, leaf first, without
/// duplicates.
fn collect_cids(chain: &ProofChain, cids: &mut Vec<String>) -> Result<(), UcanError> {
    let cid = chain.ucan().to_cid(Code::Blake3_256)?.to_string();

    if !cids.contains(&cid) {
        cids.push(cid);
    }

    for proof in chain.proofs() {
        collect_cids(proof, cids)?;
    }

    Ok(())
}
