use crate::{
    capability::{
        proof::{ProofDelegationSemantics, ProofSelection},
        Ability, CapabilitySemantics, CapabilityView, Resource, Scope,
    },
    crypto::did::DidParser,
    error::UcanError,
    store::UcanJwtStore,
    ucan::Ucan,
};
use anyhow::anyhow;
use async_recursion::async_recursion;
use cid::{multihash::Code, Cid};
use std::{collections::BTreeSet, fmt::Debug};

const PROOF_DELEGATION_SEMANTICS: ProofDelegationSemantics = ProofDelegationSemantics {};

/// A deserialized chain of ancestral proofs that are linked to a token.
/// Building one validates every hop: signatures, temporal bounds, and
/// audience-to-issuer linkage.
#[derive(Debug)]
pub struct ProofChain {
    ucan: Ucan,
    proofs: Vec<ProofChain>,
    redelegations: BTreeSet<Cid>,
}

/// The state of a capability as witnessed in a proof chain: where in the
/// chain it originates, which parties originated it, and the tightest
/// temporal bounds along the way.
#[derive(Eq, PartialEq)]
pub struct CapabilityInfo<S: Scope, A: Ability> {
    pub originators: BTreeSet<String>,
    pub not_before: Option<u64>,
    pub expires_at: u64,
    pub capability: CapabilityView<S, A>,
}

impl<S, A> Debug for CapabilityInfo<S, A>
where
    S: Scope,
    A: Ability,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CapabilityInfo")
            .field("originators", &self.originators)
            .field("not_before", &self.not_before)
            .field("expires_at", &self.expires_at)
            .field("capability", &self.capability)
            .finish()
    }
}

impl ProofChain {
    /// Build a verified chain from a deserialized token. Proof references
    /// are resolved from tokens embedded under the `"prf"` fact first, and
    /// from the provided store after that.
    #[async_recursion]
    pub async fn from_ucan<S>(
        ucan: Ucan,
        now_time: Option<u64>,
        did_parser: &mut DidParser,
        store: &S,
    ) -> Result<ProofChain, UcanError>
    where
        S: UcanJwtStore,
    {
        ucan.validate(now_time, did_parser).await?;

        let mut proofs: Vec<ProofChain> = Vec::new();

        if let Some(ucan_proofs) = ucan.proofs() {
            for cid_string in ucan_proofs.iter() {
                let cid = Cid::try_from(cid_string.as_str()).map_err(|_| {
                    UcanError::MalformedToken(format!("invalid proof CID {cid_string}"))
                })?;

                let ucan_token = match ucan.embedded_proof(&cid) {
                    Some(token) => token,
                    None => store
                        .read_token(&cid)
                        .await?
                        .ok_or_else(|| UcanError::MissingProof(cid.to_string()))?,
                };

                let proof_chain =
                    Self::try_from_token_string(&ucan_token, now_time, did_parser, store).await?;
                proof_chain.validate_link_to(&ucan)?;
                proofs.push(proof_chain);
            }
        }

        let mut redelegations = BTreeSet::<Cid>::new();

        for capability in ucan
            .capabilities()
            .iter()
            .filter_map(|capability| PROOF_DELEGATION_SEMANTICS.parse_capability(&capability))
        {
            match capability.resource() {
                Resource::Ucan(ProofSelection::All) | Resource::Ucan(ProofSelection::TheseProofs) => {
                    for proof in &proofs {
                        redelegations.insert(proof.ucan.to_cid(Self::default_hasher())?);
                    }
                }
                Resource::Ucan(ProofSelection::Cid(cid)) => {
                    let cid = *cid;
                    if proofs
                        .iter()
                        .map(|proof| proof.ucan.to_cid(Self::default_hasher()))
                        .collect::<Result<Vec<Cid>, UcanError>>()?
                        .contains(&cid)
                    {
                        redelegations.insert(cid);
                    } else {
                        return Err(UcanError::MissingProof(cid.to_string()));
                    }
                }
                Resource::Ucan(ProofSelection::Did(did)) => {
                    let mut found = false;

                    for proof in &proofs {
                        if proof.ucan.issuer() == did {
                            redelegations.insert(proof.ucan.to_cid(Self::default_hasher())?);
                            found = true;
                        }
                    }

                    if !found {
                        return Err(UcanError::Other(anyhow!(
                            "no proof issued by {did} to redelegate from"
                        )));
                    }
                }
                Resource::Scoped(_) => {}
            }
        }

        Ok(ProofChain {
            ucan,
            proofs,
            redelegations,
        })
    }

    /// Build a verified chain from a CID, resolving the initial token from
    /// the store.
    pub async fn from_cid<S>(
        cid: &Cid,
        now_time: Option<u64>,
        did_parser: &mut DidParser,
        store: &S,
    ) -> Result<ProofChain, UcanError>
    where
        S: UcanJwtStore,
    {
        let token = store
            .read_token(cid)
            .await?
            .ok_or_else(|| UcanError::MissingProof(cid.to_string()))?;
        Self::try_from_token_string(&token, now_time, did_parser, store).await
    }

    /// Build a verified chain from an encoded token string.
    pub async fn try_from_token_string<S>(
        ucan_token_string: &str,
        now_time: Option<u64>,
        did_parser: &mut DidParser,
        store: &S,
    ) -> Result<ProofChain, UcanError>
    where
        S: UcanJwtStore,
    {
        let ucan = Ucan::try_from(ucan_token_string)?;
        Self::from_ucan(ucan, now_time, did_parser, store).await
    }

    fn validate_link_to(&self, ucan: &Ucan) -> Result<(), UcanError> {
        let audience = self.ucan.audience();
        let issuer = ucan.issuer();

        if audience != issuer {
            return Err(UcanError::AudienceMismatch {
                expected: issuer.to_string(),
                found: audience.to_string(),
            });
        }

        if !self.ucan.lifetime_encompasses(ucan) {
            return Err(UcanError::Other(anyhow!(
                "proof lifetime does not encompass the delegated token"
            )));
        }

        Ok(())
    }

    pub fn ucan(&self) -> &Ucan {
        &self.ucan
    }

    pub fn proofs(&self) -> &Vec<ProofChain> {
        &self.proofs
    }

    /// The DIDs that issued the proofless terminal tokens of this chain.
    /// For a chain rooted in a single original grant this is a single DID.
    pub fn terminal_issuers(&self) -> BTreeSet<String> {
        let mut issuers = BTreeSet::new();
        self.collect_terminal_issuers(&mut issuers);
        issuers
    }

    fn collect_terminal_issuers(&self, issuers: &mut BTreeSet<String>) {
        if self.proofs.is_empty() {
            issuers.insert(self.ucan.issuer().to_string());
        } else {
            for proof in &self.proofs {
                proof.collect_terminal_issuers(issuers);
            }
        }
    }

    pub fn default_hasher() -> Code {
        Code::Blake3_256
    }

    /// Walk the chain and reduce it to the set of capabilities provable
    /// under the given semantics. A capability claimed by a token is only
    /// attributed to an ancestral originator when an ancestor actually
    /// enables it; an escalating claim is kept, but originates from the
    /// claiming issuer alone.
    pub fn reduce_capabilities<Semantics, S, A>(
        &self,
        semantics: &Semantics,
    ) -> Vec<CapabilityInfo<S, A>>
    where
        Semantics: CapabilitySemantics<S, A>,
        S: Scope,
        A: Ability,
    {
        // Get the set of inherited attenuations (excluding redelegations)
        // before further attenuating by own lifetime and capabilities
        let ancestral_capability_infos: Vec<CapabilityInfo<S, A>> = self
            .proofs
            .iter()
            .flat_map(|ancestor_chain| {
                if let Ok(cid) = ancestor_chain.ucan.to_cid(Self::default_hasher()) {
                    if self.redelegations.contains(&cid) {
                        return Vec::new();
                    }
                }

                ancestor_chain.reduce_capabilities(semantics)
            })
            .collect();

        // Get the set of capabilities that are blanket redelegated from
        // ancestor proofs (via the `ucan:` resource)
        let redelegated_capability_infos: Vec<CapabilityInfo<S, A>> = self
            .redelegations
            .iter()
            .flat_map(|cid| {
                let proof = self
                    .proofs
                    .iter()
                    .find(|proof| match proof.ucan.to_cid(Self::default_hasher()) {
                        Ok(proof_cid) => proof_cid == *cid,
                        Err(_) => false,
                    });

                match proof {
                    Some(proof) => proof
                        .reduce_capabilities(semantics)
                        .into_iter()
                        .map(|mut info| {
                            // Redelegated capabilities are attenuated by
                            // this token's lifetime
                            info.not_before = self.ucan.not_before();
                            info.expires_at = self.ucan.expires_at();
                            info
                        })
                        .collect(),
                    None => Vec::new(),
                }
            })
            .collect();

        let self_capabilities_iter = self
            .ucan
            .capabilities()
            .iter()
            .map_while(|capability| semantics.parse_capability(&capability));

        // Get the claimed or inherited capabilities of this token
        let mut self_capability_infos: Vec<CapabilityInfo<S, A>> = match self.proofs.len() {
            0 => self_capabilities_iter
                .map(|capability| CapabilityInfo {
                    originators: BTreeSet::from_iter(vec![self.ucan.issuer().to_string()]),
                    capability,
                    not_before: self.ucan.not_before(),
                    expires_at: self.ucan.expires_at(),
                })
                .collect(),
            _ => self_capabilities_iter
                .map(|capability| {
                    // Determine the originating authority of each claimed
                    // capability
                    let mut originators = BTreeSet::<String>::new();

                    for ancestral_capability_info in ancestral_capability_infos.iter() {
                        if ancestral_capability_info.capability.enables(&capability) {
                            originators
                                .extend(ancestral_capability_info.originators.clone().into_iter());
                        }
                    }

                    // If there are no related ancestral capabilities, then
                    // this issuer claims the capability for themselves
                    if originators.is_empty() {
                        originators.insert(self.ucan.issuer().to_string());
                    }

                    CapabilityInfo {
                        capability,
                        originators,
                        not_before: self.ucan.not_before(),
                        expires_at: self.ucan.expires_at(),
                    }
                })
                .collect(),
        };

        self_capability_infos.extend(redelegated_capability_infos);

        let mut merged_capability_infos = Vec::<CapabilityInfo<S, A>>::new();

        // Merge capabilities that are distinct in origin but otherwise the
        // same into a single info with the union of originators
        'merge: while let Some(capability_info) = self_capability_infos.pop() {
            for merged_capability_info in &mut merged_capability_infos {
                if merged_capability_info.capability == capability_info.capability
                    && merged_capability_info.not_before == capability_info.not_before
                    && merged_capability_info.expires_at == capability_info.expires_at
                {
                    merged_capability_info
                        .originators
                        .extend(capability_info.originators.into_iter());
                    continue 'merge;
                }
            }

            merged_capability_infos.push(capability_info);
        }

        merged_capability_infos
    }
}
