use crate::capability::{Ability, CapabilitySemantics, Scope};
use anyhow::{anyhow, Result};
use cid::Cid;
use url::Url;

/// Which ancestral proofs a `ucan:` resource selects for redelegation.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ProofSelection {
    /// `ucan:<cid>` selects a single proof by CID.
    Cid(Cid),
    /// `ucan:./*` selects all proofs of the current token.
    TheseProofs,
    /// `ucan://<did>/*` selects all proofs issued by a DID.
    Did(String),
    /// `ucan:*` selects every provable capability.
    All,
}

impl Scope for ProofSelection {
    fn contains(&self, other: &Self) -> bool {
        self == other || *self == ProofSelection::All
    }
}

impl TryFrom<Url> for ProofSelection {
    type Error = anyhow::Error;

    fn try_from(value: Url) -> Result<Self> {
        match value.scheme() {
            "ucan" => String::from(&value.as_str()[5..]).try_into(),
            _ => Err(anyhow!("unrecognized proof selection: {value}")),
        }
    }
}

impl TryFrom<String> for ProofSelection {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "*" => Ok(ProofSelection::All),
            "./*" => Ok(ProofSelection::TheseProofs),
            selection => {
                if let Some(did) = selection
                    .strip_prefix("//")
                    .and_then(|rest| rest.strip_suffix("/*"))
                {
                    Ok(ProofSelection::Did(did.to_string()))
                } else {
                    Ok(ProofSelection::Cid(Cid::try_from(selection)?))
                }
            }
        }
    }
}

impl ToString for ProofSelection {
    fn to_string(&self) -> String {
        match self {
            ProofSelection::Cid(cid) => format!("ucan:{cid}"),
            ProofSelection::TheseProofs => "ucan:./*".to_string(),
            ProofSelection::Did(did) => format!("ucan://{did}/*"),
            ProofSelection::All => "ucan:*".to_string(),
        }
    }
}

/// The blanket ability that accompanies a `ucan:` resource.
#[derive(Ord, Eq, PartialOrd, PartialEq, Clone)]
pub enum ProofAction {
    Delegate,
}

impl Ability for ProofAction {}

impl TryFrom<String> for ProofAction {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "ucan/*" => Ok(ProofAction::Delegate),
            unsupported => Err(anyhow!("unsupported proof action: {unsupported}")),
        }
    }
}

impl ToString for ProofAction {
    fn to_string(&self) -> String {
        match self {
            ProofAction::Delegate => "ucan/*".into(),
        }
    }
}

/// The semantics of redelegation: the only resource is a proof selection
/// and the only ability is full delegation.
pub struct ProofDelegationSemantics {}

impl CapabilitySemantics<ProofSelection, ProofAction> for ProofDelegationSemantics {}
