use crate::capability::{proof::ProofSelection, Capability, Caveat};
use serde_json::{json, Value};
use std::fmt;
use url::Url;

/// A resource scope within some domain's semantics. Implementations decide
/// what it means for one scope to contain another.
pub trait Scope: ToString + TryFrom<Url> + PartialEq + Clone {
    fn contains(&self, other: &Self) -> bool;
}

/// An action that may be performed against a resource. The `Ord` impl
/// expresses the attenuation hierarchy: a greater ability enables a lesser
/// one.
pub trait Ability: Ord + TryFrom<String> + ToString + Clone {}

/// Either a scoped resource in the semantics' own URI scheme, or a
/// `ucan:` reference that redelegates capabilities from proof tokens.
#[derive(Clone, Eq, PartialEq)]
pub enum Resource<S>
where
    S: Scope,
{
    Scoped(S),
    Ucan(ProofSelection),
}

impl<S> Resource<S>
where
    S: Scope,
{
    pub fn contains(&self, other: &Self) -> bool {
        match (self, other) {
            (Resource::Scoped(scope), Resource::Scoped(other_scope)) => {
                scope.contains(other_scope)
            }
            (Resource::Ucan(selection), Resource::Ucan(other_selection)) => {
                selection.contains(other_selection)
            }
            _ => false,
        }
    }
}

impl<S> fmt::Display for Resource<S>
where
    S: Scope,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::Scoped(scope) => write!(f, "{}", scope.to_string()),
            Resource::Ucan(selection) => write!(f, "{}", selection.to_string()),
        }
    }
}

/// Interprets raw capability strings within one domain of resources and
/// abilities. Strings that do not parse under these semantics are simply
/// outside the domain; parsing yields `None` rather than an error.
pub trait CapabilitySemantics<S, A>
where
    S: Scope,
    A: Ability,
{
    fn parse_scope(&self, scope: &Url) -> Option<S> {
        S::try_from(scope.clone()).ok()
    }

    fn parse_action(&self, ability: &str) -> Option<A> {
        A::try_from(String::from(ability)).ok()
    }

    fn parse_resource(&self, resource: &Url) -> Option<Resource<S>> {
        Some(match resource.scheme() {
            "ucan" => Resource::Ucan(ProofSelection::try_from(resource.clone()).ok()?),
            _ => Resource::Scoped(self.parse_scope(resource)?),
        })
    }

    fn parse_caveat(&self, caveat: Option<&Value>) -> Value {
        if let Some(caveat) = caveat {
            caveat.to_owned()
        } else {
            json!({})
        }
    }

    /// Parse a resource/ability pair (with optional caveat) under these
    /// semantics.
    fn parse(
        &self,
        resource: &str,
        ability: &str,
        caveat: Option<&Value>,
    ) -> Option<CapabilityView<S, A>> {
        let uri = Url::parse(resource).ok()?;
        let resource = self.parse_resource(&uri)?;
        let ability = self.parse_action(ability)?;
        let caveat = self.parse_caveat(caveat);

        Some(CapabilityView {
            resource,
            ability,
            caveat,
        })
    }

    fn parse_capability(&self, value: &Capability) -> Option<CapabilityView<S, A>> {
        self.parse(&value.resource, &value.ability, Some(&value.caveat))
    }
}

/// A capability as interpreted by some [`CapabilitySemantics`]: a typed
/// resource, a typed ability and a raw caveat object.
#[derive(Clone, Eq, PartialEq)]
pub struct CapabilityView<S, A>
where
    S: Scope,
    A: Ability,
{
    pub resource: Resource<S>,
    pub ability: A,
    pub caveat: Value,
}

impl<S, A> fmt::Debug for CapabilityView<S, A>
where
    S: Scope,
    A: Ability,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Capability")
            .field("resource", &self.resource.to_string())
            .field("ability", &self.ability.to_string())
            .field("caveat", &self.caveat)
            .finish()
    }
}

impl<S, A> CapabilityView<S, A>
where
    S: Scope,
    A: Ability,
{
    pub fn new(resource: Resource<S>, ability: A, caveat: Value) -> Self {
        CapabilityView {
            resource,
            ability,
            caveat,
        }
    }

    /// Whether this capability delegates enough authority to cover the
    /// other one: the resource must contain the other's resource, the
    /// ability must be at least the other's, and this caveat must enable
    /// the other's caveat.
    pub fn enables(&self, other: &CapabilityView<S, A>) -> bool {
        let caveat = match Caveat::try_from(&self.caveat) {
            Ok(caveat) => caveat,
            _ => return false,
        };
        let other_caveat = match Caveat::try_from(&other.caveat) {
            Ok(other_caveat) => other_caveat,
            _ => return false,
        };

        self.resource.contains(&other.resource)
            && self.ability >= other.ability
            && caveat.enables(&other_caveat)
    }

    pub fn resource(&self) -> &Resource<S> {
        &self.resource
    }

    pub fn ability(&self) -> &A {
        &self.ability
    }

    pub fn caveat(&self) -> &Value {
        &self.caveat
    }
}

impl<S, A> From<&CapabilityView<S, A>> for Capability
where
    S: Scope,
    A: Ability,
{
    fn from(value: &CapabilityView<S, A>) -> Self {
        Capability::new(
            value.resource.to_string(),
            value.ability.to_string(),
            value.caveat.clone(),
        )
    }
}

impl<S, A> From<CapabilityView<S, A>> for Capability
where
    S: Scope,
    A: Ability,
{
    fn from(value: CapabilityView<S, A>) -> Self {
        Capability::from(&value)
    }
}
