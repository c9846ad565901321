use crate::error::UcanError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, ops::Deref};

/// A single flattened capability: one resource, one ability, one caveat
/// object. The caveat is `{}` when the capability is unconditional.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Capability {
    pub resource: String,
    pub ability: String,
    pub caveat: Value,
}

impl Capability {
    pub fn new(resource: String, ability: String, caveat: Value) -> Self {
        Capability {
            resource,
            ability,
            caveat,
        }
    }
}

impl From<&Capability> for Capability {
    fn from(value: &Capability) -> Self {
        value.clone()
    }
}

impl From<(String, String, Value)> for Capability {
    fn from(value: (String, String, Value)) -> Self {
        Capability::new(value.0, value.1, value.2)
    }
}

impl From<(&str, &str, &Value)> for Capability {
    fn from(value: (&str, &str, &Value)) -> Self {
        Capability::new(value.0.to_owned(), value.1.to_owned(), value.2.to_owned())
    }
}

type MapImpl<K, V> = BTreeMap<K, V>;
type AbilitiesImpl = MapImpl<String, Vec<Value>>;
type CapabilitiesImpl = MapImpl<String, AbilitiesImpl>;

/// The in-payload representation of capabilities: a map from resource to
/// a map from ability to a list of caveats. An empty caveat list means the
/// ability is not granted at all; resources must carry at least one
/// ability.
///
/// ```rust
/// use warrant_ucan::capability::Capabilities;
/// use serde_json::json;
///
/// let capabilities = Capabilities::try_from(&json!({
///     "mailto:username@example.com": {
///         "msg/receive": [{}],
///         "msg/send": [{ "draft": true }, { "publish": true, "topic": ["foo"] }]
///     }
/// })).unwrap();
///
/// let resource = capabilities.get("mailto:username@example.com").unwrap();
/// assert_eq!(resource.get("msg/receive").unwrap(), &vec![json!({})]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Capabilities(CapabilitiesImpl);

impl Capabilities {
    /// Flatten this map into a sequence of [`Capability`] values, one per
    /// (resource, ability, caveat) triple.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().flat_map(|(resource, abilities)| {
            abilities.iter().flat_map(move |(ability, caveats)| {
                caveats.iter().map(move |caveat| {
                    Capability::from((resource.as_str(), ability.as_str(), caveat))
                })
            })
        })
    }
}

impl Deref for Capabilities {
    type Target = CapabilitiesImpl;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<CapabilitiesImpl> for Capabilities {
    type Error = UcanError;

    fn try_from(value: CapabilitiesImpl) -> Result<Self, Self::Error> {
        for (resource, abilities) in &value {
            if abilities.is_empty() {
                return Err(UcanError::MalformedToken(format!(
                    "no abilities given for resource {resource:?}"
                )));
            }

            for caveats in abilities.values() {
                for caveat in caveats {
                    if !caveat.is_object() {
                        return Err(UcanError::MalformedToken(format!(
                            "caveat must be an object, got {caveat}"
                        )));
                    }
                }
            }
        }

        Ok(Capabilities(value))
    }
}

impl TryFrom<Vec<Capability>> for Capabilities {
    type Error = UcanError;

    fn try_from(value: Vec<Capability>) -> Result<Self, Self::Error> {
        let mut capabilities = CapabilitiesImpl::new();

        for capability in value {
            let abilities = capabilities.entry(capability.resource).or_default();
            let caveats = abilities.entry(capability.ability).or_default();
            caveats.push(capability.caveat);
        }

        Capabilities::try_from(capabilities)
    }
}

impl TryFrom<&Value> for Capabilities {
    type Error = UcanError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let capabilities: CapabilitiesImpl = serde_json::from_value(value.to_owned())
            .map_err(|error| UcanError::MalformedToken(format!("capabilities: {error}")))?;
        Capabilities::try_from(capabilities)
    }
}
