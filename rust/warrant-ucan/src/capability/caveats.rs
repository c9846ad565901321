use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// A conditional qualifier attached to a capability. An empty caveat
/// qualifies nothing; a non-empty caveat restricts the capability to the
/// conditions it names.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Caveat {
    Unconditional,
    Conditional(Map<String, Value>),
}

impl Caveat {
    /// Whether this caveat enables another one. An unconditional caveat
    /// enables everything; a conditional caveat never enables an
    /// unconditional one; otherwise the other caveat must contain every
    /// entry of this one, with equal values.
    pub fn enables(&self, other: &Caveat) -> bool {
        match (self, other) {
            (Caveat::Unconditional, _) => true,
            (Caveat::Conditional(_), Caveat::Unconditional) => false,
            (Caveat::Conditional(conditions), Caveat::Conditional(other_conditions)) => {
                conditions
                    .iter()
                    .all(|(key, value)| other_conditions.get(key) == Some(value))
            }
        }
    }
}

impl TryFrom<&Value> for Caveat {
    type Error = anyhow::Error;

    fn try_from(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("caveat must be an object, got {value}"))?;

        Ok(if object.is_empty() {
            Caveat::Unconditional
        } else {
            Caveat::Conditional(object.to_owned())
        })
    }
}
