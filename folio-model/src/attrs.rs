//! Node and mark attributes.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute values keyed by name.
///
/// A `BTreeMap` keeps serialization and equality independent of insertion
/// order, which matters when two replicas compare documents.
pub type Attrs = BTreeMap<String, Value>;

/// Declares one attribute on a node or mark type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrSpec {
    /// Value used when the attribute is not given. An attribute without a
    /// default is required.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub default: Option<Value>,
}

/// Keeps an explicit `null` default distinct from a missing one.
fn deserialize_present<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

impl AttrSpec {
    /// An attribute that must always be supplied.
    pub fn required() -> Self {
        Self { default: None }
    }

    /// An attribute with a default value.
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }

    /// An optional attribute defaulting to `null`.
    pub fn nullable() -> Self {
        Self {
            default: Some(Value::Null),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Default attributes for a type, or `None` when some attribute is required.
pub(crate) fn default_attrs(specs: &BTreeMap<String, AttrSpec>) -> Option<Attrs> {
    specs
        .iter()
        .map(|(name, spec)| spec.default.clone().map(|v| (name.clone(), v)))
        .collect()
}

/// Fills in defaults and validates a set of attributes against their specs.
///
/// Unknown attributes are rejected so that schema drift between replicas
/// surfaces as an error instead of silently dropping data.
pub fn compute_attrs(
    owner: &str,
    specs: &BTreeMap<String, AttrSpec>,
    given: Option<&Attrs>,
) -> ModelResult<Attrs> {
    if let Some(given) = given {
        if let Some(unknown) = given.keys().find(|k| !specs.contains_key(*k)) {
            return Err(ModelError::UnknownAttribute {
                owner: owner.to_string(),
                attr: unknown.clone(),
            });
        }
    }

    let mut built = Attrs::new();
    for (name, spec) in specs {
        let value = match given.and_then(|g| g.get(name)) {
            Some(v) => v.clone(),
            None => spec.default.clone().ok_or_else(|| ModelError::MissingAttribute {
                owner: owner.to_string(),
                attr: name.clone(),
            })?,
        };
        built.insert(name.clone(), value);
    }
    Ok(built)
}
