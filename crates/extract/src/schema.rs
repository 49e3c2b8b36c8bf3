use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value carried by a node property.
///
/// Arrays and objects are rejected at decode time, so a `Document` that made it
/// past translation only ever holds scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    /// Empty string, null and `false` carry no constraint. Numeric zero does.
    pub fn is_blank(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::Bool(b) => !b,
            PropertyValue::Text(s) => s.is_empty(),
            PropertyValue::Integer(_) | PropertyValue::Float(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Models write `null` where a field has nothing to say; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Document-local handle referenced by predicates
    pub node_id: String,
    /// Graph identity, empty when the question names none
    #[serde(rename = "id", default, deserialize_with = "null_as_default")]
    pub external_id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(rename = "type")]
    pub relation: String,
    pub source: String,
    pub target: String,
}

/// Draft graph query exchanged with the translation step and the annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<Node>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub predicates: Vec<Predicate>,
}
