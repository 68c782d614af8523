//! Typed property values.
//!
//! A `PropertyValue` is a tagged value with a string attribute encoding used
//! by the workspace serializer. Assignments are kind-checked: a float property
//! stays a float property for its whole lifetime.

use serde::{Deserialize, Serialize};

/// The value held by a value property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    DVec2([f64; 2]),
    String(String),
}

impl PropertyValue {
    /// Tag used in the persisted `type` attribute.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::DVec2(_) => "dvec2",
            PropertyValue::String(_) => "string",
        }
    }

    /// True when both values carry the same kind of payload.
    pub fn same_kind(&self, other: &PropertyValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Encode the payload as an attribute string.
    pub fn to_attr(&self) -> String {
        match self {
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::Int(v) => v.to_string(),
            PropertyValue::Float(v) => v.to_string(),
            PropertyValue::DVec2([x, y]) => format!("{} {}", x, y),
            PropertyValue::String(v) => v.clone(),
        }
    }

    /// Decode a payload from its `type` tag and attribute string.
    /// Returns `None` when the tag is unknown or the payload does not parse.
    pub fn from_attr(type_name: &str, value: &str) -> Option<PropertyValue> {
        match type_name {
            "bool" => value.parse().ok().map(PropertyValue::Bool),
            "int" => value.parse().ok().map(PropertyValue::Int),
            "float" => value.parse().ok().map(PropertyValue::Float),
            "dvec2" => {
                let mut parts = value.split_whitespace();
                let x = parts.next()?.parse().ok()?;
                let y = parts.next()?.parse().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                Some(PropertyValue::DVec2([x, y]))
            }
            "string" => Some(PropertyValue::String(value.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_round_trip() {
        let values = [
            PropertyValue::Bool(true),
            PropertyValue::Int(-17),
            PropertyValue::Float(0.25),
            PropertyValue::DVec2([1.5, -2.0]),
            PropertyValue::String("iso surface".into()),
        ];
        for v in values {
            let parsed = PropertyValue::from_attr(v.type_name(), &v.to_attr()).unwrap();
            assert_eq!(parsed, v);
        }
    }

    #[test]
    fn test_from_attr_rejects_garbage() {
        assert!(PropertyValue::from_attr("float", "not-a-number").is_none());
        assert!(PropertyValue::from_attr("dvec2", "1.0").is_none());
        assert!(PropertyValue::from_attr("dvec2", "1 2 3").is_none());
        assert!(PropertyValue::from_attr("quaternion", "0 0 0 1").is_none());
    }

    #[test]
    fn test_same_kind() {
        assert!(PropertyValue::Float(1.0).same_kind(&PropertyValue::Float(2.0)));
        assert!(!PropertyValue::Float(1.0).same_kind(&PropertyValue::Int(1)));
    }
}
