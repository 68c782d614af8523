//! Dotted property paths.
//!
//! A network-wide property address is `processor.prop.subprop`: the first
//! segment names a processor, the rest is the path inside its property tree.

use std::fmt;

/// Split a dotted path at the first `.`; the remainder is empty for leaves.
pub fn split_first(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((first, rest)) => (first, rest),
        None => (path, ""),
    }
}

/// Address of a property inside a network: processor identifier plus the
/// dotted path within that processor's property tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    pub processor: String,
    pub property: String,
}

impl PropertyPath {
    pub fn new(processor: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            property: property.into(),
        }
    }

    /// Parse `processor.prop.subprop`. Returns `None` when either part is
    /// empty.
    pub fn parse(path: &str) -> Option<Self> {
        let (processor, property) = split_first(path);
        if processor.is_empty() || property.is_empty() {
            return None;
        }
        Some(Self::new(processor, property))
    }

    /// Rewrite the processor segment through an identifier remap, leaving
    /// unmapped identifiers untouched.
    pub fn remap_processor(&mut self, map: &std::collections::HashMap<String, String>) {
        if let Some(new_id) = map.get(&self.processor) {
            self.processor = new_id.clone();
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.property)
    }
}
