//! The XML-like element tree backing workspace persistence.
//!
//! A node is a tag plus string attributes plus ordered children. The tree is
//! built incrementally by the [`Serializer`](crate::serialization::Serializer)
//! and read back by the [`Deserializer`](crate::serialization::Deserializer).
//! On disk the tree is encoded as JSON via serde.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of the persistence tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in document order.
    pub fn children_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Append a child and return its index.
    pub fn push_child(&mut self, child: Element) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_and_child_lookup() {
        let mut el = Element::new("Processor").with_attr("identifier", "source");
        el.push_child(Element::new("Properties"));
        el.push_child(Element::new("Ports"));

        assert_eq!(el.attr("identifier"), Some("source"));
        assert_eq!(el.attr("missing"), None);
        assert!(el.child("Properties").is_some());
        assert!(el.child("Connections").is_none());
    }

    #[test]
    fn test_children_by_tag_preserves_order() {
        let mut list = Element::new("Processors");
        list.push_child(Element::new("Processor").with_attr("identifier", "a"));
        list.push_child(Element::new("Connection"));
        list.push_child(Element::new("Processor").with_attr("identifier", "b"));

        let ids: Vec<_> = list
            .children_by_tag("Processor")
            .filter_map(|c| c.attr("identifier"))
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_json_round_trip() {
        let el = Element::new("ProcessorNetwork")
            .with_attr("version", "21")
            .with_attr("saved", "2025-01-01T00:00:00Z");

        let json = serde_json::to_string(&el).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(el, back);
    }
}
