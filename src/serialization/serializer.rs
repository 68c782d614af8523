//! Write-side walker over the persistence tree.
//!
//! A `Serializer` grows an [`Element`] tree from the root downward. The
//! current write position is an index path into the tree;
//! [`begin_element`](Serializer::begin_element) descends into a fresh child
//! and hands back a [`NodeSwitch`] that pops the cursor when dropped.

use crate::serialization::cursor::{NodeSwitch, TreeCursor};
use crate::serialization::element::Element;
use crate::serialization::error::SerializationResult;
use std::path::Path;

pub struct Serializer {
    root: Element,
    cursor: Vec<usize>,
}

impl TreeCursor for Serializer {
    fn cursor(&self) -> &[usize] {
        &self.cursor
    }

    fn set_cursor(&mut self, path: Vec<usize>) {
        self.cursor = path;
    }
}

impl Serializer {
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            root: Element::new(root_tag),
            cursor: Vec::new(),
        }
    }

    /// The element the cursor points at.
    pub fn current(&mut self) -> &mut Element {
        let mut el = &mut self.root;
        for &i in &self.cursor {
            el = &mut el.children[i];
        }
        el
    }

    /// Set an attribute on the current element.
    pub fn attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current().set_attr(key, value);
    }

    /// Append a child to the current element and descend into it. The
    /// returned guard restores the previous position when dropped.
    pub fn begin_element(&mut self, tag: impl Into<String>) -> NodeSwitch<'_, Serializer> {
        let index = self.current().push_child(Element::new(tag));
        let mut path = self.cursor.clone();
        path.push(index);
        NodeSwitch::new(self, path)
    }

    /// Append a leaf child carrying a single `content` attribute.
    pub fn element_with_content(&mut self, tag: impl Into<String>, content: impl Into<String>) {
        self.current()
            .push_child(Element::new(tag).with_attr("content", content));
    }

    /// Append an already-built subtree under the current element.
    pub fn push_element(&mut self, element: Element) {
        self.current().push_child(element);
    }

    /// Consume the serializer and return the finished tree.
    pub fn finish(self) -> Element {
        self.root
    }

    /// Encode the tree as a JSON document, stamping the save time on the
    /// root element.
    pub fn to_document(&self) -> SerializationResult<String> {
        let mut root = self.root.clone();
        root.set_attr("saved", chrono::Utc::now().to_rfc3339());
        Ok(serde_json::to_string_pretty(&root)?)
    }

    /// Write the JSON document to disk.
    pub fn write_file(&self, path: impl AsRef<Path>) -> SerializationResult<()> {
        std::fs::write(path, self.to_document()?)?;
        Ok(())
    }
}
