//! Read-side walker over the persistence tree, with identifier-keyed
//! structural diffing.
//!
//! Deserializing a keyed collection matches persisted entries against live
//! entries by identifier and applies one of `on_new` / `on_remove` /
//! `on_move` per key, so that documents and live object graphs can evolve
//! independently: unknown live children are preserved, missing optional
//! children fall back to defaults, reordering is explicit.
//!
//! Per-element failures are routed to [`Deserializer::handle_error`] and the
//! element is skipped; only whole-document problems abort a load.

use crate::serialization::cursor::{NodeSwitch, TreeCursor};
use crate::serialization::element::Element;
use crate::serialization::error::{SerializationError, SerializationResult};
use std::cell::Cell;
use std::collections::HashSet;
use std::str::FromStr;

pub struct Deserializer {
    root: Element,
    cursor: Vec<usize>,
    version: u32,
    error_count: Cell<usize>,
}

impl TreeCursor for Deserializer {
    fn cursor(&self) -> &[usize] {
        &self.cursor
    }

    fn set_cursor(&mut self, path: Vec<usize>) {
        self.cursor = path;
    }
}

impl Deserializer {
    pub fn from_element(root: Element) -> Self {
        Self {
            root,
            cursor: Vec::new(),
            version: 0,
            error_count: Cell::new(0),
        }
    }

    /// Parse a JSON document into a deserializer positioned at the root.
    pub fn from_document(json: &str) -> SerializationResult<Self> {
        let root: Element = serde_json::from_str(json)?;
        Ok(Self::from_element(root))
    }

    /// The element the cursor points at.
    pub fn current(&self) -> &Element {
        let mut el = &self.root;
        for &i in &self.cursor {
            el = &el.children[i];
        }
        el
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.current().attr(key)
    }

    pub fn require_attr(&self, key: &str) -> SerializationResult<&str> {
        let current = self.current();
        current
            .attr(key)
            .ok_or_else(|| SerializationError::MissingAttribute {
                key: key.to_string(),
                tag: current.tag.clone(),
            })
    }

    /// Read and parse an attribute of the current element.
    pub fn attr_parse<T: FromStr>(&self, key: &str) -> SerializationResult<T> {
        let raw = self.require_attr(key)?;
        raw.parse()
            .map_err(|_| SerializationError::InvalidAttribute {
                key: key.to_string(),
                value: raw.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// Descend into the first child with the given tag. The returned guard
    /// restores the previous position when dropped; `None` when no such
    /// child exists.
    pub fn switch_to_child(&mut self, tag: &str) -> Option<NodeSwitch<'_, Deserializer>> {
        let index = self.current().children.iter().position(|c| c.tag == tag)?;
        let mut path = self.cursor.clone();
        path.push(index);
        Some(NodeSwitch::new(self, path))
    }

    /// Document version, as recorded by whoever parsed the version header.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Per-element failure hook: log and skip, never abort the pass.
    pub fn handle_error(&self, err: SerializationError) {
        self.error_count.set(self.error_count.get() + 1);
        tracing::warn!("Skipping malformed element: {}", err);
    }

    /// Number of elements skipped through [`handle_error`](Self::handle_error).
    pub fn error_count(&self) -> usize {
        self.error_count.get()
    }
}

/// Target of an identifier-keyed diff over one keyed collection.
///
/// The handler owns the mutable view of the live collection; the driver only
/// decides which hook fires for which key.
pub trait KeyedDiffHandler {
    /// Identifiers of the live entries, in display order.
    fn live_identifiers(&self) -> Vec<String>;

    /// Current position of a live entry, `None` when absent.
    fn current_index(&self, id: &str) -> Option<usize>;

    /// Whether a persisted entry that is absent live may be created at all.
    /// Structural children that always exist return false here.
    fn filter(&self, _id: &str) -> bool {
        true
    }

    /// Key present in the document, absent live: construct and insert at
    /// `index`.
    fn on_new(&mut self, element: &Element, index: usize) -> SerializationResult<()>;

    /// Key present in both: apply the persisted state to the live entry.
    fn on_update(&mut self, id: &str, element: &Element) -> SerializationResult<()>;

    /// Key absent in the document, present live: destroy a dynamic child or
    /// reset a structural one.
    fn on_remove(&mut self, id: &str);

    /// Key present in both but at another position: reorder.
    fn on_move(&mut self, id: &str, index: usize);
}

/// Drive an identifier-keyed diff of `entries` against the handler's live
/// collection. Entries without a usable id attribute are reported through
/// `on_error` and skipped.
pub fn identifier_diff(
    entries: &[&Element],
    id_attr: &str,
    handler: &mut dyn KeyedDiffHandler,
    on_error: &mut dyn FnMut(SerializationError),
) {
    let mut persisted: Vec<(String, &Element)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for el in entries {
        match el.attr(id_attr) {
            Some(id) if !id.is_empty() => {
                if !seen.insert(id.to_string()) {
                    on_error(SerializationError::InvalidAttribute {
                        key: id_attr.to_string(),
                        value: id.to_string(),
                        expected: "unique identifier".to_string(),
                    });
                    continue;
                }
                persisted.push((id.to_string(), el));
            }
            _ => on_error(SerializationError::MissingAttribute {
                key: id_attr.to_string(),
                tag: el.tag.clone(),
            }),
        }
    }
    let persisted_ids: HashSet<&str> = persisted.iter().map(|(id, _)| id.as_str()).collect();

    // Live entries absent from the document first, so indices below refer to
    // the surviving order.
    for live in handler.live_identifiers() {
        if !persisted_ids.contains(live.as_str()) {
            handler.on_remove(&live);
        }
    }

    // Document order decides target positions; `index` counts only entries
    // that end up live.
    let mut index = 0usize;
    for (id, el) in &persisted {
        if handler.current_index(id).is_some() {
            if let Err(e) = handler.on_update(id, el) {
                on_error(e);
            }
            if handler.current_index(id) != Some(index) {
                handler.on_move(id, index);
            }
            index += 1;
        } else if handler.filter(id) {
            match handler.on_new(el, index) {
                Ok(()) => index += 1,
                Err(e) => on_error(e),
            }
        }
    }
}
