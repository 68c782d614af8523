//! The property owner: an ordered, uniquely-keyed collection of properties.
//!
//! All properties of one owner (a processor, or a standalone owner) live in a
//! flat `Vec<PropertyNode>` arena indexed by [`PropertyId`]. Composite
//! properties nest further owner levels inside the same arena; parent links
//! are back-reference ids and never extend lifetimes. Owned (dynamically
//! created) properties are destroyed with their owner, referenced
//! (structural) properties survive detachment and can be re-attached.
//!
//! Structural mutations publish will/did observer pairs, and `move` emits the
//! same pairs as a literal remove + insert so external indices stay
//! consistent.

use crate::properties::events::{OwnerEvent, OwnerObservers};
use crate::properties::id::PropertyId;
use crate::properties::path::split_first;
use crate::properties::property::{
    ChildSet, CompositeState, Event, InvalidationLevel, PropertyKind, PropertyNode,
    PropertySerializationMode,
};
use crate::properties::value::PropertyValue;
use crate::serialization::{
    identifier_diff, Element, KeyedDiffHandler, SerializationError, SerializationResult,
};
use crossbeam_channel::Receiver;
use thiserror::Error;

/// Failure of a structural owner mutation. Always synchronous; the owner is
/// unchanged when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("identifier '{identifier}' is already used by a sibling property")]
    DuplicateIdentifier { identifier: String },

    #[error("cannot add property '{identifier}' to itself")]
    SelfReference { identifier: String },

    #[error("'{identifier}' is not a valid property identifier")]
    InvalidIdentifier { identifier: String },

    #[error("no property '{identifier}'")]
    UnknownProperty { identifier: String },

    #[error("parent is not a composite property")]
    InvalidParent,

    #[error("value kind does not match property '{identifier}'")]
    TypeMismatch { identifier: String },

    #[error("index {index} out of range ({len} properties)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Flat-arena property owner tree.
#[derive(Debug, Default)]
pub struct PropertyTree {
    nodes: Vec<PropertyNode>,
    root: ChildSet,
    /// Aggregate invalidation of the whole owner, max-merged on every
    /// property invalidation.
    invalidation: InvalidationLevel,
    observers: OwnerObservers,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookup ──

    pub fn get(&self, id: PropertyId) -> Option<&PropertyNode> {
        self.nodes.get(id.index()).filter(|n| !n.dead)
    }

    fn get_mut(&mut self, id: PropertyId) -> Option<&mut PropertyNode> {
        self.nodes.get_mut(id.index()).filter(|n| !n.dead)
    }

    /// Children of the root (`PropertyId::INVALID`) or of a composite.
    pub fn child_set(&self, parent: PropertyId) -> Option<&ChildSet> {
        if !parent.is_valid() {
            Some(&self.root)
        } else {
            self.get(parent)?.as_composite().map(|c| &c.children)
        }
    }

    fn child_set_mut(&mut self, parent: PropertyId) -> Option<&mut ChildSet> {
        if !parent.is_valid() {
            Some(&mut self.root)
        } else {
            match &mut self.nodes.get_mut(parent.index())?.kind {
                PropertyKind::Composite(c) => Some(&mut c.children),
                _ => None,
            }
        }
    }

    /// Display-ordered children of an owner level.
    pub fn children(&self, parent: PropertyId) -> Vec<PropertyId> {
        self.child_set(parent)
            .map(|cs| cs.order.clone())
            .unwrap_or_default()
    }

    pub fn child_identifiers(&self, parent: PropertyId) -> Vec<String> {
        self.children(parent)
            .iter()
            .map(|&id| self.nodes[id.index()].identifier.clone())
            .collect()
    }

    /// Number of direct children of an owner level.
    pub fn len(&self, parent: PropertyId) -> usize {
        self.child_set(parent).map(ChildSet::len).unwrap_or(0)
    }

    pub fn is_empty(&self, parent: PropertyId) -> bool {
        self.len(parent) == 0
    }

    /// Direct child of `parent` with the given identifier.
    pub fn property_by_identifier(&self, parent: PropertyId, identifier: &str) -> Option<PropertyId> {
        self.child_set(parent)?
            .order
            .iter()
            .copied()
            .find(|&id| self.nodes[id.index()].identifier == identifier)
    }

    /// Resolve a dotted path (`"a.b.c"`) from the root, descending through
    /// composite children. `None` when any segment is missing or an
    /// intermediate segment is not a composite.
    pub fn property_by_path(&self, path: &str) -> Option<PropertyId> {
        if path.is_empty() {
            return None;
        }
        let mut parent = PropertyId::INVALID;
        let mut rest = path;
        loop {
            let (first, tail) = split_first(rest);
            let id = self.property_by_identifier(parent, first)?;
            if tail.is_empty() {
                return Some(id);
            }
            if !self.nodes[id.index()].is_composite() {
                return None;
            }
            parent = id;
            rest = tail;
        }
    }

    /// Dotted path of an attached property, from the root.
    pub fn path_of(&self, id: PropertyId) -> Option<String> {
        let node = self.get(id)?;
        if !node.attached {
            return None;
        }
        let mut segments = vec![node.identifier.clone()];
        let mut cur = node.parent;
        while cur.is_valid() {
            let n = &self.nodes[cur.index()];
            segments.push(n.identifier.clone());
            cur = n.parent;
        }
        segments.reverse();
        Some(segments.join("."))
    }

    /// All attached properties, depth first in display order.
    pub fn properties_recursive(&self) -> Vec<PropertyId> {
        let mut out = Vec::new();
        self.collect_recursive(PropertyId::INVALID, &mut out);
        out
    }

    fn collect_recursive(&self, parent: PropertyId, out: &mut Vec<PropertyId>) {
        if let Some(cs) = self.child_set(parent) {
            for &id in &cs.order {
                out.push(id);
                if self.nodes[id.index()].is_composite() {
                    self.collect_recursive(id, out);
                }
            }
        }
    }

    // ── Structural mutation ──

    /// Append a property under `parent`.
    pub fn add_property(
        &mut self,
        parent: PropertyId,
        identifier: &str,
        kind: PropertyKind,
        owned: bool,
    ) -> Result<PropertyId, StructuralError> {
        let index = self.len(parent);
        self.insert_property(parent, index, identifier, kind, owned)
    }

    /// Insert a property at `index` under `parent` (clamped to the child
    /// count). Fails on duplicate sibling identifiers without mutating the
    /// owner.
    pub fn insert_property(
        &mut self,
        parent: PropertyId,
        index: usize,
        identifier: &str,
        kind: PropertyKind,
        owned: bool,
    ) -> Result<PropertyId, StructuralError> {
        validate_identifier(identifier)?;
        let len = match self.child_set(parent) {
            Some(cs) => cs.len(),
            None => return Err(StructuralError::InvalidParent),
        };
        if self.property_by_identifier(parent, identifier).is_some() {
            return Err(StructuralError::DuplicateIdentifier {
                identifier: identifier.to_string(),
            });
        }
        let index = index.min(len);

        let id = PropertyId(self.nodes.len() as u32);
        let mut node = PropertyNode::new(identifier.to_string(), kind, owned);
        node.parent = parent;
        node.attached = true;
        self.nodes.push(node);

        self.observers.notify(OwnerEvent::WillAddProperty {
            parent,
            id,
            identifier: identifier.to_string(),
            index,
        });
        match self.child_set_mut(parent) {
            Some(cs) => cs.order.insert(index, id),
            None => return Err(StructuralError::InvalidParent),
        }
        self.rebuild_indices(parent);
        self.observers.notify(OwnerEvent::DidAddProperty {
            parent,
            id,
            identifier: identifier.to_string(),
            index,
        });
        Ok(id)
    }

    /// Re-attach a previously detached (referenced) property.
    pub fn attach(
        &mut self,
        parent: PropertyId,
        id: PropertyId,
        index: usize,
    ) -> Result<(), StructuralError> {
        let identifier = match self.get(id) {
            Some(n) if !n.attached => n.identifier.clone(),
            _ => {
                return Err(StructuralError::UnknownProperty {
                    identifier: format!("{id}"),
                })
            }
        };
        if id == parent {
            return Err(StructuralError::SelfReference { identifier });
        }
        let len = match self.child_set(parent) {
            Some(cs) => cs.len(),
            None => return Err(StructuralError::InvalidParent),
        };
        if self.property_by_identifier(parent, &identifier).is_some() {
            return Err(StructuralError::DuplicateIdentifier { identifier });
        }
        let index = index.min(len);

        self.observers.notify(OwnerEvent::WillAddProperty {
            parent,
            id,
            identifier: identifier.clone(),
            index,
        });
        self.nodes[id.index()].parent = parent;
        self.nodes[id.index()].attached = true;
        if let Some(cs) = self.child_set_mut(parent) {
            cs.order.insert(index, id);
        }
        self.rebuild_indices(parent);
        self.observers.notify(OwnerEvent::DidAddProperty {
            parent,
            id,
            identifier,
            index,
        });
        Ok(())
    }

    /// Remove a property from its owner level. Owned properties are
    /// destroyed together with their whole subtree; referenced ones are only
    /// detached and stay re-attachable.
    pub fn remove(&mut self, id: PropertyId) -> Result<PropertyId, StructuralError> {
        let (parent, identifier) = match self.get(id) {
            Some(n) if n.attached => (n.parent, n.identifier.clone()),
            _ => {
                return Err(StructuralError::UnknownProperty {
                    identifier: format!("{id}"),
                })
            }
        };
        let index = self
            .child_set(parent)
            .and_then(|cs| cs.position(id))
            .ok_or(StructuralError::InvalidParent)?;

        self.observers.notify(OwnerEvent::WillRemoveProperty {
            parent,
            id,
            identifier: identifier.clone(),
            index,
        });
        if let Some(cs) = self.child_set_mut(parent) {
            cs.order.remove(index);
        }
        self.rebuild_indices(parent);
        // Observers see the property without an owner before destruction
        // completes.
        self.nodes[id.index()].parent = PropertyId::INVALID;
        self.nodes[id.index()].attached = false;
        self.observers.notify(OwnerEvent::DidRemoveProperty {
            parent,
            id,
            identifier,
            index,
        });

        if self.nodes[id.index()].owned {
            self.tombstone(id);
        }
        Ok(id)
    }

    pub fn remove_by_identifier(
        &mut self,
        parent: PropertyId,
        identifier: &str,
    ) -> Result<PropertyId, StructuralError> {
        let id = self.property_by_identifier(parent, identifier).ok_or_else(|| {
            StructuralError::UnknownProperty {
                identifier: identifier.to_string(),
            }
        })?;
        self.remove(id)
    }

    pub fn remove_at(
        &mut self,
        parent: PropertyId,
        index: usize,
    ) -> Result<PropertyId, StructuralError> {
        let cs = self.child_set(parent).ok_or(StructuralError::InvalidParent)?;
        let id = cs
            .order
            .get(index)
            .copied()
            .ok_or(StructuralError::IndexOutOfRange {
                index,
                len: cs.len(),
            })?;
        self.remove(id)
    }

    /// Reorder a property within its owner level. Emits the same will/did
    /// remove + add pairs as a literal remove and insert. Returns false when
    /// the property is not attached.
    pub fn move_property(&mut self, id: PropertyId, new_index: usize) -> bool {
        let (parent, identifier) = match self.get(id) {
            Some(n) if n.attached => (n.parent, n.identifier.clone()),
            _ => return false,
        };
        let Some(index) = self.child_set(parent).and_then(|cs| cs.position(id)) else {
            return false;
        };

        self.observers.notify(OwnerEvent::WillRemoveProperty {
            parent,
            id,
            identifier: identifier.clone(),
            index,
        });
        if let Some(cs) = self.child_set_mut(parent) {
            cs.order.remove(index);
        }
        self.observers.notify(OwnerEvent::DidRemoveProperty {
            parent,
            id,
            identifier: identifier.clone(),
            index,
        });

        let new_index = new_index.min(self.len(parent));
        self.observers.notify(OwnerEvent::WillAddProperty {
            parent,
            id,
            identifier: identifier.clone(),
            index: new_index,
        });
        if let Some(cs) = self.child_set_mut(parent) {
            cs.order.insert(new_index, id);
        }
        self.rebuild_indices(parent);
        self.observers.notify(OwnerEvent::DidAddProperty {
            parent,
            id,
            identifier,
            index: new_index,
        });
        true
    }

    /// Remove every property of the root level, last to first.
    pub fn clear(&mut self) {
        while let Some(&last) = self.root.order.last() {
            let _ = self.remove(last);
        }
    }

    fn tombstone(&mut self, id: PropertyId) {
        let children = match &self.nodes[id.index()].kind {
            PropertyKind::Composite(c) => c.children.order.clone(),
            _ => Vec::new(),
        };
        for child in children {
            self.tombstone(child);
        }
        let node = &mut self.nodes[id.index()];
        node.dead = true;
        node.attached = false;
        if let PropertyKind::Composite(c) = &mut node.kind {
            c.children = ChildSet::default();
        }
    }

    fn rebuild_indices(&mut self, parent: PropertyId) {
        let Some(order) = self.child_set(parent).map(|cs| cs.order.clone()) else {
            return;
        };
        let events: Vec<PropertyId> = order
            .iter()
            .copied()
            .filter(|&id| self.nodes[id.index()].is_event())
            .collect();
        let composites: Vec<PropertyId> = order
            .iter()
            .copied()
            .filter(|&id| self.nodes[id.index()].is_composite())
            .collect();
        if let Some(cs) = self.child_set_mut(parent) {
            cs.events = events;
            cs.composites = composites;
        }
    }

    // ── Values ──

    pub fn value(&self, id: PropertyId) -> Option<&PropertyValue> {
        self.get(id)?.as_value().map(|vs| &vs.value)
    }

    /// Assign a value; kind-checked against the current value. Returns
    /// whether the stored value changed. Changing a value invalidates the
    /// property and its ancestors.
    pub fn set_value(
        &mut self,
        id: PropertyId,
        value: PropertyValue,
    ) -> Result<bool, StructuralError> {
        let node = self.get_mut(id).ok_or_else(|| StructuralError::UnknownProperty {
            identifier: format!("{id}"),
        })?;
        let identifier = node.identifier.clone();
        match &mut node.kind {
            PropertyKind::Value(vs) => {
                if !vs.value.same_kind(&value) {
                    return Err(StructuralError::TypeMismatch { identifier });
                }
                if vs.value == value {
                    return Ok(false);
                }
                vs.value = value;
            }
            _ => return Err(StructuralError::TypeMismatch { identifier }),
        }
        self.invalidate(id, InvalidationLevel::InvalidOutput);
        Ok(true)
    }

    /// Reset a property (and, for composites, its subtree) to the default
    /// state.
    pub fn reset_to_default(&mut self, id: PropertyId) {
        let composite_children = self
            .get(id)
            .and_then(|n| n.as_composite())
            .map(|c| c.children.order.clone());
        if let Some(children) = composite_children {
            for child in children {
                self.reset_to_default(child);
            }
            return;
        }

        let mut changed = false;
        if let Some(node) = self.get_mut(id) {
            if let PropertyKind::Value(vs) = &mut node.kind {
                if vs.value != vs.default {
                    vs.value = vs.default.clone();
                    changed = true;
                }
            }
        }
        if changed {
            self.invalidate(id, InvalidationLevel::InvalidOutput);
        }
    }

    /// Capture the current value as the new default, recursively.
    pub fn set_current_as_default(&mut self, id: PropertyId) {
        let composite_children = self
            .get(id)
            .and_then(|n| n.as_composite())
            .map(|c| c.children.order.clone());
        if let Some(children) = composite_children {
            for child in children {
                self.set_current_as_default(child);
            }
            return;
        }

        if let Some(node) = self.get_mut(id) {
            if let PropertyKind::Value(vs) = &mut node.kind {
                vs.default = vs.value.clone();
            }
        }
    }

    pub fn reset_all(&mut self) {
        for id in self.children(PropertyId::INVALID) {
            self.reset_to_default(id);
        }
    }

    pub fn set_all_current_as_default(&mut self) {
        for id in self.children(PropertyId::INVALID) {
            self.set_current_as_default(id);
        }
    }

    pub fn set_readonly(&mut self, id: PropertyId, readonly: bool) {
        if let Some(node) = self.get_mut(id) {
            node.readonly = readonly;
        }
    }

    pub fn set_visible(&mut self, id: PropertyId, visible: bool) {
        if let Some(node) = self.get_mut(id) {
            node.visible = visible;
        }
    }

    pub fn set_serialization_mode(&mut self, id: PropertyId, mode: PropertySerializationMode) {
        if let Some(node) = self.get_mut(id) {
            node.serialization_mode = mode;
        }
    }

    // ── Invalidation ──

    /// Max-merge an invalidation level into the property, its ancestors and
    /// the owner aggregate. Never decreases a level.
    pub fn invalidate(&mut self, id: PropertyId, level: InvalidationLevel) {
        let mut cur = id;
        while cur.is_valid() {
            let Some(node) = self.get_mut(cur) else { break };
            node.invalidation = node.invalidation.max(level);
            cur = node.parent;
        }
        self.invalidation = self.invalidation.max(level);
    }

    /// Clear the owner aggregate and every property.
    pub fn set_valid(&mut self) {
        for node in &mut self.nodes {
            if !node.dead {
                node.invalidation = InvalidationLevel::Valid;
            }
        }
        self.invalidation = InvalidationLevel::Valid;
    }

    pub fn is_valid(&self) -> bool {
        self.invalidation == InvalidationLevel::Valid
    }

    pub fn invalidation_level(&self) -> InvalidationLevel {
        self.invalidation
    }

    // ── Copy / move semantics ──

    /// Copy-construction semantics: a new tree holding deep clones of the
    /// owned properties only. Referenced properties are not copied, and
    /// observers do not carry over.
    pub fn clone_owned(&self) -> PropertyTree {
        let mut out = PropertyTree::new();
        for &id in &self.root.order {
            if self.nodes[id.index()].owned {
                self.copy_subtree(id, &mut out, PropertyId::INVALID, true);
            }
        }
        out.invalidation = self.invalidation;
        out
    }

    /// Move-construction semantics: transfer the owned properties into a new
    /// tree and clear this one completely.
    pub fn take_owned(&mut self) -> PropertyTree {
        let level = self.invalidation;
        let mut out = PropertyTree::new();
        for &id in &self.root.order.clone() {
            if self.nodes[id.index()].owned {
                self.copy_subtree(id, &mut out, PropertyId::INVALID, false);
            }
        }
        self.clear();
        out.invalidation = level;
        out
    }

    fn copy_subtree(
        &self,
        src: PropertyId,
        dst: &mut PropertyTree,
        dst_parent: PropertyId,
        owned_only: bool,
    ) {
        let node = &self.nodes[src.index()];
        let kind = match &node.kind {
            PropertyKind::Composite(c) => PropertyKind::Composite(CompositeState {
                children: ChildSet::default(),
                collapsed: c.collapsed,
            }),
            other => other.clone(),
        };
        let Ok(new_id) = dst.add_property(dst_parent, &node.identifier, kind, node.owned) else {
            return;
        };
        {
            let copy = &mut dst.nodes[new_id.index()];
            copy.serialization_mode = node.serialization_mode;
            copy.invalidation = node.invalidation;
            copy.readonly = node.readonly;
            copy.visible = node.visible;
        }
        if let PropertyKind::Composite(c) = &node.kind {
            for &child in &c.children.order {
                if !owned_only || self.nodes[child.index()].owned {
                    self.copy_subtree(child, dst, new_id, owned_only);
                }
            }
        }
    }

    // ── Events and observers ──

    /// Register a structural-change listener.
    pub fn subscribe(&mut self) -> Receiver<OwnerEvent> {
        self.observers.subscribe()
    }

    /// Dispatch an interaction event: event properties first, then composite
    /// children, stopping at the first consumer.
    pub fn invoke_event(&self, event: &mut Event) -> Option<PropertyId> {
        self.dispatch_event(PropertyId::INVALID, event)
    }

    fn dispatch_event(&self, parent: PropertyId, event: &mut Event) -> Option<PropertyId> {
        let cs = self.child_set(parent)?;
        for &id in &cs.events {
            if let Some(es) = self.nodes[id.index()].as_event() {
                if es.event == event.name {
                    event.mark_used();
                    return Some(id);
                }
            }
        }
        for &id in &cs.composites {
            if let Some(hit) = self.dispatch_event(id, event) {
                return Some(hit);
            }
        }
        None
    }

    // ── Serialization ──

    /// True when the property has state worth writing: mode `All`, a
    /// non-default value, or (for composites) any such child.
    pub fn needs_serialization(&self, id: PropertyId) -> bool {
        let Some(node) = self.get(id) else { return false };
        if node.serialization_mode == PropertySerializationMode::All {
            return true;
        }
        match &node.kind {
            PropertyKind::Value(vs) => vs.value != vs.default,
            PropertyKind::Event(_) => false,
            PropertyKind::Composite(c) => c
                .children
                .order
                .iter()
                .any(|&child| self.needs_serialization(child)),
        }
    }

    /// Write the root owner level into an owner element: the
    /// owned-identifier list (so reload can tell recreate-from-factory apart
    /// from reset-structural) followed by the properties that need
    /// persisting.
    pub fn serialize_owner_into(&self, el: &mut Element) {
        let (owned, props) = self.owner_to_elements(PropertyId::INVALID);
        el.push_child(owned);
        el.push_child(props);
    }

    fn owner_to_elements(&self, parent: PropertyId) -> (Element, Element) {
        let mut owned_el = Element::new("OwnedPropertyIdentifiers");
        let mut props_el = Element::new("Properties");
        if let Some(cs) = self.child_set(parent) {
            for &id in &cs.order {
                let n = &self.nodes[id.index()];
                if n.owned {
                    owned_el.push_child(
                        Element::new("PropertyIdentifier").with_attr("content", n.identifier.clone()),
                    );
                }
            }
            for &id in &cs.order {
                if self.needs_serialization(id) {
                    props_el.push_child(self.property_to_element(id));
                }
            }
        }
        (owned_el, props_el)
    }

    fn property_to_element(&self, id: PropertyId) -> Element {
        let node = &self.nodes[id.index()];
        let mut el = Element::new("Property")
            .with_attr("type", node.type_attr())
            .with_attr("identifier", node.identifier.clone());
        match &node.kind {
            PropertyKind::Value(vs) => {
                el.set_attr("value", vs.value.to_attr());
            }
            PropertyKind::Event(es) => {
                el.set_attr("event", es.event.clone());
            }
            PropertyKind::Composite(c) => {
                el.set_attr("collapsed", c.collapsed.to_string());
                let (owned, props) = self.owner_to_elements(id);
                el.push_child(owned);
                el.push_child(props);
            }
        }
        el
    }

    /// Merge a persisted owner element into this owner level using the
    /// identifier-keyed diff. Only identifiers listed as owned are recreated;
    /// unlisted absent children are structural and get reset to defaults.
    /// Returns the per-element errors encountered (the caller decides how to
    /// report them).
    pub fn apply_owner_element(
        &mut self,
        parent: PropertyId,
        elem: &Element,
    ) -> Vec<SerializationError> {
        let owned_ids: Vec<String> = elem
            .child("OwnedPropertyIdentifiers")
            .map(|l| {
                l.children_by_tag("PropertyIdentifier")
                    .filter_map(|c| c.attr("content"))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let Some(list) = elem.child("Properties") else {
            return Vec::new();
        };
        let entries: Vec<&Element> = list.children_by_tag("Property").collect();

        let mut driver_errors = Vec::new();
        let mut handler = PropertyDiff {
            tree: self,
            parent,
            owned_ids,
            errors: Vec::new(),
        };
        identifier_diff(&entries, "identifier", &mut handler, &mut |e| {
            driver_errors.push(e)
        });
        let mut errors = std::mem::take(&mut handler.errors);
        errors.extend(driver_errors);
        errors
    }

    /// Apply the kind-specific state of one persisted property element.
    fn apply_property_element(
        &mut self,
        id: PropertyId,
        elem: &Element,
    ) -> Vec<SerializationError> {
        let mut errors = Vec::new();
        let Some(node) = self.get(id) else {
            return errors;
        };
        match &node.kind {
            PropertyKind::Value(vs) => {
                let type_name = vs.value.type_name();
                if let Some(raw) = elem.attr("value") {
                    match PropertyValue::from_attr(type_name, raw) {
                        Some(v) => {
                            let _ = self.set_value(id, v);
                        }
                        None => errors.push(SerializationError::InvalidAttribute {
                            key: "value".to_string(),
                            value: raw.to_string(),
                            expected: type_name.to_string(),
                        }),
                    }
                }
            }
            PropertyKind::Event(_) => {
                if let Some(ev) = elem.attr("event").map(String::from) {
                    if let Some(node) = self.get_mut(id) {
                        if let PropertyKind::Event(es) = &mut node.kind {
                            es.event = ev;
                        }
                    }
                }
            }
            PropertyKind::Composite(_) => {
                if let Some(raw) = elem.attr("collapsed") {
                    if let Ok(collapsed) = raw.parse::<bool>() {
                        if let Some(node) = self.get_mut(id) {
                            if let PropertyKind::Composite(c) = &mut node.kind {
                                c.collapsed = collapsed;
                            }
                        }
                    }
                }
                errors.extend(self.apply_owner_element(id, elem));
            }
        }
        errors
    }
}

fn validate_identifier(identifier: &str) -> Result<(), StructuralError> {
    // '.' is reserved as the path separator.
    if identifier.is_empty() || identifier.contains('.') {
        return Err(StructuralError::InvalidIdentifier {
            identifier: identifier.to_string(),
        });
    }
    Ok(())
}

/// Keyed-diff handler merging persisted properties into one owner level.
struct PropertyDiff<'a> {
    tree: &'a mut PropertyTree,
    parent: PropertyId,
    owned_ids: Vec<String>,
    errors: Vec<SerializationError>,
}

impl PropertyDiff<'_> {
    fn build_kind(element: &Element) -> SerializationResult<PropertyKind> {
        let ty = element
            .attr("type")
            .ok_or_else(|| SerializationError::MissingAttribute {
                key: "type".to_string(),
                tag: element.tag.clone(),
            })?;
        match ty {
            "composite" => Ok(PropertyKind::composite()),
            "event" => Ok(PropertyKind::event(element.attr("event").unwrap_or_default())),
            _ => {
                let raw =
                    element
                        .attr("value")
                        .ok_or_else(|| SerializationError::MissingAttribute {
                            key: "value".to_string(),
                            tag: element.tag.clone(),
                        })?;
                let value = PropertyValue::from_attr(ty, raw).ok_or_else(|| {
                    SerializationError::InvalidAttribute {
                        key: "value".to_string(),
                        value: raw.to_string(),
                        expected: ty.to_string(),
                    }
                })?;
                Ok(PropertyKind::value(value))
            }
        }
    }
}

impl KeyedDiffHandler for PropertyDiff<'_> {
    fn live_identifiers(&self) -> Vec<String> {
        self.tree.child_identifiers(self.parent)
    }

    fn current_index(&self, id: &str) -> Option<usize> {
        let pid = self.tree.property_by_identifier(self.parent, id)?;
        self.tree.child_set(self.parent)?.position(pid)
    }

    fn filter(&self, id: &str) -> bool {
        self.owned_ids.iter().any(|o| o == id)
    }

    fn on_new(&mut self, element: &Element, index: usize) -> SerializationResult<()> {
        let identifier = element.attr("identifier").unwrap_or_default().to_string();
        let kind = Self::build_kind(element)?;
        let id = self
            .tree
            .insert_property(self.parent, index, &identifier, kind, true)
            .map_err(|e| SerializationError::Rejected {
                tag: element.tag.clone(),
                reason: e.to_string(),
            })?;
        let nested = self.tree.apply_property_element(id, element);
        self.errors.extend(nested);
        Ok(())
    }

    fn on_update(&mut self, id: &str, element: &Element) -> SerializationResult<()> {
        if let Some(pid) = self.tree.property_by_identifier(self.parent, id) {
            let nested = self.tree.apply_property_element(pid, element);
            self.errors.extend(nested);
        }
        Ok(())
    }

    fn on_remove(&mut self, id: &str) {
        let Some(pid) = self.tree.property_by_identifier(self.parent, id) else {
            return;
        };
        if self.tree.nodes[pid.index()].owned {
            let _ = self.tree.remove(pid);
        } else if self.tree.nodes[pid.index()].serialization_mode
            == PropertySerializationMode::Default
        {
            // Not serialized because it was in its default state; make sure
            // it is back in that state.
            self.tree.reset_to_default(pid);
        }
    }

    fn on_move(&mut self, id: &str, index: usize) {
        if let Some(pid) = self.tree.property_by_identifier(self.parent, id) {
            self.tree.move_property(pid, index);
        }
    }
}
