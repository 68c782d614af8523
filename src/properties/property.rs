//! Property node storage and classification.
//!
//! Every property of one owner tree is a `PropertyNode` slot in the flat
//! arena. The node's `PropertyKind` decides its behavior: plain value holder,
//! composite (itself an ordered owner of sub-properties), or event handler.
//! Capability checks are explicit (`as_composite`, `as_event`) instead of
//! downcasts.

use crate::properties::id::PropertyId;
use crate::properties::value::PropertyValue;

/// Ordered severity of "needs recompute" state. Merged via max, only
/// [`set_valid`](crate::properties::PropertyTree::set_valid) goes back down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum InvalidationLevel {
    #[default]
    Valid,
    InvalidOutput,
    InvalidResources,
}

/// Controls whether a property is written to the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertySerializationMode {
    /// Skip the property when its value equals the default.
    #[default]
    Default,
    /// Always persist. Forced for owned (dynamically created) properties.
    All,
}

/// An interaction event routed through [`invoke_event`](crate::properties::PropertyTree::invoke_event).
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    used: bool,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            used: false,
        }
    }

    pub fn mark_used(&mut self) {
        self.used = true;
    }

    pub fn has_been_used(&self) -> bool {
        self.used
    }
}

/// The ordered children of one owner level (the tree root or a composite),
/// plus derived indices over event and composite children for fast dispatch.
#[derive(Debug, Clone, Default)]
pub struct ChildSet {
    pub(crate) order: Vec<PropertyId>,
    pub(crate) events: Vec<PropertyId>,
    pub(crate) composites: Vec<PropertyId>,
}

impl ChildSet {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, id: PropertyId) -> Option<usize> {
        self.order.iter().position(|&c| c == id)
    }
}

/// State of a value property: current value plus its stored default.
#[derive(Debug, Clone)]
pub struct ValueState {
    pub(crate) value: PropertyValue,
    pub(crate) default: PropertyValue,
}

/// State of a composite property — a nested owner level.
#[derive(Debug, Clone, Default)]
pub struct CompositeState {
    pub(crate) children: ChildSet,
    pub(crate) collapsed: bool,
}

/// State of an event property: the event name it consumes.
#[derive(Debug, Clone)]
pub struct EventState {
    pub(crate) event: String,
}

/// Classification of a property node.
#[derive(Debug, Clone)]
pub enum PropertyKind {
    Value(ValueState),
    Composite(CompositeState),
    Event(EventState),
}

impl PropertyKind {
    /// A value property initialized to `value`, with `value` as its default.
    pub fn value(value: PropertyValue) -> Self {
        PropertyKind::Value(ValueState {
            default: value.clone(),
            value,
        })
    }

    /// An empty composite property.
    pub fn composite() -> Self {
        PropertyKind::Composite(CompositeState::default())
    }

    /// An event property consuming events named `event`.
    pub fn event(event: impl Into<String>) -> Self {
        PropertyKind::Event(EventState {
            event: event.into(),
        })
    }
}

/// One slot in the property arena.
#[derive(Debug, Clone)]
pub struct PropertyNode {
    pub(crate) identifier: String,
    pub(crate) kind: PropertyKind,
    /// Parent composite, or INVALID when directly under the tree root.
    pub(crate) parent: PropertyId,
    /// False after detachment; a detached referenced property stays alive.
    pub(crate) attached: bool,
    /// Lifetime bound to the owner; removal destroys the node.
    pub(crate) owned: bool,
    /// Tombstone flag for destroyed owned nodes.
    pub(crate) dead: bool,
    pub(crate) invalidation: InvalidationLevel,
    pub(crate) serialization_mode: PropertySerializationMode,
    pub(crate) readonly: bool,
    pub(crate) visible: bool,
}

impl PropertyNode {
    pub(crate) fn new(identifier: String, kind: PropertyKind, owned: bool) -> Self {
        Self {
            identifier,
            kind,
            parent: PropertyId::INVALID,
            attached: false,
            owned,
            dead: false,
            invalidation: InvalidationLevel::Valid,
            serialization_mode: if owned {
                // Owned properties only exist in the workspace file, so their
                // whole state has to be written out.
                PropertySerializationMode::All
            } else {
                PropertySerializationMode::Default
            },
            readonly: false,
            visible: true,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn invalidation_level(&self) -> InvalidationLevel {
        self.invalidation
    }

    pub fn serialization_mode(&self) -> PropertySerializationMode {
        self.serialization_mode
    }

    pub fn as_value(&self) -> Option<&ValueState> {
        match &self.kind {
            PropertyKind::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeState> {
        match &self.kind {
            PropertyKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventState> {
        match &self.kind {
            PropertyKind::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, PropertyKind::Composite(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, PropertyKind::Event(_))
    }

    /// Persisted `type` attribute for this node.
    pub(crate) fn type_attr(&self) -> &'static str {
        match &self.kind {
            PropertyKind::Value(v) => v.value.type_name(),
            PropertyKind::Composite(_) => "composite",
            PropertyKind::Event(_) => "event",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_ordering() {
        assert!(InvalidationLevel::Valid < InvalidationLevel::InvalidOutput);
        assert!(InvalidationLevel::InvalidOutput < InvalidationLevel::InvalidResources);
        assert_eq!(
            InvalidationLevel::InvalidOutput.max(InvalidationLevel::Valid),
            InvalidationLevel::InvalidOutput
        );
    }

    #[test]
    fn test_owned_forces_serialization_mode() {
        let n = PropertyNode::new(
            "iso".into(),
            PropertyKind::value(PropertyValue::Float(0.5)),
            true,
        );
        assert_eq!(n.serialization_mode(), PropertySerializationMode::All);

        let n = PropertyNode::new(
            "iso".into(),
            PropertyKind::value(PropertyValue::Float(0.5)),
            false,
        );
        assert_eq!(n.serialization_mode(), PropertySerializationMode::Default);
    }

    #[test]
    fn test_capability_checks() {
        let comp = PropertyNode::new("group".into(), PropertyKind::composite(), false);
        assert!(comp.as_composite().is_some());
        assert!(comp.as_event().is_none());
        assert!(comp.as_value().is_none());

        let ev = PropertyNode::new("hotkey".into(), PropertyKind::event("toggle"), false);
        assert!(ev.as_event().is_some());
        assert_eq!(ev.type_attr(), "event");
    }

    #[test]
    fn test_event_usage() {
        let mut ev = Event::new("toggle");
        assert!(!ev.has_been_used());
        ev.mark_used();
        assert!(ev.has_been_used());
    }
}
