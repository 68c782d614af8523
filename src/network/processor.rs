//! A computation node: a property owner plus typed ports.

use crate::network::port::{Inport, Outport};
use crate::properties::{PropertyId, PropertyTree};
use crate::serialization::{Element, SerializationError};

/// A processor in the network: identified by a network-unique string, built
/// by a factory keyed on `class_identifier`, owning its properties and
/// declaring its ports.
#[derive(Debug, Default)]
pub struct Processor {
    identifier: String,
    class_identifier: String,
    properties: PropertyTree,
    inports: Vec<Inport>,
    outports: Vec<Outport>,
    /// Explicitly marks a terminal processor, e.g. an exporter that has
    /// outports but still roots the evaluation order.
    sink_hint: bool,
}

impl Processor {
    pub fn new(class_identifier: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            class_identifier: class_identifier.into(),
            properties: PropertyTree::new(),
            inports: Vec::new(),
            outports: Vec::new(),
            sink_hint: false,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = identifier.into();
    }

    pub fn class_identifier(&self) -> &str {
        &self.class_identifier
    }

    pub fn properties(&self) -> &PropertyTree {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyTree {
        &mut self.properties
    }

    // ── Ports ──

    pub fn add_inport(&mut self, inport: Inport) {
        self.inports.push(inport);
    }

    pub fn add_outport(&mut self, outport: Outport) {
        self.outports.push(outport);
    }

    pub fn inports(&self) -> &[Inport] {
        &self.inports
    }

    pub fn outports(&self) -> &[Outport] {
        &self.outports
    }

    pub fn inport(&self, identifier: &str) -> Option<&Inport> {
        self.inports.iter().find(|p| p.identifier == identifier)
    }

    pub fn inport_mut(&mut self, identifier: &str) -> Option<&mut Inport> {
        self.inports.iter_mut().find(|p| p.identifier == identifier)
    }

    pub fn outport(&self, identifier: &str) -> Option<&Outport> {
        self.outports.iter().find(|p| p.identifier == identifier)
    }

    // ── Evaluation hints ──

    pub fn set_sink_hint(&mut self, sink: bool) {
        self.sink_hint = sink;
    }

    /// A sink has no outgoing data dependency: no outports at all, or an
    /// explicit terminal marker.
    pub fn is_sink(&self) -> bool {
        self.sink_hint || self.outports.is_empty()
    }

    /// Whether traversal may follow connections into the given inport.
    /// Runtime-disabled optional inputs return false.
    pub fn is_connection_active(&self, inport: &str) -> bool {
        self.inport(inport).map(|p| p.active).unwrap_or(false)
    }

    pub fn set_connection_active(&mut self, inport: &str, active: bool) {
        if let Some(port) = self.inport_mut(inport) {
            port.active = active;
        }
    }

    // ── Serialization ──

    /// Processor element: identity attributes plus the property state. Ports
    /// are structural and recreated by the factory, so they are not
    /// persisted.
    pub fn to_element(&self) -> Element {
        let mut el = Element::new("Processor")
            .with_attr("type", self.class_identifier.clone())
            .with_attr("identifier", self.identifier.clone());
        if self.sink_hint {
            el.set_attr("sink", "true");
        }
        self.properties.serialize_owner_into(&mut el);
        el
    }

    /// Merge a persisted processor element into this instance. Per-property
    /// problems are returned for the caller's `handle_error` hook.
    pub fn apply_element(&mut self, elem: &Element) -> Vec<SerializationError> {
        if elem.attr("sink") == Some("true") {
            self.sink_hint = true;
        }
        self.properties
            .apply_owner_element(PropertyId::INVALID, elem)
    }
}
