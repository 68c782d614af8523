//! The processor network: processors, connections, property links.
//!
//! The network owns its processors through `Rc` so transient external
//! holders (an inspector panel, an undo entry) never dangle: removal unlinks
//! a processor from the graph immediately, final destruction happens when the
//! last reference goes away. Edges are stored once each, keyed by path
//! strings relative to processor identifiers.

use crate::network::connection::{PortConnection, PortRef, PropertyLink};
use crate::network::error::{NetworkError, NetworkResult};
use crate::network::lock::{NetworkEvent, NetworkLock, NetworkNotifier};
use crate::network::processor::Processor;
use crate::properties::{PropertyPath, PropertyValue};
use crate::serialization::{
    identifier_diff, Deserializer, Element, KeyedDiffHandler, SerializationError,
    SerializationResult, Serializer,
};
use crossbeam_channel::Receiver;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

/// Version of the persisted network format. Bump together with a converter
/// in [`migrate_document`].
pub const PROCESSOR_NETWORK_VERSION: u32 = 21;

/// Instantiates processors by class identifier during deserialization.
/// Implemented by the module manager over the registered factories.
pub trait ProcessorFactory {
    /// Create a processor of the given class, or `None` when no registered
    /// module provides it.
    fn create_processor(&self, class_identifier: &str) -> Option<Processor>;
}

#[derive(Debug, Default)]
pub struct ProcessorNetwork {
    processors: Vec<Rc<RefCell<Processor>>>,
    connections: Vec<PortConnection>,
    links: Vec<PropertyLink>,
    notifier: NetworkNotifier,
}

impl ProcessorNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Processors ──

    /// Insert a processor, renaming it with a numeric suffix when its
    /// identifier is already taken. Returns the shared handle.
    pub fn add_processor(&mut self, mut processor: Processor) -> Rc<RefCell<Processor>> {
        let unique = self.unique_identifier(processor.identifier());
        if unique != processor.identifier() {
            tracing::debug!(
                "Renaming processor '{}' to '{}'",
                processor.identifier(),
                unique
            );
            processor.set_identifier(unique.clone());
        }
        let rc = Rc::new(RefCell::new(processor));
        self.processors.push(rc.clone());
        self.notifier
            .notify(NetworkEvent::ProcessorAdded { identifier: unique });
        rc
    }

    /// Remove a processor and every connection and link that involves it.
    /// The returned handle keeps the processor alive for external holders.
    pub fn remove_processor(&mut self, identifier: &str) -> Option<Rc<RefCell<Processor>>> {
        let pos = self.position(identifier)?;

        let stale_connections: Vec<PortConnection> = self
            .connections
            .iter()
            .filter(|c| c.involves(identifier))
            .cloned()
            .collect();
        for conn in stale_connections {
            self.remove_connection(&conn);
        }
        let stale_links: Vec<PropertyLink> = self
            .links
            .iter()
            .filter(|l| l.involves(identifier))
            .cloned()
            .collect();
        for link in stale_links {
            self.remove_link(&link);
        }

        let rc = self.processors.remove(pos);
        self.notifier.notify(NetworkEvent::ProcessorRemoved {
            identifier: identifier.to_string(),
        });
        Some(rc)
    }

    pub fn processor(&self, identifier: &str) -> Option<&Rc<RefCell<Processor>>> {
        self.processors
            .iter()
            .find(|p| p.borrow().identifier() == identifier)
    }

    fn position(&self, identifier: &str) -> Option<usize> {
        self.processors
            .iter()
            .position(|p| p.borrow().identifier() == identifier)
    }

    pub fn processors(&self) -> &[Rc<RefCell<Processor>>] {
        &self.processors
    }

    pub fn processor_identifiers(&self) -> Vec<String> {
        self.processors
            .iter()
            .map(|p| p.borrow().identifier().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    fn unique_identifier(&self, base: &str) -> String {
        let base = if base.is_empty() { "processor" } else { base };
        if self.position(base).is_none() {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{} {}", base, n);
            if self.position(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    // ── Connections ──

    /// Connect an outport to an inport. Endpoints must exist, the port kinds
    /// must match, and the inport's fan-in bound must not be exceeded.
    pub fn add_connection(&mut self, outport: PortRef, inport: PortRef) -> NetworkResult<()> {
        let out_port = {
            let rc = self
                .processor(&outport.processor)
                .ok_or_else(|| NetworkError::UnknownProcessor {
                    identifier: outport.processor.clone(),
                })?;
            let p = rc.borrow();
            p.outport(&outport.port)
                .ok_or_else(|| NetworkError::UnknownPort {
                    processor: outport.processor.clone(),
                    port: outport.port.clone(),
                })?
                .clone()
        };
        let in_port = {
            let rc = self
                .processor(&inport.processor)
                .ok_or_else(|| NetworkError::UnknownProcessor {
                    identifier: inport.processor.clone(),
                })?;
            let p = rc.borrow();
            p.inport(&inport.port)
                .ok_or_else(|| NetworkError::UnknownPort {
                    processor: inport.processor.clone(),
                    port: inport.port.clone(),
                })?
                .clone()
        };

        if !in_port.can_connect_to(&out_port) {
            return Err(NetworkError::IncompatiblePorts {
                outport: outport.to_string(),
                inport: inport.to_string(),
            });
        }
        let connection = PortConnection::new(outport, inport);
        if self.connections.contains(&connection) {
            return Err(NetworkError::DuplicateConnection {
                outport: connection.outport.to_string(),
                inport: connection.inport.to_string(),
            });
        }
        let fan_in = self
            .connections
            .iter()
            .filter(|c| c.inport == connection.inport)
            .count();
        if fan_in >= in_port.max_connections {
            return Err(NetworkError::InportFull {
                inport: connection.inport.to_string(),
                max: in_port.max_connections,
            });
        }

        self.notifier.notify(NetworkEvent::ConnectionAdded {
            outport: connection.outport.to_string(),
            inport: connection.inport.to_string(),
        });
        self.connections.push(connection);
        Ok(())
    }

    pub fn remove_connection(&mut self, connection: &PortConnection) -> bool {
        let Some(pos) = self.connections.iter().position(|c| c == connection) else {
            return false;
        };
        self.connections.remove(pos);
        self.notifier.notify(NetworkEvent::ConnectionRemoved {
            outport: connection.outport.to_string(),
            inport: connection.inport.to_string(),
        });
        true
    }

    pub fn connections(&self) -> &[PortConnection] {
        &self.connections
    }

    // ── Property links ──

    /// Add a directed link. Endpoints must be distinct, existing properties;
    /// each edge is stored once.
    pub fn add_link(&mut self, src: PropertyPath, dst: PropertyPath) -> NetworkResult<()> {
        if src == dst {
            return Err(NetworkError::SelfLink {
                path: src.to_string(),
            });
        }
        self.resolve_property(&src)?;
        self.resolve_property(&dst)?;

        let link = PropertyLink::new(src, dst);
        if self.links.contains(&link) {
            return Err(NetworkError::DuplicateLink {
                src: link.src.to_string(),
                dst: link.dst.to_string(),
            });
        }
        self.notifier.notify(NetworkEvent::LinkAdded {
            src: link.src.to_string(),
            dst: link.dst.to_string(),
        });
        self.links.push(link);
        Ok(())
    }

    pub fn remove_link(&mut self, link: &PropertyLink) -> bool {
        let Some(pos) = self.links.iter().position(|l| l == link) else {
            return false;
        };
        self.links.remove(pos);
        self.notifier.notify(NetworkEvent::LinkRemoved {
            src: link.src.to_string(),
            dst: link.dst.to_string(),
        });
        true
    }

    pub fn links(&self) -> &[PropertyLink] {
        &self.links
    }

    /// Links with the given property as source.
    pub fn links_from(&self, src: &PropertyPath) -> Vec<&PropertyLink> {
        self.links.iter().filter(|l| &l.src == src).collect()
    }

    fn resolve_property(&self, path: &PropertyPath) -> NetworkResult<()> {
        let rc = self
            .processor(&path.processor)
            .ok_or_else(|| NetworkError::UnknownProcessor {
                identifier: path.processor.clone(),
            })?;
        let p = rc.borrow();
        p.properties()
            .property_by_path(&path.property)
            .map(|_| ())
            .ok_or_else(|| NetworkError::UnknownProperty {
                path: path.to_string(),
            })
    }

    // ── Values and link propagation ──

    pub fn property_value(&self, path: &PropertyPath) -> Option<PropertyValue> {
        let rc = self.processor(&path.processor)?;
        let p = rc.borrow();
        let id = p.properties().property_by_path(&path.property)?;
        p.properties().value(id).cloned()
    }

    /// Set a property value and propagate it along outgoing links,
    /// breadth-first through transitive chains. A shared visited set keeps
    /// cyclic link arrangements from looping.
    pub fn set_property(&mut self, path: &PropertyPath, value: PropertyValue) -> NetworkResult<bool> {
        let changed = self.set_value_no_propagate(path, value)?;
        if changed {
            self.propagate_links(path);
        }
        Ok(changed)
    }

    fn set_value_no_propagate(
        &self,
        path: &PropertyPath,
        value: PropertyValue,
    ) -> NetworkResult<bool> {
        let rc = self
            .processor(&path.processor)
            .ok_or_else(|| NetworkError::UnknownProcessor {
                identifier: path.processor.clone(),
            })?;
        let mut p = rc.borrow_mut();
        let id = p
            .properties()
            .property_by_path(&path.property)
            .ok_or_else(|| NetworkError::UnknownProperty {
                path: path.to_string(),
            })?;
        Ok(p.properties_mut().set_value(id, value)?)
    }

    fn propagate_links(&mut self, start: &PropertyPath) {
        let mut visited: HashSet<PropertyPath> = HashSet::from([start.clone()]);
        let mut queue: VecDeque<PropertyPath> = VecDeque::from([start.clone()]);

        while let Some(current) = queue.pop_front() {
            let Some(value) = self.property_value(&current) else {
                continue;
            };
            let targets: Vec<PropertyPath> = self
                .links
                .iter()
                .filter(|l| l.src == current)
                .map(|l| l.dst.clone())
                .collect();
            for dst in targets {
                if visited.contains(&dst) {
                    continue;
                }
                match self.set_value_no_propagate(&dst, value.clone()) {
                    Ok(true) => {
                        visited.insert(dst.clone());
                        queue.push_back(dst);
                    }
                    Ok(false) => {
                        visited.insert(dst);
                    }
                    Err(e) => {
                        tracing::debug!("Skipping property link into {}: {}", dst, e);
                        visited.insert(dst);
                    }
                }
            }
        }
    }

    // ── Observers and locking ──

    pub fn subscribe(&self) -> Receiver<NetworkEvent> {
        self.notifier.subscribe()
    }

    /// Scoped suppression of change notifications; see [`NetworkLock`].
    pub fn lock(&self) -> NetworkLock {
        self.notifier.lock()
    }

    /// Remove all links, connections and processors, processors in reverse
    /// insertion order.
    pub fn clear(&mut self) {
        let _lock = self.lock();
        for link in self.links.clone() {
            self.remove_link(&link);
        }
        for conn in self.connections.clone() {
            self.remove_connection(&conn);
        }
        for identifier in self.processor_identifiers().into_iter().rev() {
            self.remove_processor(&identifier);
        }
    }

    // ── Serialization ──

    /// Serialize the whole network into a document tree.
    pub fn serialize_document(&self) -> Element {
        let mut s = Serializer::new("ProcessorNetwork");
        s.element_with_content(
            "ProcessorNetworkVersion",
            PROCESSOR_NETWORK_VERSION.to_string(),
        );
        {
            let mut sw = s.begin_element("Processors");
            for p in &self.processors {
                let el = p.borrow().to_element();
                sw.push_element(el);
            }
        }
        {
            let mut sw = s.begin_element("Connections");
            for c in &self.connections {
                sw.push_element(connection_element(c));
            }
        }
        {
            let mut sw = s.begin_element("PropertyLinks");
            for l in &self.links {
                sw.push_element(link_element(l));
            }
        }
        s.finish()
    }

    /// Merge a persisted document into this network: processors are diffed
    /// by identifier (created via the factory, removed, reordered), then
    /// edges are rebuilt from the document. Malformed edges are skipped via
    /// the deserializer's error hook; a version newer than this build aborts.
    pub fn deserialize_document(
        &mut self,
        mut root: Element,
        factory: &dyn ProcessorFactory,
    ) -> SerializationResult<()> {
        let version = migrate_document(&mut root)?;
        let mut d = Deserializer::from_element(root);
        d.set_version(version);

        let _lock = self.lock();

        {
            let entries: Vec<&Element> = d
                .current()
                .child("Processors")
                .map(|list| list.children_by_tag("Processor").collect())
                .unwrap_or_default();
            let mut handler = ProcessorDiff {
                network: self,
                factory,
                errors: Vec::new(),
            };
            identifier_diff(&entries, "identifier", &mut handler, &mut |e| {
                d.handle_error(e)
            });
            let errors = std::mem::take(&mut handler.errors);
            drop(handler);
            for e in errors {
                d.handle_error(e);
            }
        }

        // Edges are rebuilt from scratch.
        for link in self.links.clone() {
            self.remove_link(&link);
        }
        for conn in self.connections.clone() {
            self.remove_connection(&conn);
        }
        for el in d
            .current()
            .child("Connections")
            .map(|l| l.children_by_tag("Connection").collect::<Vec<_>>())
            .unwrap_or_default()
        {
            if let Err(e) = self.add_connection_from_element(el) {
                d.handle_error(e);
            }
        }
        for el in d
            .current()
            .child("PropertyLinks")
            .map(|l| l.children_by_tag("PropertyLink").collect::<Vec<_>>())
            .unwrap_or_default()
        {
            if let Err(e) = self.add_link_from_element(el) {
                d.handle_error(e);
            }
        }
        Ok(())
    }

    pub(crate) fn add_connection_from_element(
        &mut self,
        el: &Element,
    ) -> SerializationResult<()> {
        let (src, dst) = edge_endpoints(el)?;
        let outport = PortRef::parse(&src).ok_or_else(|| SerializationError::InvalidAttribute {
            key: "src".to_string(),
            value: src.clone(),
            expected: "processor.port".to_string(),
        })?;
        let inport = PortRef::parse(&dst).ok_or_else(|| SerializationError::InvalidAttribute {
            key: "dst".to_string(),
            value: dst.clone(),
            expected: "processor.port".to_string(),
        })?;
        self.add_connection(outport, inport)
            .map_err(|e| SerializationError::Rejected {
                tag: el.tag.clone(),
                reason: e.to_string(),
            })
    }

    pub(crate) fn add_link_from_element(&mut self, el: &Element) -> SerializationResult<()> {
        let (src, dst) = edge_endpoints(el)?;
        let src =
            PropertyPath::parse(&src).ok_or_else(|| SerializationError::InvalidAttribute {
                key: "src".to_string(),
                value: src.clone(),
                expected: "processor.property".to_string(),
            })?;
        let dst =
            PropertyPath::parse(&dst).ok_or_else(|| SerializationError::InvalidAttribute {
                key: "dst".to_string(),
                value: dst.clone(),
                expected: "processor.property".to_string(),
            })?;
        self.add_link(src, dst)
            .map_err(|e| SerializationError::Rejected {
                tag: el.tag.clone(),
                reason: e.to_string(),
            })
    }

    pub(crate) fn reorder_processor(&mut self, identifier: &str, index: usize) {
        if let Some(pos) = self.position(identifier) {
            let rc = self.processors.remove(pos);
            let index = index.min(self.processors.len());
            self.processors.insert(index, rc);
        }
    }
}

pub(crate) fn connection_element(c: &PortConnection) -> Element {
    Element::new("Connection")
        .with_attr("src", c.outport.to_string())
        .with_attr("dst", c.inport.to_string())
}

pub(crate) fn link_element(l: &PropertyLink) -> Element {
    Element::new("PropertyLink")
        .with_attr("src", l.src.to_string())
        .with_attr("dst", l.dst.to_string())
}

pub(crate) fn edge_endpoints(el: &Element) -> SerializationResult<(String, String)> {
    let src = el
        .attr("src")
        .ok_or_else(|| SerializationError::MissingAttribute {
            key: "src".to_string(),
            tag: el.tag.clone(),
        })?;
    let dst = el
        .attr("dst")
        .ok_or_else(|| SerializationError::MissingAttribute {
            key: "dst".to_string(),
            tag: el.tag.clone(),
        })?;
    Ok((src.to_string(), dst.to_string()))
}

/// Upgrade older documents in place and return the version found. Documents
/// newer than this build are refused.
pub fn migrate_document(root: &mut Element) -> SerializationResult<u32> {
    let version: u32 = root
        .child("ProcessorNetworkVersion")
        .and_then(|e| e.attr("content"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if version > PROCESSOR_NETWORK_VERSION {
        return Err(SerializationError::UnsupportedVersion {
            found: version,
            supported: PROCESSOR_NETWORK_VERSION,
        });
    }
    for v in version..PROCESSOR_NETWORK_VERSION {
        convert_from(root, v);
    }
    Ok(version)
}

/// One converter step per historical version bump.
fn convert_from(root: &mut Element, version: u32) {
    if version == 20 {
        // Version 20 stored links under "Links" with "Link" items.
        if let Some(links) = root.child_mut("Links") {
            links.tag = "PropertyLinks".to_string();
            for child in &mut links.children {
                if child.tag == "Link" {
                    child.tag = "PropertyLink".to_string();
                }
            }
        }
    }
}

/// Keyed-diff handler merging persisted processors into the live network.
struct ProcessorDiff<'a> {
    network: &'a mut ProcessorNetwork,
    factory: &'a dyn ProcessorFactory,
    errors: Vec<SerializationError>,
}

impl KeyedDiffHandler for ProcessorDiff<'_> {
    fn live_identifiers(&self) -> Vec<String> {
        self.network.processor_identifiers()
    }

    fn current_index(&self, id: &str) -> Option<usize> {
        self.network.position(id)
    }

    fn on_new(&mut self, element: &Element, index: usize) -> SerializationResult<()> {
        let class = element
            .attr("type")
            .ok_or_else(|| SerializationError::MissingAttribute {
                key: "type".to_string(),
                tag: element.tag.clone(),
            })?;
        let identifier = element.attr("identifier").unwrap_or_default();
        let mut processor =
            self.factory
                .create_processor(class)
                .ok_or_else(|| SerializationError::Rejected {
                    tag: element.tag.clone(),
                    reason: format!("no factory for processor type '{}'", class),
                })?;
        processor.set_identifier(identifier);
        self.errors.extend(processor.apply_element(element));

        let rc = self.network.add_processor(processor);
        let actual = rc.borrow().identifier().to_string();
        self.network.reorder_processor(&actual, index);
        Ok(())
    }

    fn on_update(&mut self, id: &str, element: &Element) -> SerializationResult<()> {
        if let Some(rc) = self.network.processor(id) {
            let rc = rc.clone();
            let errors = rc.borrow_mut().apply_element(element);
            self.errors.extend(errors);
        }
        Ok(())
    }

    fn on_remove(&mut self, id: &str) {
        self.network.remove_processor(id);
    }

    fn on_move(&mut self, id: &str, index: usize) {
        self.network.reorder_processor(id, index);
    }
}
