//! Partial (selection-based) network save and append.
//!
//! Saving a subset splits edges by how they cross the selection boundary:
//! connections are either internal (both endpoints selected) or external
//! (incoming from outside), links split into internal, outgoing and
//! incoming groups. Appending the document into another network remaps
//! colliding processor identifiers and rewrites edge endpoints only on the
//! selected side, so external edges reattach to surviving counterparts and
//! silently drop when the counterpart is gone.

use crate::network::connection::PortRef;
use crate::network::network::{
    connection_element, edge_endpoints, link_element, migrate_document, ProcessorFactory,
    ProcessorNetwork, PROCESSOR_NETWORK_VERSION,
};
use crate::network::processor::Processor;
use crate::properties::PropertyPath;
use crate::serialization::{
    Deserializer, Element, SerializationError, SerializationResult, Serializer,
};
use std::collections::{HashMap, HashSet};

/// Serialize the selected processors plus the edges touching them.
pub fn serialize_selected(network: &ProcessorNetwork, selection: &[String]) -> Element {
    let selected: HashSet<&str> = selection.iter().map(String::as_str).collect();

    let mut s = Serializer::new("ProcessorNetwork");
    s.element_with_content(
        "ProcessorNetworkVersion",
        PROCESSOR_NETWORK_VERSION.to_string(),
    );
    {
        let mut sw = s.begin_element("Processors");
        for rc in network.processors() {
            let p = rc.borrow();
            if selected.contains(p.identifier()) {
                let el = p.to_element();
                sw.push_element(el);
            }
        }
    }

    let mut internal = Vec::new();
    let mut external = Vec::new();
    for conn in network.connections() {
        let in_selected = selected.contains(conn.inport.processor.as_str());
        let out_selected = selected.contains(conn.outport.processor.as_str());
        if in_selected && out_selected {
            internal.push(conn);
        } else if in_selected {
            external.push(conn);
        }
    }
    {
        let mut sw = s.begin_element("InternalConnections");
        for conn in internal {
            sw.push_element(connection_element(conn));
        }
    }
    {
        let mut sw = s.begin_element("ExternalConnections");
        for conn in external {
            sw.push_element(connection_element(conn));
        }
    }

    let mut internal_links = Vec::new();
    let mut out_links = Vec::new();
    let mut in_links = Vec::new();
    for link in network.links() {
        let src_selected = selected.contains(link.src.processor.as_str());
        let dst_selected = selected.contains(link.dst.processor.as_str());
        if src_selected && dst_selected {
            internal_links.push(link);
        } else if src_selected {
            out_links.push(link);
        } else if dst_selected {
            in_links.push(link);
        }
    }
    {
        let mut sw = s.begin_element("InternalPropertyLinks");
        for link in internal_links {
            sw.push_element(link_element(link));
        }
    }
    {
        let mut sw = s.begin_element("OutPropertyLinks");
        for link in out_links {
            sw.push_element(link_element(link));
        }
    }
    {
        let mut sw = s.begin_element("InPropertyLinks");
        for link in in_links {
            sw.push_element(link_element(link));
        }
    }
    s.finish()
}

/// Which endpoints of an edge group get rewritten through the identifier
/// remap when appending.
#[derive(Clone, Copy)]
enum Remap {
    Both,
    SrcOnly,
    DstOnly,
}

/// Append a partial-network document into an existing network. Processors
/// are always created fresh (renamed on identifier collision); edges are
/// rewritten through the resulting identifier map on their selected side.
/// Returns the identifiers of the processors that were added; skipped
/// malformed or unattachable edges are routed through the deserializer's
/// error hook.
pub fn append_partial(
    network: &mut ProcessorNetwork,
    mut root: Element,
    factory: &dyn ProcessorFactory,
) -> SerializationResult<Vec<String>> {
    migrate_document(&mut root)?;
    let d = Deserializer::from_element(root);
    let _lock = network.lock();

    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut added = Vec::new();

    for el in d
        .current()
        .child("Processors")
        .map(|l| l.children_by_tag("Processor").collect::<Vec<_>>())
        .unwrap_or_default()
    {
        match instantiate(el, factory) {
            Ok((original_id, processor, errors)) => {
                for e in errors {
                    d.handle_error(e);
                }
                let rc = network.add_processor(processor);
                let new_id = rc.borrow().identifier().to_string();
                id_map.insert(original_id, new_id.clone());
                added.push(new_id);
            }
            Err(e) => d.handle_error(e),
        }
    }

    append_connections(network, &d, "InternalConnections", &id_map, Remap::Both);
    append_connections(network, &d, "ExternalConnections", &id_map, Remap::DstOnly);
    append_links(network, &d, "InternalPropertyLinks", &id_map, Remap::Both);
    append_links(network, &d, "OutPropertyLinks", &id_map, Remap::SrcOnly);
    append_links(network, &d, "InPropertyLinks", &id_map, Remap::DstOnly);

    Ok(added)
}

fn instantiate(
    el: &Element,
    factory: &dyn ProcessorFactory,
) -> SerializationResult<(String, Processor, Vec<SerializationError>)> {
    let class = el
        .attr("type")
        .ok_or_else(|| SerializationError::MissingAttribute {
            key: "type".to_string(),
            tag: el.tag.clone(),
        })?;
    let identifier = el.attr("identifier").unwrap_or_default().to_string();
    let mut processor =
        factory
            .create_processor(class)
            .ok_or_else(|| SerializationError::Rejected {
                tag: el.tag.clone(),
                reason: format!("no factory for processor type '{}'", class),
            })?;
    processor.set_identifier(identifier.clone());
    let errors = processor.apply_element(el);
    Ok((identifier, processor, errors))
}

fn append_connections(
    network: &mut ProcessorNetwork,
    d: &Deserializer,
    group: &str,
    id_map: &HashMap<String, String>,
    remap: Remap,
) {
    for el in d
        .current()
        .child(group)
        .map(|l| l.children_by_tag("Connection").collect::<Vec<_>>())
        .unwrap_or_default()
    {
        let result = edge_endpoints(el).and_then(|(src, dst)| {
            let mut outport =
                PortRef::parse(&src).ok_or_else(|| SerializationError::InvalidAttribute {
                    key: "src".to_string(),
                    value: src.clone(),
                    expected: "processor.port".to_string(),
                })?;
            let mut inport =
                PortRef::parse(&dst).ok_or_else(|| SerializationError::InvalidAttribute {
                    key: "dst".to_string(),
                    value: dst.clone(),
                    expected: "processor.port".to_string(),
                })?;
            if matches!(remap, Remap::Both | Remap::SrcOnly) {
                outport.remap_processor(id_map);
            }
            if matches!(remap, Remap::Both | Remap::DstOnly) {
                inport.remap_processor(id_map);
            }
            network
                .add_connection(outport, inport)
                .map_err(|e| SerializationError::Rejected {
                    tag: el.tag.clone(),
                    reason: e.to_string(),
                })
        });
        if let Err(e) = result {
            d.handle_error(e);
        }
    }
}

fn append_links(
    network: &mut ProcessorNetwork,
    d: &Deserializer,
    group: &str,
    id_map: &HashMap<String, String>,
    remap: Remap,
) {
    for el in d
        .current()
        .child(group)
        .map(|l| l.children_by_tag("PropertyLink").collect::<Vec<_>>())
        .unwrap_or_default()
    {
        let result = edge_endpoints(el).and_then(|(src, dst)| {
            let mut src =
                PropertyPath::parse(&src).ok_or_else(|| SerializationError::InvalidAttribute {
                    key: "src".to_string(),
                    value: src.clone(),
                    expected: "processor.property".to_string(),
                })?;
            let mut dst =
                PropertyPath::parse(&dst).ok_or_else(|| SerializationError::InvalidAttribute {
                    key: "dst".to_string(),
                    value: dst.clone(),
                    expected: "processor.property".to_string(),
                })?;
            if matches!(remap, Remap::Both | Remap::SrcOnly) {
                src.remap_processor(id_map);
            }
            if matches!(remap, Remap::Both | Remap::DstOnly) {
                dst.remap_processor(id_map);
            }
            network
                .add_link(src, dst)
                .map_err(|e| SerializationError::Rejected {
                    tag: el.tag.clone(),
                    reason: e.to_string(),
                })
        });
        if let Err(e) = result {
            d.handle_error(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::port::{DataKind, Inport, Outport};
    use crate::network::processor::Processor;
    use crate::properties::{PropertyId, PropertyKind, PropertyValue};

    struct TestFactory;

    impl ProcessorFactory for TestFactory {
        fn create_processor(&self, class_identifier: &str) -> Option<Processor> {
            let mut p = Processor::new(class_identifier, "processor");
            match class_identifier {
                "test.Source" => {
                    p.add_outport(Outport::new("outport", DataKind::Volume));
                }
                "test.Transform" => {
                    p.add_inport(Inport::new("inport", DataKind::Volume).with_max_connections(4));
                    p.add_outport(Outport::new("outport", DataKind::Volume));
                }
                "test.Sink" => {
                    p.add_inport(Inport::new("inport", DataKind::Volume).with_max_connections(4));
                }
                _ => return None,
            }
            p.properties_mut()
                .add_property(
                    PropertyId::INVALID,
                    "iso",
                    PropertyKind::value(PropertyValue::Float(0.5)),
                    false,
                )
                .ok()?;
            Some(p)
        }
    }

    fn build(class: &str, id: &str) -> Processor {
        let mut p = TestFactory.create_processor(class).unwrap();
        p.set_identifier(id);
        p
    }

    /// source -> mid -> out, with links in both directions across the
    /// selection boundary.
    fn sample_network() -> ProcessorNetwork {
        let mut network = ProcessorNetwork::new();
        network.add_processor(build("test.Source", "src"));
        network.add_processor(build("test.Transform", "mid"));
        network.add_processor(build("test.Sink", "out"));
        network
            .add_connection(PortRef::new("src", "outport"), PortRef::new("mid", "inport"))
            .unwrap();
        network
            .add_connection(PortRef::new("mid", "outport"), PortRef::new("out", "inport"))
            .unwrap();
        network
            .add_link(PropertyPath::new("src", "iso"), PropertyPath::new("mid", "iso"))
            .unwrap();
        network
            .add_link(PropertyPath::new("mid", "iso"), PropertyPath::new("out", "iso"))
            .unwrap();
        network
    }

    #[test]
    fn test_selection_splits_edge_groups() {
        let network = sample_network();
        let doc = serialize_selected(&network, &["mid".to_string()]);

        let procs: Vec<_> = doc
            .child("Processors")
            .unwrap()
            .children_by_tag("Processor")
            .filter_map(|c| c.attr("identifier"))
            .collect();
        assert_eq!(procs, ["mid"]);

        // src->mid is incoming external; mid->out is outgoing and dropped.
        assert_eq!(doc.child("InternalConnections").unwrap().children.len(), 0);
        assert_eq!(doc.child("ExternalConnections").unwrap().children.len(), 1);
        // src.iso->mid.iso comes in, mid.iso->out.iso goes out.
        assert_eq!(doc.child("InPropertyLinks").unwrap().children.len(), 1);
        assert_eq!(doc.child("OutPropertyLinks").unwrap().children.len(), 1);
        assert_eq!(
            doc.child("InternalPropertyLinks").unwrap().children.len(),
            0
        );
    }

    #[test]
    fn test_append_into_same_network_renames_and_reattaches() {
        let mut network = sample_network();
        let doc = serialize_selected(&network, &["mid".to_string()]);

        let added = append_partial(&mut network, doc, &TestFactory).unwrap();
        assert_eq!(added, ["mid 2"]);

        // The pasted copy reattached to the surviving external counterparts.
        assert!(network.connections().iter().any(|c| {
            c.outport.processor == "src" && c.inport.processor == "mid 2"
        }));
        assert!(network
            .links()
            .iter()
            .any(|l| l.src.processor == "src" && l.dst.processor == "mid 2"));
        assert!(network
            .links()
            .iter()
            .any(|l| l.src.processor == "mid 2" && l.dst.processor == "out"));
    }

    #[test]
    fn test_append_into_empty_network_drops_external_edges() {
        let network = sample_network();
        let doc = serialize_selected(&network, &["mid".to_string()]);

        let mut empty = ProcessorNetwork::new();
        let added = append_partial(&mut empty, doc, &TestFactory).unwrap();
        assert_eq!(added, ["mid"]);

        // No counterpart processors: external edges are skipped, not errors.
        assert!(empty.connections().is_empty());
        assert!(empty.links().is_empty());
    }

    #[test]
    fn test_append_selection_with_internal_edges() {
        let mut network = sample_network();
        let doc =
            serialize_selected(&network, &["src".to_string(), "mid".to_string()]);

        let added = append_partial(&mut network, doc, &TestFactory).unwrap();
        assert_eq!(added, ["src 2", "mid 2"]);

        // Internal connection remapped on both sides.
        assert!(network.connections().iter().any(|c| {
            c.outport.processor == "src 2" && c.inport.processor == "mid 2"
        }));
        // Internal link likewise.
        assert!(network
            .links()
            .iter()
            .any(|l| l.src.processor == "src 2" && l.dst.processor == "mid 2"));
    }
}
