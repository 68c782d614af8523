//! Edges of the network graph: port connections and property links.
//!
//! Endpoints are recorded as path strings relative to processor identifiers
//! (`processor.port`, `processor.prop.sub`), the same representation the
//! workspace format uses, so edges survive identifier remapping on partial
//! paste.

use crate::properties::PropertyPath;
use std::collections::HashMap;
use std::fmt;

/// Address of a port: processor identifier plus port identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub processor: String,
    pub port: String,
}

impl PortRef {
    pub fn new(processor: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            port: port.into(),
        }
    }

    /// Parse `processor.port`. The port segment is the part after the last
    /// `.` so processor identifiers with dots stay addressable.
    pub fn parse(path: &str) -> Option<Self> {
        let (processor, port) = path.rsplit_once('.')?;
        if processor.is_empty() || port.is_empty() {
            return None;
        }
        Some(Self::new(processor, port))
    }

    pub fn remap_processor(&mut self, map: &HashMap<String, String>) {
        if let Some(new_id) = map.get(&self.processor) {
            self.processor = new_id.clone();
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.port)
    }
}

/// A directed data edge from an outport to an inport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortConnection {
    pub outport: PortRef,
    pub inport: PortRef,
}

impl PortConnection {
    pub fn new(outport: PortRef, inport: PortRef) -> Self {
        Self { outport, inport }
    }

    pub fn involves(&self, processor: &str) -> bool {
        self.outport.processor == processor || self.inport.processor == processor
    }
}

/// A directed edge propagating value changes from one property to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyLink {
    pub src: PropertyPath,
    pub dst: PropertyPath,
}

impl PropertyLink {
    pub fn new(src: PropertyPath, dst: PropertyPath) -> Self {
        Self { src, dst }
    }

    pub fn involves(&self, processor: &str) -> bool {
        self.src.processor == processor || self.dst.processor == processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_ref_parse() {
        let r = PortRef::parse("raycaster.volume").unwrap();
        assert_eq!(r.processor, "raycaster");
        assert_eq!(r.port, "volume");
        assert_eq!(r.to_string(), "raycaster.volume");

        // Dotted processor identifiers split at the last dot.
        let r = PortRef::parse("source 2.outport").unwrap();
        assert_eq!(r.processor, "source 2");

        assert!(PortRef::parse("noport").is_none());
        assert!(PortRef::parse(".x").is_none());
    }

    #[test]
    fn test_connection_involves() {
        let c = PortConnection::new(
            PortRef::new("source", "outport"),
            PortRef::new("sink", "inport"),
        );
        assert!(c.involves("source"));
        assert!(c.involves("sink"));
        assert!(!c.involves("other"));
    }
}
