//! Typed connection points of a processor.
//!
//! Each processor declares its ports up front; the network uses them to
//! validate connections. An outport fans out to any number of inports, an
//! inport accepts at most `max_connections` incoming edges.

/// The kind of data flowing through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Volume,
    Image,
    Mesh,
    DataFrame,
}

impl DataKind {
    pub fn name(self) -> &'static str {
        match self {
            DataKind::Volume => "volume",
            DataKind::Image => "image",
            DataKind::Mesh => "mesh",
            DataKind::DataFrame => "dataframe",
        }
    }
}

/// Incoming connection point.
#[derive(Debug, Clone)]
pub struct Inport {
    pub identifier: String,
    pub kind: DataKind,
    /// Fan-in bound; connections beyond this are rejected.
    pub max_connections: usize,
    /// Optional inports do not have to be connected for the processor to run.
    pub optional: bool,
    /// Runtime toggle consulted by the filtered traversal; an inactive
    /// inport's connections are skipped.
    pub active: bool,
}

impl Inport {
    pub fn new(identifier: impl Into<String>, kind: DataKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            max_connections: 1,
            optional: false,
            active: true,
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Type compatibility check for a prospective connection.
    pub fn can_connect_to(&self, outport: &Outport) -> bool {
        self.kind == outport.kind
    }
}

/// Outgoing connection point.
#[derive(Debug, Clone)]
pub struct Outport {
    pub identifier: String,
    pub kind: DataKind,
}

impl Outport {
    pub fn new(identifier: impl Into<String>, kind: DataKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
        }
    }
}
