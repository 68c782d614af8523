//! # FlowVis-RS: processor-network data-flow engine
//!
//! The data-flow core of an interactive visual-computing application:
//! processors (computation nodes) are connected through typed ports into a
//! directed network, a property system exposes per-node parameters with
//! change propagation and linking, and modules register processor factories
//! with declared versioned dependencies.
//!
//! ## Architecture
//!
//! - **Properties**: flat-arena property owners with ordered, uniquely-keyed
//!   children, composite nesting and invalidation bubbling
//! - **Network**: the processor/port/connection/link graph with sink-seeded
//!   topological evaluation ordering
//! - **Serialization**: tree-structured workspace persistence with
//!   identifier-keyed diff merging and partial save/load
//! - **Modules**: topological load ordering, exact version checks and
//!   transactional rollback of plugin batches
//!
//! ## Example
//!
//! ```
//! use flowvis_rs::network::{DataKind, Inport, Outport, Processor, ProcessorNetwork, PortRef};
//! use flowvis_rs::network::topological_sort;
//!
//! let mut network = ProcessorNetwork::new();
//!
//! let mut source = Processor::new("example.Source", "source");
//! source.add_outport(Outport::new("outport", DataKind::Volume));
//! network.add_processor(source);
//!
//! let mut canvas = Processor::new("example.Canvas", "canvas");
//! canvas.add_inport(Inport::new("inport", DataKind::Volume));
//! network.add_processor(canvas);
//!
//! network
//!     .add_connection(PortRef::new("source", "outport"), PortRef::new("canvas", "inport"))
//!     .unwrap();
//!
//! assert_eq!(topological_sort(&network), ["source", "canvas"]);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod modules;
pub mod network;
pub mod properties;
pub mod serialization;

// Re-export commonly used types
pub use config::SystemSettings;
pub use error::{FlowVisError, Result, ResultExt};
pub use modules::{ModuleFactoryObject, ModuleInstance, ModuleManager, Version};
pub use network::{Processor, ProcessorFactory, ProcessorNetwork};
pub use properties::{InvalidationLevel, PropertyId, PropertyPath, PropertyTree, PropertyValue};
pub use serialization::{Deserializer, Element, Serializer};
