//! The processor network graph: processors, ports, connections, links.
//!
//! Data flows through typed ports: source processors produce volumes or
//! images, transforms refine them, sinks (canvases, exporters) root the
//! evaluation order.
//!
//! # Design
//!
//! - **Shared ownership** — processors live behind `Rc` so transient
//!   external holders never dangle; removal unlinks immediately, destruction
//!   waits for the last reference.
//! - **Path-keyed edges** — connections and property links store endpoint
//!   paths (`processor.port`, `processor.prop.sub`), the same representation
//!   the workspace format uses.
//! - **Sink-seeded traversal** — both topological sorts walk upstream from
//!   the sinks post-order with a shared visited set, so diamonds emit each
//!   processor exactly once.
//! - **NetworkLock** — scoped, reentrant batching of structural-change
//!   notifications during compound mutations.

pub mod connection;
pub mod error;
pub mod lock;
#[allow(clippy::module_inception)]
pub mod network;
pub mod partial;
pub mod port;
pub mod processor;
pub mod traversal;

pub use connection::{PortConnection, PortRef, PropertyLink};
pub use error::{NetworkError, NetworkResult};
pub use lock::{NetworkEvent, NetworkLock, NetworkNotifier};
pub use network::{
    migrate_document, ProcessorFactory, ProcessorNetwork, PROCESSOR_NETWORK_VERSION,
};
pub use partial::{append_partial, serialize_selected};
pub use port::{DataKind, Inport, Outport};
pub use processor::Processor;
pub use traversal::{
    direct_predecessors, direct_successors, is_sink, predecessors, successors, topological_sort,
    topological_sort_filtered,
};
