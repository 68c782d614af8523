//! Failure taxonomy of network graph mutations.

use crate::properties::StructuralError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("no processor '{identifier}' in the network")]
    UnknownProcessor { identifier: String },

    #[error("processor '{processor}' has no port '{port}'")]
    UnknownPort { processor: String, port: String },

    #[error("no property '{path}' in the network")]
    UnknownProperty { path: String },

    #[error("outport '{outport}' cannot connect to inport '{inport}'")]
    IncompatiblePorts { outport: String, inport: String },

    #[error("inport '{inport}' already has its maximum of {max} connections")]
    InportFull { inport: String, max: usize },

    #[error("connection {outport} -> {inport} already exists")]
    DuplicateConnection { outport: String, inport: String },

    #[error("link {src} -> {dst} already exists")]
    DuplicateLink { src: String, dst: String },

    #[error("cannot link property '{path}' to itself")]
    SelfLink { path: String },

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;
