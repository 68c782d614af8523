//! Failure taxonomy of the serialization substrate.
//!
//! Whole-document problems (unreadable file, unsupported version) abort the
//! save/load and surface to the caller. Per-element problems inside keyed
//! collections are routed through `handle_error` and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Malformed document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing element '{tag}'")]
    MissingChild { tag: String },

    #[error("Missing attribute '{key}' on element '{tag}'")]
    MissingAttribute { key: String, tag: String },

    #[error("Invalid value '{value}' for attribute '{key}': expected {expected}")]
    InvalidAttribute {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Unsupported document version {found}, newest readable is {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Reference to unknown element '{reference}'")]
    DanglingReference { reference: String },

    #[error("Element '{tag}' rejected: {reason}")]
    Rejected { tag: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SerializationResult<T> = std::result::Result<T, SerializationError>;
