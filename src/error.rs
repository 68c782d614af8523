//! Error handling for the FlowVis-RS engine
//!
//! This module defines the top-level error type and a Result alias for use
//! throughout the crate. The per-domain error enums live next to the code
//! that raises them and convert into [`FlowVisError`] via `#[from]`.

use thiserror::Error;

/// Main error type for FlowVis-RS operations
#[derive(Error, Debug)]
pub enum FlowVisError {
    /// Errors raised by property owner mutations
    #[error("Property error: {0}")]
    Structural(#[from] crate::properties::StructuralError),

    /// Errors raised by network graph mutations
    #[error("Network error: {0}")]
    Network(#[from] crate::network::NetworkError),

    /// Errors related to workspace save/load
    #[error("Serialization error: {0}")]
    Serialization(#[from] crate::serialization::SerializationError),

    /// Errors reported by the module dependency resolver
    #[error("Module error: {0}")]
    Dependency(#[from] crate::modules::DependencyError),

    /// Errors related to the .dat sidecar header
    #[error("Dat header error: {0}")]
    Dat(#[from] crate::data::DatError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowVisError>,
    },
}

impl FlowVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for FlowVis-RS operations
pub type Result<T> = std::result::Result<T, FlowVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FlowVisError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
