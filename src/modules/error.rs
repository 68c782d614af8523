//! Failure taxonomy of the module resolver.
//!
//! Cyclic or missing dependencies abort the whole registration batch;
//! everything else is reported per module and the batch continues.

use crate::modules::version::Version;
use thiserror::Error;

/// Dependency resolution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("module dependency graph is not a DAG (cycle through '{module}')")]
    CyclicDependency { module: String },

    #[error("module '{module}' depends on '{dependency}' which is not in the module set")]
    MissingDependency { module: String, dependency: String },

    #[error(
        "module '{module}' was built for core version {built_for}, running core is {running}"
    )]
    CoreVersionMismatch {
        module: String,
        built_for: Version,
        running: Version,
    },

    #[error(
        "module '{module}' depends on '{dependency}' version {required} but version {loaded} was loaded"
    )]
    VersionMismatch {
        module: String,
        dependency: String,
        required: Version,
        loaded: Version,
    },

    #[error("module '{module}' depends on '{dependency}' which failed to register")]
    DependencyNotRegistered { module: String, dependency: String },
}

/// Structured module construction failure carrying the identifiers of other
/// modules that must be torn down because they saw partially constructed
/// state.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ModuleInitError {
    pub message: String,
    pub modules_to_deregister: Vec<String>,
}

impl ModuleInitError {
    pub fn new(message: impl Into<String>, modules_to_deregister: Vec<String>) -> Self {
        Self {
            message: message.into(),
            modules_to_deregister,
        }
    }
}

/// Error returned by a module factory's `create` call.
#[derive(Error, Debug, Clone)]
pub enum ModuleError {
    #[error(transparent)]
    Init(#[from] ModuleInitError),

    #[error("{0}")]
    Other(String),
}
