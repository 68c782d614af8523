//! Dynamically registered modules and their dependency resolver.
//!
//! A module declares `(name, version)` dependencies and registers processor
//! factories when instantiated. The [`ModuleManager`] loads batches in
//! topological order, checks versions exactly (major.minor), isolates
//! per-module failures, and supports hot-reloading everything that is not
//! protected. Dynamic-library mechanics stay outside this crate; the
//! resolver only consumes the factory-object shape.

pub mod container;
pub mod error;
pub mod factory;
pub mod manager;
pub mod version;

pub use container::ModuleContainer;
pub use error::{DependencyError, ModuleError, ModuleInitError};
pub use factory::{ModuleCreate, ModuleFactoryObject, ModuleInstance, ProcessorCtor};
pub use manager::{enabled_filter, ModuleManager, CORE_VERSION};
pub use version::Version;
