//! Container around one loadable module.
//!
//! Tracks the factory object, the instantiated module (if any), and the
//! protection flags that keep a stable core out of hot-reload's reach. The
//! library load state is modeled at the interface level only; actual
//! dynamic-library handling lives outside this crate.

use crate::modules::error::ModuleError;
use crate::modules::factory::{ModuleFactoryObject, ModuleInstance};
use crate::modules::version::Version;

#[derive(Debug)]
pub struct ModuleContainer {
    /// Lowercased module name, the resolver's key.
    identifier: String,
    factory: ModuleFactoryObject,
    module: Option<ModuleInstance>,
    protected_module: bool,
    protected_library: bool,
    library_loaded: bool,
}

impl ModuleContainer {
    pub fn new(factory: ModuleFactoryObject) -> Self {
        Self {
            identifier: factory.name.to_lowercase(),
            protected_module: factory.protected_module,
            // Factory-object modules are statically linked from the
            // resolver's point of view, so the library is protected.
            protected_library: true,
            library_loaded: true,
            module: None,
            factory,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.factory.name
    }

    pub fn factory(&self) -> &ModuleFactoryObject {
        &self.factory
    }

    pub fn dependencies(&self) -> &[(String, Version)] {
        &self.factory.dependencies
    }

    pub fn depends_on(&self, identifier: &str) -> bool {
        self.factory.depends_on(identifier)
    }

    pub fn is_protected_module(&self) -> bool {
        self.protected_module
    }

    pub fn is_protected_library(&self) -> bool {
        self.protected_library
    }

    pub fn set_protected(&mut self, module: bool, library: bool) {
        self.protected_module = module;
        self.protected_library = library;
    }

    // ── Instance lifecycle ──

    /// Instantiate the module via its factory. Idempotent for an already
    /// created module.
    pub fn create_module(&mut self) -> Result<(), ModuleError> {
        if self.module.is_none() {
            self.module = Some((self.factory.create)()?);
        }
        Ok(())
    }

    /// Destroy the module instance, keeping the factory for later
    /// re-instantiation.
    pub fn reset_module(&mut self) {
        self.module = None;
    }

    pub fn module(&self) -> Option<&ModuleInstance> {
        self.module.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.module.is_some()
    }

    // ── Library lifecycle (interface level) ──

    pub fn unload_library(&mut self) {
        self.library_loaded = false;
    }

    pub fn load_library(&mut self) {
        self.library_loaded = true;
    }

    pub fn is_library_loaded(&self) -> bool {
        self.library_loaded
    }
}
