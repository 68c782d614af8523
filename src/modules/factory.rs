//! The plugin contract: factory objects and module instances.
//!
//! A module ships a [`ModuleFactoryObject`] describing its identity, version
//! and dependencies, plus a `create` closure producing the live
//! [`ModuleInstance`]. The instance registers processor constructors keyed by
//! class identifier; the dynamic-library mechanics behind `create` are
//! outside this crate.

use crate::modules::error::ModuleError;
use crate::modules::version::Version;
use crate::network::Processor;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Constructor of one processor class.
pub type ProcessorCtor = Rc<dyn Fn() -> Processor>;

/// A live, registered module: its processor factories and capability info.
pub struct ModuleInstance {
    identifier: String,
    processor_factories: HashMap<String, ProcessorCtor>,
    capabilities: Vec<String>,
}

impl ModuleInstance {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            processor_factories: HashMap::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Register a processor constructor under its class identifier.
    pub fn register_processor(
        &mut self,
        class_identifier: impl Into<String>,
        ctor: impl Fn() -> Processor + 'static,
    ) {
        self.processor_factories
            .insert(class_identifier.into(), Rc::new(ctor));
    }

    pub fn create_processor(&self, class_identifier: &str) -> Option<Processor> {
        self.processor_factories
            .get(class_identifier)
            .map(|ctor| ctor())
    }

    pub fn processor_classes(&self) -> impl Iterator<Item = &String> {
        self.processor_factories.keys()
    }

    pub fn add_capability(&mut self, info: impl Into<String>) {
        self.capabilities.push(info.into());
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("identifier", &self.identifier)
            .field(
                "processor_classes",
                &self.processor_factories.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Factory closure producing a module instance, or a structured failure.
pub type ModuleCreate = Box<dyn Fn() -> Result<ModuleInstance, ModuleError>>;

/// Everything the resolver needs to know about a loadable module before
/// instantiating it.
pub struct ModuleFactoryObject {
    pub name: String,
    /// Core version this module was built against; must semantically match
    /// the running core.
    pub core_version: Version,
    pub version: Version,
    /// Declared `(name, version)` dependencies on other modules.
    pub dependencies: Vec<(String, Version)>,
    pub aliases: Vec<String>,
    /// Protected modules are never torn down by hot-reload.
    pub protected_module: bool,
    pub create: ModuleCreate,
}

impl ModuleFactoryObject {
    pub fn depends_on(&self, identifier: &str) -> bool {
        self.dependencies
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(identifier))
    }
}

impl fmt::Debug for ModuleFactoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleFactoryObject")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("core_version", &self.core_version)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
