//! Module registration, dependency resolution and hot-reload.
//!
//! Registration runs in three stages: a topological sort of the declared
//! dependency graph (cycles and missing names abort the whole batch), a
//! per-module version check against the running core and the already
//! registered dependencies (failures skip that module only), and
//! instantiation (structured failures tear down the transitive dependents of
//! the poisoned modules, generic failures skip the module). No per-module
//! failure ever escapes a registration batch.

use crate::error::{FlowVisError, Result};
use crate::modules::container::ModuleContainer;
use crate::modules::error::{DependencyError, ModuleError};
use crate::modules::factory::{ModuleFactoryObject, ModuleInstance};
use crate::modules::version::Version;
use crate::network::{Processor, ProcessorFactory, ProcessorNetwork};
use std::collections::HashSet;
use std::path::Path;

/// Version of the running core; modules must be built against a
/// semantically equal core.
pub const CORE_VERSION: Version = Version::new(0, 9, 0);

#[derive(Debug, Default)]
pub struct ModuleManager {
    core_version: Version,
    /// Gate for [`reload_modules`](Self::reload_modules); off means the call
    /// is a silent no-op.
    runtime_reloading: bool,
    containers: Vec<ModuleContainer>,
}

impl ModuleManager {
    pub fn new(core_version: Version) -> Self {
        Self {
            core_version,
            runtime_reloading: false,
            containers: Vec::new(),
        }
    }

    pub fn set_runtime_reloading(&mut self, enabled: bool) {
        self.runtime_reloading = enabled;
    }

    pub fn is_runtime_reloading_enabled(&self) -> bool {
        self.runtime_reloading
    }

    // ── Lookup ──

    pub fn container(&self, identifier: &str) -> Option<&ModuleContainer> {
        self.containers
            .iter()
            .find(|c| c.identifier().eq_ignore_ascii_case(identifier))
    }

    /// The live module instance, if the module registered successfully and
    /// has not been torn down.
    pub fn module(&self, identifier: &str) -> Option<&ModuleInstance> {
        self.container(identifier).and_then(ModuleContainer::module)
    }

    pub fn modules_by_alias(&self, alias: &str) -> Vec<&ModuleInstance> {
        self.containers
            .iter()
            .filter(|c| c.factory().aliases.iter().any(|a| a == alias))
            .filter_map(ModuleContainer::module)
            .collect()
    }

    pub fn registered_identifiers(&self) -> Vec<String> {
        self.containers
            .iter()
            .map(|c| c.identifier().to_string())
            .collect()
    }

    pub fn active_modules(&self) -> impl Iterator<Item = &ModuleInstance> {
        self.containers.iter().filter_map(ModuleContainer::module)
    }

    // ── Registration ──

    /// Register a batch of modules in dependency order. A cyclic or missing
    /// declared dependency fails the whole batch before anything registers;
    /// every later failure is per-module.
    pub fn register_modules(
        &mut self,
        factories: Vec<ModuleFactoryObject>,
    ) -> std::result::Result<(), DependencyError> {
        let mut incoming: Vec<ModuleContainer> =
            factories.into_iter().map(ModuleContainer::new).collect();
        topological_sort(&mut incoming)?;

        for mut cont in incoming {
            tracing::info!("Loading module: {}", cont.name());
            if self.container(cont.identifier()).is_some() {
                // First registration wins; duplicates are skipped.
                tracing::info!("Module '{}' is already registered", cont.name());
                continue;
            }
            if !self.check_dependencies(cont.factory()) {
                continue;
            }
            match cont.create_module() {
                Ok(()) => self.containers.push(cont),
                Err(ModuleError::Init(e)) => {
                    let deregistered =
                        self.deregister_dependent_modules(&e.modules_to_deregister);
                    if deregistered.is_empty() {
                        tracing::error!(
                            "Failed to register module: {}. Reason: {}",
                            cont.name(),
                            e
                        );
                    } else {
                        tracing::error!(
                            "Failed to register module: {}. Reason: {}. Unregistered dependent modules: {}",
                            cont.name(),
                            e,
                            deregistered.join(", ")
                        );
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to register module: {}. Reason: {}", cont.name(), e);
                }
            }
        }

        self.log_capabilities();
        Ok(())
    }

    /// Register only the modules passing the enabled filter; see
    /// [`enabled_filter`].
    pub fn register_modules_filtered(
        &mut self,
        factories: Vec<ModuleFactoryObject>,
        enabled: &dyn Fn(&str) -> bool,
    ) -> std::result::Result<(), DependencyError> {
        let factories: Vec<ModuleFactoryObject> =
            factories.into_iter().filter(|f| enabled(&f.name)).collect();
        self.register_modules(factories)
    }

    /// Version check before instantiation: the module's core version must
    /// semantically match the running core, and every declared dependency
    /// must be registered at a semantically matching version. Failures are
    /// logged per module; the return value decides skip-or-proceed.
    fn check_dependencies(&self, obj: &ModuleFactoryObject) -> bool {
        let mut problems: Vec<DependencyError> = Vec::new();

        if !self.core_version.semantic_version_equal(&obj.core_version) {
            problems.push(DependencyError::CoreVersionMismatch {
                module: obj.name.clone(),
                built_for: obj.core_version,
                running: self.core_version,
            });
        }

        for (name, required) in &obj.dependencies {
            match self.container(name) {
                Some(cont) if cont.is_active() => {
                    let loaded = cont.factory().version;
                    if !loaded.semantic_version_equal(required) {
                        problems.push(DependencyError::VersionMismatch {
                            module: obj.name.clone(),
                            dependency: name.clone(),
                            required: *required,
                            loaded,
                        });
                    }
                }
                _ => problems.push(DependencyError::DependencyNotRegistered {
                    module: obj.name.clone(),
                    dependency: name.clone(),
                }),
            }
        }

        for problem in &problems {
            tracing::error!("Failed to register module: {}. Reason: {}", obj.name, problem);
        }
        problems.is_empty()
    }

    // ── Teardown ──

    /// Transitive dependents of a module, leaves first, each once.
    pub fn find_dependent_modules(&self, identifier: &str) -> Vec<String> {
        let mut dependents = Vec::new();
        for cont in &self.containers {
            if cont.depends_on(identifier) {
                for dep in self.find_dependent_modules(cont.identifier()) {
                    if !dependents.contains(&dep) {
                        dependents.push(dep);
                    }
                }
                let id = cont.identifier().to_string();
                if !dependents.contains(&id) {
                    dependents.push(id);
                }
            }
        }
        dependents
    }

    /// Tear down the given modules plus everything that transitively depends
    /// on them, in reverse registration order. Returns what was actually
    /// deregistered.
    pub fn deregister_dependent_modules(&mut self, identifiers: &[String]) -> Vec<String> {
        let mut closure: HashSet<String> = HashSet::new();
        for id in identifiers {
            closure.insert(id.to_lowercase());
            for dep in self.find_dependent_modules(id) {
                closure.insert(dep);
            }
        }

        let mut deregistered = Vec::new();
        for cont in self.containers.iter_mut().rev() {
            if closure.contains(cont.identifier()) && cont.is_active() {
                cont.reset_module();
                deregistered.push(cont.identifier().to_string());
            }
        }
        deregistered
    }

    // ── Hot reload ──

    /// Reload all non-protected modules, carrying the live network across
    /// the swap. A silent no-op while runtime reloading is disabled. On a
    /// failed restore the network is left empty and the error surfaces.
    pub fn reload_modules(&mut self, network: &mut ProcessorNetwork) -> Result<()> {
        if !self.runtime_reloading {
            tracing::debug!("Runtime module reloading is disabled");
            return Ok(());
        }

        tracing::info!("Reloading modules");

        // 1. Serialize the live network to an in-memory buffer.
        let buffer = network.serialize_document();

        // 2. Clear the network before the factories disappear.
        network.clear();

        // 3. Destroy non-protected modules, reverse registration order.
        for cont in self.containers.iter_mut().rev() {
            if !cont.is_protected_module() {
                cont.reset_module();
            }
        }
        // 4./5. Cycle the non-protected libraries.
        for cont in self.containers.iter_mut().rev() {
            if !cont.is_protected_library() {
                cont.unload_library();
            }
        }
        for cont in self.containers.iter_mut() {
            if !cont.is_protected_library() {
                cont.load_library();
            }
        }

        // 6. Re-instantiate forward, with the registration failure handling.
        for i in 0..self.containers.len() {
            if self.containers[i].is_protected_module() {
                continue;
            }
            let name = self.containers[i].name().to_string();
            match self.containers[i].create_module() {
                Ok(()) => {}
                Err(ModuleError::Init(e)) => {
                    let deregistered =
                        self.deregister_dependent_modules(&e.modules_to_deregister);
                    tracing::error!(
                        "Failed to register module: {}. Reason: {}. Unregistered dependent modules: {}",
                        name,
                        e,
                        deregistered.join(", ")
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to register module: {}. Reason: {}", name, e);
                }
            }
        }

        // 7. Capability info.
        self.log_capabilities();

        // 8. Restore the network; on failure it stays empty.
        if let Err(e) = network.deserialize_document(buffer, &*self) {
            network.clear();
            tracing::error!("Unable to restore network after reload: {}", e);
            return Err(FlowVisError::from(e));
        }
        Ok(())
    }

    fn log_capabilities(&self) {
        for module in self.active_modules() {
            for capability in module.capabilities() {
                tracing::info!("{}: {}", module.identifier(), capability);
            }
        }
    }
}

impl ProcessorFactory for ModuleManager {
    fn create_processor(&self, class_identifier: &str) -> Option<Processor> {
        self.active_modules()
            .find_map(|m| m.create_processor(class_identifier))
    }
}

/// Reorder containers so no module precedes one of its dependencies.
/// Classic DFS with a visited and an in-progress set; hitting the
/// in-progress set means the graph is not a DAG.
fn topological_sort(
    containers: &mut [ModuleContainer],
) -> std::result::Result<(), DependencyError> {
    fn visit(
        identifier: &str,
        dependent: Option<&str>,
        graph: &[(String, Vec<String>)],
        visited: &mut HashSet<String>,
        in_progress: &mut HashSet<String>,
        sorted: &mut Vec<String>,
    ) -> std::result::Result<(), DependencyError> {
        let Some((_, deps)) = graph.iter().find(|(id, _)| id == identifier) else {
            return Err(DependencyError::MissingDependency {
                module: dependent.unwrap_or(identifier).to_string(),
                dependency: identifier.to_string(),
            });
        };
        if visited.contains(identifier) {
            return Ok(());
        }
        if !in_progress.insert(identifier.to_string()) {
            return Err(DependencyError::CyclicDependency {
                module: identifier.to_string(),
            });
        }
        for dep in deps {
            visit(dep, Some(identifier), graph, visited, in_progress, sorted)?;
        }
        in_progress.remove(identifier);
        visited.insert(identifier.to_string());
        sorted.push(identifier.to_string());
        Ok(())
    }

    let graph: Vec<(String, Vec<String>)> = containers
        .iter()
        .map(|c| {
            (
                c.identifier().to_string(),
                c.dependencies()
                    .iter()
                    .map(|(name, _)| name.to_lowercase())
                    .collect(),
            )
        })
        .collect();

    let mut visited = HashSet::new();
    let mut in_progress = HashSet::new();
    let mut sorted = Vec::new();
    for (identifier, _) in &graph {
        visit(
            identifier,
            None,
            &graph,
            &mut visited,
            &mut in_progress,
            &mut sorted,
        )?;
    }

    containers.sort_by_key(|c| {
        sorted
            .iter()
            .position(|s| s == c.identifier())
            .unwrap_or(usize::MAX)
    });
    Ok(())
}

/// Build the enabled-module predicate from the optional filter file
/// `<executable-name>-enabled-modules.txt` next to the executable, one
/// case-insensitive module name per line. Without the file everything is
/// enabled.
pub fn enabled_filter(executable: &Path) -> Box<dyn Fn(&str) -> bool> {
    let Some(stem) = executable.file_stem().map(|s| s.to_string_lossy().to_string()) else {
        return Box::new(|_| true);
    };
    let Some(path) = executable
        .parent()
        .map(|dir| dir.join(format!("{}-enabled-modules.txt", stem)))
        .filter(|p| p.is_file())
    else {
        return Box::new(|_| true);
    };
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let enabled: Vec<String> = content
                .lines()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect();
            Box::new(move |name| enabled.iter().any(|e| *e == name.to_lowercase()))
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path.display(), e);
            Box::new(|_| true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::error::ModuleInitError;

    fn factory(
        name: &str,
        version: Version,
        deps: &[(&str, Version)],
    ) -> ModuleFactoryObject {
        let id = name.to_lowercase();
        ModuleFactoryObject {
            name: name.to_string(),
            core_version: CORE_VERSION,
            version,
            dependencies: deps
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect(),
            aliases: vec![],
            protected_module: false,
            create: Box::new(move || Ok(ModuleInstance::new(id.clone()))),
        }
    }

    fn v1() -> Version {
        Version::new(1, 0, 0)
    }

    #[test]
    fn test_registration_orders_dependencies_first() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        manager
            .register_modules(vec![
                factory("Plotting", v1(), &[("Base", v1()), ("DataFrame", v1())]),
                factory("DataFrame", v1(), &[("Base", v1())]),
                factory("Base", v1(), &[]),
            ])
            .unwrap();

        let ids = manager.registered_identifiers();
        let pos = |id: &str| ids.iter().position(|i| i == id).unwrap();
        assert!(pos("base") < pos("dataframe"));
        assert!(pos("dataframe") < pos("plotting"));
        assert!(manager.module("Plotting").is_some());
    }

    #[test]
    fn test_cycle_registers_nothing() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        let err = manager
            .register_modules(vec![
                factory("A", v1(), &[("B", v1())]),
                factory("B", v1(), &[("A", v1())]),
            ])
            .unwrap_err();

        assert!(matches!(err, DependencyError::CyclicDependency { .. }));
        assert!(manager.registered_identifiers().is_empty());
    }

    #[test]
    fn test_missing_dependency_fails_batch() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        let err = manager
            .register_modules(vec![factory("A", v1(), &[("Ghost", v1())])])
            .unwrap_err();

        assert!(matches!(
            err,
            DependencyError::MissingDependency { ref dependency, .. } if dependency == "ghost"
        ));
        assert!(manager.registered_identifiers().is_empty());
    }

    #[test]
    fn test_version_mismatch_skips_dependent_only() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        manager
            .register_modules(vec![
                factory("Base", Version::new(2, 0, 0), &[]),
                factory("Dependent", v1(), &[("Base", Version::new(1, 0, 0))]),
                factory("Standalone", v1(), &[]),
            ])
            .unwrap();

        assert!(manager.module("Base").is_some());
        assert!(manager.module("Standalone").is_some());
        assert!(manager.module("Dependent").is_none());
    }

    #[test]
    fn test_exact_patch_difference_accepted() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        manager
            .register_modules(vec![
                factory("Base", Version::new(1, 0, 7), &[]),
                factory("Dependent", v1(), &[("Base", Version::new(1, 0, 0))]),
            ])
            .unwrap();
        assert!(manager.module("Dependent").is_some());
    }

    #[test]
    fn test_core_version_mismatch_skips_module() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        let mut bad = factory("Old", v1(), &[]);
        bad.core_version = Version::new(0, 1, 0);
        manager.register_modules(vec![bad]).unwrap();
        assert!(manager.module("Old").is_none());
    }

    #[test]
    fn test_duplicate_name_first_wins() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        manager
            .register_modules(vec![factory("Base", Version::new(1, 0, 0), &[])])
            .unwrap();
        manager
            .register_modules(vec![factory("Base", Version::new(9, 9, 9), &[])])
            .unwrap();

        assert_eq!(manager.registered_identifiers(), ["base"]);
        assert_eq!(
            manager.container("base").unwrap().factory().version,
            Version::new(1, 0, 0)
        );
    }

    #[test]
    fn test_init_error_tears_down_dependents() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        let poisoned = ModuleFactoryObject {
            name: "Poison".to_string(),
            core_version: CORE_VERSION,
            version: v1(),
            dependencies: vec![("Middle".to_string(), v1())],
            aliases: vec![],
            protected_module: false,
            create: Box::new(|| {
                Err(ModuleError::Init(ModuleInitError::new(
                    "partially constructed state",
                    vec!["Base".to_string()],
                )))
            }),
        };
        manager
            .register_modules(vec![
                factory("Base", v1(), &[]),
                factory("Middle", v1(), &[("Base", v1())]),
                poisoned,
            ])
            .unwrap();

        // Base and its transitive dependent Middle are torn down; their
        // containers stay for later reloads.
        assert!(manager.module("Base").is_none());
        assert!(manager.module("Middle").is_none());
        assert!(manager.module("Poison").is_none());
        assert_eq!(manager.registered_identifiers(), ["base", "middle"]);
    }

    #[test]
    fn test_find_dependent_modules() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        manager
            .register_modules(vec![
                factory("Base", v1(), &[]),
                factory("Mid", v1(), &[("Base", v1())]),
                factory("Top", v1(), &[("Mid", v1())]),
            ])
            .unwrap();

        let dependents = manager.find_dependent_modules("base");
        assert_eq!(dependents, ["top", "mid"]);
    }

    #[test]
    fn test_reload_disabled_is_silent_noop() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        manager
            .register_modules(vec![factory("Base", v1(), &[])])
            .unwrap();
        let mut network = ProcessorNetwork::new();

        manager.reload_modules(&mut network).unwrap();
        assert!(manager.module("Base").is_some());
    }

    #[test]
    fn test_alias_lookup() {
        let mut manager = ModuleManager::new(CORE_VERSION);
        let mut base = factory("Base", v1(), &[]);
        base.aliases.push("core-processors".to_string());
        manager.register_modules(vec![base]).unwrap();

        assert_eq!(manager.modules_by_alias("core-processors").len(), 1);
        assert!(manager.modules_by_alias("unknown").is_empty());
    }
}
