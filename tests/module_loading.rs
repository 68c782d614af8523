//! Module resolver integration: batch registration, the enabled-modules
//! filter file, and hot-reload carrying a live network across the swap.

mod common;

use common::builders::{
    connect, named, plain_module, processors_module, SINK_CLASS, SOURCE_CLASS,
};
use flowvis_rs::modules::{
    enabled_filter, DependencyError, ModuleError, ModuleFactoryObject, ModuleInstance,
    ModuleManager, Version, CORE_VERSION,
};
use flowvis_rs::network::{ProcessorFactory, ProcessorNetwork};
use flowvis_rs::properties::{PropertyPath, PropertyValue};
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

fn v(major: u32, minor: u32) -> Version {
    Version::new(major, minor, 0)
}

#[test]
fn manager_serves_processor_factories() {
    let mut manager = ModuleManager::new(CORE_VERSION);
    manager
        .register_modules(vec![processors_module("TestProcessors", v(1, 0))])
        .unwrap();

    let p = manager.create_processor(SOURCE_CLASS).unwrap();
    assert_eq!(p.class_identifier(), SOURCE_CLASS);
    assert!(manager.create_processor("test.Unknown").is_none());
}

#[test]
fn dependency_version_check_is_exact() {
    // D requires Base 1.0; Base 1.0.x is fine, Base 1.1 is not.
    let mut ok = ModuleManager::new(CORE_VERSION);
    ok.register_modules(vec![
        plain_module("Base", Version::new(1, 0, 4), &[]),
        plain_module("D", v(1, 0), &[("Base", v(1, 0))]),
    ])
    .unwrap();
    assert!(ok.module("D").is_some());

    let mut bad = ModuleManager::new(CORE_VERSION);
    bad.register_modules(vec![
        plain_module("Base", v(1, 1), &[]),
        plain_module("D", v(1, 0), &[("Base", v(1, 0))]),
    ])
    .unwrap();
    assert!(bad.module("Base").is_some());
    assert!(bad.module("D").is_none());
}

#[test]
fn cyclic_batch_registers_zero_modules() {
    let mut manager = ModuleManager::new(CORE_VERSION);
    let err = manager
        .register_modules(vec![
            plain_module("A", v(1, 0), &[("B", v(1, 0))]),
            plain_module("B", v(1, 0), &[("C", v(1, 0))]),
            plain_module("C", v(1, 0), &[("A", v(1, 0))]),
        ])
        .unwrap_err();
    assert!(matches!(err, DependencyError::CyclicDependency { .. }));
    assert!(manager.registered_identifiers().is_empty());
}

#[test]
fn enabled_modules_file_filters_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("flowvis");
    std::fs::write(&exe, "").unwrap();
    std::fs::write(
        dir.path().join("flowvis-enabled-modules.txt"),
        "base\nPLOTTING\n",
    )
    .unwrap();

    let filter = enabled_filter(&exe);
    assert!(filter("Base"));
    assert!(filter("plotting"));
    assert!(!filter("hdf5"));

    let mut manager = ModuleManager::new(CORE_VERSION);
    manager
        .register_modules_filtered(
            vec![
                plain_module("Base", v(1, 0), &[]),
                plain_module("HDF5", v(1, 0), &[]),
            ],
            &*filter,
        )
        .unwrap();
    assert!(manager.module("Base").is_some());
    assert!(manager.module("HDF5").is_none());
}

#[test]
fn missing_filter_file_enables_everything() {
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("flowvis");
    std::fs::write(&exe, "").unwrap();

    let filter = enabled_filter(&exe);
    assert!(filter("anything"));
}

#[test]
fn reload_round_trips_live_network() {
    let mut manager = ModuleManager::new(CORE_VERSION);
    manager.set_runtime_reloading(true);
    manager
        .register_modules(vec![processors_module("TestProcessors", v(1, 0))])
        .unwrap();

    let mut network = ProcessorNetwork::new();
    network.add_processor(named(SOURCE_CLASS, "source"));
    network.add_processor(named(SINK_CLASS, "canvas"));
    connect(&mut network, "source", "canvas");
    network
        .set_property(&PropertyPath::new("source", "iso"), PropertyValue::Float(0.75))
        .unwrap();

    manager.reload_modules(&mut network).unwrap();

    assert_eq!(network.processor_identifiers(), ["source", "canvas"]);
    assert_eq!(network.connections().len(), 1);
    assert_eq!(
        network.property_value(&PropertyPath::new("source", "iso")),
        Some(PropertyValue::Float(0.75))
    );
    assert!(manager.module("TestProcessors").is_some());
}

#[test]
fn reload_skips_protected_modules() {
    let mut manager = ModuleManager::new(CORE_VERSION);
    manager.set_runtime_reloading(true);

    // Count instantiations to observe whether the reload recreated it.
    let creations = Rc::new(Cell::new(0u32));
    let counter = creations.clone();
    let factory = ModuleFactoryObject {
        name: "Core".to_string(),
        core_version: CORE_VERSION,
        version: v(1, 0),
        dependencies: vec![],
        aliases: vec![],
        protected_module: true,
        create: Box::new(move || {
            counter.set(counter.get() + 1);
            Ok(ModuleInstance::new("core"))
        }),
    };
    manager.register_modules(vec![factory]).unwrap();
    manager
        .register_modules(vec![processors_module("TestProcessors", v(1, 0))])
        .unwrap();
    assert_eq!(creations.get(), 1);

    let mut network = ProcessorNetwork::new();
    manager.reload_modules(&mut network).unwrap();

    // Protected module untouched, non-protected one recreated.
    assert_eq!(creations.get(), 1);
    assert!(manager.module("Core").is_some());
    assert!(manager.module("TestProcessors").is_some());
}

#[test]
fn reload_when_disabled_changes_nothing() {
    let mut manager = ModuleManager::new(CORE_VERSION);
    manager
        .register_modules(vec![processors_module("TestProcessors", v(1, 0))])
        .unwrap();

    let mut network = ProcessorNetwork::new();
    network.add_processor(named(SOURCE_CLASS, "source"));

    manager.reload_modules(&mut network).unwrap();
    // Silent no-op: the network was not even cleared.
    assert_eq!(network.processor_identifiers(), ["source"]);
}

#[test]
fn failing_module_does_not_abort_batch() {
    let mut manager = ModuleManager::new(CORE_VERSION);
    let broken = ModuleFactoryObject {
        name: "Broken".to_string(),
        core_version: CORE_VERSION,
        version: v(1, 0),
        dependencies: vec![],
        aliases: vec![],
        protected_module: false,
        create: Box::new(|| Err(ModuleError::Other("driver not found".to_string()))),
    };
    manager
        .register_modules(vec![
            plain_module("Base", v(1, 0), &[]),
            broken,
            plain_module("Top", v(1, 0), &[("Base", v(1, 0))]),
        ])
        .unwrap();

    assert!(manager.module("Base").is_some());
    assert!(manager.module("Top").is_some());
    assert!(manager.module("Broken").is_none());
}

// ── Generated dependency graphs ──

proptest! {
    /// For arbitrary DAGs of module dependencies, registration succeeds and
    /// the registered order puts every dependency before its dependents.
    #[test]
    fn registration_orders_any_dag(
        n in 1usize..8,
        raw_edges in proptest::collection::vec((0usize..8, 0usize..8), 0..16),
    ) {
        let deps_of = |i: usize| -> Vec<usize> {
            raw_edges
                .iter()
                .filter_map(|&(a, b)| {
                    let (a, b) = (a % n, b % n);
                    // Edges go from higher to lower index: i depends on j < i.
                    if a == i && b < a { Some(b) } else { None }
                })
                .collect::<HashSet<usize>>()
                .into_iter()
                .collect()
        };

        let factories: Vec<_> = (0..n)
            .map(|i| {
                let deps: Vec<(String, Version)> = deps_of(i)
                    .into_iter()
                    .map(|j| (format!("M{}", j), v(1, 0)))
                    .collect();
                let dep_refs: Vec<(&str, Version)> =
                    deps.iter().map(|(s, ver)| (s.as_str(), *ver)).collect();
                plain_module(&format!("M{}", i), v(1, 0), &dep_refs)
            })
            .collect();

        let mut manager = ModuleManager::new(CORE_VERSION);
        manager.register_modules(factories).unwrap();

        let order = manager.registered_identifiers();
        prop_assert_eq!(order.len(), n);
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        for i in 0..n {
            for j in deps_of(i) {
                prop_assert!(
                    pos(&format!("m{}", j)) < pos(&format!("m{}", i)),
                    "dependency {} must be ordered before {}",
                    j,
                    i
                );
            }
        }
    }
}
