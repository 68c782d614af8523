//! Builders for processors, networks and module factories used across the
//! integration suites.

use flowvis_rs::modules::{ModuleFactoryObject, ModuleInstance, Version, CORE_VERSION};
use flowvis_rs::network::{
    DataKind, Inport, Outport, PortRef, Processor, ProcessorFactory, ProcessorNetwork,
};
use flowvis_rs::properties::{PropertyId, PropertyKind, PropertyValue};

pub const SOURCE_CLASS: &str = "test.VolumeSource";
pub const TRANSFORM_CLASS: &str = "test.VolumeTransform";
pub const SINK_CLASS: &str = "test.Canvas";

/// Build one of the three test processor classes with its ports and a float
/// "iso" property.
pub fn make_processor(class: &str) -> Option<Processor> {
    let mut p = Processor::new(class, "processor");
    match class {
        SOURCE_CLASS => {
            p.add_outport(Outport::new("outport", DataKind::Volume));
        }
        TRANSFORM_CLASS => {
            p.add_inport(Inport::new("inport", DataKind::Volume).with_max_connections(4));
            p.add_outport(Outport::new("outport", DataKind::Volume));
        }
        SINK_CLASS => {
            p.add_inport(Inport::new("inport", DataKind::Volume).with_max_connections(4));
        }
        _ => return None,
    }
    p.properties_mut()
        .add_property(
            PropertyId::INVALID,
            "iso",
            PropertyKind::value(PropertyValue::Float(0.5)),
            false,
        )
        .ok()?;
    Some(p)
}

/// Standalone factory for suites that do not exercise the module manager.
pub struct TestRegistry;

impl ProcessorFactory for TestRegistry {
    fn create_processor(&self, class_identifier: &str) -> Option<Processor> {
        make_processor(class_identifier)
    }
}

pub fn named(class: &str, identifier: &str) -> Processor {
    let mut p = make_processor(class).expect("known test class");
    p.set_identifier(identifier);
    p
}

pub fn connect(network: &mut ProcessorNetwork, from: &str, to: &str) {
    network
        .add_connection(PortRef::new(from, "outport"), PortRef::new(to, "inport"))
        .expect("ports connect");
}

/// A module factory whose instance registers the three test processor
/// classes.
pub fn processors_module(name: &str, version: Version) -> ModuleFactoryObject {
    let identifier = name.to_lowercase();
    ModuleFactoryObject {
        name: name.to_string(),
        core_version: CORE_VERSION,
        version,
        dependencies: vec![],
        aliases: vec![],
        protected_module: false,
        create: Box::new(move || {
            let mut module = ModuleInstance::new(identifier.clone());
            for class in [SOURCE_CLASS, TRANSFORM_CLASS, SINK_CLASS] {
                module.register_processor(class, move || {
                    make_processor(class).expect("known test class")
                });
            }
            module.add_capability("test processors available".to_string());
            Ok(module)
        }),
    }
}

/// A plain module with declared dependencies and no factories.
pub fn plain_module(
    name: &str,
    version: Version,
    deps: &[(&str, Version)],
) -> ModuleFactoryObject {
    let identifier = name.to_lowercase();
    ModuleFactoryObject {
        name: name.to_string(),
        core_version: CORE_VERSION,
        version,
        dependencies: deps.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        aliases: vec![],
        protected_module: false,
        create: Box::new(move || Ok(ModuleInstance::new(identifier.clone()))),
    }
}
