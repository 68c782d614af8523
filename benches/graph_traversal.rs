//! Benchmarks for network traversal and ordering
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowvis_rs::network::{
    topological_sort, topological_sort_filtered, DataKind, Inport, Outport, PortRef, Processor,
    ProcessorNetwork,
};

fn transform(id: &str) -> Processor {
    let mut p = Processor::new("bench.Transform", id);
    p.add_inport(Inport::new("inport", DataKind::Volume).with_max_connections(64));
    p.add_outport(Outport::new("outport", DataKind::Volume));
    p
}

fn sink(id: &str) -> Processor {
    let mut p = Processor::new("bench.Canvas", id);
    p.add_inport(Inport::new("inport", DataKind::Volume).with_max_connections(64));
    p
}

/// A chain of diamonds: d0 splits into two branches that re-join, feeding
/// the next diamond, ending in a single canvas.
fn diamond_chain(depth: usize) -> ProcessorNetwork {
    let mut network = ProcessorNetwork::new();
    let mut previous = {
        let mut p = Processor::new("bench.Source", "head");
        p.add_outport(Outport::new("outport", DataKind::Volume));
        network.add_processor(p);
        "head".to_string()
    };

    for i in 0..depth {
        let left = format!("l{}", i);
        let right = format!("r{}", i);
        let join = format!("j{}", i);
        network.add_processor(transform(&left));
        network.add_processor(transform(&right));
        network.add_processor(transform(&join));
        for branch in [&left, &right] {
            network
                .add_connection(
                    PortRef::new(previous.clone(), "outport"),
                    PortRef::new(branch.clone(), "inport"),
                )
                .unwrap();
            network
                .add_connection(
                    PortRef::new(branch.clone(), "outport"),
                    PortRef::new(join.clone(), "inport"),
                )
                .unwrap();
        }
        previous = join;
    }

    network.add_processor(sink("canvas"));
    network
        .add_connection(
            PortRef::new(previous, "outport"),
            PortRef::new("canvas", "inport"),
        )
        .unwrap();
    network
}

fn bench_topological_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological_sort");
    for depth in [4usize, 16, 64] {
        let network = diamond_chain(depth);
        group.bench_with_input(BenchmarkId::new("plain", depth), &network, |b, net| {
            b.iter(|| black_box(topological_sort(net)));
        });
        group.bench_with_input(BenchmarkId::new("filtered", depth), &network, |b, net| {
            b.iter(|| black_box(topological_sort_filtered(net)));
        });
    }
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let network = diamond_chain(32);
    c.bench_function("serialize_document", |b| {
        b.iter(|| black_box(network.serialize_document()));
    });
}

criterion_group!(benches, bench_topological_sort, bench_serialize);
criterion_main!(benches);
