//! Graph queries and evaluation ordering.
//!
//! Both topological sorts perform a post-order depth-first traversal seeded
//! at the sink processors: visit predecessors, record a node only after all
//! of its upstream dependencies are recorded. The visited set is shared
//! across all sink roots, so shared ancestors in diamond-shaped graphs are
//! emitted exactly once. The filtered variant additionally skips connections
//! into runtime-disabled inports.

use crate::network::network::ProcessorNetwork;
use std::collections::HashSet;

/// A processor with no active outgoing data dependency: either explicitly
/// marked terminal or without a single connected outport.
pub fn is_sink(network: &ProcessorNetwork, identifier: &str) -> bool {
    let hinted = network
        .processor(identifier)
        .map(|rc| rc.borrow().is_sink())
        .unwrap_or(false);
    hinted
        || !network
            .connections()
            .iter()
            .any(|c| c.outport.processor == identifier)
}

/// Processors feeding directly into `identifier`, in inport order, each once.
pub fn direct_predecessors(network: &ProcessorNetwork, identifier: &str) -> Vec<String> {
    let mut preds = Vec::new();
    for conn in network.connections() {
        if conn.inport.processor == identifier && !preds.contains(&conn.outport.processor) {
            preds.push(conn.outport.processor.clone());
        }
    }
    preds
}

/// Processors fed directly by `identifier`, each once.
pub fn direct_successors(network: &ProcessorNetwork, identifier: &str) -> Vec<String> {
    let mut succs = Vec::new();
    for conn in network.connections() {
        if conn.outport.processor == identifier && !succs.contains(&conn.inport.processor) {
            succs.push(conn.inport.processor.clone());
        }
    }
    succs
}

/// All upstream processors reachable from `identifier`, itself included.
pub fn predecessors(network: &ProcessorNetwork, identifier: &str) -> HashSet<String> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit_upstream(network, identifier, &mut visited, &mut order, false);
    visited
}

/// All downstream processors reachable from `identifier`, itself included.
pub fn successors(network: &ProcessorNetwork, identifier: &str) -> HashSet<String> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit_downstream(network, identifier, &mut visited, &mut order);
    visited
}

/// Evaluation order: every processor appears after everything it depends on.
pub fn topological_sort(network: &ProcessorNetwork) -> Vec<String> {
    sort_impl(network, false)
}

/// Like [`topological_sort`], but connections into inactive inports are
/// excluded from the traversal, so conditionally disabled inputs do not pull
/// their upstream subgraphs into the order.
pub fn topological_sort_filtered(network: &ProcessorNetwork) -> Vec<String> {
    sort_impl(network, true)
}

fn sort_impl(network: &ProcessorNetwork, filtered: bool) -> Vec<String> {
    let sinks: Vec<String> = network
        .processor_identifiers()
        .into_iter()
        .filter(|id| is_sink(network, id))
        .collect();

    let mut visited = HashSet::new();
    let mut sorted = Vec::new();
    for sink in sinks {
        visit_upstream(network, &sink, &mut visited, &mut sorted, filtered);
    }
    sorted
}

fn visit_upstream(
    network: &ProcessorNetwork,
    identifier: &str,
    visited: &mut HashSet<String>,
    out: &mut Vec<String>,
    filtered: bool,
) {
    if !visited.insert(identifier.to_string()) {
        return;
    }
    let preds: Vec<String> = {
        let Some(rc) = network.processor(identifier) else {
            return;
        };
        let processor = rc.borrow();
        let mut preds = Vec::new();
        for inport in processor.inports() {
            if filtered && !inport.active {
                continue;
            }
            for conn in network.connections() {
                if conn.inport.processor == identifier
                    && conn.inport.port == inport.identifier
                    && !preds.contains(&conn.outport.processor)
                {
                    preds.push(conn.outport.processor.clone());
                }
            }
        }
        preds
    };
    for pred in preds {
        visit_upstream(network, &pred, visited, out, filtered);
    }
    out.push(identifier.to_string());
}

fn visit_downstream(
    network: &ProcessorNetwork,
    identifier: &str,
    visited: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    if !visited.insert(identifier.to_string()) {
        return;
    }
    for succ in direct_successors(network, identifier) {
        visit_downstream(network, &succ, visited, out);
    }
    out.push(identifier.to_string());
}
