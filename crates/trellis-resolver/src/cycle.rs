//! Cycle decomposition and diagnostic rendering.

use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::element_set::ElementSet;

/// Compute the cycles among the given element sets, as lists of set ids.
///
/// Builds the requires graph and decomposes it into strongly connected
/// components; every component with more than one node is a cycle, as is a
/// single node that requires its own id.
pub fn find_cycles(sets: &BTreeMap<String, ElementSet>) -> Vec<Vec<String>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: BTreeMap<&str, NodeIndex> = BTreeMap::new();
    for id in sets.keys() {
        index.insert(id.as_str(), graph.add_node(id.as_str()));
    }
    for (id, set) in sets {
        for required in set.required_ids() {
            if let Some(&target) = index.get(required.as_str()) {
                graph.add_edge(index[id.as_str()], target, ());
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| graph.find_edge(n, n).is_some())
        })
        .map(|component| {
            component
                .into_iter()
                .map(|n| graph[n].to_string())
                .collect()
        })
        .collect()
}

/// Render cycles in the `{a,b},{c,d}` diagnostic format.
pub fn render_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| format!("{{{}}}", cycle.join(",")))
        .collect::<Vec<_>>()
        .join(",")
}
