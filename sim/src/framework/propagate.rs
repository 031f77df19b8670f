//! Combinational depth of a built circuit.
//!
//! The engine settles a clock by sweeping every component a fixed number of
//! times. Each sweep moves a value one component further, so the sweeps per
//! clock must exceed the longest chain of combinational hops between clocked
//! inputs.

use std::{
    collections::{HashMap, VecDeque},
    fmt::Debug,
    hash::Hash,
};

use super::{circuit::Circuit, link::Direction, ComponentId};
use crate::units::Unit;

/// Compute topological order of nodes using BFS.
///
/// Return node list in order and their levels, or `None` if the edges
/// contain a cycle.
pub fn topo<Node: Copy + Eq + Hash + Debug>(
    nodes: impl Iterator<Item = Node> + Clone,
    edges: impl Iterator<Item = (Node, Node)> + Clone,
) -> Option<Vec<(Node, u32)>> {
    let mut degree_level: HashMap<Node, (u32, u32)> = HashMap::default();
    for (_, to) in edges.clone() {
        let entry = degree_level.entry(to).or_default();
        entry.0 += 1;
    }
    let mut que: VecDeque<Node> = VecDeque::new();
    let mut levels = Vec::new();
    for node in nodes {
        if degree_level.get(&node).cloned().unwrap_or_default().0 == 0 {
            que.push_back(node)
        }
    }
    while let Some(head) = que.pop_front() {
        let level = degree_level.remove(&head).map(|o| o.1).unwrap_or(0);
        levels.push((head, level));
        for (from, to) in edges.clone() {
            if from == head {
                let entry = degree_level.get_mut(&to)?;
                entry.0 -= 1;
                entry.1 = entry.1.max(level + 1);
                if entry.0 == 0 {
                    que.push_back(to);
                }
            }
        }
    }

    if !degree_level.is_empty() {
        tracing::warn!("combinational loop through {:?}", degree_level.keys());
        return None;
    }

    Some(levels)
}

/// Combinational edges of the circuit as `(driver, reader)` pairs. Junctions
/// are looked through and clocked inputs are cut.
pub(crate) fn combinational_edges(circuit: &Circuit) -> Vec<(ComponentId, ComponentId)> {
    let mut edges = Vec::new();
    for (i, link) in circuit.links.iter().enumerate() {
        if link.direction != Direction::Input {
            continue;
        }
        let reader = &circuit.components[link.owner.0];
        if matches!(reader.unit, Unit::Junction) || reader.unit.is_clocked_input(link.slot) {
            continue;
        }
        if let Some(src) = circuit.resolve(super::LinkId(i)) {
            edges.push((circuit.links[src.0].owner, link.owner));
        }
    }
    edges
}

/// Longest chain of combinational hops, or `None` for a cyclic circuit.
pub fn settle_depth(circuit: &Circuit) -> Option<u32> {
    let nodes = (0..circuit.components.len())
        .filter(|&i| !matches!(circuit.components[i].unit, Unit::Junction))
        .map(ComponentId);
    let edges = combinational_edges(circuit);
    let levels = topo(nodes, edges.iter().copied())?;
    Some(levels.iter().map(|(_, l)| *l).max().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topo_levels() {
        let levels = topo([1, 2, 3, 4].into_iter(), [(1, 2), (2, 3), (1, 3)].into_iter()).unwrap();
        let level_of = |n| levels.iter().find(|(m, _)| *m == n).map(|(_, l)| *l);
        assert_eq!(level_of(1), Some(0));
        assert_eq!(level_of(3), Some(2));
        assert_eq!(level_of(4), Some(0));
    }

    #[test]
    fn test_topo_cycle() {
        assert!(topo([1, 2].into_iter(), [(1, 2), (2, 1)].into_iter()).is_none());
    }
}
