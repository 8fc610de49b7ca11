//! Dependency graph over enabled rules.
//!
//! An edge `A -> B` means A writes a field-path that B reads (either path
//! covering the other). Nodes are indexed in ascending (name, id) order, so
//! "smallest index first" is the deterministic tie-break everywhere.

use rulekit_core::RuleId;
use rulekit_registry::Registry;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// A built dependency graph with its total execution order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Rule ids, indexed in (name, id) order.
    nodes: Vec<RuleId>,
    index: HashMap<RuleId, usize>,
    /// Ascending successor indexes per node.
    successors: Vec<Vec<usize>>,
    /// Topological order as node indexes.
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph over the registry's enabled rules.
    ///
    /// Fails with `GraphError::Cycle` if the enabled rules depend on each
    /// other circularly.
    pub fn build(registry: &Registry) -> GraphResult<Self> {
        // enabled_rules() already yields (name, id) order.
        let rules: Vec<_> = registry.enabled_rules().collect();
        let nodes: Vec<RuleId> = rules.iter().map(|r| r.id.clone()).collect();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let successors: Vec<Vec<usize>> = rules
            .iter()
            .enumerate()
            .map(|(i, writer)| {
                rules
                    .iter()
                    .enumerate()
                    .filter(|&(j, reader)| i != j && writer.feeds(reader))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();

        if let Some(cycle) = find_cycle(&successors) {
            let rule_ids: Vec<RuleId> = cycle.into_iter().map(|i| nodes[i].clone()).collect();
            debug!(cycle = ?rule_ids, "dependency cycle detected");
            return Err(GraphError::cycle(rule_ids));
        }

        let order = topological_order(&successors);
        debug!(rules = nodes.len(), "dependency graph built");
        Ok(Self {
            nodes,
            index,
            successors,
            order,
        })
    }

    /// Rule ids in execution order.
    pub fn order(&self) -> impl Iterator<Item = &RuleId> + '_ {
        self.order.iter().map(|&i| &self.nodes[i])
    }

    /// Rules that read something `id` writes.
    pub fn dependents(&self, id: &RuleId) -> impl Iterator<Item = &RuleId> + '_ {
        self.index
            .get(id)
            .into_iter()
            .flat_map(|&i| self.successors[i].iter().map(|&j| &self.nodes[j]))
    }

    /// Rules whose writes `id` reads.
    pub fn dependencies(&self, id: &RuleId) -> Vec<&RuleId> {
        let Some(&target) = self.index.get(id) else {
            return Vec::new();
        };
        self.successors
            .iter()
            .enumerate()
            .filter(|(_, succ)| succ.contains(&target))
            .map(|(i, _)| &self.nodes[i])
            .collect()
    }

    /// Returns true if `from -> to` is an edge.
    pub fn has_edge(&self, from: &RuleId, to: &RuleId) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.successors[a].contains(&b),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Depth-first search for a back-edge. Returns the cycle in edge order,
/// starting at the node the back-edge points to.
fn find_cycle(successors: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::White; successors.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..successors.len() {
        if marks[start] != Mark::White {
            continue;
        }
        // Explicit stack of (node, next successor position).
        let mut stack = vec![(start, 0usize)];
        marks[start] = Mark::Gray;
        path.push(start);

        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            if let Some(&succ) = successors[node].get(*next) {
                *next += 1;
                match marks[succ] {
                    Mark::White => {
                        marks[succ] = Mark::Gray;
                        path.push(succ);
                        stack.push((succ, 0));
                    }
                    Mark::Gray => {
                        let pos = path.iter().position(|&n| n == succ)?;
                        return Some(path[pos..].to_vec());
                    }
                    Mark::Black => {}
                }
            } else {
                marks[node] = Mark::Black;
                path.pop();
                stack.pop();
            }
        }
    }
    None
}

/// Kahn's algorithm, always emitting the smallest ready index first.
fn topological_order(successors: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree = vec![0usize; successors.len()];
    for succ in successors {
        for &j in succ {
            in_degree[j] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..successors.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(successors.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &j in &successors[node] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }
    order
}
