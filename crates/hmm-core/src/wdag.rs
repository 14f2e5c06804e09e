//! Weighted directed acyclic graph (trellis) core.
//!
//! Nodes are addressed by their index into an arena (`Vec<Node>`); a
//! parent's index is always smaller than its child's, so topological
//! order is just iteration order. This sidesteps cyclic ownership and
//! makes the "parent.id < child.id" invariant checkable with a single
//! assert rather than a traversal.

use crate::error::{Error, Result};
use hmm_math::{is_log_zero, lnsum, LOG_ZERO};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The four edge kinds the builder ever emits, carrying the provenance
/// the re-estimators parse back out. A tagged enum in place of the
/// source's ASCII edge-name strings: no parser, no global scratch
/// buffer, exhaustive matches in the re-estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdgeName {
    /// Initial-state assignment to `state`.
    Start { state: usize },
    /// Transition from `from` to `to`.
    Trans { from: usize, to: usize },
    /// Emission at a timepoint: `state` emits `symbol` (`None` for the
    /// continuous variant, which has no discrete symbol to name).
    Emit { state: usize, symbol: Option<usize> },
    /// Finish edge, always weight zero.
    Finish,
}

/// One in-edge of a node: which parent it comes from, its name, and its
/// log-weight.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InEdge {
    pub parent: usize,
    pub name: EdgeName,
    pub log_weight: f64,
}

#[derive(Debug, Clone)]
struct Node {
    in_edges: Vec<InEdge>,
}

impl Node {
    fn new() -> Self {
        Self {
            in_edges: Vec::new(),
        }
    }
}

/// The best-path result of [`Wdag::find_best_path`]: its total weight and
/// the edge names traversed, in order from start to end.
#[derive(Debug, Clone)]
pub struct BestPath {
    pub weight: f64,
    pub edge_names: Vec<EdgeName>,
}

/// The forward/backward result of [`Wdag::find_posterior_probs`].
#[derive(Debug, Clone)]
pub struct Posteriors {
    pub fw: Vec<f64>,
    pub bw: Vec<f64>,
    /// Total log-likelihood of the trellis, in nats. Equal to
    /// `fw[end]` and, within floating-point rounding, `bw[start]`.
    pub alpha: f64,
}

/// A weighted directed acyclic graph over a fixed arena of nodes.
#[derive(Debug, Clone)]
pub struct Wdag {
    nodes: Vec<Node>,
    required_start: Option<usize>,
    required_end: Option<usize>,
}

impl Default for Wdag {
    fn default() -> Self {
        Self::new()
    }
}

impl Wdag {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            required_start: None,
            required_end: None,
        }
    }

    /// Appends a new node and returns its id.
    pub fn add_node(&mut self) -> usize {
        self.nodes.push(Node::new());
        self.nodes.len() - 1
    }

    /// Adds a weighted, named edge from `parent` to `child`.
    ///
    /// # Panics
    ///
    /// Panics if `parent >= child`: the trellis builder is the only
    /// caller, and a violation there is a programming error, not a
    /// runtime data error.
    pub fn add_edge(&mut self, child: usize, parent: usize, name: EdgeName, log_weight: f64) {
        assert!(
            parent < child,
            "WDAG edges must point forward: parent {parent} >= child {child}"
        );
        self.nodes[child].in_edges.push(InEdge {
            parent,
            name,
            log_weight,
        });
    }

    pub fn set_required_start(&mut self, id: usize) {
        self.required_start = Some(id);
    }

    pub fn set_required_end(&mut self, id: usize) {
        self.required_end = Some(id);
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_edges(&self) -> usize {
        self.nodes.iter().map(|n| n.in_edges.len()).sum()
    }

    /// The in-edges of `node`: parent id, edge name, log-weight.
    pub fn edges_into(&self, node: usize) -> &[InEdge] {
        &self.nodes[node].in_edges
    }

    fn start(&self) -> usize {
        self.required_start
            .expect("WDAG has no required start node set")
    }

    fn end(&self) -> usize {
        self.required_end
            .expect("WDAG has no required end node set")
    }

    /// Builds the reverse adjacency (out-edges per node) from the
    /// in-edge lists. Used only by [`Self::find_posterior_probs`], which
    /// needs to walk forward from each node during the backward pass.
    fn out_edges(&self) -> Vec<Vec<(usize, EdgeName, f64)>> {
        let mut out = vec![Vec::new(); self.nodes.len()];
        for (child, node) in self.nodes.iter().enumerate() {
            for edge in &node.in_edges {
                out[edge.parent].push((child, edge.name, edge.log_weight));
            }
        }
        out
    }

    /// Computes, for every node in topological order, the max-plus
    /// best-path weight from the start node, then reconstructs the
    /// sequence of edge names on the best path.
    pub fn find_best_path(&self) -> Result<BestPath> {
        let start = self.start();
        let end = self.end();
        let n = self.nodes.len();

        let mut best = vec![LOG_ZERO; n];
        let mut back: Vec<Option<(usize, EdgeName)>> = vec![None; n];
        best[start] = 0.0;

        for (v, node) in self.nodes.iter().enumerate() {
            if v == start {
                continue;
            }
            for edge in &node.in_edges {
                let candidate = best[edge.parent] + edge.log_weight;
                if candidate.is_nan() {
                    return Err(Error::Numeric(format!(
                        "NaN best-path weight at node {v} via {:?}",
                        edge.name
                    )));
                }
                if candidate > best[v] {
                    best[v] = candidate;
                    back[v] = Some((edge.parent, edge.name));
                }
            }
        }

        if is_log_zero(best[end]) {
            return Err(Error::NoPath);
        }

        let mut edge_names = Vec::new();
        let mut cur = end;
        while cur != start {
            let (parent, name) = back[cur].expect("reachable node must have a back-pointer");
            edge_names.push(name);
            cur = parent;
        }
        edge_names.reverse();

        Ok(BestPath {
            weight: best[end],
            edge_names,
        })
    }

    /// Computes forward (`fw`) and backward (`bw`) log-mass at every
    /// node, plus the total log-likelihood `alpha`.
    pub fn find_posterior_probs(&self) -> Result<Posteriors> {
        let start = self.start();
        let end = self.end();
        let n = self.nodes.len();

        let mut fw = vec![LOG_ZERO; n];
        fw[start] = 0.0;
        for (v, node) in self.nodes.iter().enumerate() {
            if v == start {
                continue;
            }
            let mut acc = LOG_ZERO;
            for edge in &node.in_edges {
                acc = lnsum(acc, fw[edge.parent] + edge.log_weight);
            }
            if acc.is_nan() {
                return Err(Error::Numeric(format!("NaN forward mass at node {v}")));
            }
            fw[v] = acc;
        }

        let out_edges = self.out_edges();
        let mut bw = vec![LOG_ZERO; n];
        bw[end] = 0.0;
        for v in (0..n).rev() {
            if v == end {
                continue;
            }
            let mut acc = LOG_ZERO;
            for &(child, _name, weight) in &out_edges[v] {
                acc = lnsum(acc, weight + bw[child]);
            }
            if acc.is_nan() {
                return Err(Error::Numeric(format!("NaN backward mass at node {v}")));
            }
            bw[v] = acc;
        }

        let alpha = fw[end];
        Ok(Posteriors { fw, bw, alpha })
    }
}
