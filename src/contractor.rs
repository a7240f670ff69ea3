//! Iterative, parallel node contraction driving the hierarchy levels upward.

use std::fmt;

use anyhow::{Context, Result};
use fixedbitset::FixedBitSet;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, log_enabled, Level as LogLevel};
use object_pool::Pool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::graph::{Direction, EdgeId, Graph, Level, NodeId, Shortcut, Weight};
use crate::selector::IndependentSetSelector;
use crate::witness::WitnessSearch;

/// Set of parameters used when contracting a graph.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContractionParameters {
    /// Hop limit for the witness searches of the warmup rounds.
    pub quick_hop_limit: u8,
    /// Number of warmup rounds run before the main contraction.
    pub quick_rounds: usize,
    /// Hop limit for the witness searches of the main contraction.
    pub hop_limit: u8,
    /// Optional cap on the number of nodes settled per witness search.
    pub settled_limit: Option<usize>,
    /// Seed of the per-round random priorities of the independent-set
    /// selection.
    pub seed: u64,
}

impl Default for ContractionParameters {
    fn default() -> Self {
        ContractionParameters {
            quick_hop_limit: 4,
            quick_rounds: 5,
            hop_limit: 16,
            settled_limit: None,
            seed: 0,
        }
    }
}

/// A shortcut computed by a worker, with the centre node kept until the
/// commit so the merge order is deterministic.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    src: NodeId,
    tgt: NodeId,
    weight: Weight,
    centre: NodeId,
    child1: EdgeId,
    child2: EdgeId,
}

/// Contracts the nodes of a graph round by round.
///
/// Each round, an independent set of the remaining pool is contracted: the
/// worker threads compute the shortcut candidates of the selected nodes
/// against a shared read-only view of the graph, then the main thread merges
/// the candidates deterministically, commits them and removes the edges of
/// the contracted nodes. Nodes contracted in the same round share a level;
/// later rounds get strictly higher levels.
pub struct Contractor<'a> {
    graph: &'a mut Graph,
    parameters: ContractionParameters,
    thread_pool: rayon::ThreadPool,
    scratch: Pool<WitnessSearch>,
    selector: IndependentSetSelector,
    contracted: FixedBitSet,
    next_level: Level,
}

impl fmt::Debug for Contractor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contractor")
            .field("parameters", &self.parameters)
            .field("next_level", &self.next_level)
            .finish_non_exhaustive()
    }
}

impl<'a> Contractor<'a> {
    /// Creates a contractor with a worker pool of `nr_of_threads` threads.
    pub fn new(
        graph: &'a mut Graph,
        nr_of_threads: usize,
        parameters: ContractionParameters,
    ) -> Result<Self> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(nr_of_threads)
            .build()
            .context("Failed to build the worker thread pool")?;
        let nr_of_nodes = graph.nr_of_nodes();
        let scratch = Pool::new(nr_of_threads.max(1), || WitnessSearch::new(nr_of_nodes));
        let selector = IndependentSetSelector::new(nr_of_nodes, parameters.seed);
        Ok(Contractor {
            graph,
            parameters,
            thread_pool,
            scratch,
            selector,
            contracted: FixedBitSet::with_capacity(nr_of_nodes),
            next_level: 1,
        })
    }

    /// Runs the warmup rounds: a fixed number of contraction rounds with a
    /// small hop limit, quickly lowering the density near the bottom of the
    /// hierarchy at the price of some unnecessary shortcuts.
    pub fn quick_contract(&mut self, pool: &mut Vec<NodeId>) {
        info!(
            "Warmup contraction: {} rounds with hop limit {}",
            self.parameters.quick_rounds, self.parameters.quick_hop_limit
        );
        for _ in 0..self.parameters.quick_rounds {
            if pool.is_empty() {
                break;
            }
            self.contract_round(pool, self.parameters.quick_hop_limit);
        }
    }

    /// Contracts every node remaining in the pool.
    pub fn contract(&mut self, pool: &mut Vec<NodeId>) {
        info!(
            "Contracting {} remaining nodes with hop limit {}",
            pool.len(),
            self.parameters.hop_limit
        );
        let bar = if log_enabled!(LogLevel::Debug) {
            ProgressBar::new(pool.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:60} ETA: {eta}")
                .unwrap(),
        );
        while !pool.is_empty() {
            let nr_contracted = self.contract_round(pool, self.parameters.hop_limit);
            bar.inc(nr_contracted as u64);
        }
        bar.finish_and_clear();
        info!(
            "Contraction done: {} levels, {} edges in the search graph",
            self.next_level - 1,
            self.graph.nr_of_edges() + self.graph.nr_of_dumped_edges()
        );
    }

    /// Runs one contraction round and returns the number of contracted nodes.
    fn contract_round(&mut self, pool: &mut Vec<NodeId>, hop_limit: u8) -> usize {
        let set = self
            .selector
            .select(&*self.graph, pool, self.next_level as u64);
        assert!(!set.is_empty(), "empty selection from a non-empty pool");

        // The whole set counts as contracted from the start of the round:
        // a witness routed through a node that is removed in parallel would
        // not survive the round. Without this, two centres with equal-weight
        // paths through each other can both drop their shortcut.
        for &node in &set {
            self.contracted.insert(node as usize);
        }

        let settled_limit = self.parameters.settled_limit.unwrap_or(usize::MAX);
        let graph: &Graph = self.graph;
        let contracted = &self.contracted;
        let scratch = &self.scratch;
        let nr_of_nodes = graph.nr_of_nodes();
        let candidates: Vec<Candidate> = self.thread_pool.install(|| {
            set.par_iter()
                .map_init(
                    || scratch.pull(|| WitnessSearch::new(nr_of_nodes)),
                    |search, &node| {
                        contract_node(graph, contracted, search, node, hop_limit, settled_limit)
                    },
                )
                .flatten()
                .collect()
        });

        self.commit(pool, &set, candidates);
        set.len()
    }

    /// Merges the candidate shortcuts of a round and mutates the graph.
    fn commit(&mut self, pool: &mut Vec<NodeId>, set: &[NodeId], mut candidates: Vec<Candidate>) {
        // Normalize the unordered per-worker results so that shortcut ids do
        // not depend on the thread count.
        candidates.sort_unstable_by_key(|c| (c.src, c.tgt, c.weight, c.centre));

        let mut shortcuts = Vec::with_capacity(candidates.len());
        let mut last_endpoints = None;
        for candidate in candidates {
            if last_endpoints == Some((candidate.src, candidate.tgt)) {
                // A candidate with the same endpoints and a smaller or equal
                // weight was kept just before.
                continue;
            }
            last_endpoints = Some((candidate.src, candidate.tgt));
            if self
                .graph
                .min_edge_weight(candidate.src, candidate.tgt)
                .is_some_and(|weight| weight <= candidate.weight)
            {
                continue;
            }
            shortcuts.push(Shortcut {
                id: EdgeId::MAX,
                src: candidate.src,
                tgt: candidate.tgt,
                weight: candidate.weight,
                child1: Some(candidate.child1),
                child2: Some(candidate.child2),
            });
        }

        let mut removals = Vec::new();
        for &node in set {
            for edge in self.graph.node_edges(node, Direction::Outgoing) {
                removals.push(edge.id);
            }
            for edge in self.graph.node_edges(node, Direction::Incoming) {
                removals.push(edge.id);
            }
        }

        let nr_of_shortcuts = self.graph.add_edges(shortcuts);
        self.graph.remove_edges(removals);
        for &node in set {
            debug_assert!(self.contracted.contains(node as usize));
            self.graph.set_level(node, self.next_level);
        }
        self.next_level += 1;

        let mut in_set = FixedBitSet::with_capacity(self.graph.nr_of_nodes());
        for &node in set {
            in_set.insert(node as usize);
        }
        pool.retain(|&node| !in_set.contains(node as usize));

        self.graph.update();
        debug!(
            "Contracted {} nodes, added {} shortcuts, {} nodes remaining",
            set.len(),
            nr_of_shortcuts,
            pool.len()
        );
    }
}

/// Computes the shortcut candidates of a single node against the shared
/// graph view: one witness search per incoming x outgoing edge pair, a
/// candidate wherever no witness is found.
fn contract_node(
    graph: &Graph,
    contracted: &FixedBitSet,
    search: &mut WitnessSearch,
    node: NodeId,
    hop_limit: u8,
    settled_limit: usize,
) -> Vec<Candidate> {
    let in_edges = graph.node_edges(node, Direction::Incoming);
    let out_edges = graph.node_edges(node, Direction::Outgoing);
    let mut candidates = Vec::new();
    for in_edge in in_edges {
        if contracted.contains(in_edge.src as usize) {
            continue;
        }
        for out_edge in out_edges {
            if in_edge.src == out_edge.tgt || contracted.contains(out_edge.tgt as usize) {
                continue;
            }
            let weight = in_edge.weight + out_edge.weight;
            let witness = search.run(
                graph,
                contracted,
                in_edge.src,
                out_edge.tgt,
                node,
                weight,
                hop_limit,
                settled_limit,
            );
            if witness.is_none() {
                candidates.push(Candidate {
                    src: in_edge.src,
                    tgt: out_edge.tgt,
                    weight,
                    centre: node,
                    child1: in_edge.id,
                    child2: out_edge.id,
                });
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphInData, Node};

    fn build_graph(nr_of_nodes: usize, edges: &[(NodeId, NodeId, Weight)]) -> Graph {
        let nodes = (0..nr_of_nodes as NodeId)
            .map(|id| Node {
                id,
                lat: 0.0,
                lon: 0.0,
                osm_id: None,
                elevation: None,
            })
            .collect();
        let edges = edges
            .iter()
            .enumerate()
            .map(|(i, &(src, tgt, weight))| Shortcut::new_original(i as EdgeId, src, tgt, weight))
            .collect();
        Graph::init(GraphInData {
            nodes,
            edges,
            meta: Vec::new(),
            levels: None,
        })
    }

    #[test]
    fn duplicate_candidates_are_merged_test() {
        // A diamond: 0 --> 1 --> 3 (weights 1, 1) and 0 --> 2 --> 3
        // (weights 2, 1). Contracting 1 and 2 in the same round yields two
        // candidates for 0 --> 3; only the lighter one survives.
        let mut graph = build_graph(4, &[(0, 1, 1), (1, 3, 1), (0, 2, 2), (2, 3, 1)]);
        let mut contractor =
            Contractor::new(&mut graph, 1, ContractionParameters::default()).unwrap();
        let mut pool = vec![1, 2];
        contractor.contract(&mut pool);
        assert!(pool.is_empty());
        let data = graph.export();
        let shortcuts: Vec<_> = data.edges.iter().filter(|e| e.is_shortcut()).collect();
        assert_eq!(shortcuts.len(), 1);
        assert_eq!(
            (shortcuts[0].src, shortcuts[0].tgt, shortcuts[0].weight),
            (0, 3, 2)
        );
        // Both nodes were contracted in the same round.
        assert_eq!(data.levels[1], data.levels[2]);
    }

    #[test]
    fn equal_weight_diamond_keeps_a_shortcut_test() {
        // 0 --> 1 --> 3 and 0 --> 2 --> 3, all weights 1. Nodes 1 and 2 are
        // not adjacent, so one round contracts both; the equal-weight path
        // through the other centre must not count as a witness, otherwise
        // node 3 becomes unreachable from node 0.
        let mut graph = build_graph(4, &[(0, 1, 1), (1, 3, 1), (0, 2, 1), (2, 3, 1)]);
        let mut contractor =
            Contractor::new(&mut graph, 2, ContractionParameters::default()).unwrap();
        let mut pool = vec![1, 2];
        contractor.contract(&mut pool);
        let data = graph.export();
        let shortcuts: Vec<_> = data.edges.iter().filter(|e| e.is_shortcut()).collect();
        assert_eq!(shortcuts.len(), 1);
        assert_eq!(
            (shortcuts[0].src, shortcuts[0].tgt, shortcuts[0].weight),
            (0, 3, 2)
        );
    }

    #[test]
    fn levels_grow_across_rounds_test() {
        // A bidirectional path 0 - 1 - 2 - 3.
        let mut edges = Vec::new();
        for i in 0..3 {
            edges.push((i, i + 1, 1));
            edges.push((i + 1, i, 1));
        }
        let mut graph = build_graph(4, &edges);
        let mut contractor =
            Contractor::new(&mut graph, 2, ContractionParameters::default()).unwrap();
        let mut pool: Vec<NodeId> = (0..4).collect();
        contractor.quick_contract(&mut pool);
        contractor.contract(&mut pool);
        assert!(pool.is_empty());
        let data = graph.export();
        // Every node was contracted and no two adjacent nodes share a level.
        assert!(data.levels.iter().all(|&level| level > 0));
        for edge in &data.edges {
            assert_ne!(data.levels[edge.src as usize], data.levels[edge.tgt as usize]);
        }
    }

    #[test]
    fn existing_edges_suppress_shortcuts_test() {
        // 0 --> 1 --> 2 (weights 1, 1) with a direct edge 0 --> 2 of
        // weight 2. With an unbounded search, the direct edge is a standing
        // witness; with a settle cap of one node, the witness search
        // gives up and the candidate must be suppressed against the
        // existing edge instead. No shortcut either way.
        for settled_limit in [None, Some(1)] {
            let mut graph = build_graph(3, &[(0, 1, 1), (1, 2, 1), (0, 2, 2)]);
            let parameters = ContractionParameters {
                settled_limit,
                ..Default::default()
            };
            let mut contractor = Contractor::new(&mut graph, 1, parameters).unwrap();
            contractor.contract(&mut vec![1]);
            let data = graph.export();
            assert!(data.edges.iter().all(|e| !e.is_shortcut()));
            assert_eq!(data.edges.len(), 3);
        }
    }
}
