//! Independent-set selection for parallel contraction rounds.

use fixedbitset::FixedBitSet;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::graph::{Direction, Graph, NodeId};

/// Selects, from a pool of not-yet-contracted nodes, a subset in which no
/// two nodes share an edge, so the subset can be contracted in parallel.
///
/// Every node of the pool draws a fresh random priority each round; a node
/// is selected iff its priority beats the priority of every live neighbour
/// that is still in the pool, with ties broken on node id. Isolated pool
/// nodes are always selected, so the selection is non-empty whenever the
/// pool is.
#[derive(Debug)]
pub struct IndependentSetSelector {
    priorities: Vec<u64>,
    in_pool: FixedBitSet,
    seed: u64,
}

impl IndependentSetSelector {
    /// Creates a selector for a graph with `nr_of_nodes` nodes.
    ///
    /// The seed makes the per-round priorities, and therefore the whole
    /// construction, reproducible.
    pub fn new(nr_of_nodes: usize, seed: u64) -> Self {
        IndependentSetSelector {
            priorities: vec![0; nr_of_nodes],
            in_pool: FixedBitSet::with_capacity(nr_of_nodes),
            seed,
        }
    }

    /// Returns an independent subset of `pool`, in pool order.
    ///
    /// `round` salts the seed so consecutive rounds draw fresh priorities.
    pub fn select(&mut self, graph: &Graph, pool: &[NodeId], round: u64) -> Vec<NodeId> {
        let mut rng = XorShiftRng::seed_from_u64(self.seed.wrapping_add(round));
        self.in_pool.clear();
        for &node in pool {
            self.in_pool.insert(node as usize);
        }
        for &node in pool {
            self.priorities[node as usize] = rng.gen();
        }
        pool.iter()
            .copied()
            .filter(|&node| self.beats_neighbours(graph, node))
            .collect()
    }

    fn beats_neighbours(&self, graph: &Graph, node: NodeId) -> bool {
        let key = (self.priorities[node as usize], node);
        let beats = |other: NodeId| {
            !self.in_pool.contains(other as usize)
                || key < (self.priorities[other as usize], other)
        };
        graph
            .node_edges(node, Direction::Outgoing)
            .iter()
            .all(|edge| beats(edge.tgt))
            && graph
                .node_edges(node, Direction::Incoming)
                .iter()
                .all(|edge| beats(edge.src))
    }
}
