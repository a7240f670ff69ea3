//! Bounded forward Dijkstra deciding whether a candidate shortcut is needed.

use std::fmt;

use fixedbitset::FixedBitSet;

use crate::graph::{Direction, Graph, NodeId, Weight, INVALID_WEIGHT};
use crate::min_queue::{MinPQ, MinPriorityQueue};

/// Per-worker scratch state for witness searches.
///
/// The distance and hop arrays are sized to the full node count and reset
/// between runs through a dirty list of the touched nodes, so a single
/// instance is cheap to reuse across the whole construction.
pub struct WitnessSearch<PQ = MinPQ<NodeId, (Weight, NodeId)>> {
    dist: Vec<Weight>,
    hops: Vec<u8>,
    settled: FixedBitSet,
    touched: Vec<NodeId>,
    queue: PQ,
}

impl<PQ> fmt::Debug for WitnessSearch<PQ> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessSearch")
            .field("nr_of_nodes", &self.dist.len())
            .field("touched", &self.touched)
            .finish_non_exhaustive()
    }
}

impl WitnessSearch {
    /// Creates scratch state for a graph with `nr_of_nodes` nodes.
    pub fn new(nr_of_nodes: usize) -> Self {
        WitnessSearch {
            dist: vec![INVALID_WEIGHT; nr_of_nodes],
            hops: vec![0; nr_of_nodes],
            settled: FixedBitSet::with_capacity(nr_of_nodes),
            touched: Vec::new(),
            queue: MinPQ::with_default_hasher(),
        }
    }
}

impl<PQ> WitnessSearch<PQ>
where
    PQ: MinPriorityQueue<Key = NodeId, Value = (Weight, NodeId)>,
{
    fn reset(&mut self) {
        for &node in &self.touched {
            self.dist[node as usize] = INVALID_WEIGHT;
            self.hops[node as usize] = 0;
            self.settled.set(node as usize, false);
        }
        self.touched.clear();
        self.queue.reset();
    }

    /// Runs a bounded forward Dijkstra from `source` and returns
    /// `Some(d(source, target))` if a path of weight at most `bound` exists
    /// that avoids `centre`, `None` otherwise.
    ///
    /// The search stops as soon as the smallest unsettled distance exceeds
    /// `bound`, never expands nodes at the hop limit, and gives up once
    /// `settled_limit` nodes are settled. A `None` under these bounds means
    /// "no witness proven", not "no path exists".
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        graph: &Graph,
        contracted: &FixedBitSet,
        source: NodeId,
        target: NodeId,
        centre: NodeId,
        bound: Weight,
        hop_limit: u8,
        settled_limit: usize,
    ) -> Option<Weight> {
        debug_assert_ne!(source, centre);
        debug_assert_ne!(target, centre);
        self.reset();
        self.dist[source as usize] = 0;
        self.touched.push(source);
        self.queue.push(source, (0, source));

        let mut nr_settled = 0;
        while let Some((node, (dist, _))) = self.queue.pop() {
            if dist > bound {
                // All remaining labels are at least as large.
                break;
            }
            if self.settled.contains(node as usize) {
                // Stale queue entry.
                continue;
            }
            self.settled.insert(node as usize);
            if node == target {
                return Some(dist);
            }
            nr_settled += 1;
            if nr_settled >= settled_limit {
                break;
            }
            if self.hops[node as usize] >= hop_limit {
                continue;
            }
            for edge in graph.node_edges(node, Direction::Outgoing) {
                let next = edge.tgt;
                if next == centre
                    || contracted.contains(next as usize)
                    || self.settled.contains(next as usize)
                {
                    continue;
                }
                let next_dist = dist + edge.weight;
                if next_dist > bound || next_dist >= self.dist[next as usize] {
                    continue;
                }
                if self.dist[next as usize] == INVALID_WEIGHT {
                    self.touched.push(next);
                }
                self.dist[next as usize] = next_dist;
                self.hops[next as usize] = self.hops[node as usize] + 1;
                self.queue.decrease_value(next, (next_dist, next));
            }
        }
        None
    }
}
