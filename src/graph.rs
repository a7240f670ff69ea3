//! CSR-style graph representation mutated by the contraction engine.

use fixedbitset::FixedBitSet;
use log::{debug, info};

/// Identifier of a node, dense over `0..nr_of_nodes`.
pub type NodeId = u32;
/// Identifier of an edge, stable for the lifetime of the build.
pub type EdgeId = u32;
/// Non-negative edge weight.
pub type Weight = u32;
/// Level assigned to a node when it is contracted.
pub type Level = u32;

/// Sentinel distance for nodes that have not been reached.
pub const INVALID_WEIGHT: Weight = Weight::MAX;

/// Direction of the edges incident to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges leaving the node.
    Outgoing,
    /// Edges entering the node.
    Incoming,
}

/// A graph node with its geometric payload.
///
/// The contraction engine treats the payload as opaque; the OSM fields are
/// `None` when the input format does not carry them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Dense id of the node.
    pub id: NodeId,
    /// Latitude of the node.
    pub lat: f64,
    /// Longitude of the node.
    pub lon: f64,
    /// OSM id, when the input format carries one.
    pub osm_id: Option<i64>,
    /// Elevation, when the input format carries one.
    pub elevation: Option<f64>,
}

/// Edge payload read from STD / FMI input and carried through to the writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeMeta {
    /// OSM road type.
    pub road_type: i32,
    /// Maximum speed.
    pub speed: i32,
}

/// An edge of the search graph.
///
/// Original edges have both children set to `None`; a shortcut carries the
/// ids of the two edges it bridges, so that queries can unpack paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    /// Id of the edge, unique over the lifetime of the build.
    pub id: EdgeId,
    /// Source node.
    pub src: NodeId,
    /// Target node.
    pub tgt: NodeId,
    /// Weight of the edge; for a shortcut, the sum of its children.
    pub weight: Weight,
    /// First bridged edge, `None` for an original edge.
    pub child1: Option<EdgeId>,
    /// Second bridged edge, `None` for an original edge.
    pub child2: Option<EdgeId>,
}

impl Shortcut {
    /// Creates an edge of the original graph.
    pub fn new_original(id: EdgeId, src: NodeId, tgt: NodeId, weight: Weight) -> Self {
        Shortcut {
            id,
            src,
            tgt,
            weight,
            child1: None,
            child2: None,
        }
    }

    /// Creates a shortcut bridging `first` and `second`.
    ///
    /// The id is assigned by the graph when the shortcut is committed.
    pub fn make_shortcut(first: &Shortcut, second: &Shortcut) -> Self {
        debug_assert_eq!(first.tgt, second.src);
        Shortcut {
            id: EdgeId::MAX,
            src: first.src,
            tgt: second.tgt,
            weight: first.weight + second.weight,
            child1: Some(first.id),
            child2: Some(second.id),
        }
    }

    /// Returns `true` if the edge was created during contraction.
    pub fn is_shortcut(&self) -> bool {
        self.child1.is_some()
    }

    /// Returns the endpoint of the edge seen from the given direction: the
    /// source for incoming edges, the target for outgoing edges.
    pub fn other_node(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Incoming => self.src,
            Direction::Outgoing => self.tgt,
        }
    }
}

fn out_edge_key(edge: &Shortcut) -> (NodeId, NodeId, Weight, EdgeId) {
    (edge.src, edge.tgt, edge.weight, edge.id)
}

fn in_edge_key(edge: &Shortcut) -> (NodeId, NodeId, Weight, EdgeId) {
    (edge.tgt, edge.src, edge.weight, edge.id)
}

/// Graph data produced by a format reader.
#[derive(Debug, Clone, Default)]
pub struct GraphInData {
    /// The nodes, in id order.
    pub nodes: Vec<Node>,
    /// The edges, in id order.
    pub edges: Vec<Shortcut>,
    /// Per-edge payload, parallel to `edges`; empty when the format has none.
    pub meta: Vec<EdgeMeta>,
    /// Node levels, only present for FMI_CH input.
    pub levels: Option<Vec<Level>>,
}

/// Finalized graph data handed to a format writer.
///
/// Edges are sorted by `(src, tgt, weight)` and densely renumbered; child
/// ids refer to positions in `edges`.
#[derive(Debug, Clone)]
pub struct GraphOutData {
    /// The nodes, in id order.
    pub nodes: Vec<Node>,
    /// The level of each node, parallel to `nodes`.
    pub levels: Vec<Level>,
    /// Every edge that was ever live, sorted and renumbered.
    pub edges: Vec<Shortcut>,
    /// Per-edge payload, parallel to `edges`; `None` for shortcuts.
    pub meta: Vec<Option<EdgeMeta>>,
}

/// The CSR graph the contraction engine works on.
///
/// The same logical edges are kept twice: `out_edges` sorted by
/// `(src, tgt, weight)` and `in_edges` sorted by `(tgt, src, weight)`, each
/// with an offset array bounding the per-node slices. Mutations through
/// [`add_edges`](Graph::add_edges) and [`remove_edges`](Graph::remove_edges)
/// are buffered and take effect at the next [`update`](Graph::update).
/// Removed edges are retained in an internal dump so the final
/// [`export`](Graph::export) contains every edge that was ever live.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    node_levels: Vec<Level>,

    out_edges: Vec<Shortcut>,
    in_edges: Vec<Shortcut>,
    out_offsets: Vec<usize>,
    in_offsets: Vec<usize>,

    /// Maps an edge id to the index of that edge in `out_edges`.
    id_to_index: Vec<usize>,
    next_edge_id: EdgeId,

    /// Payload of the edges, indexed by edge id.
    meta: Vec<Option<EdgeMeta>>,

    edges_dump: Vec<Shortcut>,
    pending_insertions: Vec<Shortcut>,
    pending_removals: Vec<EdgeId>,
}

impl Graph {
    /// Initializes the graph from reader data and sorts the edge lists.
    pub fn init(data: GraphInData) -> Self {
        let nr_of_nodes = data.nodes.len();
        let nr_of_edges = data.edges.len();
        debug_assert!(data
            .edges
            .iter()
            .enumerate()
            .all(|(i, e)| e.id as usize == i));
        let meta = if data.meta.is_empty() {
            vec![None; nr_of_edges]
        } else {
            data.meta.into_iter().map(Some).collect()
        };
        let mut graph = Graph {
            nodes: data.nodes,
            node_levels: data.levels.unwrap_or_else(|| vec![0; nr_of_nodes]),
            in_edges: data.edges.clone(),
            out_edges: data.edges,
            next_edge_id: nr_of_edges as EdgeId,
            meta,
            ..Default::default()
        };
        graph.update();
        graph.log_statistics();
        graph
    }

    /// Number of nodes of the graph.
    pub fn nr_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges of the graph (dumped edges not counted).
    pub fn nr_of_edges(&self) -> usize {
        self.out_edges.len()
    }

    /// Number of edges moved to the dump by contraction so far.
    pub fn nr_of_dumped_edges(&self) -> usize {
        self.edges_dump.len()
    }

    /// Returns a node by id.
    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node as usize]
    }

    /// Returns a live edge by id.
    pub fn edge(&self, edge: EdgeId) -> &Shortcut {
        let index = self.id_to_index[edge as usize];
        debug_assert_ne!(index, usize::MAX, "edge {} is not live", edge);
        &self.out_edges[index]
    }

    /// Returns the edges incident to `node` in the given direction, sorted by
    /// the other endpoint, then weight.
    pub fn node_edges(&self, node: NodeId, direction: Direction) -> &[Shortcut] {
        let node = node as usize;
        match direction {
            Direction::Outgoing => &self.out_edges[self.out_offsets[node]..self.out_offsets[node + 1]],
            Direction::Incoming => &self.in_edges[self.in_offsets[node]..self.in_offsets[node + 1]],
        }
    }

    /// Number of live edges incident to `node` in the given direction.
    pub fn degree(&self, node: NodeId, direction: Direction) -> usize {
        self.node_edges(node, direction).len()
    }

    /// Returns the smallest weight of a live edge `src -> tgt`, if any.
    pub fn min_edge_weight(&self, src: NodeId, tgt: NodeId) -> Option<Weight> {
        let edges = self.node_edges(src, Direction::Outgoing);
        let start = edges.partition_point(|e| e.tgt < tgt);
        edges.get(start).filter(|e| e.tgt == tgt).map(|e| e.weight)
    }

    /// Level of a node (0 until the node is contracted).
    pub fn level(&self, node: NodeId) -> Level {
        self.node_levels[node as usize]
    }

    /// Records the level of a contracted node.
    pub fn set_level(&mut self, node: NodeId, level: Level) {
        self.node_levels[node as usize] = level;
    }

    /// Buffers new edges for insertion, assigning them fresh ids in the
    /// order given. The edges become visible at the next [`update`](Graph::update).
    pub fn add_edges(&mut self, edges: impl IntoIterator<Item = Shortcut>) -> usize {
        let before = self.pending_insertions.len();
        for mut edge in edges {
            edge.id = self.next_edge_id;
            self.next_edge_id += 1;
            self.meta.push(None);
            self.pending_insertions.push(edge);
        }
        self.pending_insertions.len() - before
    }

    /// Buffers edges for removal. The edges disappear from the working view
    /// at the next [`update`](Graph::update) but are retained for export.
    pub fn remove_edges(&mut self, ids: impl IntoIterator<Item = EdgeId>) {
        self.pending_removals.extend(ids);
    }

    /// Applies pending mutations, re-sorts both edge lists, rebuilds the
    /// offset arrays and the id-to-index map. Idempotent when no mutation is
    /// pending.
    pub fn update(&mut self) {
        self.apply_pending();
        self.out_edges.sort_unstable_by_key(out_edge_key);
        self.in_edges.sort_unstable_by_key(in_edge_key);
        self.init_offsets();
        self.init_id_to_index();
    }

    fn apply_pending(&mut self) {
        if !self.pending_removals.is_empty() {
            let mut removed = FixedBitSet::with_capacity(self.next_edge_id as usize);
            for &id in &self.pending_removals {
                removed.insert(id as usize);
            }
            let mut kept = Vec::with_capacity(self.out_edges.len());
            for edge in self.out_edges.drain(..) {
                if removed.contains(edge.id as usize) {
                    self.edges_dump.push(edge);
                } else {
                    kept.push(edge);
                }
            }
            self.out_edges = kept;
            // The in-edge list holds the same logical edges, only the
            // out-edge copy goes to the dump.
            self.in_edges.retain(|e| !removed.contains(e.id as usize));
            self.pending_removals.clear();
        }
        if !self.pending_insertions.is_empty() {
            self.in_edges.extend_from_slice(&self.pending_insertions);
            self.out_edges.append(&mut self.pending_insertions);
        }
    }

    fn init_offsets(&mut self) {
        let nr_of_nodes = self.nodes.len();
        self.out_offsets = prefix_sums(nr_of_nodes, self.out_edges.iter().map(|e| e.src));
        self.in_offsets = prefix_sums(nr_of_nodes, self.in_edges.iter().map(|e| e.tgt));
    }

    fn init_id_to_index(&mut self) {
        self.id_to_index.clear();
        self.id_to_index.resize(self.next_edge_id as usize, usize::MAX);
        for (index, edge) in self.out_edges.iter().enumerate() {
            self.id_to_index[edge.id as usize] = index;
        }
    }

    /// Logs node/edge counts and degree statistics of the active nodes.
    pub fn log_statistics(&self) {
        info!(
            "Graph has {} nodes and {} edges (maximal edge id: {})",
            self.nodes.len(),
            self.out_edges.len(),
            self.next_edge_id.saturating_sub(1),
        );
        let mut active_nodes = 0usize;
        let (mut min_deg, mut max_deg, mut total_deg) = (usize::MAX, 0usize, 0usize);
        for node in 0..self.nodes.len() as NodeId {
            let degree =
                self.degree(node, Direction::Outgoing) + self.degree(node, Direction::Incoming);
            if degree > 0 {
                active_nodes += 1;
                min_deg = min_deg.min(degree);
                max_deg = max_deg.max(degree);
                total_deg += degree;
            }
        }
        if active_nodes > 0 {
            debug!(
                "{} active nodes, degrees: min {}, max {}, avg {:.2}",
                active_nodes,
                min_deg,
                max_deg,
                total_deg as f64 / active_nodes as f64,
            );
        } else {
            debug!("No active nodes");
        }
    }

    /// Consumes the graph and produces the finalized data for the writers.
    ///
    /// Live and dumped edges are merged, sorted by `(src, tgt, weight)` and
    /// densely renumbered; child ids are remapped to the new numbering.
    pub fn export(mut self) -> GraphOutData {
        self.update();
        let mut edges = self.out_edges;
        edges.append(&mut self.edges_dump);
        edges.sort_unstable_by_key(out_edge_key);

        let mut new_ids = vec![0 as EdgeId; self.next_edge_id as usize];
        for (index, edge) in edges.iter().enumerate() {
            new_ids[edge.id as usize] = index as EdgeId;
        }
        let mut meta = Vec::with_capacity(edges.len());
        for edge in edges.iter_mut() {
            meta.push(self.meta[edge.id as usize]);
            edge.id = new_ids[edge.id as usize];
            edge.child1 = edge.child1.map(|child| new_ids[child as usize]);
            edge.child2 = edge.child2.map(|child| new_ids[child as usize]);
        }
        GraphOutData {
            nodes: self.nodes,
            levels: self.node_levels,
            edges,
            meta,
        }
    }
}

fn prefix_sums(nr_of_nodes: usize, nodes: impl Iterator<Item = NodeId>) -> Vec<usize> {
    let mut offsets = vec![0usize; nr_of_nodes + 1];
    for node in nodes {
        offsets[node as usize] += 1;
    }
    let mut sum = 0;
    for offset in offsets.iter_mut() {
        let count = *offset;
        *offset = sum;
        sum += count;
    }
    offsets
}
