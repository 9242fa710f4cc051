//! Graph and volume adapter traits.
//!
//! Walk generation only needs two read-only views of the outside world:
//! - [`GraphView`]: which nodes exist and who their neighbors are;
//! - [`VolumeIndex`]: how much volume flows through a node and along an edge.
//!
//! Both are deliberately small so that callers can adapt whatever graph store they
//! already have. [`AdjacencyList`] and [`VolumeTable`] are simple in-memory
//! implementations for tests and small corpora.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub trait GraphView {
    type Node: Clone + Eq + Hash + Debug;

    /// All nodes, in a stable order for the lifetime of the view.
    fn nodes(&self) -> Vec<Self::Node>;

    /// Neighbors of `node`.
    ///
    /// The order must be stable within one preprocessing or one walk-generation pass:
    /// transition probabilities are stored positionally against it.
    /// Unknown nodes have no neighbors.
    fn neighbors(&self, node: &Self::Node) -> Cow<'_, [Self::Node]>;

    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    fn out_degree(&self, node: &Self::Node) -> usize {
        self.neighbors(node).len()
    }
}

/// Per-node and per-edge volume lookups.
///
/// `None` means "no data", which is distinct from a volume of zero.
pub trait VolumeIndex<N> {
    /// Total volume of `node`.
    fn total(&self, node: &N) -> Option<f64>;

    /// Pairwise volume from `node` to `neighbor`.
    fn between(&self, node: &N, neighbor: &N) -> Option<f64>;
}

/// Insertion-ordered adjacency list keyed by arbitrary node identifiers.
#[derive(Debug, Clone)]
pub struct AdjacencyList<N> {
    nodes: Vec<N>,
    index: HashMap<N, usize>,
    adj: Vec<Vec<N>>,
}

impl<N: Clone + Eq + Hash> Default for AdjacencyList<N> {
    fn default() -> Self {
        Self { nodes: Vec::new(), index: HashMap::new(), adj: Vec::new() }
    }
}

impl<N: Clone + Eq + Hash> AdjacencyList<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an undirected graph from an edge list.
    pub fn from_undirected_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (N, N)>,
    {
        let mut g = Self::new();
        for (a, b) in edges {
            g.add_undirected_edge(a, b);
        }
        g
    }

    /// Insert `node` if absent and return its position in [`GraphView::nodes`].
    pub fn add_node(&mut self, node: N) -> usize {
        if let Some(&i) = self.index.get(&node) {
            return i;
        }
        let i = self.nodes.len();
        self.index.insert(node.clone(), i);
        self.nodes.push(node);
        self.adj.push(Vec::new());
        i
    }

    /// Add a directed edge `from -> to`. Parallel edges are ignored.
    pub fn add_edge(&mut self, from: N, to: N) {
        let i = self.add_node(from);
        self.add_node(to.clone());
        if !self.adj[i].contains(&to) {
            self.adj[i].push(to);
        }
    }

    pub fn add_undirected_edge(&mut self, a: N, b: N) {
        self.add_edge(a.clone(), b.clone());
        self.add_edge(b, a);
    }

    pub fn contains(&self, node: &N) -> bool {
        self.index.contains_key(node)
    }
}

impl<N: Clone + Eq + Hash + Debug> GraphView for AdjacencyList<N> {
    type Node = N;

    fn nodes(&self) -> Vec<N> {
        self.nodes.clone()
    }

    fn neighbors(&self, node: &N) -> Cow<'_, [N]> {
        match self.index.get(node) {
            Some(&i) => Cow::Borrowed(self.adj[i].as_slice()),
            None => Cow::Borrowed(&[]),
        }
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Map-backed [`VolumeIndex`].
#[derive(Debug, Clone)]
pub struct VolumeTable<N> {
    totals: HashMap<N, f64>,
    between: HashMap<N, HashMap<N, f64>>,
}

impl<N: Clone + Eq + Hash> Default for VolumeTable<N> {
    fn default() -> Self {
        Self { totals: HashMap::new(), between: HashMap::new() }
    }
}

impl<N: Clone + Eq + Hash> VolumeTable<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate symmetric pairwise volumes from `(a, b, volume)` records.
    ///
    /// Each record adds `volume` to `between(a, b)`, `between(b, a)`, `total(a)` and
    /// `total(b)`. A self-loop counts once.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (N, N, f64)>,
    {
        let mut t = Self::new();
        for (a, b, v) in edges {
            *t.totals.entry(a.clone()).or_insert(0.0) += v;
            *t.between.entry(a.clone()).or_default().entry(b.clone()).or_insert(0.0) += v;
            if a != b {
                *t.totals.entry(b.clone()).or_insert(0.0) += v;
                *t.between.entry(b).or_default().entry(a).or_insert(0.0) += v;
            }
        }
        t
    }

    pub fn set_total(&mut self, node: N, volume: f64) {
        self.totals.insert(node, volume);
    }

    pub fn set_between(&mut self, node: N, neighbor: N, volume: f64) {
        self.between.entry(node).or_default().insert(neighbor, volume);
    }
}

impl<N: Eq + Hash> VolumeIndex<N> for VolumeTable<N> {
    fn total(&self, node: &N) -> Option<f64> {
        self.totals.get(node).copied()
    }

    fn between(&self, node: &N, neighbor: &N) -> Option<f64> {
        self.between.get(node)?.get(neighbor).copied()
    }
}

/// Neighbors are distinct nodes: parallel edges collapse to one neighbor, keeping the
/// first position petgraph reports, so a doubled edge does not double its share.
/// Volumes come from the [`VolumeIndex`], not from edge multiplicity.
#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> GraphView for petgraph::Graph<N, E, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    type Node = petgraph::graph::NodeIndex<Ix>;

    fn nodes(&self) -> Vec<Self::Node> {
        self.node_indices().collect()
    }

    fn neighbors(&self, node: &Self::Node) -> Cow<'_, [Self::Node]> {
        let mut seen = std::collections::HashSet::new();
        Cow::Owned(
            petgraph::Graph::neighbors(self, *node)
                .filter(|n| seen.insert(*n))
                .collect(),
        )
    }

    fn node_count(&self) -> usize {
        petgraph::Graph::node_count(self)
    }
}
