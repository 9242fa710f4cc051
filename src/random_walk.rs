//! Random walk generation.

use crate::graph::{GraphView, VolumeIndex};
use crate::sample::{uniform_index, SamplingMethod};
use crate::transition::TransitionTable;
use crate::{Error, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Upper bound on up-front buffer reservations. Walks stop at dead ends, so the requested
/// sizes are only limits and may be far larger than what is produced.
const MAX_WALK_PREALLOC: usize = 1 << 10;
const MAX_CORPUS_PREALLOC: usize = 1 << 20;

fn walk_capacity(length: usize) -> usize {
    length.clamp(1, MAX_WALK_PREALLOC)
}

fn corpus_capacity(start_nodes: usize, num_walks: usize) -> usize {
    start_nodes.saturating_mul(num_walks).min(MAX_CORPUS_PREALLOC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Number of passes over the start nodes; each pass emits one walk per node.
    pub num_walks: usize,
    /// Maximum walk length (in nodes).
    pub walk_length: usize,
    /// Seed for deterministic RNG. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { num_walks: 10, walk_length: 80, seed: None }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_walks == 0 {
            return Err(Error::InvalidParameter("num_walks must be positive".into()));
        }
        if self.walk_length == 0 {
            return Err(Error::InvalidParameter("walk_length must be positive".into()));
        }
        Ok(())
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        }
    }
}

/// Samples walks against a prebuilt [`TransitionTable`].
///
/// The walker borrows the graph for live neighbor queries and owns the table; neither
/// is mutated while walking, so a walker can be shared across threads.
pub struct RandomWalker<'g, G: GraphView> {
    graph: &'g G,
    table: TransitionTable<G::Node>,
}

impl<'g, G: GraphView> RandomWalker<'g, G> {
    /// Preprocess transition probabilities and return a walker over `graph`.
    pub fn new<V>(graph: &'g G, volumes: &V) -> Result<Self>
    where
        V: VolumeIndex<G::Node> + ?Sized,
    {
        Self::with_method(graph, volumes, SamplingMethod::default())
    }

    pub fn with_method<V>(graph: &'g G, volumes: &V, method: SamplingMethod) -> Result<Self>
    where
        V: VolumeIndex<G::Node> + ?Sized,
    {
        let table = TransitionTable::build_with(graph, volumes, method)?;
        Ok(Self { graph, table })
    }

    /// Walk over `graph` with a table built elsewhere (possibly from an older snapshot).
    pub fn from_table(graph: &'g G, table: TransitionTable<G::Node>) -> Self {
        Self { graph, table }
    }

    pub fn table(&self) -> &TransitionTable<G::Node> {
        &self.table
    }

    pub fn graph(&self) -> &'g G {
        self.graph
    }

    /// Pick the successor of `cur` among `nbrs`, its freshly queried neighbor list.
    ///
    /// Uses the table entry of `cur` positionally when its length matches `nbrs`, and a
    /// uniform draw otherwise. `prev` is accepted for second-order walks but does not
    /// bias the draw: this is a first-order walk.
    ///
    /// Returns `None` only when `nbrs` is empty.
    pub fn next_node<'n, R: Rng + ?Sized>(
        &self,
        cur: &G::Node,
        nbrs: &'n [G::Node],
        _prev: Option<&G::Node>,
        rng: &mut R,
    ) -> Option<&'n G::Node> {
        if nbrs.is_empty() {
            return None;
        }
        let i = match self.table.entry(cur) {
            Some(entry) if entry.len() == nbrs.len() => entry.draw.sample(rng),
            Some(entry) => {
                warn!(
                    node = ?cur,
                    expected = entry.len(),
                    found = nbrs.len(),
                    "neighbor count changed since table build, sampling uniformly"
                );
                uniform_index(nbrs.len(), rng)
            }
            None => uniform_index(nbrs.len(), rng),
        };
        Some(&nbrs[i])
    }

    /// One walk of at most `length` nodes starting at `start`.
    ///
    /// Stops early at a node without neighbors. The walk always contains `start`,
    /// even for `length == 0`.
    pub fn walk<R: Rng + ?Sized>(&self, length: usize, start: &G::Node, rng: &mut R) -> Vec<G::Node> {
        let mut walk = Vec::with_capacity(walk_capacity(length));
        self.walk_into(length, start, rng, &mut walk);
        walk
    }

    fn walk_into<R: Rng + ?Sized>(
        &self,
        length: usize,
        start: &G::Node,
        rng: &mut R,
        walk: &mut Vec<G::Node>,
    ) {
        walk.clear();
        walk.push(start.clone());

        while walk.len() < length {
            let cur = &walk[walk.len() - 1];
            let prev = walk.len().checked_sub(2).map(|i| &walk[i]);
            let nbrs = self.graph.neighbors(cur);
            let Some(next) = self.next_node(cur, &nbrs, prev, rng) else {
                break;
            };
            let next = next.clone();
            walk.push(next);
        }
    }

    /// `config.num_walks` walks from every node of the graph.
    ///
    /// Each pass shuffles the node order once and then walks from each node in turn,
    /// so the result holds `num_walks * node_count` walks.
    pub fn simulate(&self, config: &WalkConfig) -> Result<Vec<Vec<G::Node>>> {
        let nodes = self.graph.nodes();
        self.simulate_from_nodes(&nodes, config)
    }

    /// Like [`simulate`](Self::simulate), restricted to `start_nodes`.
    ///
    /// Useful for regenerating walks for a subset of nodes, or for sharding.
    pub fn simulate_from_nodes(
        &self,
        start_nodes: &[G::Node],
        config: &WalkConfig,
    ) -> Result<Vec<Vec<G::Node>>> {
        config.validate()?;
        let mut rng = config.rng();
        Ok(self.collect_walks(start_nodes, config.num_walks, config.walk_length, &mut rng))
    }

    /// Like [`simulate`](Self::simulate) with a caller-owned RNG and no parameter checks.
    pub fn simulate_with_rng<R: Rng + ?Sized>(
        &self,
        num_walks: usize,
        walk_length: usize,
        rng: &mut R,
    ) -> Vec<Vec<G::Node>> {
        let nodes = self.graph.nodes();
        self.collect_walks(&nodes, num_walks, walk_length, rng)
    }

    /// Emit every walk of [`simulate`](Self::simulate) to `f` instead of collecting them.
    ///
    /// The slice passed to `f` is a reused buffer; copy it out if you need to keep it.
    pub fn simulate_streaming<F>(&self, config: &WalkConfig, f: F) -> Result<()>
    where
        F: FnMut(&[G::Node]),
    {
        let nodes = self.graph.nodes();
        self.simulate_streaming_from_nodes(&nodes, config, f)
    }

    pub fn simulate_streaming_from_nodes<F>(
        &self,
        start_nodes: &[G::Node],
        config: &WalkConfig,
        f: F,
    ) -> Result<()>
    where
        F: FnMut(&[G::Node]),
    {
        config.validate()?;
        let mut rng = config.rng();
        self.for_each_walk(start_nodes, config.num_walks, config.walk_length, &mut rng, f);
        Ok(())
    }

    fn collect_walks<R: Rng + ?Sized>(
        &self,
        start_nodes: &[G::Node],
        num_walks: usize,
        walk_length: usize,
        rng: &mut R,
    ) -> Vec<Vec<G::Node>> {
        let mut walks = Vec::with_capacity(corpus_capacity(start_nodes.len(), num_walks));
        self.for_each_walk(start_nodes, num_walks, walk_length, rng, |w| walks.push(w.to_vec()));
        info!(walks = walks.len(), "simulated walks");
        walks
    }

    fn for_each_walk<R, F>(
        &self,
        start_nodes: &[G::Node],
        num_walks: usize,
        walk_length: usize,
        rng: &mut R,
        mut f: F,
    ) where
        R: Rng + ?Sized,
        F: FnMut(&[G::Node]),
    {
        let mut order = start_nodes.to_vec();
        let mut buf = Vec::with_capacity(walk_capacity(walk_length));

        for iteration in 0..num_walks {
            order.shuffle(rng);
            for node in &order {
                self.walk_into(walk_length, node, rng, &mut buf);
                f(&buf);
            }
            debug!(iteration = iteration + 1, num_walks, "walk pass complete");
        }
    }

    /// Check that every table entry still matches its node's current degree.
    ///
    /// Walks never fail on a mismatch (they fall back to uniform sampling); this is the
    /// explicit check for callers who edited the graph after building the table.
    pub fn validate(&self) -> Result<()> {
        for node in self.graph.nodes() {
            let Some(probs) = self.table.get(&node) else {
                continue;
            };
            let found = self.graph.out_degree(&node);
            if probs.len() != found {
                return Err(Error::DegreeMismatch {
                    node: format!("{node:?}"),
                    expected: probs.len(),
                    found,
                });
            }
        }
        Ok(())
    }
}

#[cfg(feature = "parallel")]
impl<'g, G> RandomWalker<'g, G>
where
    G: GraphView + Sync,
    G::Node: Send + Sync,
{
    /// Deterministic parallel [`simulate`](Self::simulate).
    ///
    /// Invariant: output is stable for a fixed `seed`, independent of Rayon thread count.
    /// It differs from the sequential output for the same seed, since every walk gets its
    /// own RNG keyed by (seed, pass, position).
    pub fn simulate_parallel(&self, config: &WalkConfig) -> Result<Vec<Vec<G::Node>>> {
        let nodes = self.graph.nodes();
        self.simulate_parallel_from_nodes(&nodes, config)
    }

    pub fn simulate_parallel_from_nodes(
        &self,
        start_nodes: &[G::Node],
        config: &WalkConfig,
    ) -> Result<Vec<Vec<G::Node>>> {
        use rayon::prelude::*;

        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);

        // Shuffle per pass using a seed that depends only on (seed, pass).
        let mut order: Vec<G::Node> = start_nodes.to_vec();
        let mut jobs: Vec<(u64, G::Node)> =
            Vec::with_capacity(corpus_capacity(start_nodes.len(), config.num_walks));
        for pass in 0..config.num_walks as u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ pass));
            order.shuffle(&mut rng);
            jobs.extend(order.iter().cloned().map(|node| (pass, node)));
        }

        let walks: Vec<Vec<G::Node>> = jobs
            .par_iter()
            .enumerate()
            .map(|(i, (pass, node))| {
                let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ (pass << 32) ^ (i as u64)));
                self.walk(config.walk_length, node, &mut rng)
            })
            .collect();
        info!(walks = walks.len(), "simulated walks in parallel");
        Ok(walks)
    }
}

#[cfg(feature = "parallel")]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

/// Render walks as token sentences for a skip-gram trainer.
pub fn into_sentences<N: Display>(walks: &[Vec<N>]) -> Vec<Vec<String>> {
    walks.iter().map(|w| w.iter().map(ToString::to_string).collect()).collect()
}
