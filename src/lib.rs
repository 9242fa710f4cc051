//! `volwalk`: volume-biased random walks for skip-gram graph embeddings.
//!
//! Walks move from a node to one of its neighbors with probability proportional to
//! the pairwise volume between them, normalized by the node's total volume. The
//! resulting corpus (one "sentence" per walk) is meant for a word2vec-style trainer.
//!
//! Generation has two phases:
//! 1. **build**: [`TransitionTable::build`] reads a [`GraphView`] and a [`VolumeIndex`]
//!    once and produces an immutable table of per-node distributions;
//! 2. **walk**: [`RandomWalker`] samples walks against that table, querying the graph's
//!    live neighbor lists at every step.
//!
//! Public invariants (must not drift):
//! - **Positional probabilities**: table entries are aligned with each node's neighbor
//!   order at build time. A node whose degree differs at walk time is sampled uniformly.
//! - **Determinism**: a seeded [`WalkConfig`] and a fixed graph/volume snapshot give
//!   identical walks.
//! - **No partial tables**: a build error leaves nothing behind.

pub mod graph;
pub mod random_walk;
pub mod sample;
pub mod transition;

pub use graph::{AdjacencyList, GraphView, VolumeIndex, VolumeTable};
pub use random_walk::{into_sentences, RandomWalker, WalkConfig};
pub use sample::SamplingMethod;
pub use transition::TransitionTable;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no pairwise volume for edge {node} -> {neighbor}")]
    MissingVolumeData { node: String, neighbor: String },
    #[error("no total volume for node {node}")]
    MissingTotalVolume { node: String },
    #[error("invalid volume {value} at node {node} (neighbor: {neighbor:?})")]
    InvalidVolume { node: String, neighbor: Option<String>, value: f64 },
    #[error("node {node} has {found} neighbors but its transition entry has {expected}")]
    DegreeMismatch { node: String, expected: usize, found: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
