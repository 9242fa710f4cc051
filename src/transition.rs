//! Volume-normalized transition probabilities.
//!
//! A [`TransitionTable`] is the build phase of walk generation: it is computed once
//! from a [`GraphView`] and a [`VolumeIndex`] snapshot and never mutated afterwards.
//!
//! For a node `u` with neighbors `v_1..v_d` (in the graph's iteration order):
//!
//! - raw weight `w_i = between(u, v_i) / total(u)` when `total(u) > 0`, else `0`;
//! - `P(u -> v_i) = w_i / sum(w)`, or `1/d` for every `i` when `sum(w) == 0`.
//!
//! Nodes without neighbors get no entry.

use crate::graph::{GraphView, VolumeIndex};
use crate::sample::{Draw, SamplingMethod};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    probs: Box<[f64]>,
    pub(crate) draw: Draw,
}

impl Entry {
    pub(crate) fn len(&self) -> usize {
        self.probs.len()
    }
}

/// Immutable map from node to the transition distribution over its build-time neighbors.
#[derive(Debug, Clone)]
pub struct TransitionTable<N> {
    entries: HashMap<N, Entry>,
    method: SamplingMethod,
    uniform_fallbacks: usize,
}

impl<N: Clone + Eq + Hash + Debug> TransitionTable<N> {
    /// Build the table with [`SamplingMethod::Cdf`].
    pub fn build<G, V>(graph: &G, volumes: &V) -> Result<Self>
    where
        G: GraphView<Node = N>,
        V: VolumeIndex<N> + ?Sized,
    {
        Self::build_with(graph, volumes, SamplingMethod::default())
    }

    /// Build the table, preparing each distribution for `method`.
    ///
    /// Fails on the first missing or invalid volume; no partial table is returned.
    pub fn build_with<G, V>(graph: &G, volumes: &V, method: SamplingMethod) -> Result<Self>
    where
        G: GraphView<Node = N>,
        V: VolumeIndex<N> + ?Sized,
    {
        let nodes = graph.nodes();
        let mut entries = HashMap::with_capacity(nodes.len());
        let mut uniform_fallbacks = 0usize;
        let mut probs: Vec<f64> = Vec::new();

        for node in nodes {
            let nbrs = graph.neighbors(&node);
            if nbrs.is_empty() {
                continue;
            }

            let total = volumes
                .total(&node)
                .ok_or_else(|| Error::MissingTotalVolume { node: format!("{node:?}") })?;
            check_volume(total, &node, None)?;

            probs.clear();
            for nbr in nbrs.iter() {
                let between = volumes.between(&node, nbr).ok_or_else(|| {
                    Error::MissingVolumeData {
                        node: format!("{node:?}"),
                        neighbor: format!("{nbr:?}"),
                    }
                })?;
                check_volume(between, &node, Some(nbr))?;
                probs.push(if total > 0.0 { between / total } else { 0.0 });
            }

            let sum: f64 = probs.iter().sum();
            if sum > 0.0 && sum.is_finite() {
                for p in probs.iter_mut() {
                    *p /= sum;
                }
            } else {
                trace!(?node, degree = probs.len(), "zero transition mass, using uniform");
                uniform_fallbacks += 1;
                let u = 1.0 / probs.len() as f64;
                probs.fill(u);
            }

            let draw = Draw::new(&probs, method);
            entries.insert(node, Entry { probs: probs.as_slice().into(), draw });
        }

        debug!(
            entries = entries.len(),
            uniform_fallbacks,
            ?method,
            "built transition table"
        );
        Ok(Self { entries, method, uniform_fallbacks })
    }

    /// Transition probabilities of `node`, aligned with its build-time neighbor order.
    pub fn get(&self, node: &N) -> Option<&[f64]> {
        self.entries.get(node).map(|e| &*e.probs)
    }

    pub fn contains(&self, node: &N) -> bool {
        self.entries.contains_key(node)
    }

    pub(crate) fn entry(&self, node: &N) -> Option<&Entry> {
        self.entries.get(node)
    }

    /// Number of nodes with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(node, probabilities)` in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&N, &[f64])> + '_ {
        self.entries.iter().map(|(n, e)| (n, &*e.probs))
    }

    /// How many entries fell back to a uniform distribution because their volume summed to zero.
    pub fn uniform_fallbacks(&self) -> usize {
        self.uniform_fallbacks
    }

    pub fn method(&self) -> SamplingMethod {
        self.method
    }
}

fn check_volume<N: Debug>(value: f64, node: &N, neighbor: Option<&N>) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(Error::InvalidVolume {
        node: format!("{node:?}"),
        neighbor: neighbor.map(|n| format!("{n:?}")),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AdjacencyList, VolumeTable};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-12, "expected {b}, got {a}");
    }

    fn abc() -> (AdjacencyList<&'static str>, VolumeTable<&'static str>) {
        let g = AdjacencyList::from_undirected_edges([("A", "B"), ("A", "C")]);
        let v = VolumeTable::from_edges([("A", "B", 3.0), ("A", "C", 1.0)]);
        (g, v)
    }

    #[test]
    fn probabilities_follow_volume_share() {
        let (g, v) = abc();
        let t = TransitionTable::build(&g, &v).unwrap();
        let a = t.get(&"A").unwrap();
        assert_close(a[0], 0.75);
        assert_close(a[1], 0.25);
        assert_eq!(t.get(&"B").unwrap(), &[1.0]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.uniform_fallbacks(), 0);
    }

    #[test]
    fn zero_total_falls_back_to_uniform() {
        let (g, mut v) = abc();
        v.set_total("A", 0.0);
        let t = TransitionTable::build(&g, &v).unwrap();
        assert_eq!(t.get(&"A").unwrap(), &[0.5, 0.5]);
        assert_eq!(t.uniform_fallbacks(), 1);
    }

    #[test]
    fn zero_pairwise_volumes_fall_back_to_uniform() {
        let g = AdjacencyList::from_undirected_edges([(0u8, 1), (0, 2), (0, 3)]);
        let mut v = VolumeTable::from_edges([(0u8, 1, 0.0), (0, 2, 0.0), (0, 3, 0.0)]);
        v.set_total(0, 9.0);
        let t = TransitionTable::build(&g, &v).unwrap();
        for &p in t.get(&0).unwrap() {
            assert_close(p, 1.0 / 3.0);
        }
    }

    #[test]
    fn isolated_nodes_have_no_entry() {
        let (mut g, v) = abc();
        g.add_node("D");
        let t = TransitionTable::build(&g, &v).unwrap();
        assert!(!t.contains(&"D"));
        assert!(t.get(&"D").is_none());
    }

    #[test]
    fn missing_pairwise_volume_aborts_build() {
        let g = AdjacencyList::from_undirected_edges([("A", "B"), ("A", "C")]);
        let v = VolumeTable::from_edges([("A", "B", 3.0)]);
        match TransitionTable::build(&g, &v) {
            Err(Error::MissingVolumeData { node, neighbor }) => {
                assert_eq!(node, "\"A\"");
                assert_eq!(neighbor, "\"C\"");
            }
            other => panic!("expected MissingVolumeData, got {other:?}"),
        }
    }

    #[test]
    fn missing_total_aborts_build() {
        let g = AdjacencyList::from_undirected_edges([("A", "B")]);
        let mut v = VolumeTable::new();
        v.set_between("A", "B", 1.0);
        v.set_between("B", "A", 1.0);
        v.set_total("B", 1.0);
        assert!(matches!(
            TransitionTable::build(&g, &v),
            Err(Error::MissingTotalVolume { .. })
        ));
    }

    #[test]
    fn negative_volume_is_rejected() {
        let (g, mut v) = abc();
        v.set_between("A", "C", -1.0);
        assert!(matches!(
            TransitionTable::build(&g, &v),
            Err(Error::InvalidVolume { neighbor: Some(_), .. })
        ));
    }

    #[test]
    fn non_finite_total_is_rejected() {
        for bad in [f64::NAN, f64::INFINITY] {
            let (g, mut v) = abc();
            v.set_total("A", bad);
            match TransitionTable::build(&g, &v) {
                Err(Error::InvalidVolume { node, neighbor: None, value }) => {
                    assert_eq!(node, "\"A\"");
                    assert!(!value.is_finite());
                }
                other => panic!("expected InvalidVolume for {bad}, got {other:?}"),
            }
        }

        let (g, mut v) = abc();
        v.set_between("B", "A", f64::INFINITY);
        assert!(matches!(
            TransitionTable::build(&g, &v),
            Err(Error::InvalidVolume { neighbor: Some(_), .. })
        ));
    }

    #[test]
    fn build_is_idempotent_and_method_independent() {
        let (g, v) = abc();
        let a = TransitionTable::build(&g, &v).unwrap();
        let b = TransitionTable::build(&g, &v).unwrap();
        let c = TransitionTable::build_with(&g, &v, SamplingMethod::Alias).unwrap();
        assert_eq!(c.method(), SamplingMethod::Alias);
        for (node, probs) in a.iter() {
            assert_eq!(b.get(node), Some(probs));
            assert_eq!(c.get(node), Some(probs));
        }
    }
}
