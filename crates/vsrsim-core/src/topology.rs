//! Attachment graph: links between anchors of different bodies
//!
//! Links are indexed by their unordered anchor pair, with an adjacency index per anchor.
//! Both indices are only mutated together, so the graph is symmetric by construction.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AnchorId, BodyId};

/// Soft links behave like springs, rigid links keep anchors together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Soft,
    Rigid,
}

/// Undirected link between two anchors
///
/// A link has no direction: `Link::new(a, b, kind) == Link::new(b, a, kind)`. The endpoints
/// are stored ordered so that `source < target`, which makes the pair usable as an index key;
/// `source` says nothing about which side requested the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: AnchorId,
    pub target: AnchorId,
    pub kind: LinkType,
}

impl Link {
    pub fn new(a: AnchorId, b: AnchorId, kind: LinkType) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source,
            target,
            kind,
        }
    }

    /// The endpoint opposite to `anchor`, if `anchor` is one of the endpoints
    pub fn other(&self, anchor: AnchorId) -> Option<AnchorId> {
        if self.source == anchor {
            Some(self.target)
        } else if self.target == anchor {
            Some(self.source)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("cannot link {0} and {1}: same body")]
    SameBody(AnchorId, AnchorId),
    #[error("{0} and {1} are already linked")]
    AlreadyLinked(AnchorId, AnchorId),
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentGraph {
    links: BTreeMap<(AnchorId, AnchorId), LinkType>,
    adjacency: BTreeMap<AnchorId, BTreeSet<AnchorId>>,
}

fn key(a: AnchorId, b: AnchorId) -> (AnchorId, AnchorId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl AttachmentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn link(&mut self, a: AnchorId, b: AnchorId, kind: LinkType) -> Result<Link, TopologyError> {
        if a.body == b.body {
            return Err(TopologyError::SameBody(a, b));
        }
        let k = key(a, b);
        if self.links.contains_key(&k) {
            return Err(TopologyError::AlreadyLinked(k.0, k.1));
        }
        self.links.insert(k, kind);
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        log::trace!("AttachmentGraph: linked {} <-> {} ({:?})", a, b, kind);
        Ok(Link::new(a, b, kind))
    }

    /// Remove the link between `a` and `b`, returning it if it existed
    pub fn unlink(&mut self, a: AnchorId, b: AnchorId) -> Option<Link> {
        let kind = self.links.remove(&key(a, b))?;
        for (from, to) in [(a, b), (b, a)] {
            if let Some(set) = self.adjacency.get_mut(&from) {
                set.remove(&to);
                if set.is_empty() {
                    self.adjacency.remove(&from);
                }
            }
        }
        Some(Link::new(a, b, kind))
    }

    /// Remove every link incident to `anchor`; a no-op for unlinked anchors
    pub fn detach(&mut self, anchor: AnchorId) -> Vec<Link> {
        let partners: Vec<AnchorId> = self
            .adjacency
            .get(&anchor)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        partners
            .into_iter()
            .filter_map(|partner| self.unlink(anchor, partner))
            .collect()
    }

    pub fn link_between(&self, a: AnchorId, b: AnchorId) -> Option<Link> {
        self.links.get(&key(a, b)).map(|kind| Link::new(a, b, *kind))
    }

    pub fn links_of(&self, anchor: AnchorId) -> Vec<Link> {
        self.adjacency
            .get(&anchor)
            .into_iter()
            .flatten()
            .filter_map(|partner| self.link_between(anchor, *partner))
            .collect()
    }

    /// Partner anchors of `anchor`, in ascending order
    pub fn partners(&self, anchor: AnchorId) -> impl Iterator<Item = AnchorId> + '_ {
        self.adjacency.get(&anchor).into_iter().flatten().copied()
    }

    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.links.iter().map(|((a, b), kind)| Link::new(*a, *b, *kind))
    }

    /// Bodies linked to at least one of `anchors`, excluding the anchors' own bodies
    pub fn linked_bodies(&self, anchors: &[AnchorId]) -> BTreeSet<BodyId> {
        anchors
            .iter()
            .flat_map(|a| self.partners(*a))
            .map(|p| p.body)
            .filter(|body| anchors.iter().all(|a| a.body != *body))
            .collect()
    }

    pub fn is_anchored_to(&self, anchor: AnchorId, body: BodyId) -> bool {
        self.partners(anchor).any(|p| p.body == body)
    }

    /// Drop every link touching `body`
    pub fn remove_body(&mut self, body: BodyId) -> Vec<Link> {
        let anchors: Vec<AnchorId> = self
            .adjacency
            .keys()
            .filter(|a| a.body == body)
            .copied()
            .collect();
        anchors.into_iter().flat_map(|a| self.detach(a)).collect()
    }

    /// Fraction of `anchors` linked to the single body that accounts for the most of them
    ///
    /// Zero when `anchors` is empty or none of them is linked.
    pub fn side_attachment_ratio(&self, anchors: &[AnchorId]) -> f64 {
        if anchors.is_empty() {
            return 0.0;
        }
        let mut counts: BTreeMap<BodyId, usize> = BTreeMap::new();
        for anchor in anchors {
            let bodies: BTreeSet<BodyId> = self.partners(*anchor).map(|p| p.body).collect();
            for body in bodies {
                *counts.entry(body).or_default() += 1;
            }
        }
        let max = counts.values().copied().max().unwrap_or(0);
        max as f64 / anchors.len() as f64
    }

    /// Connected components of bodies under the link relation
    ///
    /// `bodies` is the number of bodies in the arena; each component lists its body ids
    /// in ascending order, components are ordered by their smallest id.
    pub fn assemblies(&self, bodies: usize) -> Vec<Vec<BodyId>> {
        let mut uf = UnionFind::<usize>::new(bodies);
        for (a, b) in self.links.keys() {
            if a.body.index() < bodies && b.body.index() < bodies {
                uf.union(a.body.index(), b.body.index());
            }
        }
        let mut groups: BTreeMap<usize, Vec<BodyId>> = BTreeMap::new();
        for i in 0..bodies {
            groups
                .entry(uf.find(i))
                .or_default()
                .push(BodyId::from_raw(i as u32));
        }
        let mut result: Vec<Vec<BodyId>> = groups.into_values().collect();
        result.sort_by_key(|g| g.first().copied());
        result
    }

    /// Every link is mirrored in the adjacency of both endpoints and vice versa
    pub fn is_consistent(&self) -> bool {
        let links_mirrored = self.links.keys().all(|(a, b)| {
            a.body != b.body
                && self.adjacency.get(a).is_some_and(|s| s.contains(b))
                && self.adjacency.get(b).is_some_and(|s| s.contains(a))
        });
        let adjacency_backed = self
            .adjacency
            .iter()
            .all(|(a, set)| set.iter().all(|b| self.links.contains_key(&key(*a, *b))));
        links_mirrored && adjacency_backed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn anchor(body: u32, index: u8) -> AnchorId {
        AnchorId::new(BodyId::from_raw(body), index)
    }

    #[test]
    fn test_link_is_symmetric() {
        let mut graph = AttachmentGraph::new();
        let link = graph.link(anchor(1, 0), anchor(0, 2), LinkType::Soft).unwrap();
        assert_eq!(link.source, anchor(0, 2));
        assert_eq!(graph.links_of(anchor(0, 2)).len(), 1);
        assert_eq!(graph.links_of(anchor(1, 0)).len(), 1);
        assert!(graph.is_anchored_to(anchor(1, 0), BodyId::from_raw(0)));
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_link_is_undirected() {
        let ab = Link::new(anchor(3, 1), anchor(2, 0), LinkType::Rigid);
        let ba = Link::new(anchor(2, 0), anchor(3, 1), LinkType::Rigid);
        assert_eq!(ab, ba);
        assert_eq!(ab.other(anchor(3, 1)), Some(anchor(2, 0)));
        assert_eq!(ab.other(anchor(2, 0)), Some(anchor(3, 1)));
        assert_eq!(ab.other(anchor(4, 0)), None);
    }

    #[test]
    fn test_link_rejects_same_body_and_duplicates() {
        let mut graph = AttachmentGraph::new();
        assert!(matches!(
            graph.link(anchor(0, 0), anchor(0, 1), LinkType::Rigid),
            Err(TopologyError::SameBody(..))
        ));
        graph.link(anchor(0, 0), anchor(1, 1), LinkType::Rigid).unwrap();
        assert!(matches!(
            graph.link(anchor(1, 1), anchor(0, 0), LinkType::Soft),
            Err(TopologyError::AlreadyLinked(..))
        ));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_detach_unlinked_is_noop() {
        let mut graph = AttachmentGraph::new();
        graph.link(anchor(0, 0), anchor(1, 1), LinkType::Soft).unwrap();
        assert!(graph.detach(anchor(2, 0)).is_empty());
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.detach(anchor(1, 1)).len(), 1);
        assert!(graph.is_empty());
        assert!(graph.detach(anchor(1, 1)).is_empty());
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_side_attachment_ratio() {
        let mut graph = AttachmentGraph::new();
        let side = [anchor(0, 0), anchor(0, 1)];
        assert_eq!(graph.side_attachment_ratio(&[]), 0.0);
        assert_eq!(graph.side_attachment_ratio(&side), 0.0);
        graph.link(anchor(0, 0), anchor(1, 3), LinkType::Soft).unwrap();
        assert_eq!(graph.side_attachment_ratio(&side), 0.5);
        graph.link(anchor(0, 1), anchor(2, 2), LinkType::Soft).unwrap();
        assert_eq!(graph.side_attachment_ratio(&side), 0.5);
        graph.link(anchor(0, 1), anchor(1, 2), LinkType::Soft).unwrap();
        assert_eq!(graph.side_attachment_ratio(&side), 1.0);
    }

    #[test]
    fn test_assemblies() {
        let mut graph = AttachmentGraph::new();
        graph.link(anchor(0, 0), anchor(2, 0), LinkType::Rigid).unwrap();
        graph.link(anchor(2, 1), anchor(3, 0), LinkType::Rigid).unwrap();
        let groups = graph.assemblies(4);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            vec![BodyId::from_raw(0), BodyId::from_raw(2), BodyId::from_raw(3)]
        );
        assert_eq!(groups[1], vec![BodyId::from_raw(1)]);
    }

    #[test]
    fn test_remove_body() {
        let mut graph = AttachmentGraph::new();
        graph.link(anchor(0, 0), anchor(1, 0), LinkType::Rigid).unwrap();
        graph.link(anchor(0, 1), anchor(1, 1), LinkType::Rigid).unwrap();
        graph.link(anchor(2, 0), anchor(1, 2), LinkType::Rigid).unwrap();
        assert_eq!(graph.remove_body(BodyId::from_raw(1)).len(), 3);
        assert!(graph.is_empty());
        assert!(graph.is_consistent());
    }

    proptest! {
        #[test]
        fn test_link_and_detach_keep_graph_consistent(
            ops in proptest::collection::vec((0u32..4, 0u8..4, 0u32..4, 0u8..4, any::<bool>()), 0..40)
        ) {
            let mut graph = AttachmentGraph::new();
            for (b1, i1, b2, i2, attach) in ops {
                let (a, b) = (anchor(b1, i1), anchor(b2, i2));
                if attach {
                    if graph.link(a, b, LinkType::Soft).is_ok() {
                        prop_assert!(graph.link_between(b, a).is_some());
                        prop_assert!(graph.partners(a).any(|p| p == b));
                        prop_assert!(graph.partners(b).any(|p| p == a));
                    }
                } else {
                    graph.detach(a);
                    prop_assert!(graph.links_of(a).is_empty());
                    prop_assert!(graph.links().all(|l| l.source != a && l.target != a));
                }
                prop_assert!(graph.is_consistent());
            }
        }

        #[test]
        fn test_side_attachment_ratio_in_unit_range(
            links in proptest::collection::vec((0u8..4, 1u32..5, 0u8..4), 0..16),
            side_len in 0usize..5,
        ) {
            let mut graph = AttachmentGraph::new();
            for (i, body, j) in links {
                let _ = graph.link(anchor(0, i), anchor(body, j), LinkType::Rigid);
            }
            let side: Vec<AnchorId> = (0..side_len as u8).map(|i| anchor(0, i)).collect();
            let ratio = graph.side_attachment_ratio(&side);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
