//! Turn restriction storage.
//!
//! A restriction is an ordered sequence of directed edges; traversing the
//! sequence to its final edge is prohibited. Restrictions apply to the
//! CAR mode only. The table keeps two multimaps (first edge to
//! restriction id for activation, final edge to restriction id for
//! reverse searches), both stored as flat `(key, value)` pair streams so
//! the table serializes like the stores do.

use crate::EdgeId;

pub type RestrictionId = u16;

/// An ordered prohibition: entering `edges[0]` activates the restriction,
/// and following the whole sequence onto the last edge is forbidden.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TurnRestriction {
    edges: Vec<EdgeId>,
}

impl TurnRestriction {
    /// # Panics
    ///
    /// Panics when fewer than two edges are supplied; a restriction needs
    /// at least a from and a to edge.
    pub fn new(edges: Vec<EdgeId>) -> Self {
        assert!(edges.len() >= 2, "a restriction needs a from and a to edge");
        Self { edges }
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

#[derive(Debug, Clone, Default)]
pub struct TurnRestrictionTable {
    restrictions: Vec<TurnRestriction>,
    /// Sorted `(first_edge, restriction)` pairs.
    by_first_edge: Vec<(EdgeId, RestrictionId)>,
    /// Sorted `(final_edge, restriction)` pairs.
    by_final_edge: Vec<(EdgeId, RestrictionId)>,
}

impl TurnRestrictionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    pub fn get(&self, id: RestrictionId) -> &TurnRestriction {
        &self.restrictions[id as usize]
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn add(&mut self, restriction: TurnRestriction) -> RestrictionId {
        let id = self.restrictions.len() as RestrictionId;
        let first = restriction.edges[0];
        let last = restriction.edges[restriction.edges.len() - 1];
        self.restrictions.push(restriction);

        let slot = self.by_first_edge.partition_point(|&(e, _)| e < first);
        self.by_first_edge.insert(slot, (first, id));
        let slot = self.by_final_edge.partition_point(|&(e, _)| e < last);
        self.by_final_edge.insert(slot, (last, id));
        id
    }

    /// Restrictions whose sequence starts with `edge`.
    pub fn starting_at(&self, edge: EdgeId) -> impl Iterator<Item = RestrictionId> + '_ {
        lookup(&self.by_first_edge, edge)
    }

    /// Restrictions whose sequence ends with `edge`.
    pub fn ending_at(&self, edge: EdgeId) -> impl Iterator<Item = RestrictionId> + '_ {
        lookup(&self.by_final_edge, edge)
    }
}

fn lookup(pairs: &[(EdgeId, RestrictionId)], edge: EdgeId) -> impl Iterator<Item = RestrictionId> + '_ {
    let start = pairs.partition_point(|&(e, _)| e < edge);
    pairs[start..]
        .iter()
        .take_while(move |&&(e, _)| e == edge)
        .map(|&(_, id)| id)
}
