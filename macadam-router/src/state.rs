use std::collections::HashMap;

use macadam_streets::{EdgeId, Mode, RestrictionId, VertexId};

/// Sentinel weight for vertices the search never reached.
pub const UNREACHED: u32 = u32::MAX;

/// The scalar the router minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DominanceVariable {
    #[default]
    DurationSeconds,
    DistanceMillimeters,
}

/// One settled or queued label.
///
/// States form a tree through arena indices: `predecessor` points at the
/// state this one was expanded from, and `next_codominant` chains states
/// that reached the same vertex at the same cost but under different
/// turn-restriction contexts (all of them must survive for expansion).
#[derive(Debug, Clone)]
pub struct RoutingState {
    pub vertex: VertexId,
    /// The edge this state arrived through; `None` for origin states.
    pub back_edge: Option<EdgeId>,
    /// Cumulative dominance value.
    pub weight: u32,
    pub duration_s: u32,
    pub distance_mm: u32,
    pub mode: Mode,
    /// Progress through active turn restrictions: restriction id → number
    /// of sequence edges traversed so far. `None` when no restriction is
    /// active.
    pub restriction_progress: Option<HashMap<RestrictionId, u8>>,
    pub(crate) predecessor: Option<u32>,
    pub(crate) next_codominant: Option<u32>,
}

impl RoutingState {
    pub(crate) fn origin(vertex: VertexId, mode: Mode, weight: u32, duration_s: u32, distance_mm: u32) -> Self {
        Self {
            vertex,
            back_edge: None,
            weight,
            duration_s,
            distance_mm,
            mode,
            restriction_progress: None,
            predecessor: None,
            next_codominant: None,
        }
    }

    /// Whether two states carry the same turn-restriction context.
    pub(crate) fn same_restriction_context(&self, other: &RoutingState) -> bool {
        match (&self.restriction_progress, &other.restriction_progress) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
