//! Path reconstruction helpers.

use macadam_costing::TraversalCostCalculator;
use macadam_streets::{EdgeId, VertexId};

use crate::router::StreetRouter;

/// Reconstructs a forward path from a reverse search.
///
/// A router with `reverse_search` set and seeded at the destination
/// explores against travel direction while checking each edge in its
/// trip sense, and stores movement-oriented back-edges. The predecessor
/// chain at `vertex` therefore holds the trip's edges nearest-the-origin
/// first, each pointing the wrong way; flipping every back-edge to its
/// pair (`edge ^ 1`) yields the edges of the forward trip from `vertex`
/// to the search origin, in traversal order.
pub fn reverse_path<C: TraversalCostCalculator>(
    router: &StreetRouter<'_, C>,
    vertex: VertexId,
) -> Option<Vec<EdgeId>> {
    let mut state = router.best_state(vertex)?;
    let mut edges = Vec::new();
    loop {
        if let Some(edge) = state.back_edge {
            edges.push(edge ^ 1);
        }
        match router.predecessor_of(state) {
            Some(previous) => state = previous,
            None => break,
        }
    }
    Some(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UNREACHED;
    use crate::StreetRouter;
    use macadam_costing::{BasicTraversalCalculator, ProfileRequest};
    use macadam_streets::{EdgeFlag, EdgeRecord, HighwayClass, Mode, StreetLayer};

    /// A two-edge walkable corridor: 0 - 1 - 2.
    fn corridor() -> StreetLayer {
        let mut layer = StreetLayer::new();
        for i in 0..3 {
            layer.add_vertex(0.0, f64::from(i) * 0.0045).unwrap();
        }
        let walkable = EdgeFlag::AllowsPedestrian | EdgeFlag::Linkable;
        for (from, to) in [(0u32, 1u32), (1, 2)] {
            layer
                .add_street_edge(EdgeRecord {
                    from_vertex: from,
                    to_vertex: to,
                    length_mm: 500_000,
                    way_id: -1,
                    highway_class: HighwayClass::Residential,
                    forward_flags: walkable,
                    backward_flags: walkable,
                    forward_speed_kmh: 50.0,
                    backward_speed_kmh: 50.0,
                    geometry: Vec::new(),
                })
                .unwrap();
        }
        layer
    }

    #[test]
    fn test_reverse_path_flips_a_backward_chain() {
        let layer = corridor();

        // Search backward from the trip's destination (vertex 2).
        let mut backward = StreetRouter::new(
            &layer,
            BasicTraversalCalculator::new(),
            ProfileRequest::default(),
            Mode::Walk,
        );
        backward.reverse_search = true;
        backward.set_origin_vertex(2);
        backward.route();
        assert_ne!(backward.travel_time_to_vertex(0), UNREACHED);

        // The backward chain at vertex 0 used the odd (reversed) edges;
        // flipping restores the forward trip 0 → 1 → 2.
        let forward_trip = reverse_path(&backward, 0).unwrap();
        assert_eq!(forward_trip, vec![0, 2]);

        // Sanity: a forward search agrees.
        let mut forward = StreetRouter::new(
            &layer,
            BasicTraversalCalculator::new(),
            ProfileRequest::default(),
            Mode::Walk,
        );
        forward.set_origin_vertex(0);
        forward.route();
        assert_eq!(forward.path_to_vertex(2), Some(vec![0, 2]));
    }

    #[test]
    fn test_reverse_search_honors_one_way_permissions() {
        // A single one-way edge 0 -> 1: only the forward direction is
        // walkable.
        let mut layer = StreetLayer::new();
        layer.add_vertex(0.0, 0.0).unwrap();
        layer.add_vertex(0.0, 0.0045).unwrap();
        let walkable = EdgeFlag::AllowsPedestrian | EdgeFlag::Linkable;
        layer
            .add_street_edge(EdgeRecord {
                from_vertex: 0,
                to_vertex: 1,
                length_mm: 500_000,
                way_id: -1,
                highway_class: HighwayClass::Residential,
                forward_flags: walkable,
                backward_flags: EdgeFlag::Linkable.into(),
                forward_speed_kmh: 50.0,
                backward_speed_kmh: 50.0,
                geometry: Vec::new(),
            })
            .unwrap();

        // A plain search seeded at the destination cannot leave it: the
        // only outgoing edge is the unpermitted reverse direction.
        let mut plain = StreetRouter::new(
            &layer,
            BasicTraversalCalculator::new(),
            ProfileRequest::default(),
            Mode::Walk,
        );
        plain.set_origin_vertex(1);
        plain.route();
        assert_eq!(plain.travel_time_to_vertex(0), UNREACHED);

        // The reverse search checks the trip-sense edge instead and
        // discovers the origin; the flipped chain is the forward trip.
        let mut backward = StreetRouter::new(
            &layer,
            BasicTraversalCalculator::new(),
            ProfileRequest::default(),
            Mode::Walk,
        );
        backward.reverse_search = true;
        backward.set_origin_vertex(1);
        backward.route();
        // 500 m at the default 1.3 m/s walk speed.
        assert_eq!(backward.travel_time_to_vertex(0), 385);
        assert_eq!(reverse_path(&backward, 0), Some(vec![0]));
    }
}
