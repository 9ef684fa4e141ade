use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};

use macadam_costing::{ProfileRequest, TraversalCostCalculator};
use macadam_streets::{
    EdgeId, Mode, RestrictionId, Split, StreetLayer, TransitStopLayer, VertexFlag, VertexId,
    LINK_RADIUS_METERS,
};
use tracing::debug;

use crate::state::{DominanceVariable, RoutingState, UNREACHED};
use crate::visitor::RoutingVisitor;

/// `MinScored` pairs a weight with an arena index and compares in reverse
/// order, turning `BinaryHeap` into a min-queue.
#[derive(Copy, Clone, PartialEq, Eq)]
struct MinScored(u32, u32);

impl PartialOrd for MinScored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinScored {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0).then_with(|| other.1.cmp(&self.1))
    }
}

/// A seed for re-basing a search on another search's frontier
/// (bike-share pickup, park-and-ride).
#[derive(Debug, Clone, Copy)]
pub struct OriginState {
    pub vertex: VertexId,
    pub weight: u32,
    pub duration_s: u32,
    pub distance_mm: u32,
}

/// Signals that a traversal would complete a prohibited sequence.
struct Prohibited;

/// A mutable per-query label-setting search.
///
/// The router holds thread-local state only; the layer and calculator it
/// borrows are shared immutably. Weights are in the dominance variable's
/// unit (seconds or millimeters).
pub struct StreetRouter<'a, C> {
    layer: &'a StreetLayer,
    calculator: C,
    pub request: ProfileRequest,
    mode: Mode,
    pub dominance: DominanceVariable,
    /// When set, the search runs against travel direction: successors
    /// come from incoming edges, and each edge's permission and speed
    /// are taken in its trip sense, so one-way streets resolve the way
    /// the eventual forward trip will traverse them. Back-edges are
    /// stored movement-oriented; [`crate::reverse_path`] flips them.
    pub reverse_search: bool,
    pub time_limit_s: Option<u32>,
    pub distance_limit_m: Option<u32>,
    pub to_vertex: Option<VertexId>,
    visitor: Option<Box<dyn RoutingVisitor + 'a>>,
    states: Vec<RoutingState>,
    best: HashMap<VertexId, u32>,
    queue: BinaryHeap<MinScored>,
    origin_split: Option<Split>,
}

impl<'a, C: TraversalCostCalculator> StreetRouter<'a, C> {
    pub fn new(layer: &'a StreetLayer, calculator: C, request: ProfileRequest, mode: Mode) -> Self {
        Self {
            layer,
            calculator,
            request,
            mode,
            dominance: DominanceVariable::default(),
            reverse_search: false,
            time_limit_s: None,
            distance_limit_m: None,
            to_vertex: None,
            visitor: None,
            states: Vec::new(),
            best: HashMap::new(),
            queue: BinaryHeap::new(),
            origin_split: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_visitor(&mut self, visitor: impl RoutingVisitor + 'a) {
        self.visitor = Some(Box::new(visitor));
    }

    /// Seeds the search from a coordinate projected onto the network.
    /// Two states are enqueued, one per endpoint of the split edge,
    /// pre-charged with the partial-edge distances. Returns `false` when
    /// nothing linkable lies within the radius.
    #[allow(clippy::cast_sign_loss)]
    pub fn set_origin(&mut self, lat: f64, lon: f64) -> bool {
        let Some(split) = Split::find(self.layer, lat, lon, LINK_RADIUS_METERS, self.mode) else {
            return false;
        };
        let pair = split.edge >> 1;
        let edges = self.layer.edge_store();
        for (vertex, distance_mm) in [
            (edges.pair_from_vertex(pair), split.distance0_mm as u32),
            (edges.pair_to_vertex(pair), split.distance1_mm as u32),
        ] {
            let state = RoutingState::origin(
                vertex,
                self.mode,
                self.seed_weight(distance_mm),
                distance_mm / 1000,
                distance_mm,
            );
            self.enqueue(state);
        }
        self.origin_split = Some(split);
        true
    }

    /// Seeds the search at a single vertex with zero weight.
    pub fn set_origin_vertex(&mut self, vertex: VertexId) -> bool {
        if !self.layer.vertex_store().contains(vertex) {
            return false;
        }
        self.enqueue(RoutingState::origin(vertex, self.mode, 0, 0, 0));
        true
    }

    /// Seeds the search from another search's frontier, charging the mode
    /// switch to every entry.
    pub fn set_origin_states(
        &mut self,
        frontier: &[OriginState],
        switch_time_s: u32,
        switch_cost: u32,
    ) {
        for entry in frontier {
            let state = RoutingState::origin(
                entry.vertex,
                self.mode,
                entry.weight.saturating_add(switch_cost),
                entry.duration_s.saturating_add(switch_time_s),
                entry.distance_mm,
            );
            self.enqueue(state);
        }
    }

    fn seed_weight(&self, distance_mm: u32) -> u32 {
        match self.dominance {
            DominanceVariable::DurationSeconds => distance_mm / 1000,
            DominanceVariable::DistanceMillimeters => distance_mm,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn enqueue(&mut self, state: RoutingState) {
        let index = self.states.len() as u32;
        self.queue.push(MinScored(state.weight, index));
        self.states.push(state);
    }

    /// Runs the search to exhaustion (or until the destination vertex,
    /// a limit, or the visitor stops it).
    pub fn route(&mut self) {
        let mut settled = 0u32;
        while let Some(MinScored(_, index)) = self.queue.pop() {
            if self.exceeds_limit(index) {
                continue;
            }
            if !self.record_best(index) {
                continue;
            }
            settled += 1;

            let vertex = self.states[index as usize].vertex;
            if let Some(visitor) = self.visitor.as_mut() {
                visitor.visit_vertex(&self.states[index as usize]);
                if visitor.should_break_search() {
                    break;
                }
            }
            if self.to_vertex == Some(vertex) {
                break;
            }

            let neighbors: Vec<EdgeId> = if self.reverse_search {
                self.layer.incoming_edges(vertex).collect()
            } else {
                self.layer.outgoing_edges(vertex).collect()
            };
            for edge in neighbors {
                let next = if self.reverse_search {
                    self.traverse_reverse(index, edge)
                } else {
                    self.traverse(index, edge)
                };
                if let Some(next) = next {
                    self.enqueue(next);
                }
            }
        }
        debug!(settled, states = self.states.len(), "search finished");
    }

    fn exceeds_limit(&self, index: u32) -> bool {
        let state = &self.states[index as usize];
        match self.dominance {
            DominanceVariable::DurationSeconds => self
                .time_limit_s
                .is_some_and(|limit| state.duration_s > limit),
            DominanceVariable::DistanceMillimeters => self
                .distance_limit_m
                .is_some_and(|limit| state.distance_mm / 1000 > limit),
        }
    }

    /// Records a popped state as best for its vertex. States popped later
    /// with the same turn-restriction context are dominated (the queue
    /// pops by non-decreasing weight); a different context is appended to
    /// the co-dominant chain and survives for expansion.
    fn record_best(&mut self, index: u32) -> bool {
        let vertex = self.states[index as usize].vertex;
        match self.best.entry(vertex) {
            Entry::Vacant(slot) => {
                slot.insert(index);
                true
            }
            Entry::Occupied(slot) => {
                let mut cursor = *slot.get();
                loop {
                    if self.states[cursor as usize]
                        .same_restriction_context(&self.states[index as usize])
                    {
                        return false;
                    }
                    match self.states[cursor as usize].next_codominant {
                        Some(next) => cursor = next,
                        None => break,
                    }
                }
                self.states[cursor as usize].next_codominant = Some(index);
                true
            }
        }
    }

    /// Builds the successor state for taking `edge`, or `None` when the
    /// mode is not permitted, a car would double straight back along the
    /// pair just traversed, or a turn restriction forbids it.
    #[allow(clippy::cast_sign_loss)]
    fn traverse(&self, parent_index: u32, edge: EdgeId) -> Option<RoutingState> {
        let cursor = self.layer.edge_cursor(edge);
        if !cursor.allows(self.mode) {
            return None;
        }

        let parent = &self.states[parent_index as usize];
        if self.mode == Mode::Car && parent.back_edge == Some(edge ^ 1) {
            return None;
        }
        let progress = if self.mode == Mode::Car && !self.layer.restrictions().is_empty() {
            match self.propagate_restrictions(parent.restriction_progress.as_ref(), edge) {
                Ok(progress) => progress,
                Err(Prohibited) => return None,
            }
        } else {
            None
        };

        let turn_s = match parent.back_edge {
            Some(previous) => self.calculator.turn_time_seconds(
                &self.layer.edge_cursor(previous),
                &cursor,
                self.mode,
            ),
            None => 0,
        };
        let elapsed = parent.duration_s.saturating_add(turn_s);
        let traversal_s =
            self.calculator
                .traversal_time_seconds(&cursor, self.mode, &self.request, elapsed);

        let edge_length_mm = cursor.length_mm() as u32;
        let weight_step = match self.dominance {
            DominanceVariable::DurationSeconds => turn_s.saturating_add(traversal_s),
            DominanceVariable::DistanceMillimeters => edge_length_mm,
        };

        Some(RoutingState {
            vertex: cursor.to_vertex(),
            back_edge: Some(edge),
            weight: parent.weight.saturating_add(weight_step),
            duration_s: elapsed.saturating_add(traversal_s),
            distance_mm: parent.distance_mm.saturating_add(edge_length_mm),
            mode: self.mode,
            restriction_progress: progress,
            predecessor: Some(parent_index),
            next_codominant: None,
        })
    }

    /// Builds the successor state for arriving through `trip_edge` in a
    /// reverse search. `trip_edge` points into the settled vertex, i.e.
    /// it is the edge the forward trip will traverse, so permission,
    /// speed, and length come from it directly. The stored back-edge is
    /// its movement-oriented pair, which keeps the predecessor chain
    /// shaped like a forward search over flipped edges.
    #[allow(clippy::cast_sign_loss)]
    fn traverse_reverse(&self, parent_index: u32, trip_edge: EdgeId) -> Option<RoutingState> {
        let cursor = self.layer.edge_cursor(trip_edge);
        if !cursor.allows(self.mode) {
            return None;
        }

        let parent = &self.states[parent_index as usize];
        let movement_edge = trip_edge ^ 1;
        if self.mode == Mode::Car && parent.back_edge == Some(movement_edge ^ 1) {
            return None;
        }

        let progress = if self.mode == Mode::Car && !self.layer.restrictions().is_empty() {
            match self.propagate_restrictions_reverse(parent.restriction_progress.as_ref(), trip_edge)
            {
                Ok(progress) => progress,
                Err(Prohibited) => return None,
            }
        } else {
            None
        };

        // In trip order the movement runs `trip_edge`, then the edge the
        // parent state arrived through.
        let turn_s = match parent.back_edge {
            Some(previous) => self.calculator.turn_time_seconds(
                &cursor,
                &self.layer.edge_cursor(previous ^ 1),
                self.mode,
            ),
            None => 0,
        };
        let elapsed = parent.duration_s.saturating_add(turn_s);
        let traversal_s =
            self.calculator
                .traversal_time_seconds(&cursor, self.mode, &self.request, elapsed);

        let edge_length_mm = cursor.length_mm() as u32;
        let weight_step = match self.dominance {
            DominanceVariable::DurationSeconds => turn_s.saturating_add(traversal_s),
            DominanceVariable::DistanceMillimeters => edge_length_mm,
        };

        Some(RoutingState {
            vertex: cursor.from_vertex(),
            back_edge: Some(movement_edge),
            weight: parent.weight.saturating_add(weight_step),
            duration_s: elapsed.saturating_add(traversal_s),
            distance_mm: parent.distance_mm.saturating_add(edge_length_mm),
            mode: self.mode,
            restriction_progress: progress,
            predecessor: Some(parent_index),
            next_codominant: None,
        })
    }

    /// Advances every active restriction across `edge`, rejecting the
    /// traversal when one completes, dropping diverged ones, and
    /// activating restrictions whose sequence begins with `edge`.
    fn propagate_restrictions(
        &self,
        progress: Option<&HashMap<RestrictionId, u8>>,
        onto: EdgeId,
    ) -> Result<Option<HashMap<RestrictionId, u8>>, Prohibited> {
        let table = self.layer.restrictions();
        let mut next: HashMap<RestrictionId, u8> = HashMap::new();

        if let Some(active) = progress {
            for (&restriction, &count) in active {
                let sequence = table.get(restriction).edges();
                if sequence[count as usize] == onto {
                    if count as usize + 1 == sequence.len() {
                        return Err(Prohibited);
                    }
                    next.insert(restriction, count + 1);
                }
            }
        }
        for restriction in table.starting_at(onto) {
            next.entry(restriction).or_insert(1);
        }

        Ok(if next.is_empty() { None } else { Some(next) })
    }

    /// Mirror of [`Self::propagate_restrictions`] for reverse searches:
    /// sequences are matched back to front, activating on their final
    /// edge and prohibiting the traversal that would reach their first.
    fn propagate_restrictions_reverse(
        &self,
        progress: Option<&HashMap<RestrictionId, u8>>,
        trip_edge: EdgeId,
    ) -> Result<Option<HashMap<RestrictionId, u8>>, Prohibited> {
        let table = self.layer.restrictions();
        let mut next: HashMap<RestrictionId, u8> = HashMap::new();

        if let Some(active) = progress {
            for (&restriction, &count) in active {
                let sequence = table.get(restriction).edges();
                if sequence[sequence.len() - 1 - count as usize] == trip_edge {
                    if count as usize + 1 == sequence.len() {
                        return Err(Prohibited);
                    }
                    next.insert(restriction, count + 1);
                }
            }
        }
        for restriction in table.ending_at(trip_edge) {
            next.entry(restriction).or_insert(1);
        }

        Ok(if next.is_empty() { None } else { Some(next) })
    }

    // Result accessors.

    /// Every settled vertex and the weight of its best state.
    pub fn reached_vertices(&self) -> HashMap<VertexId, u32> {
        self.best
            .iter()
            .map(|(&vertex, &index)| (vertex, self.states[index as usize].weight))
            .collect()
    }

    /// Settled vertices translated to transit stop indexes.
    pub fn reached_stops(&self, transit: &TransitStopLayer) -> HashMap<u32, u32> {
        self.best
            .iter()
            .filter_map(|(&vertex, &index)| {
                transit
                    .stop_at_vertex(vertex)
                    .map(|stop| (stop, self.states[index as usize].weight))
            })
            .collect()
    }

    /// Settled vertices flagged as bike-share stations.
    pub fn reached_bike_shares(&self) -> HashMap<VertexId, u32> {
        self.best
            .iter()
            .filter(|&(&vertex, _)| {
                self.layer
                    .vertex_store()
                    .has_flag(vertex, VertexFlag::BikeSharing)
            })
            .map(|(&vertex, &index)| (vertex, self.states[index as usize].weight))
            .collect()
    }

    /// The best weight at a vertex, or [`UNREACHED`].
    pub fn travel_time_to_vertex(&self, vertex: VertexId) -> u32 {
        self.best
            .get(&vertex)
            .map_or(UNREACHED, |&index| self.states[index as usize].weight)
    }

    /// The head of the co-dominant chain at a vertex.
    pub fn best_state(&self, vertex: VertexId) -> Option<&RoutingState> {
        self.best
            .get(&vertex)
            .map(|&index| &self.states[index as usize])
    }

    /// The better of the two endpoint states of a split edge, charging
    /// each endpoint with its partial-edge distance.
    #[allow(clippy::cast_sign_loss)]
    pub fn state_at_split(&self, split: &Split) -> Option<&RoutingState> {
        let pair = split.edge >> 1;
        let edges = self.layer.edge_store();
        let candidates = [
            (edges.pair_from_vertex(pair), split.distance0_mm as u32),
            (edges.pair_to_vertex(pair), split.distance1_mm as u32),
        ];
        candidates
            .iter()
            .filter_map(|&(vertex, distance_mm)| {
                let index = *self.best.get(&vertex)?;
                let total = self.states[index as usize]
                    .weight
                    .saturating_add(self.seed_weight(distance_mm));
                Some((total, index))
            })
            .min_by_key(|&(total, _)| total)
            .map(|(_, index)| &self.states[index as usize])
    }

    /// The split the origin coordinate landed on, if one was used.
    pub fn origin_split(&self) -> Option<&Split> {
        self.origin_split.as_ref()
    }

    /// The settled frontier, for seeding a follow-up search in another
    /// mode.
    pub fn frontier(&self) -> Vec<OriginState> {
        self.best
            .iter()
            .map(|(&vertex, &index)| {
                let state = &self.states[index as usize];
                OriginState {
                    vertex,
                    weight: state.weight,
                    duration_s: state.duration_s,
                    distance_mm: state.distance_mm,
                }
            })
            .collect()
    }

    /// Edge ids of the best path from the origin to `vertex`, in
    /// traversal order.
    pub fn path_to_vertex(&self, vertex: VertexId) -> Option<Vec<EdgeId>> {
        let mut state = self.best_state(vertex)?;
        let mut edges = Vec::new();
        loop {
            if let Some(edge) = state.back_edge {
                edges.push(edge);
            }
            match state.predecessor {
                Some(previous) => state = &self.states[previous as usize],
                None => break,
            }
        }
        edges.reverse();
        Some(edges)
    }

    pub(crate) fn arena_state(&self, index: u32) -> &RoutingState {
        &self.states[index as usize]
    }

    pub(crate) fn predecessor_of(&self, state: &RoutingState) -> Option<&RoutingState> {
        state.predecessor.map(|index| self.arena_state(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macadam_costing::BasicTraversalCalculator;
    use macadam_streets::{EdgeFlag, EdgeRecord, HighwayClass};

    fn record(from: VertexId, to: VertexId, length_mm: i64) -> EdgeRecord {
        let flags = EdgeFlag::AllowsPedestrian
            | EdgeFlag::AllowsCar
            | EdgeFlag::Linkable;
        EdgeRecord {
            from_vertex: from,
            to_vertex: to,
            length_mm,
            way_id: -1,
            highway_class: HighwayClass::Residential,
            forward_flags: flags,
            backward_flags: flags,
            forward_speed_kmh: 36.0,
            backward_speed_kmh: 36.0,
            geometry: Vec::new(),
        }
    }

    /// A 1 km two-edge corridor: 0 -(500m)- 1 -(500m)- 2.
    fn corridor() -> StreetLayer {
        let mut layer = StreetLayer::new();
        for i in 0..3 {
            layer.add_vertex(0.0, f64::from(i) * 0.0045).unwrap();
        }
        layer.add_street_edge(record(0, 1, 500_000)).unwrap();
        layer.add_street_edge(record(1, 2, 500_000)).unwrap();
        layer
    }

    fn walk_router(layer: &StreetLayer) -> StreetRouter<'_, BasicTraversalCalculator> {
        StreetRouter::new(
            layer,
            BasicTraversalCalculator::new(),
            ProfileRequest::default(),
            Mode::Walk,
        )
    }

    #[test]
    fn test_route_from_vertex_walk() {
        let layer = corridor();
        let mut router = walk_router(&layer);
        assert!(router.set_origin_vertex(0));
        router.route();

        // 500 m at 1.3 m/s is 385 s per edge.
        assert_eq!(router.travel_time_to_vertex(0), 0);
        assert_eq!(router.travel_time_to_vertex(1), 385);
        assert_eq!(router.travel_time_to_vertex(2), 770);
        assert_eq!(router.reached_vertices().len(), 3);
        assert_eq!(router.path_to_vertex(2), Some(vec![0, 2]));
    }

    #[test]
    fn test_route_respects_direction_permissions() {
        let mut layer = StreetLayer::new();
        for i in 0..2 {
            layer.add_vertex(0.0, f64::from(i) * 0.0045).unwrap();
        }
        let mut one_way = record(0, 1, 500_000);
        one_way.backward_flags = EdgeFlag::Linkable.into();
        layer.add_street_edge(one_way).unwrap();

        let mut forward = walk_router(&layer);
        forward.set_origin_vertex(0);
        forward.route();
        assert_eq!(forward.travel_time_to_vertex(1), 385);

        let mut backward = walk_router(&layer);
        backward.set_origin_vertex(1);
        backward.route();
        assert_eq!(backward.travel_time_to_vertex(0), UNREACHED);
    }

    #[test]
    fn test_time_limit_discards_states() {
        let layer = corridor();
        let mut router = walk_router(&layer);
        router.time_limit_s = Some(400);
        router.set_origin_vertex(0);
        router.route();

        assert_eq!(router.travel_time_to_vertex(1), 385);
        assert_eq!(router.travel_time_to_vertex(2), UNREACHED);
    }

    #[test]
    fn test_destination_terminates_search() {
        let layer = corridor();
        let mut router = walk_router(&layer);
        router.to_vertex = Some(1);
        router.set_origin_vertex(0);
        router.route();

        assert_eq!(router.travel_time_to_vertex(1), 385);
        // The far vertex was never settled.
        assert_eq!(router.travel_time_to_vertex(2), UNREACHED);
    }

    #[test]
    fn test_distance_dominance() {
        let layer = corridor();
        let mut router = walk_router(&layer);
        router.dominance = DominanceVariable::DistanceMillimeters;
        router.set_origin_vertex(0);
        router.route();

        assert_eq!(router.travel_time_to_vertex(2), 1_000_000);
        let state = router.best_state(2).unwrap();
        assert_eq!(state.distance_mm, 1_000_000);
        assert_eq!(state.duration_s, 770);
    }

    #[test]
    fn test_set_origin_seeds_both_endpoints() {
        let layer = corridor();
        let mut router = walk_router(&layer);
        // A quarter of the way along the first edge.
        assert!(router.set_origin(0.0001, 0.001_125));
        router.route();

        // 125 m to vertex 0, 375 m to vertex 1, in meters-as-seconds.
        assert_eq!(router.travel_time_to_vertex(0), 125);
        assert_eq!(router.travel_time_to_vertex(1), 375);

        // The near endpoint wins the split comparison: 125 + 125 beats
        // 375 + 375.
        let split = router.origin_split().cloned().unwrap();
        let state = router.state_at_split(&split).unwrap();
        assert_eq!(state.vertex, 0);
    }

    #[test]
    fn test_set_origin_fails_off_network() {
        let layer = corridor();
        let mut router = walk_router(&layer);
        assert!(!router.set_origin(40.0, 40.0));
    }

    #[test]
    fn test_visitor_cancellation() {
        struct StopAfter {
            remaining: u32,
        }
        impl RoutingVisitor for StopAfter {
            fn visit_vertex(&mut self, _state: &RoutingState) {
                self.remaining -= 1;
            }
            fn should_break_search(&self) -> bool {
                self.remaining == 0
            }
        }

        let layer = corridor();
        let mut router = walk_router(&layer);
        router.set_visitor(StopAfter { remaining: 2 });
        router.set_origin_vertex(0);
        router.route();

        // Only two vertices were settled before the visitor stopped it.
        assert_eq!(router.reached_vertices().len(), 2);
    }

    #[test]
    fn test_frontier_reseeding_charges_switch_costs() {
        let layer = corridor();
        let mut walk = walk_router(&layer);
        walk.set_origin_vertex(0);
        walk.route();

        let mut onward = StreetRouter::new(
            &layer,
            BasicTraversalCalculator::new(),
            ProfileRequest::default(),
            Mode::Car,
        );
        onward.set_origin_states(&walk.frontier(), 60, 60);
        onward.route();

        // Driving from the re-seeded vertex 0 (60 s of switch penalty,
        // then 50 s per 500 m edge) beats the pricier walk seeds.
        assert_eq!(onward.travel_time_to_vertex(0), 60);
        assert_eq!(onward.travel_time_to_vertex(1), 110);
        assert_eq!(onward.travel_time_to_vertex(2), 160);
    }
}
