//! The street layer: stores, spatial index, incidence lists, linking.
//!
//! A baseline layer is built once (import, stop linking, island pruning)
//! and then shared immutably across query threads. Scenario variants call
//! [`StreetLayer::scenario_copy`] to obtain a private extend-only overlay
//! which can split edges and add stops without mutating shared state.

use std::sync::Arc;

use enumset::EnumSet;
use tracing::debug;

use crate::column::PatchedList;
use crate::spatial_index::{FixedEnvelope, SpatialIndex};
use crate::split::Split;
use crate::store::{EdgeCursor, EdgeStore, VertexStore};
use crate::turn_restrictions::{RestrictionId, TurnRestriction, TurnRestrictionTable};
use crate::{EdgeFlag, EdgeId, HighwayClass, Mode, StoreError, VertexFlag, VertexId};

/// Search radius for projecting coordinates onto the graph.
pub const LINK_RADIUS_METERS: f64 = 300.0;

/// Splits landing closer than this to an existing endpoint snap to the
/// endpoint vertex instead of creating a splitter.
pub const SNAP_RADIUS_MM: i32 = 5000;

/// One row of the street graph build input.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EdgeRecord {
    pub from_vertex: VertexId,
    pub to_vertex: VertexId,
    pub length_mm: i64,
    pub way_id: i64,
    pub highway_class: HighwayClass,
    pub forward_flags: EnumSet<EdgeFlag>,
    pub backward_flags: EnumSet<EdgeFlag>,
    pub forward_speed_kmh: f32,
    pub backward_speed_kmh: f32,
    /// Intermediate fixed-degree points, endpoints excluded.
    pub geometry: Vec<(i32, i32)>,
}

/// The street network: vertices, paired edges, spatial index, per-vertex
/// incidence lists, and turn restrictions.
#[derive(Debug, Clone)]
pub struct StreetLayer {
    vertices: VertexStore,
    edges: EdgeStore,
    spatial: Arc<SpatialIndex>,
    restrictions: Arc<TurnRestrictionTable>,
    outgoing: PatchedList<Vec<EdgeId>>,
    incoming: PatchedList<Vec<EdgeId>>,
}

impl Default for StreetLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreetLayer {
    pub fn new() -> Self {
        Self {
            vertices: VertexStore::new(),
            edges: EdgeStore::new(),
            spatial: Arc::new(SpatialIndex::new()),
            restrictions: Arc::new(TurnRestrictionTable::new()),
            outgoing: PatchedList::new(),
            incoming: PatchedList::new(),
        }
    }

    /// A protective extend-only copy for scenario use. Every store column
    /// overlays the baseline by pointer; the spatial index and turn
    /// restriction table are shared as-is.
    pub fn scenario_copy(&self) -> StreetLayer {
        StreetLayer {
            vertices: self.vertices.extend_only_copy(),
            edges: self.edges.extend_only_copy(),
            spatial: Arc::clone(&self.spatial),
            restrictions: Arc::clone(&self.restrictions),
            outgoing: self.outgoing.extend_only_copy(),
            incoming: self.incoming.extend_only_copy(),
        }
    }

    pub fn vertex_store(&self) -> &VertexStore {
        &self.vertices
    }

    pub fn edge_store(&self) -> &EdgeStore {
        &self.edges
    }

    /// Build-phase mutable access to the edge columns (permission
    /// stripping, speed configuration). Overlay writes into the baseline
    /// range still fail.
    pub fn edge_store_mut(&mut self) -> &mut EdgeStore {
        &mut self.edges
    }

    pub fn restrictions(&self) -> &TurnRestrictionTable {
        &self.restrictions
    }

    pub fn add_turn_restriction(&mut self, restriction: TurnRestriction) -> RestrictionId {
        Arc::make_mut(&mut self.restrictions).add(restriction)
    }

    pub fn n_vertices(&self) -> u32 {
        self.vertices.n_vertices()
    }

    pub fn n_edges(&self) -> u32 {
        self.edges.n_edges()
    }

    /// Appends a vertex (and its empty incidence rows).
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCoordinate`] for non-finite input.
    pub fn add_vertex(&mut self, lat: f64, lon: f64) -> Result<VertexId, StoreError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(StoreError::InvalidCoordinate { lat, lon });
        }
        Ok(self.new_vertex_fixed(
            crate::geometry::degrees_to_fixed(lat),
            crate::geometry::degrees_to_fixed(lon),
        ))
    }

    /// Flags a vertex (traffic signal, park-and-ride, bike sharing).
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidVertex`] for an unknown vertex,
    /// [`StoreError::ImmutableBaselineViolation`] through an overlay.
    pub fn set_vertex_flag(&mut self, vertex: VertexId, flag: VertexFlag) -> Result<(), StoreError> {
        if !self.vertices.contains(vertex) {
            return Err(StoreError::InvalidVertex(vertex));
        }
        self.vertices.set_flag(vertex, flag)
    }

    fn new_vertex_fixed(&mut self, fixed_lat: i32, fixed_lon: i32) -> VertexId {
        let vertex = self.vertices.add_vertex_fixed(fixed_lat, fixed_lon);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        vertex
    }

    /// Adds one street edge pair from a build record.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidVertex`] for out-of-range endpoints,
    /// [`StoreError::InvalidGeometry`] for a non-positive or overflowing
    /// length.
    pub fn add_street_edge(&mut self, record: EdgeRecord) -> Result<EdgeId, StoreError> {
        if !self.vertices.contains(record.from_vertex) {
            return Err(StoreError::InvalidVertex(record.from_vertex));
        }
        if !self.vertices.contains(record.to_vertex) {
            return Err(StoreError::InvalidVertex(record.to_vertex));
        }
        if record.length_mm <= 0 {
            return Err(StoreError::InvalidGeometry(format!(
                "street edge length must be positive, got {} mm",
                record.length_mm
            )));
        }

        let mut packed = Vec::with_capacity(record.geometry.len() * 2);
        for (lat, lon) in &record.geometry {
            packed.push(*lat);
            packed.push(*lon);
        }

        let forward = self.edges.add_edge_pair(
            record.from_vertex,
            record.to_vertex,
            record.length_mm,
            record.way_id,
        )?;
        let pair = forward >> 1;
        self.edges.set_pair_highway_class(pair, record.highway_class)?;
        self.edges.set_pair_geometry(pair, packed)?;
        self.edges.set_speed_kmh(forward, record.forward_speed_kmh)?;
        self.edges.set_speed_kmh(forward ^ 1, record.backward_speed_kmh)?;
        self.edges.set_flags(forward, record.forward_flags)?;
        self.edges.set_flags(forward ^ 1, record.backward_flags)?;
        self.refresh_angles(forward)?;
        self.wire_new_pair(forward, record.from_vertex, record.to_vertex);
        Ok(forward)
    }

    /// Applies a stream of build records, dropping edges that permit no
    /// mode in either direction. Returns the number of pairs added.
    ///
    /// # Errors
    ///
    /// Propagates the first validation failure; earlier records stay
    /// applied.
    pub fn apply_build_input(
        &mut self,
        records: impl IntoIterator<Item = EdgeRecord>,
    ) -> Result<u32, StoreError> {
        let mut added = 0;
        let mut dropped = 0u32;
        for record in records {
            let permissions =
                (record.forward_flags | record.backward_flags) & crate::PERMISSION_FLAGS;
            if permissions.is_empty() {
                dropped += 1;
                continue;
            }
            self.add_street_edge(record)?;
            added += 1;
        }
        if dropped > 0 {
            debug!(dropped, added, "dropped street edges with no mode permission");
        }
        Ok(added)
    }

    /// Outgoing directed edges of a vertex, hiding overlay-deleted edges.
    pub fn outgoing_edges(&self, vertex: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.outgoing
            .get(vertex as usize)
            .iter()
            .copied()
            .filter(move |&edge| !self.edges.is_temporarily_deleted(edge))
    }

    /// Incoming directed edges of a vertex, hiding overlay-deleted edges.
    pub fn incoming_edges(&self, vertex: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.incoming
            .get(vertex as usize)
            .iter()
            .copied()
            .filter(move |&edge| !self.edges.is_temporarily_deleted(edge))
    }

    /// All directed edges touching a vertex, in either direction.
    pub fn incident_edges(&self, vertex: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.outgoing_edges(vertex).chain(self.incoming_edges(vertex))
    }

    pub fn edge_cursor(&self, edge: EdgeId) -> EdgeCursor<'_> {
        self.edges.cursor(&self.vertices, edge)
    }

    /// Forward edges whose envelope may intersect `envelope`: the shared
    /// spatial index result, minus overlay-deleted edges, plus this
    /// overlay's temporary edges. Sorted ascending.
    pub fn find_edges_in_envelope(&self, envelope: &FixedEnvelope) -> Vec<EdgeId> {
        let mut result: Vec<EdgeId> = self
            .spatial
            .query(envelope)
            .into_iter()
            .filter(|&edge| !self.edges.is_temporarily_deleted(edge))
            .collect();

        let first_modifiable = self.edges.first_modifiable_edge();
        if first_modifiable > 0 {
            for edge in (first_modifiable..self.edges.n_edges()).step_by(2) {
                if self.edge_cursor(edge).envelope().intersects(envelope) {
                    result.push(edge);
                }
            }
            result.sort_unstable();
            result.dedup();
        }
        result
    }

    /// Finds or creates a vertex for `(lat, lon)` on the street network.
    ///
    /// Projects within `radius_m`; snaps to an existing endpoint inside
    /// [`SNAP_RADIUS_MM`]; otherwise splits the edge at the projection,
    /// creating a splitter vertex. Splitting an immutable baseline edge
    /// through an overlay leaves the original pair untouched: two
    /// replacement pairs are appended and the original is hidden via the
    /// temporary-deletion set.
    ///
    /// Returns `Ok(None)` when no linkable edge lies within the radius.
    ///
    /// # Errors
    ///
    /// Store mutation failures indicate a programming error and abort the
    /// operation.
    pub fn get_or_create_vertex_near(
        &mut self,
        lat: f64,
        lon: f64,
        radius_m: f64,
        mode: Mode,
    ) -> Result<Option<VertexId>, StoreError> {
        let Some(split) = Split::find(self, lat, lon, radius_m, mode) else {
            return Ok(None);
        };
        let pair = split.edge >> 1;
        if split.distance0_mm < SNAP_RADIUS_MM {
            return Ok(Some(self.edges.pair_from_vertex(pair)));
        }
        if split.distance1_mm < SNAP_RADIUS_MM {
            return Ok(Some(self.edges.pair_to_vertex(pair)));
        }
        self.split_edge(&split).map(Some)
    }

    /// Creates a vertex at the exact coordinate and links it to the
    /// street network with a zero-length LINK edge pair permitting all
    /// modes. Used for transit stops. The vertex is created even when no
    /// street-side target exists; it is simply left unlinked.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCoordinate`] for non-finite input; store
    /// mutation failures indicate a programming error.
    pub fn create_and_link_vertex(&mut self, lat: f64, lon: f64) -> Result<VertexId, StoreError> {
        let stop_vertex = self.add_vertex(lat, lon)?;
        match self.get_or_create_vertex_near(lat, lon, LINK_RADIUS_METERS, Mode::Walk)? {
            Some(street_vertex) => {
                let link_flags = EdgeFlag::Link
                    | EdgeFlag::AllowsPedestrian
                    | EdgeFlag::AllowsBike
                    | EdgeFlag::AllowsCar;
                self.append_pair(
                    stop_vertex,
                    street_vertex,
                    0,
                    -1,
                    HighwayClass::Other,
                    [link_flags, link_flags],
                    [crate::DEFAULT_SPEED_KMH, crate::DEFAULT_SPEED_KMH],
                )?;
            }
            None => debug!(lat, lon, "no street within link radius, leaving vertex unlinked"),
        }
        Ok(stop_vertex)
    }

    /// Splits an edge at the given projection, returning the new splitter
    /// vertex.
    fn split_edge(&mut self, split: &Split) -> Result<VertexId, StoreError> {
        let pair = split.edge >> 1;
        let original_from = self.edges.pair_from_vertex(pair);
        let original_to = self.edges.pair_to_vertex(pair);
        let way_id = self.edges.pair_way_id(pair);
        let class = self.edges.pair_highway_class(pair);
        let flags = [self.edges.flags(split.edge), self.edges.flags(split.edge | 1)];
        let speeds_cms = [
            self.edges.speed_cms(split.edge),
            self.edges.speed_cms(split.edge | 1),
        ];

        let splitter = self.new_vertex_fixed(split.fixed_lat, split.fixed_lon);

        if split.edge >= self.edges.first_modifiable_edge() {
            // The pair is ours to mutate: shorten it up to the splitter
            // and append a pair covering the remainder.
            self.edges.set_pair_length_mm(pair, split.distance0_mm)?;
            self.edges.set_pair_to_vertex(pair, splitter)?;
            self.edges.set_pair_geometry(pair, Vec::new())?;
            self.outgoing.modify(original_to as usize, |list| {
                list.retain(|&e| e != (split.edge | 1));
            });
            self.incoming.modify(original_to as usize, |list| {
                list.retain(|&e| e != split.edge);
            });
            self.outgoing
                .modify(splitter as usize, |list| list.push(split.edge | 1));
            self.incoming
                .modify(splitter as usize, |list| list.push(split.edge));
            self.refresh_angles(split.edge)?;

            self.append_pair_cms(
                splitter,
                original_to,
                split.distance1_mm,
                way_id,
                class,
                flags,
                speeds_cms,
            )?;
        } else {
            // Immutable baseline edge: keep it untouched, append two
            // replacement pairs and hide the original from this overlay.
            self.append_pair_cms(
                original_from,
                splitter,
                split.distance0_mm,
                way_id,
                class,
                flags,
                speeds_cms,
            )?;
            self.append_pair_cms(
                splitter,
                original_to,
                split.distance1_mm,
                way_id,
                class,
                flags,
                speeds_cms,
            )?;
            self.edges.mark_temporarily_deleted(split.edge);
        }
        Ok(splitter)
    }

    fn append_pair(
        &mut self,
        from: VertexId,
        to: VertexId,
        length_mm: i32,
        way_id: i64,
        class: HighwayClass,
        flags: [EnumSet<EdgeFlag>; 2],
        speeds_kmh: [f32; 2],
    ) -> Result<EdgeId, StoreError> {
        let forward = self.edges.add_edge_pair(from, to, i64::from(length_mm), way_id)?;
        self.edges.set_pair_highway_class(forward >> 1, class)?;
        self.edges.set_flags(forward, flags[0])?;
        self.edges.set_flags(forward ^ 1, flags[1])?;
        self.edges.set_speed_kmh(forward, speeds_kmh[0])?;
        self.edges.set_speed_kmh(forward ^ 1, speeds_kmh[1])?;
        self.refresh_angles(forward)?;
        self.wire_new_pair(forward, from, to);
        Ok(forward)
    }

    fn append_pair_cms(
        &mut self,
        from: VertexId,
        to: VertexId,
        length_mm: i32,
        way_id: i64,
        class: HighwayClass,
        flags: [EnumSet<EdgeFlag>; 2],
        speeds_cms: [u16; 2],
    ) -> Result<EdgeId, StoreError> {
        let forward = self.edges.add_edge_pair(from, to, i64::from(length_mm), way_id)?;
        self.edges.set_pair_highway_class(forward >> 1, class)?;
        self.edges.set_flags(forward, flags[0])?;
        self.edges.set_flags(forward ^ 1, flags[1])?;
        self.edges.set_speed_cms(forward, speeds_cms[0])?;
        self.edges.set_speed_cms(forward ^ 1, speeds_cms[1])?;
        self.refresh_angles(forward)?;
        self.wire_new_pair(forward, from, to);
        Ok(forward)
    }

    /// Registers a freshly appended pair in the incidence lists and, on a
    /// baseline layer, in the spatial index. Overlay edges stay out of
    /// the shared index; queries discover them through the tail scan in
    /// [`StreetLayer::find_edges_in_envelope`].
    fn wire_new_pair(&mut self, forward: EdgeId, from: VertexId, to: VertexId) {
        self.outgoing.modify(from as usize, |list| list.push(forward));
        self.incoming.modify(to as usize, |list| list.push(forward));
        self.outgoing.modify(to as usize, |list| list.push(forward ^ 1));
        self.incoming.modify(from as usize, |list| list.push(forward ^ 1));

        let baseline = self.edges.first_modifiable_edge() == 0;
        if baseline && !self.edges.has_flag(forward, EdgeFlag::Link) {
            let envelope = self.edge_cursor(forward).envelope();
            Arc::make_mut(&mut self.spatial).insert(&envelope, forward);
        }
    }

    fn refresh_angles(&mut self, forward: EdgeId) -> Result<(), StoreError> {
        let pair = forward >> 1;
        let from = self.edges.pair_from_vertex(pair);
        let to = self.edges.pair_to_vertex(pair);
        let from_coord = (self.vertices.fixed_lat(from), self.vertices.fixed_lon(from));
        let to_coord = (self.vertices.fixed_lat(to), self.vertices.fixed_lon(to));
        self.edges.calculate_angles(forward, from_coord, to_coord)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A walk+car street record with LINKABLE set in both directions.
    pub(crate) fn street_record(from: VertexId, to: VertexId, length_mm: i64) -> EdgeRecord {
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
            forward_speed_kmh: 50.0,
            backward_speed_kmh: 50.0,
            geometry: Vec::new(),
        }
    }

    /// A rows × cols street grid with ~100 m spacing near the equator.
    pub(crate) fn grid_layer(rows: u32, cols: u32) -> StreetLayer {
        let mut layer = StreetLayer::new();
        for r in 0..rows {
            for c in 0..cols {
                layer
                    .add_vertex(f64::from(r) * 0.0009, f64::from(c) * 0.0009)
                    .unwrap();
            }
        }
        for r in 0..rows {
            for c in 0..cols {
                let v = r * cols + c;
                if c + 1 < cols {
                    layer.add_street_edge(street_record(v, v + 1, 100_000)).unwrap();
                }
                if r + 1 < rows {
                    layer
                        .add_street_edge(street_record(v, v + cols, 100_000))
                        .unwrap();
                }
            }
        }
        layer
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{grid_layer, street_record};
    use super::*;

    #[test]
    fn test_build_input_validation_and_dropping() {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.0009).unwrap();

        // A record with no permissions anywhere is dropped silently.
        let mut no_permission = street_record(a, b, 100_000);
        no_permission.forward_flags = EdgeFlag::Linkable.into();
        no_permission.backward_flags = EdgeFlag::Linkable.into();
        let added = layer
            .apply_build_input([street_record(a, b, 100_000), no_permission])
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(layer.n_edges(), 2);

        // Out-of-range endpoints fail loudly.
        assert_eq!(
            layer.apply_build_input([street_record(a, 99, 100_000)]),
            Err(StoreError::InvalidVertex(99))
        );
    }

    #[test]
    fn test_incidence_lists() {
        let layer = grid_layer(2, 2);
        // Vertex 0 has two outgoing forward edges and two incoming
        // backward edges.
        let outgoing: Vec<_> = layer.outgoing_edges(0).collect();
        let incoming: Vec<_> = layer.incoming_edges(0).collect();
        assert_eq!(outgoing.len(), 2);
        assert_eq!(incoming.len(), 2);
        for edge in outgoing {
            assert_eq!(layer.edge_cursor(edge).from_vertex(), 0);
        }
        for edge in incoming {
            assert_eq!(layer.edge_cursor(edge).to_vertex(), 0);
        }
    }

    #[test]
    fn test_stop_linking_splits_baseline_edge_in_place() {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.009).unwrap();
        let edge = layer.add_street_edge(street_record(a, b, 1_000_000)).unwrap();

        // A stop 11 m north of the halfway point.
        let stop = layer.create_and_link_vertex(0.0001, 0.0045).unwrap();

        // One stop vertex, one splitter.
        assert_eq!(layer.n_vertices(), 4);
        let splitter = 3;
        // Original pair shortened in place and retargeted.
        assert_eq!(layer.edge_store().pair_to_vertex(edge >> 1), splitter);
        let first_len = layer.edge_store().pair_length_mm(0);
        let second_len = layer.edge_store().pair_length_mm(1);
        assert_eq!(first_len + second_len, 1_000_000);
        assert!(layer.edge_store().pair_length_mm(2) == 0); // link pair

        // The link pair connects the stop and allows everything.
        let link: Vec<_> = layer.outgoing_edges(stop).collect();
        assert_eq!(link.len(), 1);
        let cursor = layer.edge_cursor(link[0]);
        assert!(cursor.has_flag(EdgeFlag::Link));
        assert_eq!(cursor.to_vertex(), splitter);
        assert!(cursor.allows(Mode::Walk) && cursor.allows(Mode::Car));

        // Splitter incidence covers both halves plus the link edge.
        assert_eq!(layer.incident_edges(splitter).count(), 6);
    }

    #[test]
    fn test_snap_to_existing_endpoint() {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.009).unwrap();
        layer.add_street_edge(street_record(a, b, 1_000_000)).unwrap();

        // 2 m from vertex a: snaps, no splitter created.
        let near_a = layer
            .get_or_create_vertex_near(0.0, 0.000_018, 300.0, Mode::Walk)
            .unwrap();
        assert_eq!(near_a, Some(a));
        assert_eq!(layer.n_vertices(), 2);
        assert_eq!(layer.n_edges(), 2);
    }

    #[test]
    fn test_overlay_split_preserves_baseline() {
        let mut base = StreetLayer::new();
        let a = base.add_vertex(0.0, 0.0).unwrap();
        let b = base.add_vertex(0.0, 0.009).unwrap();
        let edge = base.add_street_edge(street_record(a, b, 1_000_000)).unwrap();

        let mut overlay = base.scenario_copy();
        let splitter = overlay
            .get_or_create_vertex_near(0.0001, 0.0045, 300.0, Mode::Walk)
            .unwrap()
            .expect("split should land on the baseline edge");

        // Baseline is untouched.
        assert_eq!(base.n_vertices(), 2);
        assert_eq!(base.n_edges(), 2);
        assert_eq!(base.edge_store().pair_length_mm(0), 1_000_000);
        assert_eq!(base.edge_store().pair_to_vertex(0), b);
        assert!(base.edge_store().temporarily_deleted_edges().is_empty());

        // The overlay hides the original and carries two replacements.
        assert!(overlay.edge_store().is_temporarily_deleted(edge));
        assert_eq!(overlay.n_edges(), 6);
        let replacement_total: i32 = [1, 2]
            .iter()
            .map(|&pair| overlay.edge_store().pair_length_mm(pair))
            .sum();
        assert_eq!(replacement_total, 1_000_000);

        // Overlay incidence reflects the rewiring; the hidden edge no
        // longer shows up.
        assert!(overlay.outgoing_edges(a).all(|e| e != edge));
        assert!(overlay.incident_edges(splitter).count() >= 4);

        // Envelope queries surface the temporary edges and drop the
        // hidden one.
        let envelope = FixedEnvelope::around(0, 45_000, 600.0);
        let baseline_hits = base.find_edges_in_envelope(&envelope);
        assert_eq!(baseline_hits, vec![edge]);
        let overlay_hits = overlay.find_edges_in_envelope(&envelope);
        assert!(!overlay_hits.contains(&edge));
        assert_eq!(overlay_hits, vec![2, 4]);
    }

    #[test]
    fn test_overlay_vertex_flag_rejected_on_baseline_vertex() {
        let mut base = StreetLayer::new();
        let a = base.add_vertex(0.0, 0.0).unwrap();
        let mut overlay = base.scenario_copy();
        assert_eq!(
            overlay.set_vertex_flag(a, VertexFlag::BikeSharing),
            Err(StoreError::ImmutableBaselineViolation(0))
        );
    }

    #[test]
    fn test_unlinked_stop_still_creates_vertex() {
        let mut layer = StreetLayer::new();
        let stop = layer.create_and_link_vertex(10.0, 10.0).unwrap();
        assert_eq!(layer.n_vertices(), 1);
        assert_eq!(layer.outgoing_edges(stop).count(), 0);
    }
}
