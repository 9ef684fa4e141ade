use std::collections::HashSet;

use enumset::EnumSet;
use itertools::Itertools;

use crate::column::SpliceList;
use crate::geometry;
use crate::spatial_index::FixedEnvelope;
use crate::store::VertexStore;
use crate::{EdgeFlag, EdgeId, HighwayClass, Mode, StoreError};

/// Initial traversal speed assigned to freshly created edge pairs.
pub const DEFAULT_SPEED_KMH: f32 = 50.0;

const CMS_PER_KMH: f32 = 1000.0 / 36.0;

/// Columnar storage for directed edges, created and addressed in pairs.
///
/// The forward edge of a pair sits at an even index, the backward edge at
/// the following odd index; `e ^ 1` is always the paired edge. Geometry,
/// endpoints, length, way id, class, and compass angles are shared per
/// pair, while speed and flags are per direction.
///
/// Intermediate geometry excludes the endpoints and is packed as
/// interleaved fixed-degree `(lat, lon)` values.
#[derive(Debug, Clone)]
pub struct EdgeStore {
    // Pair-indexed columns.
    from_vertices: SpliceList<u32>,
    to_vertices: SpliceList<u32>,
    lengths_mm: SpliceList<i32>,
    way_ids: SpliceList<i64>,
    highway_classes: SpliceList<u8>,
    in_angles: SpliceList<i8>,
    out_angles: SpliceList<i8>,
    geometries: SpliceList<Vec<i32>>,
    // Edge-indexed columns.
    speeds_cms: SpliceList<u16>,
    flags: SpliceList<u32>,
    /// Baseline edges hidden from this overlay (split replacements).
    /// Always empty on a baseline store. Holds forward edge ids.
    temporarily_deleted: HashSet<EdgeId>,
}

impl EdgeStore {
    pub(crate) fn new() -> Self {
        Self {
            from_vertices: SpliceList::new(),
            to_vertices: SpliceList::new(),
            lengths_mm: SpliceList::new(),
            way_ids: SpliceList::new(),
            highway_classes: SpliceList::new(),
            in_angles: SpliceList::new(),
            out_angles: SpliceList::new(),
            geometries: SpliceList::new(),
            speeds_cms: SpliceList::new(),
            flags: SpliceList::new(),
            temporarily_deleted: HashSet::new(),
        }
    }

    pub(crate) fn extend_only_copy(&self) -> Self {
        Self {
            from_vertices: self.from_vertices.extend_only_copy(),
            to_vertices: self.to_vertices.extend_only_copy(),
            lengths_mm: self.lengths_mm.extend_only_copy(),
            way_ids: self.way_ids.extend_only_copy(),
            highway_classes: self.highway_classes.extend_only_copy(),
            in_angles: self.in_angles.extend_only_copy(),
            out_angles: self.out_angles.extend_only_copy(),
            geometries: self.geometries.extend_only_copy(),
            speeds_cms: self.speeds_cms.extend_only_copy(),
            flags: self.flags.extend_only_copy(),
            temporarily_deleted: HashSet::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn n_edge_pairs(&self) -> u32 {
        self.from_vertices.len() as u32
    }

    pub fn n_edges(&self) -> u32 {
        self.n_edge_pairs() * 2
    }

    /// Edges below this index belong to a shared immutable baseline.
    /// Zero for a baseline store.
    #[allow(clippy::cast_possible_truncation)]
    pub fn first_modifiable_edge(&self) -> EdgeId {
        self.speeds_cms.first_extendable() as u32
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        edge < self.n_edges()
    }

    /// Appends a new edge pair and returns the forward (even) edge id.
    ///
    /// Both directions start at [`DEFAULT_SPEED_KMH`] with no flags and no
    /// intermediate geometry. A negative `way_id` requests a unique
    /// generated id.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidGeometry`] when the length is negative or does
    /// not fit the 32-bit millimeter representation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_edge_pair(
        &mut self,
        from_vertex: u32,
        to_vertex: u32,
        length_mm: i64,
        way_id: i64,
    ) -> Result<EdgeId, StoreError> {
        if length_mm < 0 || length_mm > i64::from(i32::MAX) {
            return Err(StoreError::InvalidGeometry(format!(
                "length of {length_mm} mm does not fit the millimeter column"
            )));
        }
        let pair = self.n_edge_pairs();
        let way_id = if way_id < 0 {
            -i64::from(pair) - 1
        } else {
            way_id
        };

        self.from_vertices.push(from_vertex);
        self.to_vertices.push(to_vertex);
        self.lengths_mm.push(length_mm as i32);
        self.way_ids.push(way_id);
        self.highway_classes.push(HighwayClass::Unclassified.into());
        self.in_angles.push(0);
        self.out_angles.push(0);
        self.geometries.push(Vec::new());
        for _ in 0..2 {
            self.speeds_cms.push(kmh_to_cms(DEFAULT_SPEED_KMH));
            self.flags.push(0);
        }
        Ok(pair * 2)
    }

    // Pair-level accessors. The pair index is `edge >> 1`.

    pub fn pair_from_vertex(&self, pair: u32) -> u32 {
        *self.from_vertices.get(pair as usize)
    }

    pub fn pair_to_vertex(&self, pair: u32) -> u32 {
        *self.to_vertices.get(pair as usize)
    }

    pub fn pair_length_mm(&self, pair: u32) -> i32 {
        *self.lengths_mm.get(pair as usize)
    }

    pub fn pair_way_id(&self, pair: u32) -> i64 {
        *self.way_ids.get(pair as usize)
    }

    pub fn pair_highway_class(&self, pair: u32) -> HighwayClass {
        HighwayClass::try_from(*self.highway_classes.get(pair as usize))
            .unwrap_or(HighwayClass::Other)
    }

    pub fn pair_in_angle(&self, pair: u32) -> i8 {
        *self.in_angles.get(pair as usize)
    }

    pub fn pair_out_angle(&self, pair: u32) -> i8 {
        *self.out_angles.get(pair as usize)
    }

    pub(crate) fn pair_geometry(&self, pair: u32) -> &[i32] {
        self.geometries.get(pair as usize)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the pair belongs to
    /// a shared baseline.
    pub fn set_pair_length_mm(&mut self, pair: u32, length_mm: i32) -> Result<(), StoreError> {
        self.lengths_mm.set(pair as usize, length_mm)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the pair belongs to
    /// a shared baseline.
    pub fn set_pair_to_vertex(&mut self, pair: u32, vertex: u32) -> Result<(), StoreError> {
        self.to_vertices.set(pair as usize, vertex)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the pair belongs to
    /// a shared baseline.
    pub fn set_pair_highway_class(
        &mut self,
        pair: u32,
        class: HighwayClass,
    ) -> Result<(), StoreError> {
        self.highway_classes.set(pair as usize, class.into())
    }

    /// Replaces the intermediate geometry (interleaved fixed `(lat, lon)`
    /// values, endpoints excluded).
    ///
    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the pair belongs to
    /// a shared baseline; [`StoreError::InvalidGeometry`] for an odd
    /// number of packed values.
    pub fn set_pair_geometry(&mut self, pair: u32, packed: Vec<i32>) -> Result<(), StoreError> {
        if packed.len() % 2 != 0 {
            return Err(StoreError::InvalidGeometry(
                "packed geometry must hold (lat, lon) value pairs".to_string(),
            ));
        }
        self.geometries.set(pair as usize, packed)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the pair belongs to
    /// a shared baseline.
    pub fn set_pair_angles(
        &mut self,
        pair: u32,
        in_angle: i8,
        out_angle: i8,
    ) -> Result<(), StoreError> {
        self.in_angles.set(pair as usize, in_angle)?;
        self.out_angles.set(pair as usize, out_angle)
    }

    /// Derives the pair's compass angles from its first and last geometry
    /// segments, given the endpoint coordinates in fixed degrees.
    ///
    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the pair belongs to
    /// a shared baseline.
    pub fn calculate_angles(
        &mut self,
        forward_edge: EdgeId,
        from: (i32, i32),
        to: (i32, i32),
    ) -> Result<(), StoreError> {
        let pair = forward_edge >> 1;
        let geometry = self.pair_geometry(pair);

        // First and last interior points, when the pair has any; a bare
        // two-point edge uses its endpoints for both angles.
        let ((in_to_lat, in_to_lon), (out_from_lat, out_from_lon)) = if geometry.is_empty() {
            (to, from)
        } else {
            (
                (geometry[0], geometry[1]),
                (geometry[geometry.len() - 2], geometry[geometry.len() - 1]),
            )
        };

        let in_angle = geometry::compass_angle_degrees(from.0, from.1, in_to_lat, in_to_lon);
        let out_angle = geometry::compass_angle_degrees(out_from_lat, out_from_lon, to.0, to.1);
        self.set_pair_angles(
            pair,
            geometry::degrees_to_binary_radians(in_angle),
            geometry::degrees_to_binary_radians(out_angle),
        )
    }

    // Per-direction accessors.

    pub fn speed_cms(&self, edge: EdgeId) -> u16 {
        *self.speeds_cms.get(edge as usize)
    }

    pub fn speed_mps(&self, edge: EdgeId) -> f64 {
        f64::from(self.speed_cms(edge)) / 100.0
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the edge belongs to
    /// a shared baseline.
    pub fn set_speed_cms(&mut self, edge: EdgeId, speed_cms: u16) -> Result<(), StoreError> {
        self.speeds_cms.set(edge as usize, speed_cms)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the edge belongs to
    /// a shared baseline.
    pub fn set_speed_kmh(&mut self, edge: EdgeId, speed_kmh: f32) -> Result<(), StoreError> {
        self.set_speed_cms(edge, kmh_to_cms(speed_kmh))
    }

    pub fn flags(&self, edge: EdgeId) -> EnumSet<EdgeFlag> {
        EnumSet::from_repr_truncated(*self.flags.get(edge as usize))
    }

    pub fn has_flag(&self, edge: EdgeId, flag: EdgeFlag) -> bool {
        self.flags(edge).contains(flag)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the edge belongs to
    /// a shared baseline.
    pub fn set_flags(&mut self, edge: EdgeId, flags: EnumSet<EdgeFlag>) -> Result<(), StoreError> {
        self.flags.set(edge as usize, flags.as_repr())
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the edge belongs to
    /// a shared baseline.
    pub fn add_flag(&mut self, edge: EdgeId, flag: EdgeFlag) -> Result<(), StoreError> {
        self.set_flags(edge, self.flags(edge) | flag)
    }

    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the edge belongs to
    /// a shared baseline.
    pub fn remove_flag(&mut self, edge: EdgeId, flag: EdgeFlag) -> Result<(), StoreError> {
        self.set_flags(edge, self.flags(edge) - flag)
    }

    // Overlay deletion bookkeeping.

    /// Hides a baseline edge pair from this overlay. The pair itself is
    /// never mutated; readers consult this set.
    pub fn mark_temporarily_deleted(&mut self, forward_edge: EdgeId) {
        self.temporarily_deleted.insert(forward_edge & !1);
    }

    pub fn is_temporarily_deleted(&self, edge: EdgeId) -> bool {
        !self.temporarily_deleted.is_empty() && self.temporarily_deleted.contains(&(edge & !1))
    }

    pub fn temporarily_deleted_edges(&self) -> &HashSet<EdgeId> {
        &self.temporarily_deleted
    }

    /// Positions a read cursor over a single directed edge.
    pub fn cursor<'a>(&'a self, vertices: &'a VertexStore, edge: EdgeId) -> EdgeCursor<'a> {
        debug_assert!(self.contains(edge));
        EdgeCursor {
            edges: self,
            vertices,
            edge,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn kmh_to_cms(speed_kmh: f32) -> u16 {
    (speed_kmh * CMS_PER_KMH).round().clamp(0.0, f32::from(u16::MAX)) as u16
}

/// A lightweight read view over one directed edge.
///
/// Direction-aware accessors (`from_vertex`, geometry, angles) transpose
/// the pair-level attributes for backward (odd) edges.
#[derive(Clone, Copy)]
pub struct EdgeCursor<'a> {
    edges: &'a EdgeStore,
    vertices: &'a VertexStore,
    edge: EdgeId,
}

impl EdgeCursor<'_> {
    pub fn edge_id(&self) -> EdgeId {
        self.edge
    }

    pub fn pair(&self) -> u32 {
        self.edge >> 1
    }

    pub fn is_backward(&self) -> bool {
        self.edge & 1 == 1
    }

    pub fn from_vertex(&self) -> u32 {
        if self.is_backward() {
            self.edges.pair_to_vertex(self.pair())
        } else {
            self.edges.pair_from_vertex(self.pair())
        }
    }

    pub fn to_vertex(&self) -> u32 {
        if self.is_backward() {
            self.edges.pair_from_vertex(self.pair())
        } else {
            self.edges.pair_to_vertex(self.pair())
        }
    }

    pub fn length_mm(&self) -> i32 {
        self.edges.pair_length_mm(self.pair())
    }

    pub fn length_m(&self) -> f64 {
        f64::from(self.length_mm()) / 1000.0
    }

    pub fn way_id(&self) -> i64 {
        self.edges.pair_way_id(self.pair())
    }

    pub fn highway_class(&self) -> HighwayClass {
        self.edges.pair_highway_class(self.pair())
    }

    pub fn speed_cms(&self) -> u16 {
        self.edges.speed_cms(self.edge)
    }

    pub fn speed_mps(&self) -> f64 {
        self.edges.speed_mps(self.edge)
    }

    pub fn flags(&self) -> EnumSet<EdgeFlag> {
        self.edges.flags(self.edge)
    }

    pub fn has_flag(&self, flag: EdgeFlag) -> bool {
        self.edges.has_flag(self.edge, flag)
    }

    pub fn allows(&self, mode: Mode) -> bool {
        self.has_flag(mode.permission_flag())
    }

    /// Inbound compass angle in whole degrees. Swapped with the outbound
    /// angle for backward edges.
    pub fn in_angle_degrees(&self) -> u16 {
        let brads = if self.is_backward() {
            self.edges.pair_out_angle(self.pair())
        } else {
            self.edges.pair_in_angle(self.pair())
        };
        geometry::binary_radians_to_degrees(brads)
    }

    /// Outbound compass angle in whole degrees. Swapped with the inbound
    /// angle for backward edges.
    pub fn out_angle_degrees(&self) -> u16 {
        let brads = if self.is_backward() {
            self.edges.pair_in_angle(self.pair())
        } else {
            self.edges.pair_out_angle(self.pair())
        };
        geometry::binary_radians_to_degrees(brads)
    }

    /// The complete geometry in traversal order: from-vertex coordinate,
    /// intermediate points, to-vertex coordinate. Reversed for backward
    /// edges.
    pub fn geometry(&self) -> Vec<(i32, i32)> {
        let pair = self.pair();
        let packed = self.edges.pair_geometry(pair);
        let from = self.edges.pair_from_vertex(pair);
        let to = self.edges.pair_to_vertex(pair);

        let mut points = Vec::with_capacity(packed.len() / 2 + 2);
        points.push((self.vertices.fixed_lat(from), self.vertices.fixed_lon(from)));
        for chunk in packed.chunks_exact(2) {
            points.push((chunk[0], chunk[1]));
        }
        points.push((self.vertices.fixed_lat(to), self.vertices.fixed_lon(to)));
        if self.is_backward() {
            points.reverse();
        }
        points
    }

    /// Invokes `f(segment_index, lat0, lon0, lat1, lon1)` for every
    /// segment of the complete geometry, in fixed degrees.
    pub fn for_each_segment(&self, mut f: impl FnMut(usize, i32, i32, i32, i32)) {
        for (index, (a, b)) in self.geometry().into_iter().tuple_windows().enumerate() {
            f(index, a.0, a.1, b.0, b.1);
        }
    }

    /// The fixed-degree bounding box of the complete geometry.
    pub fn envelope(&self) -> FixedEnvelope {
        FixedEnvelope::containing(self.geometry())
    }
}
