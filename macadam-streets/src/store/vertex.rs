use enumset::EnumSet;

use crate::column::SpliceList;
use crate::geometry;
use crate::{StoreError, VertexFlag, VertexId};

/// Columnar storage for street vertices.
///
/// Vertices are identified by dense non-negative indices and are never
/// destroyed; island pruning only strips edge permissions. Latitude and
/// longitude are fixed-point degrees.
#[derive(Debug, Clone)]
pub struct VertexStore {
    fixed_lats: SpliceList<i32>,
    fixed_lons: SpliceList<i32>,
    flags: SpliceList<u8>,
}

impl VertexStore {
    pub(crate) fn new() -> Self {
        Self {
            fixed_lats: SpliceList::new(),
            fixed_lons: SpliceList::new(),
            flags: SpliceList::new(),
        }
    }

    /// A new store whose columns overlay this one as an immutable
    /// baseline. Appends go to the copy's private tail.
    pub(crate) fn extend_only_copy(&self) -> Self {
        Self {
            fixed_lats: self.fixed_lats.extend_only_copy(),
            fixed_lons: self.fixed_lons.extend_only_copy(),
            flags: self.flags.extend_only_copy(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn n_vertices(&self) -> u32 {
        self.fixed_lats.len() as u32
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        vertex < self.n_vertices()
    }

    /// Appends a vertex at the given floating-degree coordinate.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCoordinate`] when either component is not finite.
    pub fn add_vertex(&mut self, lat: f64, lon: f64) -> Result<VertexId, StoreError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(StoreError::InvalidCoordinate { lat, lon });
        }
        Ok(self.add_vertex_fixed(
            geometry::degrees_to_fixed(lat),
            geometry::degrees_to_fixed(lon),
        ))
    }

    /// Appends a vertex at the given fixed-degree coordinate.
    pub fn add_vertex_fixed(&mut self, fixed_lat: i32, fixed_lon: i32) -> VertexId {
        let vertex = self.n_vertices();
        self.fixed_lats.push(fixed_lat);
        self.fixed_lons.push(fixed_lon);
        self.flags.push(0);
        vertex
    }

    pub fn fixed_lat(&self, vertex: VertexId) -> i32 {
        *self.fixed_lats.get(vertex as usize)
    }

    pub fn fixed_lon(&self, vertex: VertexId) -> i32 {
        *self.fixed_lons.get(vertex as usize)
    }

    pub fn lat(&self, vertex: VertexId) -> f64 {
        geometry::fixed_to_degrees(self.fixed_lat(vertex))
    }

    pub fn lon(&self, vertex: VertexId) -> f64 {
        geometry::fixed_to_degrees(self.fixed_lon(vertex))
    }

    pub fn flags(&self, vertex: VertexId) -> EnumSet<VertexFlag> {
        EnumSet::from_repr_truncated(*self.flags.get(vertex as usize))
    }

    pub fn has_flag(&self, vertex: VertexId, flag: VertexFlag) -> bool {
        self.flags(vertex).contains(flag)
    }

    /// Adds a flag to a vertex.
    ///
    /// # Errors
    ///
    /// [`StoreError::ImmutableBaselineViolation`] when the vertex lies in
    /// the shared baseline of an overlay store.
    pub fn set_flag(&mut self, vertex: VertexId, flag: VertexFlag) -> Result<(), StoreError> {
        let updated = (self.flags(vertex) | flag).as_repr();
        self.flags.set(vertex as usize, updated)
    }
}
