//! Transit stop attachment.
//!
//! The transit graph itself lives elsewhere; this module only creates one
//! street vertex per stop, links it to the network, and keeps the
//! stop ↔ vertex mappings that query results are translated through.

use std::collections::HashMap;

use tracing::debug;

use crate::layer::StreetLayer;
use crate::{StoreError, VertexId};

/// One row of the transit stop table.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StopRecord {
    pub stop_id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Stop ↔ street-vertex mappings produced by linking.
#[derive(Debug, Clone, Default)]
pub struct TransitStopLayer {
    stop_ids: Vec<i64>,
    vertex_for_stop: Vec<VertexId>,
    stop_for_vertex: HashMap<VertexId, u32>,
    linked: Vec<bool>,
}

impl TransitStopLayer {
    /// Creates and links one vertex per stop.
    ///
    /// Stops with no street within the link radius keep their vertex but
    /// stay unlinked (and therefore unreachable); that is not an error.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCoordinate`] for non-finite stop coordinates;
    /// store failures indicate a programming error.
    #[allow(clippy::cast_possible_truncation)]
    pub fn link(layer: &mut StreetLayer, stops: &[StopRecord]) -> Result<Self, StoreError> {
        let mut result = Self::default();
        let mut unlinked = 0u32;
        for stop in stops {
            let before = layer.n_edges();
            let vertex = layer.create_and_link_vertex(stop.lat, stop.lon)?;
            if layer.n_edges() == before {
                unlinked += 1;
                result.linked.push(false);
            } else {
                result.linked.push(true);
            }
            let index = result.stop_ids.len() as u32;
            result.stop_ids.push(stop.stop_id);
            result.vertex_for_stop.push(vertex);
            result.stop_for_vertex.insert(vertex, index);
        }
        if unlinked > 0 {
            debug!(total = stops.len(), unlinked, "linked transit stops");
        }
        Ok(result)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn n_stops(&self) -> u32 {
        self.stop_ids.len() as u32
    }

    pub fn stop_id(&self, stop: u32) -> i64 {
        self.stop_ids[stop as usize]
    }

    /// The street vertex carrying this stop.
    pub fn vertex_for_stop(&self, stop: u32) -> VertexId {
        self.vertex_for_stop[stop as usize]
    }

    /// Whether the stop reached a street within the link radius.
    pub fn is_linked(&self, stop: u32) -> bool {
        self.linked[stop as usize]
    }

    /// The stop whose vertex this is, if any.
    pub fn stop_at_vertex(&self, vertex: VertexId) -> Option<u32> {
        self.stop_for_vertex.get(&vertex).copied()
    }
}

/// Per-stop distance tables to nearby street vertices, precomputed by the
/// transit collaborator and consumed read-only here.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedStopDistances {
    tables: Vec<HashMap<VertexId, i32>>,
}

impl PrecomputedStopDistances {
    pub fn new(tables: Vec<HashMap<VertexId, i32>>) -> Self {
        Self { tables }
    }

    /// The `vertex → distance (mm)` table for a stop, if one was supplied.
    pub fn for_stop(&self, stop: u32) -> Option<&HashMap<VertexId, i32>> {
        self.tables.get(stop as usize)
    }
}
