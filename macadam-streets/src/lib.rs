//! # macadam-streets
//!
//! Columnar street-network storage for a multimodal routing engine.
//!
//! The layer is built once from imported map data and then shared,
//! immutable, across any number of query threads. Scenario variants are
//! expressed as *extend-only copies*: cheap overlays which share every
//! baseline column by pointer and append into private tails, so a thread
//! can split edges and link new stops without ever touching shared state.
//!
//! The main entry point is [`StreetLayer`], which owns the
//! [`VertexStore`], the [`EdgeStore`], the spatial index, per-vertex
//! incidence lists, and the turn restriction table.

use enumset::{EnumSet, EnumSetType};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod column;
pub mod geometry;
mod layer;
mod spatial_index;
mod split;
mod store;
mod transit;
mod turn_restrictions;

pub mod islands;

pub use layer::{EdgeRecord, StreetLayer, LINK_RADIUS_METERS, SNAP_RADIUS_MM};
pub use spatial_index::{FixedEnvelope, SpatialIndex};
pub use split::Split;
pub use store::{EdgeCursor, EdgeStore, VertexStore, DEFAULT_SPEED_KMH};
pub use transit::{PrecomputedStopDistances, StopRecord, TransitStopLayer};
pub use turn_restrictions::{RestrictionId, TurnRestriction, TurnRestrictionTable};

/// Dense index of a vertex within the [`VertexStore`].
pub type VertexId = u32;

/// Dense index of a directed edge within the [`EdgeStore`].
///
/// Edges come in pairs: the forward direction at an even index `e`, the
/// backward direction at `e + 1`. The paired edge is always `e ^ 1`.
pub type EdgeId = u32;

/// A travel mode the street router can search with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Mode {
    Walk,
    Bicycle,
    Car,
}

impl Mode {
    /// The edge flag that grants this mode permission to traverse an edge.
    pub const fn permission_flag(self) -> EdgeFlag {
        match self {
            Mode::Walk => EdgeFlag::AllowsPedestrian,
            Mode::Bicycle => EdgeFlag::AllowsBike,
            Mode::Car => EdgeFlag::AllowsCar,
        }
    }
}

/// Per-direction edge flags.
///
/// Each directed edge of a pair carries an independent set; permissions
/// and no-thru markers regularly differ between the two directions.
#[derive(Debug, EnumSetType)]
#[enumset(repr = "u32")]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum EdgeFlag {
    AllowsPedestrian,
    AllowsBike,
    AllowsCar,
    /// A short connector attaching a pseudo-vertex (e.g. a transit stop)
    /// to the street graph. Never a linking target itself.
    Link,
    /// Eligible as a linking target (excludes e.g. motorways and tunnels).
    Linkable,
    NoThruTraffic,
    NoThruTrafficPedestrian,
    NoThruTrafficBike,
    NoThruTrafficCar,
    Stairs,
    Sidewalk,
    Crossing,
    Roundabout,
    Unpaved,
}

/// The permission flags, i.e. the subset of [`EdgeFlag`] the island
/// pruner strips and the router checks.
pub const PERMISSION_FLAGS: EnumSet<EdgeFlag> = enumset::enum_set!(
    EdgeFlag::AllowsPedestrian | EdgeFlag::AllowsBike | EdgeFlag::AllowsCar
);

/// Per-vertex flags. This is a closed set.
#[derive(Debug, EnumSetType)]
#[enumset(repr = "u8")]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum VertexFlag {
    TrafficSignal,
    ParkAndRide,
    BikeSharing,
}

/// Broad road classification, stored as a single byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum HighwayClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    Service,
    Cycleway,
    Footway,
    Path,
    Other,
}

/// Errors raised by store and layer mutations.
///
/// Absent linking targets are not errors; they surface as `Option::None`
/// from [`Split::find`] and friends.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Coordinate ({lat}, {lon}) is not finite.")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("Vertex {0} does not exist in this store.")]
    InvalidVertex(VertexId),
    #[error("Invalid edge geometry: {0}")]
    InvalidGeometry(String),
    #[error("Index {0} lies in the immutable baseline of this overlay.")]
    ImmutableBaselineViolation(u32),
}
