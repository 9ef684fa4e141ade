//! Tag-driven perceived-length suppliers for walking and cycling.
//!
//! A supplier answers two questions about an edge: how much longer it
//! *feels* than its geometric length (a dimensionless multiplier applied
//! before time conversion), and how expensive a turn onto it is (meters,
//! converted to seconds at the mode's standard speed). The per-edge trait
//! tables are built by the importer; edges without an entry behave as
//! fully neutral.

use macadam_streets::EdgeCursor;

use crate::TurnDirection;

/// Standard walking speed used for turn-cost conversion.
pub const STANDARD_WALK_SPEED_MPS: f64 = 1.3;

/// Standard cycling speed used for turn-cost conversion.
pub const STANDARD_BIKE_SPEED_MPS: f64 = 4.0;

/// Per-direction perceived cost capability, bound to walk and bike modes.
pub trait PerceivedLengthSupplier {
    /// Multiplier applied to the edge's geometric length.
    fn multiplier(&self, edge: &EdgeCursor<'_>) -> f64;

    /// Seconds charged for a movement onto `to_edge` in the given
    /// direction.
    fn turn_seconds(&self, to_edge: &EdgeCursor<'_>, direction: TurnDirection) -> u32;
}

/// Crosswalk provision at the intersection an edge leads into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CrosswalkType {
    #[default]
    None,
    Marked,
    Signalized,
}

/// Dedicated cycling provision along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BikeInfrastructure {
    #[default]
    None,
    Lane,
    Boulevard,
    Path,
}

/// Traffic control at the intersection an edge leads into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IntersectionControl {
    #[default]
    None,
    Stop,
    Signal,
}

/// Walking-relevant traits of one directed edge.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WalkEdgeTraits {
    /// Share of the edge length steeper than 10 percent.
    pub slope_percent_10plus: f64,
    pub unpaved_or_alley: bool,
    pub busy_road: bool,
    /// Daily traffic volume on the edge itself.
    pub self_aadt: u32,
    /// Daily traffic volume crossing at the far intersection.
    pub cross_aadt: u32,
    /// Daily traffic volume running parallel at the far intersection.
    pub parallel_aadt: u32,
    pub crosswalk: CrosswalkType,
}

/// Walk perceived-length supplier backed by a per-edge trait table.
#[derive(Debug, Clone, Default)]
pub struct WalkPerceptionTable {
    traits: Vec<WalkEdgeTraits>,
}

impl WalkPerceptionTable {
    /// `traits` is indexed by directed edge id; short tables fall back to
    /// neutral traits.
    pub fn new(traits: Vec<WalkEdgeTraits>) -> Self {
        Self { traits }
    }

    fn traits_for(&self, edge: &EdgeCursor<'_>) -> WalkEdgeTraits {
        self.traits
            .get(edge.edge_id() as usize)
            .cloned()
            .unwrap_or_default()
    }
}

impl PerceivedLengthSupplier for WalkPerceptionTable {
    fn multiplier(&self, edge: &EdgeCursor<'_>) -> f64 {
        let traits = self.traits_for(edge);
        let mut multiplier = 1.0 + 0.99 * traits.slope_percent_10plus;
        if traits.unpaved_or_alley {
            multiplier += 0.51;
        }
        if traits.busy_road {
            multiplier += 0.14;
        }
        multiplier
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn turn_seconds(&self, to_edge: &EdgeCursor<'_>, direction: TurnDirection) -> u32 {
        let traits = self.traits_for(to_edge);
        let mut meters = 54.0;
        let volume = match direction {
            TurnDirection::Straight => traits.cross_aadt,
            TurnDirection::Left | TurnDirection::Right => {
                traits.self_aadt.max(traits.parallel_aadt)
            }
        };
        if volume >= 13_000 && traits.crosswalk != CrosswalkType::Signalized {
            meters += 73.0;
        } else if volume >= 10_000 && traits.crosswalk == CrosswalkType::None {
            meters += 28.0;
        }
        (meters / STANDARD_WALK_SPEED_MPS) as u32
    }
}

/// Cycling-relevant traits of one directed edge.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BikeEdgeTraits {
    pub infrastructure: BikeInfrastructure,
    pub self_aadt: u32,
    pub cross_aadt: u32,
    pub parallel_aadt: u32,
    /// Share of the edge length in the 2–4 percent slope band.
    pub slope_2_to_4: f64,
    /// Share of the edge length in the 4–6 percent slope band.
    pub slope_4_to_6: f64,
    /// Share of the edge length steeper than 6 percent.
    pub slope_6_plus: f64,
    pub control: IntersectionControl,
}

/// Bike perceived-length supplier backed by a per-edge trait table.
#[derive(Debug, Clone, Default)]
pub struct BikePerceptionTable {
    traits: Vec<BikeEdgeTraits>,
}

impl BikePerceptionTable {
    /// `traits` is indexed by directed edge id; short tables fall back to
    /// neutral traits.
    pub fn new(traits: Vec<BikeEdgeTraits>) -> Self {
        Self { traits }
    }

    fn traits_for(&self, edge: &EdgeCursor<'_>) -> BikeEdgeTraits {
        self.traits
            .get(edge.edge_id() as usize)
            .cloned()
            .unwrap_or_default()
    }
}

impl PerceivedLengthSupplier for BikePerceptionTable {
    fn multiplier(&self, edge: &EdgeCursor<'_>) -> f64 {
        let traits = self.traits_for(edge);
        let mut multiplier = 1.0;
        match traits.infrastructure {
            BikeInfrastructure::Boulevard => multiplier -= 0.108,
            BikeInfrastructure::Path => multiplier -= 0.16,
            BikeInfrastructure::None | BikeInfrastructure::Lane => {
                if traits.self_aadt > 30_000 {
                    multiplier += 7.157;
                } else if traits.self_aadt > 20_000 {
                    multiplier += 1.4;
                } else if traits.self_aadt > 10_000 {
                    multiplier += 0.368;
                }
            }
        }
        multiplier
            + 0.371 * traits.slope_2_to_4
            + 1.23 * traits.slope_4_to_6
            + 3.239 * traits.slope_6_plus
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn turn_seconds(&self, to_edge: &EdgeCursor<'_>, direction: TurnDirection) -> u32 {
        let traits = self.traits_for(to_edge);
        let mut meters = 0.0;
        match traits.control {
            IntersectionControl::Stop => meters += 6.0,
            IntersectionControl::Signal => meters += 27.0,
            IntersectionControl::None => {}
        }
        if direction != TurnDirection::Straight {
            meters += 54.0;
        }
        match direction {
            TurnDirection::Right => {
                if traits.cross_aadt > 10_000 {
                    meters += 50.0;
                }
            }
            TurnDirection::Left | TurnDirection::Straight => {
                if traits.cross_aadt > 20_000 {
                    meters += 424.0;
                } else if traits.cross_aadt > 10_000 {
                    meters += 81.0;
                } else if traits.cross_aadt > 5_000 {
                    meters += 78.0;
                }
            }
        }
        if direction == TurnDirection::Left {
            if traits.parallel_aadt > 20_000 {
                meters += 297.0;
            } else if traits.parallel_aadt > 10_000 {
                meters += 117.0;
            }
        }
        (meters / STANDARD_BIKE_SPEED_MPS) as u32
    }
}
