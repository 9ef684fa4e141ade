//! # macadam-costing
//!
//! Traversal and turn cost models for the street router.
//!
//! The router sees one capability: a [`TraversalCostCalculator`]. The
//! basic implementation combines mode speeds with an angle-based turn
//! table for cars and optional perceived-length suppliers for walking
//! and cycling. Calculators compose: a multistage calculator stacks
//! additive cost fields on any base, and a time-banded calculator
//! consults a swappable speed table before falling through.

use macadam_streets::{EdgeCursor, Mode};

mod base;
mod cost_field;
mod perceived;
mod request;
mod speed_bands;

pub use base::{
    car_turn_seconds_for_angle, relative_turn_angle, turn_direction, BasicTraversalCalculator,
    CarTimeRounding, TURN_COST_SECONDS_AGAINST_TRAFFIC, TURN_COST_SECONDS_U_TURN,
    TURN_COST_SECONDS_WITH_TRAFFIC,
};
pub use cost_field::{CostField, MultistageTraversalCalculator};
pub use perceived::{
    BikeEdgeTraits, BikeInfrastructure, BikePerceptionTable, CrosswalkType, IntersectionControl,
    PerceivedLengthSupplier, WalkEdgeTraits, WalkPerceptionTable, STANDARD_BIKE_SPEED_MPS,
    STANDARD_WALK_SPEED_MPS,
};
pub use request::ProfileRequest;
pub use speed_bands::{
    SpeedBandOverride, SpeedBandTable, TimeBandedCalculator, BANDS_PER_DAY, SECONDS_PER_BAND,
};

/// Physical direction of a movement between two edges, as consumed by the
/// perceived-length suppliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TurnDirection {
    Left,
    Right,
    Straight,
}

/// The cost capability the router is parameterized over.
///
/// Implementations must be cheap to call: both methods run once per edge
/// expansion in the innermost search loop.
pub trait TraversalCostCalculator {
    /// Seconds to traverse `edge` with `mode`, `elapsed_s` seconds after
    /// the search began (time-dependent calculators index their tables
    /// with it; others ignore it).
    fn traversal_time_seconds(
        &self,
        edge: &EdgeCursor<'_>,
        mode: Mode,
        request: &ProfileRequest,
        elapsed_s: u32,
    ) -> u32;

    /// Seconds charged for the transition from `from` onto `to`.
    fn turn_time_seconds(&self, from: &EdgeCursor<'_>, to: &EdgeCursor<'_>, mode: Mode) -> u32;
}
