//! The base speed + turn-angle cost calculator.

use macadam_streets::{EdgeCursor, Mode};

use crate::perceived::PerceivedLengthSupplier;
use crate::request::ProfileRequest;
use crate::{TraversalCostCalculator, TurnDirection};

pub const TURN_COST_SECONDS_WITH_TRAFFIC: u32 = 10;
pub const TURN_COST_SECONDS_AGAINST_TRAFFIC: u32 = 30;
pub const TURN_COST_SECONDS_U_TURN: u32 = 90;

/// How car traversal seconds are rounded from the exact quotient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarTimeRounding {
    #[default]
    Ceil,
    Truncate,
}

/// Relative turn angle between an inbound and an outbound edge, in
/// degrees `0..360`.
///
/// The raw difference `inbound_out − outbound_in` is lifted into the
/// positive range; under drive-on-left the handedness is mirrored so the
/// same classification table applies on both sides of the road.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn relative_turn_angle(inbound_out: u16, outbound_in: u16, drive_on_left: bool) -> u16 {
    let mut delta = i32::from(inbound_out % 360) - i32::from(outbound_in % 360);
    if delta < 0 {
        delta += 360;
    }
    if drive_on_left {
        delta = (360 - delta) % 360;
    }
    delta as u16
}

/// Car turn seconds by relative angle: straight-on up to 27°, a
/// with-traffic turn to 153°, a U-turn to 207°, an against-traffic turn
/// to 333°, then straight-on again.
pub fn car_turn_seconds_for_angle(delta: u16) -> u32 {
    match delta {
        27..=152 => TURN_COST_SECONDS_WITH_TRAFFIC,
        153..=206 => TURN_COST_SECONDS_U_TURN,
        207..=332 => TURN_COST_SECONDS_AGAINST_TRAFFIC,
        _ => 0,
    }
}

/// Physical direction of a movement for the given relative angle. The
/// U-turn band counts as a turn across opposing traffic.
pub fn turn_direction(delta: u16, drive_on_left: bool) -> TurnDirection {
    let (with_traffic, against_traffic) = if drive_on_left {
        (TurnDirection::Left, TurnDirection::Right)
    } else {
        (TurnDirection::Right, TurnDirection::Left)
    };
    match delta {
        27..=152 => with_traffic,
        153..=332 => against_traffic,
        _ => TurnDirection::Straight,
    }
}

/// Speed-based traversal times plus the angle turn table, optionally
/// routed through perceived-length suppliers for walking and cycling.
#[derive(Default)]
pub struct BasicTraversalCalculator {
    drive_on_left: bool,
    car_rounding: CarTimeRounding,
    walk_supplier: Option<Box<dyn PerceivedLengthSupplier + Send + Sync>>,
    bike_supplier: Option<Box<dyn PerceivedLengthSupplier + Send + Sync>>,
}

impl BasicTraversalCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_drive_on_left(mut self, drive_on_left: bool) -> Self {
        self.drive_on_left = drive_on_left;
        self
    }

    #[must_use]
    pub fn with_car_rounding(mut self, rounding: CarTimeRounding) -> Self {
        self.car_rounding = rounding;
        self
    }

    #[must_use]
    pub fn with_walk_supplier(
        mut self,
        supplier: impl PerceivedLengthSupplier + Send + Sync + 'static,
    ) -> Self {
        self.walk_supplier = Some(Box::new(supplier));
        self
    }

    #[must_use]
    pub fn with_bike_supplier(
        mut self,
        supplier: impl PerceivedLengthSupplier + Send + Sync + 'static,
    ) -> Self {
        self.bike_supplier = Some(Box::new(supplier));
        self
    }

    fn supplier_for(&self, mode: Mode) -> Option<&(dyn PerceivedLengthSupplier + Send + Sync)> {
        match mode {
            Mode::Walk => self.walk_supplier.as_deref(),
            Mode::Bicycle => self.bike_supplier.as_deref(),
            Mode::Car => None,
        }
    }
}

impl TraversalCostCalculator for BasicTraversalCalculator {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn traversal_time_seconds(
        &self,
        edge: &EdgeCursor<'_>,
        mode: Mode,
        request: &ProfileRequest,
        _elapsed_s: u32,
    ) -> u32 {
        match mode {
            Mode::Car => {
                let mut speed = edge.speed_mps();
                if speed <= 0.0 {
                    speed = request.speed_for(Mode::Car);
                }
                let exact = edge.length_m() / speed;
                match self.car_rounding {
                    CarTimeRounding::Ceil => exact.ceil() as u32,
                    CarTimeRounding::Truncate => exact as u32,
                }
            }
            // Walking and cycling ignore the edge speed entirely; the
            // perceived multiplier stretches the geometric length.
            Mode::Walk | Mode::Bicycle => {
                let multiplier = self
                    .supplier_for(mode)
                    .map_or(1.0, |supplier| supplier.multiplier(edge));
                (edge.length_m() * multiplier / request.speed_for(mode)).ceil() as u32
            }
        }
    }

    fn turn_time_seconds(&self, from: &EdgeCursor<'_>, to: &EdgeCursor<'_>, mode: Mode) -> u32 {
        let delta = relative_turn_angle(
            from.out_angle_degrees(),
            to.in_angle_degrees(),
            self.drive_on_left,
        );
        match mode {
            Mode::Car => car_turn_seconds_for_angle(delta),
            Mode::Walk | Mode::Bicycle => self.supplier_for(mode).map_or(0, |supplier| {
                supplier.turn_seconds(to, turn_direction(delta, self.drive_on_left))
            }),
        }
    }
}
