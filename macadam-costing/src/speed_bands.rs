//! Time-banded traversal speed override.
//!
//! Real-time feeds publish per-edge speeds in 96 fifteen-minute
//! time-of-day bins. Queries read the table under a shared lock; a
//! background updater replaces the whole table under an exclusive lock.
//! Edges without an entry (or with an empty band) fall through to the
//! wrapped calculator, and a failed refresh keeps the previous table.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use macadam_streets::{EdgeCursor, EdgeId, Mode};
use tracing::warn;

use crate::request::ProfileRequest;
use crate::TraversalCostCalculator;

/// Fifteen-minute bins per day.
pub const BANDS_PER_DAY: usize = 96;

/// Seconds per band.
pub const SECONDS_PER_BAND: u32 = 900;

/// Edge id → per-band speeds in km/h. Non-positive values mean "no data
/// for this band".
#[derive(Debug, Clone, Default)]
pub struct SpeedBandTable {
    bands: HashMap<EdgeId, [i16; BANDS_PER_DAY]>,
}

impl SpeedBandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, edge: EdgeId, speeds_kmh: [i16; BANDS_PER_DAY]) {
        self.bands.insert(edge, speeds_kmh);
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// The speed for an edge at a second-of-day, if a positive band value
    /// exists.
    #[allow(clippy::cast_possible_truncation)]
    pub fn speed_kmh_at(&self, edge: EdgeId, second_of_day: u32) -> Option<i16> {
        let band = (second_of_day / SECONDS_PER_BAND) as usize % BANDS_PER_DAY;
        self.bands
            .get(&edge)
            .map(|speeds| speeds[band])
            .filter(|&kmh| kmh > 0)
    }
}

/// The process-wide swappable table. Readers take the shared lock per
/// lookup; [`SpeedBandOverride::replace`] takes the exclusive lock just
/// long enough to drop the old table in favor of the new one.
#[derive(Debug, Default)]
pub struct SpeedBandOverride {
    table: RwLock<SpeedBandTable>,
}

impl SpeedBandOverride {
    pub fn new(initial: SpeedBandTable) -> Self {
        Self {
            table: RwLock::new(initial),
        }
    }

    pub fn replace(&self, table: SpeedBandTable) {
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;
    }

    /// Replaces the table with a freshly loaded one, keeping the current
    /// table (and logging) when the load fails.
    pub fn refresh_with<E: Display>(&self, load: impl FnOnce() -> Result<SpeedBandTable, E>) {
        match load() {
            Ok(table) => self.replace(table),
            Err(error) => warn!(%error, "speed band refresh failed, keeping previous table"),
        }
    }

    fn speed_kmh_at(&self, edge: EdgeId, second_of_day: u32) -> Option<i16> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .speed_kmh_at(edge, second_of_day)
    }
}

/// A calculator that consults the banded table for car traversal and
/// falls through to its base everywhere else. Holds the override through
/// an `Arc` so updater and query threads share one table.
pub struct TimeBandedCalculator<C> {
    bands: Arc<SpeedBandOverride>,
    base: C,
}

impl<C: TraversalCostCalculator> TimeBandedCalculator<C> {
    pub fn new(bands: Arc<SpeedBandOverride>, base: C) -> Self {
        Self { bands, base }
    }
}

impl<C: TraversalCostCalculator> TraversalCostCalculator for TimeBandedCalculator<C> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn traversal_time_seconds(
        &self,
        edge: &EdgeCursor<'_>,
        mode: Mode,
        request: &ProfileRequest,
        elapsed_s: u32,
    ) -> u32 {
        if mode == Mode::Car {
            let second_of_day = request.from_time.wrapping_add(elapsed_s);
            if let Some(kmh) = self.bands.speed_kmh_at(edge.edge_id(), second_of_day) {
                return (edge.length_m() * 3.6 / f64::from(kmh)).ceil() as u32;
            }
        }
        self.base
            .traversal_time_seconds(edge, mode, request, elapsed_s)
    }

    fn turn_time_seconds(&self, from: &EdgeCursor<'_>, to: &EdgeCursor<'_>, mode: Mode) -> u32 {
        self.base.turn_time_seconds(from, to, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BasicTraversalCalculator;
    use macadam_streets::{EdgeFlag, EdgeRecord, HighwayClass, StreetLayer};

    fn car_edge_layer() -> StreetLayer {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.009).unwrap();
        let flags = EdgeFlag::AllowsCar | EdgeFlag::Linkable;
        layer
            .add_street_edge(EdgeRecord {
                from_vertex: a,
                to_vertex: b,
                length_mm: 1_000_000,
                way_id: -1,
                highway_class: HighwayClass::Secondary,
                forward_flags: flags,
                backward_flags: flags,
                forward_speed_kmh: 36.0,
                backward_speed_kmh: 36.0,
                geometry: Vec::new(),
            })
            .unwrap();
        layer
    }

    fn banded(edge: EdgeId, band: usize, kmh: i16) -> SpeedBandTable {
        let mut speeds = [0i16; BANDS_PER_DAY];
        speeds[band] = kmh;
        let mut table = SpeedBandTable::new();
        table.insert(edge, speeds);
        table
    }

    #[test]
    fn test_banded_speed_applies_in_its_window() {
        let layer = car_edge_layer();
        let cursor = layer.edge_cursor(0);
        // 18 km/h between 08:00 and 08:15.
        let bands = Arc::new(SpeedBandOverride::new(banded(0, 32, 18)));
        let calculator = TimeBandedCalculator::new(bands, BasicTraversalCalculator::new());

        let request = ProfileRequest {
            from_time: 8 * 3600,
            ..ProfileRequest::default()
        };
        // 1 km at 18 km/h: 200 s instead of the edge's own 100 s.
        assert_eq!(
            calculator.traversal_time_seconds(&cursor, Mode::Car, &request, 0),
            200
        );
        // 20 minutes later the band is empty again: fall through.
        assert_eq!(
            calculator.traversal_time_seconds(&cursor, Mode::Car, &request, 1200),
            100
        );
        // Other edges and other modes never consult the table.
        assert_eq!(
            calculator.traversal_time_seconds(&cursor, Mode::Walk, &request, 0),
            770
        );
    }

    #[test]
    fn test_missing_edge_falls_through() {
        let layer = car_edge_layer();
        let cursor = layer.edge_cursor(0);
        let bands = Arc::new(SpeedBandOverride::new(SpeedBandTable::new()));
        let calculator = TimeBandedCalculator::new(bands, BasicTraversalCalculator::new());
        assert_eq!(
            calculator.traversal_time_seconds(&cursor, Mode::Car, &ProfileRequest::default(), 0),
            100
        );
    }

    #[test]
    fn test_refresh_keeps_previous_table_on_failure() {
        let bands = SpeedBandOverride::new(banded(0, 0, 30));
        bands.refresh_with(|| Err::<SpeedBandTable, _>("feed unavailable"));
        assert_eq!(bands.speed_kmh_at(0, 0), Some(30));

        bands.refresh_with(|| Ok::<_, String>(banded(0, 0, 45)));
        assert_eq!(bands.speed_kmh_at(0, 0), Some(45));
    }

    #[test]
    fn test_band_indexing_wraps_past_midnight() {
        let table = banded(0, 0, 50);
        // 24h after midnight lands back in band 0.
        assert_eq!(table.speed_kmh_at(0, 24 * 3600), Some(50));
        assert_eq!(table.speed_kmh_at(0, 900), None);
    }
}
