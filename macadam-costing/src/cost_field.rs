//! Additive cost fields and their multistage composition.

use std::sync::Once;

use macadam_streets::{EdgeCursor, Mode};
use tracing::warn;

use crate::request::ProfileRequest;
use crate::TraversalCostCalculator;

/// An opaque per-edge additive transformation of base traversal time.
///
/// Fields compose additively and commute; they never see or transform
/// turn costs. Contributions may be negative; the composed total is
/// clamped to at least one second.
pub trait CostField {
    /// Extra seconds for `edge` given its base traversal seconds.
    fn additional_seconds(&self, edge: &EdgeCursor<'_>, base_seconds: u32) -> i32;
}

/// A base calculator with a stack of cost fields applied on top.
pub struct MultistageTraversalCalculator {
    base: Box<dyn TraversalCostCalculator + Send + Sync>,
    fields: Vec<Box<dyn CostField + Send + Sync>>,
    underflow_logged: Once,
}

impl MultistageTraversalCalculator {
    pub fn new(base: impl TraversalCostCalculator + Send + Sync + 'static) -> Self {
        Self {
            base: Box::new(base),
            fields: Vec::new(),
            underflow_logged: Once::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl CostField + Send + Sync + 'static) -> Self {
        self.fields.push(Box::new(field));
        self
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }
}

impl TraversalCostCalculator for MultistageTraversalCalculator {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn traversal_time_seconds(
        &self,
        edge: &EdgeCursor<'_>,
        mode: Mode,
        request: &ProfileRequest,
        elapsed_s: u32,
    ) -> u32 {
        let base = self
            .base
            .traversal_time_seconds(edge, mode, request, elapsed_s);
        let total = self
            .fields
            .iter()
            .fold(i64::from(base), |acc, field| {
                acc + i64::from(field.additional_seconds(edge, base))
            });
        if total <= 0 {
            self.underflow_logged.call_once(|| {
                warn!(
                    edge = edge.edge_id(),
                    total, "cost fields drove traversal time to zero or below, clamping to 1 s"
                );
            });
            return 1;
        }
        total.min(i64::from(u32::MAX)) as u32
    }

    fn turn_time_seconds(&self, from: &EdgeCursor<'_>, to: &EdgeCursor<'_>, mode: Mode) -> u32 {
        // Turn costs pass through untouched.
        self.base.turn_time_seconds(from, to, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BasicTraversalCalculator;
    use macadam_streets::{EdgeFlag, EdgeRecord, HighwayClass, StreetLayer};

    struct Flat(i32);

    impl CostField for Flat {
        fn additional_seconds(&self, _edge: &EdgeCursor<'_>, _base_seconds: u32) -> i32 {
            self.0
        }
    }

    struct Half;

    impl CostField for Half {
        #[allow(clippy::cast_possible_wrap)]
        fn additional_seconds(&self, _edge: &EdgeCursor<'_>, base_seconds: u32) -> i32 {
            (base_seconds / 2) as i32
        }
    }

    fn one_edge_layer() -> StreetLayer {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.0009).unwrap();
        let flags = EdgeFlag::AllowsPedestrian | EdgeFlag::Linkable;
        layer
            .add_street_edge(EdgeRecord {
                from_vertex: a,
                to_vertex: b,
                length_mm: 130_000,
                way_id: -1,
                highway_class: HighwayClass::Residential,
                forward_flags: flags,
                backward_flags: flags,
                forward_speed_kmh: 50.0,
                backward_speed_kmh: 50.0,
                geometry: Vec::new(),
            })
            .unwrap();
        layer
    }

    #[test]
    fn test_fields_compose_additively() {
        let layer = one_edge_layer();
        let cursor = layer.edge_cursor(0);
        let request = ProfileRequest::default();

        // 130 m at 1.3 m/s walks in 100 s.
        let calculator = MultistageTraversalCalculator::new(BasicTraversalCalculator::new())
            .with_field(Flat(7))
            .with_field(Half);
        assert_eq!(
            calculator.traversal_time_seconds(&cursor, Mode::Walk, &request, 0),
            157
        );
        assert_eq!(calculator.n_fields(), 2);
    }

    #[test]
    fn test_underflow_clamps_to_one_second() {
        let layer = one_edge_layer();
        let cursor = layer.edge_cursor(0);
        let request = ProfileRequest::default();

        let calculator = MultistageTraversalCalculator::new(BasicTraversalCalculator::new())
            .with_field(Flat(-10_000));
        assert_eq!(
            calculator.traversal_time_seconds(&cursor, Mode::Walk, &request, 0),
            1
        );
    }

    #[test]
    fn test_turn_costs_bypass_fields() {
        let layer = one_edge_layer();
        let from = layer.edge_cursor(0);
        let to = layer.edge_cursor(1);

        let plain = BasicTraversalCalculator::new();
        let stacked = MultistageTraversalCalculator::new(BasicTraversalCalculator::new())
            .with_field(Flat(1_000));
        assert_eq!(
            stacked.turn_time_seconds(&from, &to, Mode::Car),
            plain.turn_time_seconds(&from, &to, Mode::Car),
        );
    }
}
