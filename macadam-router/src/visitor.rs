use crate::state::RoutingState;

/// Synchronous per-vertex callback invoked as states are settled.
///
/// Both methods default to doing nothing; `should_break_search` is
/// consulted after every vertex dequeue, so a visitor can cancel a
/// search cleanly with partial results intact.
pub trait RoutingVisitor {
    fn visit_vertex(&mut self, _state: &RoutingState) {}

    fn should_break_search(&self) -> bool {
        false
    }
}
