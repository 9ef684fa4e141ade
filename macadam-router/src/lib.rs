//! # macadam-router
//!
//! Label-setting shortest-path search over the street layer.
//!
//! A [`StreetRouter`] is a mutable per-query object: seed it with an
//! origin (a projected coordinate, a vertex, or another search's
//! frontier), run [`StreetRouter::route`], then read the reached
//! vertices, stops, or reconstructed paths. Queries are synchronous and
//! thread-local; any number of them may run concurrently over one shared
//! baseline layer.

mod path;
mod router;
mod state;
mod visitor;

pub use path::reverse_path;
pub use router::{OriginState, StreetRouter};
pub use state::{DominanceVariable, RoutingState, UNREACHED};
pub use visitor::RoutingVisitor;
