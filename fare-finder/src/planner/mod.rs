//! Round-trip planner using lazy best-first search.
//!
//! This module answers: "starting from this airport, which circular
//! itineraries are cheapest per leg?" The flight network is discovered one
//! airport at a time from a fare source, so the search only fetches the
//! fares it needs to extend its current best partial route.

mod config;
mod rank;
mod search;
mod tree;
mod waypoints;

pub use config::{ConfigError, RouteConstraints};
pub use rank::{ClosedRouteRegistry, Recorded, rank_routes};
pub use search::{RouteFinder, SearchError, SearchOutcome, StopReason};
pub use tree::{NodeId, NodeState, SearchTree, Selection};
pub use waypoints::{Skeletons, WaypointPlanner};
