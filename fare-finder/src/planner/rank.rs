//! Closed-route bookkeeping and final ranking.
//!
//! During a search every route that returns to the root is offered to the
//! registry, which keeps only the cheapest route per set of visited cities.
//! At the end the survivors are ranked by cost per leg.

use std::collections::HashMap;

use crate::domain::{CityKey, ClosedRoute};

/// What happened to a route offered to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First route for its city set.
    New,
    /// Cheaper than the route it replaced.
    Improved,
    /// Not cheaper than the stored route; discarded.
    Kept,
}

/// Cheapest closed route per city set.
#[derive(Debug, Default)]
pub struct ClosedRouteRegistry {
    best: HashMap<CityKey, ClosedRoute>,
}

impl ClosedRouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `route` under `key`. It replaces the stored route only when its
    /// total cost is strictly lower.
    pub fn record(&mut self, key: CityKey, route: ClosedRoute) -> Recorded {
        match self.best.get_mut(&key) {
            None => {
                self.best.insert(key, route);
                Recorded::New
            }
            Some(stored) if route.total_cost() < stored.total_cost() => {
                *stored = route;
                Recorded::Improved
            }
            Some(_) => Recorded::Kept,
        }
    }

    /// Number of distinct city sets with a route.
    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    pub fn get(&self, key: &CityKey) -> Option<&ClosedRoute> {
        self.best.get(key)
    }

    pub fn into_routes(self) -> Vec<ClosedRoute> {
        self.best.into_values().collect()
    }
}

/// Rank routes by total cost per leg, cheapest first.
///
/// Ties fall back to total cost, then to the airport sequence, so the order
/// is deterministic.
pub fn rank_routes(mut routes: Vec<ClosedRoute>) -> Vec<ClosedRoute> {
    routes.sort_by(|a, b| {
        a.average_cost()
            .total_cmp(&b.average_cost())
            .then_with(|| a.total_cost().total_cmp(&b.total_cost()))
            .then_with(|| a.airports().cmp(&b.airports()))
    });
    routes
}


#[cfg(test)]
mod proptests {
    use super::tests::{closed, key};
    use super::*;
    use proptest::prelude::*;

    const STOPS: [&str; 4] = ["BBB", "CCC", "DDD", "EEE"];

    /// A closed route from AAA through one to three distinct stops.
    fn route_strategy() -> impl Strategy<Value = ClosedRoute> {
        (
            prop::sample::subsequence(STOPS.to_vec(), 1..=3),
            prop::collection::vec(1.0f64..500.0, 4),
        )
            .prop_map(|(stops, costs)| {
                let mut path = vec!["AAA"];
                path.extend(stops);
                path.push("AAA");
                closed(&path, &costs[..path.len() - 1])
            })
    }

    proptest! {
        #[test]
        fn stored_cost_never_increases(routes in prop::collection::vec(route_strategy(), 1..40)) {
            let mut registry = ClosedRouteRegistry::new();
            let mut lowest: HashMap<CityKey, f64> = HashMap::new();

            for route in routes {
                let k = key(&route);
                let before = registry.get(&k).map(ClosedRoute::total_cost);
                let offered = route.total_cost();
                registry.record(k.clone(), route);
                let after = registry.get(&k).map(ClosedRoute::total_cost).unwrap();

                if let Some(before) = before {
                    prop_assert!(after <= before);
                }
                let best = lowest.entry(k).or_insert(offered);
                *best = best.min(offered);
                prop_assert_eq!(after, *best);
            }
        }

        #[test]
        fn ranking_is_sorted(routes in prop::collection::vec(route_strategy(), 0..20)) {
            let count = routes.len();
            let ranked = rank_routes(routes);

            prop_assert_eq!(ranked.len(), count);
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].average_cost() <= pair[1].average_cost());
            }
        }
    }
}
