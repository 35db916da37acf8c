//! Waypoint skeletons.
//!
//! When a search must pass through given airports, the planner works out
//! ahead of time which airport sequences could possibly reach all of them,
//! ignoring price and schedule. The search then drops any continuation that
//! is inconsistent with every such "skeleton".

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::domain::AirportCode;
use crate::fares::{FareError, FareSource};

/// Airport sequences a route must follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skeletons {
    /// No waypoints: every route is acceptable.
    Unconstrained,

    /// A route must start with one of these sequences. An empty set means
    /// the waypoints cannot be reached at all.
    Required(BTreeSet<Vec<AirportCode>>),
}

impl Skeletons {
    /// Whether a route whose airports so far are `prefix` (root first) can
    /// still end up following some skeleton.
    pub fn admits(&self, prefix: &[AirportCode]) -> bool {
        match self {
            Skeletons::Unconstrained => true,
            Skeletons::Required(set) => set
                .iter()
                .any(|s| s.starts_with(prefix) || prefix.starts_with(s)),
        }
    }

    /// Whether a complete route with these airports follows some skeleton.
    pub fn satisfied_by(&self, airports: &[AirportCode]) -> bool {
        match self {
            Skeletons::Unconstrained => true,
            Skeletons::Required(set) => set.iter().any(|s| airports.starts_with(s)),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Skeletons::Unconstrained)
    }
}

/// Finds connecting paths over the direct-destination relation.
pub struct WaypointPlanner<'a, S> {
    source: &'a S,
    max_depth: usize,
    smallest: HashMap<(AirportCode, AirportCode), BTreeSet<Vec<AirportCode>>>,
}

impl<'a, S: FareSource> WaypointPlanner<'a, S> {
    /// `max_depth` bounds how many intermediate stops
    /// [`smallest_connecting_paths`](Self::smallest_connecting_paths) will try.
    pub fn new(source: &'a S, max_depth: usize) -> Self {
        Self {
            source,
            max_depth,
            smallest: HashMap::new(),
        }
    }

    /// Every simple path from `src` to `dst` with at most `max_depth + 1`
    /// hops that never enters `excluded`.
    pub async fn connecting_paths(
        &self,
        src: AirportCode,
        dst: AirportCode,
        max_depth: usize,
        excluded: &HashSet<AirportCode>,
    ) -> Result<BTreeSet<Vec<AirportCode>>, FareError> {
        let mut found = BTreeSet::new();
        if src == dst {
            return Ok(found);
        }

        let max_hops = max_depth + 1;
        let mut stack = vec![vec![src]];

        while let Some(path) = stack.pop() {
            let Some(&here) = path.last() else {
                continue;
            };
            if here == dst {
                found.insert(path);
                continue;
            }
            if path.len() > max_hops {
                continue;
            }

            for next in self.source.destinations(here).await? {
                if excluded.contains(&next) || path.contains(&next) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(next);
                stack.push(extended);
            }
        }

        Ok(found)
    }

    /// Paths at the shallowest depth that has any, trying depths
    /// `0..=max_depth`. Empty when `dst` is not reachable within the bound.
    pub async fn smallest_connecting_paths(
        &mut self,
        src: AirportCode,
        dst: AirportCode,
        excluded: &HashSet<AirportCode>,
    ) -> Result<BTreeSet<Vec<AirportCode>>, FareError> {
        if let Some(paths) = self.smallest.get(&(src, dst)) {
            return Ok(paths.clone());
        }

        let mut paths = BTreeSet::new();
        for depth in 0..=self.max_depth {
            paths = self.connecting_paths(src, dst, depth, excluded).await?;
            if !paths.is_empty() {
                break;
            }
        }

        self.smallest.insert((src, dst), paths.clone());
        Ok(paths)
    }

    /// Skeletons from `origin` through every airport in `via`, in any order.
    pub async fn enumerate_starts(
        &mut self,
        origin: AirportCode,
        via: &[AirportCode],
        excluded: &HashSet<AirportCode>,
    ) -> Result<Skeletons, FareError> {
        if via.is_empty() {
            return Ok(Skeletons::Unconstrained);
        }

        // Memoized pairs are only valid for one exclusion set.
        self.smallest.clear();

        let mut skeletons = BTreeSet::new();
        for order in permutations(via) {
            let mut partial: Vec<Vec<AirportCode>> = vec![vec![origin]];
            let mut from = origin;

            for &to in &order {
                let segments = self.smallest_connecting_paths(from, to, excluded).await?;
                partial = partial
                    .iter()
                    .flat_map(|prefix| segments.iter().map(move |segment| join(prefix, segment)))
                    .filter(|path| is_simple(path))
                    .collect();
                if partial.is_empty() {
                    break;
                }
                from = to;
            }

            skeletons.extend(partial);
        }

        debug!(
            origin = %origin,
            waypoints = via.len(),
            skeletons = skeletons.len(),
            "Enumerated waypoint skeletons"
        );
        Ok(Skeletons::Required(skeletons))
    }
}

/// `prefix` followed by `segment` without its first airport, which is the
/// last airport of `prefix`.
fn join(prefix: &[AirportCode], segment: &[AirportCode]) -> Vec<AirportCode> {
    let mut path = prefix.to_vec();
    path.extend(segment.iter().skip(1));
    path
}

fn is_simple(path: &[AirportCode]) -> bool {
    let distinct: HashSet<&AirportCode> = path.iter().collect();
    distinct.len() == path.len()
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first.clone());
            result.push(tail);
        }
    }
    result
}
