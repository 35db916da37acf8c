//! Lazy search tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Each node below
//! the root holds the flight that reaches it, so the path from the root to a
//! node is a partial route. Nodes start out [`NodeState::Unexplored`]; once
//! expanded they hold their children keyed by flight, and a node with no
//! viable continuation becomes [`NodeState::Dead`] for good.
//!
//! Pruning lags by one pass: a node that finds itself childless marks itself
//! dead and yields nothing, and its parent drops it the next time selection
//! reaches it.

use std::collections::BTreeMap;

use crate::domain::{Flight, FlightKey, average_cost};

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub enum NodeState {
    /// Not expanded yet.
    Unexplored,
    /// Expanded, with the children still worth exploring.
    Expanded(BTreeMap<FlightKey, NodeId>),
    /// No viable continuation. Terminal.
    Dead,
}

#[derive(Debug)]
struct Node {
    flight: Option<Flight>,
    parent: Option<NodeId>,
    state: NodeState,
}

/// Outcome of one selection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    /// The whole subtree is dead.
    Dead,
    /// Nothing to expand this pass, but pruning is still settling.
    Idle,
    /// The unexplored node whose path has the lowest average cost.
    Frontier { node: NodeId, average_cost: f64 },
}

#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTree {
    /// A tree holding only the unexplored root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                flight: None,
                parent: None,
                state: NodeState::Unexplored,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total nodes ever created, dead ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn state(&self, id: NodeId) -> &NodeState {
        &self.nodes[id.0].state
    }

    pub fn is_dead(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].state, NodeState::Dead)
    }

    /// Whether the root has been proven dead.
    pub fn is_exhausted(&self) -> bool {
        self.is_dead(self.root())
    }

    pub fn flight(&self, id: NodeId) -> Option<&Flight> {
        self.nodes[id.0].flight.as_ref()
    }

    /// Nodes from just below the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if self.nodes[node.0].flight.is_some() {
                path.push(node);
            }
            current = self.nodes[node.0].parent;
        }
        path.reverse();
        path
    }

    /// The flights on the path from the root to `id`.
    pub fn route(&self, id: NodeId) -> Vec<Flight> {
        self.path(id)
            .into_iter()
            .filter_map(|node| self.nodes[node.0].flight.clone())
            .collect()
    }

    /// Expand `id` with `flights` as fresh unexplored children.
    ///
    /// Flights sharing a [`FlightKey`] collapse to the cheapest observation.
    /// With no flights the node becomes dead. Dead nodes are never revived.
    /// Returns the number of children added.
    pub fn attach(&mut self, id: NodeId, flights: Vec<Flight>) -> usize {
        let mut unique: BTreeMap<FlightKey, Flight> = BTreeMap::new();
        for flight in flights {
            match unique.get(&flight.key()) {
                Some(seen) if seen.normalized_cost() <= flight.normalized_cost() => {}
                _ => {
                    unique.insert(flight.key(), flight);
                }
            }
        }

        let mut children = match std::mem::replace(&mut self.nodes[id.0].state, NodeState::Dead) {
            NodeState::Dead => return 0,
            NodeState::Unexplored => BTreeMap::new(),
            NodeState::Expanded(children) => children,
        };

        let mut added = 0;
        for (key, flight) in unique {
            if children.contains_key(&key) {
                continue;
            }
            let child = NodeId(self.nodes.len());
            self.nodes.push(Node {
                flight: Some(flight),
                parent: Some(id),
                state: NodeState::Unexplored,
            });
            children.insert(key, child);
            added += 1;
        }

        if !children.is_empty() {
            self.nodes[id.0].state = NodeState::Expanded(children);
        }
        added
    }

    /// Find the next node to expand, pruning dead children on the way.
    pub fn select_frontier(&mut self) -> Selection {
        let mut costs = Vec::new();
        self.select(self.root(), &mut costs)
    }

    /// `costs` holds the normalized cost of each leg on the path to `id`.
    fn select(&mut self, id: NodeId, costs: &mut Vec<f64>) -> Selection {
        let children: Vec<(FlightKey, NodeId)> = match &self.nodes[id.0].state {
            NodeState::Dead => return Selection::Dead,
            NodeState::Unexplored => {
                return Selection::Frontier {
                    node: id,
                    average_cost: average_cost(costs),
                };
            }
            NodeState::Expanded(children) => children.iter().map(|(k, c)| (*k, *c)).collect(),
        };

        let mut best: Option<(NodeId, f64)> = None;
        let mut dead = Vec::new();

        for (key, child) in children {
            let cost = self.nodes[child.0]
                .flight
                .as_ref()
                .map_or(0.0, Flight::normalized_cost);
            costs.push(cost);
            let selection = self.select(child, costs);
            costs.pop();

            match selection {
                Selection::Dead => dead.push(key),
                Selection::Idle => {}
                Selection::Frontier { node, average_cost } => {
                    if best.is_none_or(|(_, lowest)| average_cost < lowest) {
                        best = Some((node, average_cost));
                    }
                }
            }
        }

        let mut now_empty = false;
        if let NodeState::Expanded(children) = &mut self.nodes[id.0].state {
            for key in &dead {
                children.remove(key);
            }
            now_empty = children.is_empty();
        }
        if now_empty {
            self.nodes[id.0].state = NodeState::Dead;
            return Selection::Idle;
        }

        match best {
            Some((node, average_cost)) => Selection::Frontier { node, average_cost },
            None => Selection::Idle,
        }
    }
}
