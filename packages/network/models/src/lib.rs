#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transport network types shared across the accident-cost workspace.
//!
//! A [`Network`] is a read-only collection of directed [`Link`]s. Each link
//! carries the coordinates of its two end nodes (in the network's
//! coordinate reference system), its length, free-flow speed and lane
//! count. Nothing in the accident pipeline mutates a network.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a network link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub String);

impl LinkId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LinkId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LinkId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a network node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A planar or geographic coordinate in the network CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// Easting (or longitude for geographic systems).
    pub x: f64,
    /// Northing (or latitude for geographic systems).
    pub y: f64,
}

impl Coord {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point halfway between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Straight-line distance to `other`, in CRS units.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A network node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub coord: Coord,
}

/// A directed network link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: Node,
    pub to: Node,
    /// Length in meters.
    pub length: f64,
    /// Free-flow speed in meters per second.
    pub freespeed: f64,
    /// Number of lanes. May be fractional.
    pub lanes: f64,
}

impl Link {
    /// Representative coordinate of the link (midpoint of its end nodes).
    #[must_use]
    pub fn coord(&self) -> Coord {
        self.from.coord.midpoint(self.to.coord)
    }
}

/// A read-only collection of links keyed by id.
///
/// Links are kept in a [`BTreeMap`] so every iteration over the network
/// visits them in the same order.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
}

impl Network {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a node.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Adds (or replaces) a link.
    pub fn add_link(&mut self, link: Link) {
        self.links.insert(link.id.clone(), link);
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn link(&self, id: &LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    /// Iterates links in id order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node {
            id: id.into(),
            coord: Coord::new(x, y),
        }
    }

    #[test]
    fn link_coord_is_midpoint_of_end_nodes() {
        let link = Link {
            id: "l1".into(),
            from: node("a", 0.0, 0.0),
            to: node("b", 100.0, 50.0),
            length: 111.8,
            freespeed: 13.9,
            lanes: 1.0,
        };
        assert_eq!(link.coord(), Coord::new(50.0, 25.0));
    }

    #[test]
    fn links_iterate_in_id_order() {
        let mut network = Network::new();
        for id in ["c", "a", "b"] {
            network.add_link(Link {
                id: id.into(),
                from: node("n1", 0.0, 0.0),
                to: node("n2", 1.0, 0.0),
                length: 1.0,
                freespeed: 1.0,
                lanes: 1.0,
            });
        }
        let ids: Vec<&str> = network.links().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn distance_is_euclidean() {
        assert!((Coord::new(0.0, 0.0).distance(Coord::new(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }
}
