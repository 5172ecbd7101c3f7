#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reads a transport network from a JSON document.
//!
//! The expected layout is:
//!
//! ```json
//! {
//!   "nodes": [{ "id": "1", "x": 4595000.0, "y": 5821000.0 }],
//!   "links": [{ "id": "10", "from": "1", "to": "2",
//!               "length": 120.0, "freespeed": 13.89, "lanes": 2.0 }]
//! }
//! ```
//!
//! `length` may be omitted, in which case the straight-line distance
//! between the two nodes is used.

use std::path::Path;

use accidents_network_models::{Coord, Node, NodeId};
use serde::Deserialize;

pub use accidents_network_models::{Link, LinkId, Network};

/// Errors that can occur while reading a network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A link references a node that is not defined.
    #[error("Link {link} references unknown node {node}")]
    UnknownNode {
        /// Offending link id.
        link: String,
        /// Missing node id.
        node: String,
    },

    /// A link attribute is out of range.
    #[error("Link {link} has invalid {attribute}: {value}")]
    InvalidAttribute {
        /// Offending link id.
        link: String,
        /// Attribute name.
        attribute: &'static str,
        /// Rejected value.
        value: f64,
    },
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    id: String,
    from: String,
    to: String,
    length: Option<f64>,
    freespeed: f64,
    #[serde(default = "default_lanes")]
    lanes: f64,
}

const fn default_lanes() -> f64 {
    1.0
}

/// Reads and parses a network JSON file.
///
/// # Errors
///
/// Returns [`NetworkError`] if the file cannot be read, is not valid JSON,
/// or references undefined nodes.
pub fn load_network(path: &Path) -> Result<Network, NetworkError> {
    let contents = std::fs::read_to_string(path)?;
    let network = parse_network(&contents)?;
    log::info!(
        "Loaded network from {}: {} nodes, {} links",
        path.display(),
        network.node_count(),
        network.link_count()
    );
    Ok(network)
}

/// Parses a network from a JSON string.
///
/// # Errors
///
/// Returns [`NetworkError`] if the document is malformed, a link references
/// an undefined node, or a link attribute is negative or not finite.
pub fn parse_network(json: &str) -> Result<Network, NetworkError> {
    let raw: RawNetwork = serde_json::from_str(json)?;
    let mut network = Network::new();

    for node in raw.nodes {
        network.add_node(Node {
            id: NodeId(node.id),
            coord: Coord::new(node.x, node.y),
        });
    }

    for link in raw.links {
        let from = resolve_node(&network, &link.id, &link.from)?;
        let to = resolve_node(&network, &link.id, &link.to)?;
        let length = link.length.unwrap_or_else(|| from.coord.distance(to.coord));

        check_attribute(&link.id, "length", length)?;
        check_attribute(&link.id, "freespeed", link.freespeed)?;
        check_attribute(&link.id, "lanes", link.lanes)?;

        network.add_link(Link {
            id: link.id.into(),
            from,
            to,
            length,
            freespeed: link.freespeed,
            lanes: link.lanes,
        });
    }

    Ok(network)
}

fn resolve_node(network: &Network, link: &str, node: &str) -> Result<Node, NetworkError> {
    network
        .node(&NodeId(node.to_string()))
        .cloned()
        .ok_or_else(|| NetworkError::UnknownNode {
            link: link.to_string(),
            node: node.to_string(),
        })
}

fn check_attribute(link: &str, attribute: &'static str, value: f64) -> Result<(), NetworkError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NetworkError::InvalidAttribute {
            link: link.to_string(),
            attribute,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use accidents_network_models::LinkId;

    use super::*;

    const NETWORK: &str = r#"{
        "nodes": [
            { "id": "1", "x": 0.0, "y": 0.0 },
            { "id": "2", "x": 300.0, "y": 400.0 }
        ],
        "links": [
            { "id": "a", "from": "1", "to": "2", "length": 600.0, "freespeed": 13.89, "lanes": 2.0 },
            { "id": "b", "from": "2", "to": "1", "freespeed": 8.33 }
        ]
    }"#;

    #[test]
    fn parses_nodes_and_links() {
        let network = parse_network(NETWORK).unwrap();
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.link_count(), 2);

        let a = network.link(&LinkId::from("a")).unwrap();
        assert!((a.length - 600.0).abs() < f64::EPSILON);
        assert!((a.lanes - 2.0).abs() < f64::EPSILON);
        assert_eq!(a.to.coord, Coord::new(300.0, 400.0));
    }

    #[test]
    fn missing_length_falls_back_to_node_distance() {
        let network = parse_network(NETWORK).unwrap();
        let b = network.link(&LinkId::from("b")).unwrap();
        assert!((b.length - 500.0).abs() < 1e-9);
        assert!((b.lanes - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unknown_node() {
        let json = r#"{ "nodes": [], "links": [
            { "id": "x", "from": "1", "to": "2", "freespeed": 10.0 }
        ] }"#;
        let err = parse_network(json).unwrap_err();
        assert!(matches!(err, NetworkError::UnknownNode { .. }));
    }

    #[test]
    fn rejects_negative_lanes() {
        let json = r#"{
            "nodes": [{ "id": "1", "x": 0.0, "y": 0.0 }, { "id": "2", "x": 1.0, "y": 0.0 }],
            "links": [{ "id": "x", "from": "1", "to": "2", "freespeed": 10.0, "lanes": -1.0 }]
        }"#;
        let err = parse_network(json).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::InvalidAttribute {
                attribute: "lanes",
                ..
            }
        ));
    }
}
