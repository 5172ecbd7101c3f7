#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory polygon layers for link area attribution.
//!
//! Loads land-use and population-density polygons from `GeoJSON` at
//! startup, builds R-tree indexes over their envelopes, and answers
//! "which polygon contains this link?" with an expanding ring search
//! fallback for links that lie just outside any polygon.
//!
//! Lookups are read-only; a [`PolygonLayer`] can be shared across threads
//! without locking.

pub mod classifier;
pub mod crs;
mod features;
pub mod land_use;
pub mod layer;
pub mod population;

pub use classifier::{LayerMatch, MatchKind, SpatialClassifier};
pub use crs::{CoordinateTransformation, Crs};
pub use land_use::{LandUseLayer, load_land_use, parse_land_use};
pub use layer::{PolygonFeature, PolygonLayer};
pub use population::{PopulationDensityLayer, load_population_density, parse_population_density};

/// Errors that can occur while loading polygon layers or building
/// transformations.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The document parsed but is not a feature collection.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// Unknown or unsupported coordinate reference system identifier.
    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),
}
