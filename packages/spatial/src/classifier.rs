//! Finds the polygon a link lies in.
//!
//! Lookup order for a link:
//!
//! 1. the link midpoint, then its start node, then its end node, each
//!    transformed into the layer's CRS;
//! 2. an expanding ring search around the midpoint: at every distance
//!    (10, 20, ... 500 planar units) eight compass points are offset in the
//!    planar CRS and transformed back. The first distance at which any
//!    polygon contains any of the eight points wins.
//!
//! Within each step ties resolve to the earliest polygon in load order.

use accidents_network_models::{Coord as NetworkCoord, Link};
use geo::Coord;

use crate::SpatialError;
use crate::crs::{CoordinateTransformation, Crs};
use crate::layer::{PolygonFeature, PolygonLayer};

/// First ring search distance, and the increment between rings.
pub const RING_SEARCH_STEP: f64 = 10.0;

/// Largest ring search distance tried (inclusive).
pub const RING_SEARCH_MAX_DISTANCE: f64 = 500.0;

/// Which lookup step produced a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Midpoint,
    Start,
    End,
    /// Ring search, at the given planar distance from the midpoint.
    Ring { distance: f64 },
}

/// A polygon matched for a link.
#[derive(Debug, Clone, Copy)]
pub struct LayerMatch<'a, T> {
    pub feature: &'a PolygonFeature<T>,
    pub kind: MatchKind,
}

/// Offsets of the eight ring points, in test order: right, down, left, up,
/// up-right, down-right, down-left, up-left.
const RING_DIRECTIONS: [(f64, f64); 8] = [
    (1.0, 0.0),
    (0.0, -1.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (1.0, 1.0),
    (1.0, -1.0),
    (-1.0, -1.0),
    (-1.0, 1.0),
];

/// The eight ring points at `distance` around `center`.
#[must_use]
pub fn ring_points(center: Coord<f64>, distance: f64) -> [Coord<f64>; 8] {
    RING_DIRECTIONS.map(|(dx, dy)| Coord {
        x: dx.mul_add(distance, center.x),
        y: dy.mul_add(distance, center.y),
    })
}

/// Lazy sequence of `(distance, ring points)` from the first ring out to
/// [`RING_SEARCH_MAX_DISTANCE`].
pub fn ring_search(center: Coord<f64>) -> impl Iterator<Item = (f64, [Coord<f64>; 8])> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rings = (RING_SEARCH_MAX_DISTANCE / RING_SEARCH_STEP).round() as u32;

    (1..=rings).map(move |ring| {
        let distance = f64::from(ring) * RING_SEARCH_STEP;
        (distance, ring_points(center, distance))
    })
}

/// Link-to-polygon lookup with fixed CRS transformations.
///
/// Holds no mutable state: classifying one link never affects another.
#[derive(Debug, Clone, Copy)]
pub struct SpatialClassifier {
    network_to_layer: CoordinateTransformation,
    layer_to_planar: CoordinateTransformation,
}

impl SpatialClassifier {
    /// `network_crs` is the CRS of link coordinates, `layer_crs` the CRS of
    /// the polygon layers and `planar_crs` a metric CRS used only to offset
    /// ring search points.
    #[must_use]
    pub const fn new(network_crs: Crs, layer_crs: Crs, planar_crs: Crs) -> Self {
        Self {
            network_to_layer: CoordinateTransformation::new(network_crs, layer_crs),
            layer_to_planar: CoordinateTransformation::new(layer_crs, planar_crs),
        }
    }

    /// Builds a classifier from EPSG identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::UnsupportedCrs`] if any identifier is not
    /// supported.
    pub fn from_codes(
        network_crs: &str,
        layer_crs: &str,
        planar_crs: &str,
    ) -> Result<Self, SpatialError> {
        Ok(Self::new(
            network_crs.parse()?,
            layer_crs.parse()?,
            planar_crs.parse()?,
        ))
    }

    /// Transforms a network coordinate into the layer CRS.
    #[must_use]
    pub fn to_layer_crs(&self, coord: NetworkCoord) -> Coord<f64> {
        self.network_to_layer.transform(Coord {
            x: coord.x,
            y: coord.y,
        })
    }

    /// The polygon containing `coord` (a network coordinate), without any
    /// ring search.
    #[must_use]
    pub fn locate<'a, T>(
        &self,
        coord: NetworkCoord,
        layer: &'a PolygonLayer<T>,
    ) -> Option<&'a PolygonFeature<T>> {
        if layer.is_empty() {
            return None;
        }
        layer.first_containing(self.to_layer_crs(coord))
    }

    /// Finds the polygon `link` lies in or next to. Returns `None` for an
    /// empty layer or when the ring search is exhausted.
    #[must_use]
    pub fn classify<'a, T>(
        &self,
        link: &Link,
        layer: &'a PolygonLayer<T>,
    ) -> Option<LayerMatch<'a, T>> {
        if layer.is_empty() {
            return None;
        }

        let middle = self.to_layer_crs(link.coord());
        let candidates = [
            (middle, MatchKind::Midpoint),
            (self.to_layer_crs(link.from.coord), MatchKind::Start),
            (self.to_layer_crs(link.to.coord), MatchKind::End),
        ];

        for (point, kind) in candidates {
            if let Some(feature) = layer.first_containing(point) {
                return Some(LayerMatch { feature, kind });
            }
        }

        self.search_around(middle, layer)
    }

    fn search_around<'a, T>(
        &self,
        middle: Coord<f64>,
        layer: &'a PolygonLayer<T>,
    ) -> Option<LayerMatch<'a, T>> {
        let to_layer = self.layer_to_planar.inverse();
        let planar_middle = self.layer_to_planar.transform(middle);

        ring_search(planar_middle).find_map(|(distance, ring)| {
            let ring = ring.map(|point| to_layer.transform(point));
            layer
                .first_containing_any(&ring)
                .map(|feature| LayerMatch {
                    feature,
                    kind: MatchKind::Ring { distance },
                })
        })
    }
}
