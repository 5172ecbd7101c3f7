//! Ordered polygon layer with an R-tree over polygon envelopes.
//!
//! A layer keeps its features in load order. Every lookup answers with
//! the *first* feature in that order whose geometry contains the query
//! point, so results never depend on the R-tree's internal layout.

use geo::{Contains, Coord, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};

/// A polygon with its `osm_id` and the one attribute the layer cares
/// about (land-use class, population density, ...).
#[derive(Debug, Clone)]
pub struct PolygonFeature<T> {
    pub id: String,
    pub polygon: MultiPolygon<f64>,
    pub attribute: T,
}

/// Envelope of one feature, stored in the R-tree by position.
struct LayerEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for LayerEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Immutable collection of polygon features.
///
/// Constructed once at startup and only read afterwards. An empty layer
/// means "no data available" and never matches anything.
pub struct PolygonLayer<T> {
    features: Vec<PolygonFeature<T>>,
    tree: RTree<LayerEntry>,
}

impl<T> Default for PolygonLayer<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> PolygonLayer<T> {
    /// Builds a layer. Feature order is preserved and is the tie-breaker
    /// for overlapping polygons.
    #[must_use]
    pub fn new(features: Vec<PolygonFeature<T>>) -> Self {
        let entries = features
            .iter()
            .enumerate()
            .map(|(position, feature)| LayerEntry {
                position,
                envelope: compute_envelope(&feature.polygon),
            })
            .collect();

        Self {
            features,
            tree: RTree::bulk_load(entries),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            tree: RTree::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn features(&self) -> &[PolygonFeature<T>] {
        &self.features
    }

    /// Position (in load order) of the first feature containing `coord`.
    fn first_position_containing(&self, coord: Coord<f64>) -> Option<usize> {
        let point = Point::from(coord);
        let query_env = AABB::from_point([coord.x, coord.y]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| self.features[entry.position].polygon.contains(&point))
            .map(|entry| entry.position)
            .min()
    }

    /// The first feature (in load order) whose geometry contains `coord`.
    ///
    /// Points on a polygon boundary are not contained.
    #[must_use]
    pub fn first_containing(&self, coord: Coord<f64>) -> Option<&PolygonFeature<T>> {
        self.first_position_containing(coord)
            .map(|position| &self.features[position])
    }

    /// The first feature (in load order) containing *any* of `coords`.
    ///
    /// Equivalent to scanning features in order and testing each one
    /// against every point.
    #[must_use]
    pub fn first_containing_any(&self, coords: &[Coord<f64>]) -> Option<&PolygonFeature<T>> {
        coords
            .iter()
            .filter_map(|coord| self.first_position_containing(*coord))
            .min()
            .map(|position| &self.features[position])
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
