//! `GeoJSON` feature reading shared by the land-use and population layers.

use std::path::Path;

use geo::MultiPolygon;
use geojson::{Feature, GeoJson, JsonValue};

use crate::SpatialError;
use crate::layer::{PolygonFeature, PolygonLayer};

/// Reads every feature of a `GeoJSON` `FeatureCollection` file.
pub fn read_features(path: &Path) -> Result<Vec<Feature>, SpatialError> {
    let contents = std::fs::read_to_string(path)?;
    parse_features(&contents)
}

/// Parses a `GeoJSON` `FeatureCollection` (a lone `Feature` is accepted as a
/// collection of one).
pub fn parse_features(geojson_str: &str) -> Result<Vec<Feature>, SpatialError> {
    match geojson_str.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(SpatialError::NotAFeatureCollection),
    }
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Reads a property as a string. Numeric ids (common for `osm_id`) are
/// rendered without a fractional part.
pub fn string_property(feature: &Feature, name: &str) -> Option<String> {
    match feature.property(name)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a property as a number, accepting numeric strings.
pub fn number_property(feature: &Feature, name: &str) -> Option<f64> {
    match feature.property(name)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds a [`PolygonLayer`] from features, keeping document order.
///
/// Features without an `osm_id`, without the attribute read by
/// `attribute`, or without areal geometry are skipped with a warning.
pub fn collect_layer<T>(
    features: &[Feature],
    dataset: &str,
    attribute_name: &str,
    attribute: impl Fn(&Feature) -> Option<T>,
) -> PolygonLayer<T> {
    let mut entries = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for (position, feature) in features.iter().enumerate() {
        let Some(osm_id) = string_property(feature, "osm_id") else {
            log::warn!("{dataset}: feature #{position} has no osm_id, skipping");
            skipped += 1;
            continue;
        };

        let Some(value) = attribute(feature) else {
            log::warn!("{dataset}: feature {osm_id} has no usable {attribute_name}, skipping");
            skipped += 1;
            continue;
        };

        let Some(polygon) = to_multipolygon(feature) else {
            log::warn!("{dataset}: feature {osm_id} has no polygon geometry, skipping");
            skipped += 1;
            continue;
        };

        entries.push(PolygonFeature {
            id: osm_id,
            polygon,
            attribute: value,
        });
    }

    if skipped > 0 {
        log::warn!("{dataset}: skipped {skipped} of {} features", features.len());
    }

    PolygonLayer::new(entries)
}
