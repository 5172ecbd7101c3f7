//! Land-use polygons (`osm_id`, `fclass`) from an OSM land-use extract.

use std::path::Path;

use crate::SpatialError;
use crate::features::{collect_layer, parse_features, read_features, string_property};
use crate::layer::PolygonLayer;

/// Land-use layer; each feature's attribute is its `fclass` value.
pub type LandUseLayer = PolygonLayer<String>;

const DATASET: &str = "land use";

/// Parses a land-use `FeatureCollection`.
///
/// # Errors
///
/// Returns [`SpatialError`] if the document is not a valid `GeoJSON`
/// feature collection.
pub fn parse_land_use(geojson_str: &str) -> Result<LandUseLayer, SpatialError> {
    let features = parse_features(geojson_str)?;
    Ok(collect_layer(&features, DATASET, "fclass", |feature| {
        string_property(feature, "fclass")
    }))
}

/// Loads the land-use layer from an optional file path.
///
/// A missing path, an unreadable file or an unparsable document is not
/// fatal: a warning is logged and an empty layer is returned, so every
/// link falls back to default area classification.
#[must_use]
pub fn load_land_use(path: Option<&Path>) -> LandUseLayer {
    let Some(path) = path else {
        log::warn!("Land use file is not set. Using default values...");
        return LandUseLayer::empty();
    };

    log::info!("Reading land use polygons from {}...", path.display());

    match read_features(path) {
        Ok(features) => {
            let layer = collect_layer(&features, DATASET, "fclass", |feature| {
                string_property(feature, "fclass")
            });
            log::info!(
                "Reading land use polygons... Done. {} polygons loaded.",
                layer.len()
            );
            layer
        }
        Err(e) => {
            log::warn!(
                "Could not read land use file {}: {e}. Using default values...",
                path.display()
            );
            LandUseLayer::empty()
        }
    }
}
