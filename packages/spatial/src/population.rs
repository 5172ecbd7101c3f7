//! Population-density polygons (`osm_id`, `pop_dens`) from an OSM places
//! extract joined with census statistics.

use std::path::Path;

use crate::SpatialError;
use crate::features::{collect_layer, number_property, parse_features, read_features};
use crate::layer::PolygonLayer;

/// Population-density layer; each feature's attribute is its `pop_dens`
/// value (inhabitants per square kilometre).
pub type PopulationDensityLayer = PolygonLayer<f64>;

const DATASET: &str = "population density";

fn density(feature: &geojson::Feature) -> Option<f64> {
    number_property(feature, "pop_dens").filter(|value| value.is_finite() && *value >= 0.0)
}

/// Parses a places `FeatureCollection`.
///
/// # Errors
///
/// Returns [`SpatialError`] if the document is not a valid `GeoJSON`
/// feature collection.
pub fn parse_population_density(geojson_str: &str) -> Result<PopulationDensityLayer, SpatialError> {
    let features = parse_features(geojson_str)?;
    Ok(collect_layer(&features, DATASET, "pop_dens", density))
}

/// Loads the population-density layer from an optional file path.
///
/// Like [`crate::load_land_use`], failures degrade to an empty layer with
/// a warning.
#[must_use]
pub fn load_population_density(path: Option<&Path>) -> PopulationDensityLayer {
    let Some(path) = path else {
        log::warn!("Places file is not set. Using default values...");
        return PopulationDensityLayer::empty();
    };

    log::info!("Reading population density polygons from {}...", path.display());

    match read_features(path) {
        Ok(features) => {
            let layer = collect_layer(&features, DATASET, "pop_dens", density);
            log::info!(
                "Reading population density polygons... Done. {} polygons loaded.",
                layer.len()
            );
            layer
        }
        Err(e) => {
            log::warn!(
                "Could not read places file {}: {e}. Using default values...",
                path.display()
            );
            PopulationDensityLayer::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::coord;

    use super::*;

    #[test]
    fn negative_densities_are_skipped() {
        let layer = parse_population_density(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": { "osm_id": 1, "pop_dens": 4200.0 },
                        "geometry": { "type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]] }
                    },
                    {
                        "type": "Feature",
                        "properties": { "osm_id": 2, "pop_dens": -1 },
                        "geometry": { "type": "Polygon", "coordinates": [[[20,0],[30,0],[30,10],[20,10],[20,0]]] }
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(layer.len(), 1);
        let hit = layer.first_containing(coord! { x: 5.0, y: 5.0 }).unwrap();
        assert!((hit.attribute - 4200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unset_path_yields_empty_layer() {
        assert!(load_population_density(None).is_empty());
    }
}
