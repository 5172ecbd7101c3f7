//! The accident pipeline across the simulation lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use accidents_costing_models::{AccidentLinkInfo, AccidentsConfig};
use accidents_network_models::{Link, Network};
use accidents_spatial::{
    LandUseLayer, PopulationDensityLayer, SpatialClassifier, load_land_use,
    load_population_density,
};

use crate::AccidentError;
use crate::aggregate::{CostSettings, run_for_iteration};
use crate::classification::{OverrideLists, build_classification};
use crate::config::validate;
use crate::context::AccidentContext;
use crate::demand::DemandProvider;
use crate::formula::CostFormulaRegistry;
use crate::progress::{ProgressCallback, null_progress};
use crate::report;

/// Links between two "Link #N" progress log lines during startup.
const LOG_EVERY_LINKS: usize = 100;

/// Owns the [`AccidentContext`] of one simulation run and drives it
/// through startup, per-iteration costing and reporting.
pub struct AccidentPipeline {
    config: AccidentsConfig,
    settings: CostSettings,
    classifier: SpatialClassifier,
    overrides: OverrideLists,
    formulas: CostFormulaRegistry,
    context: AccidentContext,
    output_dir: Option<PathBuf>,
    progress: Arc<dyn ProgressCallback>,
}

impl AccidentPipeline {
    /// Validates `config` and prepares the coordinate transformations.
    ///
    /// # Errors
    ///
    /// Returns [`AccidentError`] if a config value is out of range or a
    /// CRS is not supported.
    pub fn new(config: AccidentsConfig) -> Result<Self, AccidentError> {
        validate(&config)?;
        let classifier = SpatialClassifier::from_codes(
            &config.network_crs,
            &config.osm_crs,
            &config.planar_crs,
        )?;

        Ok(Self {
            settings: CostSettings::from_config(&config),
            overrides: OverrideLists::from_config(&config),
            classifier,
            formulas: CostFormulaRegistry::default(),
            context: AccidentContext::new(),
            output_dir: None,
            progress: null_progress(),
            config,
        })
    }

    /// Replaces the built-in formula registry.
    #[must_use]
    pub fn with_formulas(mut self, formulas: CostFormulaRegistry) -> Self {
        self.formulas = formulas;
        self
    }

    /// Writes reports under `output_dir`. Without it nothing is written.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AccidentsConfig {
        &self.config
    }

    #[must_use]
    pub const fn settings(&self) -> &CostSettings {
        &self.settings
    }

    #[must_use]
    pub const fn context(&self) -> &AccidentContext {
        &self.context
    }

    #[must_use]
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Loads the configured polygon layers and classifies every link.
    ///
    /// # Errors
    ///
    /// See [`Self::startup_with_layers`].
    pub fn notify_startup(&mut self, network: &Network) -> Result<(), AccidentError> {
        self.formulas.resolve(&self.config.computation_method)?;

        let land_use = load_land_use(self.config.land_use_file.as_deref());
        let places = load_population_density(self.config.places_file.as_deref());
        self.startup_with_layers(network, &land_use, &places)
    }

    /// Classifies every link of `network` against already loaded layers.
    ///
    /// Runs once per pipeline: a second call leaves the context as it is.
    ///
    /// # Errors
    ///
    /// Returns [`AccidentError::UnknownComputationMethod`] if the
    /// configured method is not registered, or an I/O error if the
    /// classification report cannot be written.
    pub fn startup_with_layers(
        &mut self,
        network: &Network,
        land_use: &LandUseLayer,
        places: &PopulationDensityLayer,
    ) -> Result<(), AccidentError> {
        self.formulas.resolve(&self.config.computation_method)?;

        if !self.context.is_empty() {
            log::warn!("Link information is already initialized; skipping startup");
            return Ok(());
        }

        let total = network.link_count();
        log::info!("Initializing all link-specific information...");
        self.progress.set_total(total as u64);

        for (index, link) in network.links().enumerate() {
            if index % LOG_EVERY_LINKS == 0 {
                log::info!("Link #{index} ({}%)", index * 100 / total);
            }

            let info = self.classify_link(link, land_use, places);
            self.context.insert(info);
            self.progress.inc(1);
        }

        log::info!("Initializing all link-specific information... Done.");
        self.progress.finish(format!("Classified {total} links"));

        if let Some(output_dir) = &self.output_dir {
            report::write_classification_report(output_dir, &self.context)?;
        }

        Ok(())
    }

    fn classify_link(
        &self,
        link: &Link,
        land_use: &LandUseLayer,
        places: &PopulationDensityLayer,
    ) -> AccidentLinkInfo {
        let land_use_class = self.classifier.classify(link, land_use).map(|found| {
            log::trace!(
                "Link {}: land use {} ({:?})",
                link.id,
                found.feature.attribute,
                found.kind
            );
            found.feature.attribute.as_str()
        });

        if land_use_class.is_none() && !land_use.is_empty() {
            log::warn!("No area type found for link {}. Using default value.", link.id);
        }

        let classification = build_classification(link, &self.overrides, land_use_class);
        let population_density = self
            .classifier
            .locate(link.coord(), places)
            .map(|feature| feature.attribute);

        log::debug!("Link {} classified as {classification}", link.id);

        AccidentLinkInfo::new(
            link.id.clone(),
            classification,
            self.config.computation_method.clone(),
            population_density,
        )
    }

    /// Recomputes all time-bin costs from this iteration's demand.
    /// Returns the iteration's total cost.
    ///
    /// # Errors
    ///
    /// See [`run_for_iteration`].
    pub fn notify_after_mobsim(
        &mut self,
        network: &Network,
        demand: &dyn DemandProvider,
    ) -> Result<f64, AccidentError> {
        run_for_iteration(
            &mut self.context,
            network,
            demand,
            &self.formulas,
            &self.settings,
        )
    }

    /// Writes the cost report of `iteration` if an output directory is
    /// set. Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`AccidentError`] if the report cannot be written.
    pub fn notify_iteration_ends(&self, iteration: u32) -> Result<Option<PathBuf>, AccidentError> {
        let Some(output_dir) = &self.output_dir else {
            return Ok(None);
        };

        report::write_iteration_report(
            output_dir,
            iteration,
            &self.config.computation_method,
            &self.context,
            &self.settings,
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use accidents_costing_models::{AreaType, RoadGeometry};
    use accidents_network_models::{Coord, LinkId, Node, NodeId};
    use accidents_spatial::{parse_land_use, parse_population_density};

    use super::*;

    const PLANAR: &str = "EPSG:31468";

    fn config() -> AccidentsConfig {
        AccidentsConfig {
            time_bin_size: 3600.0,
            max_time: 86_400.0,
            network_crs: PLANAR.to_string(),
            osm_crs: PLANAR.to_string(),
            planar_crs: PLANAR.to_string(),
            ..AccidentsConfig::default()
        }
    }

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node {
            id: NodeId::from(id),
            coord: Coord::new(x, y),
        }
    }

    fn link(id: &str, from: &Node, to: &Node, freespeed: f64, lanes: f64) -> Link {
        Link {
            id: LinkId::from(id),
            from: from.clone(),
            to: to.clone(),
            length: from.coord.distance(to.coord),
            freespeed,
            lanes,
        }
    }

    /// Link "1" runs through a commercial square; link "2" lies 445 m
    /// north of a residential square; link "3" is far from everything.
    fn network() -> Network {
        let a = node("a", 4_468_000.0, 5_333_000.0);
        let b = node("b", 4_469_000.0, 5_333_000.0);
        let c = node("c", 4_468_000.0, 5_336_450.0);
        let d = node("d", 4_468_100.0, 5_336_450.0);
        let e = node("e", 4_480_000.0, 5_350_000.0);
        let f = node("f", 4_480_100.0, 5_350_000.0);

        let mut network = Network::new();
        network.add_link(link("1", &a, &b, 30.0, 2.0));
        network.add_link(link("2", &c, &d, 10.0, 1.0));
        network.add_link(link("3", &e, &f, 10.0, 7.0));
        for node in [a, b, c, d, e, f] {
            network.add_node(node);
        }
        network
    }

    fn square(osm_id: u32, property: &str, min: (f64, f64), max: (f64, f64)) -> String {
        format!(
            r#"{{
                "type": "Feature",
                "properties": {{ "osm_id": {osm_id}, {property} }},
                "geometry": {{
                    "type": "Polygon",
                    "coordinates": [[
                        [{x0}, {y0}], [{x1}, {y0}], [{x1}, {y1}], [{x0}, {y1}], [{x0}, {y0}]
                    ]]
                }}
            }}"#,
            x0 = min.0,
            y0 = min.1,
            x1 = max.0,
            y1 = max.1,
        )
    }

    fn collection(features: &[String]) -> String {
        format!(
            r#"{{ "type": "FeatureCollection", "features": [{}] }}"#,
            features.join(",")
        )
    }

    fn land_use() -> LandUseLayer {
        parse_land_use(&collection(&[
            square(
                1,
                r#""fclass": "commercial""#,
                (4_467_500.0, 5_332_500.0),
                (4_469_500.0, 5_333_500.0),
            ),
            square(
                2,
                r#""fclass": "residential""#,
                (4_467_000.0, 5_335_000.0),
                (4_469_000.0, 5_336_005.0),
            ),
        ]))
        .unwrap()
    }

    fn places() -> PopulationDensityLayer {
        parse_population_density(&collection(&[square(
            10,
            r#""pop_dens": 2500.0"#,
            (4_467_000.0, 5_332_000.0),
            (4_470_000.0, 5_334_000.0),
        )]))
        .unwrap()
    }

    fn started(config: AccidentsConfig) -> AccidentPipeline {
        let mut pipeline = AccidentPipeline::new(config).unwrap();
        pipeline
            .startup_with_layers(&network(), &land_use(), &places())
            .unwrap();
        pipeline
    }

    fn demand_in_bin_five(link: &LinkId, bin: usize) -> f64 {
        if link.as_str() == "1" && bin == 5 {
            100.0
        } else {
            0.0
        }
    }

    #[test]
    fn startup_classifies_every_link() {
        let pipeline = started(config());
        let context = pipeline.context();
        assert_eq!(context.len(), 3);

        let first = context.get(&LinkId::from("1")).unwrap();
        assert_eq!(first.classification.as_vector(), [1, 1, 2]);
        assert_eq!(first.population_density, Some(2500.0));
        assert_eq!(first.computation_method, "BVWP");

        // Found by the 450 m ring.
        let second = context.get(&LinkId::from("2")).unwrap();
        assert_eq!(second.classification.area_type, AreaType::BuiltUpOther);
        assert_eq!(second.population_density, None);

        let third = context.get(&LinkId::from("3")).unwrap();
        assert_eq!(third.classification.as_vector(), [1, 2, 4]);
    }

    #[test]
    fn classification_is_deterministic() {
        let first = started(config());
        let second = started(config());
        assert_eq!(first.context(), second.context());
    }

    #[test]
    fn override_lists_set_road_geometry() {
        let pipeline = started(AccidentsConfig {
            plan_free_link_ids: vec!["1".to_string(), "2".to_string()],
            tunnel_link_ids: vec!["2".to_string()],
            ..config()
        });
        let context = pipeline.context();
        assert_eq!(
            context.get(&LinkId::from("1")).unwrap().classification.road_geometry,
            RoadGeometry::PlanFree
        );
        assert_eq!(
            context.get(&LinkId::from("2")).unwrap().classification.road_geometry,
            RoadGeometry::Tunnel
        );
        assert_eq!(
            context.get(&LinkId::from("3")).unwrap().classification.road_geometry,
            RoadGeometry::PlanEqual
        );
    }

    #[test]
    fn missing_layers_fall_back_to_not_built_up() {
        let mut pipeline = AccidentPipeline::new(config()).unwrap();
        pipeline
            .startup_with_layers(
                &network(),
                &LandUseLayer::empty(),
                &PopulationDensityLayer::empty(),
            )
            .unwrap();

        let first = pipeline.context().get(&LinkId::from("1")).unwrap();
        assert_eq!(first.classification.as_vector(), [1, 0, 2]);
        assert_eq!(first.population_density, None);
    }

    #[test]
    fn startup_without_layer_files_uses_defaults() {
        let mut pipeline = AccidentPipeline::new(config()).unwrap();
        pipeline.notify_startup(&network()).unwrap();
        assert_eq!(pipeline.context().len(), 3);
    }

    #[test]
    fn second_startup_keeps_classification() {
        let mut pipeline = started(config());
        let before = pipeline.context().clone();
        pipeline
            .startup_with_layers(
                &network(),
                &LandUseLayer::empty(),
                &PopulationDensityLayer::empty(),
            )
            .unwrap();
        assert_eq!(pipeline.context(), &before);
    }

    #[test]
    fn end_to_end_cost_in_demand_bin() {
        let mut pipeline = started(config());
        let total = pipeline
            .notify_after_mobsim(&network(), &demand_in_bin_five)
            .unwrap();

        // 100 vehicles on 1 km of built-up, 2-lane, plan-equal expressway.
        let expected = 101.53 * 100.0 / 1000.0;
        assert!((total - expected).abs() < 1e-9);

        let first = pipeline.context().get(&LinkId::from("1")).unwrap();
        assert_eq!(first.time_bins().count(), 24);
        assert!((first.time_bin(5).unwrap().accident_cost - expected).abs() < 1e-9);
        for bin in first.time_bins().filter(|record| record.bin_index != 5) {
            assert!(bin.accident_cost.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn unknown_method_aborts_startup() {
        let mut pipeline = AccidentPipeline::new(AccidentsConfig {
            computation_method: "ECOPLAN".to_string(),
            ..config()
        })
        .unwrap();

        let result = pipeline.startup_with_layers(&network(), &land_use(), &places());
        assert!(matches!(
            result,
            Err(AccidentError::UnknownComputationMethod(name)) if name == "ECOPLAN"
        ));
        assert!(pipeline.context().is_empty());
    }

    #[test]
    fn unsupported_crs_is_rejected() {
        let result = AccidentPipeline::new(AccidentsConfig {
            network_crs: "EPSG:2056".to_string(),
            ..config()
        });
        assert!(matches!(result, Err(AccidentError::Spatial(_))));
    }

    #[test]
    fn iteration_reports_are_written_under_output_dir() {
        let dir = std::env::temp_dir().join("accident_costs_pipeline_test");
        let mut pipeline = AccidentPipeline::new(config()).unwrap().with_output_dir(&dir);
        pipeline
            .startup_with_layers(&network(), &land_use(), &places())
            .unwrap();
        pipeline
            .notify_after_mobsim(&network(), &demand_in_bin_five)
            .unwrap();

        let path = pipeline.notify_iteration_ends(0).unwrap().unwrap();
        assert!(dir.join("classification.csv").exists());
        assert_eq!(
            path,
            dir.join("ITERS").join("it.0").join("accident_costs_BVWP.csv")
        );

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 5);
        assert!(contents.lines().last().unwrap().starts_with("TOTAL,"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn no_output_dir_writes_nothing() {
        let pipeline = started(config());
        assert_eq!(pipeline.notify_iteration_ends(0).unwrap(), None);
    }
}
