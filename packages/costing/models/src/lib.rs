#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Link classification and per-time-bin accident cost types.
//!
//! Every link gets one [`LinkClassification`] at startup: a road geometry
//! class, an area/speed class and a lane class. The BVWP cost rates are
//! looked up by those three values. Per-iteration costs are kept per link
//! as [`TimeBinRecord`]s inside an [`AccidentLinkInfo`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use accidents_network_models::LinkId;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Free-speed (m/s) above which a link is treated as expressway-like.
pub const EXPRESSWAY_FREESPEED_THRESHOLD: f64 = 16.0;

/// Name of the BVWP computation method.
pub const BVWP_METHOD: &str = "BVWP";

/// Road geometry class: how the link crosses other roads.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoadGeometry {
    /// Grade-separated ("planfrei").
    PlanFree = 0,
    /// At-grade, signal or priority controlled ("plangleich"). Default.
    PlanEqual = 1,
    /// Tunnel.
    Tunnel = 2,
}

impl RoadGeometry {
    /// Numeric code used in classification vectors.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Area/speed class: built-up or not, expressway-like or not.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AreaType {
    /// Outside built-up area, motor road.
    NonBuiltUpExpressway = 0,
    /// Inside built-up area, motor road.
    BuiltUpExpressway = 1,
    /// Outside built-up area, other road.
    NonBuiltUpOther = 2,
    /// Inside built-up area, other road.
    BuiltUpOther = 3,
}

impl AreaType {
    /// Picks the class from the two underlying flags.
    #[must_use]
    pub const fn new(built_up: bool, expressway: bool) -> Self {
        match (built_up, expressway) {
            (false, true) => Self::NonBuiltUpExpressway,
            (true, true) => Self::BuiltUpExpressway,
            (false, false) => Self::NonBuiltUpOther,
            (true, false) => Self::BuiltUpOther,
        }
    }

    /// Expressway-like when the free speed exceeds
    /// [`EXPRESSWAY_FREESPEED_THRESHOLD`].
    #[must_use]
    pub fn from_freespeed(built_up: bool, freespeed: f64) -> Self {
        Self::new(built_up, freespeed > EXPRESSWAY_FREESPEED_THRESHOLD)
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn is_built_up(self) -> bool {
        matches!(self, Self::BuiltUpExpressway | Self::BuiltUpOther)
    }
}

/// Lane class, 1 to 4 (four or more lanes share class 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneClass(u8);

impl LaneClass {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    /// Truncates a (possibly fractional) lane count and clamps it to
    /// `1..=4`. A non-finite lane count is class 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_lanes(lanes: f64) -> Self {
        if !lanes.is_finite() {
            return Self(Self::MIN);
        }
        let truncated = lanes.trunc().clamp(f64::from(Self::MIN), f64::from(Self::MAX));
        Self(truncated as u8)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

/// The static classification of one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkClassification {
    pub road_geometry: RoadGeometry,
    pub area_type: AreaType,
    pub lanes: LaneClass,
}

impl LinkClassification {
    /// The classification as the ordered `(geometry, area, lanes)` vector.
    #[must_use]
    pub const fn as_vector(&self) -> [u8; 3] {
        [
            self.road_geometry.code(),
            self.area_type.code(),
            self.lanes.value(),
        ]
    }
}

impl std::fmt::Display for LinkClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [geometry, area, lanes] = self.as_vector();
        write!(f, "[{geometry}, {area}, {lanes}]")
    }
}

/// Accident cost of one link in one time bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBinRecord {
    pub bin_index: usize,
    /// Cost in EUR, upscaled to the full population.
    pub accident_cost: f64,
}

impl TimeBinRecord {
    #[must_use]
    pub const fn new(bin_index: usize, accident_cost: f64) -> Self {
        Self {
            bin_index,
            accident_cost,
        }
    }
}

/// Everything the pipeline knows about one link.
///
/// The classification is fixed at startup; `time_bins` is overwritten
/// every iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccidentLinkInfo {
    pub link_id: LinkId,
    pub classification: LinkClassification,
    /// Cost method the classification was built for (e.g. `"BVWP"`).
    pub computation_method: String,
    /// `pop_dens` of the places polygon containing the link midpoint.
    pub population_density: Option<f64>,
    time_bins: BTreeMap<usize, TimeBinRecord>,
}

impl AccidentLinkInfo {
    #[must_use]
    pub const fn new(
        link_id: LinkId,
        classification: LinkClassification,
        computation_method: String,
        population_density: Option<f64>,
    ) -> Self {
        Self {
            link_id,
            classification,
            computation_method,
            population_density,
            time_bins: BTreeMap::new(),
        }
    }

    /// Stores a record, replacing any previous record for the same bin.
    pub fn put_time_bin(&mut self, record: TimeBinRecord) {
        self.time_bins.insert(record.bin_index, record);
    }

    #[must_use]
    pub fn time_bin(&self, bin_index: usize) -> Option<&TimeBinRecord> {
        self.time_bins.get(&bin_index)
    }

    /// Records in bin order.
    pub fn time_bins(&self) -> impl Iterator<Item = &TimeBinRecord> {
        self.time_bins.values()
    }

    /// Sum of all stored bin costs.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.time_bins.values().map(|r| r.accident_cost).sum()
    }
}

/// Accident module configuration, read from TOML.
///
/// ```toml
/// computation_method = "BVWP"
/// sample_size = 10.0
/// network_crs = "EPSG:31468"
/// osm_crs = "EPSG:4326"
/// land_use_file = "data/landuse.geojson"
/// tunnel_link_ids = ["1234", "5678"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccidentsConfig {
    /// Name of the cost formula. Only `"BVWP"` is built in.
    pub computation_method: String,
    /// Factor upscaling simulated demand to the full population.
    pub sample_size: f64,
    /// Width of a time bin in seconds.
    pub time_bin_size: f64,
    /// End of the simulated day in seconds.
    pub max_time: f64,
    /// CRS of the network coordinates.
    pub network_crs: String,
    /// CRS of the land-use and places polygons.
    pub osm_crs: String,
    /// Metric CRS used for ring search offsets.
    pub planar_crs: String,
    /// Land-use `GeoJSON` (`osm_id`, `fclass`).
    pub land_use_file: Option<PathBuf>,
    /// Places `GeoJSON` (`osm_id`, `pop_dens`).
    pub places_file: Option<PathBuf>,
    /// Links forced to [`RoadGeometry::PlanFree`].
    pub plan_free_link_ids: Vec<String>,
    /// Links forced to [`RoadGeometry::Tunnel`].
    pub tunnel_link_ids: Vec<String>,
}

impl Default for AccidentsConfig {
    fn default() -> Self {
        Self {
            computation_method: BVWP_METHOD.to_string(),
            sample_size: 1.0,
            time_bin_size: 900.0,
            max_time: 86_400.0,
            network_crs: "EPSG:31468".to_string(),
            osm_crs: "EPSG:4326".to_string(),
            planar_crs: "EPSG:31468".to_string(),
            land_use_file: None,
            places_file: None,
            plan_free_link_ids: Vec::new(),
            tunnel_link_ids: Vec::new(),
        }
    }
}
