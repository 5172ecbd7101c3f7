#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Link-level accident cost estimation.
//!
//! The [`AccidentPipeline`] follows the simulation lifecycle:
//!
//! - **startup**: every network link is classified once (road geometry
//!   overrides, land-use lookup, lane count) into the [`AccidentContext`];
//! - **after mobsim**: for every link and time bin, demand from a
//!   [`DemandProvider`] is turned into an accident cost by the configured
//!   [`CostFormula`] and stored, overwriting the previous iteration;
//! - **iteration end**: the context is written out as a CSV report.
//!
//! An unknown computation method aborts the pipeline. Missing land-use or
//! places data only degrades classification to default values.

pub mod aggregate;
pub mod classification;
pub mod config;
pub mod context;
pub mod demand;
pub mod formula;
pub mod pipeline;
pub mod progress;
pub mod report;

use accidents_network_models::LinkId;

pub use aggregate::{CostSettings, TimeBin, run_for_iteration, time_bins};
pub use classification::{BUILT_UP_LAND_USES, OverrideLists, build_classification};
pub use context::AccidentContext;
pub use demand::{DemandProvider, LinkDemandCounter, LinkEvent};
pub use formula::{BvwpFormula, CostFormula, CostFormulaRegistry};
pub use pipeline::AccidentPipeline;

/// Errors that abort the accident pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AccidentError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config parsing failed.
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spatial setup failed (e.g. unsupported CRS).
    #[error("Spatial error: {0}")]
    Spatial(#[from] accidents_spatial::SpatialError),

    /// The configured cost computation method is not registered.
    #[error("Unknown accident computation approach or value not set: '{0}'. Aborting...")]
    UnknownComputationMethod(String),

    /// A link in the accident context has no counterpart in the network.
    #[error("Link {0} is in the accident context but not in the network")]
    MissingLink(LinkId),

    /// A config value is out of range.
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },
}
