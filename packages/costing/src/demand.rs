//! Per-link, per-time-bin traffic demand.
//!
//! [`LinkDemandCounter`] counts vehicles leaving each link in each time
//! bin. It is fed either from simulation events directly or from a CSV
//! events file (`time,link_id[,vehicle_id]`).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use accidents_network_models::LinkId;
use serde::Deserialize;

use crate::AccidentError;

/// Demand source queried by the cost aggregator.
pub trait DemandProvider {
    /// Number of simulated vehicles on `link_id` in time bin `bin_index`
    /// (not upscaled).
    fn demand(&self, link_id: &LinkId, bin_index: usize) -> f64;
}

impl<F> DemandProvider for F
where
    F: Fn(&LinkId, usize) -> f64,
{
    fn demand(&self, link_id: &LinkId, bin_index: usize) -> f64 {
        self(link_id, bin_index)
    }
}

/// One vehicle leaving one link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkEvent {
    /// Simulation time in seconds.
    pub time: f64,
    pub link_id: LinkId,
    #[serde(default)]
    pub vehicle_id: Option<String>,
}

/// Counts link-leave events per link and time bin.
#[derive(Debug, Clone)]
pub struct LinkDemandCounter {
    time_bin_size: f64,
    counts: BTreeMap<LinkId, BTreeMap<usize, f64>>,
}

impl LinkDemandCounter {
    #[must_use]
    pub const fn new(time_bin_size: f64) -> Self {
        Self {
            time_bin_size,
            counts: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn time_bin_size(&self) -> f64 {
        self.time_bin_size
    }

    /// Bin an event at `time` falls into.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bin_index(&self, time: f64) -> usize {
        (time / self.time_bin_size).floor().max(0.0) as usize
    }

    /// Counts one vehicle leaving `link_id` at `time`.
    pub fn handle_link_leave(&mut self, link_id: &LinkId, time: f64) {
        let bin_index = self.bin_index(time);
        *self
            .counts
            .entry(link_id.clone())
            .or_default()
            .entry(bin_index)
            .or_insert(0.0) += 1.0;
    }

    pub fn handle_event(&mut self, event: &LinkEvent) {
        self.handle_link_leave(&event.link_id, event.time);
    }

    /// Clears all counts, e.g. before the next iteration.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Total number of counted events.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.counts.values().flat_map(BTreeMap::values).sum()
    }
}

impl DemandProvider for LinkDemandCounter {
    fn demand(&self, link_id: &LinkId, bin_index: usize) -> f64 {
        self.counts
            .get(link_id)
            .and_then(|bins| bins.get(&bin_index))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Reads link events from CSV with a `time,link_id[,vehicle_id]` header.
///
/// # Errors
///
/// Returns [`AccidentError::Csv`] on malformed rows.
pub fn read_link_events<R: Read>(reader: R) -> Result<Vec<LinkEvent>, AccidentError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut events = Vec::new();
    for record in csv_reader.deserialize() {
        events.push(record?);
    }
    Ok(events)
}

/// Reads link events from a CSV file.
///
/// # Errors
///
/// Returns [`AccidentError`] if the file cannot be opened or parsed.
pub fn load_link_events(path: &Path) -> Result<Vec<LinkEvent>, AccidentError> {
    let file = std::fs::File::open(path)?;
    let events = read_link_events(file)?;
    log::info!("Read {} link events from {}", events.len(), path.display());
    Ok(events)
}
