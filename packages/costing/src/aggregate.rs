//! Per-iteration cost aggregation over links and time bins.

use accidents_costing_models::{AccidentLinkInfo, AccidentsConfig, TimeBinRecord};
use accidents_network_models::{Link, LinkId, Network};

use crate::AccidentError;
use crate::context::AccidentContext;
use crate::demand::DemandProvider;
use crate::formula::{CostFormula, CostFormulaRegistry};

/// Time binning and demand scaling for the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSettings {
    /// Width of a time bin in seconds.
    pub time_bin_size: f64,
    /// End of the simulated day in seconds.
    pub max_time: f64,
    /// Factor upscaling simulated demand.
    pub sample_size: f64,
}

impl CostSettings {
    #[must_use]
    pub const fn from_config(config: &AccidentsConfig) -> Self {
        Self {
            time_bin_size: config.time_bin_size,
            max_time: config.max_time,
            sample_size: config.sample_size,
        }
    }

    /// Number of time bins in a day.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        time_bins(self.time_bin_size, self.max_time).count()
    }
}

impl Default for CostSettings {
    fn default() -> Self {
        Self::from_config(&AccidentsConfig::default())
    }
}

/// A time bin ending at `end_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBin {
    pub index: usize,
    pub end_time: f64,
}

/// Bins ending at `bin_size`, `2 * bin_size`, ... up to and including
/// `max_time`. Each bin is indexed by the bin its midpoint falls into.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn time_bins(bin_size: f64, max_time: f64) -> impl Iterator<Item = TimeBin> {
    let valid = bin_size.is_finite() && bin_size > 0.0 && max_time.is_finite();

    (1_u32..)
        .map(move |n| f64::from(n) * bin_size)
        .take_while(move |&end_time| valid && end_time <= max_time)
        .map(move |end_time| {
            let midpoint = end_time - bin_size / 2.0;
            TimeBin {
                index: (midpoint / bin_size).floor() as usize,
                end_time,
            }
        })
}

/// Recomputes the time-bin costs of every link in `context`.
///
/// All links are resolved (formula and network link) before any cost is
/// stored, so an error leaves `context` untouched. Records for the bins
/// visited overwrite the previous iteration's records. Returns the total
/// cost of the iteration.
///
/// # Errors
///
/// Returns [`AccidentError::UnknownComputationMethod`] if a link's method
/// is not registered, or [`AccidentError::MissingLink`] if a link is not in
/// `network`.
pub fn run_for_iteration(
    context: &mut AccidentContext,
    network: &Network,
    demand: &dyn DemandProvider,
    formulas: &CostFormulaRegistry,
    settings: &CostSettings,
) -> Result<f64, AccidentError> {
    let resolved = context
        .values()
        .map(|info| {
            let formula = formulas.resolve(&info.computation_method)?;
            let link = network
                .link(&info.link_id)
                .ok_or_else(|| AccidentError::MissingLink(info.link_id.clone()))?;
            Ok((info, formula, link))
        })
        .collect::<Result<Vec<_>, AccidentError>>()?;

    let bins = time_bins(settings.time_bin_size, settings.max_time).collect::<Vec<_>>();

    let staged: Vec<(LinkId, Vec<TimeBinRecord>)> = resolved
        .into_iter()
        .map(|(info, formula, link)| {
            let records = bins
                .iter()
                .map(|bin| {
                    let cost = bin_cost(formula, link, info, demand, bin.index, settings);
                    TimeBinRecord::new(bin.index, cost)
                })
                .collect();
            (info.link_id.clone(), records)
        })
        .collect();

    let mut total = 0.0;
    for (link_id, records) in staged {
        if let Some(info) = context.get_mut(&link_id) {
            for record in records {
                total += record.accident_cost;
                info.put_time_bin(record);
            }
        }
    }

    log::info!(
        "Accident costs computed for {} links in {} time bins: {total:.2} EUR",
        context.len(),
        bins.len()
    );

    Ok(total)
}

fn bin_cost(
    formula: &dyn CostFormula,
    link: &Link,
    info: &AccidentLinkInfo,
    demand: &dyn DemandProvider,
    bin_index: usize,
    settings: &CostSettings,
) -> f64 {
    let scaled_demand = settings.sample_size * demand.demand(&link.id, bin_index);
    formula.compute_cost(scaled_demand, link, &info.classification)
}
