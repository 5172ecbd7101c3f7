//! CSV reports of link classifications and per-iteration costs.
//!
//! Layout under the output directory:
//!
//! ```text
//! classification.csv
//! ITERS/it.<n>/accident_costs_<method>.csv
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::AccidentError;
use crate::aggregate::{CostSettings, time_bins};
use crate::context::AccidentContext;

pub const CLASSIFICATION_FILE_NAME: &str = "classification.csv";

/// Directory holding the reports of one iteration.
#[must_use]
pub fn iteration_dir(output_dir: &Path, iteration: u32) -> PathBuf {
    output_dir.join("ITERS").join(format!("it.{iteration}"))
}

#[must_use]
pub fn costs_file_name(method: &str) -> String {
    format!("accident_costs_{method}.csv")
}

/// Writes one row per link with its classification and population
/// density (empty when unknown).
///
/// # Errors
///
/// Returns [`AccidentError::Csv`] if writing fails.
pub fn write_classification<W: Write>(
    writer: W,
    context: &AccidentContext,
) -> Result<(), AccidentError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "link_id",
        "road_geometry",
        "area_type",
        "lanes",
        "classification",
        "population_density",
        "computation_method",
    ])?;

    for info in context.values() {
        let classification = info.classification;
        let row: [&str; 7] = [
            info.link_id.as_str(),
            classification.road_geometry.as_ref(),
            classification.area_type.as_ref(),
            &classification.lanes.value().to_string(),
            &classification.to_string(),
            &format_density(info.population_density),
            &info.computation_method,
        ];
        csv_writer.write_record(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes one row per link with its cost in every time bin and its total,
/// followed by a `TOTAL` row. Bins without a record are written as zero.
/// Returns the grand total.
///
/// # Errors
///
/// Returns [`AccidentError::Csv`] if writing fails.
pub fn write_iteration_costs<W: Write>(
    writer: W,
    context: &AccidentContext,
    settings: &CostSettings,
) -> Result<f64, AccidentError> {
    let bins = time_bins(settings.time_bin_size, settings.max_time)
        .map(|bin| bin.index)
        .collect::<Vec<_>>();

    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        "link_id".to_string(),
        "road_geometry".to_string(),
        "area_type".to_string(),
        "lanes".to_string(),
        "population_density".to_string(),
    ];
    header.extend(bins.iter().map(|index| format!("bin_{index}")));
    header.push("total".to_string());
    csv_writer.write_record(&header)?;

    let mut bin_totals = vec![0.0; bins.len()];

    for info in context.values() {
        let costs = bins
            .iter()
            .map(|&index| info.time_bin(index).map_or(0.0, |r| r.accident_cost))
            .collect::<Vec<_>>();
        for (sum, cost) in bin_totals.iter_mut().zip(&costs) {
            *sum += cost;
        }

        let mut row = vec![
            info.link_id.to_string(),
            info.classification.road_geometry.to_string(),
            info.classification.area_type.to_string(),
            info.classification.lanes.value().to_string(),
            format_density(info.population_density),
        ];
        row.extend(costs.iter().map(ToString::to_string));
        row.push(costs.iter().sum::<f64>().to_string());
        csv_writer.write_record(&row)?;
    }

    let total: f64 = bin_totals.iter().sum();
    let mut row = vec![
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
    ];
    row.extend(bin_totals.iter().map(ToString::to_string));
    row.push(total.to_string());
    csv_writer.write_record(&row)?;

    csv_writer.flush()?;
    Ok(total)
}

/// Writes `classification.csv` into `output_dir`.
///
/// # Errors
///
/// Returns [`AccidentError`] if the directory or file cannot be written.
pub fn write_classification_report(
    output_dir: &Path,
    context: &AccidentContext,
) -> Result<PathBuf, AccidentError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(CLASSIFICATION_FILE_NAME);
    write_classification(std::fs::File::create(&path)?, context)?;
    log::info!("Wrote link classification to {}", path.display());
    Ok(path)
}

/// Writes the cost report of `iteration` into its iteration directory.
///
/// # Errors
///
/// Returns [`AccidentError`] if the directory or file cannot be written.
pub fn write_iteration_report(
    output_dir: &Path,
    iteration: u32,
    method: &str,
    context: &AccidentContext,
    settings: &CostSettings,
) -> Result<PathBuf, AccidentError> {
    let dir = iteration_dir(output_dir, iteration);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(costs_file_name(method));
    let total = write_iteration_costs(std::fs::File::create(&path)?, context, settings)?;
    log::info!(
        "Iteration {iteration}: wrote accident costs ({total:.2} EUR) to {}",
        path.display()
    );
    Ok(path)
}

fn format_density(density: Option<f64>) -> String {
    density.map(|d| d.to_string()).unwrap_or_default()
}
