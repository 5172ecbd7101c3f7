#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line runner for link-level accident cost estimation.
//!
//! `classify` loads a network and the configured land-use and places
//! layers and writes the per-link classification. `run` additionally
//! replays one link-event CSV per iteration and writes the cost report of
//! every iteration.
//!
//! Uses `indicatif-log-bridge` (via [`accidents_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use accidents_cli_utils::{IndicatifProgress, MultiProgress};
use accidents_costing::config::{AccidentsConfig, load_config};
use accidents_costing::demand::load_link_events;
use accidents_costing::{AccidentContext, AccidentPipeline, LinkDemandCounter};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "accidents_cli", about = "Link-level accident cost estimation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every network link and print a summary
    Classify {
        /// TOML config file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Network JSON file
        #[arg(long)]
        network: PathBuf,

        /// Directory to write `classification.csv` into
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Classify links, then compute costs for one events CSV per iteration
    Run {
        /// TOML config file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Network JSON file
        #[arg(long)]
        network: PathBuf,

        /// Link event CSVs (`time,link_id[,vehicle_id]`), one per iteration
        #[arg(long, required = true, num_args = 1..)]
        events: Vec<PathBuf>,

        /// Directory to write reports into
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = accidents_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            config,
            network,
            output,
        } => {
            let (mut pipeline, network) =
                prepare(&multi, config.as_deref(), &network, output)?;
            pipeline.notify_startup(&network)?;
            print_summary(pipeline.context());
        }
        Commands::Run {
            config,
            network,
            events,
            output,
        } => {
            let (mut pipeline, network) =
                prepare(&multi, config.as_deref(), &network, output)?;
            pipeline.notify_startup(&network)?;

            let mut counter = LinkDemandCounter::new(pipeline.settings().time_bin_size);
            for (iteration, path) in (0_u32..).zip(&events) {
                counter.reset();
                for event in load_link_events(path)? {
                    counter.handle_event(&event);
                }

                let total = pipeline.notify_after_mobsim(&network, &counter)?;
                println!("Iteration {iteration}: {total:.2} EUR accident costs");

                if let Some(report) = pipeline.notify_iteration_ends(iteration)? {
                    log::info!("Iteration {iteration} report: {}", report.display());
                }
            }
        }
    }

    Ok(())
}

fn prepare(
    multi: &MultiProgress,
    config_path: Option<&Path>,
    network_path: &Path,
    output: Option<PathBuf>,
) -> Result<(AccidentPipeline, accidents_network::Network), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => AccidentsConfig::default(),
    };
    let network = accidents_network::load_network(network_path)?;

    let mut pipeline = AccidentPipeline::new(config)?
        .with_progress(IndicatifProgress::links_bar(multi, "Classifying links"));
    if let Some(output) = output {
        pipeline = pipeline.with_output_dir(output);
    }

    Ok((pipeline, network))
}

fn print_summary(context: &AccidentContext) {
    let mut counts = BTreeMap::<String, usize>::new();
    for info in context.values() {
        *counts.entry(info.classification.to_string()).or_default() += 1;
    }

    println!("Classified {} links:", context.len());
    for (classification, count) in counts {
        println!("  {classification}: {count}");
    }
}
