#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal output for the `accidents_cli` binary.
//!
//! [`IndicatifProgress::links_bar`] shows how far link classification has
//! got at pipeline startup. [`init_logger`] routes the pipeline's log lines
//! through the same [`MultiProgress`] so they don't tear the bar.

use std::sync::Arc;
use std::time::Duration;

use accidents_costing::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Link classification progress drawn as an `indicatif` bar.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Used once the link count is known.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a bar to `multi`. It spins until the pipeline reports the
    /// number of links, then counts them off.
    #[must_use]
    pub fn links_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the `RUST_LOG`-filtered logger behind `indicatif-log-bridge`.
///
/// Pass the returned [`MultiProgress`] to [`IndicatifProgress::links_bar`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already installed

    log::set_max_level(level);

    multi
}
