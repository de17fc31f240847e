#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal setup for the `crime_radius` binary: a logger that cooperates
//! with progress bars, and a progress bar for coordinate batches.

use std::sync::Arc;
use std::time::Instant;

use crime_radius_aggregate::ProgressCallback;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::LevelFilter;

pub use indicatif::MultiProgress;

const QUERY_TEMPLATE: &str =
    "{prefix:.bold} [{elapsed_precise}] {bar:40.green/dim} {human_pos}/{human_len} coordinates ({per_sec}, eta {eta})";

/// Progress bar for a batch of radius queries.
///
/// Shows the coordinates-per-second rate while the batch runs and logs the
/// overall throughput when it finishes.
pub struct BatchProgress {
    bar: ProgressBar,
    started: Instant,
}

impl BatchProgress {
    /// Wraps an existing bar. The length is filled in by
    /// [`ProgressCallback::set_total`].
    #[must_use]
    pub fn new(bar: ProgressBar, label: &str) -> Self {
        let style = ProgressStyle::with_template(QUERY_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("=> "));
        bar.set_prefix(label.to_owned());
        Self {
            bar,
            started: Instant::now(),
        }
    }

    /// Adds a batch bar to `multi`, redrawing a few times per second.
    #[must_use]
    pub fn attach(multi: &MultiProgress, label: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::with_draw_target(
            Some(0),
            ProgressDrawTarget::stderr_with_hz(4),
        ));
        Arc::new(Self::new(bar, label))
    }

    /// Coordinates evaluated so far.
    #[must_use]
    pub fn evaluated(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressCallback for BatchProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.reset_eta();
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, msg: String) {
        let elapsed = self.started.elapsed();
        let done = self.bar.position();
        self.bar.finish_and_clear();

        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let rate = done as f64 / secs;
            log::info!("{msg} in {elapsed:.2?} ({rate:.0} coordinates/s)");
        } else {
            log::info!("{msg}");
        }
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge` and returns
/// the [`MultiProgress`] that bars must be attached to.
///
/// Logs at `info` unless `RUST_LOG` says otherwise. Calling it twice keeps
/// the first logger.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let max_level = logger.filter();

    let multi = MultiProgress::new();
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(max_level);
    }
    multi.set_move_cursor(true);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_batch_progress() {
        let progress = BatchProgress::new(ProgressBar::hidden(), "counting");
        progress.set_total(3);
        progress.inc(1);
        progress.inc(2);
        assert_eq!(progress.evaluated(), 3);
        assert_eq!(progress.bar.length(), Some(3));
        progress.finish("done".to_owned());
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn logger_init_is_idempotent() {
        let _first = init_logger();
        let _second = init_logger();
        log::info!("still logging");
    }
}
