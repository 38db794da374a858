//! `RunOutputObserver<W>`: bridges `RunObserver` to an `OutputWriter`.

use std::path::PathBuf;

use log::warn;
use tsc_metrics::StepMetrics;
use tsc_orchestrator::{RunObserver, RunReport, Strategy};

use crate::row::{IntersectionRow, StepRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult, write_report_json};

/// A [`RunObserver`] that writes every strategy's per-tick metrics to any
/// [`OutputWriter`], and optionally the final report as JSON.
///
/// Errors are stored because observer hooks cannot fail.  After the run,
/// check with [`take_error`][Self::take_error].
pub struct RunOutputObserver<W: OutputWriter> {
    writer:      W,
    report_path: Option<PathBuf>,
    last_error:  Option<OutputError>,
}

impl<W: OutputWriter> RunOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, report_path: None, last_error: None }
    }

    /// Also write the [`RunReport`] to `path` when the run ends.
    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Take the first stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> RunObserver for RunOutputObserver<W> {
    fn on_step(&mut self, strategy: Strategy, metrics: &StepMetrics) {
        let result = self.writer.write_step(&StepRow::from_metrics(strategy, metrics));
        self.store_err(result);
        let rows = IntersectionRow::from_metrics(strategy, metrics);
        if !rows.is_empty() {
            let result = self.writer.write_intersections(&rows);
            self.store_err(result);
        }
    }

    fn on_run_end(&mut self, report: &RunReport) {
        let result = self.writer.finish();
        self.store_err(result);
        if let Some(path) = self.report_path.clone() {
            let result = write_report_json(&path, report);
            self.store_err(result);
        }
        if let Some(e) = &self.last_error {
            warn!("run output incomplete: {e}");
        }
    }
}
