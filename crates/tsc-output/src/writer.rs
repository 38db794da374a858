//! The `OutputWriter` trait implemented by every backend.

use crate::{IntersectionRow, OutputResult, StepRow};

/// Sink for per-tick rows.
///
/// Errors are stored by [`RunOutputObserver`][crate::RunOutputObserver] and
/// retrieved with `take_error`; they never abort a run.
pub trait OutputWriter {
    fn write_step(&mut self, row: &StepRow) -> OutputResult<()>;

    fn write_intersections(&mut self, rows: &[IntersectionRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
