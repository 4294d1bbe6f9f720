/*! Eliminate fixed-point interval types from a circuit.
 *
 * Interval types say what range a value covers and how many fractional bits it carries, but hardware
 * only has plain integers. This stage aligns binary points across operands, rewrites every interval
 * into a signed integer wide enough for its encoding, expands `clip` and `wrap` into the fewest
 * comparisons the static ranges allow, and then lets type inference settle the new widths.
 */

mod align;
mod decision;
mod errors;
mod lower;

#[cfg(test)]
mod tests;

pub use align::AlignBinaryPoints;
pub use decision::{RangeCheck, SaturateAction, WrapAction};
pub use errors::LoweringError;
pub use lower::{lower_interval_type, LowerIntervals};

use crate::verify::ensure_interval_free;
use fxir_core::{Circuit, InferTypes, Pass, TypeInference};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringOptions {
    /// Recompute all expression types once lowering is done.
    pub reinfer_types: bool,
    /// Fail if any interval type or operator is left in the output.
    pub verify_output: bool,
    pub warn_on_remainder_wrap: bool,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            reinfer_types: true,
            verify_output: true,
            warn_on_remainder_wrap: true,
        }
    }
}

/// How often each branch of a saturate or wrap decision was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub unchanged: usize,
    pub low: usize,
    pub high: usize,
    pub both: usize,
}

impl ActionCounts {
    pub fn record(&mut self, (low, high): (bool, bool)) {
        match (low, high) {
            (false, false) => self.unchanged += 1,
            (true, false) => self.low += 1,
            (false, true) => self.high += 1,
            (true, true) => self.both += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unchanged + self.low + self.high + self.both
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoweringStats {
    pub rescales_inserted: usize,
    pub casts_lowered: usize,
    pub shifts_rebound: usize,
    pub saturates: ActionCounts,
    /// Wraps resolved with at most one correction per side.
    pub wraps: ActionCounts,
    pub width_wraps: usize,
    pub remainder_wraps: usize,
    pub types_rewritten: usize,
}

/// Align, lower and re-infer, in that order.
pub struct RemoveIntervals {
    options: LoweringOptions,
    inference: Box<dyn TypeInference>,
    stats: LoweringStats,
}

impl RemoveIntervals {
    pub fn new() -> Self {
        Self::with_options(LoweringOptions::default())
    }

    pub fn with_options(options: LoweringOptions) -> Self {
        Self {
            options,
            inference: Box::new(InferTypes::new()),
            stats: LoweringStats::default(),
        }
    }

    pub fn with_inference(mut self, inference: Box<dyn TypeInference>) -> Self {
        self.inference = inference;
        self
    }

    pub fn options(&self) -> &LoweringOptions {
        &self.options
    }

    /// Counters from the most recent successful run.
    pub fn stats(&self) -> &LoweringStats {
        &self.stats
    }

    pub fn lower(&mut self, circuit: Circuit) -> Result<Circuit, LoweringError> {
        let mut aligner = AlignBinaryPoints::new();
        let aligned = aligner.align(circuit)?;

        let mut lowerer = LowerIntervals::new(self.options.warn_on_remainder_wrap);
        let lowered = lowerer.lower(aligned)?;

        let circuit = if self.options.reinfer_types {
            self.inference.infer(lowered)?
        } else {
            lowered
        };

        if self.options.verify_output {
            ensure_interval_free(&circuit)?;
        }

        let mut stats = lowerer.into_stats();
        stats.rescales_inserted = aligner.rescales_inserted();
        info!(
            modules = circuit.modules.len(),
            types = stats.types_rewritten,
            rescales = stats.rescales_inserted,
            casts = stats.casts_lowered,
            clips = stats.saturates.total(),
            wraps = stats.wraps.total() + stats.width_wraps + stats.remainder_wraps,
            remainder_wraps = stats.remainder_wraps,
            "removed interval types"
        );
        self.stats = stats;
        Ok(circuit)
    }
}

impl Default for RemoveIntervals {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for RemoveIntervals {
    fn name(&self) -> &'static str {
        "remove-intervals"
    }

    fn description(&self) -> &'static str {
        "Lower fixed-point interval types and operators to signed integer arithmetic"
    }

    fn run(&mut self, circuit: Circuit) -> anyhow::Result<Circuit> {
        Ok(self.lower(circuit)?)
    }
}

/// Runs [`RemoveIntervals`] with default options.
pub fn remove_intervals(circuit: Circuit) -> Result<Circuit, LoweringError> {
    RemoveIntervals::new().lower(circuit)
}
