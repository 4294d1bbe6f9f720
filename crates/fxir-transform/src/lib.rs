/*! Lowering passes for the fxir hardware IR.
 *
 * Fixed-point interval types make range intent explicit, yet nothing downstream of the frontend can
 * synthesize them. These passes turn interval arithmetic into ordinary signed integer operations with
 * identical numeric meaning, and check that nothing interval-shaped slips through.
 */

pub mod remove_intervals;
pub mod verify;

pub use remove_intervals::{
    lower_interval_type, remove_intervals, ActionCounts, AlignBinaryPoints, LowerIntervals,
    LoweringError, LoweringOptions, LoweringStats, RangeCheck, RemoveIntervals, SaturateAction,
    WrapAction,
};
pub use verify::ensure_interval_free;
