/*! Unified interface for fixed-point interval elimination.
 *
 * Single import for everything you need: building circuits, inferring types, and lowering interval
 * arithmetic to plain signed integers. Batteries-included entry point for hardware compiler pipelines.
 */

pub use fxir_core as core;
pub use fxir_transform as transform;

pub use fxir_core::{
    Circuit, CircuitBuilder, DefModule, Expression, InferTypes, IntervalType, ModuleBuilder, Pass,
    PrimOp, Statement, Type, TypeInference,
};

pub use fxir_transform::{
    ensure_interval_free, remove_intervals, LoweringError, LoweringOptions, LoweringStats,
    RemoveIntervals,
};
