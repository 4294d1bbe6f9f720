/*! Core IR for hardware circuits with fixed-point interval types.
 *
 * Lowering interval arithmetic to plain integers needs an IR where every width, bound and binary point
 * is explicit. This crate provides the types, expressions and statements of that IR, builders to
 * assemble circuits, a textual form for inspection, and the type inference that later passes lean on.
 */

pub mod builder;
pub mod circuit;
pub mod expr;
pub mod format;
pub mod infer;
pub mod pass;
pub mod stmt;
pub mod types;

pub use builder::{CircuitBuilder, ModuleBuilder};
pub use circuit::{Circuit, DefModule, Direction, ExtModule, Module, Port};
pub use expr::{Expression, PrimOp};
pub use infer::{InferTypes, TypeInference};
pub use pass::{run_timed, Pass, PassStatistics};
pub use stmt::{RegReset, Statement};
pub use types::{signed_width, unsigned_width, Bound, Field, IntervalType, Type, Width};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Undeclared reference: {0}")]
    UndeclaredReference(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Invalid operands: {0}")]
    InvalidOperands(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
