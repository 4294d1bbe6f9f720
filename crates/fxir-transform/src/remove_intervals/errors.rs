use fxir_core::IrError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoweringError {
    #[error("Interval type {ty} has an open bound; bounds must be resolved before lowering")]
    OpenBound { ty: String },

    #[error("Interval type {ty} has no known binary point")]
    UnknownBinaryPoint { ty: String },

    #[error("Expected an interval-typed value in {context}, got {ty}")]
    NotAnInterval { context: String, ty: String },

    #[error("Unexpected operand of type {ty} for {op}")]
    UnexpectedOperand { op: String, ty: String },

    #[error("Operator {op} cannot appear at this stage")]
    UnexpectedOperator { op: String },

    #[error("{op} expects {expected} operand(s), got {found}")]
    Arity {
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("Interval construct survived lowering in module {module}: {item}")]
    IntervalSurvived { module: String, item: String },

    #[error("Type inference failed: {0}")]
    Inference(#[from] IrError),
}

impl LoweringError {
    /// Internal violations mean an earlier stage broke its guarantees; only inference failures are not.
    pub fn is_internal(&self) -> bool {
        !matches!(self, LoweringError::Inference(_))
    }
}

pub type Result<T> = std::result::Result<T, LoweringError>;
