use super::errors::{LoweringError, Result};
use fxir_core::{Circuit, DefModule, Expression, IntervalType, PrimOp, Statement, Type};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cmp::Ordering;
use tracing::{debug, trace};

/// Inserts `incp`/`decp` rescales so interval operands meet at a common binary point.
///
/// Runs bottom-up: an operator sees operands that are already aligned. Connections into an
/// interval-typed location are rescaled to the location's binary point.
#[derive(Debug, Default)]
pub struct AlignBinaryPoints {
    rescales: usize,
}

impl AlignBinaryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rescales_inserted(&self) -> usize {
        self.rescales
    }

    pub fn align(&mut self, circuit: Circuit) -> Result<Circuit> {
        circuit.try_map_modules(|module| self.align_module(module))
    }

    fn align_module(&mut self, module: DefModule) -> Result<DefModule> {
        debug!(module = module.name(), "aligning binary points");
        module.try_map_body(|body| self.align_stmt(body))
    }

    fn align_stmt(&mut self, stmt: Statement) -> Result<Statement> {
        match stmt {
            Statement::Connect { loc, expr } => {
                let loc = self.align_expr(loc)?;
                let expr = self.align_expr(expr)?;
                let expr = self.align_to_location(&loc, expr)?;
                Ok(Statement::Connect { loc, expr })
            }
            Statement::PartialConnect { loc, expr } => {
                let loc = self.align_expr(loc)?;
                let expr = self.align_expr(expr)?;
                let expr = self.align_to_location(&loc, expr)?;
                Ok(Statement::PartialConnect { loc, expr })
            }
            other => other
                .try_map_exprs(|e| self.align_expr(e))?
                .try_map_stmts(|s| self.align_stmt(s)),
        }
    }

    fn align_to_location(&mut self, loc: &Expression, expr: Expression) -> Result<Expression> {
        match loc.ty() {
            Type::Interval(target) => {
                let point = known_point(&target)?;
                self.fix_bp(point, expr)
            }
            _ => Ok(expr),
        }
    }

    fn align_expr(&mut self, expr: Expression) -> Result<Expression> {
        expr.try_transform_up(&mut |node| self.align_node(node))
    }

    fn align_node(&mut self, expr: Expression) -> Result<Expression> {
        match expr {
            Expression::DoPrim {
                op: PrimOp::SetP,
                args,
                consts,
                ..
            } => {
                let (arg, point) = set_point_operands(args, consts)?;
                self.fix_bp(point, arg)
            }
            Expression::DoPrim {
                op,
                args,
                consts,
                ty,
            } if op.is_binary_point_sensitive()
                && !args.is_empty()
                && args.iter().all(|a| a.ty().is_interval()) =>
            {
                let max_bp = args
                    .iter()
                    .map(point_of)
                    .collect::<Result<Vec<_>>>()?
                    .into_iter()
                    .max()
                    .unwrap_or(0);
                let args = args
                    .into_iter()
                    .map(|a| self.fix_bp(max_bp, a))
                    .collect::<Result<Vec<_>>>()?;
                // clip and wrap produce a value at the precision of their aligned operand.
                let ty = match (op, ty) {
                    (PrimOp::Wrap | PrimOp::Clip, Type::Interval(result)) => {
                        Type::Interval(result.with_point(max_bp))
                    }
                    (_, ty) => ty,
                };
                Ok(Expression::DoPrim {
                    op,
                    args,
                    consts,
                    ty,
                })
            }
            Expression::Mux {
                cond,
                tval,
                fval,
                ty: Type::Interval(result),
            } => {
                let max_bp = point_of(&tval)?.max(point_of(&fval)?);
                Ok(Expression::Mux {
                    cond,
                    tval: Box::new(self.fix_bp(max_bp, *tval)?),
                    fval: Box::new(self.fix_bp(max_bp, *fval)?),
                    ty: Type::Interval(result.with_point(max_bp)),
                })
            }
            other => Ok(other),
        }
    }

    /// Rescales `expr` to `desired` fractional bits, keeping its bounds.
    pub fn fix_bp(&mut self, desired: u32, expr: Expression) -> Result<Expression> {
        let interval = match expr.ty() {
            Type::Interval(interval) => interval,
            other => {
                return Err(LoweringError::NotAnInterval {
                    context: format!("binary point rescale of {}", expr),
                    ty: other.to_string(),
                })
            }
        };
        let current = known_point(&interval)?;

        let (op, amount) = match desired.cmp(&current) {
            Ordering::Equal => return Ok(expr),
            Ordering::Greater => (PrimOp::IncP, desired - current),
            Ordering::Less => (PrimOp::DecP, current - desired),
        };

        trace!(expr = %expr, from = current, to = desired, "inserting {}", op);
        self.rescales += 1;
        Ok(Expression::prim(
            op,
            vec![expr],
            vec![BigInt::from(amount)],
            Type::Interval(interval.with_point(desired)),
        ))
    }
}

fn known_point(interval: &IntervalType) -> Result<u32> {
    interval
        .point
        .known()
        .ok_or_else(|| LoweringError::UnknownBinaryPoint {
            ty: interval.to_string(),
        })
}

fn point_of(expr: &Expression) -> Result<u32> {
    match expr.ty() {
        Type::Interval(interval) => known_point(&interval),
        other => Err(LoweringError::NotAnInterval {
            context: format!("alignment of {}", expr),
            ty: other.to_string(),
        }),
    }
}

fn set_point_operands(args: Vec<Expression>, consts: Vec<BigInt>) -> Result<(Expression, u32)> {
    let found = args.len();
    let [arg] = <[Expression; 1]>::try_from(args).map_err(|_| LoweringError::Arity {
        op: PrimOp::SetP.to_string(),
        expected: 1,
        found,
    })?;
    let point = consts
        .first()
        .and_then(ToPrimitive::to_u32)
        .ok_or_else(|| LoweringError::UnexpectedOperand {
            op: PrimOp::SetP.to_string(),
            ty: format!("binary point constant {:?}", consts),
        })?;
    Ok((arg, point))
}
