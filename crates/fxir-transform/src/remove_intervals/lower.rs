use super::decision::{RangeCheck, SaturateAction, WrapAction};
use super::errors::{LoweringError, Result};
use super::LoweringStats;
use fxir_core::{Circuit, DefModule, Expression, IntervalType, PrimOp, Statement, Type, Width};
use num_bigint::BigInt;
use num_traits::One;
use tracing::{debug, trace, warn};

/// Signed integer type carrying an interval's adjusted encoding.
///
/// The width is never below `point + 1`, so a sign bit always sits above the fractional field.
pub fn lower_interval_type(interval: &IntervalType) -> Result<Type> {
    resolved_bounds(interval)?;
    let point = interval.point.known().ok_or_else(|| LoweringError::UnknownBinaryPoint {
        ty: interval.to_string(),
    })?;
    let intrinsic = interval.width.known().ok_or_else(|| LoweringError::OpenBound {
        ty: interval.to_string(),
    })?;
    Ok(Type::SInt(Width::Known(intrinsic.max(point + 1))))
}

fn resolved_bounds(interval: &IntervalType) -> Result<(BigInt, BigInt)> {
    if interval.has_open_bound() {
        return Err(LoweringError::OpenBound {
            ty: interval.to_string(),
        });
    }
    interval
        .adjusted_bounds()
        .ok_or_else(|| LoweringError::UnknownBinaryPoint {
            ty: interval.to_string(),
        })
}

fn operand_bounds(op: PrimOp, ty: &Type) -> Result<(BigInt, BigInt)> {
    match ty {
        Type::Interval(interval) => resolved_bounds(interval),
        other => Err(LoweringError::UnexpectedOperand {
            op: op.to_string(),
            ty: other.to_string(),
        }),
    }
}

fn operands<const N: usize>(op: PrimOp, args: Vec<Expression>) -> Result<[Expression; N]> {
    let found = args.len();
    <[Expression; N]>::try_from(args).map_err(|_| LoweringError::Arity {
        op: op.to_string(),
        expected: N,
        found,
    })
}

fn literal(value: &BigInt) -> Expression {
    Expression::sint(value.clone())
}

fn unary(op: PrimOp, arg: Expression, consts: Vec<BigInt>) -> Expression {
    Expression::prim(op, vec![arg], consts, Type::Unknown)
}

fn binary(op: PrimOp, lhs: Expression, rhs: Expression) -> Expression {
    Expression::prim(op, vec![lhs, rhs], Vec::new(), Type::Unknown)
}

fn select(cond: Expression, tval: Expression, fval: Expression) -> Expression {
    Expression::mux(cond, tval, fval, Type::Unknown)
}

/// Replaces interval types with signed integers and expands interval operators.
///
/// Expects aligned input. Synthesized nodes carry `Type::Unknown` until inference runs again.
#[derive(Debug, Default)]
pub struct LowerIntervals {
    warn_on_remainder_wrap: bool,
    stats: LoweringStats,
}

impl LowerIntervals {
    pub fn new(warn_on_remainder_wrap: bool) -> Self {
        Self {
            warn_on_remainder_wrap,
            stats: LoweringStats::default(),
        }
    }

    pub fn stats(&self) -> &LoweringStats {
        &self.stats
    }

    pub fn into_stats(self) -> LoweringStats {
        self.stats
    }

    pub fn lower(&mut self, circuit: Circuit) -> Result<Circuit> {
        circuit.try_map_modules(|module| self.lower_module(module))
    }

    fn lower_module(&mut self, module: DefModule) -> Result<DefModule> {
        debug!(module = module.name(), "lowering interval types");
        module
            .try_map_body(|body| self.lower_stmt(body))?
            .try_map_ports(|port| port.try_map_type(|ty| self.lower_type(ty)))
    }

    fn lower_stmt(&mut self, stmt: Statement) -> Result<Statement> {
        stmt.try_map_type(|ty| self.lower_type(ty))?
            .try_map_stmts(|s| self.lower_stmt(s))?
            .try_map_exprs(|e| self.lower_expr(e))
    }

    fn lower_type(&mut self, ty: Type) -> Result<Type> {
        match ty {
            Type::Interval(interval) => {
                self.stats.types_rewritten += 1;
                lower_interval_type(&interval)
            }
            aggregate @ (Type::Bundle(_) | Type::Vector(_, _)) => {
                aggregate.try_map(|t| self.lower_type(t))
            }
            ground => Ok(ground),
        }
    }

    fn lower_expr(&mut self, expr: Expression) -> Result<Expression> {
        match expr {
            Expression::DoPrim {
                op,
                args,
                consts,
                ty,
            } => {
                // Decisions need the operand types as they were before lowering.
                let operand_types: Vec<Type> = args.iter().map(Expression::ty).collect();
                let args = args
                    .into_iter()
                    .map(|a| self.lower_expr(a))
                    .collect::<Result<Vec<_>>>()?;
                self.lower_prim(op, args, &operand_types, consts, ty)
            }
            other => other
                .try_map_children(|child| self.lower_expr(child))?
                .try_map_type(|ty| self.lower_type(ty)),
        }
    }

    fn lower_prim(
        &mut self,
        op: PrimOp,
        args: Vec<Expression>,
        operand_types: &[Type],
        consts: Vec<BigInt>,
        ty: Type,
    ) -> Result<Expression> {
        match op {
            PrimOp::AsInterval => self.lower_as_interval(args, operand_types),
            PrimOp::IncP => self.rebind_shift(PrimOp::Shl, args, consts),
            PrimOp::DecP => self.rebind_shift(PrimOp::Shr, args, consts),
            PrimOp::Clip => self.lower_clip(args, operand_types, &ty),
            PrimOp::Wrap => self.lower_wrap(args, operand_types),
            PrimOp::SetP => Err(LoweringError::UnexpectedOperator { op: op.to_string() }),
            PrimOp::Add
            | PrimOp::Sub
            | PrimOp::Mul
            | PrimOp::Div
            | PrimOp::Rem
            | PrimOp::Lt
            | PrimOp::Leq
            | PrimOp::Gt
            | PrimOp::Geq
            | PrimOp::Eq
            | PrimOp::Neq
            | PrimOp::Pad
            | PrimOp::AsUInt
            | PrimOp::AsSInt
            | PrimOp::Shl
            | PrimOp::Shr
            | PrimOp::Dshl
            | PrimOp::Dshr
            | PrimOp::Cvt
            | PrimOp::Neg
            | PrimOp::Not
            | PrimOp::And
            | PrimOp::Or
            | PrimOp::Xor
            | PrimOp::Andr
            | PrimOp::Orr
            | PrimOp::Xorr
            | PrimOp::Cat
            | PrimOp::Bits
            | PrimOp::Head
            | PrimOp::Tail => {
                let ty = self.lower_type(ty)?;
                Ok(Expression::prim(op, args, consts, ty))
            }
        }
    }

    fn lower_as_interval(
        &mut self,
        args: Vec<Expression>,
        operand_types: &[Type],
    ) -> Result<Expression> {
        let [arg] = operands::<1>(PrimOp::AsInterval, args)?;
        self.stats.casts_lowered += 1;
        match &operand_types[0] {
            // Widen first so the top bit of the unsigned pattern is not read as a sign.
            Type::UInt(Width::Known(w)) => {
                let padded = unary(PrimOp::Pad, arg, vec![BigInt::from(*w + 1)]);
                Ok(unary(PrimOp::AsSInt, padded, Vec::new()))
            }
            Type::UInt(Width::Unknown) => Err(LoweringError::UnexpectedOperand {
                op: PrimOp::AsInterval.to_string(),
                ty: operand_types[0].to_string(),
            }),
            _ => Ok(unary(PrimOp::AsSInt, arg, Vec::new())),
        }
    }

    fn rebind_shift(
        &mut self,
        shift: PrimOp,
        args: Vec<Expression>,
        consts: Vec<BigInt>,
    ) -> Result<Expression> {
        let [arg] = operands::<1>(shift, args)?;
        self.stats.shifts_rebound += 1;
        Ok(unary(shift, arg, consts))
    }

    fn lower_clip(
        &mut self,
        args: Vec<Expression>,
        operand_types: &[Type],
        result: &Type,
    ) -> Result<Expression> {
        let [value, _] = operands::<2>(PrimOp::Clip, args)?;
        let (lo, hi) = match result {
            Type::Interval(interval) => resolved_bounds(interval)?,
            other => {
                return Err(LoweringError::NotAnInterval {
                    context: "clip result".to_string(),
                    ty: other.to_string(),
                })
            }
        };
        let (in_lo, in_hi) = operand_bounds(PrimOp::Clip, &operand_types[0])?;
        let check = RangeCheck {
            lo,
            hi,
            in_lo,
            in_hi,
        };
        let action = SaturateAction::decide(&check);
        trace!(
            lo = %check.lo,
            hi = %check.hi,
            in_lo = %check.in_lo,
            in_hi = %check.in_hi,
            ?action,
            "clip"
        );
        self.stats.saturates.record(action.checks());

        let lo = literal(&check.lo);
        let hi = literal(&check.hi);
        Ok(match action {
            SaturateAction::PassThrough => value,
            SaturateAction::ClampLow => {
                select(binary(PrimOp::Lt, value.clone(), lo.clone()), lo, value)
            }
            SaturateAction::ClampHigh => {
                select(binary(PrimOp::Gt, value.clone(), hi.clone()), hi, value)
            }
            SaturateAction::ClampBoth => select(
                binary(PrimOp::Gt, value.clone(), hi.clone()),
                hi,
                select(binary(PrimOp::Lt, value.clone(), lo.clone()), lo, value),
            ),
        })
    }

    fn lower_wrap(&mut self, args: Vec<Expression>, operand_types: &[Type]) -> Result<Expression> {
        let [value, _] = operands::<2>(PrimOp::Wrap, args)?;

        let (lo, hi) = match &operand_types[1] {
            Type::SInt(width) => {
                let top = width
                    .known()
                    .and_then(|w| w.checked_sub(1))
                    .ok_or_else(|| LoweringError::UnexpectedOperand {
                        op: PrimOp::Wrap.to_string(),
                        ty: operand_types[1].to_string(),
                    })?;
                self.stats.width_wraps += 1;
                let low_bits = unary(
                    PrimOp::Bits,
                    value,
                    vec![BigInt::from(top), BigInt::from(0)],
                );
                return Ok(unary(PrimOp::AsSInt, low_bits, Vec::new()));
            }
            Type::UInt(Width::Known(w)) => (BigInt::from(0), (BigInt::one() << *w) - 1),
            Type::Interval(interval) => resolved_bounds(interval)?,
            other => {
                return Err(LoweringError::UnexpectedOperand {
                    op: PrimOp::Wrap.to_string(),
                    ty: other.to_string(),
                })
            }
        };
        let (in_lo, in_hi) = operand_bounds(PrimOp::Wrap, &operand_types[0])?;
        let check = RangeCheck {
            lo,
            hi,
            in_lo,
            in_hi,
        };
        let action = WrapAction::decide(&check);
        trace!(
            lo = %check.lo,
            hi = %check.hi,
            in_lo = %check.in_lo,
            in_hi = %check.in_hi,
            ?action,
            "wrap"
        );

        let modulus = literal(&(check.range() + 1));
        let lo = literal(&check.lo);
        let hi = literal(&check.hi);
        let sub_correct = |v: Expression| binary(PrimOp::Sub, v, modulus.clone());
        let add_correct = |v: Expression| binary(PrimOp::Add, v, modulus.clone());

        let lowered = match action {
            WrapAction::PassThrough => value,
            WrapAction::CorrectLow => select(
                binary(PrimOp::Lt, value.clone(), lo),
                add_correct(value.clone()),
                value,
            ),
            WrapAction::CorrectHigh => select(
                binary(PrimOp::Gt, value.clone(), hi),
                sub_correct(value.clone()),
                value,
            ),
            WrapAction::CorrectBoth => select(
                binary(PrimOp::Gt, value.clone(), hi),
                sub_correct(value.clone()),
                select(
                    binary(PrimOp::Lt, value.clone(), lo),
                    add_correct(value.clone()),
                    value,
                ),
            ),
            WrapAction::Remainder => {
                if self.warn_on_remainder_wrap {
                    warn!(
                        value = %value,
                        lo = %check.lo,
                        hi = %check.hi,
                        "wrap needs a remainder; input range spans more than one period"
                    );
                }
                self.stats.remainder_wraps += 1;
                floor_mod(value, lo, modulus.clone())
            }
        };
        if let Some(checks) = action.checks() {
            self.stats.wraps.record(checks);
        }
        Ok(lowered)
    }
}

/// `lo + ((value - lo) mod m)` with a non-negative residue, built from the truncating `rem`.
fn floor_mod(value: Expression, lo: Expression, modulus: Expression) -> Expression {
    let residue = binary(
        PrimOp::Rem,
        binary(PrimOp::Sub, value, lo.clone()),
        modulus.clone(),
    );
    let non_negative = select(
        binary(PrimOp::Lt, residue.clone(), Expression::sint(0)),
        binary(PrimOp::Add, residue.clone(), modulus),
        residue,
    );
    binary(PrimOp::Add, non_negative, lo)
}
