/*! Bottom-up type inference over integer-typed circuits.
 *
 * Lowering passes synthesize new nodes without computing their result types. Running inference once
 * afterwards recomputes every reference, projection, primitive and mux type from declarations and
 * operand types, so rewrites never have to duplicate the width rules.
 */

use crate::{
    circuit::{Circuit, DefModule},
    expr::{Expression, PrimOp},
    pass::Pass,
    stmt::Statement,
    types::{Type, Width},
    IrError, Result,
};
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Recomputes every expression type in a circuit from its operator and operand types.
pub trait TypeInference {
    fn infer(&self, circuit: Circuit) -> Result<Circuit>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InferTypes;

impl InferTypes {
    pub fn new() -> Self {
        Self
    }

    fn infer_module(&self, module: DefModule) -> Result<DefModule> {
        let mut namespace = Namespace::default();
        for port in module.ports() {
            namespace.declare(&port.name, port.ty.clone());
        }
        module.try_map_body(|body| namespace.infer_stmt(body))
    }
}

impl TypeInference for InferTypes {
    fn infer(&self, circuit: Circuit) -> Result<Circuit> {
        circuit.try_map_modules(|m| self.infer_module(m))
    }
}

impl Pass for InferTypes {
    fn name(&self) -> &'static str {
        "infer-types"
    }

    fn description(&self) -> &'static str {
        "Recompute expression types bottom-up from declarations and operand types"
    }

    fn run(&mut self, circuit: Circuit) -> anyhow::Result<Circuit> {
        Ok(self.infer(circuit)?)
    }
}

#[derive(Default)]
struct Namespace {
    types: IndexMap<String, Type>,
}

impl Namespace {
    fn declare(&mut self, name: &str, ty: Type) {
        self.types.insert(name.to_string(), ty);
    }

    fn lookup(&self, name: &str) -> Result<Type> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| IrError::UndeclaredReference(name.to_string()))
    }

    fn infer_stmt(&mut self, stmt: Statement) -> Result<Statement> {
        match stmt {
            Statement::Wire { name, ty } => {
                self.declare(&name, ty.clone());
                Ok(Statement::Wire { name, ty })
            }
            // Registers are visible to their own reset value.
            reg @ Statement::Register { .. } => {
                if let Statement::Register { name, ty, .. } = &reg {
                    self.declare(name, ty.clone());
                }
                reg.try_map_exprs(|e| self.infer_expr(e))
            }
            Statement::Node { name, value } => {
                let value = self.infer_expr(value)?;
                self.declare(&name, value.ty());
                Ok(Statement::Node { name, value })
            }
            other => other
                .try_map_exprs(|e| self.infer_expr(e))?
                .try_map_stmts(|s| self.infer_stmt(s)),
        }
    }

    fn infer_expr(&self, expr: Expression) -> Result<Expression> {
        expr.try_transform_up(&mut |e| self.infer_node(e))
    }

    fn infer_node(&self, expr: Expression) -> Result<Expression> {
        match expr {
            Expression::Reference { name, .. } => {
                let ty = self.lookup(&name)?;
                Ok(Expression::Reference { name, ty })
            }
            Expression::SubField { expr, name, .. } => {
                let parent = expr.ty();
                let ty = parent
                    .field(&name)
                    .map(|f| f.ty.clone())
                    .ok_or_else(|| {
                        IrError::TypeError(format!("{} has no field '{}' in {}", expr, name, parent))
                    })?;
                Ok(Expression::SubField { expr, name, ty })
            }
            Expression::SubIndex { expr, index, .. } => match expr.ty() {
                Type::Vector(elem, size) if index < size => Ok(Expression::SubIndex {
                    expr,
                    index,
                    ty: *elem,
                }),
                other => Err(IrError::TypeError(format!(
                    "cannot index {}[{}] of type {}",
                    expr, index, other
                ))),
            },
            literal @ (Expression::UIntLiteral { .. } | Expression::SIntLiteral { .. }) => {
                Ok(literal)
            }
            Expression::DoPrim {
                op, args, consts, ..
            } => {
                let ty = prim_type(op, &args, &consts)?;
                Ok(Expression::DoPrim {
                    op,
                    args,
                    consts,
                    ty,
                })
            }
            Expression::Mux {
                cond, tval, fval, ..
            } => {
                if !matches!(cond.ty(), Type::UInt(_)) {
                    return Err(IrError::TypeError(format!(
                        "mux condition {} must be UInt, found {}",
                        cond,
                        cond.ty()
                    )));
                }
                let ty = mux_type(&tval.ty(), &fval.ty())?;
                Ok(Expression::Mux {
                    cond,
                    tval,
                    fval,
                    ty,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Unsigned,
    Signed,
}

impl Sign {
    fn ty(self, width: Width) -> Type {
        match self {
            Sign::Unsigned => Type::UInt(width),
            Sign::Signed => Type::SInt(width),
        }
    }
}

fn integer(op: PrimOp, ty: &Type) -> Result<(Sign, Width)> {
    match ty {
        Type::UInt(w) => Ok((Sign::Unsigned, *w)),
        Type::SInt(w) => Ok((Sign::Signed, *w)),
        other => Err(IrError::TypeError(format!(
            "{} expects integer operands, found {}",
            op, other
        ))),
    }
}

fn same_sign(op: PrimOp, a: &Type, b: &Type) -> Result<(Sign, Width, Width)> {
    let (sa, wa) = integer(op, a)?;
    let (sb, wb) = integer(op, b)?;
    if sa != sb {
        return Err(IrError::TypeError(format!(
            "{} operands must share signedness, found {} and {}",
            op, a, b
        )));
    }
    Ok((sa, wa, wb))
}

fn arity(op: PrimOp, args: &[Expression], consts: &[BigInt], n_args: usize, n_consts: usize) -> Result<()> {
    if args.len() != n_args || consts.len() != n_consts {
        return Err(IrError::InvalidOperands(format!(
            "{} takes {} operand(s) and {} constant(s), found {} and {}",
            op,
            n_args,
            n_consts,
            args.len(),
            consts.len()
        )));
    }
    Ok(())
}

fn constant(op: PrimOp, value: &BigInt) -> Result<u32> {
    value.to_u32().ok_or_else(|| {
        IrError::InvalidOperands(format!("{} constant {} is out of range", op, value))
    })
}

fn prim_type(op: PrimOp, args: &[Expression], consts: &[BigInt]) -> Result<Type> {
    let types: Vec<Type> = args.iter().map(Expression::ty).collect();

    match op {
        PrimOp::Add | PrimOp::Sub => {
            arity(op, args, consts, 2, 0)?;
            let (sign, wa, wb) = same_sign(op, &types[0], &types[1])?;
            Ok(sign.ty(wa.max(wb).plus(1)))
        }
        PrimOp::Mul => {
            arity(op, args, consts, 2, 0)?;
            let (sign, wa, wb) = same_sign(op, &types[0], &types[1])?;
            Ok(sign.ty(wa.sum(wb)))
        }
        PrimOp::Div => {
            arity(op, args, consts, 2, 0)?;
            let (sign, wa, _) = same_sign(op, &types[0], &types[1])?;
            Ok(match sign {
                Sign::Unsigned => Type::UInt(wa),
                Sign::Signed => Type::SInt(wa.plus(1)),
            })
        }
        PrimOp::Rem => {
            arity(op, args, consts, 2, 0)?;
            let (sign, wa, wb) = same_sign(op, &types[0], &types[1])?;
            Ok(sign.ty(wa.min(wb)))
        }
        PrimOp::Lt | PrimOp::Leq | PrimOp::Gt | PrimOp::Geq | PrimOp::Eq | PrimOp::Neq => {
            arity(op, args, consts, 2, 0)?;
            same_sign(op, &types[0], &types[1])?;
            Ok(Type::uint(1))
        }
        PrimOp::Pad => {
            arity(op, args, consts, 1, 1)?;
            let n = constant(op, &consts[0])?;
            let (sign, w) = integer(op, &types[0])?;
            Ok(sign.ty(w.max(Width::Known(n))))
        }
        PrimOp::AsUInt | PrimOp::AsSInt => {
            arity(op, args, consts, 1, 0)?;
            let width = match &types[0] {
                Type::UInt(w) | Type::SInt(w) => *w,
                Type::Clock => Width::Known(1),
                other => {
                    return Err(IrError::TypeError(format!(
                        "{} cannot reinterpret {}",
                        op, other
                    )))
                }
            };
            Ok(if op == PrimOp::AsUInt {
                Type::UInt(width)
            } else {
                Type::SInt(width)
            })
        }
        PrimOp::Shl => {
            arity(op, args, consts, 1, 1)?;
            let n = constant(op, &consts[0])?;
            let (sign, w) = integer(op, &types[0])?;
            Ok(sign.ty(w.plus(n)))
        }
        PrimOp::Shr => {
            arity(op, args, consts, 1, 1)?;
            let n = constant(op, &consts[0])?;
            let (sign, w) = integer(op, &types[0])?;
            Ok(sign.ty(w.minus(n)))
        }
        PrimOp::Dshl => {
            arity(op, args, consts, 2, 0)?;
            let (sign, wa) = integer(op, &types[0])?;
            let Type::UInt(wb) = types[1] else {
                return Err(IrError::TypeError(format!(
                    "dshl shift amount must be UInt, found {}",
                    types[1]
                )));
            };
            let grown = match wb {
                Width::Known(b) => {
                    let max_shift = 1u32.checked_shl(b).unwrap_or(u32::MAX).saturating_sub(1);
                    wa.plus(max_shift)
                }
                Width::Unknown => Width::Unknown,
            };
            Ok(sign.ty(grown))
        }
        PrimOp::Dshr => {
            arity(op, args, consts, 2, 0)?;
            let (sign, wa) = integer(op, &types[0])?;
            if !matches!(types[1], Type::UInt(_)) {
                return Err(IrError::TypeError(format!(
                    "dshr shift amount must be UInt, found {}",
                    types[1]
                )));
            }
            Ok(sign.ty(wa))
        }
        PrimOp::Cvt => {
            arity(op, args, consts, 1, 0)?;
            Ok(match integer(op, &types[0])? {
                (Sign::Unsigned, w) => Type::SInt(w.plus(1)),
                (Sign::Signed, w) => Type::SInt(w),
            })
        }
        PrimOp::Neg => {
            arity(op, args, consts, 1, 0)?;
            let (_, w) = integer(op, &types[0])?;
            Ok(Type::SInt(w.plus(1)))
        }
        PrimOp::Not => {
            arity(op, args, consts, 1, 0)?;
            let (_, w) = integer(op, &types[0])?;
            Ok(Type::UInt(w))
        }
        PrimOp::And | PrimOp::Or | PrimOp::Xor => {
            arity(op, args, consts, 2, 0)?;
            let (_, wa, wb) = same_sign(op, &types[0], &types[1])?;
            Ok(Type::UInt(wa.max(wb)))
        }
        PrimOp::Andr | PrimOp::Orr | PrimOp::Xorr => {
            arity(op, args, consts, 1, 0)?;
            integer(op, &types[0])?;
            Ok(Type::uint(1))
        }
        PrimOp::Cat => {
            arity(op, args, consts, 2, 0)?;
            let (_, wa, wb) = same_sign(op, &types[0], &types[1])?;
            Ok(Type::UInt(wa.sum(wb)))
        }
        PrimOp::Bits => {
            arity(op, args, consts, 1, 2)?;
            let hi = constant(op, &consts[0])?;
            let lo = constant(op, &consts[1])?;
            let (_, w) = integer(op, &types[0])?;
            let out_of_range = w.known().map_or(false, |w| hi >= w);
            if hi < lo || out_of_range {
                return Err(IrError::InvalidOperands(format!(
                    "bits({}, {}, {}) selects outside {}",
                    args[0], hi, lo, types[0]
                )));
            }
            Ok(Type::uint(hi - lo + 1))
        }
        PrimOp::Head => {
            arity(op, args, consts, 1, 1)?;
            let n = constant(op, &consts[0])?;
            integer(op, &types[0])?;
            Ok(Type::uint(n))
        }
        PrimOp::Tail => {
            arity(op, args, consts, 1, 1)?;
            let n = constant(op, &consts[0])?;
            let (_, w) = integer(op, &types[0])?;
            Ok(Type::UInt(w.map(|w| w.saturating_sub(n))))
        }
        PrimOp::AsInterval
        | PrimOp::IncP
        | PrimOp::DecP
        | PrimOp::SetP
        | PrimOp::Wrap
        | PrimOp::Clip => Err(IrError::UnsupportedOperation(format!(
            "{} must be lowered before type inference",
            op
        ))),
    }
}

fn mux_type(tval: &Type, fval: &Type) -> Result<Type> {
    match (tval, fval) {
        (Type::UInt(a), Type::UInt(b)) => Ok(Type::UInt(a.max(*b))),
        (Type::SInt(a), Type::SInt(b)) => Ok(Type::SInt(a.max(*b))),
        (a, b) if a == b => Ok(a.clone()),
        (a, b) => Err(IrError::TypeError(format!(
            "mux branches have incompatible types {} and {}",
            a, b
        ))),
    }
}
