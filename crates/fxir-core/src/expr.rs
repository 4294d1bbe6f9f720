use crate::types::{signed_width, unsigned_width, Type, Width};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
    Pad,
    AsUInt,
    AsSInt,
    Shl,
    Shr,
    Dshl,
    Dshr,
    Cvt,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Andr,
    Orr,
    Xorr,
    Cat,
    Bits,
    Head,
    Tail,

    /// Reinterpret raw bits as an interval value.
    AsInterval,
    /// Raise the binary point by a constant number of bits.
    IncP,
    /// Lower the binary point by a constant number of bits.
    DecP,
    /// Set the binary point to a constant.
    SetP,
    /// Reduce the first operand into the second operand's range modulo its size.
    Wrap,
    /// Saturate the first operand into the second operand's range.
    Clip,
}

impl PrimOp {
    pub fn name(self) -> &'static str {
        match self {
            PrimOp::Add => "add",
            PrimOp::Sub => "sub",
            PrimOp::Mul => "mul",
            PrimOp::Div => "div",
            PrimOp::Rem => "rem",
            PrimOp::Lt => "lt",
            PrimOp::Leq => "leq",
            PrimOp::Gt => "gt",
            PrimOp::Geq => "geq",
            PrimOp::Eq => "eq",
            PrimOp::Neq => "neq",
            PrimOp::Pad => "pad",
            PrimOp::AsUInt => "asUInt",
            PrimOp::AsSInt => "asSInt",
            PrimOp::Shl => "shl",
            PrimOp::Shr => "shr",
            PrimOp::Dshl => "dshl",
            PrimOp::Dshr => "dshr",
            PrimOp::Cvt => "cvt",
            PrimOp::Neg => "neg",
            PrimOp::Not => "not",
            PrimOp::And => "and",
            PrimOp::Or => "or",
            PrimOp::Xor => "xor",
            PrimOp::Andr => "andr",
            PrimOp::Orr => "orr",
            PrimOp::Xorr => "xorr",
            PrimOp::Cat => "cat",
            PrimOp::Bits => "bits",
            PrimOp::Head => "head",
            PrimOp::Tail => "tail",
            PrimOp::AsInterval => "asInterval",
            PrimOp::IncP => "incp",
            PrimOp::DecP => "decp",
            PrimOp::SetP => "setp",
            PrimOp::Wrap => "wrap",
            PrimOp::Clip => "clip",
        }
    }

    pub fn is_interval_specific(self) -> bool {
        matches!(
            self,
            PrimOp::AsInterval
                | PrimOp::IncP
                | PrimOp::DecP
                | PrimOp::SetP
                | PrimOp::Wrap
                | PrimOp::Clip
        )
    }

    /// Operators whose interval operands must share one binary point.
    /// `Mul` is absent: its result point is the sum of the operand points.
    pub fn is_binary_point_sensitive(self) -> bool {
        matches!(
            self,
            PrimOp::Add
                | PrimOp::Sub
                | PrimOp::Lt
                | PrimOp::Leq
                | PrimOp::Gt
                | PrimOp::Geq
                | PrimOp::Eq
                | PrimOp::Neq
                | PrimOp::Wrap
                | PrimOp::Clip
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    Reference {
        name: String,
        ty: Type,
    },
    SubField {
        expr: Box<Expression>,
        name: String,
        ty: Type,
    },
    SubIndex {
        expr: Box<Expression>,
        index: usize,
        ty: Type,
    },
    UIntLiteral {
        value: BigInt,
        width: Width,
    },
    SIntLiteral {
        value: BigInt,
        width: Width,
    },
    DoPrim {
        op: PrimOp,
        args: Vec<Expression>,
        consts: Vec<BigInt>,
        ty: Type,
    },
    Mux {
        cond: Box<Expression>,
        tval: Box<Expression>,
        fval: Box<Expression>,
        ty: Type,
    },
}

impl Expression {
    pub fn reference(name: impl Into<String>, ty: Type) -> Self {
        Expression::Reference {
            name: name.into(),
            ty,
        }
    }

    pub fn sub_field(expr: Expression, name: impl Into<String>, ty: Type) -> Self {
        Expression::SubField {
            expr: Box::new(expr),
            name: name.into(),
            ty,
        }
    }

    pub fn sub_index(expr: Expression, index: usize, ty: Type) -> Self {
        Expression::SubIndex {
            expr: Box::new(expr),
            index,
            ty,
        }
    }

    /// Unsigned literal at its minimal width.
    pub fn uint(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        let width = Width::Known(unsigned_width(&value));
        Expression::UIntLiteral { value, width }
    }

    /// Signed literal at its minimal two's-complement width.
    pub fn sint(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        let width = Width::Known(signed_width(&value));
        Expression::SIntLiteral { value, width }
    }

    pub fn prim(op: PrimOp, args: Vec<Expression>, consts: Vec<BigInt>, ty: Type) -> Self {
        Expression::DoPrim {
            op,
            args,
            consts,
            ty,
        }
    }

    pub fn mux(cond: Expression, tval: Expression, fval: Expression, ty: Type) -> Self {
        Expression::Mux {
            cond: Box::new(cond),
            tval: Box::new(tval),
            fval: Box::new(fval),
            ty,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Expression::Reference { ty, .. }
            | Expression::SubField { ty, .. }
            | Expression::SubIndex { ty, .. }
            | Expression::DoPrim { ty, .. }
            | Expression::Mux { ty, .. } => ty.clone(),
            Expression::UIntLiteral { width, .. } => Type::UInt(*width),
            Expression::SIntLiteral { width, .. } => Type::SInt(*width),
        }
    }

    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Reference { .. }
            | Expression::UIntLiteral { .. }
            | Expression::SIntLiteral { .. } => Vec::new(),
            Expression::SubField { expr, .. } | Expression::SubIndex { expr, .. } => {
                vec![expr.as_ref()]
            }
            Expression::DoPrim { args, .. } => args.iter().collect(),
            Expression::Mux {
                cond, tval, fval, ..
            } => vec![cond.as_ref(), tval.as_ref(), fval.as_ref()],
        }
    }

    /// Rebuilds the node with each direct child replaced by `f(child)`.
    pub fn try_map_children<E, F>(self, mut f: F) -> Result<Expression, E>
    where
        F: FnMut(Expression) -> Result<Expression, E>,
    {
        Ok(match self {
            leaf @ (Expression::Reference { .. }
            | Expression::UIntLiteral { .. }
            | Expression::SIntLiteral { .. }) => leaf,
            Expression::SubField { expr, name, ty } => Expression::SubField {
                expr: Box::new(f(*expr)?),
                name,
                ty,
            },
            Expression::SubIndex { expr, index, ty } => Expression::SubIndex {
                expr: Box::new(f(*expr)?),
                index,
                ty,
            },
            Expression::DoPrim {
                op,
                args,
                consts,
                ty,
            } => Expression::DoPrim {
                op,
                args: args.into_iter().map(&mut f).collect::<Result<Vec<_>, E>>()?,
                consts,
                ty,
            },
            Expression::Mux {
                cond,
                tval,
                fval,
                ty,
            } => Expression::Mux {
                cond: Box::new(f(*cond)?),
                tval: Box::new(f(*tval)?),
                fval: Box::new(f(*fval)?),
                ty,
            },
        })
    }

    /// Rewrites the node's own result type. Literal types follow their width and are untouched.
    pub fn try_map_type<E, F>(self, f: F) -> Result<Expression, E>
    where
        F: FnOnce(Type) -> Result<Type, E>,
    {
        Ok(match self {
            Expression::Reference { name, ty } => Expression::Reference { name, ty: f(ty)? },
            Expression::SubField { expr, name, ty } => Expression::SubField {
                expr,
                name,
                ty: f(ty)?,
            },
            Expression::SubIndex { expr, index, ty } => Expression::SubIndex {
                expr,
                index,
                ty: f(ty)?,
            },
            Expression::DoPrim {
                op,
                args,
                consts,
                ty,
            } => Expression::DoPrim {
                op,
                args,
                consts,
                ty: f(ty)?,
            },
            Expression::Mux {
                cond,
                tval,
                fval,
                ty,
            } => Expression::Mux {
                cond,
                tval,
                fval,
                ty: f(ty)?,
            },
            literal => literal,
        })
    }

    /// Post-order rewrite: every child is transformed before `f` sees the rebuilt parent.
    pub fn try_transform_up<E, F>(self, f: &mut F) -> Result<Expression, E>
    where
        F: FnMut(Expression) -> Result<Expression, E>,
    {
        let node = self.try_map_children(|child| child.try_transform_up(f))?;
        f(node)
    }
}
