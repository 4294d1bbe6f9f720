use crate::expr::Expression;
use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegReset {
    pub signal: Expression,
    pub init: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    Wire {
        name: String,
        ty: Type,
    },
    Register {
        name: String,
        ty: Type,
        clock: Expression,
        reset: Option<RegReset>,
    },
    Node {
        name: String,
        value: Expression,
    },
    Connect {
        loc: Expression,
        expr: Expression,
    },
    PartialConnect {
        loc: Expression,
        expr: Expression,
    },
    Conditionally {
        pred: Expression,
        conseq: Box<Statement>,
        alt: Box<Statement>,
    },
    Block(Vec<Statement>),
    IsInvalid {
        expr: Expression,
    },
    Empty,
}

impl Statement {
    pub fn connect(loc: Expression, expr: Expression) -> Self {
        Statement::Connect { loc, expr }
    }

    pub fn node(name: impl Into<String>, value: Expression) -> Self {
        Statement::Node {
            name: name.into(),
            value,
        }
    }

    pub fn when(pred: Expression, conseq: Statement, alt: Statement) -> Self {
        Statement::Conditionally {
            pred,
            conseq: Box::new(conseq),
            alt: Box::new(alt),
        }
    }

    /// Name introduced by a declaration, if any.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Statement::Wire { name, .. }
            | Statement::Register { name, .. }
            | Statement::Node { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Declared type of a wire or register.
    pub fn declared_type(&self) -> Option<&Type> {
        match self {
            Statement::Wire { ty, .. } | Statement::Register { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn exprs(&self) -> Vec<&Expression> {
        match self {
            Statement::Register { clock, reset, .. } => {
                let mut exprs = vec![clock];
                if let Some(reset) = reset {
                    exprs.push(&reset.signal);
                    exprs.push(&reset.init);
                }
                exprs
            }
            Statement::Node { value, .. } => vec![value],
            Statement::Connect { loc, expr } | Statement::PartialConnect { loc, expr } => {
                vec![loc, expr]
            }
            Statement::Conditionally { pred, .. } => vec![pred],
            Statement::IsInvalid { expr } => vec![expr],
            Statement::Wire { .. } | Statement::Block(_) | Statement::Empty => Vec::new(),
        }
    }

    pub fn stmts(&self) -> Vec<&Statement> {
        match self {
            Statement::Conditionally { conseq, alt, .. } => vec![conseq.as_ref(), alt.as_ref()],
            Statement::Block(stmts) => stmts.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Rewrites the declared type of a wire or register.
    pub fn try_map_type<E, F>(self, f: F) -> Result<Statement, E>
    where
        F: FnOnce(Type) -> Result<Type, E>,
    {
        Ok(match self {
            Statement::Wire { name, ty } => Statement::Wire { name, ty: f(ty)? },
            Statement::Register {
                name,
                ty,
                clock,
                reset,
            } => Statement::Register {
                name,
                ty: f(ty)?,
                clock,
                reset,
            },
            other => other,
        })
    }

    /// Rewrites the expressions held directly by this statement, not those of nested statements.
    pub fn try_map_exprs<E, F>(self, mut f: F) -> Result<Statement, E>
    where
        F: FnMut(Expression) -> Result<Expression, E>,
    {
        Ok(match self {
            Statement::Register {
                name,
                ty,
                clock,
                reset,
            } => Statement::Register {
                name,
                ty,
                clock: f(clock)?,
                reset: match reset {
                    Some(RegReset { signal, init }) => Some(RegReset {
                        signal: f(signal)?,
                        init: f(init)?,
                    }),
                    None => None,
                },
            },
            Statement::Node { name, value } => Statement::Node {
                name,
                value: f(value)?,
            },
            Statement::Connect { loc, expr } => Statement::Connect {
                loc: f(loc)?,
                expr: f(expr)?,
            },
            Statement::PartialConnect { loc, expr } => Statement::PartialConnect {
                loc: f(loc)?,
                expr: f(expr)?,
            },
            Statement::Conditionally { pred, conseq, alt } => Statement::Conditionally {
                pred: f(pred)?,
                conseq,
                alt,
            },
            Statement::IsInvalid { expr } => Statement::IsInvalid { expr: f(expr)? },
            other => other,
        })
    }

    /// Rewrites the statements nested directly inside this one.
    pub fn try_map_stmts<E, F>(self, mut f: F) -> Result<Statement, E>
    where
        F: FnMut(Statement) -> Result<Statement, E>,
    {
        Ok(match self {
            Statement::Conditionally { pred, conseq, alt } => Statement::Conditionally {
                pred,
                conseq: Box::new(f(*conseq)?),
                alt: Box::new(f(*alt)?),
            },
            Statement::Block(stmts) => Statement::Block(
                stmts
                    .into_iter()
                    .map(&mut f)
                    .collect::<Result<Vec<_>, E>>()?,
            ),
            other => other,
        })
    }
}
