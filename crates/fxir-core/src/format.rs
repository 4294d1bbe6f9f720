use crate::{
    circuit::{Circuit, DefModule, Direction, Port},
    expr::{Expression, PrimOp},
    stmt::Statement,
    types::{is_power_of_two, Bound, IntervalType, Type, Width},
};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Signed;
use std::fmt;

const INDENT: &str = "  ";

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::Known(w) => write!(f, "<{}>", w),
            Width::Unknown => Ok(()),
        }
    }
}

/// Dyadic rationals print as exact decimals, anything else as `n/d`.
fn write_rational(f: &mut fmt::Formatter<'_>, value: &BigRational) -> fmt::Result {
    if value.is_integer() {
        return write!(f, "{}", value.numer());
    }

    let denom = value.denom();
    if !is_power_of_two(denom) {
        return write!(f, "{}/{}", value.numer(), denom);
    }

    let places = (denom.bits() - 1) as usize;
    let scaled = value.numer().abs() * num_traits::pow(BigInt::from(5), places);
    let digits = format!("{:0>width$}", scaled.to_string(), width = places + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - places);
    let sign = if value.is_negative() { "-" } else { "" };
    write!(f, "{}{}.{}", sign, int_part, frac_part)
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Known(v) => write_rational(f, v),
            Bound::Open => write!(f, "?"),
        }
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interval[{}, {}]", self.lower, self.upper)?;
        if let Width::Known(p) = self.point {
            write!(f, ".{}", p)?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::UInt(w) => write!(f, "UInt{}", w),
            Type::SInt(w) => write!(f, "SInt{}", w),
            Type::Interval(i) => write!(f, "{}", i),
            Type::Clock => write!(f, "Clock"),
            Type::Bundle(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if field.flip {
                        write!(f, "flip ")?;
                    }
                    write!(f, "{} : {}", field.name, field.ty)?;
                }
                write!(f, " }}")
            }
            Type::Vector(elem, size) => write!(f, "{}[{}]", elem, size),
            Type::Unknown => write!(f, "?"),
        }
    }
}

impl fmt::Display for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Reference { name, .. } => write!(f, "{}", name),
            Expression::SubField { expr, name, .. } => write!(f, "{}.{}", expr, name),
            Expression::SubIndex { expr, index, .. } => write!(f, "{}[{}]", expr, index),
            Expression::UIntLiteral { value, width } => write!(f, "UInt{}({})", width, value),
            Expression::SIntLiteral { value, width } => write!(f, "SInt{}({})", width, value),
            Expression::DoPrim {
                op, args, consts, ..
            } => {
                write!(f, "{}(", op)?;
                let mut first = true;
                for arg in args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                    first = false;
                }
                for c in consts {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                    first = false;
                }
                write!(f, ")")
            }
            Expression::Mux {
                cond, tval, fval, ..
            } => write!(f, "mux({}, {}, {})", cond, tval, fval),
        }
    }
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Statement, depth: usize) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    match stmt {
        Statement::Wire { name, ty } => writeln!(f, "{}wire {} : {}", indent, name, ty),
        Statement::Register {
            name,
            ty,
            clock,
            reset,
        } => {
            write!(f, "{}reg {} : {}, {}", indent, name, ty, clock)?;
            if let Some(reset) = reset {
                write!(f, " with : (reset => ({}, {}))", reset.signal, reset.init)?;
            }
            writeln!(f)
        }
        Statement::Node { name, value } => writeln!(f, "{}node {} = {}", indent, name, value),
        Statement::Connect { loc, expr } => writeln!(f, "{}{} <= {}", indent, loc, expr),
        Statement::PartialConnect { loc, expr } => writeln!(f, "{}{} <- {}", indent, loc, expr),
        Statement::Conditionally { pred, conseq, alt } => {
            writeln!(f, "{}when {} :", indent, pred)?;
            write_stmt(f, conseq, depth + 1)?;
            if !matches!(alt.as_ref(), Statement::Empty) {
                writeln!(f, "{}else :", indent)?;
                write_stmt(f, alt, depth + 1)?;
            }
            Ok(())
        }
        Statement::Block(stmts) => {
            for s in stmts {
                write_stmt(f, s, depth)?;
            }
            Ok(())
        }
        Statement::IsInvalid { expr } => writeln!(f, "{}{} is invalid", indent, expr),
        Statement::Empty => writeln!(f, "{}skip", indent),
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

fn write_port(f: &mut fmt::Formatter<'_>, port: &Port, depth: usize) -> fmt::Result {
    let direction = match port.direction {
        Direction::Input => "input",
        Direction::Output => "output",
    };
    writeln!(
        f,
        "{}{} {} : {}",
        INDENT.repeat(depth),
        direction,
        port.name,
        port.ty
    )
}

fn write_module(f: &mut fmt::Formatter<'_>, module: &DefModule, depth: usize) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    match module {
        DefModule::Module(m) => {
            writeln!(f, "{}module {} :", indent, m.name)?;
            for port in &m.ports {
                write_port(f, port, depth + 1)?;
            }
            writeln!(f)?;
            write_stmt(f, &m.body, depth + 1)
        }
        DefModule::ExtModule(m) => {
            writeln!(f, "{}extmodule {} :", indent, m.name)?;
            for port in &m.ports {
                write_port(f, port, depth + 1)?;
            }
            Ok(())
        }
    }
}

impl fmt::Display for DefModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_module(f, self, 0)
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "circuit {} :", self.main)?;
        for module in &self.modules {
            write_module(f, module, 1)?;
        }
        Ok(())
    }
}
