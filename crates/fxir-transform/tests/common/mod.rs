#![allow(dead_code)]

use fxir_core::{Circuit, CircuitBuilder, Expression, ModuleBuilder, PrimOp, Statement, Type};
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use std::collections::HashMap;

pub type Env = HashMap<String, BigInt>;

pub fn env(values: &[(&str, i64)]) -> Env {
    values
        .iter()
        .map(|(name, v)| (name.to_string(), BigInt::from(*v)))
        .collect()
}

/// `Top` with inputs `a`, `b` and a single node `n = op(a, b)`.
pub fn binary_node_circuit(op: PrimOp, a: Type, b: Type, result: Type) -> Circuit {
    let node = Expression::prim(
        op,
        vec![
            Expression::reference("a", a.clone()),
            Expression::reference("b", b.clone()),
        ],
        Vec::new(),
        result,
    );
    CircuitBuilder::new("Top")
        .module(
            ModuleBuilder::new("Top")
                .input("a", a)
                .input("b", b)
                .node("n", node)
                .build(),
        )
        .build()
}

fn find_node<'a>(stmt: &'a Statement, name: &str) -> Option<&'a Expression> {
    match stmt {
        Statement::Node { name: n, value } if n == name => Some(value),
        other => other.stmts().into_iter().find_map(|s| find_node(s, name)),
    }
}

pub fn node_value(circuit: &Circuit, module: &str, name: &str) -> Expression {
    let body = circuit
        .module(module)
        .and_then(|m| m.body())
        .unwrap_or_else(|| panic!("module {} has no body", module));
    find_node(body, name)
        .cloned()
        .unwrap_or_else(|| panic!("node {} not found", name))
}

fn mask(width: usize) -> BigInt {
    (BigInt::one() << width) - 1
}

fn width_of(expr: &Expression) -> usize {
    expr.ty()
        .width()
        .known()
        .unwrap_or_else(|| panic!("{} has no inferred width", expr)) as usize
}

fn as_signed(value: &BigInt, width: usize) -> BigInt {
    let bits = value & mask(width);
    if width > 0 && bits.bit((width - 1) as u64) {
        bits - (BigInt::one() << width)
    } else {
        bits
    }
}

fn flag(b: bool) -> BigInt {
    if b {
        BigInt::one()
    } else {
        BigInt::zero()
    }
}

/// Evaluates a lowered expression over unbounded integers.
///
/// `rem` truncates toward zero and `shr` floors, matching two's-complement hardware.
pub fn eval(expr: &Expression, env: &Env) -> BigInt {
    match expr {
        Expression::Reference { name, .. } => env
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no value bound for {}", name)),
        Expression::UIntLiteral { value, .. } | Expression::SIntLiteral { value, .. } => {
            value.clone()
        }
        Expression::Mux {
            cond, tval, fval, ..
        } => {
            if eval(cond, env).is_zero() {
                eval(fval, env)
            } else {
                eval(tval, env)
            }
        }
        Expression::DoPrim {
            op, args, consts, ..
        } => {
            let v: Vec<BigInt> = args.iter().map(|a| eval(a, env)).collect();
            let c = |i: usize| consts[i].to_usize().unwrap();
            match op {
                PrimOp::Add => &v[0] + &v[1],
                PrimOp::Sub => &v[0] - &v[1],
                PrimOp::Mul => &v[0] * &v[1],
                PrimOp::Rem => &v[0] % &v[1],
                PrimOp::Lt => flag(v[0] < v[1]),
                PrimOp::Leq => flag(v[0] <= v[1]),
                PrimOp::Gt => flag(v[0] > v[1]),
                PrimOp::Geq => flag(v[0] >= v[1]),
                PrimOp::Eq => flag(v[0] == v[1]),
                PrimOp::Neq => flag(v[0] != v[1]),
                PrimOp::Pad => v[0].clone(),
                PrimOp::Shl => &v[0] << c(0),
                PrimOp::Shr => &v[0] >> c(0),
                PrimOp::AsSInt => as_signed(&v[0], width_of(&args[0])),
                PrimOp::AsUInt => &v[0] & mask(width_of(&args[0])),
                PrimOp::Bits => (&v[0] >> c(1)) & mask(c(0) - c(1) + 1),
                other => panic!("evaluator does not model {}", other),
            }
        }
        other => panic!("evaluator does not model {}", other),
    }
}
