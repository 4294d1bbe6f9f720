use super::*;
use fxir_core::{
    Bound, CircuitBuilder, Expression, Field, IntervalType, ModuleBuilder, PrimOp, Statement, Type,
    Width,
};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;

fn r(name: &str, ty: Type) -> Expression {
    Expression::reference(name, ty)
}

fn interval(lo: f64, hi: f64, point: u32) -> Type {
    Type::interval(lo, hi, point)
}

fn prim(op: PrimOp, args: Vec<Expression>, consts: &[i64], ty: Type) -> Expression {
    Expression::prim(
        op,
        args,
        consts.iter().map(|c| BigInt::from(*c)).collect(),
        ty,
    )
}

fn circuit(module: ModuleBuilder) -> Circuit {
    CircuitBuilder::new("Top").module(module.build()).build()
}

fn find_stmt<'a>(stmt: &'a Statement, name: &str) -> Option<&'a Statement> {
    if stmt.declared_name() == Some(name) {
        return Some(stmt);
    }
    stmt.stmts().into_iter().find_map(|s| find_stmt(s, name))
}

fn declaration<'a>(circuit: &'a Circuit, name: &str) -> &'a Statement {
    let body = circuit.modules[0].body().unwrap();
    find_stmt(body, name).unwrap()
}

fn node_value(circuit: &Circuit, name: &str) -> Expression {
    match declaration(circuit, name) {
        Statement::Node { value, .. } => value.clone(),
        other => panic!("{} is not a node: {:?}", name, other),
    }
}

fn connected(circuit: &Circuit, index: usize) -> Expression {
    let Some(Statement::Block(stmts)) = circuit.modules[0].body() else {
        panic!("expected block body");
    };
    match &stmts[index] {
        Statement::Connect { expr, .. } | Statement::PartialConnect { expr, .. } => expr.clone(),
        other => panic!("expected a connect, got {:?}", other),
    }
}

/// Align and lower without re-inference, so synthesized nodes keep `Type::Unknown`.
fn lower_only(input: Circuit) -> (Circuit, LoweringStats) {
    let mut pass = RemoveIntervals::with_options(LoweringOptions {
        reinfer_types: false,
        verify_output: true,
        warn_on_remainder_wrap: false,
    });
    let out = pass.lower(input).unwrap();
    (out, pass.stats().clone())
}

fn clip_circuit(input: Type, target: Type) -> Circuit {
    circuit(
        ModuleBuilder::new("Top")
            .input("a", input.clone())
            .input("b", target.clone())
            .node(
                "c",
                prim(PrimOp::Clip, vec![r("a", input), r("b", target.clone())], &[], target),
            ),
    )
}

fn wrap_circuit(input: Type, bound: Type, result: Type) -> Circuit {
    circuit(
        ModuleBuilder::new("Top")
            .input("a", input.clone())
            .input("b", bound.clone())
            .node(
                "w",
                prim(PrimOp::Wrap, vec![r("a", input), r("b", bound)], &[], result),
            ),
    )
}

#[test]
fn test_clip_clamps_both_sides() {
    let input = clip_circuit(interval(-2.0, 2.0, 2), interval(-1.0, 1.0, 2));
    let (out, stats) = lower_only(input);

    let a = r("a", Type::sint(5));
    let expected = Expression::mux(
        prim(PrimOp::Gt, vec![a.clone(), Expression::sint(4)], &[], Type::Unknown),
        Expression::sint(4),
        Expression::mux(
            prim(PrimOp::Lt, vec![a.clone(), Expression::sint(-4)], &[], Type::Unknown),
            Expression::sint(-4),
            a,
            Type::Unknown,
        ),
        Type::Unknown,
    );
    assert_eq!(node_value(&out, "c"), expected);
    assert_eq!(
        node_value(&out, "c").to_string(),
        "mux(gt(a, SInt<4>(4)), SInt<4>(4), mux(lt(a, SInt<3>(-4)), SInt<3>(-4), a))"
    );
    assert_eq!(stats.saturates.both, 1);
}

#[test]
fn test_clip_one_sided() {
    let (out, stats) = lower_only(clip_circuit(interval(-1.0, 3.0, 0), interval(-2.0, 2.0, 0)));
    assert_eq!(
        node_value(&out, "c").to_string(),
        "mux(gt(a, SInt<3>(2)), SInt<3>(2), a)"
    );
    assert_eq!(stats.saturates.high, 1);

    let (out, stats) = lower_only(clip_circuit(interval(-5.0, 1.0, 0), interval(-2.0, 2.0, 0)));
    assert_eq!(
        node_value(&out, "c").to_string(),
        "mux(lt(a, SInt<2>(-2)), SInt<2>(-2), a)"
    );
    assert_eq!(stats.saturates.low, 1);
}

#[test]
fn test_clip_within_range_returns_operand() {
    let (out, stats) = lower_only(clip_circuit(interval(-1.0, 1.0, 2), interval(-2.0, 2.0, 2)));
    assert_eq!(node_value(&out, "c"), r("a", Type::sint(4)));
    assert_eq!(stats.saturates.unchanged, 1);
}

#[test]
fn test_add_aligns_lower_binary_point() {
    let a = interval(0.0, 3.0, 1);
    let b = interval(-1.0, 1.0, 3);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("a", a.clone())
            .input("b", b.clone())
            .node(
                "s",
                prim(PrimOp::Add, vec![r("a", a), r("b", b)], &[], interval(-1.0, 4.0, 3)),
            ),
    );

    let mut aligner = AlignBinaryPoints::new();
    let aligned = aligner.align(input.clone()).unwrap();
    let Expression::DoPrim { args, .. } = node_value(&aligned, "s") else {
        panic!("expected a primitive");
    };
    let points: Vec<_> = args
        .iter()
        .map(|arg| arg.ty().as_interval().unwrap().point)
        .collect();
    assert_eq!(points, vec![Width::Known(3), Width::Known(3)]);
    assert_eq!(args[0].to_string(), "incp(a, 2)");
    assert_eq!(aligner.rescales_inserted(), 1);

    let (out, stats) = lower_only(input);
    assert_eq!(node_value(&out, "s").to_string(), "add(shl(a, 2), b)");
    assert_eq!(stats.rescales_inserted, 1);
    assert_eq!(stats.shifts_rebound, 1);
}

#[test]
fn test_mul_is_not_aligned() {
    let a = interval(0.0, 3.0, 1);
    let b = interval(-1.0, 1.0, 3);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("a", a.clone())
            .input("b", b.clone())
            .node(
                "p",
                prim(PrimOp::Mul, vec![r("a", a), r("b", b)], &[], interval(-3.0, 3.0, 4)),
            ),
    );

    let (out, stats) = lower_only(input);
    assert_eq!(node_value(&out, "p").to_string(), "mul(a, b)");
    assert_eq!(stats.rescales_inserted, 0);
}

#[test]
fn test_mux_branches_share_point() {
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("c", Type::uint(1))
            .input("a", interval(0.0, 1.0, 1))
            .input("b", interval(0.0, 1.0, 2))
            .node(
                "m",
                Expression::mux(
                    r("c", Type::uint(1)),
                    r("a", interval(0.0, 1.0, 1)),
                    r("b", interval(0.0, 1.0, 2)),
                    interval(0.0, 1.0, 1),
                ),
            ),
    );

    let aligned = AlignBinaryPoints::new().align(input).unwrap();
    let Expression::Mux { tval, fval, ty, .. } = node_value(&aligned, "m") else {
        panic!("expected a mux");
    };
    assert_eq!(tval.to_string(), "incp(a, 1)");
    assert_eq!(fval.to_string(), "b");
    assert_eq!(ty, interval(0.0, 1.0, 2));
}

#[test]
fn test_connect_rescales_to_location_point() {
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("a", interval(0.0, 3.0, 1))
            .input("x", interval(0.0, 3.0, 3))
            .output("o", interval(0.0, 3.0, 3))
            .output("q", interval(0.0, 3.0, 1))
            .connect(r("o", interval(0.0, 3.0, 3)), r("a", interval(0.0, 3.0, 1)))
            .partial_connect(r("q", interval(0.0, 3.0, 1)), r("x", interval(0.0, 3.0, 3))),
    );

    let (out, stats) = lower_only(input);
    assert_eq!(connected(&out, 0).to_string(), "shl(a, 2)");
    assert_eq!(connected(&out, 1).to_string(), "shr(x, 2)");
    assert_eq!(stats.rescales_inserted, 2);
}

#[test]
fn test_set_point_becomes_shift() {
    let x = interval(-1.0, 1.0, 3);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("x", x.clone())
            .node("down", prim(PrimOp::SetP, vec![r("x", x.clone())], &[1], Type::Unknown))
            .node("same", prim(PrimOp::SetP, vec![r("x", x.clone())], &[3], Type::Unknown))
            .node("up", prim(PrimOp::IncP, vec![r("x", x)], &[2], interval(-1.0, 1.0, 5))),
    );

    let (out, _) = lower_only(input);
    assert_eq!(node_value(&out, "down").to_string(), "shr(x, 2)");
    assert_eq!(node_value(&out, "same"), r("x", Type::sint(5)));
    assert_eq!(node_value(&out, "up").to_string(), "shl(x, 2)");
}

#[test]
fn test_as_interval_pads_unsigned() {
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("u", Type::uint(4))
            .input("s", Type::sint(4))
            .node(
                "i",
                prim(PrimOp::AsInterval, vec![r("u", Type::uint(4))], &[0, 15, 0], interval(0.0, 15.0, 0)),
            )
            .node(
                "j",
                prim(PrimOp::AsInterval, vec![r("s", Type::sint(4))], &[-8, 7, 0], interval(-8.0, 7.0, 0)),
            ),
    );

    let out = remove_intervals(input).unwrap();
    let cast = node_value(&out, "i");
    assert_eq!(cast.to_string(), "asSInt(pad(u, 5))");
    assert_eq!(cast.ty(), Type::sint(5));
    assert_eq!(node_value(&out, "j").to_string(), "asSInt(s)");
}

#[test]
fn test_wrap_with_signed_bound_truncates() {
    let (out, stats) = lower_only(wrap_circuit(
        interval(-20.0, 20.0, 0),
        Type::sint(4),
        interval(-8.0, 7.0, 0),
    ));
    assert_eq!(node_value(&out, "w").to_string(), "asSInt(bits(a, 3, 0))");
    assert_eq!(stats.width_wraps, 1);
}

#[test]
fn test_wrap_with_unsigned_bound_corrects_low() {
    let (out, stats) = lower_only(wrap_circuit(
        interval(-3.0, 5.0, 0),
        Type::uint(3),
        interval(0.0, 7.0, 0),
    ));
    assert_eq!(
        node_value(&out, "w").to_string(),
        "mux(lt(a, SInt<1>(0)), add(a, SInt<5>(8)), a)"
    );
    assert_eq!(stats.wraps.low, 1);
}

#[test]
fn test_wrap_corrects_both_sides() {
    let (out, stats) = lower_only(wrap_circuit(
        interval(-2.0, 10.0, 0),
        interval(0.0, 7.0, 0),
        interval(0.0, 7.0, 0),
    ));
    assert_eq!(
        node_value(&out, "w").to_string(),
        "mux(gt(a, SInt<4>(7)), sub(a, SInt<5>(8)), mux(lt(a, SInt<1>(0)), add(a, SInt<5>(8)), a))"
    );
    assert_eq!(stats.wraps.both, 1);
}

#[test]
fn test_wrap_within_range_returns_operand() {
    let (out, stats) = lower_only(wrap_circuit(
        interval(1.0, 6.0, 0),
        interval(0.0, 7.0, 0),
        interval(0.0, 7.0, 0),
    ));
    assert_eq!(node_value(&out, "w"), r("a", Type::sint(4)));
    assert_eq!(stats.wraps.unchanged, 1);
}

#[test]
fn test_wide_wrap_uses_floor_remainder() {
    let (out, stats) = lower_only(wrap_circuit(
        interval(0.0, 30.0, 0),
        Type::uint(3),
        interval(0.0, 7.0, 0),
    ));

    let residue = "rem(sub(a, SInt<1>(0)), SInt<5>(8))";
    let expected = format!(
        "add(mux(lt({r}, SInt<1>(0)), add({r}, SInt<5>(8)), {r}), SInt<1>(0))",
        r = residue
    );
    assert_eq!(node_value(&out, "w").to_string(), expected);
    assert_eq!(stats.remainder_wraps, 1);
    assert_eq!(stats.wraps.total(), 0);
}

#[test]
fn test_lowered_width_reserves_sign_bit() {
    // Intrinsic width wins when it exceeds the binary point.
    assert_eq!(
        lower_interval_type(&IntervalType::closed(0.0, 1.0, 4)).unwrap(),
        Type::sint(6)
    );
    assert_eq!(
        lower_interval_type(&IntervalType::closed(-0.25, 0.25, 4)).unwrap(),
        Type::sint(5)
    );
    assert_eq!(
        lower_interval_type(&IntervalType::closed(0.0, 0.0, 3)).unwrap(),
        Type::sint(4)
    );
    assert_eq!(
        lower_interval_type(&IntervalType::closed(-100.0, 100.0, 0)).unwrap(),
        Type::sint(8)
    );
}

#[test]
fn test_aggregates_and_registers_are_rewritten() {
    let io = Type::Bundle(vec![
        Field::new("x", interval(0.0, 1.0, 1)),
        Field::flipped("y", Type::vector(interval(-1.0, 0.0, 0), 2)),
    ]);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("clk", Type::Clock)
            .input("io", io)
            .input("a", interval(0.0, 3.0, 0))
            .register("r", interval(0.0, 3.0, 2), r("clk", Type::Clock), None)
            .connect(r("r", interval(0.0, 3.0, 2)), r("a", interval(0.0, 3.0, 0))),
    );

    let out = remove_intervals(input).unwrap();
    assert_eq!(
        out.modules[0].ports()[1].ty,
        Type::Bundle(vec![
            Field::new("x", Type::sint(3)),
            Field::flipped("y", Type::vector(Type::sint(1), 2)),
        ])
    );
    assert_eq!(
        declaration(&out, "r").declared_type(),
        Some(&Type::sint(5))
    );
    let shifted = connected(&out, 1);
    assert_eq!(shifted.to_string(), "shl(a, 2)");
    assert_eq!(shifted.ty(), Type::sint(5));
}

#[test]
fn test_open_bound_is_fatal() {
    let open = Type::Interval(IntervalType::new(
        Bound::Open,
        Bound::integer(3),
        Width::Known(0),
    ));
    let err = remove_intervals(circuit(ModuleBuilder::new("Top").input("a", open))).unwrap_err();

    assert_eq!(
        err,
        LoweringError::OpenBound {
            ty: "Interval[?, 3].0".to_string()
        }
    );
    assert!(err.is_internal());
}

#[test]
fn test_unknown_point_is_fatal() {
    let unresolved = Type::Interval(IntervalType::new(
        Bound::integer(0),
        Bound::integer(3),
        Width::Unknown,
    ));
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("a", unresolved.clone())
            .input("b", interval(0.0, 3.0, 1))
            .node(
                "s",
                prim(
                    PrimOp::Add,
                    vec![r("a", unresolved), r("b", interval(0.0, 3.0, 1))],
                    &[],
                    interval(0.0, 6.0, 1),
                ),
            ),
    );

    let err = remove_intervals(input).unwrap_err();
    assert!(matches!(err, LoweringError::UnknownBinaryPoint { .. }));
}

#[test]
fn test_set_point_of_integer_is_fatal() {
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("u", Type::uint(4))
            .node("n", prim(PrimOp::SetP, vec![r("u", Type::uint(4))], &[2], Type::Unknown)),
    );
    let err = remove_intervals(input).unwrap_err();
    assert!(matches!(err, LoweringError::NotAnInterval { .. }));
}

#[test]
fn test_unaligned_set_point_is_rejected_by_lowerer() {
    let x = interval(0.0, 1.0, 1);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("x", x.clone())
            .node("n", prim(PrimOp::SetP, vec![r("x", x)], &[2], Type::Unknown)),
    );
    let err = LowerIntervals::new(false).lower(input).unwrap_err();
    assert_eq!(
        err,
        LoweringError::UnexpectedOperator {
            op: "setp".to_string()
        }
    );
}

#[test]
fn test_clip_of_integer_operand_is_fatal() {
    let input = clip_circuit(Type::uint(4), interval(0.0, 3.0, 0));
    let err = remove_intervals(input).unwrap_err();
    assert_eq!(
        err,
        LoweringError::UnexpectedOperand {
            op: "clip".to_string(),
            ty: "UInt<4>".to_string()
        }
    );
}

#[test]
fn test_wrap_arity_is_checked() {
    let a = interval(0.0, 3.0, 0);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("a", a.clone())
            .node("w", prim(PrimOp::Wrap, vec![r("a", a)], &[], interval(0.0, 3.0, 0))),
    );
    let err = remove_intervals(input).unwrap_err();
    assert_eq!(
        err,
        LoweringError::Arity {
            op: "wrap".to_string(),
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn test_inference_failure_is_not_internal() {
    let input = circuit(
        ModuleBuilder::new("Top")
            .output("o", Type::uint(2))
            .connect(r("o", Type::uint(2)), r("ghost", Type::uint(2))),
    );
    let err = remove_intervals(input).unwrap_err();
    assert_eq!(
        err,
        LoweringError::Inference(fxir_core::IrError::UndeclaredReference(
            "ghost".to_string()
        ))
    );
    assert!(!err.is_internal());
}

struct KeepTypes;

impl TypeInference for KeepTypes {
    fn infer(&self, circuit: Circuit) -> fxir_core::Result<Circuit> {
        Ok(circuit)
    }
}

#[test]
fn test_custom_inference_is_used() {
    let mut pass = RemoveIntervals::new().with_inference(Box::new(KeepTypes));
    let out = pass
        .lower(clip_circuit(interval(-2.0, 2.0, 0), interval(-1.0, 1.0, 0)))
        .unwrap();
    assert_eq!(node_value(&out, "c").ty(), Type::Unknown);
}

#[test]
fn test_pass_reports_lowering_error() {
    let open = Type::Interval(IntervalType::new(
        Bound::integer(0),
        Bound::Open,
        Width::Known(1),
    ));
    let mut pass = RemoveIntervals::default();
    let err = pass
        .run(circuit(ModuleBuilder::new("Top").output("o", open)))
        .unwrap_err();

    assert_eq!(pass.name(), "remove-intervals");
    assert!(matches!(
        err.downcast_ref::<LoweringError>(),
        Some(LoweringError::OpenBound { .. })
    ));
}

#[test]
fn test_options_accept_partial_json() {
    let options: LoweringOptions = serde_json::from_str(r#"{ "verify_output": false }"#).unwrap();
    assert_eq!(
        options,
        LoweringOptions {
            reinfer_types: true,
            verify_output: false,
            warn_on_remainder_wrap: true,
        }
    );
}

#[test]
fn test_rendered_lowering() {
    let a = interval(0.0, 3.0, 1);
    let b = interval(-1.0, 1.0, 3);
    let o = interval(-1.0, 4.0, 3);
    let input = circuit(
        ModuleBuilder::new("Top")
            .input("a", a.clone())
            .input("b", b.clone())
            .output("o", o.clone())
            .node("s", prim(PrimOp::Add, vec![r("a", a), r("b", b)], &[], o.clone()))
            .connect(r("o", o.clone()), r("s", o)),
    );

    let out = remove_intervals(input).unwrap();
    insta::assert_snapshot!(out.to_string().trim_end(), @r###"
circuit Top :
  module Top :
    input a : SInt<4>
    input b : SInt<5>
    output o : SInt<7>

    node s = add(shl(a, 2), b)
    o <= s
"###);
}
