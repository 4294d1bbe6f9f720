use crate::remove_intervals::LoweringError;
use fxir_core::{Circuit, Expression, Statement};

/// Fails on the first interval type or interval operator found anywhere in `circuit`.
pub fn ensure_interval_free(circuit: &Circuit) -> Result<(), LoweringError> {
    for module in &circuit.modules {
        let name = module.name();
        for port in module.ports() {
            if port.ty.contains_interval() {
                return Err(survived(name, format!("port {} : {}", port.name, port.ty)));
            }
        }
        if let Some(body) = module.body() {
            check_stmt(name, body)?;
        }
    }
    Ok(())
}

fn survived(module: &str, item: String) -> LoweringError {
    LoweringError::IntervalSurvived {
        module: module.to_string(),
        item,
    }
}

fn check_stmt(module: &str, stmt: &Statement) -> Result<(), LoweringError> {
    if let (Some(name), Some(ty)) = (stmt.declared_name(), stmt.declared_type()) {
        if ty.contains_interval() {
            return Err(survived(module, format!("declaration {} : {}", name, ty)));
        }
    }
    for expr in stmt.exprs() {
        check_expr(module, expr)?;
    }
    for nested in stmt.stmts() {
        check_stmt(module, nested)?;
    }
    Ok(())
}

fn check_expr(module: &str, expr: &Expression) -> Result<(), LoweringError> {
    if let Expression::DoPrim { op, .. } = expr {
        if op.is_interval_specific() {
            return Err(survived(module, format!("operator {} in {}", op, expr)));
        }
    }
    let ty = expr.ty();
    if ty.contains_interval() {
        return Err(survived(module, format!("expression {} : {}", expr, ty)));
    }
    expr.children()
        .into_iter()
        .try_for_each(|child| check_expr(module, child))
}
