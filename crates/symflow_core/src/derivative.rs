//! Structural symbolic differentiation.
//!
//! The produced tree is not simplified: `d/dx (x * 3)` is
//! `((x * 0) + (3 * 1))`.

use crate::error::{ModelError, Result};
use crate::expression::{add, div, log, mul, neg, pow, sub, BinaryOp, Expr, UnaryOp, Variable};

/// Returns the derivative of `expr` with respect to `target`.
///
/// Variables are matched by identity. `/`, `log` and `exp` nodes have no rule
/// and fail with [`ModelError::UnsupportedDifferentiation`].
pub fn derivative(target: &Variable, expr: &Expr) -> Result<Expr> {
    match expr {
        Expr::Constant(_) => Ok(Expr::Constant(0.0)),
        Expr::Variable(v) => Ok(Expr::Constant(if v == target { 1.0 } else { 0.0 })),
        Expr::Binary(f, op, g) => {
            let f = f.as_ref();
            let g = g.as_ref();
            match op {
                BinaryOp::Add => Ok(add(derivative(target, f)?, derivative(target, g)?)),
                BinaryOp::Sub => Ok(sub(derivative(target, f)?, derivative(target, g)?)),
                BinaryOp::Mul => {
                    let fp = derivative(target, f)?;
                    let gp = derivative(target, g)?;
                    Ok(add(mul(f, gp), mul(g, fp)))
                }
                // d(f^g) = f^g * (f' * g/f + g' * ln f)
                BinaryOp::Pow => {
                    let fp = derivative(target, f)?;
                    let gp = derivative(target, g)?;
                    Ok(mul(
                        pow(f, g),
                        add(mul(fp, div(g, f)), mul(gp, log(f))),
                    ))
                }
                BinaryOp::Div => Err(unsupported(expr)),
            }
        }
        Expr::Unary(op, operand) => match op {
            UnaryOp::Neg => Ok(neg(derivative(target, operand)?)),
            UnaryOp::Log | UnaryOp::Exp => Err(unsupported(expr)),
        },
    }
}

fn unsupported(expr: &Expr) -> ModelError {
    ModelError::UnsupportedDifferentiation(expr.to_string())
}
