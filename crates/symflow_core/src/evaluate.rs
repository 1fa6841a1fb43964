use crate::error::{ModelError, Result};
use crate::expression::{BinaryOp, Expr, UnaryOp};
use crate::traits::{Bindings, Scalar};

/// Evaluates `expr` against `bindings`.
///
/// The tree is walked on every call; nothing is cached. Division by zero and
/// `log` of a non-positive value fail with [`ModelError::Domain`]. Nothing else
/// is checked: `pow` follows [`Float::powf`](num_traits::Float::powf) and `exp`
/// may overflow, so NaN and infinite results pass through as `Ok`.
pub fn evaluate<T: Scalar>(expr: &Expr, bindings: &impl Bindings<T>) -> Result<T> {
    match expr {
        Expr::Constant(value) => T::from_constant(*value),
        Expr::Variable(v) => bindings
            .value_of(v)
            .ok_or_else(|| ModelError::UnboundVariable(v.name().to_string())),
        Expr::Binary(left, op, right) => {
            let a = evaluate(left, bindings)?;
            let b = evaluate(right, bindings)?;
            apply_binary(*op, a, b)
        }
        Expr::Unary(op, operand) => {
            let a = evaluate(operand, bindings)?;
            apply_unary(*op, a)
        }
    }
}

fn apply_binary<T: Scalar>(op: BinaryOp, a: T, b: T) -> Result<T> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(ModelError::Domain(format!("division of {:?} by zero", a)));
            }
            Ok(a / b)
        }
        BinaryOp::Pow => Ok(a.powf(b)),
    }
}

fn apply_unary<T: Scalar>(op: UnaryOp, a: T) -> Result<T> {
    match op {
        UnaryOp::Neg => Ok(-a),
        UnaryOp::Log => {
            if a <= T::zero() {
                return Err(ModelError::Domain(format!(
                    "log of non-positive value {:?}",
                    a
                )));
            }
            Ok(a.ln())
        }
        UnaryOp::Exp => Ok(a.exp()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{exp, log, Variable};
    use std::collections::HashMap;

    fn bind(pairs: &[(&Variable, f64)]) -> HashMap<Variable, f64> {
        pairs.iter().map(|(v, x)| ((*v).clone(), *x)).collect()
    }

    #[test]
    fn evaluates_arithmetic() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let b = bind(&[(&x, 3.0), (&y, 2.0)]);

        let expr = (&x + 1.0) * &y - &x / 2.0;
        let value: f64 = evaluate(&expr, &b).expect("evaluate");
        assert!((value - 6.5).abs() < 1e-12);

        let value: f64 = evaluate(&x.pow(&y), &b).expect("evaluate");
        assert!((value - 9.0).abs() < 1e-12);

        let value: f64 = evaluate(&-exp(log(&x)), &b).expect("evaluate");
        assert!((value + 3.0).abs() < 1e-12);
    }

    #[test]
    fn missing_binding_is_unbound() {
        let x = Variable::new("x");
        let y = Variable::new("y");
        let b = bind(&[(&x, 1.0)]);
        let err = evaluate::<f64>(&(&x + &y), &b).expect_err("y is unbound");
        assert_eq!(err, ModelError::UnboundVariable("y".to_string()));
    }

    #[test]
    fn same_name_does_not_alias() {
        let x = Variable::new("x");
        let shadow = Variable::new("x");
        let b = bind(&[(&x, 1.0)]);
        assert!(matches!(
            evaluate::<f64>(&shadow.expr(), &b),
            Err(ModelError::UnboundVariable(_))
        ));
    }

    #[test]
    fn domain_errors() {
        let x = Variable::new("x");
        let b = bind(&[(&x, 0.0)]);
        assert!(matches!(
            evaluate::<f64>(&(1.0 / &x), &b),
            Err(ModelError::Domain(_))
        ));
        assert!(matches!(
            evaluate::<f64>(&log(&x), &b),
            Err(ModelError::Domain(_))
        ));
        assert!(matches!(
            evaluate::<f64>(&log(-&x - 1.0), &b),
            Err(ModelError::Domain(_))
        ));
    }

    #[test]
    fn non_finite_results_pass_through() {
        let x = Variable::new("x");
        let b = bind(&[(&x, -8.0)]);
        let root = evaluate::<f64>(&x.pow(1.0 / 3.0), &b).expect("evaluate");
        assert!(root.is_nan());
        let huge = evaluate::<f64>(&exp(-&x * 100.0), &b).expect("evaluate");
        assert_eq!(huge, f64::INFINITY);
    }

    #[test]
    fn evaluates_with_f32_scalars() {
        let x = Variable::new("x");
        let mut b: HashMap<Variable, f32> = HashMap::new();
        b.insert(x.clone(), 2.0);
        let value = evaluate(&(&x * &x + 0.5), &b).expect("evaluate");
        assert!((value - 4.5).abs() < 1e-6);
    }
}
