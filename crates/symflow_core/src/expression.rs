//! Immutable expression trees over constants and named variables.
//!
//! Trees are built with the combinators in this module (`add`, `mul`, `pow`,
//! `log`, ...) or with the operator overloads layered on top of them. Every
//! composition allocates a new node; operands are shared, never mutated.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(0);

/// A named real-valued variable.
///
/// Equality and hashing use the identity assigned at construction, never the
/// name: two variables created with the same name are distinct.
#[derive(Debug, Clone)]
pub struct Variable {
    id: u64,
    name: Arc<str>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            id: NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wraps this variable in an expression node.
    pub fn expr(&self) -> Expr {
        Expr::Variable(self.clone())
    }

    pub fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        pow(self, exponent)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Binary operators, rendered with their infix symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// Unary operators, rendered in function-call form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Log,
    Exp,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Log => "log",
            UnaryOp::Exp => "exp",
        }
    }
}

/// Arithmetic syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(f64),
    Variable(Variable),
    Binary(Arc<Expr>, BinaryOp, Arc<Expr>),
    Unary(UnaryOp, Arc<Expr>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr::Constant(value)
    }

    pub fn variable(variable: &Variable) -> Self {
        Expr::Variable(variable.clone())
    }

    pub fn binary(left: impl Into<Expr>, op: BinaryOp, right: impl Into<Expr>) -> Self {
        Expr::Binary(Arc::new(left.into()), op, Arc::new(right.into()))
    }

    pub fn unary(op: UnaryOp, operand: impl Into<Expr>) -> Self {
        Expr::Unary(op, Arc::new(operand.into()))
    }

    pub fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        pow(self, exponent)
    }

    pub fn log(&self) -> Expr {
        log(self)
    }

    pub fn exp(&self) -> Expr {
        exp(self)
    }

    /// Distinct variables referenced by this expression, in order of first appearance.
    pub fn variables(&self) -> Vec<Variable> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables(&self, found: &mut Vec<Variable>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Variable(v) => {
                if !found.contains(v) {
                    found.push(v.clone());
                }
            }
            Expr::Binary(left, _, right) => {
                left.collect_variables(found);
                right.collect_variables(found);
            }
            Expr::Unary(_, operand) => operand.collect_variables(found),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{}", value),
            Expr::Variable(v) => write!(f, "{}", v.name()),
            Expr::Binary(left, op, right) => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Unary(op, operand) => write!(f, "{}({})", op.name(), operand),
        }
    }
}

/// Canonical text form: `(l op r)` for binary nodes, `op(x)` for unary nodes.
pub fn render(expr: &Expr) -> String {
    expr.to_string()
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Constant(value)
    }
}

impl From<Variable> for Expr {
    fn from(variable: Variable) -> Self {
        Expr::Variable(variable)
    }
}

impl From<&Variable> for Expr {
    fn from(variable: &Variable) -> Self {
        Expr::Variable(variable.clone())
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}

// --- Combinators ---

pub fn add(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(left, BinaryOp::Add, right)
}

pub fn sub(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(left, BinaryOp::Sub, right)
}

pub fn mul(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(left, BinaryOp::Mul, right)
}

pub fn div(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::binary(left, BinaryOp::Div, right)
}

pub fn pow(base: impl Into<Expr>, exponent: impl Into<Expr>) -> Expr {
    Expr::binary(base, BinaryOp::Pow, exponent)
}

pub fn neg(operand: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Neg, operand)
}

pub fn log(operand: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Log, operand)
}

pub fn exp(operand: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Exp, operand)
}

// --- Operator sugar over the combinators ---

macro_rules! impl_binary_ops {
    (@rhs $lhs:ty; $($rhs:ty),*) => {
        $(
            impl ops::Add<$rhs> for $lhs {
                type Output = Expr;
                fn add(self, rhs: $rhs) -> Expr {
                    Expr::binary(self, BinaryOp::Add, rhs)
                }
            }

            impl ops::Sub<$rhs> for $lhs {
                type Output = Expr;
                fn sub(self, rhs: $rhs) -> Expr {
                    Expr::binary(self, BinaryOp::Sub, rhs)
                }
            }

            impl ops::Mul<$rhs> for $lhs {
                type Output = Expr;
                fn mul(self, rhs: $rhs) -> Expr {
                    Expr::binary(self, BinaryOp::Mul, rhs)
                }
            }

            impl ops::Div<$rhs> for $lhs {
                type Output = Expr;
                fn div(self, rhs: $rhs) -> Expr {
                    Expr::binary(self, BinaryOp::Div, rhs)
                }
            }
        )*
    };
    ($($lhs:ty),*) => {
        $( impl_binary_ops!(@rhs $lhs; Expr, &Expr, Variable, &Variable, f64); )*
    };
}

impl_binary_ops!(Expr, &Expr, Variable, &Variable);
impl_binary_ops!(@rhs f64; Expr, &Expr, Variable, &Variable);

macro_rules! impl_neg {
    ($($operand:ty),*) => {
        $(
            impl ops::Neg for $operand {
                type Output = Expr;
                fn neg(self) -> Expr {
                    Expr::unary(UnaryOp::Neg, self)
                }
            }
        )*
    };
}

impl_neg!(Expr, &Expr, Variable, &Variable);
