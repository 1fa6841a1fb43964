pub mod derivative;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod model;
pub mod parser;
pub mod solvers;
/// The `symflow_core` crate builds symbolic expressions over named variables,
/// differentiates them structurally and steps dynamical systems defined by them.
///
/// Key components:
/// - **Expression**: immutable syntax trees with identity-based `Variable`s.
/// - **Evaluator**: `evaluate` against any `Bindings` implementation.
/// - **Derivative**: structural differentiation (`derivative`).
/// - **Model**: variables, initial values and `d/dt` expressions, stepped by
///   forward Euler with unit step through independent `Steps` cursors.
/// - **Traits / Solvers**: `Scalar`, `DynamicalSystem`, `Steppable` and the
///   `ForwardEuler` stepper behind `Model::run_steps`.
pub mod traits;

pub use derivative::derivative;
pub use error::{ModelError, Result};
pub use evaluate::evaluate;
pub use expression::{
    add, div, exp, log, mul, neg, pow, render, sub, BinaryOp, Expr, UnaryOp, Variable,
};
pub use model::{Model, SimulationSettings, Snapshot, Steps, VariableSpec};
