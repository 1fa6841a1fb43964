use crate::error::{ModelError, Result};
use crate::expression::Variable;
use num_traits::{Float, FromPrimitive};
use std::collections::HashMap;
use std::fmt::Debug;

/// A trait for types that can be used as scalars when evaluating expressions.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {
    /// Converts an expression constant into this scalar type.
    fn from_constant(value: f64) -> Result<Self> {
        Self::from_f64(value)
            .ok_or_else(|| ModelError::Domain(format!("constant {value} is not representable")))
    }
}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A variable -> value binding used by the evaluator.
pub trait Bindings<T: Scalar> {
    fn value_of(&self, variable: &Variable) -> Option<T>;
}

impl<T: Scalar> Bindings<T> for HashMap<Variable, T> {
    fn value_of(&self, variable: &Variable) -> Option<T> {
        self.get(variable).copied()
    }
}

/// Represents a dynamical system whose vector field may fail to evaluate.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// x: current state
    /// t: current time
    /// out: buffer to write dx/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]) -> Result<()>;
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// On error neither `t` nor `state` is modified.
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()>;
}
