use crate::error::Result;
use crate::traits::{DynamicalSystem, Scalar, Steppable};

/// Explicit (forward) Euler stepper.
/// x_{n+1} = x_n + dt * f(t_n, x_n)
///
/// The whole vector field is evaluated against the pre-step state before any
/// component is written back, so an evaluation failure leaves the state intact.
pub struct ForwardEuler<T: Scalar> {
    rates: Vec<T>,
}

impl<T: Scalar> ForwardEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            rates: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for ForwardEuler<T> {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()> {
        if self.rates.len() != state.len() {
            self.rates.resize(state.len(), T::zero());
        }
        system.apply(*t, state, &mut self.rates)?;

        for (x, rate) in state.iter_mut().zip(&self.rates) {
            *x = *x + dt * *rate;
        }
        *t = *t + dt;
        Ok(())
    }
}
