//! Simulation models stepped by forward Euler with unit step size.
//!
//! A [`Model`] owns registered variables, their initial values and at most one
//! `d/dt` expression per variable. [`Model::run_steps`] hands out independent
//! cursors: each owns its state, starts from the initial values and advances
//! one step per pull.

use crate::error::{ModelError, Result};
use crate::evaluate::evaluate;
use crate::expression::{Expr, Variable};
use crate::parser;
use crate::solvers::ForwardEuler;
use crate::traits::{Bindings, DynamicalSystem, Scalar, Steppable};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::iter::FusedIterator;

/// A registered variable plus the slider bounds a front end may show for it.
///
/// Bounds default to `min = 1, max = 0`, meaning "no bounds".
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub variable: Variable,
    pub min: f64,
    pub max: f64,
}

impl VariableSpec {
    pub fn new(variable: Variable) -> Self {
        Self {
            variable,
            min: 1.0,
            max: 0.0,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.min <= self.max
    }
}

/// Variable name -> value at one time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, f64>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, f64> {
        self.values
    }
}

/// How many snapshots a caller wants rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub steps: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self { steps: 100 }
    }
}

#[derive(Debug, Default)]
pub struct Model {
    names: HashSet<String>,
    specs: Vec<VariableSpec>,
    initial: HashMap<Variable, f64>,
    derivatives: HashMap<Variable, Expr>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new variable. Names are unique within a model.
    pub fn new_var(&mut self, name: impl Into<String>) -> Result<Variable> {
        let name: String = name.into();
        if !self.names.insert(name.clone()) {
            return Err(ModelError::DuplicateVariable(name));
        }
        let variable = Variable::new(name);
        self.specs.push(VariableSpec::new(variable.clone()));
        Ok(variable)
    }

    pub fn new_bounded_var(
        &mut self,
        name: impl Into<String>,
        min: f64,
        max: f64,
    ) -> Result<Variable> {
        let variable = self.new_var(name)?;
        self.set_bounds(&variable, min, max)?;
        Ok(variable)
    }

    pub fn set_bounds(&mut self, variable: &Variable, min: f64, max: f64) -> Result<()> {
        let spec = self
            .specs
            .iter_mut()
            .find(|spec| &spec.variable == variable)
            .ok_or_else(|| unknown(variable))?;
        spec.min = min;
        spec.max = max;
        Ok(())
    }

    pub fn spec(&self, variable: &Variable) -> Option<&VariableSpec> {
        self.specs.iter().find(|spec| &spec.variable == variable)
    }

    /// Specs in registration order.
    pub fn specs(&self) -> &[VariableSpec] {
        &self.specs
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.specs.iter().map(|spec| &spec.variable)
    }

    pub fn variable(&self, name: &str) -> Option<Variable> {
        self.variables().find(|v| v.name() == name).cloned()
    }

    /// Sets the value a fresh stepping sequence starts from. Last write wins.
    pub fn set_value(&mut self, variable: &Variable, value: f64) -> Result<()> {
        self.ensure_registered(variable)?;
        self.initial.insert(variable.clone(), value);
        Ok(())
    }

    pub fn initial_value(&self, variable: &Variable) -> Option<f64> {
        self.initial.get(variable).copied()
    }

    /// Registers `d variable / dt`. A variable takes at most one derivative.
    pub fn add_dt(&mut self, variable: &Variable, expr: impl Into<Expr>) -> Result<()> {
        self.ensure_registered(variable)?;
        if self.derivatives.contains_key(variable) {
            return Err(ModelError::DuplicateDerivative(variable.name().to_string()));
        }
        self.derivatives.insert(variable.clone(), expr.into());
        Ok(())
    }

    pub fn dt(&self, variable: &Variable) -> Option<&Expr> {
        self.derivatives.get(variable)
    }

    /// Parses `input`, resolving identifiers against the registered names.
    pub fn parse(&self, input: &str) -> Result<Expr> {
        parser::parse(input, |name| self.variable(name))
    }

    /// Starts a new, independent stepping sequence at the initial values.
    pub fn run_steps(&self) -> Steps<'_> {
        Steps::new(self)
    }

    /// The first `steps` snapshots, starting with the initial state.
    pub fn simulate(&self, steps: usize) -> Result<Vec<Snapshot>> {
        self.run_steps().take(steps).collect()
    }

    /// One time series per requested variable over the first `steps` snapshots.
    pub fn series(&self, steps: usize, variables: &[Variable]) -> Result<Vec<Vec<f64>>> {
        for variable in variables {
            self.ensure_registered(variable)?;
            if !self.initial.contains_key(variable) {
                return Err(ModelError::UnboundVariable(variable.name().to_string()));
            }
        }

        let mut series = vec![Vec::with_capacity(steps); variables.len()];
        for snapshot in self.run_steps().take(steps) {
            let snapshot = snapshot?;
            for (column, variable) in series.iter_mut().zip(variables) {
                let value = snapshot
                    .get(variable.name())
                    .ok_or_else(|| ModelError::UnboundVariable(variable.name().to_string()))?;
                column.push(value);
            }
        }
        Ok(series)
    }

    fn ensure_registered(&self, variable: &Variable) -> Result<()> {
        if self.spec(variable).is_some() {
            Ok(())
        } else {
            Err(unknown(variable))
        }
    }
}

fn unknown(variable: &Variable) -> ModelError {
    ModelError::UnknownVariable(variable.name().to_string())
}

/// Slice-backed bindings over the tracked variables of a stepping sequence.
struct StateView<'a, T> {
    index: &'a HashMap<Variable, usize>,
    values: &'a [T],
}

impl<T: Scalar> Bindings<T> for StateView<'_, T> {
    fn value_of(&self, variable: &Variable) -> Option<T> {
        self.index.get(variable).map(|&i| self.values[i])
    }
}

/// The model's vector field over the variables that have an initial value.
/// Variables without a derivative have rate zero.
struct ModelSystem<'a> {
    tracked: Vec<&'a Variable>,
    index: HashMap<Variable, usize>,
    rates: Vec<Option<&'a Expr>>,
    untracked_rate: Option<&'a Variable>,
}

impl<'a> ModelSystem<'a> {
    fn new(model: &'a Model) -> Self {
        let tracked: Vec<&Variable> = model
            .variables()
            .filter(|v| model.initial.contains_key(*v))
            .collect();
        let index = tracked
            .iter()
            .enumerate()
            .map(|(i, v)| ((*v).clone(), i))
            .collect();
        let rates = tracked.iter().map(|v| model.derivatives.get(*v)).collect();
        let untracked_rate = model
            .variables()
            .find(|v| model.derivatives.contains_key(*v) && !model.initial.contains_key(*v));

        Self {
            tracked,
            index,
            rates,
            untracked_rate,
        }
    }

    fn initial_state(&self, model: &Model) -> Vec<f64> {
        self.tracked
            .iter()
            .map(|v| model.initial.get(*v).copied().unwrap_or_default())
            .collect()
    }
}

impl DynamicalSystem<f64> for ModelSystem<'_> {
    fn dimension(&self) -> usize {
        self.tracked.len()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) -> Result<()> {
        if let Some(variable) = self.untracked_rate {
            return Err(ModelError::UnboundVariable(variable.name().to_string()));
        }
        let view = StateView {
            index: &self.index,
            values: x,
        };
        for (slot, rate) in out.iter_mut().zip(&self.rates) {
            *slot = match rate {
                Some(expr) => evaluate(expr, &view)?,
                None => 0.0,
            };
        }
        Ok(())
    }
}

/// Lazy, unbounded sequence of snapshots produced by [`Model::run_steps`].
///
/// The first item is the initial state. Every later pull evaluates all
/// derivatives against the previous state and commits an Euler step with
/// `h = 1`. If a step fails the error is yielded once and the sequence ends;
/// no partially updated state is ever emitted.
pub struct Steps<'a> {
    system: ModelSystem<'a>,
    solver: ForwardEuler<f64>,
    t: f64,
    state: Vec<f64>,
    started: bool,
    done: bool,
}

impl<'a> Steps<'a> {
    fn new(model: &'a Model) -> Self {
        let system = ModelSystem::new(model);
        let state = system.initial_state(model);
        debug!(
            "starting stepping sequence over {} variables ({} with d/dt)",
            system.dimension(),
            system.rates.iter().filter(|r| r.is_some()).count()
        );
        Self {
            solver: ForwardEuler::new(system.dimension()),
            system,
            t: 0.0,
            state,
            started: false,
            done: false,
        }
    }

    /// Number of committed steps.
    pub fn time(&self) -> f64 {
        self.t
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            values: self
                .system
                .tracked
                .iter()
                .zip(&self.state)
                .map(|(v, x)| (v.name().to_string(), *x))
                .collect(),
        }
    }
}

impl Iterator for Steps<'_> {
    type Item = Result<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.started {
            if let Err(err) = self
                .solver
                .step(&self.system, &mut self.t, &mut self.state, 1.0)
            {
                warn!("step {} aborted: {}", self.t + 1.0, err);
                self.done = true;
                return Some(Err(err));
            }
            trace!("committed step {}", self.t);
        } else {
            self.started = true;
        }
        Some(Ok(self.snapshot()))
    }
}

impl FusedIterator for Steps<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::log;

    struct Sir {
        model: Model,
        s: Variable,
        i: Variable,
        r: Variable,
    }

    fn sir() -> Sir {
        let mut m = Model::new();
        let s = m.new_var("S").unwrap();
        let i = m.new_var("I").unwrap();
        let r = m.new_var("R").unwrap();
        let b = m.new_bounded_var("B", 0.0, 5.0).unwrap();
        let g = m.new_bounded_var("G", 0.0, 10.0).unwrap();
        let n = m.new_var("N").unwrap();

        m.add_dt(&s, -(&b * &s * &i) / &n).unwrap();
        m.add_dt(&i, (&b * &s * &i) / &n - &g * &i).unwrap();
        m.add_dt(&r, &g * &i).unwrap();

        m.set_value(&s, 999.0).unwrap();
        m.set_value(&i, 1.0).unwrap();
        m.set_value(&r, 0.0).unwrap();
        m.set_value(&b, 0.25).unwrap();
        m.set_value(&g, 0.125).unwrap();
        m.set_value(&n, 1000.0).unwrap();

        Sir { model: m, s, i, r }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn first_snapshot_is_initial_state() {
        let sir = sir();
        let first = sir.model.run_steps().next().unwrap().unwrap();
        let expected: BTreeMap<String, f64> = [
            ("S", 999.0),
            ("I", 1.0),
            ("R", 0.0),
            ("B", 0.25),
            ("G", 0.125),
            ("N", 1000.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_eq!(first.into_inner(), expected);
    }

    #[test]
    fn second_snapshot_is_one_euler_step() {
        let sir = sir();
        let second = sir.model.run_steps().nth(1).unwrap().unwrap();
        assert!((second.get("S").unwrap() - 998.75025).abs() < 1e-9);
        assert!((second.get("I").unwrap() - 1.12475).abs() < 1e-9);
        assert!((second.get("R").unwrap() - 0.125).abs() < 1e-9);
        assert_eq!(second.get("B"), Some(0.25));
        assert_eq!(second.get("N"), Some(1000.0));
    }

    #[test]
    fn population_is_conserved() {
        let sir = sir();
        for snapshot in sir.model.run_steps().take(200) {
            let snapshot = snapshot.unwrap();
            let total = snapshot.get("S").unwrap()
                + snapshot.get("I").unwrap()
                + snapshot.get("R").unwrap();
            assert!((total - 1000.0).abs() < 1e-7);
        }
    }

    #[test]
    fn cursors_are_independent() {
        let sir = sir();
        let mut a = sir.model.run_steps();
        let mut b = sir.model.run_steps();
        a.next();
        a.next();
        let a3 = a.next().unwrap().unwrap();
        let b1 = b.next().unwrap().unwrap();
        let b2 = b.next().unwrap().unwrap();
        let b3 = b.next().unwrap().unwrap();
        assert_eq!(b1.get("S"), Some(999.0));
        assert!((b2.get("S").unwrap() - 998.75025).abs() < 1e-9);
        assert_eq!(a3, b3);
        assert_eq!(a.time(), 2.0);
    }

    #[test]
    fn restart_uses_rebound_initial_value() {
        let mut sir = sir();
        let before = sir.model.simulate(3).unwrap();
        sir.model.set_value(&sir.i, 10.0).unwrap();
        let after = sir.model.simulate(3).unwrap();
        assert_eq!(before[0].get("I"), Some(1.0));
        assert_eq!(after[0].get("I"), Some(10.0));
        assert_eq!(sir.model.initial_value(&sir.i), Some(10.0));
        assert_ne!(before[1], after[1]);
    }

    #[test]
    fn duplicate_registrations_fail() {
        let mut sir = sir();
        assert_eq!(
            sir.model.new_var("S").unwrap_err(),
            ModelError::DuplicateVariable("S".to_string())
        );
        assert_eq!(
            sir.model.add_dt(&sir.s, 0.0).unwrap_err(),
            ModelError::DuplicateDerivative("S".to_string())
        );
    }

    #[test]
    fn foreign_variables_are_rejected() {
        let mut m = Model::new();
        let stranger = Variable::new("x");
        assert_err_contains(m.set_value(&stranger, 1.0), "not registered");
        assert_err_contains(m.add_dt(&stranger, 1.0), "not registered");
        assert_err_contains(m.set_bounds(&stranger, 0.0, 1.0), "not registered");
    }

    #[test]
    fn domain_error_ends_the_sequence() {
        let mut m = Model::new();
        let x = m.new_var("x").unwrap();
        let y = m.new_var("y").unwrap();
        m.add_dt(&x, 1.0).unwrap();
        m.add_dt(&y, log(&y)).unwrap();
        m.set_value(&x, 0.0).unwrap();
        m.set_value(&y, 0.0).unwrap();

        let mut steps = m.run_steps();
        assert!(steps.next().unwrap().is_ok());
        assert!(matches!(steps.next(), Some(Err(ModelError::Domain(_)))));
        assert!(steps.next().is_none());
        assert!(steps.next().is_none());
    }

    #[test]
    fn derivative_on_variable_without_initial_value_fails_on_step() {
        let mut m = Model::new();
        let x = m.new_var("x").unwrap();
        let k = m.new_var("k").unwrap();
        m.add_dt(&x, &k).unwrap();
        m.set_value(&k, 2.0).unwrap();

        let mut steps = m.run_steps();
        let first = steps.next().unwrap().unwrap();
        assert_eq!(first.get("x"), None);
        assert_eq!(
            steps.next().unwrap().unwrap_err(),
            ModelError::UnboundVariable("x".to_string())
        );
    }

    #[test]
    fn parse_and_series() {
        let mut m = Model::new();
        let x = m.new_var("x").unwrap();
        let a = m.new_var("a").unwrap();
        let rate = m.parse("a * x").unwrap();
        m.add_dt(&x, rate).unwrap();
        m.set_value(&x, 1.0).unwrap();
        m.set_value(&a, 1.0).unwrap();

        let series = m.series(4, &[x.clone(), a.clone()]).unwrap();
        assert_eq!(series, vec![vec![1.0, 2.0, 4.0, 8.0], vec![1.0; 4]]);
        assert_err_contains(m.parse("a * z"), "z");
    }

    #[test]
    fn bounds_default_to_unbounded() {
        let sir = sir();
        let s = sir.model.spec(&sir.s).unwrap();
        assert!(!s.is_bounded());
        let b = sir.model.variable("B").unwrap();
        let spec = sir.model.spec(&b).unwrap();
        assert!(spec.is_bounded());
        assert_eq!((spec.min, spec.max), (0.0, 5.0));
        assert_eq!(sir.model.dt(&sir.r).map(|e| e.to_string()).as_deref(), Some("(G * I)"));
    }

    #[test]
    fn specs_follow_registration_order() {
        let sir = sir();
        let names: Vec<&str> = sir.model.specs().iter().map(|s| s.variable.name()).collect();
        assert_eq!(names, ["S", "I", "R", "B", "G", "N"]);
        let bounded: Vec<&str> = sir
            .model
            .specs()
            .iter()
            .filter(|s| s.is_bounded())
            .map(|s| s.variable.name())
            .collect();
        assert_eq!(bounded, ["B", "G"]);
    }

    #[test]
    fn snapshot_iterates_by_name() {
        let sir = sir();
        let first = sir.model.run_steps().next().unwrap().unwrap();
        assert_eq!(first.len(), 6);
        assert!(!first.is_empty());
        let names: Vec<&str> = first.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["B", "G", "I", "N", "R", "S"]);
        assert_eq!(first.iter().find(|(name, _)| *name == "I"), Some(("I", 1.0)));

        let mut empty = Model::new();
        empty.new_var("x").unwrap();
        let only = empty.run_steps().next().unwrap().unwrap();
        assert!(only.is_empty());
        assert_eq!(only.len(), 0);
    }
}
