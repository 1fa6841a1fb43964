//! Core WASM model wrapper.
//!
//! Variables cross the JS boundary as numeric handles (registration order).

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use symflow_core::{derivative, Model, SimulationSettings, Snapshot, Variable};
use wasm_bindgen::prelude::*;

pub(crate) fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Slider metadata for a bounded variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderSpec {
    pub handle: u32,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub value: Option<f64>,
}

#[wasm_bindgen]
pub struct WasmModel {
    pub(crate) model: Model,
    handles: Vec<Variable>,
}

impl Default for WasmModel {
    fn default() -> Self {
        Self {
            model: Model::new(),
            handles: Vec::new(),
        }
    }
}

impl WasmModel {
    pub(crate) fn variable(&self, handle: u32) -> Result<&Variable> {
        self.handles
            .get(handle as usize)
            .ok_or_else(|| anyhow!("Unknown variable handle {}", handle))
    }

    pub(crate) fn register(&mut self, name: &str, bounds: Option<(f64, f64)>) -> Result<u32> {
        let variable = match bounds {
            Some((min, max)) => self.model.new_bounded_var(name, min, max)?,
            None => self.model.new_var(name)?,
        };
        self.handles.push(variable);
        Ok((self.handles.len() - 1) as u32)
    }

    pub(crate) fn set_initial(&mut self, handle: u32, value: f64) -> Result<()> {
        let variable = self.variable(handle)?.clone();
        self.model.set_value(&variable, value)?;
        Ok(())
    }

    pub(crate) fn add_dt_text(&mut self, handle: u32, equation: &str) -> Result<()> {
        let variable = self.variable(handle)?.clone();
        let expr = self
            .model
            .parse(equation)
            .with_context(|| format!("Invalid d/dt for {}", variable.name()))?;
        self.model.add_dt(&variable, expr)?;
        Ok(())
    }

    /// Registers the symbolic derivative of `equation` with respect to `wrt`
    /// as the rate of `handle`.
    pub(crate) fn add_dt_derivative_text(
        &mut self,
        handle: u32,
        equation: &str,
        wrt: u32,
    ) -> Result<()> {
        let variable = self.variable(handle)?.clone();
        let target = self.variable(wrt)?;
        let expr = self.model.parse(equation)?;
        let rate = derivative(target, &expr)
            .with_context(|| format!("Cannot differentiate {}", equation))?;
        self.model.add_dt(&variable, rate)?;
        Ok(())
    }

    pub(crate) fn derivative_text(&self, equation: &str, wrt: u32) -> Result<String> {
        let target = self.variable(wrt)?;
        let expr = self.model.parse(equation)?;
        Ok(derivative(target, &expr)?.to_string())
    }

    pub(crate) fn snapshots(&self, settings: SimulationSettings) -> Result<Vec<Snapshot>> {
        Ok(self.model.simulate(settings.steps)?)
    }

    pub(crate) fn series_for(&self, steps: usize, handles: &[u32]) -> Result<Vec<Vec<f64>>> {
        let variables = handles
            .iter()
            .map(|&h| self.variable(h).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(self.model.series(steps, &variables)?)
    }

    fn handle_of(&self, variable: &Variable) -> Result<u32> {
        self.handles
            .iter()
            .position(|v| v == variable)
            .map(|i| i as u32)
            .ok_or_else(|| anyhow!("Variable {} has no handle", variable.name()))
    }

    /// Handles of the variables read by the d/dt of `handle`, in first-use
    /// order. Empty when no d/dt is registered.
    pub(crate) fn dependency_handles(&self, handle: u32) -> Result<Vec<u32>> {
        let variable = self.variable(handle)?;
        match self.model.dt(variable) {
            Some(rate) => rate
                .variables()
                .iter()
                .map(|v| self.handle_of(v))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    pub(crate) fn slider_specs(&self) -> Result<Vec<SliderSpec>> {
        self.model
            .specs()
            .iter()
            .filter(|spec| spec.is_bounded())
            .map(|spec| {
                Ok(SliderSpec {
                    handle: self.handle_of(&spec.variable)?,
                    name: spec.variable.name().to_string(),
                    min: spec.min,
                    max: spec.max,
                    value: self.model.initial_value(&spec.variable),
                })
            })
            .collect()
    }
}

#[wasm_bindgen]
impl WasmModel {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmModel {
        console_error_panic_hook::set_once();
        WasmModel::default()
    }

    pub fn new_var(&mut self, name: &str) -> Result<u32, JsValue> {
        self.register(name, None).map_err(to_js)
    }

    pub fn new_bounded_var(&mut self, name: &str, min: f64, max: f64) -> Result<u32, JsValue> {
        self.register(name, Some((min, max))).map_err(to_js)
    }

    pub fn set_value(&mut self, handle: u32, value: f64) -> Result<(), JsValue> {
        self.set_initial(handle, value).map_err(to_js)
    }

    /// Initial value of a variable, if one has been set.
    pub fn get_value(&self, handle: u32) -> Result<Option<f64>, JsValue> {
        let variable = self.variable(handle).map_err(to_js)?;
        Ok(self.model.initial_value(variable))
    }

    /// `[min, max]`; `min > max` means the variable has no bounds.
    pub fn bounds(&self, handle: u32) -> Result<Vec<f64>, JsValue> {
        let variable = self.variable(handle).map_err(to_js)?;
        let spec = self
            .model
            .spec(variable)
            .ok_or_else(|| JsValue::from_str("Variable is not registered"))?;
        Ok(vec![spec.min, spec.max])
    }

    pub fn name(&self, handle: u32) -> Result<String, JsValue> {
        Ok(self.variable(handle).map_err(to_js)?.name().to_string())
    }

    pub fn add_dt(&mut self, handle: u32, equation: &str) -> Result<(), JsValue> {
        self.add_dt_text(handle, equation).map_err(to_js)
    }

    pub fn add_dt_derivative(
        &mut self,
        handle: u32,
        equation: &str,
        wrt: u32,
    ) -> Result<(), JsValue> {
        self.add_dt_derivative_text(handle, equation, wrt)
            .map_err(to_js)
    }

    pub fn derivative(&self, equation: &str, wrt: u32) -> Result<String, JsValue> {
        self.derivative_text(equation, wrt).map_err(to_js)
    }

    pub fn run(&self, steps: u32) -> Result<JsValue, JsValue> {
        let snapshots = self
            .snapshots(SimulationSettings {
                steps: steps as usize,
            })
            .map_err(to_js)?;
        serialize(&snapshots)
    }

    pub fn run_with_settings(&self, settings: JsValue) -> Result<JsValue, JsValue> {
        let settings: SimulationSettings = if settings.is_undefined() || settings.is_null() {
            SimulationSettings::default()
        } else {
            from_value(settings)
                .map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))?
        };
        let snapshots = self.snapshots(settings).map_err(to_js)?;
        serialize(&snapshots)
    }

    pub fn series(&self, steps: u32, handles: Vec<u32>) -> Result<JsValue, JsValue> {
        let series = self
            .series_for(steps as usize, &handles)
            .map_err(to_js)?;
        serialize(&series)
    }

    /// Handles of the variables the d/dt of `handle` depends on.
    pub fn dependencies(&self, handle: u32) -> Result<Vec<u32>, JsValue> {
        self.dependency_handles(handle).map_err(to_js)
    }

    pub fn sliders(&self) -> Result<JsValue, JsValue> {
        let sliders = self.slider_specs().map_err(to_js)?;
        serialize(&sliders)
    }
}
