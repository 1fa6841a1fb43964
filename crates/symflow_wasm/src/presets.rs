//! Ready-made example models for the front end.

use crate::system::{to_js, WasmModel};
use anyhow::Result;
use symflow_core::Variable;
use wasm_bindgen::prelude::*;

/// A model plus what the front end should draw for it.
#[wasm_bindgen]
pub struct WasmPreset {
    model: Option<WasmModel>,
    plotted: Vec<u32>,
    sliders: Vec<u32>,
    steps: u32,
}

#[wasm_bindgen]
impl WasmPreset {
    /// Handles of the variables drawn as curves.
    pub fn plotted(&self) -> Vec<u32> {
        self.plotted.clone()
    }

    /// Handles of the variables exposed as sliders.
    pub fn sliders(&self) -> Vec<u32> {
        self.sliders.clone()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Hands the model over to the caller. Can be called once.
    pub fn take_model(&mut self) -> Result<WasmModel, JsValue> {
        self.model
            .take()
            .ok_or_else(|| JsValue::from_str("Preset model already taken"))
    }
}

struct Builder {
    model: WasmModel,
}

impl Builder {
    fn var(&mut self, name: &str) -> Result<(u32, Variable)> {
        let handle = self.model.register(name, None)?;
        Ok((handle, self.model.variable(handle)?.clone()))
    }

    fn bounded(&mut self, name: &str, min: f64, max: f64) -> Result<(u32, Variable)> {
        let handle = self.model.register(name, Some((min, max)))?;
        Ok((handle, self.model.variable(handle)?.clone()))
    }
}

/// Susceptible / infected / recovered epidemic over a population of 1000.
pub(crate) fn build_sir() -> Result<WasmPreset> {
    let mut b = Builder {
        model: WasmModel::default(),
    };
    let (hs, s) = b.var("S")?;
    let (hi, i) = b.var("I")?;
    let (hr, r) = b.var("R")?;
    let (hb, beta) = b.bounded("B", 0.0, 5.0)?;
    let (hg, gamma) = b.bounded("G", 0.0, 10.0)?;
    let (_, n) = b.var("N")?;

    let m = &mut b.model.model;
    m.add_dt(&s, -(&beta * &s * &i) / &n)?;
    m.add_dt(&i, (&beta * &s * &i) / &n - &gamma * &i)?;
    m.add_dt(&r, &gamma * &i)?;

    m.set_value(&s, 999.0)?;
    m.set_value(&i, 1.0)?;
    m.set_value(&r, 0.0)?;
    m.set_value(&beta, 0.25)?;
    m.set_value(&gamma, 0.125)?;
    m.set_value(&n, 1000.0)?;

    Ok(WasmPreset {
        model: Some(b.model),
        plotted: vec![hs, hi, hr],
        sliders: vec![hb, hg],
        steps: 1000,
    })
}

/// Rabbits and foxes.
pub(crate) fn build_lotka_volterra() -> Result<WasmPreset> {
    let mut b = Builder {
        model: WasmModel::default(),
    };
    let (hx, x) = b.var("# of rabbits")?;
    let (hy, y) = b.var("# of foxes")?;
    let (ha, alpha) = b.bounded("rabbit growth rate", 0.0, 2.0)?;
    let (hb, beta) = b.bounded("rabbit predation rate per fox", 0.0, 2.0)?;
    let (hc, gamma) = b.bounded("fox death rate", 0.0, 2.0)?;
    let (hd, delta) = b.bounded("fox growth rate per rabbit", 0.0, 2.0)?;

    let m = &mut b.model.model;
    m.add_dt(&x, &alpha * &x - &beta * &x * &y)?;
    m.add_dt(&y, -&gamma * &y + &delta * &x * &y)?;

    m.set_value(&x, 0.9)?;
    m.set_value(&y, 1.0)?;
    m.set_value(&alpha, 2.0 / 3.0)?;
    m.set_value(&beta, 4.0 / 3.0)?;
    m.set_value(&gamma, 1.0)?;
    m.set_value(&delta, 1.0)?;

    Ok(WasmPreset {
        model: Some(b.model),
        plotted: vec![hx, hy],
        sliders: vec![ha, hb, hc, hd],
        steps: 10,
    })
}

#[wasm_bindgen]
pub fn sir_model() -> Result<WasmPreset, JsValue> {
    console_error_panic_hook::set_once();
    build_sir().map_err(to_js)
}

#[wasm_bindgen]
pub fn lotka_volterra_model() -> Result<WasmPreset, JsValue> {
    console_error_panic_hook::set_once();
    build_lotka_volterra().map_err(to_js)
}
