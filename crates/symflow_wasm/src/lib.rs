//! WASM bridge for `symflow_core`.
//!
//! The plotting front end builds or loads a model, reads slider metadata,
//! rebinds initial values and pulls snapshot series through this crate.

mod presets;
mod system;

pub use presets::{lotka_volterra_model, sir_model, WasmPreset};
pub use system::{SliderSpec, WasmModel};

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use serde_wasm_bindgen::{from_value, to_value};
    use symflow_core::{SimulationSettings, Snapshot};
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn model_errors_surface_as_strings() {
        let mut model = WasmModel::new();
        model.new_var("S").expect("S");
        let message = model
            .new_var("S")
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("variable S already created"));
    }

    fn growth() -> WasmModel {
        let mut model = WasmModel::new();
        let x = model.new_var("x").expect("x");
        model.add_dt(x, "x").expect("d/dt");
        model.set_value(x, 1.0).expect("x0");
        model
    }

    #[wasm_bindgen_test]
    fn run_with_settings_reads_js_settings() {
        let model = growth();
        let settings = to_value(&SimulationSettings { steps: 3 }).expect("settings");
        let js = model.run_with_settings(settings).expect("run");
        let snapshots: Vec<Snapshot> = from_value(js).expect("snapshots");
        let xs: Vec<f64> = snapshots.iter().filter_map(|s| s.get("x")).collect();
        assert_eq!(xs, vec![1.0, 2.0, 4.0]);
    }

    #[wasm_bindgen_test]
    fn run_with_settings_defaults_when_missing() {
        let model = growth();
        for missing in [JsValue::UNDEFINED, JsValue::NULL] {
            let js = model.run_with_settings(missing).expect("run");
            let snapshots: Vec<Snapshot> = from_value(js).expect("snapshots");
            assert_eq!(snapshots.len(), SimulationSettings::default().steps);
        }
    }

    #[wasm_bindgen_test]
    fn run_with_settings_rejects_malformed_settings() {
        let model = growth();
        let message = model
            .run_with_settings(JsValue::from_str("nope"))
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.starts_with("Invalid settings"), "{message}");
    }

    #[wasm_bindgen_test]
    fn preset_model_can_only_be_taken_once() {
        let mut preset = sir_model().expect("sir");
        assert!(preset.take_model().is_ok());
        assert!(preset.take_model().is_err());
    }
}
