//! JavaScript interop for server-rendered plots.
//! Markup and scripts are opaque; plot_helpers.js places and runs them.

use hbv_web::results::PlotBundle;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/plot_helpers.js")]
extern "C" {
    #[wasm_bindgen(js_name = injectPlot)]
    fn inject_plot(container_id: &str, markup: &str, script: &str);

    #[wasm_bindgen(js_name = clearPlots)]
    fn clear_plots();
}

pub fn container_id(category: &str) -> String {
    format!("plot_{}", category)
}

/// Replace every plot container with the fragments of `bundle`.
pub fn show_bundle(bundle: &PlotBundle) {
    clear_plots();
    for (category, fragment) in bundle.iter() {
        inject_plot(&container_id(category), &fragment.div, &fragment.script);
    }
}
