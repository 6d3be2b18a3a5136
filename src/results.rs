//! Server responses and write-back of calibrated parameters.

use crate::context::ContextStore;
use crate::fields::{self, AREA, ROUTING_LAG, SCI_NOTATION, TIME_FACTOR};
use crate::form::Form;
use log::{debug, info};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Rendered plot: markup plus the script that draws into it. Opaque here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlotFragment {
    #[serde(default)]
    pub div: String,
    #[serde(default)]
    pub script: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlotBundle {
    pub discharge: Option<PlotFragment>,
    pub precipitation: Option<PlotFragment>,
    pub temperature: Option<PlotFragment>,
    pub evapotranspiration: Option<PlotFragment>,
    pub storage: Option<PlotFragment>,
    pub performance: Option<PlotFragment>,
}

impl PlotBundle {
    /// Present fragments with the name of their category.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PlotFragment)> {
        [
            ("discharge", &self.discharge),
            ("precipitation", &self.precipitation),
            ("temperature", &self.temperature),
            ("evapotranspiration", &self.evapotranspiration),
            ("storage", &self.storage),
            ("performance", &self.performance),
        ]
        .into_iter()
        .filter_map(|(name, frag)| frag.as_ref().map(|f| (name, f)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Body returned by both the calibrate and simulate endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerResponse {
    /// Calibrated parameters; absent for plain simulations.
    #[serde(default)]
    pub par: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub performance: Option<f64>,
    #[serde(default)]
    pub plots: PlotBundle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
}

/// Display text for a returned parameter value.
///
/// The routing lag is a step count and is always shown as an integer.
pub fn format_parameter(key: &str, value: f64, scientific: bool) -> String {
    if key == ROUTING_LAG {
        format!("{}", value.round() as i64)
    } else if scientific {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

/// Write calibrated values into every occurrence of their fields and into
/// the context. Basin area and the time factor are not calibration outputs
/// and are never touched.
pub fn apply_calibrated_parameters(
    form: &mut Form,
    store: &mut ContextStore,
    par: &BTreeMap<String, f64>,
) -> ApplyReport {
    let scientific = store.flag(SCI_NOTATION).unwrap_or(false);
    let mut report = ApplyReport::default();

    for (name, value) in par {
        let key = fields::strip_prefix(name);
        if key == AREA || key == TIME_FACTOR || !fields::is_parameter(key) || !value.is_finite() {
            debug!("Ignoring returned parameter '{}' = {}", name, value);
            report.ignored.push(key.to_string());
            continue;
        }
        let Some(field) = form.field_mut(key) else {
            report.ignored.push(key.to_string());
            continue;
        };

        let text = format_parameter(key, *value, scientific);
        for idx in 0..field.occurrences.len() {
            field.set_raw(idx, &text);
        }
        let key = field.key;
        if store.set_if_valid(form, key, 0) {
            report.applied.push(key.to_string());
        } else {
            report.ignored.push(key.to_string());
        }
    }

    info!("Applied {} calibrated parameters", report.applied.len());
    report
}
