//! Client-side context: the last known valid value of every field.
//!
//! The store is owned by a [`crate::session::Session`] and lives as long as the
//! page. It is written on every valid field change, read when a payload is
//! built, and overwritten when a preset or a calibrated parameter set lands.

use crate::fields::{self, FieldKind, Objective};
use crate::form::Form;
use crate::validators;
use log::{debug, info};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

/// A stored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Flag(bool),
}

/// Outcome of a preset load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextStore {
    entries: BTreeMap<String, Value>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from every field whose primary occurrence is valid.
    pub fn from_form(form: &Form) -> Self {
        let mut store = Self::new();
        for field in form.iter() {
            store.set_if_valid(form, field.key, 0);
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(Value::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.text(key).and_then(validators::parse_float)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.clone()
    }

    pub(crate) fn write(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    /// Copy one occurrence into the store, but only while it is valid.
    ///
    /// An invalid occurrence leaves the previous (stale but valid) entry
    /// in place.
    pub fn set_if_valid(&mut self, form: &Form, key: &str, occurrence: usize) -> bool {
        let Some(field) = form.field(key) else {
            return false;
        };
        if !field.is_valid_at(occurrence) {
            return false;
        }
        let raw = field.occurrences[occurrence].raw.as_str();
        let value = match field.kind {
            FieldKind::Boolean => Value::Flag(raw == "true"),
            // separators include a bare tab
            FieldKind::Choice(_) => Value::Text(raw.to_string()),
            _ => Value::Text(raw.trim().to_string()),
        };
        self.write(key, value);
        true
    }

    /// Copy `value` into every other occurrence of a twin field.
    ///
    /// Siblings currently flagged invalid keep their own text. Writing here
    /// never re-enters propagation, so updates cannot cycle. Returns the
    /// number of siblings updated.
    pub fn propagate_twin(
        &mut self,
        form: &mut Form,
        key: &str,
        source: usize,
        value: &str,
    ) -> usize {
        if !fields::is_twin(key) || key == fields::AREA {
            return 0;
        }
        let Some(field) = form.field_mut(key) else {
            return 0;
        };

        let mut updated = 0;
        for idx in 0..field.occurrences.len() {
            if idx == source {
                continue;
            }
            if field.occurrences[idx].is_invalid() {
                debug!("Skipping flagged occurrence {} of '{}'", idx, key);
                continue;
            }
            field.set_raw(idx, value);
            updated += 1;
        }

        let holder = (0..field.occurrences.len())
            .find(|&idx| field.is_valid_at(idx) && field.occurrences[idx].raw == value);
        if let Some(idx) = holder {
            self.set_if_valid(form, key, idx);
        }
        updated
    }

    /// Overwrite fields and store entries from a named preset.
    ///
    /// Booleans set the checked state, the objective name selects the
    /// matching exclusive selector, and any field currently flagged invalid
    /// is left untouched.
    pub fn load_preset(&mut self, form: &mut Form, preset: &Map<String, JsonValue>) -> PresetReport {
        let mut report = PresetReport::default();

        for (name, value) in preset {
            let key = fields::canonical_key(fields::strip_prefix(name));
            let Some(field) = form.field_mut(key) else {
                debug!("Preset key '{}' has no matching field", name);
                report.skipped.push(key.to_string());
                continue;
            };
            if field.is_flagged() {
                debug!("Preset leaves flagged field '{}' alone", key);
                report.skipped.push(key.to_string());
                continue;
            }
            let Some(raw) = preset_text(key, field.kind, value) else {
                debug!("Preset value {} does not fit field '{}'", value, key);
                report.skipped.push(key.to_string());
                continue;
            };

            for idx in 0..field.occurrences.len() {
                field.set_raw(idx, &raw);
            }
            let key = field.key;
            if self.set_if_valid(form, key, 0) {
                report.applied.push(key.to_string());
            } else {
                report.skipped.push(key.to_string());
            }
        }

        info!(
            "Preset loaded: {} applied, {} skipped",
            report.applied.len(),
            report.skipped.len()
        );
        report
    }

    pub fn load_demo_preset(&mut self, form: &mut Form) -> PresetReport {
        self.load_preset(form, &demo_preset())
    }
}

/// Text a preset value takes in the form, or `None` when it does not fit.
fn preset_text(key: &str, kind: FieldKind, value: &JsonValue) -> Option<String> {
    match (kind, value) {
        (FieldKind::Boolean, JsonValue::Bool(b)) => Some(b.to_string()),
        (FieldKind::Boolean, JsonValue::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Some("true".to_string()),
            "false" => Some("false".to_string()),
            _ => None,
        },
        (FieldKind::Choice(_), JsonValue::String(s)) if key == fields::OBJECTIVE => {
            Objective::from_name(s).map(|o| o.as_str().to_string())
        }
        (FieldKind::Choice(_), JsonValue::String(s)) => Some(s.clone()),
        (FieldKind::Boolean | FieldKind::Choice(_), _) => None,
        (_, JsonValue::Number(n)) => n.as_f64().map(|v| v.to_string()),
        (_, JsonValue::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Fixed parameter set used to populate a demonstration run.
pub fn demo_preset() -> Map<String, JsonValue> {
    let preset = json!({
        "perc": 0.1,
        "alpha": 0.5,
        "k1": 0.00005,
        "mbas": 1,
        "k": 0.01,
        "lz": 0,
        "uz": 0,
        "c_flux": 0.05,
        "beta": 3.5,
        "lp": 0.35,
        "etf": 2.5,
        "e_corr": 1.0,
        "fc": 250,
        "sm": 0,
        "cfr": 0.5,
        "cwh": 0.02,
        "cfmax": 0.1,
        "ttm": 0.1,
        "utt": 0.1,
        "ltt": -0.1,
        "sfcf": 1.0,
        "rfcf": 1.0,
        "wc": 0,
        "sp": 0,
        "tfac": 24,
        "area": 135.0,
        "verbose": true,
        "minimise": true,
        "tol": 0.001,
        "warm_up": 10,
        "residus": "RMSE"
    });
    match preset {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::FieldState;

    fn demo_numbers() -> Vec<(&'static str, f64)> {
        vec![
            ("perc", 0.1),
            ("alpha", 0.5),
            ("k1", 0.00005),
            ("mbas", 1.0),
            ("k", 0.01),
            ("lz", 0.0),
            ("uz", 0.0),
            ("c_flux", 0.05),
            ("beta", 3.5),
            ("lp", 0.35),
            ("etf", 2.5),
            ("e_corr", 1.0),
            ("fc", 250.0),
            ("sm", 0.0),
            ("cfr", 0.5),
            ("cwh", 0.02),
            ("cfmax", 0.1),
            ("ttm", 0.1),
            ("utt", 0.1),
            ("ltt", -0.1),
            ("sfcf", 1.0),
            ("rfcf", 1.0),
            ("wc", 0.0),
            ("sp", 0.0),
            ("tfac", 24.0),
            ("area", 135.0),
            ("tol", 0.001),
            ("warm_up", 10.0),
        ]
    }

    #[test]
    fn set_if_valid_keeps_stale_value() {
        let mut form = Form::new();
        let mut store = ContextStore::from_form(&form);

        form.input("fc", 0, "250");
        assert!(store.set_if_valid(&form, "fc", 0));
        assert_eq!(store.number("fc"), Some(250.0));

        form.input("fc", 0, "2x0");
        assert!(!store.set_if_valid(&form, "fc", 0));
        assert_eq!(store.number("fc"), Some(250.0));
    }

    #[test]
    fn booleans_are_stored_as_flags() {
        let mut form = Form::new();
        let mut store = ContextStore::from_form(&form);
        assert_eq!(store.flag("minimise"), Some(true));
        form.set_checked("minimise", false);
        store.set_if_valid(&form, "minimise", 0);
        assert_eq!(store.flag("minimise"), Some(false));
    }

    #[test]
    fn twin_propagation_updates_every_sibling() {
        let mut form = Form::new();
        let mut store = ContextStore::new();

        form.input("alpha", 0, "0.7");
        store.set_if_valid(&form, "alpha", 0);
        let updated = store.propagate_twin(&mut form, "alpha", 0, "0.7");

        assert_eq!(updated, 1);
        let alpha = form.field("alpha").unwrap();
        assert!(alpha.occurrences.iter().all(|o| o.raw == "0.7"));
        assert!(alpha.occurrences.iter().all(|o| o.state == FieldState::Valid));
        assert_eq!(store.number("alpha"), Some(0.7));
    }

    #[test]
    fn twin_propagation_skips_flagged_sibling() {
        let mut form = Form::new();
        let mut store = ContextStore::new();

        form.input("beta", 1, "oops");
        form.input("beta", 0, "2.0");
        store.set_if_valid(&form, "beta", 0);
        let updated = store.propagate_twin(&mut form, "beta", 0, "2.0");

        assert_eq!(updated, 0);
        let beta = form.field("beta").unwrap();
        assert_eq!(beta.occurrences[1].raw, "oops");
        assert!(beta.occurrences[1].is_invalid());
        assert_eq!(store.number("beta"), Some(2.0));
    }

    #[test]
    fn area_is_not_propagated() {
        let mut form = Form::new();
        let mut store = ContextStore::new();
        form.input("area", 0, "33.5");
        assert_eq!(store.propagate_twin(&mut form, "area", 0, "33.5"), 0);
        assert_eq!(store.propagate_twin(&mut form, "tol", 0, "1"), 0);
    }

    #[test]
    fn demo_preset_matches_literals() {
        let mut form = Form::new();
        let mut store = ContextStore::from_form(&form);
        let report = store.load_demo_preset(&mut form);

        assert!(report.skipped.is_empty(), "skipped: {:?}", report.skipped);
        for (key, expected) in demo_numbers() {
            assert_eq!(store.number(key), Some(expected), "{}", key);
        }
        assert_eq!(store.flag("verbose"), Some(true));
        assert_eq!(store.flag("minimise"), Some(true));
        assert_eq!(store.text(fields::OBJECTIVE), Some("RMSE"));
        assert!(form.is_selected(fields::OBJECTIVE, "RMSE"));
        assert!(!form.is_selected(fields::OBJECTIVE, "NSE"));

        // both occurrences of a twin carry the preset value
        let perc = form.field("perc").unwrap();
        assert!(perc.occurrences.iter().all(|o| o.raw == "0.1"));
    }

    #[test]
    fn preset_skips_flagged_fields() {
        let mut form = Form::new();
        let mut store = ContextStore::from_form(&form);
        form.input("fc", 1, "bad");

        let report = store.load_demo_preset(&mut form);

        assert!(report.skipped.contains(&"fc".to_string()));
        assert_eq!(store.number("fc"), None);
        assert_eq!(form.field("fc").unwrap().occurrences[1].raw, "bad");
    }

    #[test]
    fn preset_maps_objective_and_booleans() {
        let mut form = Form::new();
        let mut store = ContextStore::from_form(&form);
        let preset = match json!({ "residus": "nse", "minimise": false, "id_tol": "0.5" }) {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        };

        let report = store.load_preset(&mut form, &preset);

        assert_eq!(report.applied.len(), 3);
        assert!(form.is_selected(fields::OBJECTIVE, "NSE"));
        assert_eq!(store.text(fields::OBJECTIVE), Some("NSE"));
        assert!(!form.checked("minimise"));
        assert_eq!(store.flag("minimise"), Some(false));
        assert_eq!(store.number("tol"), Some(0.5));
    }

    #[test]
    fn preset_rejects_unknown_objective() {
        let mut form = Form::new();
        let mut store = ContextStore::from_form(&form);
        let preset = match json!({ "residus": "MAE", "unknown": 1 }) {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        };
        let report = store.load_preset(&mut form, &preset);
        assert!(report.applied.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(form.is_selected(fields::OBJECTIVE, "RMSE"));
    }
}
