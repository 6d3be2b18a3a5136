//! Request payloads built from a validated form and context snapshot.
//!
//! Every builder is all-or-nothing: a single invalid field fails the whole
//! build with one aggregated [`BuildError`], and nothing partial is sent.

use crate::context::ContextStore;
use crate::fields::{self, Objective, PARAMETERS, RUN_OPTIONS, STATES};
use crate::form::Form;
use crate::validators;
use log::warn;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// What the submitted run asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Calibrate,
    Simulate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// One or more required fields hold values that fail their grammar.
    InvalidFields {
        section: &'static str,
        fields: Vec<String>,
    },
    MissingValue(String),
    Coercion {
        key: String,
        value: String,
    },
    DateRange {
        from: String,
        to: String,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidFields { section, fields } => write!(
                f,
                "Please correct the {} fields before submitting: {}",
                section,
                fields.join(", ")
            ),
            BuildError::MissingValue(key) => write!(f, "A value for '{}' is required", key),
            BuildError::Coercion { key, value } => {
                write!(f, "Value '{}' of '{}' could not be converted", value, key)
            }
            BuildError::DateRange { from, to } => write!(
                f,
                "Calibration start {} is later than calibration end {}",
                from, to
            ),
        }
    }
}

impl std::error::Error for BuildError {}

/// Run configuration sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub header: u32,
    pub separator: String,
    pub warm_up: u32,
    pub obj_fun: Objective,
    /// Display name of `obj_fun`; always derived from the same selection.
    pub fun_name: String,
    pub tol: f64,
    pub minimise: bool,
    pub verbose: bool,
    pub kill_snow: bool,
    pub calibrate_from: Option<String>,
    pub calibrate_to: Option<String>,
    pub calibrate_all_par: bool,
    pub par_to_calibrate: Vec<String>,
    pub init_guess: bool,
}

/// Ordered key/value mapping, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSet {
    entries: Vec<(String, f64)>,
}

impl ValueSet {
    fn push(&mut self, key: &str, value: f64) {
        self.entries.push((key.to_string(), value));
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for ValueSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Full body of a calibrate or simulate request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub config: RunConfig,
    pub par: ValueSet,
    pub st: ValueSet,
    pub data: String,
}

fn required_count(store: &ContextStore, key: &str) -> Result<u32, BuildError> {
    let raw = store
        .text(key)
        .ok_or_else(|| BuildError::MissingValue(key.to_string()))?;
    validators::parse_count(raw).ok_or_else(|| BuildError::Coercion {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn required_float(store: &ContextStore, key: &str) -> Result<f64, BuildError> {
    let raw = store
        .text(key)
        .ok_or_else(|| BuildError::MissingValue(key.to_string()))?;
    validators::parse_float(raw).ok_or_else(|| BuildError::Coercion {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Parameters the optimiser is asked to change, without the `id_` prefix.
pub fn free_parameters(form: &Form, store: &ContextStore) -> Vec<String> {
    let all = store.flag(fields::CALIBRATE_ALL).unwrap_or(false);
    fields::calibratable()
        .filter(|k| all || form.is_free(k))
        .map(|k| fields::strip_prefix(k).to_string())
        .collect()
}

/// Project the context onto the run configuration.
pub fn build_run_config(form: &Form, store: &ContextStore) -> Result<RunConfig, BuildError> {
    let flagged = form.flagged(RUN_OPTIONS.iter().map(|(k, _)| *k));
    if !flagged.is_empty() {
        warn!("Run configuration rejected, invalid fields: {:?}", flagged);
        return Err(BuildError::InvalidFields {
            section: "run configuration",
            fields: flagged,
        });
    }

    let objective_name = store
        .text(fields::OBJECTIVE)
        .ok_or_else(|| BuildError::MissingValue(fields::OBJECTIVE.to_string()))?;
    let obj_fun = Objective::from_name(objective_name).ok_or_else(|| BuildError::Coercion {
        key: fields::OBJECTIVE.to_string(),
        value: objective_name.to_string(),
    })?;
    let separator = store
        .text(fields::SEPARATOR)
        .ok_or_else(|| BuildError::MissingValue(fields::SEPARATOR.to_string()))?
        .to_string();

    let calibrate_from = store.text(fields::CALIBRATE_FROM).map(str::to_string);
    let calibrate_to = store.text(fields::CALIBRATE_TO).map(str::to_string);
    if let (Some(from), Some(to)) = (&calibrate_from, &calibrate_to) {
        if from.replace('T', " ") > to.replace('T', " ") {
            return Err(BuildError::DateRange {
                from: from.clone(),
                to: to.clone(),
            });
        }
    }

    let flag = |key: &str| store.flag(key).unwrap_or(false);

    Ok(RunConfig {
        header: required_count(store, "header")?,
        separator,
        warm_up: required_count(store, "warm_up")?,
        obj_fun,
        fun_name: obj_fun.as_str().to_string(),
        tol: required_float(store, "tol")?,
        minimise: flag("minimise"),
        verbose: flag("verbose"),
        kill_snow: !flag("snow"),
        calibrate_from,
        calibrate_to,
        calibrate_all_par: flag(fields::CALIBRATE_ALL),
        par_to_calibrate: free_parameters(form, store),
        init_guess: flag("init_guess"),
    })
}

/// Collect the parameter values to send.
///
/// In [`RunMode::Calibrate`] a parameter included in calibration is exempt
/// from validation: its seed is sent when numeric and dropped otherwise.
/// Fixed parameters, and every parameter in other modes, must be valid.
pub fn build_parameter_set(
    form: &Form,
    store: &ContextStore,
    mode: RunMode,
) -> Result<ValueSet, BuildError> {
    let all_free = store.flag(fields::CALIBRATE_ALL).unwrap_or(false);
    let mut set = ValueSet::default();
    let mut invalid = Vec::new();

    for key in PARAMETERS {
        let Some(field) = form.field(key) else {
            invalid.push(key.to_string());
            continue;
        };
        let exempt = mode == RunMode::Calibrate
            && fields::is_calibratable(key)
            && (field.free || all_free);
        let raw = field.raw();

        if exempt {
            if let Some(v) = validators::parse_float(raw) {
                set.push(key, v);
            }
            continue;
        }

        let valid = !field.is_flagged() && validators::validate(raw, field.kind).valid;
        match validators::parse_float(raw) {
            Some(v) if valid => set.push(key, v),
            _ => invalid.push(key.to_string()),
        }
    }

    if invalid.is_empty() {
        Ok(set)
    } else {
        warn!("Parameter set rejected, invalid fields: {:?}", invalid);
        Err(BuildError::InvalidFields {
            section: "parameter",
            fields: invalid,
        })
    }
}

/// Collect the initial model states; `q0` is sent only when set.
pub fn build_state_set(form: &Form) -> Result<ValueSet, BuildError> {
    let mut set = ValueSet::default();
    let mut invalid = Vec::new();

    for key in STATES.iter().copied().chain(std::iter::once(fields::INITIAL_DISCHARGE)) {
        let Some(field) = form.field(key) else {
            invalid.push(key.to_string());
            continue;
        };
        let raw = field.raw();
        let valid = !field.is_flagged() && validators::validate(raw, field.kind).valid;
        match validators::parse_float(raw) {
            Some(v) if valid => set.push(key, v),
            None if valid => {} // optional and unset
            _ => invalid.push(key.to_string()),
        }
    }

    if invalid.is_empty() {
        Ok(set)
    } else {
        warn!("State set rejected, invalid fields: {:?}", invalid);
        Err(BuildError::InvalidFields {
            section: "state",
            fields: invalid,
        })
    }
}

/// Assemble the complete request body.
pub fn build_request(
    form: &Form,
    store: &ContextStore,
    mode: RunMode,
    data: &str,
) -> Result<RunRequest, BuildError> {
    if data.trim().is_empty() {
        return Err(BuildError::MissingValue("input data file".to_string()));
    }
    Ok(RunRequest {
        config: build_run_config(form, store)?,
        par: build_parameter_set(form, store, mode)?,
        st: build_state_set(form)?,
        data: data.to_string(),
    })
}
