//! Field identifiers, kinds and layout of the calibration form.
//!
//! Keys are the bare names used by the server (`perc`, `tol`, ...). The DOM
//! carries them with an `id_` prefix, which is stripped before anything is
//! sent over the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ID_PREFIX: &str = "id_";

/// Semantic type of a field, deciding which validator applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Float,
    OptionalFloat,
    /// Float strictly greater than `min`.
    BoundedFloat { min: f64 },
    NonNegativeInteger,
    DateTime,
    Boolean,
    Choice(&'static [&'static str]),
}

/// Model parameters, in the order the server expects them.
pub const PARAMETERS: [&str; 21] = [
    "ltt", "utt", "ttm", "cfmax", "fc", "e_corr", "etf", "lp", "k", "k1", "alpha", "beta", "cwh",
    "cfr", "c_flux", "perc", "rfcf", "sfcf", "mbas", "tfac", "area",
];

/// Storage states required for every run.
pub const STATES: [&str; 5] = ["sp", "sm", "uz", "lz", "wc"];

/// Initial discharge, sent only when the user provides one.
pub const INITIAL_DISCHARGE: &str = "q0";

/// Routing lag, a step count that is always displayed as an integer.
pub const ROUTING_LAG: &str = "mbas";
pub const AREA: &str = "area";
pub const TIME_FACTOR: &str = "tfac";

pub const OBJECTIVE: &str = "obj_fun";
/// Name under which presets carry the objective function.
pub const OBJECTIVE_ALIAS: &str = "residus";
pub const SEPARATOR: &str = "separator";
pub const SCI_NOTATION: &str = "sci_notation";
pub const CALIBRATE_ALL: &str = "calibrate_all_par";
pub const CALIBRATE_FROM: &str = "calibrate_from";
pub const CALIBRATE_TO: &str = "calibrate_to";

pub const SEPARATORS: [&str; 3] = [",", ";", "\t"];
pub const OBJECTIVES: [&str; 2] = ["RMSE", "NSE"];

/// Run options and display preferences, each a single DOM occurrence.
pub const RUN_OPTIONS: [(&str, FieldKind); 13] = [
    ("header", FieldKind::NonNegativeInteger),
    (SEPARATOR, FieldKind::Choice(&SEPARATORS)),
    ("warm_up", FieldKind::NonNegativeInteger),
    (OBJECTIVE, FieldKind::Choice(&OBJECTIVES)),
    ("tol", FieldKind::BoundedFloat { min: crate::config::MIN_TOL }),
    ("minimise", FieldKind::Boolean),
    ("verbose", FieldKind::Boolean),
    ("snow", FieldKind::Boolean),
    (CALIBRATE_FROM, FieldKind::DateTime),
    (CALIBRATE_TO, FieldKind::DateTime),
    (CALIBRATE_ALL, FieldKind::Boolean),
    ("init_guess", FieldKind::Boolean),
    (SCI_NOTATION, FieldKind::Boolean),
];

/// Lower and upper calibration bounds of the model.
const BOUNDS: [(&str, f64, f64); 18] = [
    ("ltt", -1.5, 2.5),
    ("utt", 0.001, 3.0),
    ("ttm", 0.001, 2.0),
    ("cfmax", 0.04, 0.4),
    ("fc", 50.0, 500.0),
    ("e_corr", 0.6, 1.4),
    ("etf", 0.001, 5.0),
    ("lp", 0.2, 0.5),
    ("k", 0.00042, 0.0167),
    ("k1", 0.0000042, 0.00062),
    ("alpha", 0.001, 1.0),
    ("beta", 1.0, 6.0),
    ("cwh", 0.001, 0.1),
    ("cfr", 0.01, 1.0),
    ("c_flux", 0.0, 0.08),
    ("perc", 0.001, 0.125),
    ("rfcf", 0.6, 1.4),
    ("sfcf", 0.4, 1.4),
];

/// Objective function used to score a simulation against observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    #[default]
    #[serde(rename = "RMSE")]
    Rmse,
    #[serde(rename = "NSE")]
    Nse,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::Rmse => "RMSE",
            Objective::Nse => "NSE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "RMSE" => Some(Objective::Rmse),
            "NSE" => Some(Objective::Nse),
            _ => None,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DOM identifier for a key.
pub fn dom_id(key: &str) -> String {
    format!("{}{}", ID_PREFIX, key)
}

/// Key for a DOM identifier; keys without the prefix pass through.
pub fn strip_prefix(id: &str) -> &str {
    id.strip_prefix(ID_PREFIX).unwrap_or(id)
}

/// Resolve preset aliases to the key of the field they target.
pub fn canonical_key(key: &str) -> &str {
    if key == OBJECTIVE_ALIAS {
        OBJECTIVE
    } else {
        key
    }
}

pub fn is_parameter(key: &str) -> bool {
    PARAMETERS.contains(&key)
}

pub fn is_state(key: &str) -> bool {
    STATES.contains(&key)
}

/// Members of the twin group appear both in the editable lists and on the
/// schematic overlay.
pub fn is_twin(key: &str) -> bool {
    is_parameter(key) || is_state(key)
}

/// Parameters the optimiser may change.
pub fn is_calibratable(key: &str) -> bool {
    is_parameter(key) && key != TIME_FACTOR && key != AREA
}

pub fn calibratable() -> impl Iterator<Item = &'static str> {
    PARAMETERS.iter().copied().filter(|k| is_calibratable(k))
}

/// Number of DOM occurrences a field has in the page layout.
pub fn occurrence_count(key: &str) -> usize {
    if is_twin(key) && key != AREA {
        2
    } else {
        1
    }
}

pub fn kind_of(key: &str) -> Option<FieldKind> {
    match key {
        TIME_FACTOR => Some(FieldKind::NonNegativeInteger),
        AREA => Some(FieldKind::BoundedFloat {
            min: crate::config::MIN_AREA,
        }),
        INITIAL_DISCHARGE => Some(FieldKind::OptionalFloat),
        k if is_twin(k) => Some(FieldKind::Float),
        k => RUN_OPTIONS
            .iter()
            .find(|(name, _)| *name == k)
            .map(|(_, kind)| *kind),
    }
}

/// Every key known to the form, twins first.
pub fn all_keys() -> impl Iterator<Item = &'static str> {
    PARAMETERS
        .iter()
        .chain(STATES.iter())
        .copied()
        .chain(std::iter::once(INITIAL_DISCHARGE))
        .chain(RUN_OPTIONS.iter().map(|(k, _)| *k))
}

pub fn bounds(key: &str) -> Option<(f64, f64)> {
    BOUNDS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, lo, hi)| (*lo, *hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twin_group_has_26_members() {
        let twins: Vec<_> = all_keys().filter(|k| is_twin(k)).collect();
        assert_eq!(twins.len(), 26);
    }

    #[test]
    fn area_is_singular() {
        assert_eq!(occurrence_count(AREA), 1);
        assert_eq!(occurrence_count("perc"), 2);
        assert_eq!(occurrence_count("tol"), 1);
    }

    #[test]
    fn fixed_parameters_are_not_calibratable() {
        assert!(!is_calibratable(AREA));
        assert!(!is_calibratable(TIME_FACTOR));
        assert!(is_calibratable(ROUTING_LAG));
        assert_eq!(calibratable().count(), 19);
    }

    #[test]
    fn prefix_handling() {
        assert_eq!(dom_id("perc"), "id_perc");
        assert_eq!(strip_prefix("id_perc"), "perc");
        assert_eq!(strip_prefix("perc"), "perc");
    }

    #[test]
    fn objective_names() {
        assert_eq!(Objective::from_name("rmse"), Some(Objective::Rmse));
        assert_eq!(Objective::from_name("NSE"), Some(Objective::Nse));
        assert_eq!(Objective::from_name("MAE"), None);
        assert_eq!(canonical_key(OBJECTIVE_ALIAS), OBJECTIVE);
    }

    #[test]
    fn every_key_has_a_kind() {
        for key in all_keys() {
            assert!(kind_of(key).is_some(), "{} has no kind", key);
        }
        assert_eq!(kind_of("tfac"), Some(FieldKind::NonNegativeInteger));
    }
}
