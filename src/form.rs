//! In-memory mirror of the form inputs.
//!
//! Each field owns one [`Occurrence`] per place it appears on the page. The
//! Yew view renders straight from this structure, so the DOM never holds
//! state of its own.

use crate::config::{
    DEFAULT_DISCHARGE, DEFAULT_HEADER, DEFAULT_MINIMISE, DEFAULT_SEPARATOR, DEFAULT_SNOW,
    DEFAULT_STATES, DEFAULT_TOL, DEFAULT_VERBOSE, DEFAULT_WARM_UP,
};
use crate::fields::{self, FieldKind, Objective};
use crate::validators::{self, FieldState, MarkChange};
use std::collections::BTreeMap;

/// One DOM location of a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Occurrence {
    pub raw: String,
    pub state: FieldState,
    /// Warning shown next to the input while it is flagged.
    pub warning: Option<String>,
}

impl Occurrence {
    fn revalidate(&mut self, kind: FieldKind) -> MarkChange {
        let validation = validators::validate(&self.raw, kind);
        let (state, change) =
            validators::transition(self.state, self.warning.as_deref(), &validation);
        self.state = state;
        match &change {
            MarkChange::Mark(message) => self.warning = Some(message.clone()),
            MarkChange::Clear => self.warning = None,
            MarkChange::Unchanged => {}
        }
        change
    }

    pub fn is_invalid(&self) -> bool {
        self.state == FieldState::Invalid
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub key: &'static str,
    pub kind: FieldKind,
    pub occurrences: Vec<Occurrence>,
    /// "Included in calibration"; only meaningful for calibratable parameters.
    pub free: bool,
}

impl Field {
    fn new(key: &'static str, kind: FieldKind, initial: &str) -> Self {
        let mut occurrences = vec![Occurrence::default(); fields::occurrence_count(key)];
        for occ in occurrences.iter_mut() {
            occ.raw = initial.to_string();
            if !initial.is_empty() {
                occ.revalidate(kind);
            }
        }
        Self {
            key,
            kind,
            occurrences,
            free: false,
        }
    }

    /// Raw value of the primary occurrence.
    pub fn raw(&self) -> &str {
        self.occurrences.first().map(|o| o.raw.as_str()).unwrap_or("")
    }

    /// True when any occurrence is currently flagged invalid.
    pub fn is_flagged(&self) -> bool {
        self.occurrences.iter().any(Occurrence::is_invalid)
    }

    pub fn is_valid_at(&self, occurrence: usize) -> bool {
        self.occurrences
            .get(occurrence)
            .map(|o| o.state == FieldState::Valid)
            .unwrap_or(false)
    }

    /// Replace the raw text of one occurrence and re-run its validator.
    pub fn set_raw(&mut self, occurrence: usize, raw: &str) -> Option<MarkChange> {
        let kind = self.kind;
        let occ = self.occurrences.get_mut(occurrence)?;
        occ.raw = raw.to_string();
        Some(occ.revalidate(kind))
    }
}

/// All fields of the page, keyed by their bare name.
#[derive(Debug, Clone)]
pub struct Form {
    fields: BTreeMap<&'static str, Field>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Build the form with the page-load defaults.
    pub fn new() -> Self {
        let fields = fields::all_keys()
            .filter_map(|key| {
                let kind = fields::kind_of(key)?;
                Some((key, Field::new(key, kind, &initial_value(key))))
            })
            .collect();
        Self { fields }
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.fields.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.field(key).map(Field::raw)
    }

    /// Apply user input to one occurrence, returning the marking change.
    pub fn input(&mut self, key: &str, occurrence: usize, raw: &str) -> Option<MarkChange> {
        self.field_mut(key)?.set_raw(occurrence, raw)
    }

    pub fn checked(&self, key: &str) -> bool {
        self.raw(key) == Some("true")
    }

    pub fn set_checked(&mut self, key: &str, checked: bool) -> Option<MarkChange> {
        let value = if checked { "true" } else { "false" };
        self.input(key, 0, value)
    }

    /// Selected option of an exclusive selector.
    pub fn selected(&self, key: &str) -> Option<&str> {
        self.field(key)
            .filter(|f| matches!(f.kind, FieldKind::Choice(_)))
            .map(Field::raw)
    }

    pub fn is_selected(&self, key: &str, option: &str) -> bool {
        self.selected(key) == Some(option)
    }

    pub fn is_free(&self, key: &str) -> bool {
        self.field(key).map(|f| f.free).unwrap_or(false)
    }

    /// Toggle the "included in calibration" flag. Fixed parameters refuse.
    pub fn set_free(&mut self, key: &str, free: bool) -> bool {
        if !fields::is_calibratable(key) {
            return false;
        }
        match self.field_mut(key) {
            Some(field) => {
                field.free = free;
                true
            }
            None => false,
        }
    }

    /// Keys among `keys` with at least one occurrence flagged invalid.
    pub fn flagged<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        keys.into_iter()
            .filter(|k| self.field(k).map(Field::is_flagged).unwrap_or(false))
            .map(str::to_string)
            .collect()
    }
}

fn initial_value(key: &str) -> String {
    match key {
        "header" => DEFAULT_HEADER.to_string(),
        fields::SEPARATOR => DEFAULT_SEPARATOR.to_string(),
        "warm_up" => DEFAULT_WARM_UP.to_string(),
        fields::OBJECTIVE => Objective::default().as_str().to_string(),
        "tol" => DEFAULT_TOL.to_string(),
        "minimise" => DEFAULT_MINIMISE.to_string(),
        "verbose" => DEFAULT_VERBOSE.to_string(),
        "snow" => DEFAULT_SNOW.to_string(),
        fields::INITIAL_DISCHARGE => DEFAULT_DISCHARGE.to_string(),
        k if fields::kind_of(k) == Some(FieldKind::Boolean) => "false".to_string(),
        k => match DEFAULT_STATES.iter().find(|(state, _)| *state == k) {
            Some((_, value)) => value.to_string(),
            None => String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_numbers_start_empty() {
        let form = Form::new();
        assert_eq!(form.raw("tol"), Some("0.001"));
        assert!(form.field("tol").map(|f| f.is_valid_at(0)).unwrap_or(false));
        assert!(form.checked("minimise"));
        assert!(!form.checked("init_guess"));
        assert!(form.is_selected(fields::OBJECTIVE, "RMSE"));

        let perc = form.field("perc").unwrap();
        assert_eq!(perc.occurrences.len(), 2);
        assert!(perc.occurrences.iter().all(|o| o.state == FieldState::Empty));
    }

    #[test]
    fn initial_states_are_seeded() {
        let form = Form::new();
        assert_eq!(form.raw("sp"), Some("0"));
        assert_eq!(form.raw("sm"), Some("30"));
        assert_eq!(form.raw("lz"), Some("30"));
        assert_eq!(form.raw(fields::INITIAL_DISCHARGE), Some("0.183"));
        let sm = form.field("sm").unwrap();
        assert!(sm.occurrences.iter().all(|o| o.state == FieldState::Valid));
    }

    #[test]
    fn warning_follows_latest_failure() {
        let mut form = Form::new();
        form.input("perc", 0, "abc");
        let change = form.input("perc", 0, "");
        assert_eq!(change, Some(MarkChange::Mark("A value is required".to_string())));
        let perc = form.field("perc").unwrap();
        assert_eq!(perc.occurrences[0].warning.as_deref(), Some("A value is required"));
        assert_eq!(form.input("perc", 0, " "), Some(MarkChange::Unchanged));
    }

    #[test]
    fn input_marks_and_clears_one_occurrence() {
        let mut form = Form::new();
        let change = form.input("perc", 1, "abc");
        assert!(matches!(change, Some(MarkChange::Mark(_))));
        let perc = form.field("perc").unwrap();
        assert!(perc.occurrences[1].warning.is_some());
        assert_eq!(perc.occurrences[0].state, FieldState::Empty);
        assert!(perc.is_flagged());

        assert_eq!(form.input("perc", 1, "abc"), Some(MarkChange::Unchanged));
        assert_eq!(form.input("perc", 1, "0.2"), Some(MarkChange::Clear));
        assert!(form.field("perc").unwrap().occurrences[1].warning.is_none());
    }

    #[test]
    fn unknown_keys_and_occurrences_are_ignored() {
        let mut form = Form::new();
        assert_eq!(form.input("nope", 0, "1"), None);
        assert_eq!(form.input("area", 1, "1"), None);
    }

    #[test]
    fn fixed_parameters_cannot_be_freed() {
        let mut form = Form::new();
        assert!(!form.set_free("area", true));
        assert!(!form.set_free("tfac", true));
        assert!(form.set_free("k1", true));
        assert!(form.is_free("k1"));
    }
}
