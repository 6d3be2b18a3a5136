//! Pure field validators and the per-field validity state machine.
//!
//! Validators never touch the page. They return a [`Validation`], and
//! [`transition`] turns it into a [`MarkChange`] that the DOM adapter applies.

use crate::fields::FieldKind;
use once_cell::sync::Lazy;
use regex::Regex;

// Compiled grammars
static FLOAT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap());
static UNSIGNED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static DATETIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}([ T]\d{2}:\d{2}(:\d{2})?)?$").unwrap());

/// Outcome of checking one raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    /// User-facing explanation, present only when invalid.
    pub message: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// Validity of a single DOM occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    #[default]
    Empty,
    Invalid,
    Valid,
}

/// UI change the adapter must perform after a validation.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkChange {
    /// Flag the field and show exactly one warning next to it.
    Mark(String),
    /// Remove the flag and its warning.
    Clear,
    Unchanged,
}

pub fn is_float(raw: &str) -> bool {
    FLOAT_REGEX.is_match(raw.trim())
}

/// Parse a value that follows the float grammar into a finite number.
pub fn parse_float(raw: &str) -> Option<f64> {
    if is_float(raw) {
        raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    } else {
        None
    }
}

/// Parse a value that follows the unsigned integer grammar.
pub fn parse_count(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if UNSIGNED_REGEX.is_match(trimmed) {
        trimmed.parse::<u32>().ok()
    } else {
        None
    }
}

pub fn validate_float(raw: &str) -> Validation {
    if raw.trim().is_empty() {
        Validation::fail("A value is required")
    } else if !is_float(raw) {
        Validation::fail("Please enter a valid number")
    } else if parse_float(raw).is_none() {
        Validation::fail("Value is out of range")
    } else {
        Validation::ok()
    }
}

/// Like [`validate_float`], but an empty value means "unset" and passes.
pub fn validate_optional_float(raw: &str) -> Validation {
    if raw.trim().is_empty() {
        Validation::ok()
    } else {
        validate_float(raw)
    }
}

pub fn validate_bounded_float(raw: &str, min: f64) -> Validation {
    let base = validate_float(raw);
    if !base.valid {
        return base;
    }
    match parse_float(raw) {
        Some(v) if v > min => Validation::ok(),
        _ => Validation::fail(format!("Value must be greater than {}", min)),
    }
}

pub fn validate_non_negative_integer(raw: &str) -> Validation {
    if parse_count(raw).is_some() {
        Validation::ok()
    } else if UNSIGNED_REGEX.is_match(raw.trim()) {
        Validation::fail("Value is too large")
    } else {
        Validation::fail("Please enter a non-negative integer")
    }
}

pub fn validate_datetime(raw: &str) -> Validation {
    if DATETIME_REGEX.is_match(raw.trim()) {
        Validation::ok()
    } else {
        Validation::fail("Please pick a date and time")
    }
}

/// Dispatch on the field kind.
pub fn validate(raw: &str, kind: FieldKind) -> Validation {
    match kind {
        FieldKind::Float => validate_float(raw),
        FieldKind::OptionalFloat => validate_optional_float(raw),
        FieldKind::BoundedFloat { min } => validate_bounded_float(raw, min),
        FieldKind::NonNegativeInteger => validate_non_negative_integer(raw),
        FieldKind::DateTime => validate_datetime(raw),
        FieldKind::Boolean => match raw {
            "true" | "false" => Validation::ok(),
            _ => Validation::fail("Expected true or false"),
        },
        FieldKind::Choice(options) => {
            if options.contains(&raw) {
                Validation::ok()
            } else {
                Validation::fail(format!("Choose one of: {}", options.join(", ")))
            }
        }
    }
}

/// Compute the next state and the marking change.
///
/// Marking is idempotent: re-validating an unchanged state yields
/// [`MarkChange::Unchanged`], so warnings never stack. `shown` is the warning
/// currently displayed; a flagged field whose message changes is re-marked.
pub fn transition(
    previous: FieldState,
    shown: Option<&str>,
    validation: &Validation,
) -> (FieldState, MarkChange) {
    let next = if validation.valid {
        FieldState::Valid
    } else {
        FieldState::Invalid
    };
    let change = match (previous, next) {
        (FieldState::Invalid, FieldState::Valid) => MarkChange::Clear,
        (FieldState::Invalid, FieldState::Invalid) => match validation.message.as_deref() {
            Some(message) if shown != Some(message) => MarkChange::Mark(message.to_string()),
            _ => MarkChange::Unchanged,
        },
        (_, FieldState::Invalid) => {
            MarkChange::Mark(validation.message.clone().unwrap_or_default())
        }
        _ => MarkChange::Unchanged,
    };
    (next, change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_grammar_accepts_numbers() {
        for raw in ["0", "-1", "+2.5", "3.", ".5", "1e-5", "5E+3", "-0.00005", " 42 "] {
            assert!(validate_float(raw).valid, "{} should be valid", raw);
        }
    }

    #[test]
    fn float_grammar_rejects_garbage() {
        for raw in ["", "abc", "1.2.3", "1e", "--1", "1,5", ".", "e5", "nan"] {
            let v = validate_float(raw);
            assert!(!v.valid, "{} should be invalid", raw);
            assert!(v.message.is_some());
        }
    }

    #[test]
    fn optional_float_allows_empty() {
        assert!(validate_optional_float("").valid);
        assert!(validate_optional_float("0.183").valid);
        assert!(!validate_optional_float("x").valid);
    }

    #[test]
    fn bounded_float_is_strict() {
        assert!(validate_bounded_float("0.001", 0.0).valid);
        assert!(!validate_bounded_float("0", 0.0).valid);
        assert!(!validate_bounded_float("-3", 0.0).valid);
        assert!(!validate_bounded_float("zero", 0.0).valid);
    }

    #[test]
    fn non_negative_integers() {
        assert!(validate_non_negative_integer("0").valid);
        assert!(validate_non_negative_integer("24").valid);
        assert!(!validate_non_negative_integer("-1").valid);
        assert!(!validate_non_negative_integer("2.5").valid);
        assert!(!validate_non_negative_integer("").valid);
    }

    #[test]
    fn choices_and_dates() {
        let kind = FieldKind::Choice(&["RMSE", "NSE"]);
        assert!(validate("NSE", kind).valid);
        assert!(!validate("MAE", kind).valid);
        assert!(validate_datetime("2017-03-01T12:00").valid);
        assert!(validate_datetime("2017-03-01 12:00:30").valid);
        assert!(!validate_datetime("01/03/2017").valid);
    }

    #[test]
    fn marking_is_idempotent() {
        let bad = validate_float("x");
        let (state, change) = transition(FieldState::Valid, None, &bad);
        assert_eq!(state, FieldState::Invalid);
        assert!(matches!(change, MarkChange::Mark(_)));

        let shown = bad.message.as_deref();
        let (state, change) = transition(state, shown, &bad);
        assert_eq!(state, FieldState::Invalid);
        assert_eq!(change, MarkChange::Unchanged);

        let good = validate_float("1");
        let (state, change) = transition(state, None, &good);
        assert_eq!(state, FieldState::Valid);
        assert_eq!(change, MarkChange::Clear);

        let (state, change) = transition(state, None, &good);
        assert_eq!(state, FieldState::Valid);
        assert_eq!(change, MarkChange::Unchanged);
    }

    #[test]
    fn empty_field_transitions() {
        let (state, change) = transition(FieldState::Empty, None, &validate_float("1"));
        assert_eq!((state, change), (FieldState::Valid, MarkChange::Unchanged));
        let (state, _) = transition(FieldState::Empty, None, &validate_float(""));
        assert_eq!(state, FieldState::Invalid);
    }

    #[test]
    fn new_message_replaces_shown_warning() {
        let shown = validate_float("abc").message;
        let (state, change) = transition(FieldState::Invalid, shown.as_deref(), &validate_float(""));
        assert_eq!(state, FieldState::Invalid);
        assert_eq!(change, MarkChange::Mark("A value is required".to_string()));
    }

    #[test]
    fn overflowing_floats_are_rejected() {
        for raw in ["1e999", "-1e400"] {
            assert_eq!(parse_float(raw), None);
            let v = validate_float(raw);
            assert!(!v.valid, "{} should be invalid", raw);
            assert_eq!(v.message.as_deref(), Some("Value is out of range"));
        }
        assert!(!validate_bounded_float("1e999", 0.0).valid);
        assert!(!validate_optional_float("-1e400").valid);
    }

    #[test]
    fn oversized_count_has_its_own_message() {
        assert_eq!(parse_count("4294967296"), None);
        let v = validate_non_negative_integer("4294967296");
        assert!(!v.valid);
        assert_eq!(v.message.as_deref(), Some("Value is too large"));
        assert!(validate_non_negative_integer("4294967295").valid);
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_float("5e-5"), Some(0.00005));
        assert_eq!(parse_float("1.2.3"), None);
        assert_eq!(parse_count("10"), Some(10));
        assert_eq!(parse_count("-10"), None);
    }
}
