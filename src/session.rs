//! Page session: the owner of the form mirror, the context store and the
//! request sequencing state.
//!
//! The view creates one `Session` at mount and routes every field event,
//! submit and server response through it.

use crate::config::{DEFAULT_HEADER, DEFAULT_SEPARATOR};
use crate::context::{ContextStore, PresetReport};
use crate::datafile::{self, DataFileError, DataSummary};
use crate::fields::{self, CALIBRATE_FROM, CALIBRATE_TO};
use crate::form::Form;
use crate::payload::{self, BuildError, RunMode, RunRequest};
use crate::results::{self, ApplyReport, ServerResponse};
use crate::transport::TransportError;
use crate::validators::{self, MarkChange};
use log::{debug, info, warn};
use serde_json::{Map, Value as JsonValue};

/// Identifies one submitted request.
pub type RequestTicket = u64;

/// Hands out increasing tickets; only the latest one may apply its response.
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    latest: RequestTicket,
}

impl RequestSequencer {
    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket == self.latest
    }
}

/// Load state of the input data file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DataStatus {
    #[default]
    NotLoaded,
    Loaded(DataSummary),
    Failed(DataFileError),
}

/// What happened to a server response handed to [`Session::receive`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// A newer request was submitted; the response was discarded.
    Stale,
    Applied(ApplyReport),
    Failed(TransportError),
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    form: Form,
    store: ContextStore,
    requests: RequestSequencer,
    pending: Option<RunMode>,
    data: String,
    data_status: DataStatus,
    last_response: Option<ServerResponse>,
    banner: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        let form = Form::new();
        let store = ContextStore::from_form(&form);
        Self {
            form,
            store,
            ..Default::default()
        }
    }

    /// Start from a named preset instead of the page defaults.
    pub fn with_preset(preset: &Map<String, JsonValue>) -> Self {
        let mut session = Self::new();
        session.load_preset(preset);
        session
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn data_status(&self) -> &DataStatus {
        &self.data_status
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn set_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
    }

    pub fn clear_banner(&mut self) {
        self.banner = None;
    }

    pub fn last_response(&self) -> Option<&ServerResponse> {
        self.last_response.as_ref()
    }

    pub fn pending(&self) -> Option<RunMode> {
        self.pending
    }

    /// (min, max) for the calibration pickers, `None` while they stay disabled.
    pub fn picker_bounds(&self) -> Option<(String, String)> {
        match &self.data_status {
            DataStatus::Loaded(summary) => Some(summary.picker_bounds()),
            _ => None,
        }
    }

    /// Text typed into one occurrence of a field.
    ///
    /// Validation and the store write complete before this returns, so a
    /// submit triggered by the same user action sees the new value.
    pub fn on_input(&mut self, key: &str, occurrence: usize, raw: &str) -> Option<MarkChange> {
        let change = self.form.input(key, occurrence, raw)?;
        if self.store.set_if_valid(&self.form, key, occurrence) && fields::is_twin(key) {
            self.store
                .propagate_twin(&mut self.form, key, occurrence, raw);
        }
        if (key == "header" || key == fields::SEPARATOR) && !self.data.is_empty() {
            self.summarize_data();
        }
        Some(change)
    }

    pub fn on_toggle(&mut self, key: &str, checked: bool) -> Option<MarkChange> {
        let change = self.form.set_checked(key, checked)?;
        self.store.set_if_valid(&self.form, key, 0);
        Some(change)
    }

    /// Pick one option of an exclusive selector.
    pub fn on_select(&mut self, key: &str, option: &str) -> Option<MarkChange> {
        self.on_input(key, 0, option)
    }

    pub fn on_free_toggle(&mut self, key: &str, free: bool) -> bool {
        self.form.set_free(key, free)
    }

    pub fn load_preset(&mut self, preset: &Map<String, JsonValue>) -> PresetReport {
        self.store.load_preset(&mut self.form, preset)
    }

    pub fn load_demo_preset(&mut self) -> PresetReport {
        self.store.load_demo_preset(&mut self.form)
    }

    /// Keep the uploaded file and derive the picker range from it.
    pub fn load_data(&mut self, text: String) -> &DataStatus {
        self.data = text;
        self.summarize_data();
        &self.data_status
    }

    fn summarize_data(&mut self) {
        let header = self
            .store
            .text("header")
            .and_then(validators::parse_count)
            .unwrap_or(DEFAULT_HEADER);
        let separator = self
            .store
            .text(fields::SEPARATOR)
            .unwrap_or(DEFAULT_SEPARATOR)
            .to_string();

        match datafile::summarize(&self.data, header, &separator) {
            Ok(summary) => {
                let (min, max) = summary.picker_bounds();
                for (key, value) in [(CALIBRATE_FROM, min), (CALIBRATE_TO, max)] {
                    if self.store.text(key).is_none() {
                        self.form.input(key, 0, &value);
                        self.store.set_if_valid(&self.form, key, 0);
                    }
                }
                self.data_status = DataStatus::Loaded(summary);
            }
            Err(e) => {
                warn!("Input file rejected: {}", e);
                self.data_status = DataStatus::Failed(e);
            }
        }
    }

    /// Build the request for `mode` and take a ticket for it.
    pub fn submit(&mut self, mode: RunMode) -> Result<(RequestTicket, RunRequest), BuildError> {
        let data = match &self.data_status {
            DataStatus::Loaded(_) => self.data.as_str(),
            _ => "",
        };
        let request = payload::build_request(&self.form, &self.store, mode, data)?;
        let ticket = self.requests.begin();
        self.pending = Some(mode);
        self.banner = None;
        info!("Submitting {:?} request #{}", mode, ticket);
        Ok((ticket, request))
    }

    /// Apply a server response, unless a newer request has been submitted.
    pub fn receive(
        &mut self,
        ticket: RequestTicket,
        result: Result<ServerResponse, TransportError>,
    ) -> ResponseOutcome {
        if !self.requests.is_current(ticket) {
            debug!("Discarding stale response #{}", ticket);
            return ResponseOutcome::Stale;
        }
        self.pending = None;

        match result {
            Ok(response) => {
                let report = match &response.par {
                    Some(par) => {
                        results::apply_calibrated_parameters(&mut self.form, &mut self.store, par)
                    }
                    None => ApplyReport::default(),
                };
                self.last_response = Some(response);
                ResponseOutcome::Applied(report)
            }
            Err(e) => {
                warn!("Request #{} failed: {}", ticket, e);
                self.banner = Some(e.to_string());
                ResponseOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const DATA: &str = "date,prec,temp,q_rec\n\
        2017-01-01 00:00,0.0,-1.2,0.18\n\
        2017-01-02 00:00,0.4,-0.8,0.19\n";

    fn ready() -> Session {
        let mut session = Session::new();
        session.load_demo_preset();
        session.load_data(DATA.to_string());
        session
    }

    fn calibrated(perc: f64) -> ServerResponse {
        let mut par = BTreeMap::new();
        par.insert("perc".to_string(), perc);
        ServerResponse {
            par: Some(par),
            ..Default::default()
        }
    }

    #[test]
    fn typing_into_a_twin_updates_sibling_and_store() {
        let mut session = Session::new();
        session.on_input("perc", 1, "0.3");

        let perc = session.form().field("perc").unwrap();
        assert_eq!(perc.occurrences[0].raw, "0.3");
        assert_eq!(session.store().number("perc"), Some(0.3));
    }

    #[test]
    fn invalid_input_keeps_last_valid_value() {
        let mut session = Session::new();
        session.on_input("perc", 0, "0.3");
        let change = session.on_input("perc", 0, "0.3.");
        assert!(matches!(change, Some(MarkChange::Mark(_))));
        assert_eq!(session.store().number("perc"), Some(0.3));
        // the sibling keeps the last propagated value
        assert_eq!(session.form().field("perc").unwrap().occurrences[1].raw, "0.3");
    }

    #[test]
    fn data_load_sets_picker_range() {
        let session = ready();
        assert_eq!(
            session.picker_bounds(),
            Some(("2017-01-01T00:00".to_string(), "2017-01-02T00:00".to_string()))
        );
        assert_eq!(session.store().text(CALIBRATE_FROM), Some("2017-01-01T00:00"));
    }

    #[test]
    fn malformed_file_keeps_pickers_disabled() {
        let mut session = Session::new();
        let status = session.load_data("garbage;only\n1;2\n".to_string());
        assert!(matches!(status, DataStatus::Failed(_)));
        assert_eq!(session.picker_bounds(), None);
        assert!(session.submit(RunMode::Simulate).is_err());
    }

    #[test]
    fn header_index_counts_from_zero() {
        let mut session = ready();
        match session.data_status() {
            DataStatus::Loaded(summary) => assert_eq!(summary.rows, 2),
            other => panic!("unexpected {:?}", other),
        }
        session.on_input("header", 0, "1");
        match session.data_status() {
            DataStatus::Loaded(summary) => assert_eq!(summary.rows, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn changing_separator_reparses_file() {
        let mut session = ready();
        session.on_select(fields::SEPARATOR, ";");
        assert!(matches!(session.data_status(), DataStatus::Failed(_)));
        session.on_select(fields::SEPARATOR, ",");
        assert!(matches!(session.data_status(), DataStatus::Loaded(_)));
    }

    #[test]
    fn submit_refuses_invalid_required_field() {
        let mut session = ready();
        session.on_input("fc", 0, "x");
        assert!(matches!(
            session.submit(RunMode::Simulate),
            Err(BuildError::InvalidFields { .. })
        ));
        assert_eq!(session.pending(), None);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut session = ready();
        let (first, _) = session.submit(RunMode::Calibrate).unwrap();
        let (second, _) = session.submit(RunMode::Calibrate).unwrap();

        assert!(matches!(
            session.receive(second, Ok(calibrated(0.05))),
            ResponseOutcome::Applied(_)
        ));
        assert_eq!(session.receive(first, Ok(calibrated(0.09))), ResponseOutcome::Stale);
        assert_eq!(session.store().number("perc"), Some(0.05));
    }

    #[test]
    fn transport_failure_sets_banner() {
        let mut session = ready();
        let (ticket, _) = session.submit(RunMode::Simulate).unwrap();
        let outcome = session.receive(ticket, Err(TransportError::Timeout));
        assert_eq!(outcome, ResponseOutcome::Failed(TransportError::Timeout));
        assert_eq!(session.banner(), Some(TransportError::Timeout.to_string().as_str()));
        assert_eq!(session.pending(), None);
    }

    #[test]
    fn preset_session_starts_from_preset() {
        let session = Session::with_preset(&crate::context::demo_preset());
        assert_eq!(session.store().number("area"), Some(135.0));
    }
}
