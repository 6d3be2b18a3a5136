//! Client-side state for the HBV-96 calibration page.
//!
//! The library is DOM-free: it validates field input, keeps the context of
//! last valid values in sync with duplicated ("twin") inputs, and turns that
//! context into the JSON payloads the calibration server consumes. The Yew
//! binary in `main.rs` renders from it and performs the actual requests.
//!
//! Dependency order: [`validators`] → [`context`] → [`payload`] / [`results`],
//! tied together by [`session::Session`].

pub mod config;
pub mod context;
pub mod datafile;
pub mod fields;
pub mod form;
pub mod payload;
pub mod results;
pub mod session;
pub mod transport;
pub mod validators;

pub use context::ContextStore;
pub use form::Form;
pub use payload::{BuildError, RunMode};
pub use session::Session;
