//! AJAX transport over `fetch`.

use crate::results::ServerResponse;
use futures::future::{self, Either};
use gloo_timers::future::TimeoutFuture;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, DomException, Headers, Request, RequestInit, Response};

/// Failure of a request, one variant per message shown in the page banner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    NoConnection,
    NotFound,
    Server(u16),
    Status(u16),
    Parse(String),
    Timeout,
    Aborted,
    Encode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NoConnection => {
                write!(f, "Not connected, please verify your network connection")
            }
            TransportError::NotFound => write!(f, "Requested page not found (404)"),
            TransportError::Server(status) => write!(f, "Internal server error ({})", status),
            TransportError::Status(status) => {
                write!(f, "Unexpected response status {}", status)
            }
            TransportError::Parse(detail) => {
                write!(f, "Requested JSON parse failed: {}", detail)
            }
            TransportError::Timeout => write!(f, "The server did not answer in time"),
            TransportError::Aborted => write!(f, "The request was aborted"),
            TransportError::Encode(detail) => {
                write!(f, "The request could not be encoded: {}", detail)
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Map an HTTP status to success or the matching error.
pub fn check_status(status: u16) -> Result<(), TransportError> {
    match status {
        200..=299 => Ok(()),
        0 => Err(TransportError::NoConnection),
        404 => Err(TransportError::NotFound),
        500..=599 => Err(TransportError::Server(status)),
        other => Err(TransportError::Status(other)),
    }
}

/// A rejected `fetch` promise is either an abort or a network failure.
fn rejection(err: JsValue) -> TransportError {
    match err.dyn_into::<DomException>() {
        Ok(e) if e.name() == "AbortError" => TransportError::Aborted,
        _ => TransportError::NoConnection,
    }
}

/// POST `body` as JSON and decode the server response.
///
/// The request is aborted and reported as [`TransportError::Timeout`] when
/// no answer arrives within `timeout_ms`.
pub async fn post_json<B: Serialize>(
    url: &str,
    body: &B,
    timeout_ms: u32,
) -> Result<ServerResponse, TransportError> {
    let payload = serde_json::to_string(body).map_err(|e| TransportError::Encode(e.to_string()))?;

    let controller = AbortController::new().map_err(|_| TransportError::NoConnection)?;
    let headers = Headers::new().map_err(|_| TransportError::NoConnection)?;
    headers
        .set("Content-Type", "application/json")
        .map_err(|e| TransportError::Encode(format!("{:?}", e)))?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&payload));
    init.set_signal(Some(&controller.signal()));
    let request = Request::new_with_str_and_init(url, &init)
        .map_err(|e| TransportError::Encode(format!("{:?}", e)))?;

    info!("POST {} ({} bytes)", url, payload.len());
    let started = js_sys::Date::now();
    let fetch = JsFuture::from(gloo_utils::window().fetch_with_request(&request));
    let timeout = TimeoutFuture::new(timeout_ms);
    futures::pin_mut!(fetch, timeout);

    let value = match future::select(fetch, timeout).await {
        Either::Left((result, _)) => result.map_err(rejection)?,
        Either::Right(_) => {
            controller.abort();
            warn!("POST {} timed out after {} ms", url, timeout_ms);
            return Err(TransportError::Timeout);
        }
    };

    let response: Response = value
        .dyn_into()
        .map_err(|_| TransportError::Parse("fetch did not yield a Response".to_string()))?;
    info!(
        "POST {} answered {} after {:.0} ms",
        url,
        response.status(),
        js_sys::Date::now() - started
    );
    check_status(response.status())?;

    let json = response
        .json()
        .map_err(|e| TransportError::Parse(format!("{:?}", e)))?;
    let json = JsFuture::from(json)
        .await
        .map_err(|e| TransportError::Parse(format!("{:?}", e)))?;
    serde_wasm_bindgen::from_value(json).map_err(|e| TransportError::Parse(e.to_string()))
}
