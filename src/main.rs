//! HBV-96 calibration page built with Yew.
//! Wires the session hook, form panels, submit handling and result display.

use hbv_web::{
    config::{CALIBRATE_URL, REQUEST_TIMEOUT_MS, SIMULATE_URL},
    payload::RunMode,
    session::ResponseOutcome,
    transport,
};
use log::{info, warn};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::HtmlInputElement;
use yew::prelude::*;

mod components;
mod hooks;
mod plots;

use components::{
    render_banner, render_checkbox, render_data_status, render_date_pickers, render_field,
    render_objective, render_parameter_list, render_results, render_schema_overlay,
    render_separator, render_state_list,
};
use hooks::use_session;

fn endpoint(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Calibrate => CALIBRATE_URL,
        RunMode::Simulate => SIMULATE_URL,
    }
}

/// Blocking notice for a rejected build, shown before anything is sent.
fn alert(message: &str) {
    let _ = gloo_utils::window().alert_with_message(message);
}

/// Primary application component.
#[function_component(App)]
fn app() -> Html {
    let session = use_session();
    // Ticket of the last response whose plots should be on the page
    let shown_ticket = use_state(|| 0u64);

    // Inject plot fragments once their containers have rendered
    {
        let session = session.clone();
        use_effect_with(*shown_ticket, move |_| {
            session.read(|s| {
                if let Some(response) = s.last_response() {
                    plots::show_bundle(&response.plots);
                }
            });
            || ()
        });
    }

    let submit = {
        let session = session.clone();
        let shown_ticket = shown_ticket.clone();
        Callback::from(move |mode: RunMode| {
            let prepared = session.update(|s| s.submit(mode));
            let (ticket, request) = match prepared {
                Ok(prepared) => prepared,
                Err(e) => {
                    warn!("Submit refused: {}", e);
                    alert(&e.to_string());
                    return;
                }
            };

            let session = session.clone();
            let shown_ticket = shown_ticket.clone();
            spawn_local(async move {
                let result = transport::post_json(endpoint(mode), &request, REQUEST_TIMEOUT_MS).await;
                let outcome = session.update(|s| s.receive(ticket, result));
                if let ResponseOutcome::Applied(report) = outcome {
                    info!("Response #{} applied ({} parameters)", ticket, report.applied.len());
                    shown_ticket.set(ticket);
                }
            });
        })
    };

    let on_file = {
        let session = session.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            let session = session.clone();
            spawn_local(async move {
                match JsFuture::from(file.text()).await {
                    Ok(text) => {
                        let text = text.as_string().unwrap_or_default();
                        session.update(|s| {
                            s.load_data(text);
                        });
                    }
                    Err(e) => session.update(|s| {
                        s.set_banner(format!("Could not read the input file: {:?}", e));
                    }),
                }
            });
        })
    };

    let on_demo = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| {
            session.update(|s| {
                s.load_demo_preset();
            });
        })
    };

    let on_close_banner = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| session.update(|s| s.clear_banner()))
    };

    let (banner, data_status, busy) = session.read(|s| {
        (
            s.banner().map(str::to_string),
            s.data_status().clone(),
            s.pending().is_some(),
        )
    });

    html! {
        <div class="container">
            <h1>{ "HBV-96 Calibration" }</h1>
            { render_banner(banner.as_deref(), on_close_banner) }

            <section class="data-section">
                <h2>{ "Input data" }</h2>
                <div class="form-row">
                    <label for="id_datafile">{ "Data file:" }</label>
                    <input type="file" id="id_datafile" accept=".csv,.txt" onchange={on_file} />
                </div>
                <div class="form-row">
                    <label for="id_header">{ "Header rows:" }</label>
                    { render_field(&session, "header", 0) }
                    <label for="id_separator">{ "Separator:" }</label>
                    { render_separator(&session) }
                </div>
                { render_data_status(&data_status) }
                { render_date_pickers(&session) }
            </section>

            <section class="config-section">
                <h2>{ "Run configuration" }</h2>
                <div class="form-row">
                    <label>{ "Warm-up steps:" }</label>
                    { render_field(&session, "warm_up", 0) }
                    <label>{ "Tolerance:" }</label>
                    { render_field(&session, "tol", 0) }
                </div>
                <div class="form-row">
                    { render_objective(&session) }
                </div>
                <div class="form-row">
                    { render_checkbox(&session, "minimise", "Minimise") }
                    { render_checkbox(&session, "verbose", "Verbose") }
                    { render_checkbox(&session, "snow", "Snow module") }
                    { render_checkbox(&session, "calibrate_all_par", "Calibrate all parameters") }
                    { render_checkbox(&session, "init_guess", "Use values as initial guess") }
                    { render_checkbox(&session, "sci_notation", "Scientific notation") }
                </div>
            </section>

            <section class="model-section">
                <div class="model-lists">
                    <h2>{ "Parameters" }</h2>
                    { render_parameter_list(&session) }
                    <h2>{ "Initial states" }</h2>
                    { render_state_list(&session) }
                </div>
                { render_schema_overlay(&session) }
            </section>

            <div class="actions">
                <button class="btn-secondary" onclick={on_demo}>{ "Load demo" }</button>
                <button disabled={busy} onclick={submit.reform(|_: MouseEvent| RunMode::Simulate)}>
                    { "Simulate" }
                </button>
                <button disabled={busy} onclick={submit.reform(|_: MouseEvent| RunMode::Calibrate)}>
                    { "Calibrate" }
                </button>
            </div>

            <section class="results-area">
                { session.read(|s| render_results(s.last_response(), busy)) }
            </section>
        </div>
    }
}

/// Entry point: installs the panic hook and mounts the application.
fn main() {
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}
