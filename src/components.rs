//! View functions for the calibration page.
//!
//! Everything renders from the session snapshot, so these are plain
//! functions rebuilt on every render rather than memoised components.

use crate::hooks::SessionHandle;
use crate::plots::container_id;
use hbv_web::config::{INVALID_CLASS, WARNING_CLASS};
use hbv_web::fields::{self, OBJECTIVES, PARAMETERS, SEPARATORS, STATES};
use hbv_web::results::ServerResponse;
use hbv_web::session::DataStatus;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

const PLOT_CATEGORIES: [&str; 6] = [
    "discharge",
    "precipitation",
    "temperature",
    "evapotranspiration",
    "storage",
    "performance",
];

fn separator_label(separator: &str) -> &'static str {
    match separator {
        "," => "Comma: ,",
        ";" => "Semicolon: ;",
        _ => "Tab: \\t",
    }
}

/// Text input bound to one occurrence of a field, with its warning.
pub fn render_field(session: &SessionHandle, key: &'static str, occurrence: usize) -> Html {
    let (raw, warning, invalid) = session.read(|s| {
        s.form()
            .field(key)
            .and_then(|f| f.occurrences.get(occurrence))
            .map(|o| (o.raw.clone(), o.warning.clone(), o.is_invalid()))
            .unwrap_or_default()
    });
    let placeholder = fields::bounds(key)
        .map(|(lo, hi)| format!("{} .. {}", lo, hi))
        .unwrap_or_default();
    let oninput = {
        let session = session.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            session.update(|s| {
                s.on_input(key, occurrence, &input.value());
            });
        })
    };

    html! {
        <span class="field">
            <input
                type="text"
                id={format!("{}_{}", fields::dom_id(key), occurrence)}
                data-key={key}
                value={raw}
                placeholder={placeholder}
                class={if invalid { INVALID_CLASS } else { "" }}
                oninput={oninput}
            />
            if let Some(message) = warning {
                <div class={WARNING_CLASS}>{ message }</div>
            }
        </span>
    }
}

pub fn render_checkbox(session: &SessionHandle, key: &'static str, label: &str) -> Html {
    let checked = session.read(|s| s.form().checked(key));
    let onchange = {
        let session = session.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            session.update(|s| {
                s.on_toggle(key, input.checked());
            });
        })
    };
    html! {
        <label class="checkbox-group">
            <input type="checkbox" id={fields::dom_id(key)} checked={checked} onchange={onchange} />
            { label }
        </label>
    }
}

/// Objective function as an exclusive pair of radio buttons.
pub fn render_objective(session: &SessionHandle) -> Html {
    OBJECTIVES
        .iter()
        .map(|&option| {
            let checked = session.read(|s| s.form().is_selected(fields::OBJECTIVE, option));
            let onchange = {
                let session = session.clone();
                Callback::from(move |_: Event| {
                    session.update(|s| {
                        s.on_select(fields::OBJECTIVE, option);
                    });
                })
            };
            html! {
                <label class="radio-group">
                    <input type="radio" name={fields::OBJECTIVE} id={fields::dom_id(option)}
                        checked={checked} onchange={onchange} />
                    { option }
                </label>
            }
        })
        .collect()
}

pub fn render_separator(session: &SessionHandle) -> Html {
    let selected = session.read(|s| s.form().selected(fields::SEPARATOR).map(str::to_string));
    let onchange = {
        let session = session.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            session.update(|s| {
                s.on_select(fields::SEPARATOR, &select.value());
            });
        })
    };
    html! {
        <select id={fields::dom_id(fields::SEPARATOR)} onchange={onchange}>
            { for SEPARATORS.iter().map(|&sep| html! {
                <option value={sep} selected={selected.as_deref() == Some(sep)}>
                    { separator_label(sep) }
                </option>
            }) }
        </select>
    }
}

/// Calibration window pickers, disabled until a file has been parsed.
pub fn render_date_pickers(session: &SessionHandle) -> Html {
    let (bounds, from, to) = session.read(|s| {
        (
            s.picker_bounds(),
            s.form().raw(fields::CALIBRATE_FROM).unwrap_or_default().to_string(),
            s.form().raw(fields::CALIBRATE_TO).unwrap_or_default().to_string(),
        )
    });
    let disabled = bounds.is_none();
    let (min, max) = bounds.unwrap_or_default();

    let picker = |key: &'static str, value: String| {
        let oninput = {
            let session = session.clone();
            Callback::from(move |e: InputEvent| {
                let input: HtmlInputElement = e.target_unchecked_into();
                session.update(|s| {
                    s.on_input(key, 0, &input.value());
                });
            })
        };
        html! {
            <input type="datetime-local" id={fields::dom_id(key)} value={value}
                min={min.clone()} max={max.clone()} disabled={disabled} oninput={oninput} />
        }
    };

    html! {
        <div class="form-row">
            <label>{ "Calibrate from:" }</label>
            { picker(fields::CALIBRATE_FROM, from) }
            <label>{ "to:" }</label>
            { picker(fields::CALIBRATE_TO, to) }
        </div>
    }
}

/// Editable parameter list with the "included in calibration" toggles.
pub fn render_parameter_list(session: &SessionHandle) -> Html {
    html! {
        <table id="id_parag_pars" class="parameter-table">
            <thead>
                <tr>
                    <th>{ "Parameter" }</th>
                    <th>{ "Value" }</th>
                    <th>{ "Calibrate" }</th>
                </tr>
            </thead>
            <tbody>
                { for PARAMETERS.iter().map(|&key| {
                    let free_toggle = if fields::is_calibratable(key) {
                        let free = session.read(|s| s.form().is_free(key));
                        let onchange = {
                            let session = session.clone();
                            Callback::from(move |e: Event| {
                                let input: HtmlInputElement = e.target_unchecked_into();
                                session.update(|s| {
                                    s.on_free_toggle(key, input.checked());
                                });
                            })
                        };
                        html! { <input type="checkbox" checked={free} onchange={onchange} /> }
                    } else {
                        html! {}
                    };
                    html! {
                        <tr>
                            <td>{ key }</td>
                            <td>{ render_field(session, key, 0) }</td>
                            <td>{ free_toggle }</td>
                        </tr>
                    }
                }) }
            </tbody>
        </table>
    }
}

pub fn render_state_list(session: &SessionHandle) -> Html {
    html! {
        <table id="id_states" class="parameter-table">
            <tbody>
                { for STATES.iter().chain(std::iter::once(&fields::INITIAL_DISCHARGE)).map(|&key| html! {
                    <tr>
                        <td>{ key }</td>
                        <td>{ render_field(session, key, 0) }</td>
                    </tr>
                }) }
            </tbody>
        </table>
    }
}

/// Second occurrence of each twin, laid over the model schematic.
pub fn render_schema_overlay(session: &SessionHandle) -> Html {
    html! {
        <div id="id_schema" class="schema">
            <img class="svg schema-bg" src="static/img/hbv_schema.svg" alt="HBV-96 model schematic" />
            { for PARAMETERS.iter().chain(STATES.iter())
                .filter(|&&key| fields::occurrence_count(key) > 1)
                .map(|&key| html! {
                    <div class={format!("schema-field schema-{}", key)}>
                        <span class="schema-label">{ key }</span>
                        { render_field(session, key, 1) }
                    </div>
                }) }
        </div>
    }
}

pub fn render_data_status(status: &DataStatus) -> Html {
    match status {
        DataStatus::NotLoaded => html! {
            <p class="data-status">{ "No input file loaded" }</p>
        },
        DataStatus::Loaded(summary) => html! {
            <p class="data-status">
                { format!("{} records, {} to {}", summary.rows, summary.first, summary.last) }
            </p>
        },
        DataStatus::Failed(error) => html! {
            <p class={classes!("data-status", WARNING_CLASS)}>{ error.to_string() }</p>
        },
    }
}

/// Page-level banner for transport failures.
pub fn render_banner(message: Option<&str>, onclose: Callback<MouseEvent>) -> Html {
    match message {
        Some(message) => html! {
            <div class="error-banner" role="alert">
                <span>{ message }</span>
                <button class="btn-secondary small" onclick={onclose}>{ "Dismiss" }</button>
            </div>
        },
        None => html! {},
    }
}

/// Result panel; plot containers are filled after render by the plot helpers.
pub fn render_results(response: Option<&ServerResponse>, busy: bool) -> Html {
    let Some(response) = response else {
        return html! {
            <div class="no-results-message">
                <p>{ if busy { "Waiting for the server..." } else { "Run a simulation or calibration to see results." } }</p>
            </div>
        };
    };

    html! {
        <div class="results">
            if let Some(performance) = response.performance {
                <div class="performance">{ format!("Objective function: {:.4}", performance) }</div>
            }
            { for PLOT_CATEGORIES.iter().map(|&category| html! {
                <div id={container_id(category)} class="plot"></div>
            }) }
        </div>
    }
}
