use axum::extract::{Form, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use callflow_core::CallDocument;
use serde::Deserialize;
use tracing::error;

use crate::AppState;

/// Render a call-control document, or 500 if it cannot be built
pub(crate) fn twiml(doc: callflow_core::Result<CallDocument>) -> Response {
    match doc.and_then(|d| d.render()) {
        Ok(xml) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml")], xml).into_response(),
        Err(e) => {
            error!(target = "callflow", error = %e, "Failed to build call-control document");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DigitsForm {
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeechForm {
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
    pub sig: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayQuery {
    pub file: Option<String>,
    pub lang: Option<String>,
    pub attempt: Option<String>,
    pub sig: Option<String>,
}

pub async fn voice(State(state): State<AppState>) -> Response {
    twiml(state.flow.welcome())
}

pub async fn set_language(
    State(state): State<AppState>,
    form: Option<Form<DigitsForm>>,
) -> Response {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    twiml(state.flow.select_language(form.digits.as_deref()))
}

pub async fn ask_query(State(state): State<AppState>, Query(q): Query<LangQuery>) -> Response {
    twiml(state.flow.query_prompt(q.lang.as_deref(), q.sig.as_deref()))
}

pub async fn process(
    State(state): State<AppState>,
    Query(q): Query<LangQuery>,
    form: Option<Form<SpeechForm>>,
) -> Response {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let doc = state
        .flow
        .process_turn(
            q.lang.as_deref(),
            q.sig.as_deref(),
            form.speech_result.as_deref(),
            state.responder.as_ref(),
            state.jobs.as_ref(),
        )
        .await;
    twiml(doc)
}

pub async fn play(State(state): State<AppState>, Query(q): Query<PlayQuery>) -> Response {
    let attempt = q
        .attempt
        .as_deref()
        .and_then(|a| a.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let doc = state
        .flow
        .poll(
            q.file.as_deref().unwrap_or_default(),
            q.lang.as_deref(),
            attempt,
            q.sig.as_deref(),
        )
        .await;
    twiml(doc)
}

pub async fn health() -> &'static str {
    "OK"
}
