//! REST API endpoint handlers.
//!
//! Every mutating endpoint goes through the [`PanelHandle`], so it waits for
//! the panel task to apply the command and answers with its outcome.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prompting::PromptError;
use prompting::panel::RefreshOutcome;
use prompting::parameters::{ParameterDefinition, StoredValue};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::PanelHandle;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub handle: PanelHandle,
}

/// HTTP status for a panel error.
pub(crate) fn status_for(error: &PromptError) -> StatusCode {
    match error {
        PromptError::UnknownParameter(_)
        | PromptError::UnknownGroup(_)
        | PromptError::UnknownComponent(_) => StatusCode::NOT_FOUND,
        PromptError::ArgRequired(_)
        | PromptError::InvalidArgument { .. }
        | PromptError::InvalidDefinition(_) => StatusCode::BAD_REQUEST,
        PromptError::Fetch(_) => StatusCode::BAD_GATEWAY,
        PromptError::PanelNotFound => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: PromptError) -> Response {
    (status_for(&error), Json(json!({ "error": error.to_string() }))).into_response()
}

fn outcome_response(result: Result<RefreshOutcome, PromptError>) -> Response {
    match result {
        Ok(outcome) => Json(json!({ "outcome": outcome })).into_response(),
        Err(e) => error_response(e),
    }
}

fn empty_response(result: Result<(), PromptError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/state: The latest panel snapshot.
pub async fn get_state(State(app): State<AppState>) -> Json<Value> {
    Json(app.handle.snapshot().to_json())
}

/// Request body for POST /api/parameter.
#[derive(Deserialize)]
pub struct ParameterRequest {
    pub name: String,
    /// A string, an array of strings, or `null` to clear.
    #[serde(default)]
    pub value: Value,
}

/// POST /api/parameter: A user changed a parameter.
///
/// Returns the refresh outcome, 404 for an unknown parameter and 502 when
/// the definition provider failed.
pub async fn post_parameter(
    State(app): State<AppState>,
    Json(body): Json<ParameterRequest>,
) -> Response {
    let value = StoredValue::from_json(&body.value);
    outcome_response(app.handle.set_parameter(body.name, value).await)
}

/// Request body for POST /api/refresh.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub definition: ParameterDefinition,
}

/// POST /api/refresh: Apply a new definition to the live panel.
pub async fn post_refresh(
    State(app): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Response {
    outcome_response(app.handle.refresh(body.definition).await)
}

/// POST /api/submit: Submit the form. Returns 204.
pub async fn post_submit(State(app): State<AppState>) -> Response {
    empty_response(app.handle.submit().await)
}

/// Request body for POST /api/focus.
#[derive(Deserialize)]
pub struct FocusRequest {
    pub parameter: String,
}

/// POST /api/focus: Focus a parameter's widget. 404 for unknown names.
pub async fn post_focus(
    State(app): State<AppState>,
    Json(body): Json<FocusRequest>,
) -> Response {
    empty_response(app.handle.focus(body.parameter).await)
}

/// Request body for POST /api/scroll.
#[derive(Deserialize)]
pub struct ScrollRequest {
    pub component: String,
    pub offset: u32,
}

/// POST /api/scroll: Scroll a component.
///
/// 404 for an unknown component, 400 for one that cannot scroll.
pub async fn post_scroll(
    State(app): State<AppState>,
    Json(body): Json<ScrollRequest>,
) -> Response {
    empty_response(app.handle.scroll(body.component, body.offset).await)
}
