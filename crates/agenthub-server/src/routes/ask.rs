use agenthub::{errors::HubError, models::request::AskRequest, models::response::AskResponse};
use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use tracing::{error, warn};

use crate::state::AppState;

/// Required string fields and the code reported when one is absent, null or blank
const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("session_id", "MISSING_SESSION_ID"),
    ("model_id", "MISSING_MODEL_ID"),
    ("user", "MISSING_USER"),
    ("prompt", "MISSING_PROMPT"),
];

/// Validate a raw request body, reporting the first problem found
pub fn parse_request(body: &[u8]) -> Result<AskRequest, HubError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        HubError::invalid("INVALID_JSON", format!("Request body is not valid JSON: {}", err))
    })?;

    let Value::Object(fields) = &value else {
        return Err(HubError::invalid(
            "INVALID_REQUEST",
            "Request body must be a JSON object",
        ));
    };

    for &(field, code) in REQUIRED_FIELDS {
        let missing = match fields.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(HubError::invalid(
                code,
                format!("Field '{}' is required", field),
            ));
        }
    }

    serde_json::from_value(value)
        .map_err(|err| HubError::invalid("INVALID_REQUEST", format!("Invalid request: {}", err)))
}

/// Best effort, so error replies can still be matched to a session
fn session_id_of(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("session_id")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

async fn ask(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<AskResponse>) {
    let result = match parse_request(&body) {
        Ok(request) => state.orchestrator.ask(&request).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => {
            let status =
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_client_error() {
                warn!(step = err.error_step(), error = %err, "rejected request");
            } else {
                error!(step = err.error_step(), error = %err, "request failed");
            }

            let response = AskResponse::error(
                session_id_of(&body),
                err.to_string(),
                err.error_step(),
                err.error_code(),
                err.details(),
            );
            (status, Json(response))
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .with_state(state)
}
