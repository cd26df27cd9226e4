//! Route handlers.
//!
//! Every response body is JSON: `{"text": ...}` on success and
//! `{"error": ...}` otherwise.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde_json::{Value, json};

use relaychat_core::{ChatError, RelayErrorBody, RelayReply, RelayRequest};

use crate::state::AppState;

/// Status plus `{"error": ...}` body.
pub type ErrorResponse = (StatusCode, Json<RelayErrorBody>);

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

/// Forward one exchange to the upstream provider.
///
/// The credential check comes before body parsing, so an unconfigured relay
/// answers 500 regardless of what was posted.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<RelayReply>, ErrorResponse> {
    let Some(backend) = state.backend.as_ref() else {
        return Err(error_response(&state.missing_credential()));
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected chat body");
            return Err(rejection_response(&rejection));
        }
    };

    if request.message.trim().is_empty() && request.attachment.is_none() {
        return Err(error_response(&ChatError::EmptyMessage));
    }

    let turns = request.into_turns();
    tracing::debug!(
        provider = state.provider.name(),
        turns = turns.len(),
        "relaying chat request"
    );

    match backend.complete(&turns).await {
        Ok(text) => Ok(Json(RelayReply { text })),
        Err(e) => {
            tracing::warn!(error = ?e, "upstream request failed");
            Err(error_response(&e))
        }
    }
}

/// Any method other than POST on `/api/chat`.
pub async fn method_not_allowed() -> ErrorResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(RelayErrorBody::new("Method Not Allowed")),
    )
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "provider": state.provider.name(),
        "configured": state.backend.is_some(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Status code for a failed exchange.
pub fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::Provider { .. } | ChatError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        ChatError::EmptyMessage | ChatError::Attachment { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status code for a body the JSON extractor refused.  Only an over-limit
/// body is 413; every other rejection is a malformed request.
pub fn rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection {
        JsonRejection::BytesRejection(_)
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
        {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

fn rejection_response(rejection: &JsonRejection) -> ErrorResponse {
    (
        rejection_status(rejection),
        Json(RelayErrorBody::new(rejection.body_text())),
    )
}

fn error_response(err: &ChatError) -> ErrorResponse {
    (status_for(err), Json(RelayErrorBody::new(err.to_string())))
}
