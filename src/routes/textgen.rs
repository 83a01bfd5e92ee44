use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;

use crate::{
    dto::textgen::{GenerateError, GenerateRequest, GenerateResponse},
    state::AppState,
    textgen::{self, TextgenError},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/generate-description", post(generate_description))
}

#[utoipa::path(
    post,
    path = "/generate-description",
    request_body(content = GenerateRequest, description = "JSON or urlencoded form: title, optional price"),
    responses(
        (status = 200, description = "Generated description", body = GenerateResponse),
        (status = 400, description = "Missing title", body = GenerateError),
        (status = 503, description = "Generator could not be set up", body = GenerateError),
        (status = 500, description = "Generation failed", body = GenerateError)
    ),
    tag = "Descriptions"
)]
pub async fn generate_description(State(state): State<AppState>, request: Request) -> Response {
    let generator = match textgen::shared(&state.textgen).await {
        Ok(generator) => generator,
        Err(err) => {
            tracing::error!(error = %err, "description generator unavailable");
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "text generation not configured",
                Some(err.to_string()),
            );
        }
    };

    let payload = read_payload(request, &state).await;
    if payload.title.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "title required", None);
    }

    match generator.generate(&payload.title, payload.price).await {
        Ok(description) => Json(GenerateResponse { description }).into_response(),
        Err(err @ TextgenError::NotConfigured(_)) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "text generation not configured",
            Some(err.to_string()),
        ),
        Err(TextgenError::Generation(message)) => {
            tracing::warn!(error = %message, "description generation failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "generation_failed",
                Some(message),
            )
        }
    }
}

/// Malformed bodies read as an empty request, which then fails on the title.
async fn read_payload(request: Request, state: &AppState) -> GenerateRequest {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        match Json::<Value>::from_request(request, state).await {
            Ok(Json(body)) => GenerateRequest::from_json(&body),
            Err(_) => GenerateRequest::default(),
        }
    } else {
        match Form::<HashMap<String, String>>::from_request(request, state).await {
            Ok(Form(form)) => GenerateRequest::from_form(&form),
            Err(_) => GenerateRequest::default(),
        }
    }
}

fn error_response(status: StatusCode, error: &str, message: Option<String>) -> Response {
    let body = GenerateError {
        error: error.to_string(),
        message,
    };
    (status, Json(body)).into_response()
}
