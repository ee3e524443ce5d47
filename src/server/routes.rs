//! Route handlers for the HTTP front (C6, §4.6 / §6).

use crate::error::Error;
use crate::orchestrator::{Orchestrator, ResearchRequest, ResearchResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequestBody {
    pub question: String,
    pub initial_search_query_count: Option<u32>,
    pub max_research_loops: Option<u32>,
    pub reasoning_model: Option<String>,
}

impl ResearchRequestBody {
    fn validate(&self) -> Result<(), Error> {
        if self.question.trim().is_empty() {
            return Err(Error::Validation {
                field: "question".to_string(),
                reason: "must be non-empty".to_string(),
            });
        }
        if let Some(count) = self.initial_search_query_count {
            if count < 1 {
                return Err(Error::Validation {
                    field: "initial_search_query_count".to_string(),
                    reason: "must be >= 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            Error::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            Error::RateLimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Error::Cancelled => (StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), "cancelled"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            error!(error = %self, "request failed with unrecovered error");
        }

        let body = ErrorBody {
            error: kind,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn research(State(state): State<Arc<AppState>>, Json(body): Json<ResearchRequestBody>) -> Result<Json<ResearchResponse>, Error> {
    body.validate()?;

    let request = ResearchRequest {
        question: body.question,
        initial_search_query_count: body.initial_search_query_count,
        max_research_loops: body.max_research_loops,
        reasoning_model: body.reasoning_model,
    };

    let response = state.orchestrator.run(request, CancellationToken::new()).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    status: &'static str,
}

pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

pub async fn openapi() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "openapi": "3.0.0",
        "info": {"title": "iterative research orchestrator", "version": env!("CARGO_PKG_VERSION")},
        "paths": {
            "/api/research": {
                "post": {
                    "summary": "Run the iterative research pipeline for a question",
                    "requestBody": {
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ResearchRequest"}}}
                    },
                    "responses": {"200": {"description": "Research completed"}}
                }
            },
            "/health": {"get": {"summary": "Liveness probe", "responses": {"200": {"description": "OK"}}}}
        }
    }))
}

pub async fn docs() -> axum::response::Html<&'static str> {
    axum::response::Html(
        "<html><head><title>iterative research orchestrator</title></head><body>\
         <h1>iterative research orchestrator</h1>\
         <p>POST /api/research with {\"question\": \"...\"}. See <a href=\"/openapi.json\">/openapi.json</a>.</p>\
         </body></html>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_question() {
        let body = ResearchRequestBody {
            question: "   ".to_string(),
            initial_search_query_count: None,
            max_research_loops: None,
            reasoning_model: None,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn rejects_zero_query_count() {
        let body = ResearchRequestBody {
            question: "what is rust".to_string(),
            initial_search_query_count: Some(0),
            max_research_loops: None,
            reasoning_model: None,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_request() {
        let body = ResearchRequestBody {
            question: "what is rust".to_string(),
            initial_search_query_count: Some(3),
            max_research_loops: Some(2),
            reasoning_model: None,
        };
        assert!(body.validate().is_ok());
    }
}
