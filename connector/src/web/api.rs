//! REST API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sql_policy::Rejection;

use super::state::AppState;
use crate::db::ResultSet;
use crate::error::GateError;

/// Returned for every internal failure; the real cause only goes to the logs
pub const INTERNAL_ERROR_DETAIL: &str = "Internal server error. Check logs for details.";

const QUERY_ENDPOINT: &str = "/query";

/// Query request body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub sql: Option<String>,
}

/// Successful query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub status: &'static str,
    pub rows: usize,
    pub results: ResultSet,
}

impl QueryResponse {
    fn success(results: ResultSet) -> Self {
        Self {
            status: "success",
            rows: results.len(),
            results,
        }
    }
}

/// Caller-visible failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    BadStatementType,
    SchemaForbidden,
    InternalError,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput | ErrorKind::BadStatementType => StatusCode::BAD_REQUEST,
            ErrorKind::SchemaForbidden => StatusCode::FORBIDDEN,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: ErrorKind,
    pub detail: String,
}

/// Failure of a query request, already stripped of internal detail
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ApiError {
    fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    fn internal() -> Self {
        Self::new(ErrorKind::InternalError, INTERNAL_ERROR_DETAIL)
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        let kind = match rejection {
            Rejection::Empty => ErrorKind::InvalidInput,
            Rejection::NotReadOnly => ErrorKind::BadStatementType,
            Rejection::SchemaNotPermitted { .. } => ErrorKind::SchemaForbidden,
        };
        Self::new(kind, rejection.to_string())
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::InvalidInput => Rejection::Empty.into(),
            GateError::PolicyViolation(rejection) => rejection.into(),
            GateError::ExecutionFailure(_) => Self::internal(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error",
            error: self.kind,
            detail: self.detail,
        };
        (self.kind.status_code(), Json(body)).into_response()
    }
}

/// Check, execute and shape one query
///
/// The policy runs here first so rejections never reach the database; the
/// gate then runs it again before executing.
pub async fn handle(state: &AppState, sql: Option<&str>) -> Result<QueryResponse, ApiError> {
    let sql = sql.unwrap_or_default();

    if let Err(rejection) = state.gate.policy().classify(sql) {
        tracing::warn!(reason = %rejection, "Rejected query");
        return Err(rejection.into());
    }

    match state.gate.execute(sql).await {
        Ok(results) => {
            tracing::info!(rows = results.len(), "Query succeeded");
            Ok(QueryResponse::success(results))
        }
        Err(GateError::ExecutionFailure(e)) => {
            tracing::error!(error = %e, sql = sql.trim(), "Query execution failed");
            Err(ApiError::internal())
        }
        Err(other) => {
            tracing::warn!(reason = %other, "Gate rejected query");
            Err(other.into())
        }
    }
}

/// Execute a read-only query
pub async fn query_db(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(reason = %rejection, "Malformed query request");
        ApiError::new(
            ErrorKind::InvalidInput,
            "Request body must be a JSON object with a string 'sql' field.",
        )
    })?;

    handle(&state, request.sql.as_deref()).await.map(Json)
}

/// Health check response
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// Fixed service descriptor; never touches the database
pub fn health_status() -> HealthResponse {
    HealthResponse {
        status: "ok",
        message: "Company REST API Connector is running",
        endpoints: vec![QUERY_ENDPOINT],
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(health_status())
}
