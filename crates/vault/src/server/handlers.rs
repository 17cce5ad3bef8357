//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{
        DecryptRowsRequest, DecryptRowsResponse, EncryptRowRequest, EncryptRowResponse,
        ErrorResponse, HealthResponse,
    },
    ServiceError,
};
use fieldcrypt::Row;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::state::AppState;

/// Handler error: a [`ServiceError`] rendered as a JSON [`ErrorResponse`].
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// `POST /encrypt` — encrypt the sensitive fields of one row or update patch.
///
/// The table is identified by the value of the `X-Table-Name` request header
/// (or the configured header name). Tables without sensitive fields are echoed
/// back unchanged.
pub async fn encrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EncryptRowRequest>,
) -> Result<Json<EncryptRowResponse>, ApiError> {
    let table = table_name(&state, &headers)?;
    let row = into_row(req.row)
        .ok_or_else(|| ServiceError::BadRequest("row must be a JSON object".into()))?;

    let row = state.transform.encrypt_row(&table, row).map_err(|e| {
        warn!(table = %table, error = %e, "row encryption failed");
        ServiceError::EncryptionFailure(e.to_string())
    })?;

    Ok(Json(EncryptRowResponse {
        row: Value::Object(row),
    }))
}

/// `POST /decrypt` — restore the sensitive fields of a batch of stored rows.
///
/// Rows are returned in request order. Undecryptable fields are recovered per
/// field and never fail the request.
pub async fn decrypt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DecryptRowsRequest>,
) -> Result<Json<DecryptRowsResponse>, ApiError> {
    let table = table_name(&state, &headers)?;
    let rows = req
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            into_row(value).ok_or_else(|| {
                ServiceError::BadRequest(format!("rows[{i}] must be a JSON object"))
            })
        })
        .collect::<Result<Vec<Row>, _>>()?;

    debug!(table = %table, rows = rows.len(), "decrypt request");
    let rows = state
        .transform
        .decrypt_rows(&table, rows)
        .await
        .map_err(|e| {
            error!(table = %table, error = %e, "batch decryption failed");
            ServiceError::Internal(e.to_string())
        })?;

    Ok(Json(DecryptRowsResponse {
        rows: rows.into_iter().map(Value::Object).collect(),
    }))
}

/// `GET /health` — liveness and readiness check.
///
/// The key is imported before the server starts, so readiness only depends on
/// the registry: `200 OK` when at least one table is registered, `503` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let tables_registered = state.transform.registry().len();

    let (status_code, status_str) = if tables_registered > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        tables_registered,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Read the table name from the configured header.
fn table_name(state: &AppState, headers: &HeaderMap) -> Result<String, ServiceError> {
    let header = state.table_header_name.as_str();
    let value = headers
        .get(header)
        .ok_or_else(|| ServiceError::BadRequest(format!("missing {header} header")))?;
    let table = value.to_str().map_err(|_| {
        ServiceError::BadRequest(format!("{header} header contains non-ASCII characters"))
    })?;
    if table.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!("{header} header is empty")));
    }
    Ok(table.to_owned())
}

fn into_row(value: Value) -> Option<Row> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
