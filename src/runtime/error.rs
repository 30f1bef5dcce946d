//! RPC status → HTTP error responses.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tonic::{Code, Status};

use crate::runtime::metadata::GRPC_STATUS_HEADER;

/// Error half of a gateway handler's result.
///
/// Handlers return `Result<Forward<T>, GatewayError>` and use `?` on RPC calls.
#[derive(Debug)]
pub struct GatewayError(pub Status);

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.code(), self.0.message())
    }
}

impl std::error::Error for GatewayError {}

/// HTTP status for an RPC status code.
pub fn http_status_from_code(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body: `{"code": .., "message": .., "details": []}`.
pub(crate) fn error_body(code: Code, message: &str) -> serde_json::Value {
    json!({
        "code": code as i32,
        "message": message,
        "details": [],
    })
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        tracing::debug!(code = ?code, message = %self.0.message(), "RPC call failed");
        (
            http_status_from_code(code),
            [(HeaderName::from_static(GRPC_STATUS_HEADER), HeaderValue::from(code as i32))],
            Json(error_body(code, self.0.message())),
        )
            .into_response()
    }
}
