use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use farmlink_core::DomainError;
use farmlink_infra::LedgerError;

/// Failure envelope: `success: false` plus a human-readable `error` string.
pub fn fail(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::ProductNotFound | LedgerError::OrderNotFound => {
            fail(StatusCode::NOT_FOUND, err.to_string())
        }
        LedgerError::InsufficientStock {
            available,
            requested,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "success": false,
                "error": err.to_string(),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        LedgerError::InvalidTransition(msg) => fail(StatusCode::UNPROCESSABLE_ENTITY, msg),
        LedgerError::Validation(msg) => fail(StatusCode::BAD_REQUEST, msg),
        LedgerError::Transaction(msg) => {
            tracing::error!(error = %msg, "storage failure");
            fail(StatusCode::INTERNAL_SERVER_ERROR, msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized => StatusCode::FORBIDDEN,
    };
    fail(status, err.to_string())
}
