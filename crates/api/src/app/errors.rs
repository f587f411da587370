use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use paybook_core::DomainError;
use paybook_infra::ServiceError;
use paybook_infra::event_store::EventStoreError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::EventStore(EventStoreError::Concurrency(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        ServiceError::EventStore(e) => {
            tracing::error!(error = %e, "event store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "event_store_error", e.to_string())
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Render(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "render_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvalidTransition { .. } => {
            json_error(StatusCode::CONFLICT, "invalid_transition", message)
        }
        DomainError::PreconditionFailed(_) => {
            json_error(StatusCode::PRECONDITION_FAILED, "precondition_failed", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::CalculationFailure { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "calculation_failure", message)
        }
        DomainError::ValidationFailure { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_failure", message)
        }
        DomainError::ConflictingCorrection(_) => {
            json_error(StatusCode::CONFLICT, "conflicting_correction", message)
        }
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
