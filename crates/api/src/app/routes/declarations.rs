use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use paybook_core::{DomainError, SubmissionId};
use paybook_declarations::DeclarationType;
use paybook_infra::declaration_service::DeclarationRequest;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/submissions", get(list_submissions))
        .route("/submissions/:id", get(get_submission))
        .route("/submissions/:id/download", get(download_submission))
        .route("/:type/preview", get(preview))
        .route("/:type/validate", get(validate))
        .route("/:type/generate", post(generate))
        .route("/:type/current", get(current))
}

pub async fn preview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(kind): Path<String>,
    Query(q): Query<dto::DeclarationQuery>,
) -> Response {
    let request = match parse_request(&kind, &q) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.declarations.preview(tenant.tenant_id(), &request) {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn validate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(kind): Path<String>,
    Query(q): Query<dto::DeclarationQuery>,
) -> Response {
    let request = match parse_request(&kind, &q) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.declarations.validate(tenant.tenant_id(), &request) {
        Ok(found) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "declaration_type": request.declaration_type(),
                "valid": found.is_empty(),
                "errors": found,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn generate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(kind): Path<String>,
    Query(q): Query<dto::DeclarationQuery>,
) -> Response {
    let (request, correction) = match parse_request(&kind, &q).and_then(|r| Ok((r, q.correction()?))) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .declarations
        .generate(tenant.tenant_id(), &request, correction, q.idempotency_key())
    {
        Ok(appended) => {
            let created = appended.is_new();
            let status = if created { StatusCode::CREATED } else { StatusCode::OK };
            let body = dto::GenerateResponse {
                created,
                submission: appended.into_submission(),
            };
            (status, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn current(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(kind): Path<String>,
    Query(q): Query<dto::DeclarationQuery>,
) -> Response {
    let request = match parse_request(&kind, &q) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let period = request.filing_period();
    match services
        .declarations
        .current(tenant.tenant_id(), request.declaration_type(), &period)
    {
        Ok(Some(submission)) => (StatusCode::OK, Json(submission)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no {} filing for {period}", request.declaration_type()),
        ),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_submissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::SubmissionQuery>,
) -> Response {
    let filter = match q.filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.declarations.submissions(tenant.tenant_id(), &filter) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_submission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: SubmissionId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid submission id"),
    };
    match services.declarations.submission(tenant.tenant_id(), id) {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn download_submission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: SubmissionId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid submission id"),
    };
    match services.declarations.download(tenant.tenant_id(), id) {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ],
            file.content,
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_request(kind: &str, q: &dto::DeclarationQuery) -> Result<DeclarationRequest, DomainError> {
    let declaration_type: DeclarationType = kind.parse()?;
    q.request(declaration_type)
}
