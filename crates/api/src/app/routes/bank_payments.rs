use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/preview", get(preview))
        .route("/generate", post(generate))
        .route("/download", get(download))
}

pub async fn preview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.payments.preview(tenant.tenant_id(), period) {
        Ok(batch) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "period": batch.period,
                "total": batch.total,
                "record_count": batch.records.len(),
                "warning_count": batch.warning_count(),
                "records": batch.records,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn generate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.payments.generate(tenant.tenant_id(), period) {
        Ok(file) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "file_name": file.file_name,
                "record_count": file.record_count,
                "total_amount": file.total_amount,
                "generated_at": file.generated_at,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn download(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.payments.download(tenant.tenant_id(), period) {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
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
