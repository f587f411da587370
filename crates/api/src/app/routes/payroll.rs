use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use paybook_core::{EmployeeId, PayPeriod};
use paybook_infra::payroll_controller::CancellationFlag;
use paybook_infra::ServiceResult;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::{TenantContext, UserContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_month))
        .route("/history", get(get_history))
        .route("/start-new", post(start_new))
        .route("/calculate", post(calculate_all))
        .route("/calculate/:employee_id", post(calculate_one))
        .route("/close", post(close_month))
        .route("/reopen", post(reopen_month))
        .route("/recalculate", post(recalculate_month))
        .route("/snapshots", get(list_snapshots))
        .route("/snapshots/:employee_id", get(get_snapshot))
}

pub async fn get_month(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.payroll.month(tenant.tenant_id(), period))
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.payroll.history(tenant.tenant_id(), period))
}

pub async fn start_new(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.payroll.prepare_month(tenant.tenant_id(), period).await)
}

pub async fn calculate_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    // Dropping the request future aborts the workers; no caller-side cancel here.
    let cancel = CancellationFlag::new();
    respond(services.payroll.calculate_all(tenant.tenant_id(), period, &cancel).await)
}

pub async fn calculate_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(employee_id): Path<String>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let (employee_id, period) = match employee_and_period(&employee_id, &q) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        services
            .payroll
            .calculate_one(tenant.tenant_id(), employee_id, period)
            .await,
    )
}

pub async fn close_month(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<UserContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let closed_by = user.user_id().map(str::to_string);
    respond(services.payroll.close_month(tenant.tenant_id(), period, closed_by).await)
}

pub async fn reopen_month(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<UserContext>,
    Query(q): Query<dto::ReopenQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let reopened_by = user.user_id().map(str::to_string);
    respond(
        services
            .payroll
            .reopen_month(tenant.tenant_id(), period, reopened_by, q.reason)
            .await,
    )
}

pub async fn recalculate_month(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let cancel = CancellationFlag::new();
    respond(
        services
            .payroll
            .recalculate_month(tenant.tenant_id(), period, &cancel)
            .await,
    )
}

pub async fn list_snapshots(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let period = match q.period() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.payroll.snapshots(tenant.tenant_id(), period))
}

pub async fn get_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(employee_id): Path<String>,
    Query(q): Query<dto::PeriodQuery>,
) -> Response {
    let (employee_id, period) = match employee_and_period(&employee_id, &q) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(services.payroll.snapshot(tenant.tenant_id(), employee_id, period))
}

fn employee_and_period(raw: &str, q: &dto::PeriodQuery) -> Result<(EmployeeId, PayPeriod), Response> {
    let employee_id = raw
        .parse::<EmployeeId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid employee id"))?;
    let period = q.period().map_err(errors::domain_error_to_response)?;
    Ok((employee_id, period))
}

fn respond<T: Serialize>(result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
