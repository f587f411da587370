use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use paybook_core::TenantId;

use crate::app::errors;
use crate::context::{TenantContext, UserContext};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Resolve the tenant (required) and the acting user (optional) from headers.
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let tenant_id = extract_tenant(req.headers())?;
    let user = extract_user(req.headers());

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, Response> {
    let header = headers.get(TENANT_HEADER).ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "missing_tenant",
            format!("{TENANT_HEADER} header is required"),
        )
    })?;

    header
        .to_str()
        .ok()
        .and_then(|raw| raw.parse::<TenantId>().ok())
        .ok_or_else(|| {
            errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_tenant",
                format!("{TENANT_HEADER} must be a UUID"),
            )
        })
}

fn extract_user(headers: &HeaderMap) -> UserContext {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    UserContext::new(user_id)
}
