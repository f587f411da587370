use axum::{http::StatusCode, response::IntoResponse, Extension, Json};

use crate::context::{TenantContext, UserContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(tenant): Extension<TenantContext>,
    Extension(user): Extension<UserContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "user_id": user.user_id(),
    }))
}
