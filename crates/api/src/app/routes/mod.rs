use axum::{routing::get, Router};

pub mod bank_payments;
pub mod declarations;
pub mod payroll;
pub mod system;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/payroll", payroll::router())
        .nest("/declarations", declarations::router())
        .nest("/bank-payments", bank_payments::router())
}
