//! Infrastructure layer: stores, the month command pipeline and the
//! application services built on them.

pub mod bank_payment_service;
pub mod declaration_service;
pub mod error;
pub mod event_store;
pub mod month_dispatcher;
pub mod payroll_controller;
pub mod personnel;
pub mod rate_table;
pub mod store;
pub mod timesheet;


pub use error::{ServiceError, ServiceResult};
