//! HTTP surface of the payroll service.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
pub mod seed;
