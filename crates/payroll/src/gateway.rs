//! Boundary to the salary calculation engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use paybook_core::{EmployeeId, PayPeriod, TenantId};
use std::sync::Arc;

use crate::snapshot::PayrollSnapshot;

/// Why one employee could not be calculated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CalculationFailure {
    #[error("employee not found")]
    MissingEmployee,

    #[error("no employment contract covering the period")]
    MissingEmployment,

    #[error("no timesheet for the period")]
    MissingTimesheet,

    #[error("no rate table for year {0}")]
    MissingRates(i32),

    #[error("gross salary is zero")]
    ZeroGross,

    /// The engine returned a snapshot whose totals do not match its lines.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),

    #[error("{0}")]
    Other(String),
}

/// Computes one snapshot for one employee for one month.
///
/// Implementations must be safe to call concurrently for different employees.
#[async_trait]
pub trait CalculationGateway: Send + Sync {
    async fn calculate(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        period: PayPeriod,
    ) -> Result<PayrollSnapshot, CalculationFailure>;

    /// Seed per-employee working-time baselines when a month is opened.
    async fn prepare_month(
        &self,
        _tenant_id: TenantId,
        _period: PayPeriod,
    ) -> Result<(), CalculationFailure> {
        Ok(())
    }
}

#[async_trait]
impl<G> CalculationGateway for Arc<G>
where
    G: CalculationGateway + ?Sized,
{
    async fn calculate(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        period: PayPeriod,
    ) -> Result<PayrollSnapshot, CalculationFailure> {
        (**self).calculate(tenant_id, employee_id, period).await
    }

    async fn prepare_month(
        &self,
        tenant_id: TenantId,
        period: PayPeriod,
    ) -> Result<(), CalculationFailure> {
        (**self).prepare_month(tenant_id, period).await
    }
}
