//! Read-only personnel master data consumed by calculation and declarations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use paybook_core::{DateRange, EmployeeId, Money, PayPeriod, TenantId};
use std::sync::Arc;

use crate::employee::EmployeeData;

/// Employer identity used in every statutory file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub bulstat: String,
    /// Economic activity classifier of the company.
    #[serde(default)]
    pub nkid_code: Option<String>,
    /// Settlement code of the workplace.
    #[serde(default)]
    pub ekatte: Option<String>,
}

/// Fixed monthly earning on top of the base salary (e.g. seniority bonus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedEarning {
    pub code: String,
    pub name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub data: EmployeeData,
    pub base_salary: Money,
    #[serde(default)]
    pub fixed_earnings: Vec<FixedEarning>,
}

impl EmployeeRecord {
    pub fn employee_id(&self) -> EmployeeId {
        self.data.employee_id
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentEventKind {
    NewContract,
    Amendment,
    Termination,
}

impl EmploymentEventKind {
    /// Event type code in Art.62 notifications.
    pub fn code(self) -> &'static str {
        match self {
            EmploymentEventKind::NewContract => "01",
            EmploymentEventKind::Amendment => "02",
            EmploymentEventKind::Termination => "03",
        }
    }
}

/// A contract change that must be reported under Art.62 of the Labour Code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentEvent {
    pub employee_id: EmployeeId,
    pub kind: EmploymentEventKind,
    pub date: NaiveDate,
    /// Legal basis code of the contract (e.g. "01" for Art.67 para 1 item 1).
    pub basis: String,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub termination_basis: Option<String>,
}

/// Master data lookups. Implementations must be cheap to call per employee.
pub trait PersonnelDirectory: Send + Sync {
    fn company(&self, tenant_id: TenantId) -> Option<CompanyProfile>;

    fn employee(&self, tenant_id: TenantId, employee_id: EmployeeId) -> Option<EmployeeRecord>;

    /// Every employee record of the tenant, terminated ones included.
    fn employees(&self, tenant_id: TenantId) -> Vec<EmployeeRecord>;

    /// Employees with at least one employed day in the period.
    fn active_employees(&self, tenant_id: TenantId, period: PayPeriod) -> Vec<EmployeeId> {
        let mut active: Vec<EmployeeRecord> = self
            .employees(tenant_id)
            .into_iter()
            .filter(|e| e.data.is_employed_in(period))
            .collect();
        active.sort_by(|a, b| {
            (&a.data.last_name, &a.data.first_name, a.data.employee_id)
                .cmp(&(&b.data.last_name, &b.data.first_name, b.data.employee_id))
        });
        active.into_iter().map(|e| e.employee_id()).collect()
    }

    /// Employment events dated inside `range`, oldest first.
    fn employment_events(&self, tenant_id: TenantId, range: DateRange) -> Vec<EmploymentEvent>;
}

impl<S> PersonnelDirectory for Arc<S>
where
    S: PersonnelDirectory + ?Sized,
{
    fn company(&self, tenant_id: TenantId) -> Option<CompanyProfile> {
        (**self).company(tenant_id)
    }

    fn employee(&self, tenant_id: TenantId, employee_id: EmployeeId) -> Option<EmployeeRecord> {
        (**self).employee(tenant_id, employee_id)
    }

    fn employees(&self, tenant_id: TenantId) -> Vec<EmployeeRecord> {
        (**self).employees(tenant_id)
    }

    fn active_employees(&self, tenant_id: TenantId, period: PayPeriod) -> Vec<EmployeeId> {
        (**self).active_employees(tenant_id, period)
    }

    fn employment_events(&self, tenant_id: TenantId, range: DateRange) -> Vec<EmploymentEvent> {
        (**self).employment_events(tenant_id, range)
    }
}
