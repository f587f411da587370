//! The per-employee payroll snapshot.
//!
//! A snapshot is the immutable result of calculating one employee for one
//! month: frozen employee data, the legislation in force, working time and
//! the earning/deduction/contribution lines with their aggregates. It carries
//! no wall-clock timestamp, so recalculating with unchanged inputs produces an
//! identical value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paybook_core::{EmployeeId, Money, PayPeriod, TenantId};

use crate::employee::{EmployeeData, TimesheetData};
use crate::legislation::LegislationParams;

/// Well-known line codes. Contribution codes follow the NRA fund codes.
pub mod codes {
    pub const BASE_SALARY: &str = "101";
    pub const OVERTIME: &str = "115";

    pub const PENSION_EMPLOYEE: &str = "351901";
    pub const SICKNESS_EMPLOYEE: &str = "351902";
    pub const UNEMPLOYMENT_EMPLOYEE: &str = "351903";
    pub const SUPPLEMENTARY_EMPLOYEE: &str = "351904";
    pub const HEALTH_EMPLOYEE: &str = "351905";

    pub const PENSION_EMPLOYER: &str = "351911";
    pub const SICKNESS_EMPLOYER: &str = "351912";
    pub const UNEMPLOYMENT_EMPLOYER: &str = "351913";
    pub const SUPPLEMENTARY_EMPLOYER: &str = "351914";
    pub const HEALTH_EMPLOYER: &str = "351915";
    pub const WORK_ACCIDENT_EMPLOYER: &str = "351916";

    pub const INCOME_TAX: &str = "351982";
}

/// Amounts within one stotinka are considered equal.
pub const TOLERANCE_MINOR: u64 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Earning,
    EmployeeInsurance,
    IncomeTax,
    OtherDeduction,
    EmployerContribution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollLine {
    pub code: String,
    pub name: String,
    pub kind: LineKind,
    pub base: Money,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    pub amount: Money,
}

impl PayrollLine {
    pub fn new(code: &str, name: &str, kind: LineKind, base: Money, amount: Money) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            kind,
            base,
            rate: None,
            quantity: None,
            amount,
        }
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub gross_salary: Money,
    pub insurable_income: Money,
    pub total_employee_insurance: Money,
    pub tax_base: Money,
    pub income_tax: Money,
    pub total_deductions: Money,
    pub net_salary: Money,
    pub total_employer_insurance: Money,
    pub total_employer_cost: Money,
}

/// Store key: at most one current snapshot per (tenant, employee, period).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub period: PayPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSnapshot {
    pub tenant_id: TenantId,
    pub period: PayPeriod,
    pub employee: EmployeeData,
    pub legislation: LegislationParams,
    pub timesheet: TimesheetData,
    pub earnings: Vec<PayrollLine>,
    pub deductions: Vec<PayrollLine>,
    pub employer_contributions: Vec<PayrollLine>,
    pub totals: PayrollTotals,
}

/// One broken aggregate relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyIssue {
    pub field: &'static str,
    pub expected: Money,
    pub actual: Money,
}

impl PayrollSnapshot {
    /// Build a snapshot whose aggregates are derived from its lines.
    ///
    /// `insurable_income` is passed in because it depends on the ceiling, not on
    /// the lines alone.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        tenant_id: TenantId,
        period: PayPeriod,
        employee: EmployeeData,
        legislation: LegislationParams,
        timesheet: TimesheetData,
        earnings: Vec<PayrollLine>,
        deductions: Vec<PayrollLine>,
        employer_contributions: Vec<PayrollLine>,
        insurable_income: Money,
    ) -> Self {
        let gross_salary: Money = earnings.iter().map(|l| l.amount).sum();
        let total_deductions: Money = deductions.iter().map(|l| l.amount).sum();
        let of_kind = |kind: LineKind| -> Money {
            deductions
                .iter()
                .filter(|l| l.kind == kind)
                .map(|l| l.amount)
                .sum()
        };
        let total_employee_insurance = of_kind(LineKind::EmployeeInsurance);
        let income_tax = of_kind(LineKind::IncomeTax);
        let total_employer_insurance: Money =
            employer_contributions.iter().map(|l| l.amount).sum();

        let totals = PayrollTotals {
            gross_salary,
            insurable_income,
            total_employee_insurance,
            tax_base: gross_salary - total_employee_insurance,
            income_tax,
            total_deductions,
            net_salary: gross_salary - total_deductions,
            total_employer_insurance,
            total_employer_cost: gross_salary + total_employer_insurance,
        };

        Self {
            tenant_id,
            period,
            employee,
            legislation,
            timesheet,
            earnings,
            deductions,
            employer_contributions,
            totals,
        }
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee.employee_id
    }

    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            tenant_id: self.tenant_id,
            employee_id: self.employee.employee_id,
            period: self.period,
        }
    }

    /// Sum of every deduction and employer contribution line with `code`.
    pub fn amount_for_code(&self, code: &str) -> Money {
        self.deductions
            .iter()
            .chain(self.employer_contributions.iter())
            .filter(|l| l.code == code)
            .map(|l| l.amount)
            .sum()
    }

    /// Check the aggregate relations between lines and totals.
    pub fn check_consistency(&self) -> Vec<ConsistencyIssue> {
        let t = &self.totals;
        let earnings: Money = self.earnings.iter().map(|l| l.amount).sum();
        let deductions: Money = self.deductions.iter().map(|l| l.amount).sum();
        let contributions: Money = self.employer_contributions.iter().map(|l| l.amount).sum();

        let checks = [
            ("gross_salary", earnings, t.gross_salary),
            ("total_deductions", deductions, t.total_deductions),
            ("net_salary", t.gross_salary - t.total_deductions, t.net_salary),
            ("total_employer_insurance", contributions, t.total_employer_insurance),
            (
                "total_employer_cost",
                t.gross_salary + t.total_employer_insurance,
                t.total_employer_cost,
            ),
        ];

        checks
            .into_iter()
            .filter(|(_, expected, actual)| expected.abs_diff(*actual) > TOLERANCE_MINOR)
            .map(|(field, expected, actual)| ConsistencyIssue {
                field,
                expected,
                actual,
            })
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.check_consistency().is_empty()
    }
}
