//! Reference calculation engine driven by personnel data and the statutory rate table.
//!
//! Gross is the base salary prorated over paid days, plus fixed earnings and
//! overtime at 150%. Contributions apply to the insurable income (gross capped
//! at the yearly ceiling); income tax applies to gross minus employee
//! insurance.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::instrument;

use paybook_core::{DomainError, EmployeeId, Money, PayPeriod, TenantId};
use paybook_payroll::snapshot::codes;
use paybook_payroll::{
    CalculationFailure, CalculationGateway, EmployeeRecord, FundRate, InsuranceCategory,
    LegislationParams, LineKind, PayrollLine, PayrollSnapshot, PersonnelDirectory, TimesheetData,
};

use crate::timesheet::InMemoryTimesheetBook;

const OVERTIME_FACTOR: Decimal = dec!(1.5);

pub struct RateTableGateway {
    directory: Arc<dyn PersonnelDirectory>,
    timesheets: Arc<InMemoryTimesheetBook>,
}

impl RateTableGateway {
    pub fn new(directory: Arc<dyn PersonnelDirectory>, timesheets: Arc<InMemoryTimesheetBook>) -> Self {
        Self { directory, timesheets }
    }
}

fn failure(err: DomainError) -> CalculationFailure {
    CalculationFailure::Other(err.to_string())
}

fn earnings(record: &EmployeeRecord, timesheet: &TimesheetData) -> Result<Vec<PayrollLine>, CalculationFailure> {
    let salary = record.base_salary;
    let paid_days = timesheet.paid_days();
    let base = salary
        .prorate(paid_days, timesheet.working_days_in_month)
        .map_err(failure)?;

    let mut lines = vec![
        PayrollLine::new(codes::BASE_SALARY, "Base salary", LineKind::Earning, salary, base)
            .with_quantity(Decimal::from(paid_days)),
    ];

    for extra in &record.fixed_earnings {
        lines.push(PayrollLine::new(&extra.code, &extra.name, LineKind::Earning, extra.amount, extra.amount));
    }

    let month_hours = Decimal::from(timesheet.working_days_in_month * record.data.daily_hours());
    if !timesheet.overtime_hours.is_zero() && !month_hours.is_zero() {
        let hourly = salary.to_decimal() / month_hours;
        let amount = Money::from_decimal(hourly * timesheet.overtime_hours * OVERTIME_FACTOR).map_err(failure)?;
        lines.push(
            PayrollLine::new(codes::OVERTIME, "Overtime", LineKind::Earning, salary, amount)
                .with_rate(OVERTIME_FACTOR * dec!(100))
                .with_quantity(timesheet.overtime_hours),
        );
    }

    Ok(lines)
}

fn contribution(
    code: &str,
    name: &str,
    kind: LineKind,
    base: Money,
    rate: Decimal,
) -> Result<PayrollLine, CalculationFailure> {
    let amount = base.apply_percent(rate).map_err(failure)?;
    Ok(PayrollLine::new(code, name, kind, base, amount).with_rate(rate))
}

/// Employee insurance lines, then employer contribution lines.
fn fund_lines(law: &LegislationParams, insurable: Money) -> Result<(Vec<PayrollLine>, Vec<PayrollLine>), CalculationFailure> {
    let mut funds: Vec<(&str, &str, &str, FundRate)> = vec![
        (codes::PENSION_EMPLOYEE, codes::PENSION_EMPLOYER, "Pension", law.pension),
        (codes::SICKNESS_EMPLOYEE, codes::SICKNESS_EMPLOYER, "Sickness and maternity", law.sickness),
        (codes::UNEMPLOYMENT_EMPLOYEE, codes::UNEMPLOYMENT_EMPLOYER, "Unemployment", law.unemployment),
    ];
    if law.has_supplementary_pension() {
        funds.push((
            codes::SUPPLEMENTARY_EMPLOYEE,
            codes::SUPPLEMENTARY_EMPLOYER,
            "Supplementary pension",
            law.supplementary_pension,
        ));
    }
    funds.push((codes::HEALTH_EMPLOYEE, codes::HEALTH_EMPLOYER, "Health insurance", law.health));

    let mut employee = Vec::with_capacity(funds.len());
    let mut employer = Vec::with_capacity(funds.len() + 1);
    for (ee_code, er_code, name, rate) in funds {
        employee.push(contribution(ee_code, name, LineKind::EmployeeInsurance, insurable, rate.employee)?);
        employer.push(contribution(er_code, name, LineKind::EmployerContribution, insurable, rate.employer)?);
    }
    employer.push(contribution(
        codes::WORK_ACCIDENT_EMPLOYER,
        "Work accident",
        LineKind::EmployerContribution,
        insurable,
        law.work_accident,
    )?);

    Ok((employee, employer))
}

#[async_trait]
impl CalculationGateway for RateTableGateway {
    #[instrument(skip_all, fields(tenant_id = %tenant_id, employee_id = %employee_id, period = %period))]
    async fn calculate(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        period: PayPeriod,
    ) -> Result<PayrollSnapshot, CalculationFailure> {
        let record = self
            .directory
            .employee(tenant_id, employee_id)
            .ok_or(CalculationFailure::MissingEmployee)?;
        if !record.data.is_employed_in(period) {
            return Err(CalculationFailure::MissingEmployment);
        }
        let timesheet = self
            .timesheets
            .get(tenant_id, employee_id, period)
            .ok_or(CalculationFailure::MissingTimesheet)?;

        let category = InsuranceCategory::from_birth_year(record.data.birth_year());
        let law = LegislationParams::bulgarian(period.year(), category)
            .ok_or(CalculationFailure::MissingRates(period.year()))?;

        let earnings = earnings(&record, &timesheet)?;
        let gross: Money = earnings.iter().map(|l| l.amount).sum();
        if gross <= Money::ZERO {
            return Err(CalculationFailure::ZeroGross);
        }

        let insurable = gross.min(law.insurable_ceiling);
        let (mut deductions, employer) = fund_lines(&law, insurable)?;

        let employee_insurance: Money = deductions.iter().map(|l| l.amount).sum();
        let tax_base = gross - employee_insurance;
        deductions.push(contribution(
            codes::INCOME_TAX,
            "Income tax",
            LineKind::IncomeTax,
            tax_base,
            law.income_tax_rate,
        )?);

        tracing::debug!(%gross, %insurable, "employee calculated");

        Ok(PayrollSnapshot::assemble(
            tenant_id,
            period,
            record.data,
            law,
            timesheet,
            earnings,
            deductions,
            employer,
            insurable,
        ))
    }

    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    async fn prepare_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<(), CalculationFailure> {
        let working_days = period.weekdays();
        let mut seeded = 0usize;
        for employee_id in self.directory.active_employees(tenant_id, period) {
            let daily_hours = self
                .directory
                .employee(tenant_id, employee_id)
                .map(|r| r.data.daily_hours())
                .unwrap_or(8);
            if self.timesheets.seed_if_missing(
                tenant_id,
                employee_id,
                period,
                TimesheetData::full_month(working_days, daily_hours),
            ) {
                seeded += 1;
            }
        }
        tracing::debug!(seeded, "timesheet baselines seeded");
        Ok(())
    }
}
