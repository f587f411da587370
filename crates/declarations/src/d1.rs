//! Declaration 1: per-employee insurance data for one month.
//!
//! One comma-separated record of 53 fields per employee. Text fields are
//! double-quoted; amounts use two decimals.

use chrono::Datelike;

use paybook_core::{DomainError, DomainResult, PayPeriod};
use paybook_payroll::{CompanyProfile, InsuranceCategory, PayrollSnapshot};

use crate::file::{DeclarationFile, first_chars, percent, quoted, record_line};
use crate::submission::CorrectionCode;

pub const FIELD_COUNT: usize = 53;

const SURNAME_MAX: usize = 25;

pub fn file_name(bulstat: &str, period: PayPeriod) -> String {
    format!("EMPL{}_{}_{:02}.TXT", period.year(), bulstat, period.month())
}

pub fn build(
    company: &CompanyProfile,
    period: PayPeriod,
    snapshots: &[PayrollSnapshot],
    correction: CorrectionCode,
) -> DomainResult<DeclarationFile> {
    let bulstat = company.bulstat.trim();
    if bulstat.is_empty() {
        return Err(DomainError::precondition("company BULSTAT is missing"));
    }
    if snapshots.is_empty() {
        return Err(DomainError::precondition(format!(
            "no payroll snapshots for {period}"
        )));
    }

    let content: String = snapshots
        .iter()
        .map(|s| record_line(&record(company, period, s, correction)))
        .collect();

    Ok(DeclarationFile {
        file_name: file_name(bulstat, period),
        content,
        record_count: snapshots.len(),
        employee_ids: snapshots.iter().map(|s| s.employee_id()).collect(),
    })
}

/// The 53 fields of one employee record.
pub fn record(
    company: &CompanyProfile,
    period: PayPeriod,
    s: &PayrollSnapshot,
    correction: CorrectionCode,
) -> Vec<String> {
    let e = &s.employee;
    let t = &s.timesheet;
    let law = &s.legislation;
    let totals = &s.totals;

    let (personal_id, id_kind) = e
        .personal_id()
        .map(|(v, k)| (v.to_string(), k.code().to_string()))
        .unwrap_or_default();

    let first_day = e
        .hire_date
        .filter(|d| period.contains(*d))
        .map(|d| d.day())
        .unwrap_or(1);
    let last_day = e
        .termination_date
        .filter(|d| period.contains(*d))
        .map(|d| d.day())
        .unwrap_or(period.days_in_month());

    let surname: String = e.last_name.chars().take(SURNAME_MAX).collect();
    let insurable = totals.insurable_income.to_string();
    let supplementary = law.category == InsuranceCategory::After1960;

    let mut f: Vec<String> = Vec::with_capacity(FIELD_COUNT);
    f.push(format!("{:02}", period.month()));
    f.push(period.year().to_string());
    f.push(quoted(company.bulstat.trim()));
    f.push(quoted(&personal_id));
    f.push(id_kind);
    f.push(quoted(&surname));
    f.push(quoted(&e.initials()));
    f.push(e.insurance_type.clone());
    f.push(first_day.to_string());
    f.push(last_day.to_string());
    f.extend(std::iter::repeat_n(String::new(), 8));
    f.push(format!("{:04}", t.insured_days()));
    f.push(t.worked_days.to_string());
    f.push(t.sick_leave_days.to_string());
    f.push("0".to_string());
    f.push("0".to_string());
    f.push(t.unpaid_leave_days.to_string());
    f.push(t.employer_sick_days().to_string());
    f.push(t.worked_hours.trunc().to_string());
    f.push(t.overtime_hours.trunc().to_string());
    f.push(quoted(&qualification_group(e.nkpd_code.as_deref())));
    f.push(quoted(&kid_code(e.kid_code.as_deref(), company.nkid_code.as_deref())));
    f.push(quoted(&first_chars(company.nkid_code.as_deref(), 2)));
    f.push(quoted(&e.daily_hours().to_string()));
    f.push(insurable.clone());
    f.push(percent(law.health.total()));
    f.push(insurable.clone());
    f.push(percent(law.pension.employee));
    f.push(percent(law.pension.employer));
    f.push(percent(law.sickness.employee));
    f.push(percent(law.sickness.employer));
    f.push(percent(law.unemployment.employee));
    f.push(percent(law.unemployment.employer));
    if supplementary {
        f.push(insurable);
        f.push(percent(law.supplementary_pension.employee));
        f.push(percent(law.supplementary_pension.employer));
    } else {
        f.extend(std::iter::repeat_n(String::new(), 3));
    }
    f.push(String::new());
    f.push(String::new());
    f.push(totals.gross_salary.to_string());
    f.push(percent(law.work_accident));
    f.push(totals.tax_base.to_string());
    f.push(totals.income_tax.to_string());
    f.push(totals.net_salary.to_string());
    f.push(quoted("000"));
    f.push(correction.code().to_string());
    f.push(quoted(company.bulstat.trim()));

    debug_assert_eq!(f.len(), FIELD_COUNT);
    f
}

/// First NKPD digit, or "0" when the position code is unknown.
fn qualification_group(nkpd: Option<&str>) -> String {
    let group = first_chars(nkpd, 1);
    if group.is_empty() { "0".to_string() } else { group }
}

/// The employee's activity code, falling back to the company's.
fn kid_code(employee: Option<&str>, company: Option<&str>) -> String {
    [employee, company]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string()
}
